//! In-Memory Ledger
//!
//! Test double for [`LedgerStore`]. The write lock makes `mark_success` a
//! compare-and-set, mirroring the guarded update of the SQLite store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use gate_core::TenantKey;

use crate::error::Result;
use crate::record::{PaymentMethod, PaymentRecord, PaymentStatus};
use crate::store::{LedgerStore, MarkOutcome};

/// In-memory ledger (for tests and development).
#[derive(Default)]
pub struct MemoryLedger {
    records: RwLock<HashMap<(TenantKey, String), PaymentRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plant a record directly, bypassing the two mutation operations.
    /// Lets tests construct states the public contract forbids, e.g. the
    /// same label in two tenant partitions.
    pub fn inject(&self, tenant: &TenantKey, record: PaymentRecord) {
        let mut records = self.records.write().unwrap();
        records.insert((tenant.clone(), record.label.clone()), record);
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn upsert_pending(
        &self,
        tenant: &TenantKey,
        label: &str,
        beneficiary: &str,
        method: Option<PaymentMethod>,
    ) -> Result<()> {
        let mut records = self.records.write().unwrap();
        records.insert(
            (tenant.clone(), label.to_string()),
            PaymentRecord::pending(label, beneficiary, method),
        );
        Ok(())
    }

    async fn lookup_beneficiary(
        &self,
        tenant: &TenantKey,
        label: &str,
    ) -> Result<Option<String>> {
        let records = self.records.read().unwrap();
        Ok(records
            .get(&(tenant.clone(), label.to_string()))
            .map(|r| r.beneficiary.clone()))
    }

    async fn mark_success(&self, tenant: &TenantKey, label: &str) -> Result<MarkOutcome> {
        let mut records = self.records.write().unwrap();
        match records.get_mut(&(tenant.clone(), label.to_string())) {
            None => Ok(MarkOutcome::NotFound),
            Some(record) if record.status == PaymentStatus::Success => {
                Ok(MarkOutcome::AlreadySuccess)
            }
            Some(record) => {
                record.status = PaymentStatus::Success;
                record.updated_at = Utc::now();
                Ok(MarkOutcome::Transitioned)
            }
        }
    }

    async fn contains(&self, tenant: &TenantKey, label: &str) -> Result<bool> {
        let records = self.records.read().unwrap();
        Ok(records.contains_key(&(tenant.clone(), label.to_string())))
    }

    async fn get(&self, tenant: &TenantKey, label: &str) -> Result<Option<PaymentRecord>> {
        let records = self.records.read().unwrap();
        Ok(records.get(&(tenant.clone(), label.to_string())).cloned())
    }
}
