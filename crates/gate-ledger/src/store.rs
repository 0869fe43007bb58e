//! Ledger Store Trait

use async_trait::async_trait;
use gate_core::TenantKey;

use crate::error::Result;
use crate::record::{PaymentMethod, PaymentRecord};

/// Outcome of [`LedgerStore::mark_success`], encoding the status the record
/// held immediately before the call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkOutcome {
    /// Record was pending and is now success; the caller owns the one-time
    /// side effect (invite issuance).
    Transitioned,

    /// Record was already success. A redelivered callback; do nothing.
    AlreadySuccess,

    /// No record under this label in this tenant's partition.
    NotFound,
}

/// Persistent payment ledger, partitioned by tenant.
///
/// The store is the exclusive owner of payment state: nothing else reads or
/// writes the persisted rows directly, and no caller may cache status across
/// requests.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert a pending record, or overwrite an existing one under the same
    /// label (beneficiary replaced, status reset to pending). Retried
    /// session-initiation requests hit this path and must not error.
    async fn upsert_pending(
        &self,
        tenant: &TenantKey,
        label: &str,
        beneficiary: &str,
        method: Option<PaymentMethod>,
    ) -> Result<()>;

    /// Beneficiary for a label, if the partition holds it. Pure read.
    async fn lookup_beneficiary(&self, tenant: &TenantKey, label: &str)
    -> Result<Option<String>>;

    /// Transition pending → success as an atomic compare-and-set. Two
    /// concurrent calls for the same label must not both observe
    /// [`MarkOutcome::Transitioned`].
    async fn mark_success(&self, tenant: &TenantKey, label: &str) -> Result<MarkOutcome>;

    /// Whether the tenant's partition holds this label. Used by the
    /// tenant resolver on the tenant-agnostic callback path.
    async fn contains(&self, tenant: &TenantKey, label: &str) -> Result<bool>;

    /// Full record, if present. Diagnostic read.
    async fn get(&self, tenant: &TenantKey, label: &str) -> Result<Option<PaymentRecord>>;
}
