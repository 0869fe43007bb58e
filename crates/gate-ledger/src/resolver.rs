//! Tenant Resolver
//!
//! The generic callback endpoint receives only a payment label; the
//! processor does not echo which tenant the payment belongs to. The
//! resolver scans every tenant partition for the label. O(tenants) per
//! callback, which is fine: tenant count is operator-bounded and callbacks
//! are rare next to normal traffic.

use std::sync::Arc;

use gate_core::{TenantKey, TenantRegistry};
use thiserror::Error;

use crate::error::LedgerError;
use crate::store::LedgerStore;

/// Resolution failures
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No tenant partition holds the label
    #[error("No tenant owns label {0:?}")]
    NotFound(String),

    /// More than one partition holds the label. Labels are random 128-bit
    /// identifiers, so this is an invariant violation to alarm on, never a
    /// case to settle by first match.
    #[error("Label {label:?} present in {} tenant partitions", owners.len())]
    Ambiguous {
        label: String,
        owners: Vec<TenantKey>,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Maps a bare payment label back to the tenant that owns it.
#[derive(Clone)]
pub struct TenantResolver {
    registry: Arc<TenantRegistry>,
    ledger: Arc<dyn LedgerStore>,
}

impl TenantResolver {
    pub fn new(registry: Arc<TenantRegistry>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self { registry, ledger }
    }

    /// Find the tenant whose partition holds `label`.
    ///
    /// Probes all partitions in registration order even after a hit, so a
    /// cross-tenant collision is detected instead of silently resolved.
    pub async fn resolve(&self, label: &str) -> Result<TenantKey, ResolveError> {
        let mut owners = Vec::new();
        for key in self.registry.keys() {
            if self.ledger.contains(key, label).await? {
                owners.push(key.clone());
            }
        }

        match owners.len() {
            0 => Err(ResolveError::NotFound(label.to_string())),
            1 => Ok(owners.remove(0)),
            _ => {
                tracing::error!(
                    label = %label,
                    owners = ?owners,
                    "Label owned by multiple tenants; refusing to resolve"
                );
                Err(ResolveError::Ambiguous {
                    label: label.to_string(),
                    owners,
                })
            }
        }
    }
}
