//! # gate-ledger
//!
//! Persistent payment ledger for channel-gate.
//!
//! The ledger is the only owner of persisted payment state. All mutation
//! goes through two operations: [`LedgerStore::upsert_pending`] and
//! [`LedgerStore::mark_success`]. The latter is an atomic compare-and-set,
//! which is what keeps invite issuance single-shot under the at-least-once
//! delivery payment processors give us.

pub mod error;
pub mod memory;
pub mod record;
pub mod resolver;
pub mod sqlite;
pub mod store;

pub use error::{LedgerError, Result};
pub use memory::MemoryLedger;
pub use record::{PaymentMethod, PaymentRecord, PaymentStatus};
pub use resolver::{ResolveError, TenantResolver};
pub use sqlite::SqliteLedger;
pub use store::{LedgerStore, MarkOutcome};
