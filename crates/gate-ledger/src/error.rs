//! Ledger Error Types

use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Underlying storage fault. The ledger never retries internally;
    /// callers surface this so the upstream delivery mechanism redelivers.
    /// Unknown persisted status values also land here, as decode errors.
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}
