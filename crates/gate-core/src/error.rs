//! Error Types

use thiserror::Error;

/// Result type alias for configuration and registry operations
pub type Result<T> = std::result::Result<T, GateError>;

/// Gateway configuration errors
#[derive(Error, Debug)]
pub enum GateError {
    /// Missing or malformed configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tenant key failed validation
    #[error("Invalid tenant key: {0:?}")]
    InvalidTenantKey(String),

    /// Two slots resolved to the same tenant key
    #[error("Duplicate tenant key: {0:?}")]
    DuplicateTenantKey(String),

    /// No tenant slot was populated at all
    #[error("No tenants configured")]
    NoTenants,
}
