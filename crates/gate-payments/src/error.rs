//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Crypto-invoice API error
    #[error("Invoice API error: {0}")]
    InvoiceApi(String),

    /// Crypto-invoice API unreachable or timed out
    #[error("Invoice API unavailable: {0}")]
    InvoiceApiUnavailable(String),

    /// Invoice response missing expected fields
    #[error("Invoice parse error: {0}")]
    InvoiceParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InvoiceApiUnavailable(_))
    }
}
