//! # gate-payments
//!
//! Payment-processor integration for channel-gate.
//!
//! ## Redirect processor (signed)
//!
//! **Flow:** Bot sends a quickpay redirect link → user pays on the
//! processor's hosted page → processor POSTs a form-encoded notification to
//! the gateway.
//!
//! ```text
//! ┌──────────┐     ┌──────────────────┐     ┌──────────────┐
//! │   Bot    │────▶│  Hosted payment  │────▶│   Gateway    │
//! │ (paylink)│     │      page        │     │  (callback)  │
//! └──────────┘     └──────────────────┘     └──────────────┘
//! ```
//!
//! Notifications carry a SHA-1 digest over a fixed, ordered field set that
//! includes the tenant's shared secret ([`verify_notification`]). The order
//! and set are the processor's external contract and must not change.
//!
//! ## Crypto invoices (HMAC-hardened)
//!
//! The crypto processor's own callbacks are unsigned, so the gateway
//! requires an HMAC-SHA256 signature over the raw body, keyed by a
//! per-tenant secret ([`verify_crypto_signature`]). Tenants without that
//! secret have the crypto path disabled.

pub mod crypto;
pub mod error;
pub mod notification;
pub mod paylink;

pub use crypto::{
    CRYPTO_SIGNATURE_HEADER, CryptoCallback, CryptoInvoice, CryptoPayClient,
    verify_crypto_signature,
};
pub use error::{PaymentError, Result};
pub use notification::{ProcessorNotification, verify_notification};
pub use paylink::payment_link;
