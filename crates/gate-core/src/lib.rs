//! # gate-core
//!
//! Tenant model and configuration for the channel-gate payment gateway.
//!
//! A *tenant* is one independently configured bot/channel/payment-account
//! unit. Tenants are loaded once at startup from numbered environment slots
//! and are immutable afterwards; everything downstream receives them through
//! the read-only [`TenantRegistry`].

pub mod config;
pub mod error;
pub mod tenant;

pub use config::GatewayConfig;
pub use error::{GateError, Result};
pub use tenant::{Tenant, TenantKey, TenantRegistry};
