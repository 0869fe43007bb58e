//! Gateway Configuration
//!
//! Tenants come from numbered environment slots (`TENANT_1_*` ..
//! `TENANT_16_*`). A slot without a `TOKEN` variable is unused; any other
//! malformed value in a populated slot aborts startup rather than silently
//! defaulting.

use rust_decimal::Decimal;

use crate::error::{GateError, Result};
use crate::tenant::{Tenant, TenantKey, TenantRegistry};

/// Highest tenant slot number scanned.
pub const MAX_TENANT_SLOTS: usize = 16;

/// Process-wide configuration.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Public base URL the processor and chat platform call back to
    pub host_url: String,

    /// Socket address to bind the HTTP server on
    pub bind_addr: String,

    /// SQLite database URL
    pub database_url: String,

    /// Registered tenants, in slot order
    pub registry: TenantRegistry,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let host_url = std::env::var("HOST_URL")
            .map_err(|_| GateError::Config("HOST_URL not set".into()))?;
        let host_url = host_url.trim_end_matches('/').to_string();

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://gateway.db".into());

        let mut registry = TenantRegistry::new();
        for slot in 1..=MAX_TENANT_SLOTS {
            let prefix = format!("TENANT_{slot}_");
            let Ok(token) = std::env::var(format!("{prefix}TOKEN")) else {
                continue;
            };
            let key = TenantKey::new(
                std::env::var(format!("{prefix}KEY")).unwrap_or_else(|_| format!("tenant{slot}")),
            )?;
            registry.register(key, Self::load_slot(&prefix, token)?)?;
        }

        if registry.is_empty() {
            return Err(GateError::NoTenants);
        }

        tracing::info!(tenants = registry.len(), "Configuration loaded");
        Ok(Self {
            host_url,
            bind_addr,
            database_url,
            registry,
        })
    }

    fn load_slot(prefix: &str, token: String) -> Result<Tenant> {
        let required = |name: &str| {
            std::env::var(format!("{prefix}{name}"))
                .map_err(|_| GateError::Config(format!("{prefix}{name} not set")))
        };

        let price_raw = required("PRICE")?;
        let price: Decimal = price_raw
            .parse()
            .map_err(|_| GateError::Config(format!("{prefix}PRICE is not a decimal: {price_raw}")))?;

        let channel_raw = required("CHANNEL_ID")?;
        let channel_id: i64 = channel_raw.parse().map_err(|_| {
            GateError::Config(format!("{prefix}CHANNEL_ID is not an integer: {channel_raw}"))
        })?;

        Ok(Tenant {
            bot_token: token,
            receiver: required("RECEIVER")?,
            notification_secret: required("NOTIFICATION_SECRET")?,
            channel_id,
            price,
            description: std::env::var(format!("{prefix}DESCRIPTION"))
                .unwrap_or_else(|_| "Subscription: {price}".into()),
            crypto_secret: std::env::var(format!("{prefix}CRYPTO_SECRET")).ok(),
        })
    }
}
