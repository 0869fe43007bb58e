//! Tenant Model
//!
//! One tenant per bot/channel/payment-account unit. The registry is built
//! once at startup and read-only afterwards, so it needs no locking.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{GateError, Result};

/// Stable, unique identifier for a tenant.
///
/// Keys end up in URL paths and database rows, so they are restricted to
/// ASCII alphanumerics plus `_` and `-` at construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantKey(String);

impl TenantKey {
    /// Validate and wrap a raw key.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(key))
        } else {
            Err(GateError::InvalidTenantKey(key))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-tenant configuration, immutable after load.
#[derive(Clone, Debug)]
pub struct Tenant {
    /// Chat-platform bot credential
    pub bot_token: String,

    /// Payment-processor receiver account
    pub receiver: String,

    /// Shared secret for processor notification digests
    pub notification_secret: String,

    /// Restricted channel the tenant sells access to
    pub channel_id: i64,

    /// Subscription price
    pub price: Decimal,

    /// Offer description template with a `{price}` placeholder
    pub description: String,

    /// Shared secret for the crypto-invoice callback path.
    /// None disables crypto payments for this tenant.
    pub crypto_secret: Option<String>,
}

impl Tenant {
    /// Render the offer description with the price substituted in.
    pub fn offer_text(&self) -> String {
        self.description.replace("{price}", &self.price.to_string())
    }
}

/// Ordered, read-only map of tenant key to tenant.
///
/// Iteration order is registration (slot) order, which the tenant resolver
/// relies on for deterministic scans.
#[derive(Clone, Debug, Default)]
pub struct TenantRegistry {
    entries: Vec<(TenantKey, Tenant)>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tenant. Fails on duplicate keys.
    pub fn register(&mut self, key: TenantKey, tenant: Tenant) -> Result<()> {
        if self.get(&key).is_some() {
            return Err(GateError::DuplicateTenantKey(key.as_str().to_string()));
        }
        self.entries.push((key, tenant));
        Ok(())
    }

    pub fn get(&self, key: &TenantKey) -> Option<&Tenant> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, t)| t)
    }

    /// Tenants in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&TenantKey, &Tenant)> {
        self.entries.iter().map(|(k, t)| (k, t))
    }

    /// Tenant keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &TenantKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn tenant() -> Tenant {
        Tenant {
            bot_token: "123:abc".into(),
            receiver: "410011000000000".into(),
            notification_secret: "secret".into(),
            channel_id: -1_002_000_000_000,
            price: Decimal::new(60_000, 2),
            description: "Access for {price} RUB".into(),
            crypto_secret: None,
        }
    }

    #[test]
    fn key_validation() {
        assert!(TenantKey::new("bot1").is_ok());
        assert!(TenantKey::new("bot_1-a").is_ok());
        assert!(TenantKey::new("").is_err());
        assert!(TenantKey::new("bot/../etc").is_err());
        assert!(TenantKey::new("bot; DROP TABLE payments").is_err());
    }

    #[test]
    fn registry_preserves_order_and_rejects_duplicates() {
        let mut registry = TenantRegistry::new();
        for key in ["b", "a", "c"] {
            registry
                .register(TenantKey::new(key).unwrap(), tenant())
                .unwrap();
        }
        let keys: Vec<_> = registry.keys().map(TenantKey::as_str).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);

        let err = registry.register(TenantKey::new("a").unwrap(), tenant());
        assert!(matches!(err, Err(GateError::DuplicateTenantKey(_))));
    }

    #[test]
    fn offer_text_substitutes_price() {
        let t = tenant();
        assert_eq!(t.offer_text(), "Access for 600.00 RUB");
    }
}
