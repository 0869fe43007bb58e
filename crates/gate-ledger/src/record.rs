//! Payment Records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payment lifecycle status. Transitions are monotonic: pending → success
/// exactly once; records are never deleted by this subsystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
        }
    }
}

/// How the payment was (or will be) settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum PaymentMethod {
    /// Redirect payment processor
    #[serde(rename = "yoomoney")]
    #[sqlx(rename = "yoomoney")]
    Redirect,

    /// Crypto invoice settled in USDT
    #[serde(rename = "crypto_usdt")]
    #[sqlx(rename = "crypto_usdt")]
    CryptoUsdt,
}

/// One payment attempt, keyed by its opaque label within a tenant partition.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentRecord {
    /// Generator-assigned opaque token (UUID in practice)
    pub label: String,

    /// Chat-platform user entitled to access on success
    pub beneficiary: String,

    pub status: PaymentStatus,

    pub payment_method: Option<PaymentMethod>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Fresh pending record.
    pub fn pending(
        label: impl Into<String>,
        beneficiary: impl Into<String>,
        method: Option<PaymentMethod>,
    ) -> Self {
        let now = Utc::now();
        Self {
            label: label.into(),
            beneficiary: beneficiary.into(),
            status: PaymentStatus::Pending,
            payment_method: method,
            created_at: now,
            updated_at: now,
        }
    }
}
