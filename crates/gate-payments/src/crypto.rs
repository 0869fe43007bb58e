//! Crypto Invoice Integration
//!
//! Optional second payment rail: a hosted crypto-invoice API. Invoices are
//! created with the payment label as their payload so the callback can be
//! matched back to the ledger record.
//!
//! The processor's own callbacks carry no signature, so the gateway
//! requires an HMAC-SHA256 hex signature over the raw request body, keyed
//! by the tenant's crypto secret.

use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

use crate::error::{PaymentError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC signature of the callback body.
pub const CRYPTO_SIGNATURE_HEADER: &str = "x-gateway-signature";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Invoice statuses in the crypto processor's vocabulary.
pub const INVOICE_STATUS_PAID: &str = "paid";

/// Client for the crypto-invoice creation API.
pub struct CryptoPayClient {
    http: Client,
    base_url: String,
    api_token: String,
}

impl CryptoPayClient {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PaymentError::Config(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_token: api_token.into(),
        })
    }

    /// Create an invoice carrying the payment label as its payload.
    pub async fn create_invoice(
        &self,
        asset: &str,
        amount: Decimal,
        payload: &str,
    ) -> Result<CryptoInvoice> {
        let url = format!("{}/api/createInvoice", self.base_url.trim_end_matches('/'));
        let request = CreateInvoiceRequest {
            asset,
            amount,
            payload,
        };

        let response = self
            .http
            .post(&url)
            .header("Crypto-Pay-API-Token", &self.api_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| PaymentError::InvoiceApiUnavailable(e.to_string()))?;

        let envelope: InvoiceEnvelope = response
            .json()
            .await
            .map_err(|e| PaymentError::InvoiceParse(e.to_string()))?;

        if !envelope.ok {
            return Err(PaymentError::InvoiceApi(
                envelope.error.unwrap_or_else(|| "unknown error".into()),
            ));
        }
        envelope
            .result
            .ok_or_else(|| PaymentError::InvoiceParse("missing result".into()))
    }
}

#[derive(Serialize)]
struct CreateInvoiceRequest<'a> {
    asset: &'a str,
    amount: Decimal,
    payload: &'a str,
}

#[derive(Deserialize)]
struct InvoiceEnvelope {
    ok: bool,
    result: Option<CryptoInvoice>,
    error: Option<String>,
}

/// A created invoice.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CryptoInvoice {
    pub invoice_id: i64,
    pub pay_url: String,
}

/// Crypto processor callback body, keyed by invoice id; `payload` carries
/// the payment label the invoice was created with.
#[derive(Clone, Debug, Deserialize)]
pub struct CryptoCallback {
    pub invoice_id: i64,
    pub status: String,
    pub payload: Option<String>,
}

impl CryptoCallback {
    pub fn is_paid(&self) -> bool {
        self.status == INVOICE_STATUS_PAID
    }
}

/// Verify the HMAC-SHA256 hex signature of a crypto callback body.
pub fn verify_crypto_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = hex::encode(mac.finalize().into_bytes());

    let matched = computed == signature_hex;
    if !matched {
        tracing::warn!("Crypto callback signature mismatch (possible tampering)");
    }
    matched
}
