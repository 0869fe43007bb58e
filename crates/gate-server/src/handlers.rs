//! HTTP Handlers

use axum::body::Bytes;
use axum::extract::{Form, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use gate_core::TenantKey;
use gate_ledger::{PaymentMethod, ResolveError};
use gate_payments::{
    CRYPTO_SIGNATURE_HEADER, CryptoCallback, ProcessorNotification, verify_crypto_signature,
    verify_notification,
};
use serde::{Deserialize, Serialize};

use crate::router::{CallbackError, client_error, settle_payment, storage_error};
use crate::state::AppState;
use crate::update::{Update, UpdateJob};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub tenants: usize,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPaymentRequest {
    pub label: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

/// Liveness probe. Always 200.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        tenants: state.registry.len(),
    })
}

fn parse_tenant(state: &AppState, raw: &str) -> Result<TenantKey, CallbackError> {
    let key = TenantKey::new(raw)
        .map_err(|_| client_error("UNKNOWN_TENANT", format!("Unknown tenant: {raw}")))?;
    if state.registry.get(&key).is_some() {
        Ok(key)
    } else {
        Err(client_error("UNKNOWN_TENANT", format!("Unknown tenant: {raw}")))
    }
}

fn notification_label(notification: &ProcessorNotification) -> Result<String, CallbackError> {
    notification
        .label
        .as_deref()
        .filter(|l| !l.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| client_error("MISSING_LABEL", "No label provided"))
}

/// Generic processor callback: the payload carries no tenant context, so
/// the label is resolved against every tenant partition first.
pub async fn payment_callback_generic(
    State(state): State<AppState>,
    Form(notification): Form<ProcessorNotification>,
) -> Result<StatusCode, CallbackError> {
    let label = notification_label(&notification)?;

    let tenant_key = match state.resolver.resolve(&label).await {
        Ok(key) => key,
        Err(ResolveError::NotFound(_)) => {
            return Err(client_error("TENANT_NOT_FOUND", "No tenant owns this label"));
        }
        Err(ResolveError::Ambiguous { .. }) => {
            return Err(client_error(
                "AMBIGUOUS_LABEL",
                "Label owned by multiple tenants",
            ));
        }
        Err(ResolveError::Ledger(e)) => return Err(storage_error(&e)),
    };

    process_processor_callback(&state, &tenant_key, &label, &notification).await
}

/// Tenant-scoped processor callback: identical protocol, tenant from URL.
pub async fn payment_callback_tenant(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Form(notification): Form<ProcessorNotification>,
) -> Result<StatusCode, CallbackError> {
    let tenant_key = parse_tenant(&state, &tenant)?;
    let label = notification_label(&notification)?;
    process_processor_callback(&state, &tenant_key, &label, &notification).await
}

async fn process_processor_callback(
    state: &AppState,
    tenant_key: &TenantKey,
    label: &str,
    notification: &ProcessorNotification,
) -> Result<StatusCode, CallbackError> {
    // parse_tenant / the resolver guarantee the tenant exists.
    let Some(tenant) = state.registry.get(tenant_key) else {
        return Err(client_error("UNKNOWN_TENANT", "Unknown tenant"));
    };

    if !verify_notification(&tenant.notification_secret, notification) {
        tracing::warn!(tenant = %tenant_key, label = %label,
            "Rejected callback with bad digest");
        return Err(client_error("BAD_SIGNATURE", "Hash verification failed"));
    }

    if !notification.is_incoming_funds() {
        tracing::debug!(tenant = %tenant_key,
            notification_type = notification.notification_type.as_deref().unwrap_or(""),
            "Ignoring non-incoming notification");
        return Ok(StatusCode::OK);
    }

    settle_payment(state, tenant_key, tenant, label).await
}

/// Crypto processor callback. The processor itself signs nothing, so the
/// gateway requires an HMAC-SHA256 signature over the raw body keyed by the
/// tenant's crypto secret; tenants without that secret reject the path.
pub async fn crypto_callback(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, CallbackError> {
    let tenant_key = parse_tenant(&state, &tenant)?;
    let tenant = state
        .registry
        .get(&tenant_key)
        .ok_or_else(|| client_error("UNKNOWN_TENANT", "Unknown tenant"))?;

    let Some(secret) = tenant.crypto_secret.as_deref() else {
        return Err(client_error(
            "CRYPTO_DISABLED",
            "Crypto payments not enabled for tenant",
        ));
    };

    let signature = headers
        .get(CRYPTO_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| client_error("MISSING_SIGNATURE", "Missing callback signature"))?;
    if !verify_crypto_signature(secret, &body, signature) {
        tracing::warn!(tenant = %tenant_key, "Rejected crypto callback with bad signature");
        return Err(client_error("BAD_SIGNATURE", "Signature verification failed"));
    }

    let callback: CryptoCallback = serde_json::from_slice(&body)
        .map_err(|e| client_error("BAD_PAYLOAD", format!("Malformed callback body: {e}")))?;

    if !callback.is_paid() {
        tracing::debug!(tenant = %tenant_key, invoice_id = callback.invoice_id,
            status = %callback.status, "Ignoring non-paid invoice status");
        return Ok(StatusCode::OK);
    }

    let label = callback
        .payload
        .as_deref()
        .filter(|l| !l.is_empty())
        .ok_or_else(|| client_error("MISSING_LABEL", "Invoice carries no label"))?;

    settle_payment(&state, &tenant_key, tenant, label).await
}

/// Session registration sink: idempotent pending upsert.
pub async fn register_payment(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Json(request): Json<RegisterPaymentRequest>,
) -> Result<StatusCode, CallbackError> {
    let tenant_key = parse_tenant(&state, &tenant)?;

    let (Some(label), Some(user_id)) = (request.label.as_deref(), request.user_id.as_deref())
    else {
        return Err(client_error("MISSING_DATA", "Missing label or user_id"));
    };
    if label.is_empty() || user_id.is_empty() {
        return Err(client_error("MISSING_DATA", "Missing label or user_id"));
    }

    state
        .ledger
        .upsert_pending(&tenant_key, label, user_id, request.payment_method)
        .await
        .map_err(|e| storage_error(&e))?;

    Ok(StatusCode::OK)
}

/// Inbound chat-platform update: validate the tenant and enqueue for the
/// worker pool. Acknowledges immediately.
pub async fn bot_webhook(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Json(update): Json<Update>,
) -> Result<StatusCode, CallbackError> {
    let tenant_key = parse_tenant(&state, &tenant)?;

    let queue_unavailable = |detail: &str| {
        tracing::error!(tenant = %tenant, detail, "Update queue unavailable");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Update queue unavailable".into(),
                code: "QUEUE_FULL".into(),
            }),
        )
    };

    // The strong sender lives in the bootstrap; upgrade fails only during
    // shutdown.
    let sender = state
        .updates
        .upgrade()
        .ok_or_else(|| queue_unavailable("queue closed"))?;
    sender
        .try_send(UpdateJob {
            tenant: tenant_key,
            update,
        })
        .map_err(|e| queue_unavailable(&e.to_string()))?;

    Ok(StatusCode::OK)
}
