//! Callback Router
//!
//! Drives a payment label through its state machine
//! (`NoRecord → Pending → Succeeded`) when the processor reports funds.
//! `mark_success` is the idempotency gate: only the caller that observes
//! the pending → success transition issues the invite, so at-least-once
//! callback delivery can never produce two invites for one label.

use axum::Json;
use axum::http::StatusCode;
use gate_core::{Tenant, TenantKey};
use gate_ledger::{LedgerError, MarkOutcome};

use crate::handlers::ErrorResponse;
use crate::state::AppState;

const CONFIRMED_TEXT: &str = "Payment confirmed! Access granted.";
const FALLBACK_TEXT: &str =
    "We could not create your channel link. Please contact support.";

pub type CallbackError = (StatusCode, Json<ErrorResponse>);

/// Map a ledger fault to a 500 so the processor's own retry redelivers.
pub fn storage_error(e: &LedgerError) -> CallbackError {
    tracing::error!(error = %e, "Ledger fault during callback processing");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Storage unavailable".into(),
            code: "STORAGE_ERROR".into(),
        }),
    )
}

pub fn client_error(code: &str, message: impl Into<String>) -> CallbackError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
            code: code.into(),
        }),
    )
}

/// Settle a verified incoming-funds report for `label`.
///
/// Returns 200 in every non-fault case: an unknown label or a repeated
/// delivery is terminal from the processor's point of view; retrying the
/// callback would not change the outcome. Invite failure after the ledger
/// transition does not roll the payment back; the beneficiary gets the
/// contact-support fallback and resolving the invite is a manual follow-up.
pub async fn settle_payment(
    state: &AppState,
    tenant_key: &TenantKey,
    tenant: &Tenant,
    label: &str,
) -> Result<StatusCode, CallbackError> {
    let beneficiary = state
        .ledger
        .lookup_beneficiary(tenant_key, label)
        .await
        .map_err(|e| storage_error(&e))?;
    let Some(beneficiary) = beneficiary else {
        tracing::error!(tenant = %tenant_key, label = %label,
            "Verified callback for a label the ledger does not hold");
        return Ok(StatusCode::OK);
    };

    match state
        .ledger
        .mark_success(tenant_key, label)
        .await
        .map_err(|e| storage_error(&e))?
    {
        MarkOutcome::Transitioned => {}
        MarkOutcome::AlreadySuccess => {
            tracing::info!(tenant = %tenant_key, label = %label,
                "Duplicate delivery for settled payment, skipping invite");
            return Ok(StatusCode::OK);
        }
        MarkOutcome::NotFound => {
            tracing::error!(tenant = %tenant_key, label = %label,
                "Record vanished between lookup and transition");
            return Ok(StatusCode::OK);
        }
    }

    let Some(chat) = state.chat(tenant_key) else {
        tracing::error!(tenant = %tenant_key, "No chat client for tenant");
        return Ok(StatusCode::OK);
    };

    if let Err(e) = chat.send_message(&beneficiary, CONFIRMED_TEXT).await {
        tracing::warn!(tenant = %tenant_key, error = %e, "Confirmation message failed");
    }

    match state
        .invites
        .issue(chat.as_ref(), tenant.channel_id, &beneficiary)
        .await
    {
        Ok(link) => {
            let text = format!("Join the private channel: {link}");
            if let Err(e) = chat.send_message(&beneficiary, &text).await {
                tracing::error!(tenant = %tenant_key, error = %e, "Invite delivery failed");
            }
            tracing::info!(tenant = %tenant_key, label = %label, "Payment settled, invite sent");
        }
        Err(e) => {
            tracing::error!(tenant = %tenant_key, label = %label, error = %e,
                "Invite issuance failed after settled payment");
            if let Err(e) = chat.send_message(&beneficiary, FALLBACK_TEXT).await {
                tracing::error!(tenant = %tenant_key, error = %e, "Fallback message failed");
            }
        }
    }

    Ok(StatusCode::OK)
}
