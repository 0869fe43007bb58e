//! Session Initiator
//!
//! Reacts to a beneficiary's "begin subscription" command: creates the
//! pending ledger entry, registers the label with the registration sink,
//! and only then shows the payment link. A failed registration aborts the
//! flow: the user must never hold a payment link the callback router
//! cannot later resolve.

use anyhow::Context;
use gate_core::TenantKey;
use gate_ledger::PaymentMethod;
use gate_payments::payment_link;
use serde_json::json;

use crate::state::AppState;
use crate::update::Update;

const START_COMMAND: &str = "/start";

/// Entry point for one dequeued chat update.
pub async fn handle_update(state: &AppState, tenant: &TenantKey, update: Update) {
    let Some(message) = update.message else {
        return;
    };
    let is_start = message
        .text
        .as_deref()
        .is_some_and(|t| t.trim_start().starts_with(START_COMMAND));
    if !is_start {
        return;
    }
    let Some(user) = message.from else {
        return;
    };

    let beneficiary = user.id.to_string();
    let chat_id = message.chat.id.to_string();
    tracing::info!(tenant = %tenant, beneficiary = %beneficiary, "Subscription command received");

    if let Err(e) = start_session(state, tenant, &beneficiary, &chat_id).await {
        tracing::error!(tenant = %tenant, error = %e, "Session initiation failed");
        if let Some(chat) = state.chat(tenant) {
            let _ = chat
                .send_message(&chat_id, "Server error, please try again later.")
                .await;
        }
    }
}

async fn start_session(
    state: &AppState,
    tenant_key: &TenantKey,
    beneficiary: &str,
    chat_id: &str,
) -> anyhow::Result<()> {
    let tenant = state
        .registry
        .get(tenant_key)
        .context("tenant missing from registry")?;
    let chat = state.chat(tenant_key).context("no chat client for tenant")?;

    let label = uuid::Uuid::new_v4().to_string();
    let username = chat.bot_username().await?;
    let link = payment_link(tenant, &label, beneficiary, &format!("https://t.me/{username}"));

    state
        .ledger
        .upsert_pending(tenant_key, &label, beneficiary, Some(PaymentMethod::Redirect))
        .await?;

    // Registration sink must acknowledge before the user sees the link.
    let register_url = format!("{}/register-payment/{}", state.host_url, tenant_key);
    let response = state
        .http
        .post(&register_url)
        .json(&json!({
            "label": label,
            "user_id": beneficiary,
            "payment_method": "yoomoney",
        }))
        .send()
        .await
        .context("registration sink unreachable")?;
    anyhow::ensure!(
        response.status().is_success(),
        "registration sink returned {}",
        response.status()
    );

    let offer = format!(
        "{}\n\nPay {} via the link below.",
        tenant.offer_text(),
        tenant.price
    );
    chat.send_message_with_button(chat_id, &offer, "Pay Now", &link)
        .await?;
    tracing::info!(tenant = %tenant_key, label = %label, "Payment link sent");

    // Optional second rail: crypto invoice for the same label. Failure here
    // is logged, not fatal; the redirect link is already out.
    if let (Some(crypto), Some(_)) = (&state.crypto, &tenant.crypto_secret) {
        match crypto.create_invoice("USDT", tenant.price, &label).await {
            Ok(invoice) => {
                let _ = chat
                    .send_message_with_button(
                        chat_id,
                        "Prefer crypto? Pay the same subscription in USDT:",
                        "Pay with USDT",
                        &invoice.pay_url,
                    )
                    .await;
            }
            Err(e) => {
                tracing::warn!(tenant = %tenant_key, label = %label, error = %e,
                    "Crypto invoice creation failed");
            }
        }
    }

    Ok(())
}
