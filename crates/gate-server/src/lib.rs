//! channel-gate HTTP Server
//!
//! Axum-based gateway wiring the payment processors, the ledger, and the
//! chat platform together. Exposed as a library so integration tests can
//! drive the real [`axum::Router`].

pub mod handlers;
pub mod router;
pub mod session;
pub mod state;
pub mod update;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    bot_webhook, crypto_callback, health_check, payment_callback_generic, payment_callback_tenant,
    register_payment,
};
use crate::state::AppState;

/// Build the gateway router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/payment-callback", post(payment_callback_generic))
        .route("/payment-callback/{tenant}", post(payment_callback_tenant))
        .route("/crypto-callback/{tenant}", post(crypto_callback))
        .route("/register-payment/{tenant}", post(register_payment))
        .route("/health", get(health_check).post(health_check))
        .route("/bot-webhook/{tenant}", post(bot_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
