//! Gateway Bootstrap
//!
//! Loads tenants, opens the ledger, registers chat webhooks, and serves the
//! HTTP surface. Any startup failure aborts: a partially configured gateway
//! would drop payment callbacks silently.

use std::collections::HashMap;
use std::sync::Arc;

use gate_chat::{ChatApi, InviteIssuer, TelegramChat};
use gate_core::GatewayConfig;
use gate_ledger::{LedgerStore, SqliteLedger, TenantResolver};
use gate_payments::CryptoPayClient;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gate_server::state::AppState;
use gate_server::update::{UPDATE_QUEUE_DEPTH, UPDATE_WORKERS, spawn_workers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = GatewayConfig::from_env()?;
    let registry = Arc::new(config.registry.clone());

    // Open the ledger
    let ledger: Arc<dyn LedgerStore> = Arc::new(SqliteLedger::connect(&config.database_url).await?);
    tracing::info!(database = %config.database_url, "Ledger connected");

    // One chat client per tenant
    let mut chats: HashMap<_, Arc<dyn ChatApi>> = HashMap::new();
    for (key, tenant) in registry.iter() {
        chats.insert(key.clone(), Arc::new(TelegramChat::new(&tenant.bot_token)?));
        tracing::info!(tenant = %key, "Chat client ready");
    }

    // Optional crypto-invoice rail
    let crypto = match (
        std::env::var("CRYPTO_API_URL"),
        std::env::var("CRYPTO_API_TOKEN"),
    ) {
        (Ok(url), Ok(token)) => {
            tracing::info!("Crypto invoices configured");
            Some(Arc::new(CryptoPayClient::new(url, token)?))
        }
        _ => {
            tracing::warn!("Crypto invoices not configured (CRYPTO_API_URL / CRYPTO_API_TOKEN)");
            None
        }
    };

    // Register webhooks; a tenant whose webhook cannot be set would never
    // receive updates, so failure aborts startup.
    for (key, _) in registry.iter() {
        let chat = &chats[key];
        chat.delete_webhook().await?;
        chat.set_webhook(&format!("{}/bot-webhook/{}", config.host_url, key))
            .await?;
    }

    let (update_tx, update_rx) = mpsc::channel(UPDATE_QUEUE_DEPTH);

    let state = AppState {
        registry: Arc::clone(&registry),
        ledger: Arc::clone(&ledger),
        resolver: TenantResolver::new(Arc::clone(&registry), ledger),
        chats: Arc::new(chats),
        invites: InviteIssuer::new(),
        crypto,
        http: reqwest::Client::new(),
        host_url: config.host_url.clone(),
        updates: update_tx.downgrade(),
    };

    let workers = spawn_workers(state.clone(), update_rx, UPDATE_WORKERS);
    let app = gate_server::app(state.clone());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, tenants = registry.len(), "Gateway running");
    tracing::info!("Endpoints:");
    tracing::info!("  POST /payment-callback            - generic processor callback");
    tracing::info!("  POST /payment-callback/{{tenant}}   - tenant-scoped callback");
    tracing::info!("  POST /crypto-callback/{{tenant}}    - crypto processor callback");
    tracing::info!("  POST /register-payment/{{tenant}}   - session registration sink");
    tracing::info!("  POST /bot-webhook/{{tenant}}        - chat-platform updates");
    tracing::info!("  GET  /health                      - liveness");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The bootstrap holds the only strong sender; dropping it closes the
    // queue, and the workers drain what is left and stop.
    drop(update_tx);
    for worker in workers {
        let _ = worker.await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
