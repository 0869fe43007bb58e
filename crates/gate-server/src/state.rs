//! Application State

use std::collections::HashMap;
use std::sync::Arc;

use gate_chat::{ChatApi, InviteIssuer};
use gate_core::{TenantKey, TenantRegistry};
use gate_ledger::{LedgerStore, TenantResolver};
use gate_payments::CryptoPayClient;
use tokio::sync::mpsc;

use crate::update::UpdateJob;

/// Shared application state.
///
/// Tenant-scoped collaborators are explicit maps keyed by [`TenantKey`];
/// nothing lives in module-level globals, so tests can assemble isolated
/// states per tenant.
#[derive(Clone)]
pub struct AppState {
    /// Read-only tenant registry
    pub registry: Arc<TenantRegistry>,

    /// The only owner of persisted payment state
    pub ledger: Arc<dyn LedgerStore>,

    /// Label → tenant resolution for the generic callback path
    pub resolver: TenantResolver,

    /// One chat client per tenant (per-tenant bot credential)
    pub chats: Arc<HashMap<TenantKey, Arc<dyn ChatApi>>>,

    /// Invite creation policy (capability precheck + bounded retry)
    pub invites: InviteIssuer,

    /// Crypto-invoice client (None if not configured)
    pub crypto: Option<Arc<CryptoPayClient>>,

    /// Client for the registration-sink self-call
    pub http: reqwest::Client,

    /// Public base URL of this gateway
    pub host_url: String,

    /// Inbound chat updates, consumed by the worker pool. Weak: the
    /// bootstrap owns the strong sender, so worker tasks holding state
    /// clones cannot keep the queue open past shutdown.
    pub updates: mpsc::WeakSender<UpdateJob>,
}

impl AppState {
    pub fn chat(&self, tenant: &TenantKey) -> Option<Arc<dyn ChatApi>> {
        self.chats.get(tenant).cloned()
    }
}
