//! Inbound Chat Updates
//!
//! The webhook handler only validates and enqueues; a fixed pool of workers
//! consumes the queue. The shared state carries only a weak sender, so the
//! bootstrap's strong sender is the last one alive: dropping it at shutdown
//! closes the queue and the workers drain what is left and stop.

use gate_core::TenantKey;
use serde::Deserialize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::session;
use crate::state::AppState;

/// Bounded depth of the update queue.
pub const UPDATE_QUEUE_DEPTH: usize = 64;

/// Number of update workers.
pub const UPDATE_WORKERS: usize = 4;

/// Chat-platform update, reduced to the fields the gateway reacts to.
#[derive(Clone, Debug, Deserialize)]
pub struct Update {
    pub message: Option<IncomingMessage>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct IncomingMessage {
    pub text: Option<String>,
    pub from: Option<UpdateUser>,
    pub chat: UpdateChat,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateUser {
    pub id: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateChat {
    pub id: i64,
}

/// One queued unit of work.
#[derive(Clone, Debug)]
pub struct UpdateJob {
    pub tenant: TenantKey,
    pub update: Update,
}

/// Spawn the update worker pool over a shared receiver.
pub fn spawn_workers(
    state: AppState,
    receiver: mpsc::Receiver<UpdateJob>,
    workers: usize,
) -> Vec<JoinHandle<()>> {
    let receiver = std::sync::Arc::new(Mutex::new(receiver));

    (0..workers)
        .map(|worker| {
            let state = state.clone();
            let receiver = std::sync::Arc::clone(&receiver);
            tokio::spawn(async move {
                loop {
                    let job = receiver.lock().await.recv().await;
                    match job {
                        Some(job) => {
                            session::handle_update(&state, &job.tenant, job.update).await;
                        }
                        // All senders dropped: shutdown.
                        None => break,
                    }
                }
                tracing::debug!(worker, "Update worker stopped");
            })
        })
        .collect()
}
