//! Mock Chat Client
//!
//! For tests. Records outbound calls and can be scripted to fail invite
//! creation a fixed number of times, fail it permanently, or report a
//! missing invite permission.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::api::ChatApi;
use crate::error::{ChatError, Result};

/// One recorded outbound message.
#[derive(Clone, Debug)]
pub struct SentMessage {
    pub chat_id: String,
    pub text: String,
    pub button_url: Option<String>,
}

/// In-memory [`ChatApi`] recorder.
#[derive(Default)]
pub struct MockChat {
    sent: Mutex<Vec<SentMessage>>,
    invite_attempts: AtomicUsize,
    /// Fail this many invite attempts with a transient error before
    /// succeeding. `usize::MAX` fails forever.
    transient_invite_failures: AtomicUsize,
    no_invite_permission: bool,
    username: String,
}

impl MockChat {
    pub fn new() -> Self {
        Self {
            username: "examplebot".into(),
            ..Self::default()
        }
    }

    /// Fail the first `n` invite attempts with a transient error.
    pub fn with_transient_invite_failures(self, n: usize) -> Self {
        self.transient_invite_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Report no invite permission from the capability probe.
    pub fn without_invite_permission(mut self) -> Self {
        self.no_invite_permission = true;
        self
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Total `create_invite_link` calls, including failed ones.
    pub fn invite_attempts(&self) -> usize {
        self.invite_attempts.load(Ordering::SeqCst)
    }

    fn record(&self, chat_id: &str, text: &str, button_url: Option<&str>) {
        self.sent.lock().unwrap().push(SentMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
            button_url: button_url.map(ToString::to_string),
        });
    }
}

#[async_trait]
impl ChatApi for MockChat {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        self.record(chat_id, text, None);
        Ok(())
    }

    async fn send_message_with_button(
        &self,
        chat_id: &str,
        text: &str,
        _button_text: &str,
        button_url: &str,
    ) -> Result<()> {
        self.record(chat_id, text, Some(button_url));
        Ok(())
    }

    async fn create_invite_link(
        &self,
        chat_id: &str,
        member_limit: u32,
        name: &str,
    ) -> Result<String> {
        let attempt = self.invite_attempts.fetch_add(1, Ordering::SeqCst);

        let remaining = self.transient_invite_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.transient_invite_failures
                    .store(remaining - 1, Ordering::SeqCst);
            }
            return Err(ChatError::Transient("scripted failure".into()));
        }

        Ok(format!(
            "https://t.me/+mock_{chat_id}_{member_limit}_{name}_{attempt}"
        ))
    }

    async fn can_issue_invites(&self, _chat_id: &str) -> Result<bool> {
        Ok(!self.no_invite_permission)
    }

    async fn bot_username(&self) -> Result<String> {
        Ok(self.username.clone())
    }

    async fn set_webhook(&self, _url: &str) -> Result<()> {
        Ok(())
    }

    async fn delete_webhook(&self) -> Result<()> {
        Ok(())
    }
}
