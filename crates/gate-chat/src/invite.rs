//! Invite Issuer
//!
//! Creates the single-use, single-member invite link a paid beneficiary
//! receives. Callers must already have confirmed payment success; the
//! idempotency guard lives in the callback router, not here. Every call
//! produces a fresh link.

use std::time::Duration;

use crate::api::ChatApi;
use crate::error::{ChatError, Result};

const MAX_ATTEMPTS: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Invite creation with capability precheck and bounded retry.
#[derive(Clone, Debug)]
pub struct InviteIssuer {
    max_attempts: u32,
    retry_delay: Duration,
}

impl Default for InviteIssuer {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            retry_delay: RETRY_DELAY,
        }
    }
}

impl InviteIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a one-member invite link into `channel_id` for `beneficiary`.
    ///
    /// A missing invite permission fails immediately without retry (that is
    /// a configuration error, not a transient fault). Transient creation
    /// failures are retried up to the attempt bound with a fixed delay.
    pub async fn issue(
        &self,
        chat: &dyn ChatApi,
        channel_id: i64,
        beneficiary: &str,
    ) -> Result<String> {
        let channel = channel_id.to_string();

        if !chat.can_issue_invites(&channel).await? {
            tracing::error!(
                channel_id,
                "Bot lacks invite permission; check channel admin rights"
            );
            return Err(ChatError::NoInvitePermission);
        }

        let name = format!("User_{beneficiary}_invite");
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match chat.create_invite_link(&channel, 1, &name).await {
                Ok(link) => {
                    tracing::info!(channel_id, beneficiary = %beneficiary, "Invite link created");
                    return Ok(link);
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        channel_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Invite creation failed, will retry"
                    );
                    last_error = Some(e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| ChatError::Api("invite creation failed".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChat;

    #[tokio::test(start_paused = true)]
    async fn succeeds_first_try() {
        let chat = MockChat::new();
        let link = InviteIssuer::new().issue(&chat, -100, "555").await.unwrap();
        assert!(link.contains("User_555_invite"));
        assert_eq!(chat.invite_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures() {
        let chat = MockChat::new().with_transient_invite_failures(3);
        let link = InviteIssuer::new().issue(&chat, -100, "555").await;
        assert!(link.is_ok());
        assert_eq!(chat.invite_attempts(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_attempt_bound() {
        let chat = MockChat::new().with_transient_invite_failures(usize::MAX);
        let result = InviteIssuer::new().issue(&chat, -100, "555").await;
        assert!(matches!(result, Err(ChatError::Transient(_))));
        assert_eq!(chat.invite_attempts(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_permission_fails_without_retry() {
        let chat = MockChat::new().without_invite_permission();
        let result = InviteIssuer::new().issue(&chat, -100, "555").await;
        assert!(matches!(result, Err(ChatError::NoInvitePermission)));
        assert_eq!(chat.invite_attempts(), 0);
    }
}
