//! Chat API Trait

use async_trait::async_trait;

use crate::error::Result;

/// The slice of a chat-platform Bot API the gateway depends on.
///
/// Chat identifiers are opaque strings: beneficiary identities come in as
/// strings from updates, and channel ids are stringified by callers.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send a plain text message.
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()>;

    /// Send a message with a single inline URL button.
    async fn send_message_with_button(
        &self,
        chat_id: &str,
        text: &str,
        button_text: &str,
        button_url: &str,
    ) -> Result<()>;

    /// Create an invite link admitting `member_limit` members, tagged with
    /// a human-readable name for audit traceability.
    async fn create_invite_link(
        &self,
        chat_id: &str,
        member_limit: u32,
        name: &str,
    ) -> Result<String>;

    /// Whether the bot can create invite links in the chat.
    async fn can_issue_invites(&self, chat_id: &str) -> Result<bool>;

    /// The bot's public username, used for deep links.
    async fn bot_username(&self) -> Result<String>;

    /// Register the inbound-update callback URL.
    async fn set_webhook(&self, url: &str) -> Result<()>;

    /// Drop the registered callback URL and any queued updates.
    async fn delete_webhook(&self) -> Result<()>;
}
