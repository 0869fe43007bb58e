//! Telegram Bot API Client
//!
//! Thin reqwest client over `https://api.telegram.org/bot{token}/METHOD`.
//! Every response arrives in the `{ ok, result, description }` envelope;
//! `ok: false` maps to [`ChatError::Api`], while HTTP 429/5xx and transport
//! failures map to [`ChatError::Transient`] so the invite issuer can retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::api::ChatApi;
use crate::error::{ChatError, Result};

const API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Telegram Bot API client for one bot credential.
pub struct TelegramChat {
    http: Client,
    base_url: String,
    token: String,
}

impl TelegramChat {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(API_BASE, token)
    }

    /// Point the client at a different API host (tests).
    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChatError::Config(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        let url = format!(
            "{}/bot{}/{}",
            self.base_url.trim_end_matches('/'),
            self.token,
            method
        );

        let response = self
            .http
            .post(&url)
            .json(&params)
            .send()
            .await
            .map_err(|e| ChatError::Transient(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(ChatError::Transient(format!("{method} returned {status}")));
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;

        if envelope.ok {
            envelope
                .result
                .ok_or_else(|| ChatError::Parse(format!("{method}: ok without result")))
        } else {
            Err(ChatError::Api(
                envelope
                    .description
                    .unwrap_or_else(|| format!("{method} failed")),
            ))
        }
    }

    async fn bot_id(&self) -> Result<i64> {
        let me: BotInfo = self.call("getMe", json!({})).await?;
        Ok(me.id)
    }
}

#[async_trait]
impl ChatApi for TelegramChat {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await?;
        Ok(())
    }

    async fn send_message_with_button(
        &self,
        chat_id: &str,
        text: &str,
        button_text: &str,
        button_url: &str,
    ) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                json!({
                    "chat_id": chat_id,
                    "text": text,
                    "reply_markup": {
                        "inline_keyboard": [[{ "text": button_text, "url": button_url }]]
                    }
                }),
            )
            .await?;
        Ok(())
    }

    async fn create_invite_link(
        &self,
        chat_id: &str,
        member_limit: u32,
        name: &str,
    ) -> Result<String> {
        let link: InviteLink = self
            .call(
                "createChatInviteLink",
                json!({ "chat_id": chat_id, "member_limit": member_limit, "name": name }),
            )
            .await?;
        Ok(link.invite_link)
    }

    async fn can_issue_invites(&self, chat_id: &str) -> Result<bool> {
        let bot_id = self.bot_id().await?;
        let member: ChatMember = self
            .call(
                "getChatMember",
                json!({ "chat_id": chat_id, "user_id": bot_id }),
            )
            .await?;

        let can = match member.status.as_str() {
            "creator" => true,
            "administrator" => member.can_invite_users.unwrap_or(false),
            _ => false,
        };
        Ok(can)
    }

    async fn bot_username(&self) -> Result<String> {
        let me: BotInfo = self.call("getMe", json!({})).await?;
        me.username
            .ok_or_else(|| ChatError::Parse("getMe: bot has no username".into()))
    }

    async fn set_webhook(&self, url: &str) -> Result<()> {
        let _: serde_json::Value = self.call("setWebhook", json!({ "url": url })).await?;
        tracing::info!(url = %url, "Webhook registered");
        Ok(())
    }

    async fn delete_webhook(&self) -> Result<()> {
        let _: serde_json::Value = self
            .call("deleteWebhook", json!({ "drop_pending_updates": true }))
            .await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct BotInfo {
    id: i64,
    username: Option<String>,
}

#[derive(Deserialize)]
struct InviteLink {
    invite_link: String,
}

#[derive(Deserialize)]
struct ChatMember {
    status: String,
    can_invite_users: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_parses_error_shape() {
        let raw = r#"{"ok":false,"description":"Bad Request: chat not found"}"#;
        let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_str(raw).unwrap();
        assert!(!envelope.ok);
        assert_eq!(
            envelope.description.as_deref(),
            Some("Bad Request: chat not found")
        );
    }

    #[test]
    fn chat_member_parses_admin_rights() {
        let raw = r#"{"status":"administrator","can_invite_users":true}"#;
        let member: ChatMember = serde_json::from_str(raw).unwrap();
        assert_eq!(member.status, "administrator");
        assert_eq!(member.can_invite_users, Some(true));
    }
}
