//! # gate-chat
//!
//! Chat-platform Bot API integration for channel-gate.
//!
//! [`ChatApi`] abstracts the handful of Bot API calls the gateway needs:
//! sending messages, creating single-use invite links, probing the bot's
//! invite capability, and webhook registration. [`TelegramChat`] is the
//! production implementation; [`MockChat`] records calls for tests.
//!
//! [`InviteIssuer`] wraps invite creation with the capability precheck and
//! bounded retry policy.

pub mod api;
pub mod error;
pub mod invite;
pub mod mock;
pub mod telegram;

pub use api::ChatApi;
pub use error::{ChatError, Result};
pub use invite::InviteIssuer;
pub use mock::MockChat;
pub use telegram::TelegramChat;
