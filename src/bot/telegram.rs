//! Telegram transport: outbound sink and the long-polling update loop.

use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, BotCommand, ChatKind, PublicChatKind, UpdateKind};
use teloxide::{ApiError, RequestError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::commands::{ChatOrigin, Command, CommandRouter};
use crate::domain::SubscriberId;
use crate::error::DeliveryError;
use crate::service::MessageSink;

/// Long-polling timeout passed to `getUpdates`, in seconds.
const POLL_TIMEOUT_SECS: u32 = 30;

/// Delay before retrying after a failed `getUpdates`.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Builds a bot whose HTTP timeout outlasts the long-polling timeout.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be constructed.
pub fn build_bot(token: &str) -> anyhow::Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(POLL_TIMEOUT_SECS) + 15))
        .build()?;
    Ok(Bot::with_client(token, client))
}

/// [`MessageSink`] delivering plain-text Telegram messages.
#[derive(Debug, Clone)]
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    /// Wraps a bot.
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MessageSink for TelegramSink {
    async fn send(&self, to: SubscriberId, text: &str) -> Result<(), DeliveryError> {
        self.bot
            .send_message(ChatId(to.get()), text)
            .await
            .map(|_| ())
            .map_err(|e| DeliveryError::new(to, e))
    }
}

/// Classifies the chat a message came from.
#[must_use]
pub fn chat_kind(kind: &ChatKind) -> &'static str {
    match kind {
        ChatKind::Private(_) => "private",
        ChatKind::Public(public) => match public.kind {
            PublicChatKind::Channel(_) => "channel",
            PublicChatKind::Supergroup(_) => "supergroup",
            _ => "group",
        },
    }
}

/// Extracts the sender identity used for registration.
#[must_use]
pub fn chat_origin(msg: &Message) -> ChatOrigin {
    let display_name = msg
        .from
        .as_ref()
        .and_then(|u| u.username.clone().or_else(|| Some(u.first_name.clone())))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    ChatOrigin {
        chat: SubscriberId::new(msg.chat.id.0),
        display_name,
        kind: chat_kind(&msg.chat.kind).to_string(),
    }
}

/// Verifies the token, registers the command menu and spawns the polling
/// loop. The loop exits when `cancel` fires.
///
/// # Errors
///
/// Returns an error if the token is rejected or the webhook cannot be
/// cleared.
pub async fn start_polling(
    bot: Bot,
    router: CommandRouter,
    cancel: CancellationToken,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let me = bot.get_me().await?;
    let bot_username = me.username.clone();

    // Long polling does not work while a webhook is set.
    bot.delete_webhook().send().await?;

    let commands: Vec<BotCommand> = Command::ALL
        .into_iter()
        .map(|cmd| BotCommand::new(cmd.name(), cmd.description()))
        .collect();
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(username = ?bot_username, "telegram bot connected");

    Ok(tokio::spawn(poll_updates(bot, bot_username, router, cancel)))
}

async fn poll_updates(
    bot: Bot,
    bot_username: Option<String>,
    router: CommandRouter,
    cancel: CancellationToken,
) {
    let mut offset: i32 = 0;

    loop {
        let result = tokio::select! {
            () = cancel.cancelled() => break,
            result = bot
                .get_updates()
                .offset(offset)
                .timeout(POLL_TIMEOUT_SECS)
                .allowed_updates(vec![AllowedUpdate::Message])
                .send() => result,
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "got telegram updates");
                for update in updates {
                    offset = update.id.as_offset();
                    match update.kind {
                        UpdateKind::Message(msg) => {
                            handle_message(&router, &msg, bot_username.as_deref());
                        }
                        other => debug!("ignoring non-message update: {other:?}"),
                    }
                }
            }
            Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                warn!("another bot instance is polling with this token, stopping");
                cancel.cancel();
                break;
            }
            Err(e) => {
                warn!(error = %e, "telegram getUpdates failed");
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                }
            }
        }
    }

    info!("telegram polling stopped");
}

fn handle_message(router: &CommandRouter, msg: &Message, bot_username: Option<&str>) {
    let Some(text) = msg.text() else {
        debug!(chat_id = msg.chat.id.0, "ignoring non-text message");
        return;
    };
    let Some(command) = Command::parse(text, bot_username) else {
        debug!(chat_id = msg.chat.id.0, "ignoring non-command message");
        return;
    };
    router.spawn_dispatch(command, chat_origin(msg));
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn message(chat: Value, from: Option<Value>) -> Message {
        let mut raw = json!({
            "message_id": 7,
            "date": 1_700_000_000,
            "chat": chat,
            "text": "/start",
        });
        if let (Some(from), Some(obj)) = (from, raw.as_object_mut()) {
            obj.insert("from".to_string(), from);
        }
        let Ok(msg) = serde_json::from_value::<Message>(raw) else {
            panic!("message should deserialize");
        };
        msg
    }

    fn user(username: Option<&str>) -> Value {
        let mut user = json!({ "id": 42, "is_bot": false, "first_name": "Alice" });
        if let (Some(name), Some(obj)) = (username, user.as_object_mut()) {
            obj.insert("username".to_string(), json!(name));
        }
        user
    }

    #[test]
    fn private_chat_uses_username() {
        let msg = message(
            json!({ "id": 42, "type": "private", "first_name": "Alice", "username": "alice" }),
            Some(user(Some("alice"))),
        );
        let origin = chat_origin(&msg);
        assert_eq!(origin.chat, SubscriberId::new(42));
        assert_eq!(origin.display_name, "alice");
        assert_eq!(origin.kind, "private");
    }

    #[test]
    fn group_sender_without_username_uses_first_name() {
        let msg = message(
            json!({ "id": -100, "type": "group", "title": "Friends" }),
            Some(user(None)),
        );
        let origin = chat_origin(&msg);
        assert_eq!(origin.chat, SubscriberId::new(-100));
        assert_eq!(origin.display_name, "Alice");
        assert_eq!(origin.kind, "group");
    }

    #[test]
    fn supergroup_is_classified() {
        let msg = message(
            json!({ "id": -1_001_234_567_890_i64, "type": "supergroup", "title": "Deals" }),
            Some(user(Some("bob"))),
        );
        assert_eq!(chat_kind(&msg.chat.kind), "supergroup");
        assert_eq!(chat_origin(&msg).display_name, "bob");
    }

    #[test]
    fn channel_post_without_sender_is_unknown() {
        let msg = message(
            json!({ "id": -1_009_876_543_210_i64, "type": "channel", "title": "Alerts" }),
            None,
        );
        let origin = chat_origin(&msg);
        assert_eq!(origin.kind, "channel");
        assert_eq!(origin.display_name, "unknown");
    }
}
