//! Registered notification targets.
//!
//! [`SubscriberId`] is a newtype over the Telegram chat id so it cannot be
//! confused with message ids or user ids.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque chat identifier of a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(i64);

impl SubscriberId {
    /// Wraps a raw chat id.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw chat id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SubscriberId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// A chat that receives broadcast notifications.
///
/// Created on first contact and never mutated or removed. The serialized
/// field names match the `chats.json` document format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    /// Chat identifier; unique within the registry.
    #[serde(rename = "chatId")]
    pub id: SubscriberId,
    /// Sender username or first name at registration time.
    #[serde(rename = "username")]
    pub display_name: String,
    /// Chat kind (`private`, `group`, `supergroup`, `channel`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Registration timestamp.
    #[serde(rename = "registeredAt")]
    pub registered_at: DateTime<Utc>,
}

impl Subscriber {
    /// Creates a subscriber registered at `registered_at`.
    #[must_use]
    pub fn new(
        id: SubscriberId,
        display_name: impl Into<String>,
        kind: impl Into<String>,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            kind: kind.into(),
            registered_at,
        }
    }
}
