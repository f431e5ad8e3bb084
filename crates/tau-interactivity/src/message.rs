//! Inbound chat message shape consumed by collectors.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

snowflake_id!(
    /// Identifier of the user who authored a message.
    UserId
);
snowflake_id!(
    /// Identifier of the channel a message was posted in.
    ChannelId
);
snowflake_id!(
    /// Identifier of a single posted message.
    MessageId
);

/// Public struct `InboundMessage` delivered by a `MessageSource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl InboundMessage {
    pub fn new(
        message_id: MessageId,
        channel_id: ChannelId,
        author_id: UserId,
        text: impl Into<String>,
    ) -> Self {
        Self {
            message_id,
            channel_id,
            author_id,
            text: text.into(),
            timestamp_ms: current_unix_timestamp_ms(),
        }
    }

    /// Text used for possibility matching, without surrounding whitespace.
    pub fn reply_text(&self) -> &str {
        self.text.trim()
    }
}

/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
