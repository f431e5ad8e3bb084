use thiserror::Error;

use crate::message::{ChannelId, MessageId};

/// Rejected selection configuration, raised by `SelectionBuilder::build`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("selection requires at least one value")]
    EmptyValues,
    #[error("selection has {values} values but {possibilities} possibilities")]
    LengthMismatch { values: usize, possibilities: usize },
}

/// Failure reported by a `MessageModerator`; never escapes the action pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModerationError {
    #[error("missing permission to delete message {message_id} in channel {channel_id}")]
    PermissionDenied {
        channel_id: ChannelId,
        message_id: MessageId,
    },
    #[error("message {message_id} in channel {channel_id} no longer exists")]
    NotFound {
        channel_id: ChannelId,
        message_id: MessageId,
    },
    #[error("moderation request timed out after {0}ms")]
    TimedOut(u64),
    #[error("moderation transport failed: {0}")]
    Transport(String),
}
