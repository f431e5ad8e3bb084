//! Interactive reply collection for Tau chat channels.
//!
//! A [`Selection`] describes a prompt: the values a user can pick, the reply
//! text selecting each value, who may answer, and whether a cancel phrase is
//! accepted. A [`Collector`] listens on a [`MessageSource`] until a reply
//! matches, the cancel phrase arrives, the caller cancels, or the timeout
//! elapses, then runs the selection's [`Action`]s. [`InteractivityService`]
//! bundles the source, moderator, and [`InteractivityConfig`].

pub mod actions;
pub mod collector;
pub mod completion;
pub mod config;
pub mod criteria;
pub mod error;
pub mod hub;
pub mod matching;
pub mod message;
pub mod selection;
pub mod service;

pub use actions::{Action, ActionContext, ActionPipeline, MessageModerator, NoopModerator};
pub use collector::{
    Collector, CollectorHandle, CollectorMetrics, CollectorReport, CollectorState,
    EventDisposition,
};
pub use completion::{CollectorOutcome, CompletionSlot};
pub use config::{InteractivityConfig, DEFAULT_CANCEL_PHRASE};
pub use criteria::{CriteriaSet, Criterion};
pub use error::{ModerationError, SelectionError};
pub use hub::{MessageHub, MessageSource, MessageSubscription};
pub use matching::{text_equals, AnyMessage, MatchVerdict, ReplyMatcher};
pub use message::{current_unix_timestamp_ms, ChannelId, InboundMessage, MessageId, UserId};
pub use selection::{Selection, SelectionAppearance, SelectionBuilder};
pub use service::InteractivityService;
