//! Side effects applied while and after a collector listens.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::completion::CollectorOutcome;
use crate::error::ModerationError;
use crate::message::{ChannelId, InboundMessage, MessageId};

/// Moderation boundary implemented by the chat transport.
#[async_trait]
pub trait MessageModerator: Send + Sync {
    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), ModerationError>;
}

/// Moderator for transports without delete support; every request succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopModerator;

#[async_trait]
impl MessageModerator for NoopModerator {
    async fn delete_message(
        &self,
        _channel_id: ChannelId,
        _message_id: MessageId,
    ) -> Result<(), ModerationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `Action` values.
pub enum Action {
    DeleteMessages {
        delete_invalid: bool,
        delete_valid: bool,
    },
}

/// Moderator plus the per-request deadline used by an action pipeline.
#[derive(Clone)]
pub struct ActionContext {
    moderator: Arc<dyn MessageModerator>,
    request_timeout: Duration,
}

impl ActionContext {
    pub fn new(moderator: Arc<dyn MessageModerator>, request_timeout: Duration) -> Self {
        Self {
            moderator,
            request_timeout,
        }
    }

    /// Requests deletion; returns false when the request failed or timed out.
    async fn delete(&self, message: &InboundMessage) -> bool {
        let request = self
            .moderator
            .delete_message(message.channel_id, message.message_id);
        let result = match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(ModerationError::TimedOut(
                self.request_timeout.as_millis().try_into().unwrap_or(u64::MAX),
            )),
        };
        match result {
            Ok(()) => {
                tracing::debug!(
                    channel_id = %message.channel_id,
                    message_id = %message.message_id,
                    "deleted collected message"
                );
                true
            }
            Err(error) => {
                tracing::warn!(
                    channel_id = %message.channel_id,
                    message_id = %message.message_id,
                    %error,
                    "message deletion failed"
                );
                false
            }
        }
    }
}

/// Ordered list of actions run by one collector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionPipeline {
    actions: Vec<Action>,
}

impl ActionPipeline {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// True when some action applies to messages that matched nothing.
    pub fn acts_on_rejected(&self) -> bool {
        self.actions.iter().any(|action| match action {
            Action::DeleteMessages { delete_invalid, .. } => *delete_invalid,
        })
    }

    /// Runs actions for an eligible message that matched nothing. Returns the failure count.
    pub async fn on_rejected(&self, message: &InboundMessage, context: &ActionContext) -> u64 {
        let mut failures = 0;
        for action in &self.actions {
            match action {
                Action::DeleteMessages { delete_invalid, .. } => {
                    if *delete_invalid && !context.delete(message).await {
                        failures += 1;
                    }
                }
            }
        }
        failures
    }

    /// Runs actions for the terminal outcome. Returns the failure count.
    pub async fn on_completed<T>(
        &self,
        outcome: &CollectorOutcome<T>,
        context: &ActionContext,
    ) -> u64 {
        let Some(trigger) = outcome.trigger() else {
            return 0;
        };
        let mut failures = 0;
        for action in &self.actions {
            match action {
                Action::DeleteMessages { delete_valid, .. } => {
                    if *delete_valid && !context.delete(trigger).await {
                        failures += 1;
                    }
                }
            }
        }
        failures
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::message::UserId;

    /// Records delete requests and fails those listed in `failing`.
    #[derive(Default)]
    pub(crate) struct RecordingModerator {
        pub(crate) deleted: Mutex<Vec<MessageId>>,
        pub(crate) failing: Vec<MessageId>,
    }

    impl RecordingModerator {
        pub(crate) fn deleted(&self) -> Vec<MessageId> {
            self.deleted.lock().expect("moderator lock").clone()
        }
    }

    #[async_trait]
    impl MessageModerator for RecordingModerator {
        async fn delete_message(
            &self,
            channel_id: ChannelId,
            message_id: MessageId,
        ) -> Result<(), ModerationError> {
            if self.failing.contains(&message_id) {
                return Err(ModerationError::PermissionDenied {
                    channel_id,
                    message_id,
                });
            }
            self.deleted
                .lock()
                .expect("moderator lock")
                .push(message_id);
            Ok(())
        }
    }

    /// Succeeds after sleeping for `delay`.
    pub(crate) struct SlowModerator {
        pub(crate) delay: Duration,
    }

    #[async_trait]
    impl MessageModerator for SlowModerator {
        async fn delete_message(
            &self,
            _channel_id: ChannelId,
            _message_id: MessageId,
        ) -> Result<(), ModerationError> {
            tokio::time::sleep(self.delay).await;
            Ok(())
        }
    }

    struct StalledModerator;

    #[async_trait]
    impl MessageModerator for StalledModerator {
        async fn delete_message(
            &self,
            _channel_id: ChannelId,
            _message_id: MessageId,
        ) -> Result<(), ModerationError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn message(id: u64) -> InboundMessage {
        InboundMessage::new(MessageId(id), ChannelId(1), UserId(1), "text")
    }

    fn delete_pipeline(delete_invalid: bool, delete_valid: bool) -> ActionPipeline {
        ActionPipeline::new(vec![Action::DeleteMessages {
            delete_invalid,
            delete_valid,
        }])
    }

    #[tokio::test]
    async fn unit_on_rejected_deletes_only_when_delete_invalid_enabled() {
        let moderator = Arc::new(RecordingModerator::default());
        let context = ActionContext::new(moderator.clone(), Duration::from_secs(1));

        assert_eq!(delete_pipeline(false, true).on_rejected(&message(1), &context).await, 0);
        assert!(moderator.deleted().is_empty());

        assert_eq!(delete_pipeline(true, false).on_rejected(&message(2), &context).await, 0);
        assert_eq!(moderator.deleted(), vec![MessageId(2)]);
    }

    #[test]
    fn unit_acts_on_rejected_follows_delete_invalid_flag() {
        assert!(delete_pipeline(true, false).acts_on_rejected());
        assert!(!delete_pipeline(false, true).acts_on_rejected());
        assert!(!ActionPipeline::empty().acts_on_rejected());
    }

    #[tokio::test]
    async fn functional_on_completed_deletes_trigger_of_matched_and_cancelled_outcomes() {
        let moderator = Arc::new(RecordingModerator::default());
        let context = ActionContext::new(moderator.clone(), Duration::from_secs(1));
        let pipeline = delete_pipeline(false, true);

        let matched = CollectorOutcome::Matched {
            value: 1,
            trigger: message(5),
        };
        let cancelled = CollectorOutcome::<i32>::Cancelled {
            trigger: Some(message(6)),
        };
        pipeline.on_completed(&matched, &context).await;
        pipeline.on_completed(&cancelled, &context).await;
        pipeline
            .on_completed(&CollectorOutcome::<i32>::TimedOut, &context)
            .await;
        pipeline
            .on_completed(&CollectorOutcome::<i32>::Cancelled { trigger: None }, &context)
            .await;

        assert_eq!(moderator.deleted(), vec![MessageId(5), MessageId(6)]);
    }

    #[tokio::test]
    async fn regression_moderation_failures_are_counted_not_propagated() {
        let moderator = Arc::new(RecordingModerator {
            failing: vec![MessageId(9)],
            ..RecordingModerator::default()
        });
        let context = ActionContext::new(moderator, Duration::from_secs(1));
        let failures = delete_pipeline(true, true)
            .on_rejected(&message(9), &context)
            .await;
        assert_eq!(failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn regression_stalled_moderator_is_bounded_by_request_timeout() {
        let context = ActionContext::new(Arc::new(StalledModerator), Duration::from_millis(50));
        let failures = delete_pipeline(true, false)
            .on_rejected(&message(3), &context)
            .await;
        assert_eq!(failures, 1);
    }
}
