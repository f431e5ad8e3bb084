//! Coordinating service wiring message sources, moderators, and collectors.

use std::sync::Arc;
use std::time::Duration;

use crate::actions::{ActionContext, ActionPipeline, MessageModerator, NoopModerator};
use crate::collector::{Collector, CollectorHandle, CollectorReport};
use crate::config::InteractivityConfig;
use crate::criteria::CriteriaSet;
use crate::hub::{MessageHub, MessageSource};
use crate::matching::AnyMessage;
use crate::message::{ChannelId, InboundMessage};
use crate::selection::Selection;

/// Starts collectors against one message source and one moderator.
///
/// # Examples
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use std::sync::Arc;
/// use tau_interactivity::{
///     ChannelId, InboundMessage, InteractivityConfig, InteractivityService, MessageId,
///     Selection, UserId,
/// };
///
/// let (service, hub) = InteractivityService::with_hub(InteractivityConfig::default());
/// let selection = Arc::new(
///     Selection::builder()
///         .with_option("A", "apple")
///         .with_option("B", "banana")
///         .build()
///         .expect("valid selection"),
/// );
///
/// let handle = service.start_selection(selection, ChannelId(1), None);
/// hub.publish(InboundMessage::new(MessageId(1), ChannelId(1), UserId(9), "Banana"));
/// let report = handle.join().await;
/// assert_eq!(report.outcome.value(), Some(&"B"));
/// # }
/// ```
#[derive(Clone)]
pub struct InteractivityService {
    source: Arc<dyn MessageSource>,
    moderator: Arc<dyn MessageModerator>,
    config: InteractivityConfig,
}

impl InteractivityService {
    pub fn new(
        source: Arc<dyn MessageSource>,
        moderator: Arc<dyn MessageModerator>,
        config: InteractivityConfig,
    ) -> Self {
        Self {
            source,
            moderator,
            config,
        }
    }

    /// Service backed by a fresh in-process hub and no moderation.
    pub fn with_hub(config: InteractivityConfig) -> (Self, Arc<MessageHub>) {
        let hub = Arc::new(MessageHub::new(config.hub_capacity));
        let service = Self::new(hub.clone(), Arc::new(NoopModerator), config);
        (service, hub)
    }

    pub fn config(&self) -> &InteractivityConfig {
        &self.config
    }

    fn action_context(&self) -> ActionContext {
        ActionContext::new(self.moderator.clone(), self.config.action_timeout())
    }

    fn resolve_timeout(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or_else(|| self.config.default_timeout())
    }

    /// Starts listening for replies to `selection` in `channel_id`.
    #[tracing::instrument(level = "debug", skip_all, fields(channel_id = %channel_id))]
    pub fn start_selection<T>(
        &self,
        selection: Arc<Selection<T>>,
        channel_id: ChannelId,
        timeout: Option<Duration>,
    ) -> CollectorHandle<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        Collector::for_selection(selection, channel_id, self.config.cancel_phrase.clone()).start(
            self.source.as_ref(),
            self.action_context(),
            self.resolve_timeout(timeout),
        )
    }

    /// Runs a selection to completion, including its actions.
    pub async fn next_selection<T>(
        &self,
        selection: Arc<Selection<T>>,
        channel_id: ChannelId,
        timeout: Option<Duration>,
    ) -> CollectorReport<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.start_selection(selection, channel_id, timeout)
            .join()
            .await
    }

    /// Starts waiting for the first message passing `criteria`.
    #[tracing::instrument(level = "debug", skip_all, fields(criteria = criteria.len()))]
    pub fn start_next_message(
        &self,
        criteria: CriteriaSet,
        timeout: Option<Duration>,
    ) -> CollectorHandle<InboundMessage> {
        Collector::<InboundMessage>::new(
            Arc::new(AnyMessage),
            criteria,
            ActionPipeline::empty(),
            self.config.cancel_phrase.clone(),
        )
        .start(
            self.source.as_ref(),
            self.action_context(),
            self.resolve_timeout(timeout),
        )
    }

    pub async fn next_message(
        &self,
        criteria: CriteriaSet,
        timeout: Option<Duration>,
    ) -> CollectorReport<InboundMessage> {
        self.start_next_message(criteria, timeout).join().await
    }
}
