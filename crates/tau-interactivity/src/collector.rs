//! Timed, cancellable reply collector.
//!
//! A collector subscribes to a [`MessageSource`], filters each message through
//! its [`CriteriaSet`], matches eligible messages with a [`ReplyMatcher`], and
//! stores exactly one [`CollectorOutcome`]. The timeout, a matching message,
//! a cancel phrase, stream loss, and [`CollectorHandle::cancel`] all race for
//! the same [`CompletionSlot`]; the first write is authoritative.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use serde::Serialize;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

use crate::actions::{ActionContext, ActionPipeline};
use crate::completion::{CollectorOutcome, CompletionSlot};
use crate::criteria::CriteriaSet;
use crate::hub::{MessageSource, MessageSubscription};
use crate::matching::{MatchVerdict, ReplyMatcher};
use crate::message::{ChannelId, InboundMessage};
use crate::selection::Selection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `CollectorState` values.
pub enum CollectorState {
    Idle,
    Listening,
    Completed,
}

/// How a collector classified one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDisposition<T> {
    /// Rejected by the criteria; not the collector's concern.
    Ignored,
    /// Eligible but matched nothing.
    Invalid,
    Matched(T),
    Cancelled,
}

/// Public struct `CollectorMetrics` used across Tau components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectorMetrics {
    pub observed: u64,
    pub ignored: u64,
    pub invalid: u64,
    pub action_failures: u64,
}

#[derive(Debug, Default)]
struct CollectorMetricsInner {
    observed: AtomicU64,
    ignored: AtomicU64,
    invalid: AtomicU64,
    action_failures: AtomicU64,
}

impl CollectorMetricsInner {
    fn snapshot(&self) -> CollectorMetrics {
        CollectorMetrics {
            observed: self.observed.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            action_failures: self.action_failures.load(Ordering::Relaxed),
        }
    }
}

/// Final report returned once a collector task finished its actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectorReport<T> {
    #[serde(flatten)]
    pub outcome: CollectorOutcome<T>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_duration_ms")]
    pub elapsed: Duration,
    pub metrics: CollectorMetrics,
}

fn serialize_duration_ms<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis().try_into().unwrap_or(u64::MAX))
}

#[derive(Debug)]
struct CollectorShared<T> {
    slot: CompletionSlot<T>,
    listening: AtomicBool,
    metrics: CollectorMetricsInner,
}

impl<T> CollectorShared<T> {
    fn new() -> Self {
        Self {
            slot: CompletionSlot::new(),
            listening: AtomicBool::new(false),
            metrics: CollectorMetricsInner::default(),
        }
    }

    fn state(&self) -> CollectorState {
        if self.slot.is_completed() {
            CollectorState::Completed
        } else if self.listening.load(Ordering::SeqCst) {
            CollectorState::Listening
        } else {
            CollectorState::Idle
        }
    }

    fn resolve(&self, outcome: CollectorOutcome<T>) -> bool {
        let label = outcome.as_str();
        let won = self.slot.complete(outcome);
        if won {
            tracing::debug!(outcome = label, "collector resolved");
        } else {
            tracing::trace!(outcome = label, "collector already resolved; discarding");
        }
        won
    }
}

const MAX_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

enum LoopEvent {
    Resolved,
    Deadline,
    Message(Option<InboundMessage>),
}

/// Single-use listener producing one outcome.
pub struct Collector<T> {
    matcher: Arc<dyn ReplyMatcher<T>>,
    criteria: CriteriaSet,
    actions: Arc<ActionPipeline>,
    cancel_phrase: String,
    shared: Arc<CollectorShared<T>>,
}

impl<T> Collector<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(
        matcher: Arc<dyn ReplyMatcher<T>>,
        criteria: CriteriaSet,
        actions: ActionPipeline,
        cancel_phrase: impl Into<String>,
    ) -> Self {
        Self {
            matcher,
            criteria,
            actions: Arc::new(actions),
            cancel_phrase: cancel_phrase.into(),
            shared: Arc::new(CollectorShared::new()),
        }
    }

    /// Collector for replies to `selection` posted in `channel_id`.
    pub fn for_selection(
        selection: Arc<Selection<T>>,
        channel_id: ChannelId,
        cancel_phrase: impl Into<String>,
    ) -> Self {
        let criteria = selection.criteria(channel_id);
        let actions = selection.actions();
        Self::new(selection, criteria, actions, cancel_phrase)
    }

    pub fn state(&self) -> CollectorState {
        self.shared.state()
    }

    /// Classifies `message` without side effects.
    pub fn evaluate(&self, message: &InboundMessage) -> EventDisposition<T> {
        if let Some(criterion) = self.criteria.first_failure(message) {
            tracing::trace!(
                message_id = %message.message_id,
                criterion = criterion.as_str(),
                "message rejected by criteria"
            );
            return EventDisposition::Ignored;
        }
        match self.matcher.match_reply(message, &self.cancel_phrase) {
            MatchVerdict::Invalid => EventDisposition::Invalid,
            MatchVerdict::Matched(value) => EventDisposition::Matched(value),
            MatchVerdict::Cancelled => EventDisposition::Cancelled,
        }
    }

    /// Subscribes to `source`, arms the timeout, and spawns the listening task.
    ///
    /// Must be called within a tokio runtime. Messages published after this
    /// returns are guaranteed to reach the collector.
    pub fn start(
        self,
        source: &dyn MessageSource,
        context: ActionContext,
        timeout: Duration,
    ) -> CollectorHandle<T> {
        let started = Instant::now();
        let subscription = source.subscribe();
        self.shared.listening.store(true, Ordering::SeqCst);
        let shared = self.shared.clone();
        tracing::debug!(
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            criteria = self.criteria.len(),
            "collector listening"
        );
        let deadline = started
            .checked_add(timeout)
            .unwrap_or_else(|| started + MAX_TIMEOUT);
        let task = tokio::spawn(self.run(subscription, context, started, deadline));
        CollectorHandle { shared, task }
    }

    async fn run(
        self,
        mut subscription: MessageSubscription,
        context: ActionContext,
        started: Instant,
        deadline_at: Instant,
    ) -> CollectorReport<T> {
        let deadline = tokio::time::sleep_until(deadline_at);
        tokio::pin!(deadline);
        let mut rejections = JoinSet::new();

        loop {
            if Instant::now() >= deadline_at {
                self.shared.resolve(CollectorOutcome::TimedOut);
                break;
            }
            let event = tokio::select! {
                biased;
                _ = self.shared.slot.wait() => LoopEvent::Resolved,
                _ = &mut deadline => LoopEvent::Deadline,
                next = subscription.next() => LoopEvent::Message(next),
            };
            match event {
                LoopEvent::Resolved => break,
                LoopEvent::Deadline => {
                    self.shared.resolve(CollectorOutcome::TimedOut);
                    break;
                }
                LoopEvent::Message(None) => {
                    tracing::debug!("message source closed while listening");
                    self.shared.resolve(CollectorOutcome::TimedOut);
                    break;
                }
                LoopEvent::Message(Some(message)) => {
                    if self.handle_message(message, &context, &mut rejections) {
                        break;
                    }
                }
            }
        }
        subscription.unsubscribe();

        while let Some(joined) = rejections.join_next().await {
            if let Err(error) = joined {
                tracing::warn!(%error, "rejected-message action task failed");
            }
        }

        let outcome = match self.shared.slot.get() {
            Some(outcome) => outcome.clone(),
            None => CollectorOutcome::TimedOut,
        };
        let failures = self.actions.on_completed(&outcome, &context).await;
        self.shared
            .metrics
            .action_failures
            .fetch_add(failures, Ordering::Relaxed);

        CollectorReport {
            outcome,
            elapsed: started.elapsed(),
            metrics: self.shared.metrics.snapshot(),
        }
    }

    /// Returns true once the collector is resolved and must stop listening.
    ///
    /// Actions for invalid messages run on `rejections` so a slow moderator
    /// never holds back the deadline.
    fn handle_message(
        &self,
        message: InboundMessage,
        context: &ActionContext,
        rejections: &mut JoinSet<()>,
    ) -> bool {
        let metrics = &self.shared.metrics;
        metrics.observed.fetch_add(1, Ordering::Relaxed);
        match self.evaluate(&message) {
            EventDisposition::Ignored => {
                metrics.ignored.fetch_add(1, Ordering::Relaxed);
                false
            }
            EventDisposition::Invalid => {
                metrics.invalid.fetch_add(1, Ordering::Relaxed);
                if self.actions.acts_on_rejected() {
                    let actions = self.actions.clone();
                    let context = context.clone();
                    let shared = self.shared.clone();
                    rejections.spawn(async move {
                        let failures = actions.on_rejected(&message, &context).await;
                        shared
                            .metrics
                            .action_failures
                            .fetch_add(failures, Ordering::Relaxed);
                    });
                }
                self.shared.slot.is_completed()
            }
            EventDisposition::Matched(value) => {
                self.shared.resolve(CollectorOutcome::Matched {
                    value,
                    trigger: message,
                });
                true
            }
            EventDisposition::Cancelled => {
                self.shared.resolve(CollectorOutcome::Cancelled {
                    trigger: Some(message),
                });
                true
            }
        }
    }
}

/// Caller-side handle to a running collector.
pub struct CollectorHandle<T> {
    shared: Arc<CollectorShared<T>>,
    task: JoinHandle<CollectorReport<T>>,
}

impl<T> CollectorHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn state(&self) -> CollectorState {
        self.shared.state()
    }

    pub fn outcome(&self) -> Option<CollectorOutcome<T>> {
        self.shared.slot.get().cloned()
    }

    pub fn metrics(&self) -> CollectorMetrics {
        self.shared.metrics.snapshot()
    }

    /// Suspends until the outcome is stored; actions may still be running.
    pub async fn wait(&self) -> CollectorOutcome<T> {
        self.shared.slot.wait().await.clone()
    }

    /// Forces `Cancelled` unless already completed. Returns true when this call won.
    pub fn cancel(&self) -> bool {
        self.shared
            .resolve(CollectorOutcome::Cancelled { trigger: None })
    }

    /// Waits for the listening task, including its completion actions.
    pub async fn join(self) -> CollectorReport<T> {
        match self.task.await {
            Ok(report) => report,
            Err(error) => {
                tracing::warn!(%error, "collector task failed");
                self.shared.resolve(CollectorOutcome::TimedOut);
                CollectorReport {
                    outcome: self
                        .shared
                        .slot
                        .get()
                        .cloned()
                        .unwrap_or(CollectorOutcome::TimedOut),
                    elapsed: Duration::ZERO,
                    metrics: self.shared.metrics.snapshot(),
                }
            }
        }
    }
}
