//! Terminal collector outcomes and the write-once slot that stores them.

use std::sync::OnceLock;

use serde::Serialize;
use tokio::sync::Notify;

use crate::message::InboundMessage;

/// Terminal outcome of a collector. Produced exactly once per collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CollectorOutcome<T> {
    Matched { value: T, trigger: InboundMessage },
    /// `trigger` is `None` when the caller cancelled the collector directly.
    Cancelled { trigger: Option<InboundMessage> },
    TimedOut,
}

impl<T> CollectorOutcome<T> {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched { .. } => "matched",
            Self::Cancelled { .. } => "cancelled",
            Self::TimedOut => "timed_out",
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Matched { value, .. } => Some(value),
            Self::Cancelled { .. } | Self::TimedOut => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Matched { value, .. } => Some(value),
            Self::Cancelled { .. } | Self::TimedOut => None,
        }
    }

    /// Message that resolved the collector, if any.
    pub fn trigger(&self) -> Option<&InboundMessage> {
        match self {
            Self::Matched { trigger, .. } => Some(trigger),
            Self::Cancelled { trigger } => trigger.as_ref(),
            Self::TimedOut => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }
}

/// Write-once outcome cell. The first `complete` wins; later writes are dropped.
#[derive(Debug)]
pub struct CompletionSlot<T> {
    outcome: OnceLock<CollectorOutcome<T>>,
    notify: Notify,
}

impl<T> Default for CompletionSlot<T> {
    fn default() -> Self {
        Self {
            outcome: OnceLock::new(),
            notify: Notify::new(),
        }
    }
}

impl<T> CompletionSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `outcome` if the slot is empty. Returns true for the winning write.
    pub fn complete(&self, outcome: CollectorOutcome<T>) -> bool {
        let won = self.outcome.set(outcome).is_ok();
        if won {
            self.notify.notify_waiters();
        }
        won
    }

    pub fn get(&self) -> Option<&CollectorOutcome<T>> {
        self.outcome.get()
    }

    pub fn is_completed(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// Suspends until an outcome is stored.
    pub async fn wait(&self) -> &CollectorOutcome<T> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(outcome) = self.outcome.get() {
                return outcome;
            }
            notified.await;
        }
    }
}
