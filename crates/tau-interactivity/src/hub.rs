//! Message source boundary and the in-process broadcast hub.

use std::sync::Mutex;

use tokio::sync::broadcast::{self, error::RecvError};

use crate::message::InboundMessage;

/// Shared stream of inbound messages that collectors subscribe to.
pub trait MessageSource: Send + Sync {
    fn subscribe(&self) -> MessageSubscription;
}

/// One subscriber's view of a message source. Dropping it unsubscribes.
#[derive(Debug)]
pub struct MessageSubscription {
    receiver: Option<broadcast::Receiver<InboundMessage>>,
}

impl MessageSubscription {
    pub fn new(receiver: broadcast::Receiver<InboundMessage>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    /// Subscription to a source that is already gone.
    pub fn closed() -> Self {
        Self { receiver: None }
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }

    /// Waits for the next message; `None` once the source closed or after `unsubscribe`.
    pub async fn next(&mut self) -> Option<InboundMessage> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "message subscription lagged; skipping messages");
                }
                Err(RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    pub fn unsubscribe(&mut self) {
        self.receiver = None;
    }
}

/// In-process broadcast source fed by a gateway or a test harness.
///
/// # Examples
///
/// ```
/// use tau_interactivity::{ChannelId, InboundMessage, MessageHub, MessageId, MessageSource, UserId};
///
/// let hub = MessageHub::new(16);
/// let subscription = hub.subscribe();
/// assert_eq!(hub.subscriber_count(), 1);
/// hub.publish(InboundMessage::new(MessageId(1), ChannelId(1), UserId(1), "hi"));
/// drop(subscription);
/// assert_eq!(hub.subscriber_count(), 0);
/// ```
#[derive(Debug)]
pub struct MessageHub {
    sender: Mutex<Option<broadcast::Sender<InboundMessage>>>,
}

impl MessageHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Delivers `message` to current subscribers. Returns how many received it.
    pub fn publish(&self, message: InboundMessage) -> usize {
        let sender = lock_or_recover(&self.sender);
        match sender.as_ref() {
            Some(sender) => sender.send(message).unwrap_or(0),
            None => 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock_or_recover(&self.sender)
            .as_ref()
            .map(broadcast::Sender::receiver_count)
            .unwrap_or(0)
    }

    /// Drops the sender; subscribers observe the end of the stream.
    pub fn close(&self) {
        if lock_or_recover(&self.sender).take().is_some() {
            tracing::debug!("message hub closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        lock_or_recover(&self.sender).is_none()
    }
}

impl MessageSource for MessageHub {
    fn subscribe(&self) -> MessageSubscription {
        match lock_or_recover(&self.sender).as_ref() {
            Some(sender) => MessageSubscription::new(sender.subscribe()),
            None => MessageSubscription::closed(),
        }
    }
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
