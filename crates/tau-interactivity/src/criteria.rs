//! Eligibility predicates evaluated before a message is matched.

use std::collections::BTreeSet;

use crate::message::{ChannelId, InboundMessage, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates supported `Criterion` values.
pub enum Criterion {
    /// Passes when the author is listed, or when the list is empty.
    UserIsAllowed(BTreeSet<UserId>),
    /// Passes when the message was posted in the given channel.
    InChannel(ChannelId),
}

impl Criterion {
    pub fn evaluate(&self, message: &InboundMessage) -> bool {
        match self {
            Self::UserIsAllowed(users) => users.is_empty() || users.contains(&message.author_id),
            Self::InChannel(channel_id) => message.channel_id == *channel_id,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserIsAllowed(_) => "user_is_allowed",
            Self::InChannel(_) => "in_channel",
        }
    }
}

/// Ordered conjunction of criteria.
///
/// # Examples
///
/// ```
/// use tau_interactivity::{ChannelId, CriteriaSet, Criterion, InboundMessage, MessageId, UserId};
///
/// let criteria = CriteriaSet::new()
///     .with(Criterion::InChannel(ChannelId(10)))
///     .with(Criterion::UserIsAllowed([UserId(1)].into_iter().collect()));
///
/// let from_owner = InboundMessage::new(MessageId(1), ChannelId(10), UserId(1), "yes");
/// let from_other = InboundMessage::new(MessageId(2), ChannelId(10), UserId(2), "yes");
/// assert!(criteria.evaluate(&from_owner));
/// assert!(!criteria.evaluate(&from_other));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriteriaSet {
    criteria: Vec<Criterion>,
}

impl CriteriaSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, criterion: Criterion) -> Self {
        self.push(criterion);
        self
    }

    pub fn push(&mut self, criterion: Criterion) {
        self.criteria.push(criterion);
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Criterion> {
        self.criteria.iter()
    }

    /// Returns true when every criterion passes; stops at the first failure.
    pub fn evaluate(&self, message: &InboundMessage) -> bool {
        self.first_failure(message).is_none()
    }

    /// Returns the first criterion rejecting `message`, in insertion order.
    pub fn first_failure(&self, message: &InboundMessage) -> Option<&Criterion> {
        self.criteria
            .iter()
            .find(|criterion| !criterion.evaluate(message))
    }
}

impl FromIterator<Criterion> for CriteriaSet {
    fn from_iter<I: IntoIterator<Item = Criterion>>(iter: I) -> Self {
        Self {
            criteria: iter.into_iter().collect(),
        }
    }
}
