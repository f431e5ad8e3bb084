//! Reply text matching for eligible messages.

use crate::message::InboundMessage;

/// Result of matching one eligible message against a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchVerdict<T> {
    /// Eligible message that neither cancels nor selects anything.
    Invalid,
    Matched(T),
    Cancelled,
}

impl<T> MatchVerdict<T> {
    pub fn is_definitive(&self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

/// Turns an eligible message into a verdict for a collector producing `T`.
pub trait ReplyMatcher<T>: Send + Sync {
    fn match_reply(&self, message: &InboundMessage, cancel_phrase: &str) -> MatchVerdict<T>;
}

/// Matcher accepting the first eligible message as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyMessage;

impl ReplyMatcher<InboundMessage> for AnyMessage {
    fn match_reply(
        &self,
        message: &InboundMessage,
        _cancel_phrase: &str,
    ) -> MatchVerdict<InboundMessage> {
        MatchVerdict::Matched(message.clone())
    }
}

/// Compares reply text, folding case with Unicode lowercase unless `case_sensitive`.
pub fn text_equals(left: &str, right: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        return left == right;
    }
    left == right || left.to_lowercase() == right.to_lowercase()
}
