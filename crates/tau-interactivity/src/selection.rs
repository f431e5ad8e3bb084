//! Immutable selection prompts and their builder.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::{Action, ActionPipeline};
use crate::criteria::{CriteriaSet, Criterion};
use crate::error::SelectionError;
use crate::matching::{text_equals, MatchVerdict, ReplyMatcher};
use crate::message::{ChannelId, InboundMessage, UserId};

/// Moderation and cancel-label options attached to a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionAppearance {
    pub delete_invalid: bool,
    pub delete_valid: bool,
    pub cancel_display: String,
}

impl Default for SelectionAppearance {
    fn default() -> Self {
        Self {
            delete_invalid: false,
            delete_valid: false,
            cancel_display: "Cancel".to_string(),
        }
    }
}

/// A prompt offering `values`, each chosen by replying with the possibility at the same index.
///
/// Built through [`SelectionBuilder`]; share it with `Arc` to run several
/// collectors against the same prompt.
#[derive(Debug, Clone)]
pub struct Selection<T> {
    values: Vec<T>,
    possibilities: Vec<String>,
    allowed_users: BTreeSet<UserId>,
    allow_cancel: bool,
    case_sensitive: bool,
    appearance: SelectionAppearance,
    presentation: Value,
}

impl<T> Selection<T> {
    pub fn builder() -> SelectionBuilder<T> {
        SelectionBuilder::new()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn possibilities(&self) -> &[String] {
        &self.possibilities
    }

    pub fn allowed_users(&self) -> &BTreeSet<UserId> {
        &self.allowed_users
    }

    pub fn is_user_restricted(&self) -> bool {
        !self.allowed_users.is_empty()
    }

    pub fn allow_cancel(&self) -> bool {
        self.allow_cancel
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn appearance(&self) -> &SelectionAppearance {
        &self.appearance
    }

    /// Returns a copy of the prompt payload; the stored payload never changes.
    pub fn presentation(&self) -> Value {
        self.presentation.clone()
    }

    /// Criteria gating replies in `channel_id`.
    pub fn criteria(&self, channel_id: ChannelId) -> CriteriaSet {
        let mut criteria = CriteriaSet::new().with(Criterion::InChannel(channel_id));
        if self.is_user_restricted() {
            criteria.push(Criterion::UserIsAllowed(self.allowed_users.clone()));
        }
        criteria
    }

    pub fn actions(&self) -> ActionPipeline {
        ActionPipeline::new(vec![Action::DeleteMessages {
            delete_invalid: self.appearance.delete_invalid,
            delete_valid: self.appearance.delete_valid,
        }])
    }

    /// Index of the first possibility equal to `text` under the selection's case rule.
    pub fn position_of(&self, text: &str) -> Option<usize> {
        self.possibilities
            .iter()
            .position(|possibility| text_equals(text, possibility, self.case_sensitive))
    }
}

impl<T> ReplyMatcher<T> for Selection<T>
where
    T: Clone + Send + Sync,
{
    fn match_reply(&self, message: &InboundMessage, cancel_phrase: &str) -> MatchVerdict<T> {
        let text = message.reply_text();
        if self.allow_cancel && text_equals(text, cancel_phrase.trim(), self.case_sensitive) {
            return MatchVerdict::Cancelled;
        }
        match self.position_of(text) {
            Some(index) => MatchVerdict::Matched(self.values[index].clone()),
            None => MatchVerdict::Invalid,
        }
    }
}

/// Builder for [`Selection`].
///
/// # Examples
///
/// ```
/// use tau_interactivity::Selection;
///
/// let selection = Selection::builder()
///     .with_option("A", "apple")
///     .with_option("B", "banana")
///     .allow_cancel(true)
///     .build()
///     .expect("valid selection");
///
/// assert_eq!(selection.position_of("BANANA"), Some(1));
/// assert!(!selection.is_user_restricted());
/// ```
#[derive(Debug, Clone)]
pub struct SelectionBuilder<T> {
    values: Vec<T>,
    possibilities: Vec<String>,
    allowed_users: BTreeSet<UserId>,
    allow_cancel: bool,
    case_sensitive: bool,
    appearance: SelectionAppearance,
    presentation: Value,
}

impl<T> Default for SelectionBuilder<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            possibilities: Vec::new(),
            allowed_users: BTreeSet::new(),
            allow_cancel: false,
            case_sensitive: false,
            appearance: SelectionAppearance::default(),
            presentation: Value::Null,
        }
    }
}

impl<T> SelectionBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(mut self, values: impl IntoIterator<Item = T>) -> Self {
        self.values = values.into_iter().collect();
        self
    }

    pub fn possibilities<S>(mut self, possibilities: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<String>,
    {
        self.possibilities = possibilities.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces possibilities with `render(value)` for every current value.
    pub fn possibilities_from(mut self, render: impl Fn(&T) -> String) -> Self {
        self.possibilities = self.values.iter().map(render).collect();
        self
    }

    /// Replaces possibilities with `1..=n`.
    pub fn numbered(mut self) -> Self {
        self.possibilities = (1..=self.values.len()).map(|index| index.to_string()).collect();
        self
    }

    pub fn with_option(mut self, value: T, possibility: impl Into<String>) -> Self {
        self.values.push(value);
        self.possibilities.push(possibility.into());
        self
    }

    pub fn allowed_users(mut self, users: impl IntoIterator<Item = UserId>) -> Self {
        self.allowed_users = users.into_iter().collect();
        self
    }

    pub fn allow_cancel(mut self, allow_cancel: bool) -> Self {
        self.allow_cancel = allow_cancel;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn appearance(mut self, appearance: SelectionAppearance) -> Self {
        self.appearance = appearance;
        self
    }

    pub fn presentation(mut self, presentation: Value) -> Self {
        self.presentation = presentation;
        self
    }

    pub fn build(self) -> Result<Selection<T>, SelectionError> {
        if self.values.is_empty() {
            return Err(SelectionError::EmptyValues);
        }
        if self.values.len() != self.possibilities.len() {
            return Err(SelectionError::LengthMismatch {
                values: self.values.len(),
                possibilities: self.possibilities.len(),
            });
        }

        Ok(Selection {
            values: self.values,
            possibilities: self
                .possibilities
                .into_iter()
                .map(|possibility| possibility.trim().to_string())
                .collect(),
            allowed_users: self.allowed_users,
            allow_cancel: self.allow_cancel,
            case_sensitive: self.case_sensitive,
            appearance: self.appearance,
            presentation: self.presentation,
        })
    }
}
