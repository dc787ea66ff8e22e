//! Throttled query trigger.
//!
//! Turns the stream of anchor text edits into gated, debounced calls of the
//! query callback, and tells the popup when to show or hide.
//!
//! - Blank text cancels any pending query and asks for the popup to hide.
//! - Text longer than the minimum asks for the popup to show and dispatches
//!   a query, either immediately or after the throttle window.
//! - Anything else is ignored.
//!
//! A throttled query does not carry the text it was scheduled with. The
//! fire closure reads the anchor's live text when it runs, so a burst of
//! edits collapses into one query for the final value.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use horizon_suggest_core::{ScheduledTaskId, SharedTaskScheduler};
use serde::{Deserialize, Serialize};

const TARGET: &str = horizon_suggest_core::logging::targets::TRIGGER;

/// How the text length is compared with the minimum character count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinCharactersRule {
    /// Length must be strictly greater than the minimum.
    #[default]
    Exceeds,
    /// Length must be greater than or equal to the minimum.
    AtLeast,
}

impl MinCharactersRule {
    /// Check a text length against the minimum.
    pub fn admits(self, length: usize, min_characters: usize) -> bool {
        match self {
            Self::Exceeds => length > min_characters,
            Self::AtLeast => length >= min_characters,
        }
    }
}

/// What the popup should do in response to an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityRequest {
    Show,
    Hide,
}

/// How the query for an edit was dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryDispatch {
    /// No query for this edit.
    None,
    /// Run the query right away with this text.
    Immediate(String),
    /// A query is scheduled on the UI queue.
    Scheduled(ScheduledTaskId),
}

/// Result of feeding one edit into the trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerOutcome {
    pub visibility: Option<VisibilityRequest>,
    pub dispatch: QueryDispatch,
}

impl TriggerOutcome {
    const IGNORED: Self = Self {
        visibility: None,
        dispatch: QueryDispatch::None,
    };
}

/// Debounce and minimum-length gate for query callbacks.
///
/// At most one throttled query is pending at any time; scheduling a new one
/// cancels the previous one. Dropping the trigger cancels the pending query.
pub struct ThrottledQueryTrigger {
    scheduler: Arc<SharedTaskScheduler>,
    throttle: Duration,
    min_characters: usize,
    rule: MinCharactersRule,
    pending: Option<ScheduledTaskId>,
}

impl ThrottledQueryTrigger {
    /// Create a trigger posting throttled queries to `scheduler`.
    pub fn new(scheduler: Arc<SharedTaskScheduler>, throttle: Duration) -> Self {
        Self {
            scheduler,
            throttle,
            min_characters: 0,
            rule: MinCharactersRule::default(),
            pending: None,
        }
    }

    /// Set the minimum character count using builder pattern.
    pub fn with_min_characters(mut self, min_characters: usize) -> Self {
        self.min_characters = min_characters;
        self
    }

    /// Set the comparison rule using builder pattern.
    pub fn with_rule(mut self, rule: MinCharactersRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn throttle(&self) -> Duration {
        self.throttle
    }

    pub fn min_characters(&self) -> usize {
        self.min_characters
    }

    pub fn set_min_characters(&mut self, min_characters: usize) {
        self.min_characters = min_characters;
    }

    pub fn rule(&self) -> MinCharactersRule {
        self.rule
    }

    pub fn set_rule(&mut self, rule: MinCharactersRule) {
        self.rule = rule;
    }

    /// Returns true if a throttled query is waiting to fire.
    pub fn has_pending(&self) -> bool {
        self.pending
            .is_some_and(|id| self.scheduler.is_active(id))
    }

    /// Cancel the pending throttled query, if any.
    pub fn cancel_pending(&mut self) {
        if let Some(id) = self.pending.take() {
            if self.scheduler.cancel(id).is_ok() {
                tracing::trace!(target: TARGET, ?id, "pending query cancelled");
            }
        }
    }

    /// Feed one edit into the trigger.
    ///
    /// `fire` is scheduled when throttling is on; it is expected to read the
    /// anchor's live text and run the query. With no throttle the caller runs
    /// the query itself with the text in [`QueryDispatch::Immediate`].
    pub fn handle_text<F>(&mut self, text: &str, fire: F) -> TriggerOutcome
    where
        F: FnMut() + Send + 'static,
    {
        if text.trim().is_empty() {
            self.cancel_pending();
            tracing::debug!(target: TARGET, "blank text, requesting hide");
            return TriggerOutcome {
                visibility: Some(VisibilityRequest::Hide),
                dispatch: QueryDispatch::None,
            };
        }

        let length = text.chars().count();
        if !self.rule.admits(length, self.min_characters) {
            tracing::trace!(target: TARGET, length, min = self.min_characters, "text below minimum");
            return TriggerOutcome::IGNORED;
        }

        let dispatch = if self.throttle.is_zero() {
            QueryDispatch::Immediate(text.to_owned())
        } else {
            self.cancel_pending();
            let id = self.scheduler.schedule_once(self.throttle, fire);
            self.pending = Some(id);
            tracing::trace!(target: TARGET, ?id, throttle = ?self.throttle, "query scheduled");
            QueryDispatch::Scheduled(id)
        };

        TriggerOutcome {
            visibility: Some(VisibilityRequest::Show),
            dispatch,
        }
    }
}

impl Drop for ThrottledQueryTrigger {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

impl fmt::Debug for ThrottledQueryTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottledQueryTrigger")
            .field("throttle", &self.throttle)
            .field("min_characters", &self.min_characters)
            .field("rule", &self.rule)
            .field("pending", &self.pending)
            .finish()
    }
}
