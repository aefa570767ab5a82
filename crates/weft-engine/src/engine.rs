use tracing::{debug, warn};
use weft_common::action::{
    Action, ActionDetail, ActionKind, NavTrigger, Notification, WindowSize,
};

use crate::session::Session;

/// What happened to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Appended to the log, possibly preceded by synthetic actions.
    Appended,
    /// Folded into the log tail in place.
    Coalesced,
    /// Dropped as a near-duplicate of the log tail.
    Duplicate,
    /// Never reached the log.
    Discarded(DiscardReason),
}

impl Outcome {
    /// True when the log contents changed and the UI surface is stale.
    pub fn changed_log(&self) -> bool {
        matches!(self, Outcome::Appended | Outcome::Coalesced)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The session is idle.
    NotRecording,
    /// The kind requires element locators and none resolved.
    NoLocator,
    /// A navigation without a destination.
    EmptyUrl,
    /// A key press without a key name.
    EmptyKey,
}

/// The log-mutation state machine. Stateless itself; everything it decides is
/// a function of the session, the notification and the clock reading, so
/// tests drive it with explicit timestamps.
#[derive(Debug, Clone)]
pub struct RecordingEngine {
    debounce_ms: u64,
}

impl RecordingEngine {
    pub fn new(debounce_ms: u64) -> Self {
        Self { debounce_ms }
    }

    /// Run one notification through the admission pipeline: recording gate,
    /// structural validation, implicit resize, scroll/input coalescing,
    /// near-duplicate suppression, append.
    ///
    /// `viewport` is the freshest known window size at processing time, not
    /// the size when the event fired; `None` skips the implicit-resize step.
    pub fn apply(
        &self,
        session: &mut Session,
        notification: Notification,
        viewport: Option<WindowSize>,
        now: u64,
    ) -> Outcome {
        if !session.recording() {
            return Outcome::Discarded(DiscardReason::NotRecording);
        }
        if let Some(reason) = validate(&notification.detail) {
            warn!(
                kind = notification.detail.kind().name(),
                ?reason,
                "discarding malformed notification"
            );
            return Outcome::Discarded(reason);
        }

        // A click on a same-tab link navigates without the history stream
        // ever reporting it. Record that navigation ahead of the click.
        if let ActionDetail::Click {
            link: Some(link), ..
        } = &notification.detail
        {
            if link.navigates_same_tab() {
                let nav = Notification::new(
                    ActionDetail::GoToUrl {
                        url: link.href.clone(),
                        triggered_by: Some(NavTrigger::Click),
                    },
                    notification.page_url.clone(),
                );
                self.admit(session, nav, viewport, now);
            }
        }

        let outcome = self.admit(session, notification, viewport, now);
        // The next recorded action invalidates whatever the user had selected.
        session.set_selection(None);
        outcome
    }

    fn admit(
        &self,
        session: &mut Session,
        notification: Notification,
        viewport: Option<WindowSize>,
        now: u64,
    ) -> Outcome {
        // 1. Window size drifted since the last recorded action: record the
        // resize before the action that revealed it.
        if let Some(size) = viewport {
            if session.last_window() != Some(size) {
                session.set_last_window(Some(size));
                let resize = Action {
                    detail: ActionDetail::WindowResize {
                        width: size.width,
                        height: size.height,
                    },
                    timestamp: now,
                    page_url: notification.page_url.clone(),
                };
                let already_recorded = session
                    .tail()
                    .is_some_and(|tail| self.is_duplicate(tail, &resize));
                if !already_recorded {
                    debug!(width = size.width, height = size.height, "implicit window resize");
                    session.push(resize);
                }
            }
        }

        // 2. A scroll supersedes an immediately preceding scroll; only the
        // newest offsets matter.
        if matches!(notification.detail, ActionDetail::Scroll { .. })
            && session
                .tail()
                .is_some_and(|tail| tail.kind() == ActionKind::Scroll)
        {
            session.pop();
        }

        // 3. Typing into the same field updates the tail in place.
        if let ActionDetail::Input { xpath, content } = &notification.detail {
            if let Some(tail) = session.tail_mut() {
                if let ActionDetail::Input {
                    xpath: tail_xpath,
                    content: tail_content,
                } = &mut tail.detail
                {
                    if tail_xpath.primary() == xpath.primary() {
                        *tail_content = content.clone();
                        tail.timestamp = now;
                        return Outcome::Coalesced;
                    }
                }
            }
        }

        // 4. Near-duplicate suppression against the tail.
        let candidate = notification.stamp(now);
        if session
            .tail()
            .is_some_and(|tail| self.is_duplicate(tail, &candidate))
        {
            debug!(kind = candidate.kind().name(), "dropping near-duplicate");
            return Outcome::Duplicate;
        }
        session.push(candidate);
        Outcome::Appended
    }

    /// Kind-specific equality between the incoming action and the log tail.
    /// One exhaustive match over the incoming kind; adding an action kind
    /// forces a duplicate rule here.
    fn is_duplicate(&self, tail: &Action, candidate: &Action) -> bool {
        let within_window =
            candidate.timestamp.saturating_sub(tail.timestamp) <= self.debounce_ms;
        match &candidate.detail {
            ActionDetail::GoToUrl { url, .. } => {
                within_window
                    && matches!(&tail.detail,
                        ActionDetail::GoToUrl { url: prior, .. } if prior == url)
            }
            // Scroll runs already collapse upstream; a repeat carries fresh
            // offsets and is never a duplicate.
            ActionDetail::Scroll { .. } => false,
            ActionDetail::WindowResize { width, height } => {
                within_window
                    && matches!(&tail.detail,
                        ActionDetail::WindowResize { width: w, height: h }
                            if w == width && h == height)
            }
            // At most one success condition may close the log; the text and
            // the clock are irrelevant for that rule.
            ActionDetail::SuccessConditionEquals { .. } => {
                matches!(tail.detail, ActionDetail::SuccessConditionEquals { .. })
            }
            ActionDetail::SuccessConditionContains { .. } => {
                matches!(tail.detail, ActionDetail::SuccessConditionContains { .. })
            }
            ActionDetail::Click { xpath, .. } => {
                within_window
                    && matches!(&tail.detail,
                        ActionDetail::Click { xpath: prior, .. }
                            if prior.primary() == xpath.primary())
            }
            ActionDetail::DoubleClick { xpath } => {
                within_window
                    && matches!(&tail.detail,
                        ActionDetail::DoubleClick { xpath: prior }
                            if prior.primary() == xpath.primary())
            }
            ActionDetail::Set { xpath, content } => {
                within_window
                    && matches!(&tail.detail,
                        ActionDetail::Set { xpath: prior, content: prior_content }
                            if prior.primary() == xpath.primary() && prior_content == content)
            }
            ActionDetail::Input { xpath, content } => {
                within_window
                    && matches!(&tail.detail,
                        ActionDetail::Input { xpath: prior, content: prior_content }
                            if prior.primary() == xpath.primary() && prior_content == content)
            }
            ActionDetail::KeyPress { xpath, content } => {
                within_window
                    && matches!(&tail.detail,
                        ActionDetail::KeyPress { xpath: prior, content: prior_content }
                            if prior.primary() == xpath.primary() && prior_content == content)
            }
        }
    }
}

/// Structural validation. Locator-requiring kinds must carry at least one
/// candidate; navigations need a destination; key presses need a key. A
/// failure here means the capture side shipped something unusable, so the
/// whole notification is dropped rather than half-appended.
fn validate(detail: &ActionDetail) -> Option<DiscardReason> {
    match detail {
        ActionDetail::GoToUrl { url, .. } if url.is_empty() => Some(DiscardReason::EmptyUrl),
        ActionDetail::KeyPress { content, .. } if content.is_empty() => {
            Some(DiscardReason::EmptyKey)
        }
        ActionDetail::Click { xpath, .. }
        | ActionDetail::DoubleClick { xpath }
        | ActionDetail::Set { xpath, .. }
        | ActionDetail::Input { xpath, .. }
        | ActionDetail::Scroll { xpath, .. }
        | ActionDetail::SuccessConditionEquals { xpath, .. }
        | ActionDetail::SuccessConditionContains { xpath, .. }
            if xpath.is_empty() =>
        {
            Some(DiscardReason::NoLocator)
        }
        _ => None,
    }
}
