use thiserror::Error;
use tracing::info;
use weft_common::action::{Action, ActionDetail, Notification, Selection, WindowSize};
use weft_common::config::RecorderConfig;
use weft_common::protocol::{LastAction, UiContext};

use crate::engine::{Outcome, RecordingEngine};
use crate::session::Session;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no recording in progress")]
    NotRecording,
    #[error("no element selected")]
    NoSelection,
    #[error("the selected element has no usable locator")]
    UnlocatableSelection,
    #[error("a success condition already closes the log")]
    SuccessConditionClosed,
}

/// Which comparison a success condition applies to the element text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessKind {
    Equals,
    Contains,
}

/// Owns the session and every mutation of it: lifecycle, notifications,
/// last-entry edits and success-condition annotation. Synchronous; the
/// service layer wraps it in a mutex and adds the channels.
pub struct SessionController {
    session: Session,
    engine: RecordingEngine,
    clear_log_on_stop: bool,
}

impl SessionController {
    pub fn new(config: &RecorderConfig) -> Self {
        Self {
            session: Session::new(),
            engine: RecordingEngine::new(config.debounce_ms),
            clear_log_on_stop: config.clear_log_on_stop,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.session.recording()
    }

    pub fn log(&self) -> &[Action] {
        self.session.log()
    }

    /// Begin a fresh session. The previous log is discarded. Returns false
    /// when already recording.
    pub fn start(&mut self) -> bool {
        if self.session.recording() {
            return false;
        }
        self.session.clear_log();
        self.session.set_last_window(None);
        self.session.set_selection(None);
        self.session.set_recording(true);
        info!("recording started");
        true
    }

    /// Stop recording and hand back the finished log. Returns `None` when no
    /// recording was in progress.
    pub fn stop(&mut self) -> Option<Vec<Action>> {
        if !self.session.recording() {
            return None;
        }
        self.session.set_recording(false);
        self.session.set_last_window(None);
        let snapshot = self.session.log().to_vec();
        if self.clear_log_on_stop {
            self.session.clear_log();
        }
        info!(actions = snapshot.len(), "recording stopped");
        Some(snapshot)
    }

    pub fn notify(
        &mut self,
        notification: Notification,
        viewport: Option<WindowSize>,
        now: u64,
    ) -> Outcome {
        self.engine.apply(&mut self.session, notification, viewport, now)
    }

    /// Remember the element the user right-clicked; the next recorded action
    /// invalidates it.
    pub fn set_selection(&mut self, selection: Selection) {
        self.session.set_selection(Some(selection));
    }

    /// Drop the most recent action. `Ok(None)` when the log is empty.
    pub fn remove_last(&mut self) -> Result<Option<Action>, SessionError> {
        if !self.session.recording() {
            return Err(SessionError::NotRecording);
        }
        Ok(self.session.pop())
    }

    /// Overwrite the last action's preferred locator with a hand-written one.
    /// `Ok(false)` when the log is empty or the tail carries no locators.
    pub fn replace_primary(&mut self, value: String) -> Result<bool, SessionError> {
        if !self.session.recording() {
            return Err(SessionError::NotRecording);
        }
        let Some(locators) = self.session.tail_mut().and_then(Action::locators_mut) else {
            return Ok(false);
        };
        Ok(locators.replace_primary(value))
    }

    /// Make candidate `index` of the last action the preferred locator.
    /// `Ok(false)` when nothing changed (empty log, no locators, index out of
    /// range or already primary).
    pub fn promote(&mut self, index: usize) -> Result<bool, SessionError> {
        if !self.session.recording() {
            return Err(SessionError::NotRecording);
        }
        let Some(locators) = self.session.tail_mut().and_then(Action::locators_mut) else {
            return Ok(false);
        };
        Ok(locators.promote(index))
    }

    /// Append a success condition built from the pending selection. `content`
    /// overrides the selected text when given.
    pub fn add_success_condition(
        &mut self,
        kind: SuccessKind,
        content: Option<String>,
        now: u64,
    ) -> Result<(), SessionError> {
        if !self.session.recording() {
            return Err(SessionError::NotRecording);
        }
        if self.tail_is_success_condition() {
            return Err(SessionError::SuccessConditionClosed);
        }
        let Some(selection) = self.session.selection().cloned() else {
            return Err(SessionError::NoSelection);
        };
        if selection.locators.is_empty() {
            return Err(SessionError::UnlocatableSelection);
        }
        let content = content.unwrap_or(selection.content);
        let detail = match kind {
            SuccessKind::Equals => ActionDetail::SuccessConditionEquals {
                xpath: selection.locators,
                content,
            },
            SuccessKind::Contains => ActionDetail::SuccessConditionContains {
                xpath: selection.locators,
                content,
            },
        };
        // Routed through the engine so the selection is consumed the same way
        // any other admitted notification consumes it.
        self.engine
            .apply(&mut self.session, Notification::new(detail, None), None, now);
        Ok(())
    }

    /// The surface the extension and the console render: recording flag,
    /// whether a success condition may still be added, and the tail action
    /// with its full candidate list.
    pub fn ui_context(&self) -> UiContext {
        UiContext {
            recording: self.session.recording(),
            success_condition_enabled: self.session.recording()
                && !self.tail_is_success_condition(),
            last: self.session.tail().map(|action| LastAction {
                kind: action.kind().name().to_string(),
                locators: action.locators().cloned().unwrap_or_default(),
            }),
        }
    }

    fn tail_is_success_condition(&self) -> bool {
        self.session
            .tail()
            .is_some_and(|action| action.kind().is_success_condition())
    }
}
