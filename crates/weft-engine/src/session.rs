use std::time::{SystemTime, UNIX_EPOCH};

use weft_common::action::{Action, Selection, WindowSize};

/// Recorder state for one daemon run. There is exactly one instance, owned by
/// the controller; nothing mutates it except through controller and engine
/// code paths.
#[derive(Debug, Default)]
pub struct Session {
    recording: bool,
    log: Vec<Action>,
    last_window: Option<WindowSize>,
    pending_selection: Option<Selection>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recording(&self) -> bool {
        self.recording
    }

    pub fn log(&self) -> &[Action] {
        &self.log
    }

    pub fn last_window(&self) -> Option<WindowSize> {
        self.last_window
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.pending_selection.as_ref()
    }

    pub(crate) fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    pub(crate) fn clear_log(&mut self) {
        self.log.clear();
    }

    pub(crate) fn push(&mut self, action: Action) {
        self.log.push(action);
    }

    pub(crate) fn pop(&mut self) -> Option<Action> {
        self.log.pop()
    }

    pub(crate) fn tail(&self) -> Option<&Action> {
        self.log.last()
    }

    pub(crate) fn tail_mut(&mut self) -> Option<&mut Action> {
        self.log.last_mut()
    }

    pub(crate) fn set_last_window(&mut self, size: Option<WindowSize>) {
        self.last_window = size;
    }

    pub(crate) fn set_selection(&mut self, selection: Option<Selection>) {
        self.pending_selection = selection;
    }
}

/// Milliseconds since the Unix epoch. Reads 0 on a clock set before the
/// epoch rather than failing.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
