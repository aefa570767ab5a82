use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{error, info};
use weft_common::action::{Action, Notification, Selection, WindowSize};
use weft_common::config::RecorderConfig;
use weft_common::protocol::UiContext;

use crate::controller::{SessionController, SessionError, SuccessKind};
use crate::engine::Outcome;
use crate::session::now_ms;
use crate::sink::LogSink;

/// Cloneable async facade over the controller. One mutex guards the session;
/// a whole notification runs inside one acquisition, so notifications are
/// admitted strictly one at a time in arrival order. Cheap reads (recording
/// flag, UI context, viewport) go through watch channels instead of the lock.
#[derive(Clone)]
pub struct RecorderHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    controller: Mutex<SessionController>,
    recording_tx: watch::Sender<bool>,
    context_tx: watch::Sender<UiContext>,
    viewport_tx: watch::Sender<Option<WindowSize>>,
    sink: Option<Arc<dyn LogSink>>,
    delivery: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl RecorderHandle {
    pub fn new(config: &RecorderConfig, sink: Option<Arc<dyn LogSink>>) -> Self {
        let controller = SessionController::new(config);
        let (recording_tx, _) = watch::channel(false);
        let (context_tx, _) = watch::channel(controller.ui_context());
        let (viewport_tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(HandleInner {
                controller: Mutex::new(controller),
                recording_tx,
                context_tx,
                viewport_tx,
                sink,
                delivery: Mutex::new(None),
            }),
        }
    }

    /// Answerable without the session lock.
    pub fn is_recording(&self) -> bool {
        *self.inner.recording_tx.borrow()
    }

    pub fn recording_watch(&self) -> watch::Receiver<bool> {
        self.inner.recording_tx.subscribe()
    }

    pub fn context_watch(&self) -> watch::Receiver<UiContext> {
        self.inner.context_tx.subscribe()
    }

    /// Fold the browser's latest window size into the viewport cache. Always
    /// applied, recording or not; it mirrors the browser, not session state.
    pub fn update_viewport(&self, size: WindowSize) {
        self.inner.viewport_tx.send_replace(Some(size));
    }

    pub async fn start(&self) -> bool {
        let mut controller = self.inner.controller.lock().await;
        let started = controller.start();
        self.publish(&controller);
        started
    }

    /// Stop the session and hand a non-empty log to the sink on a background
    /// task, so a slow generator never blocks the console or the bridge.
    pub async fn stop(&self) -> Option<Vec<Action>> {
        let snapshot = {
            let mut controller = self.inner.controller.lock().await;
            let snapshot = controller.stop();
            self.publish(&controller);
            snapshot
        }?;
        if snapshot.is_empty() {
            info!("empty log, nothing to deliver");
        } else if let Some(sink) = self.inner.sink.clone() {
            let log = snapshot.clone();
            let task = tokio::spawn(async move {
                match sink.deliver(&log).await {
                    Ok(()) => info!(actions = log.len(), "log delivered"),
                    Err(err) => error!(error = %err, "log delivery failed"),
                }
            });
            *self.inner.delivery.lock().await = Some(task);
        }
        Some(snapshot)
    }

    /// Wait for an in-flight log delivery to finish. Called at shutdown so a
    /// generation kicked off by `stop` is not cut short by runtime teardown.
    pub async fn drain(&self) {
        let task = self.inner.delivery.lock().await.take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                error!(error = %err, "delivery task failed");
            }
        }
    }

    /// Run one notification through the engine. The recording flag is checked
    /// again inside the lock, so an event that raced a stop cannot touch the
    /// stopped log.
    pub async fn notify(&self, notification: Notification) -> Outcome {
        let viewport = *self.inner.viewport_tx.borrow();
        let mut controller = self.inner.controller.lock().await;
        let outcome = controller.notify(notification, viewport, now_ms());
        if outcome.changed_log() {
            self.publish(&controller);
        }
        outcome
    }

    pub async fn set_selection(&self, selection: Selection) {
        let mut controller = self.inner.controller.lock().await;
        controller.set_selection(selection);
    }

    pub async fn remove_last(&self) -> Result<Option<Action>, SessionError> {
        let mut controller = self.inner.controller.lock().await;
        let removed = controller.remove_last()?;
        if removed.is_some() {
            self.publish(&controller);
        }
        Ok(removed)
    }

    pub async fn replace_primary(&self, value: String) -> Result<bool, SessionError> {
        let mut controller = self.inner.controller.lock().await;
        let changed = controller.replace_primary(value)?;
        if changed {
            self.publish(&controller);
        }
        Ok(changed)
    }

    pub async fn promote(&self, index: usize) -> Result<bool, SessionError> {
        let mut controller = self.inner.controller.lock().await;
        let changed = controller.promote(index)?;
        if changed {
            self.publish(&controller);
        }
        Ok(changed)
    }

    pub async fn add_success_condition(
        &self,
        kind: SuccessKind,
        content: Option<String>,
    ) -> Result<(), SessionError> {
        let mut controller = self.inner.controller.lock().await;
        controller.add_success_condition(kind, content, now_ms())?;
        self.publish(&controller);
        Ok(())
    }

    pub async fn ui_context(&self) -> UiContext {
        self.inner.controller.lock().await.ui_context()
    }

    pub async fn log_snapshot(&self) -> Vec<Action> {
        self.inner.controller.lock().await.log().to_vec()
    }

    fn publish(&self, controller: &SessionController) {
        let context = controller.ui_context();
        self.inner.recording_tx.send_replace(context.recording);
        self.inner.context_tx.send_replace(context);
    }
}
