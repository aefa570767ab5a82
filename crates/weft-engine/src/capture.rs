use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};
use tracing::{trace, warn};
use url::Url;
use weft_common::action::{ActionDetail, LinkInfo, LocatorSet, Notification, Selection, WindowSize};
use weft_common::protocol::{
    CaptureEvent, DomNode, KeyEvent, PointerEvent, ScrollEvent, SelectionEvent, ValueEvent,
    VisitEvent,
};
use weft_dom::locator;
use weft_dom::tree::{DomSnapshot, NodeId};

use crate::service::RecorderHandle;

/// Turns raw wire events into engine notifications: gates on the recording
/// flag, resolves locators freshly per event, derives link info for clicks,
/// and rate-limits input bursts with a trailing-edge debounce.
pub struct EventCapture {
    handle: RecorderHandle,
    recording: watch::Receiver<bool>,
    debounce: Duration,
    pending: Option<PendingInput>,
}

/// The newest value of an input burst, held back until the field goes quiet.
struct PendingInput {
    xpath: LocatorSet,
    content: String,
    page_url: String,
    deadline: Instant,
}

impl EventCapture {
    pub fn new(handle: RecorderHandle, debounce_ms: u64) -> Self {
        let recording = handle.recording_watch();
        Self {
            handle,
            recording,
            debounce: Duration::from_millis(debounce_ms),
            pending: None,
        }
    }

    /// Consume events until the bridge channel closes. A pending input is
    /// flushed when its window elapses even while the stream is quiet.
    pub async fn run(mut self, mut events: mpsc::Receiver<CaptureEvent>) {
        loop {
            let deadline = self.pending.as_ref().map(|pending| pending.deadline);
            tokio::select! {
                received = events.recv() => match received {
                    Some(event) => self.process(event).await,
                    None => break,
                },
                _ = flush_timer(deadline) => self.flush_pending().await,
            }
        }
        self.flush_pending().await;
        trace!("event stream closed");
    }

    async fn process(&mut self, event: CaptureEvent) {
        // Viewport readings mirror the browser, not the session, so they are
        // folded in even while idle.
        if let Some(viewport) = event.page().and_then(|page| page.viewport) {
            self.handle.update_viewport(viewport);
        }
        if let CaptureEvent::Viewport(report) = &event {
            self.handle.update_viewport(WindowSize {
                width: report.width,
                height: report.height,
            });
        }

        if !*self.recording.borrow() {
            trace!(event = event.name(), "idle, event dropped");
            return;
        }

        match event {
            CaptureEvent::Click(e) => self.on_click(e).await,
            CaptureEvent::DblClick(e) => self.on_dbl_click(e).await,
            CaptureEvent::Change(e) => self.on_change(e).await,
            CaptureEvent::Input(e) => self.on_input(e).await,
            CaptureEvent::KeyPress(e) => self.on_key_press(e).await,
            CaptureEvent::Scroll(e) => self.on_scroll(e).await,
            CaptureEvent::ContextMenu(e) => self.on_context_menu(e).await,
            CaptureEvent::Visited(e) => self.on_visited(e).await,
            CaptureEvent::Viewport(_) => {}
        }
    }

    async fn on_click(&mut self, event: PointerEvent) {
        self.flush_pending().await;
        let Some((doc, target)) = resolve_target(&event.doc, &event.target, "click") else {
            return;
        };
        let xpath = LocatorSet::new(locator::candidates(&doc, target));
        let link = link_info(&doc, target);
        self.forward(ActionDetail::Click { xpath, link }, event.page.url)
            .await;
    }

    async fn on_dbl_click(&mut self, event: PointerEvent) {
        self.flush_pending().await;
        let Some((doc, target)) = resolve_target(&event.doc, &event.target, "dbl_click") else {
            return;
        };
        let xpath = LocatorSet::new(locator::candidates(&doc, target));
        self.forward(ActionDetail::DoubleClick { xpath }, event.page.url)
            .await;
    }

    async fn on_change(&mut self, event: ValueEvent) {
        self.flush_pending().await;
        let Some((doc, target)) = resolve_target(&event.doc, &event.target, "change") else {
            return;
        };
        let xpath = LocatorSet::new(locator::candidates(&doc, target));
        self.forward(
            ActionDetail::Set {
                xpath,
                content: event.value,
            },
            event.page.url,
        )
        .await;
    }

    /// Trailing-edge debounce: hold the newest value of a burst; the timer
    /// elapsing, any non-input event, or an input for a different field
    /// flushes it. Never forwards stale content and never reorders.
    async fn on_input(&mut self, event: ValueEvent) {
        let Some((doc, target)) = resolve_target(&event.doc, &event.target, "input") else {
            return;
        };
        let xpath = LocatorSet::new(locator::candidates(&doc, target));
        let same_field = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.xpath.primary() == xpath.primary());
        if !same_field {
            self.flush_pending().await;
        }
        self.pending = Some(PendingInput {
            xpath,
            content: event.value,
            page_url: event.page.url,
            deadline: Instant::now() + self.debounce,
        });
    }

    async fn on_key_press(&mut self, event: KeyEvent) {
        self.flush_pending().await;
        // global keys (Escape, shortcuts) may have no resolvable target
        let xpath = match resolve_target(&event.doc, &event.target, "key_press") {
            Some((doc, target)) => LocatorSet::new(locator::candidates(&doc, target)),
            None => LocatorSet::default(),
        };
        self.forward(
            ActionDetail::KeyPress {
                xpath,
                content: event.key,
            },
            event.page.url,
        )
        .await;
    }

    async fn on_scroll(&mut self, event: ScrollEvent) {
        self.flush_pending().await;
        let Some((doc, target)) = resolve_target(&event.doc, &event.target, "scroll") else {
            return;
        };
        let xpath = LocatorSet::new(locator::candidates(&doc, target));
        self.forward(
            ActionDetail::Scroll {
                xpath,
                top: event.top,
                left: event.left,
            },
            event.page.url,
        )
        .await;
    }

    async fn on_context_menu(&mut self, event: SelectionEvent) {
        self.flush_pending().await;
        let Some((doc, target)) = resolve_target(&event.doc, &event.target, "context_menu")
        else {
            return;
        };
        let locators = LocatorSet::new(locator::candidates(&doc, target));
        self.handle
            .set_selection(Selection {
                locators,
                content: event.text,
            })
            .await;
    }

    /// Only address-bar navigations count; link and form navigations are
    /// already covered by the click linkage, and non-web schemes are noise.
    async fn on_visited(&mut self, event: VisitEvent) {
        if !event.typed {
            trace!(url = %event.url, "untyped visit ignored");
            return;
        }
        if !is_web_url(&event.url) {
            trace!(url = %event.url, "non-web visit ignored");
            return;
        }
        self.flush_pending().await;
        let url = event.url;
        self.forward(
            ActionDetail::GoToUrl {
                url: url.clone(),
                triggered_by: None,
            },
            url,
        )
        .await;
    }

    async fn forward(&self, detail: ActionDetail, page_url: String) {
        let outcome = self
            .handle
            .notify(Notification::new(detail, Some(page_url)))
            .await;
        trace!(?outcome, "notification processed");
    }

    async fn flush_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.forward(
                ActionDetail::Input {
                    xpath: pending.xpath,
                    content: pending.content,
                },
                pending.page_url,
            )
            .await;
        }
    }
}

async fn flush_timer(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn resolve_target(
    doc: &DomNode,
    target: &[usize],
    event: &'static str,
) -> Option<(DomSnapshot, NodeId)> {
    let snapshot = DomSnapshot::from_wire(doc);
    match snapshot.resolve(target) {
        Some(node) => Some((snapshot, node)),
        None => {
            warn!(event, ?target, "target path does not resolve, event dropped");
            None
        }
    }
}

fn link_info(doc: &DomSnapshot, node: NodeId) -> Option<LinkInfo> {
    let anchor = doc.ancestor_or_self_with_tag(node, "a")?;
    Some(LinkInfo {
        href: doc.attr(anchor, "href").unwrap_or_default().to_string(),
        target: doc.attr(anchor, "target").unwrap_or_default().to_string(),
        onclick: doc.attr(anchor, "onclick").is_some(),
    })
}

fn is_web_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}
