use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use crate::action::{LocatorSet, WindowSize};

/// Custom deserializer for HashMap<String, String> that filters out null
/// values. The extension serializes absent attributes as null rather than
/// omitting the key.
fn deserialize_nullable_string_map<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let map: HashMap<String, Option<String>> = HashMap::deserialize(deserializer)?;
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| v.map(|val| (k, val)))
        .collect())
}

/// Events sent by the browser extension over the bridge socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CaptureEvent {
    Click(PointerEvent),
    DblClick(PointerEvent),
    /// Committed field value.
    Change(ValueEvent),
    /// Per-keystroke field value.
    Input(ValueEvent),
    KeyPress(KeyEvent),
    Scroll(ScrollEvent),
    /// Right-click selection, held for success-condition annotation.
    ContextMenu(SelectionEvent),
    /// Browser history visit, with the transition collapsed to "was it
    /// typed into the address bar".
    Visited(VisitEvent),
    /// Standalone window-size report (resize listener).
    Viewport(ViewportEvent),
}

impl CaptureEvent {
    pub fn page(&self) -> Option<&PageContext> {
        match self {
            CaptureEvent::Click(e) | CaptureEvent::DblClick(e) => Some(&e.page),
            CaptureEvent::Change(e) | CaptureEvent::Input(e) => Some(&e.page),
            CaptureEvent::KeyPress(e) => Some(&e.page),
            CaptureEvent::Scroll(e) => Some(&e.page),
            CaptureEvent::ContextMenu(e) => Some(&e.page),
            CaptureEvent::Visited(_) | CaptureEvent::Viewport(_) => None,
        }
    }

    /// Wire tag of the event, for diagnostics. Debug-printing the event
    /// itself would dump the whole document snapshot.
    pub fn name(&self) -> &'static str {
        match self {
            CaptureEvent::Click(_) => "click",
            CaptureEvent::DblClick(_) => "dbl_click",
            CaptureEvent::Change(_) => "change",
            CaptureEvent::Input(_) => "input",
            CaptureEvent::KeyPress(_) => "key_press",
            CaptureEvent::Scroll(_) => "scroll",
            CaptureEvent::ContextMenu(_) => "context_menu",
            CaptureEvent::Visited(_) => "visited",
            CaptureEvent::Viewport(_) => "viewport",
        }
    }
}

/// Where an event happened: the page URL plus the window size at that moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContext {
    pub url: String,
    #[serde(default)]
    pub viewport: Option<WindowSize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerEvent {
    pub page: PageContext,
    pub doc: DomNode,
    /// Child-index path from the document root to the event target.
    pub target: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueEvent {
    pub page: PageContext,
    pub doc: DomNode,
    pub target: Vec<usize>,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEvent {
    pub page: PageContext,
    pub doc: DomNode,
    pub target: Vec<usize>,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollEvent {
    pub page: PageContext,
    pub doc: DomNode,
    pub target: Vec<usize>,
    pub top: i64,
    pub left: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionEvent {
    pub page: PageContext,
    pub doc: DomNode,
    pub target: Vec<usize>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitEvent {
    pub url: String,
    #[serde(default)]
    pub typed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportEvent {
    pub width: u32,
    pub height: u32,
}

/// Serialized element tree shipped with each capture event. Only element
/// nodes; text is not carried (selection text travels in the event itself).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomNode {
    pub tag: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string_map")]
    pub attrs: HashMap<String, String>,
    #[serde(default)]
    pub children: Vec<DomNode>,
}

/// Messages pushed back to the extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RecorderMessage {
    /// Current session surface: recording flag plus the data the extension
    /// needs to rebuild its context menu. Pushed after every change.
    Context(UiContext),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiContext {
    pub recording: bool,
    /// False while the log tail is already a success condition.
    pub success_condition_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<LastAction>,
}

/// Tail of the log as shown to the user: kind plus the full candidate list,
/// in order, for the promote/replace menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastAction {
    pub kind: String,
    pub locators: LocatorSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_event_wire_format() {
        let json = r#"{
            "event": "click",
            "page": {"url": "https://example.com/", "viewport": {"width": 1440, "height": 900}},
            "doc": {"tag": "html", "children": [{"tag": "body", "attrs": {"class": "main", "id": null}}]},
            "target": [0]
        }"#;
        let event: CaptureEvent = serde_json::from_str(json).unwrap();
        match &event {
            CaptureEvent::Click(e) => {
                assert_eq!(e.page.url, "https://example.com/");
                assert_eq!(
                    e.page.viewport,
                    Some(WindowSize {
                        width: 1440,
                        height: 900
                    })
                );
                assert_eq!(e.target, vec![0]);
                let body = &e.doc.children[0];
                // null attribute values are dropped, not kept as empty
                assert_eq!(body.attrs.get("class").map(String::as_str), Some("main"));
                assert!(!body.attrs.contains_key("id"));
            }
            other => panic!("expected click, got {other:?}"),
        }
    }

    #[test]
    fn visit_event_defaults_typed_to_false() {
        let event: CaptureEvent =
            serde_json::from_str(r#"{"event": "visited", "url": "https://example.com/"}"#).unwrap();
        match event {
            CaptureEvent::Visited(v) => assert!(!v.typed),
            other => panic!("expected visited, got {other:?}"),
        }
    }

    #[test]
    fn context_message_round_trips() {
        let message = RecorderMessage::Context(UiContext {
            recording: true,
            success_condition_enabled: true,
            last: Some(LastAction {
                kind: "CLICK".into(),
                locators: LocatorSet::new(vec!["//a[@id='x']".into()]),
            }),
        });
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"event\":\"context\""));
        let back: RecorderMessage = serde_json::from_str(&json).unwrap();
        let RecorderMessage::Context(ctx) = back;
        assert!(ctx.recording);
        assert_eq!(ctx.last.unwrap().kind, "CLICK");
    }
}
