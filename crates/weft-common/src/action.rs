use serde::{Deserialize, Serialize};

/// Debounce window in milliseconds. Shared by the capture-side input rate
/// limiter and the engine's near-duplicate checks.
pub const DEBOUNCE_MS: u64 = 100;

/// Ordered locator candidates for one element. Index 0 is the preferred
/// locator; the rest are fallbacks in strategy-priority order. Candidates are
/// only guaranteed unique at the moment they were computed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocatorSet(Vec<String>);

impl LocatorSet {
    pub fn new(candidates: Vec<String>) -> Self {
        Self(candidates)
    }

    pub fn primary(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Overwrite the preferred locator in place. No-op on an empty set.
    pub fn replace_primary(&mut self, value: String) -> bool {
        match self.0.first_mut() {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Move the candidate at `index` to the front. The displaced candidates
    /// keep their relative order, so two promotions undo each other. Out of
    /// range or already-primary indexes change nothing.
    pub fn promote(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.0.len() {
            return false;
        }
        let candidate = self.0.remove(index);
        self.0.insert(0, candidate);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for LocatorSet {
    fn from(candidates: Vec<String>) -> Self {
        Self(candidates)
    }
}

/// Window dimensions as reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

/// Anchor metadata captured with a click. `href`/`target` come from the
/// nearest enclosing `a` element; `onclick` records whether a script handler
/// was present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub href: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub onclick: bool,
}

impl LinkInfo {
    /// A click on such a link navigates the current tab, so the recorder
    /// synthesizes an explicit navigation action ahead of the click.
    pub fn navigates_same_tab(&self) -> bool {
        !self.href.is_empty() && self.target.is_empty()
    }
}

/// What caused a navigation action that was not observed directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavTrigger {
    Click,
}

/// Element text selected via the context menu, held until it is either used
/// for a success condition or invalidated by the next recorded action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub locators: LocatorSet,
    pub content: String,
}

/// One recorded step. The payload serializes flattened under the
/// `browserAction` tag so the exported log reads as flat records:
/// `{"browserAction":"CLICK","xpath":[...],"timestamp":...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(flatten)]
    pub detail: ActionDetail,
    /// Milliseconds since the Unix epoch, assigned when the action was
    /// appended (or last coalesced into). Used for debounce deltas only.
    pub timestamp: u64,
    #[serde(
        rename = "currentUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub page_url: Option<String>,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        self.detail.kind()
    }

    pub fn locators(&self) -> Option<&LocatorSet> {
        self.detail.locators()
    }

    pub fn locators_mut(&mut self) -> Option<&mut LocatorSet> {
        self.detail.locators_mut()
    }
}

/// Kind-specific action payloads. Every consumer matches exhaustively, so a
/// new kind forces a decision at each merge/dedupe/export site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "browserAction", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionDetail {
    GoToUrl {
        url: String,
        #[serde(
            rename = "triggeredBy",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        triggered_by: Option<NavTrigger>,
    },
    Click {
        xpath: LocatorSet,
        #[serde(rename = "linkInfo", default, skip_serializing_if = "Option::is_none")]
        link: Option<LinkInfo>,
    },
    DoubleClick {
        xpath: LocatorSet,
    },
    /// Committed field value (change event).
    Set {
        xpath: LocatorSet,
        content: String,
    },
    /// In-progress typing; consecutive inputs on one field coalesce.
    Input {
        xpath: LocatorSet,
        content: String,
    },
    /// Special key, e.g. "Enter". May carry no locators (global keys).
    KeyPress {
        #[serde(default, skip_serializing_if = "LocatorSet::is_empty")]
        xpath: LocatorSet,
        content: String,
    },
    Scroll {
        xpath: LocatorSet,
        top: i64,
        left: i64,
    },
    WindowResize {
        width: u32,
        height: u32,
    },
    SuccessConditionEquals {
        xpath: LocatorSet,
        content: String,
    },
    SuccessConditionContains {
        xpath: LocatorSet,
        content: String,
    },
}

impl ActionDetail {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionDetail::GoToUrl { .. } => ActionKind::GoToUrl,
            ActionDetail::Click { .. } => ActionKind::Click,
            ActionDetail::DoubleClick { .. } => ActionKind::DoubleClick,
            ActionDetail::Set { .. } => ActionKind::Set,
            ActionDetail::Input { .. } => ActionKind::Input,
            ActionDetail::KeyPress { .. } => ActionKind::KeyPress,
            ActionDetail::Scroll { .. } => ActionKind::Scroll,
            ActionDetail::WindowResize { .. } => ActionKind::WindowResize,
            ActionDetail::SuccessConditionEquals { .. } => ActionKind::SuccessConditionEquals,
            ActionDetail::SuccessConditionContains { .. } => ActionKind::SuccessConditionContains,
        }
    }

    pub fn locators(&self) -> Option<&LocatorSet> {
        match self {
            ActionDetail::Click { xpath, .. }
            | ActionDetail::DoubleClick { xpath }
            | ActionDetail::Set { xpath, .. }
            | ActionDetail::Input { xpath, .. }
            | ActionDetail::KeyPress { xpath, .. }
            | ActionDetail::Scroll { xpath, .. }
            | ActionDetail::SuccessConditionEquals { xpath, .. }
            | ActionDetail::SuccessConditionContains { xpath, .. } => Some(xpath),
            ActionDetail::GoToUrl { .. } | ActionDetail::WindowResize { .. } => None,
        }
    }

    pub fn locators_mut(&mut self) -> Option<&mut LocatorSet> {
        match self {
            ActionDetail::Click { xpath, .. }
            | ActionDetail::DoubleClick { xpath }
            | ActionDetail::Set { xpath, .. }
            | ActionDetail::Input { xpath, .. }
            | ActionDetail::KeyPress { xpath, .. }
            | ActionDetail::Scroll { xpath, .. }
            | ActionDetail::SuccessConditionEquals { xpath, .. }
            | ActionDetail::SuccessConditionContains { xpath, .. } => Some(xpath),
            ActionDetail::GoToUrl { .. } | ActionDetail::WindowResize { .. } => None,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            ActionDetail::Set { content, .. }
            | ActionDetail::Input { content, .. }
            | ActionDetail::KeyPress { content, .. }
            | ActionDetail::SuccessConditionEquals { content, .. }
            | ActionDetail::SuccessConditionContains { content, .. } => Some(content),
            _ => None,
        }
    }
}

/// Discriminant-only view of an action, for display and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    GoToUrl,
    Click,
    DoubleClick,
    Set,
    Input,
    KeyPress,
    Scroll,
    WindowResize,
    SuccessConditionEquals,
    SuccessConditionContains,
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::GoToUrl => "GO_TO_URL",
            ActionKind::Click => "CLICK",
            ActionKind::DoubleClick => "DOUBLE_CLICK",
            ActionKind::Set => "SET",
            ActionKind::Input => "INPUT",
            ActionKind::KeyPress => "KEY_PRESS",
            ActionKind::Scroll => "SCROLL",
            ActionKind::WindowResize => "WINDOW_RESIZE",
            ActionKind::SuccessConditionEquals => "SUCCESS_CONDITION_EQUALS",
            ActionKind::SuccessConditionContains => "SUCCESS_CONDITION_CONTAINS",
        }
    }

    pub fn is_success_condition(&self) -> bool {
        matches!(
            self,
            ActionKind::SuccessConditionEquals | ActionKind::SuccessConditionContains
        )
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Engine input: an action payload that has not been admitted to the log yet.
/// The engine assigns the timestamp at append time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(flatten)]
    pub detail: ActionDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
}

impl Notification {
    pub fn new(detail: ActionDetail, page_url: Option<String>) -> Self {
        Self { detail, page_url }
    }

    pub fn stamp(self, timestamp: u64) -> Action {
        Action {
            detail: self.detail,
            timestamp,
            page_url: self.page_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locators(values: &[&str]) -> LocatorSet {
        LocatorSet::new(values.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn action_serializes_as_flat_record() {
        let action = Action {
            detail: ActionDetail::Click {
                xpath: locators(&["//button[@id='go']"]),
                link: None,
            },
            timestamp: 1700000000000,
            page_url: Some("https://example.com/".into()),
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["browserAction"], "CLICK");
        assert_eq!(value["xpath"][0], "//button[@id='go']");
        assert_eq!(value["timestamp"], 1700000000000u64);
        assert_eq!(value["currentUrl"], "https://example.com/");
    }

    #[test]
    fn kind_tags_match_log_format() {
        let cases = vec![
            (
                ActionDetail::GoToUrl {
                    url: "https://example.com".into(),
                    triggered_by: None,
                },
                "GO_TO_URL",
            ),
            (
                ActionDetail::DoubleClick {
                    xpath: locators(&["//a"]),
                },
                "DOUBLE_CLICK",
            ),
            (
                ActionDetail::WindowResize {
                    width: 1440,
                    height: 900,
                },
                "WINDOW_RESIZE",
            ),
            (
                ActionDetail::SuccessConditionContains {
                    xpath: locators(&["//p"]),
                    content: "done".into(),
                },
                "SUCCESS_CONDITION_CONTAINS",
            ),
        ];
        for (detail, expected) in cases {
            let value = serde_json::to_value(&detail).unwrap();
            assert_eq!(value["browserAction"], expected);
            assert_eq!(detail.kind().name(), expected);
        }
    }

    #[test]
    fn action_round_trips() {
        let action = Action {
            detail: ActionDetail::GoToUrl {
                url: "https://example.com/a".into(),
                triggered_by: Some(NavTrigger::Click),
            },
            timestamp: 42,
            page_url: None,
        };
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("\"triggeredBy\":\"click\""));
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn promote_moves_candidate_to_front_preserving_order() {
        let mut set = locators(&["a", "b", "c", "d"]);
        assert!(set.promote(2));
        assert_eq!(set.as_slice(), &["c", "a", "b", "d"]);
        // promoting the displaced primary restores the original order
        assert!(set.promote(1));
        assert_eq!(set.as_slice(), &["a", "c", "b", "d"]);
        assert!(set.promote(1));
        assert_eq!(set.as_slice(), &["c", "a", "b", "d"]);
    }

    #[test]
    fn promote_rejects_out_of_range_and_primary() {
        let mut set = locators(&["a", "b"]);
        assert!(!set.promote(0));
        assert!(!set.promote(5));
        assert_eq!(set.as_slice(), &["a", "b"]);

        let mut empty = LocatorSet::default();
        assert!(!empty.promote(1));
        assert!(!empty.replace_primary("x".into()));
    }

    #[test]
    fn replace_primary_overwrites_first_candidate() {
        let mut set = locators(&["a", "b"]);
        assert!(set.replace_primary("z".into()));
        assert_eq!(set.as_slice(), &["z", "b"]);
    }

    #[test]
    fn keypress_omits_empty_locators() {
        let detail = ActionDetail::KeyPress {
            xpath: LocatorSet::default(),
            content: "Enter".into(),
        };
        let value = serde_json::to_value(&detail).unwrap();
        assert!(value.get("xpath").is_none());
        let back: ActionDetail = serde_json::from_value(value).unwrap();
        assert_eq!(back, detail);
    }
}
