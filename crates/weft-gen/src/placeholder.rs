use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use weft_common::action::{Action, LocatorSet};

const PLACEHOLDER_PREFIX: &str = "LOCATOR-#";

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"LOCATOR-#\d+").unwrap());

static ATTR_QUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\[@[a-zA-Z]+)="([^"]*)"\]"#).unwrap());

/// Rewrite `[@attr="v"]` predicates to single quotes so a locator can sit
/// inside a double-quoted Python string unescaped.
pub fn fix_quote_style(locator: &str) -> String {
    ATTR_QUOTE_RE
        .replace_all(locator, "${1}='${2}']")
        .into_owned()
}

/// A log ready for the model: every locator candidate replaced by a
/// `LOCATOR-#n` token, plus the side map needed to put the real values back
/// into whatever text comes out.
#[derive(Debug, Clone)]
pub struct PlaceholderLog {
    pub actions: Vec<Action>,
    map: HashMap<String, String>,
}

impl PlaceholderLog {
    /// Substitute real locators back into generated text. Tokens the model
    /// invented stay as they are.
    pub fn restore(&self, text: &str) -> String {
        PLACEHOLDER_RE
            .replace_all(text, |caps: &Captures| {
                self.map
                    .get(&caps[0])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    pub fn placeholder_count(&self) -> usize {
        self.map.len()
    }
}

/// Replace every locator candidate in the log with a numbered token. Numbering
/// is global across the log, starting at 1, in log order. Quote style is
/// normalized on the mapped values, not the originals.
pub fn tokenize(log: &[Action]) -> PlaceholderLog {
    let mut actions = log.to_vec();
    let mut map = HashMap::new();
    let mut counter = 1usize;
    for action in &mut actions {
        if let Some(locators) = action.locators_mut() {
            let tokens = locators
                .iter()
                .map(|locator| {
                    let token = format!("{PLACEHOLDER_PREFIX}{counter}");
                    counter += 1;
                    map.insert(token.clone(), fix_quote_style(locator));
                    token
                })
                .collect();
            *locators = LocatorSet::new(tokens);
        }
    }
    PlaceholderLog { actions, map }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_common::action::ActionDetail;

    fn locators(values: &[&str]) -> LocatorSet {
        LocatorSet::new(values.iter().map(|s| s.to_string()).collect())
    }

    fn click(candidates: &[&str]) -> Action {
        Action {
            detail: ActionDetail::Click {
                xpath: locators(candidates),
                link: None,
            },
            timestamp: 0,
            page_url: None,
        }
    }

    #[test]
    fn tokenize_numbers_candidates_in_log_order() {
        let log = vec![
            click(&["//button[@id='a']", "/html/body/button"]),
            click(&["//a[@id='b']"]),
        ];
        let tokenized = tokenize(&log);
        assert_eq!(
            tokenized.actions[0].locators().unwrap().as_slice(),
            &["LOCATOR-#1", "LOCATOR-#2"]
        );
        assert_eq!(
            tokenized.actions[1].locators().unwrap().as_slice(),
            &["LOCATOR-#3"]
        );
        assert_eq!(tokenized.placeholder_count(), 3);
        // the input log keeps its real locators
        assert_eq!(log[0].locators().unwrap().primary(), Some("//button[@id='a']"));
    }

    #[test]
    fn tokenize_leaves_locatorless_actions_alone() {
        let log = vec![
            Action {
                detail: ActionDetail::GoToUrl {
                    url: "https://example.com".into(),
                    triggered_by: None,
                },
                timestamp: 0,
                page_url: None,
            },
            Action {
                detail: ActionDetail::WindowResize {
                    width: 1280,
                    height: 800,
                },
                timestamp: 0,
                page_url: None,
            },
        ];
        let tokenized = tokenize(&log);
        assert_eq!(tokenized.placeholder_count(), 0);
        assert_eq!(tokenized.actions, log);
    }

    #[test]
    fn restore_distinguishes_token_1_from_token_10() {
        let candidates: Vec<String> = (1..=10).map(|i| format!("//div[{i}]")).collect();
        let refs: Vec<&str> = candidates.iter().map(String::as_str).collect();
        let tokenized = tokenize(&[click(&refs)]);
        let restored = tokenized.restore("a LOCATOR-#1 b LOCATOR-#10 c");
        assert_eq!(restored, "a //div[1] b //div[10] c");
    }

    #[test]
    fn restore_keeps_unknown_tokens() {
        let tokenized = tokenize(&[click(&["//p"])]);
        assert_eq!(tokenized.restore("x LOCATOR-#99 y"), "x LOCATOR-#99 y");
    }

    #[test]
    fn restore_uses_quote_fixed_values() {
        let tokenized = tokenize(&[click(&[r#"//div[@id="main"]"#])]);
        assert_eq!(
            tokenized.restore("find(LOCATOR-#1)"),
            "find(//div[@id='main'])"
        );
    }

    #[test]
    fn fix_quote_style_rewrites_attribute_predicates() {
        assert_eq!(
            fix_quote_style(r#"//div[@id="main"]/span[@class="x y"]"#),
            "//div[@id='main']/span[@class='x y']"
        );
    }

    #[test]
    fn fix_quote_style_ignores_other_quotes() {
        // single-quoted predicates and non-attribute quotes stay untouched
        assert_eq!(fix_quote_style("//div[@id='main']"), "//div[@id='main']");
        assert_eq!(
            fix_quote_style(r#"//p[text()="hi"]"#),
            r#"//p[text()="hi"]"#
        );
    }
}
