use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use thiserror::Error;

use crate::tree::{DomSnapshot, NodeId};

#[derive(Parser)]
#[grammar = "xpath.pest"]
struct XpathParser;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Pest error: {0}")]
    Pest(#[from] Box<pest::error::Error<Rule>>),
    #[error("Unknown rule: {0:?}")]
    UnknownRule(Rule),
    #[error("Invalid position index: {0}")]
    InvalidPosition(std::num::ParseIntError),
    #[error("Position predicates are 1-based")]
    ZeroPosition,
}

/// Parsed locator path. `Root` anchors the first step at the document root,
/// `Descendant` (a leading `//`) lets it match at any depth.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub anchor: Anchor,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Root,
    Descendant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub test: NameTest,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NameTest {
    Any,
    Tag(String),
}

impl NameTest {
    fn matches(&self, tag: &str) -> bool {
        match self {
            NameTest::Any => true,
            NameTest::Tag(name) => name == tag,
        }
    }
}

/// Predicates apply in written order: attribute tests filter the candidate
/// set, a position selects the k-th survivor within its sibling group.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Position(usize),
    Attrs(Vec<AttrTest>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrTest {
    pub name: String,
    pub value: String,
}

pub fn parse(expr: &str) -> Result<Path, PathError> {
    let mut pairs = XpathParser::parse(Rule::path, expr).map_err(Box::new)?;
    let mut anchor = Anchor::Root;
    let mut steps = Vec::new();

    if let Some(pair) = pairs.next() {
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::anchor => {
                    anchor = if inner.as_str() == "//" {
                        Anchor::Descendant
                    } else {
                        Anchor::Root
                    };
                }
                Rule::step => steps.push(parse_step(inner)?),
                Rule::EOI => {}
                rule => return Err(PathError::UnknownRule(rule)),
            }
        }
    }

    Ok(Path { anchor, steps })
}

fn parse_step(pair: Pair<Rule>) -> Result<Step, PathError> {
    let mut test = NameTest::Any;
    let mut predicates = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::name_test => {
                test = match inner.as_str() {
                    "*" => NameTest::Any,
                    name => NameTest::Tag(name.to_string()),
                };
            }
            Rule::predicate => predicates.push(parse_predicate(inner)?),
            rule => return Err(PathError::UnknownRule(rule)),
        }
    }

    Ok(Step { test, predicates })
}

fn parse_predicate(pair: Pair<Rule>) -> Result<Predicate, PathError> {
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::position => {
                let index: usize = inner.as_str().parse().map_err(PathError::InvalidPosition)?;
                if index == 0 {
                    return Err(PathError::ZeroPosition);
                }
                return Ok(Predicate::Position(index));
            }
            Rule::attr_tests => {
                let mut tests = Vec::new();
                for test_pair in inner.into_inner() {
                    if test_pair.as_rule() == Rule::attr_test {
                        tests.push(parse_attr_test(test_pair));
                    }
                }
                return Ok(Predicate::Attrs(tests));
            }
            rule => return Err(PathError::UnknownRule(rule)),
        }
    }
    Err(PathError::UnknownRule(Rule::predicate))
}

fn parse_attr_test(pair: Pair<Rule>) -> AttrTest {
    let mut name = String::new();
    let mut value = String::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::name => name = inner.as_str().to_string(),
            Rule::value => {
                if let Some(raw) = inner.into_inner().next() {
                    value = raw.as_str().to_string();
                }
            }
            _ => {}
        }
    }

    AttrTest { name, value }
}

/// Node-set evaluation over a snapshot, in document order. Steps after the
/// first walk the child axis; the first step matches at the root (`/`) or at
/// any depth (`//`). Positions are evaluated per sibling group, as in XPath.
pub fn evaluate(doc: &DomSnapshot, path: &Path) -> Vec<NodeId> {
    let Some(first) = path.steps.first() else {
        return Vec::new();
    };

    let mut current = match path.anchor {
        Anchor::Root => apply_step(doc, doc.sibling_group(doc.root()), first),
        Anchor::Descendant => {
            let mut out = apply_step(doc, doc.sibling_group(doc.root()), first);
            for node in doc.iter() {
                out.extend(apply_step(doc, doc.children(node), first));
            }
            out
        }
    };

    for step in &path.steps[1..] {
        let mut next = Vec::new();
        for &context in &current {
            next.extend(apply_step(doc, doc.children(context), step));
        }
        current = next;
    }

    // Sibling groups are visited in parent order, which is not document
    // order once matches nest. Ids are pre-order, so sorting restores it.
    current.sort();
    current
}

fn apply_step(doc: &DomSnapshot, group: &[NodeId], step: &Step) -> Vec<NodeId> {
    let mut set: Vec<NodeId> = group
        .iter()
        .copied()
        .filter(|&n| step.test.matches(doc.tag(n)))
        .collect();

    for predicate in &step.predicates {
        match predicate {
            Predicate::Attrs(tests) => {
                set.retain(|&n| {
                    tests
                        .iter()
                        .all(|t| doc.attr(n, &t.name) == Some(t.value.as_str()))
                });
            }
            Predicate::Position(index) => {
                set = set.get(index - 1).map(|&n| vec![n]).unwrap_or_default();
            }
        }
    }

    set
}

/// How many nodes the expression selects in this snapshot.
pub fn match_count(doc: &DomSnapshot, expr: &str) -> Result<usize, PathError> {
    Ok(evaluate(doc, &parse(expr)?).len())
}
