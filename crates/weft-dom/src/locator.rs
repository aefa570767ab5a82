use crate::path;
use crate::tree::{DomSnapshot, NodeId};

/// Attribute priority for qualified segments and for the sibling profile
/// match: two siblings count as indistinguishable when the tag and all four
/// attributes agree (absent and empty are the same thing here).
const PROFILE_ATTRS: [&str; 4] = ["id", "class", "name", "type"];

/// Compute locator candidates for `target`, best first.
///
/// Three strategies run in fixed priority order, the results are deduplicated
/// keeping the first occurrence, and every survivor is re-evaluated against
/// the snapshot; anything that does not match exactly one node is dropped.
/// An empty result means the element has no unambiguous locator right now;
/// the caller decides what that means, nothing is invented here.
pub fn candidates(doc: &DomSnapshot, target: NodeId) -> Vec<String> {
    let raw = [
        anchored_path(doc, target),
        attribute_path(doc, target),
        minimal_path(doc, target),
    ];

    let mut unique: Vec<String> = Vec::with_capacity(raw.len());
    for candidate in raw {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }

    unique.retain(|candidate| matches_exactly_one(doc, candidate));
    unique
}

fn matches_exactly_one(doc: &DomSnapshot, expr: &str) -> bool {
    // A candidate that does not even parse (a quote inside an attribute
    // value breaks the syntax) is as useless as an ambiguous one.
    path::match_count(doc, expr).map(|n| n == 1).unwrap_or(false)
}

/// Strategy 1: positional path anchored at the nearest id.
///
/// The element's own id wins outright (`//tag[@id='…']`); otherwise the walk
/// stops at the first ancestor with an id and emits it plus the positional
/// suffix below it. With no id anywhere this degrades to a full positional
/// path from the root.
fn anchored_path(doc: &DomSnapshot, target: NodeId) -> String {
    if let Some(id) = non_empty_attr(doc, target, "id") {
        return normalize(&format!("//{}[@id='{}']", doc.tag(target), id));
    }

    let mut suffix = positional_segment(doc, target);
    let mut node = target;
    while let Some(parent) = doc.parent(node) {
        if let Some(id) = non_empty_attr(doc, parent, "id") {
            return normalize(&format!("//{}[@id='{}']/{}", doc.tag(parent), id, suffix));
        }
        suffix = format!("{}/{}", positional_segment(doc, parent), suffix);
        node = parent;
    }
    normalize(&suffix)
}

/// Strategy 2: full path where every segment carries its attribute profile.
fn attribute_path(doc: &DomSnapshot, target: NodeId) -> String {
    let mut segments = Vec::new();
    let mut node = Some(target);
    while let Some(n) = node {
        segments.push(qualified_segment(doc, n));
        node = doc.parent(n);
    }
    segments.reverse();
    normalize(&segments.join("/"))
}

/// Strategy 3: bare `//*[@id="…"]` when the element has an id, otherwise a
/// plain positional path from the root. The double quotes are the historical
/// output shape; the export layer normalizes quote style.
fn minimal_path(doc: &DomSnapshot, target: NodeId) -> String {
    if let Some(id) = non_empty_attr(doc, target, "id") {
        return format!("//*[@id=\"{}\"]", id);
    }

    let mut segments = Vec::new();
    let mut node = Some(target);
    while let Some(n) = node {
        segments.push(positional_segment(doc, n));
        node = doc.parent(n);
    }
    segments.reverse();
    normalize(&format!("/{}", segments.join("/")))
}

/// `tag` or `tag[k]`, with the index present only when the element actually
/// has same-tag siblings (k = 1 + preceding same-tag siblings).
fn positional_segment(doc: &DomSnapshot, node: NodeId) -> String {
    let tag = doc.tag(node);
    let (before, after) = neighbors(doc, node, |a, b| doc.tag(a) == doc.tag(b));
    if before + after > 0 {
        format!("{}[{}]", tag, before + 1)
    } else {
        tag.to_string()
    }
}

fn qualified_segment(doc: &DomSnapshot, node: NodeId) -> String {
    let mut segment = doc.tag(node).to_string();

    let tests: Vec<String> = PROFILE_ATTRS
        .iter()
        .filter_map(|name| {
            non_empty_attr(doc, node, name).map(|value| format!("@{}='{}'", name, value))
        })
        .collect();
    if !tests.is_empty() {
        segment.push('[');
        segment.push_str(&tests.join(" and "));
        segment.push(']');
    }

    let (before, after) = neighbors(doc, node, |a, b| profile_matches(doc, a, b));
    if before + after > 0 {
        segment.push_str(&format!("[{}]", before + 1));
    }

    segment
}

fn profile_matches(doc: &DomSnapshot, a: NodeId, b: NodeId) -> bool {
    doc.tag(a) == doc.tag(b)
        && PROFILE_ATTRS.iter().all(|name| {
            doc.attr(a, name).unwrap_or_default() == doc.attr(b, name).unwrap_or_default()
        })
}

/// Counts of siblings before and after the node that satisfy `matches`.
fn neighbors(
    doc: &DomSnapshot,
    node: NodeId,
    matches: impl Fn(NodeId, NodeId) -> bool,
) -> (usize, usize) {
    let group = doc.sibling_group(node);
    let position = group
        .iter()
        .position(|&sibling| sibling == node)
        .unwrap_or(0);
    let before = group[..position]
        .iter()
        .filter(|&&sibling| matches(sibling, node))
        .count();
    let after = group[position + 1..]
        .iter()
        .filter(|&&sibling| matches(sibling, node))
        .count();
    (before, after)
}

fn non_empty_attr<'a>(doc: &'a DomSnapshot, node: NodeId, name: &str) -> Option<&'a str> {
    doc.attr(node, name).filter(|value| !value.is_empty())
}

/// Collapse a leading `html` / `/html` / `//html` prefix to exactly `/html`,
/// leaving any predicate on the html segment intact.
fn normalize(path: &str) -> String {
    for prefix in ["//html", "/html", "html"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            if rest.is_empty() || rest.starts_with('/') || rest.starts_with('[') {
                return format!("/html{rest}");
            }
        }
    }
    path.to_string()
}
