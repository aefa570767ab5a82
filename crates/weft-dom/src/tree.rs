use std::collections::HashMap;

use weft_common::protocol::DomNode;

/// Index into a [`DomSnapshot`] arena. Nodes are numbered in pre-order, so
/// comparing ids compares document positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attrs: HashMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena view of the element tree shipped with a capture event. Nodes are
/// stored in pre-order, so iteration follows document order. Tags are
/// lowercased at build time; attribute values are kept verbatim.
#[derive(Debug, Clone)]
pub struct DomSnapshot {
    nodes: Vec<NodeData>,
    root_group: Vec<NodeId>,
}

impl DomSnapshot {
    pub fn from_wire(root: &DomNode) -> Self {
        let mut nodes = Vec::new();
        build(&mut nodes, root, None);
        Self {
            nodes,
            root_group: vec![NodeId(0)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn tag(&self, node: NodeId) -> &str {
        &self.nodes[node.0].tag
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0].attrs.get(name).map(String::as_str)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// The sibling list the node belongs to, in document order. The root's
    /// group contains only the root.
    pub fn sibling_group(&self, node: NodeId) -> &[NodeId] {
        match self.parent(node) {
            Some(parent) => self.children(parent),
            None => &self.root_group,
        }
    }

    /// Walk a child-index path from the root, as sent on the wire.
    pub fn resolve(&self, path: &[usize]) -> Option<NodeId> {
        let mut node = self.root();
        for &index in path {
            node = *self.children(node).get(index)?;
        }
        Some(node)
    }

    /// All nodes in document order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Nearest ancestor (or the node itself) with the given tag.
    pub fn ancestor_or_self_with_tag(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.tag(n) == tag {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }
}

fn build(nodes: &mut Vec<NodeData>, node: &DomNode, parent: Option<NodeId>) -> NodeId {
    let id = NodeId(nodes.len());
    nodes.push(NodeData {
        tag: node.tag.to_ascii_lowercase(),
        attrs: node.attrs.clone(),
        parent,
        children: Vec::new(),
    });
    for child in &node.children {
        let child_id = build(nodes, child, Some(id));
        nodes[id.0].children.push(child_id);
    }
    id
}
