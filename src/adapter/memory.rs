//! Arena-backed in-memory tree.
//!
//! Useful for trees that are built by hand (tests, fixtures) or converted
//! from a representation that has no adapter of its own. Nodes are added
//! bottom-up: children first, then the parent that refers to them.

use crate::adapter::{Adapter, Target};

/// Handle to a node inside a [`MemoryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl From<NodeId> for Target<NodeId> {
    fn from(id: NodeId) -> Self {
        Target::Node(id)
    }
}

impl From<Vec<NodeId>> for Target<NodeId> {
    fn from(ids: Vec<NodeId>) -> Self {
        Target::List(ids.into_iter().map(Target::Node).collect())
    }
}

#[derive(Debug, Clone)]
struct Entry {
    name: Option<String>,
    value: Target<NodeId>,
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: String,
    source: String,
    literal: Option<Target<NodeId>>,
    entries: Vec<Entry>,
    parent: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    nodes: Vec<NodeData>,
    transparent: Vec<String>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node kinds treated as transparent wrappers by the `>` relationship.
    pub fn with_transparent_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transparent = kinds.into_iter().map(Into::into).collect();
        self
    }

    /// Start a new node. Nothing is stored until [`NodeBuilder::finish`].
    pub fn node(&mut self, kind: &str, source: &str) -> NodeBuilder<'_> {
        NodeBuilder {
            tree: self,
            data: NodeData {
                kind: kind.to_string(),
                source: source.to_string(),
                literal: None,
                entries: Vec::new(),
                parent: None,
            },
        }
    }

    pub fn kind(&self, id: NodeId) -> &str {
        &self.nodes[id.0].kind
    }

    pub fn text(&self, id: NodeId) -> &str {
        &self.nodes[id.0].source
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn child_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut ids = Vec::new();
        for entry in &self.nodes[id.0].entries {
            collect_ids(&entry.value, &mut ids);
        }
        ids
    }
}

fn collect_ids(target: &Target<NodeId>, ids: &mut Vec<NodeId>) {
    match target {
        Target::Node(id) => ids.push(*id),
        Target::List(items) => items.iter().for_each(|item| collect_ids(item, ids)),
        _ => {}
    }
}

/// Builder returned by [`MemoryTree::node`].
pub struct NodeBuilder<'t> {
    tree: &'t mut MemoryTree,
    data: NodeData,
}

impl<'t> NodeBuilder<'t> {
    /// Named entry. Node and list values also become children; scalar
    /// values are only reachable through the accessor.
    pub fn field(mut self, name: &str, value: impl Into<Target<NodeId>>) -> Self {
        self.data.entries.push(Entry {
            name: Some(name.to_string()),
            value: value.into(),
        });
        self
    }

    /// Unnamed child entry.
    pub fn child(mut self, value: impl Into<Target<NodeId>>) -> Self {
        self.data.entries.push(Entry {
            name: None,
            value: value.into(),
        });
        self
    }

    /// Host value this node reduces to when compared as a literal.
    pub fn literal(mut self, value: Target<NodeId>) -> Self {
        self.data.literal = Some(value);
        self
    }

    pub fn finish(self) -> NodeId {
        let id = NodeId(self.tree.nodes.len());
        let mut owned = Vec::new();
        for entry in &self.data.entries {
            collect_ids(&entry.value, &mut owned);
        }
        for child in owned {
            self.tree.nodes[child.0].parent = Some(id);
        }
        self.tree.nodes.push(self.data);
        id
    }
}

impl Adapter for MemoryTree {
    type Node = NodeId;

    fn node_type(&self, node: &NodeId) -> String {
        self.nodes[node.0].kind.clone()
    }

    fn source(&self, node: &NodeId) -> String {
        self.nodes[node.0].source.clone()
    }

    fn children(&self, node: &NodeId) -> Vec<Target<NodeId>> {
        self.nodes[node.0]
            .entries
            .iter()
            .filter(|entry| matches!(entry.value, Target::Node(_) | Target::List(_) | Target::Nil))
            .map(|entry| entry.value.clone())
            .collect()
    }

    fn siblings(&self, node: &NodeId) -> Vec<Target<NodeId>> {
        let Some(parent) = self.nodes[node.0].parent else {
            return Vec::new();
        };
        self.child_nodes(parent)
            .into_iter()
            .skip_while(|id| id != node)
            .skip(1)
            .map(Target::Node)
            .collect()
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<Target<NodeId>> {
        self.nodes[node.0]
            .entries
            .iter()
            .find(|entry| entry.name.as_deref() == Some(name))
            .map(|entry| entry.value.clone())
    }

    fn literal(&self, node: &NodeId) -> Option<Target<NodeId>> {
        self.nodes[node.0].literal.clone()
    }

    fn is_transparent(&self, node: &NodeId) -> bool {
        let kind = &self.nodes[node.0].kind;
        self.transparent.iter().any(|t| t == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parents_are_linked_on_finish() {
        let mut tree = MemoryTree::new();
        let a = tree.node("Arg", "a").finish();
        let b = tree.node("Arg", "b").finish();
        let def = tree.node("Def", "def f(a, b); end").field("params", vec![a, b]).finish();

        assert_eq!(tree.parent(a), Some(def));
        assert_eq!(tree.parent(b), Some(def));
        assert_eq!(tree.parent(def), None);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn siblings_follow_flattened_child_order() {
        let mut tree = MemoryTree::new();
        let a = tree.node("A", "a").finish();
        let b1 = tree.node("B", "b1").finish();
        let b2 = tree.node("B", "b2").finish();
        let _parent = tree.node("Body", "a b1 b2").child(vec![a, b1, b2]).finish();

        assert_eq!(tree.siblings(&a), vec![Target::Node(b1), Target::Node(b2)]);
        assert_eq!(tree.siblings(&b2), Vec::<Target<NodeId>>::new());
    }

    #[test]
    fn scalar_fields_are_not_children() {
        let mut tree = MemoryTree::new();
        let def = tree
            .node("Def", "def f; end")
            .field("name", Target::Sym("f".into()))
            .field("superclass", Target::Nil)
            .finish();

        assert_eq!(tree.children(&def), vec![Target::Nil]);
        assert_eq!(tree.attribute(&def, "name"), Some(Target::Sym("f".into())));
        assert_eq!(tree.attribute(&def, "missing"), None);
    }

    #[test]
    fn transparent_kinds_are_configurable() {
        let mut tree = MemoryTree::new().with_transparent_kinds(["Begin"]);
        let begin = tree.node("Begin", "").finish();
        let other = tree.node("Send", "").finish();

        assert!(tree.is_transparent(&begin));
        assert!(!tree.is_transparent(&other));
    }
}
