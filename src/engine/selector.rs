//! Selector AST and matching.

use crate::adapter::{Adapter, Target};
use crate::engine::errors::MatchError;
use crate::engine::expression::ExpressionList;
use crate::engine::options::{traverse, QueryOptions};
use crate::engine::value::{Operator, Value};
use crate::path::{child_nodes, flatten_nodes, KeyPath};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relationship {
    /// `>`
    Child,
    /// `+`
    NextSibling,
    /// `~`
    SubsequentSibling,
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relationship::Child => ">",
            Relationship::NextSibling => "+",
            Relationship::SubsequentSibling => "~",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoClass {
    Has,
    NotHas,
}

impl fmt::Display for PseudoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PseudoClass::Has => "has",
            PseudoClass::NotHas => "not_has",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    FirstChild,
    LastChild,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Position::FirstChild => "first-child",
            Position::LastChild => "last-child",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pseudo {
    pub class: PseudoClass,
    pub expression: Box<ExpressionList>,
}

/// `key operator value`, e.g. `params.size>=2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub key: KeyPath,
    pub operator: Operator,
    pub value: Value,
}

impl Attribute {
    pub fn new(key: KeyPath, operator: Operator, value: Value) -> Self {
        Self { key, operator, value }
    }

    pub fn matches<A: Adapter>(
        &self,
        adapter: &A,
        node: &A::Node,
        base: &A::Node,
    ) -> Result<bool, MatchError> {
        let actual = self.key.resolve(adapter, node);
        self.value.matches(adapter, &actual, base, self.operator)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = &self.key;
        let value = &self.value;
        match self.operator {
            Operator::Equal => write!(f, "{key}={value}"),
            Operator::In => write!(f, "{key} in {value}"),
            Operator::NotIn => write!(f, "{key} not in {value}"),
            Operator::Includes => write!(f, "{key} includes {value}"),
            Operator::NotIncludes => write!(f, "{key} not includes {value}"),
            operator => write!(f, "{key}{operator}{value}"),
        }
    }
}

/// Conjunction of bracketed attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeList {
    attributes: Vec<Attribute>,
}

impl AttributeList {
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self { attributes }
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn matches<A: Adapter>(
        &self,
        adapter: &A,
        node: &A::Node,
        base: &A::Node,
    ) -> Result<bool, MatchError> {
        for attribute in &self.attributes {
            if !attribute.matches(adapter, node, base)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Display for AttributeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for attribute in &self.attributes {
            write!(f, "[{attribute}]")?;
        }
        Ok(())
    }
}

/// `.Type[attr]...`
#[derive(Debug, Clone, PartialEq)]
pub struct BasicSelector {
    pub node_type: String,
    pub attributes: AttributeList,
}

impl BasicSelector {
    pub fn new(node_type: impl Into<String>, attributes: AttributeList) -> Self {
        Self {
            node_type: node_type.into(),
            attributes,
        }
    }

    pub fn matches<A: Adapter>(
        &self,
        adapter: &A,
        node: &A::Node,
        base: &A::Node,
    ) -> Result<bool, MatchError> {
        if adapter.node_type(node) != self.node_type {
            return Ok(false);
        }
        self.attributes.matches(adapter, node, base)
    }
}

impl fmt::Display for BasicSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}{}", self.node_type, self.attributes)
    }
}

/// One step of an expression.
///
/// A selector either hops (`goto_scope` or `relationship`, continuing with
/// `rest`) or tests nodes with its basic selector, pseudo class and
/// position filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selector {
    pub goto_scope: Option<KeyPath>,
    pub relationship: Option<Relationship>,
    pub rest: Option<Box<Selector>>,
    pub basic: Option<BasicSelector>,
    pub pseudo: Option<Pseudo>,
    pub position: Option<Position>,
}

impl Selector {
    pub fn basic(basic: BasicSelector) -> Self {
        Self {
            basic: Some(basic),
            ..Self::default()
        }
    }

    /// Matching nodes at or below `node`, in pre-order, as `options` allow.
    /// Recursion depth follows the tree depth; see
    /// [`ExpressionList::query_nodes`](crate::ExpressionList::query_nodes).
    pub fn query_nodes<A: Adapter>(
        &self,
        adapter: &A,
        node: &A::Node,
        options: QueryOptions,
    ) -> Result<Vec<A::Node>, MatchError> {
        self.query_slot(adapter, &Target::Node(node.clone()), options)
    }

    /// Query starting from an adapter slot: a node, a sequence of nodes
    /// (queried element by element) or an absent value.
    pub fn query_slot<A: Adapter>(
        &self,
        adapter: &A,
        slot: &Target<A::Node>,
        options: QueryOptions,
    ) -> Result<Vec<A::Node>, MatchError> {
        if let Some(relationship) = self.relationship {
            return self.query_relationship(adapter, slot, relationship);
        }
        match slot {
            Target::List(items) => {
                let mut nodes = Vec::new();
                for item in items {
                    nodes.extend(self.query_slot(adapter, item, options)?);
                }
                Ok(nodes)
            }
            Target::Node(node) => self.query_node(adapter, node, options),
            _ => Ok(Vec::new()),
        }
    }

    /// Whether anything at or below `node` matches.
    pub fn match_node<A: Adapter>(&self, adapter: &A, node: &A::Node) -> Result<bool, MatchError> {
        Ok(!self.query_nodes(adapter, node, QueryOptions::default())?.is_empty())
    }

    /// Basic selector and pseudo class test of a single node.
    pub(crate) fn matches<A: Adapter>(
        &self,
        adapter: &A,
        node: &A::Node,
        base: &A::Node,
    ) -> Result<bool, MatchError> {
        if let Some(basic) = &self.basic {
            if !basic.matches(adapter, node, base)? {
                return Ok(false);
            }
        }
        let Some(pseudo) = &self.pseudo else {
            return Ok(true);
        };
        let found = pseudo
            .expression
            .query_nodes(adapter, node, QueryOptions::default())?;
        Ok(match pseudo.class {
            PseudoClass::Has => !found.is_empty(),
            PseudoClass::NotHas => found.is_empty(),
        })
    }

    fn query_node<A: Adapter>(
        &self,
        adapter: &A,
        node: &A::Node,
        options: QueryOptions,
    ) -> Result<Vec<A::Node>, MatchError> {
        if let Some(scope) = &self.goto_scope {
            let anchor = scope.resolve(adapter, node);
            return match &self.rest {
                Some(rest) => rest.query_slot(adapter, &anchor, options),
                None => Ok(Vec::new()),
            };
        }

        let nodes = if self.basic.is_some() {
            traverse(adapter, node, options, |candidate| {
                self.matches(adapter, candidate, candidate)
            })?
        } else if options.including_self && self.matches(adapter, node, node)? {
            vec![node.clone()]
        } else {
            Vec::new()
        };
        Ok(self.filter_position(nodes))
    }

    fn query_relationship<A: Adapter>(
        &self,
        adapter: &A,
        slot: &Target<A::Node>,
        relationship: Relationship,
    ) -> Result<Vec<A::Node>, MatchError> {
        let Some(rest) = &self.rest else {
            return Ok(Vec::new());
        };
        let mut candidates = Vec::new();
        match (relationship, slot) {
            (Relationship::Child, Target::List(items)) => flatten_nodes(items, &mut candidates),
            (Relationship::Child, Target::Node(node)) => {
                for child in child_nodes(adapter, node) {
                    if adapter.is_transparent(&child) {
                        candidates.extend(child_nodes(adapter, &child));
                    } else {
                        candidates.push(child);
                    }
                }
            }
            (Relationship::NextSibling, Target::Node(node)) => {
                flatten_nodes(&adapter.siblings(node), &mut candidates);
                candidates.truncate(1);
            }
            (Relationship::SubsequentSibling, Target::Node(node)) => {
                flatten_nodes(&adapter.siblings(node), &mut candidates);
            }
            _ => {}
        }

        let mut nodes = Vec::new();
        for candidate in candidates {
            if rest.matches(adapter, &candidate, &candidate)? {
                nodes.push(candidate);
            }
        }
        Ok(rest.filter_position(nodes))
    }

    fn filter_position<N>(&self, mut nodes: Vec<N>) -> Vec<N> {
        match self.position {
            Some(Position::FirstChild) => {
                nodes.truncate(1);
                nodes
            }
            Some(Position::LastChild) => nodes.pop().into_iter().collect(),
            None => nodes,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scope) = &self.goto_scope {
            write!(f, "{scope} ")?;
        }
        if let Some(relationship) = &self.relationship {
            write!(f, "{relationship} ")?;
        }
        if let Some(rest) = &self.rest {
            write!(f, "{rest}")?;
        }
        if let Some(basic) = &self.basic {
            write!(f, "{basic}")?;
        }
        if let Some(pseudo) = &self.pseudo {
            write!(f, ":{}({})", pseudo.class, pseudo.expression)?;
        }
        if let Some(position) = &self.position {
            write!(f, ":{position}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{MemoryTree, NodeId};
    use crate::engine::expression::Expression;

    fn send(message: &str) -> Selector {
        Selector::basic(BasicSelector::new(
            "Send",
            AttributeList::new(vec![Attribute::new(
                KeyPath::parse("message"),
                Operator::Equal,
                Value::Identifier(message.into()),
            )]),
        ))
    }

    fn of_type(node_type: &str) -> Selector {
        Selector::basic(BasicSelector::new(node_type, AttributeList::default()))
    }

    fn siblings_tree() -> (MemoryTree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = MemoryTree::new();
        let a = tree.node("A", "a").finish();
        let b1 = tree.node("B", "b1").finish();
        let b2 = tree.node("B", "b2").finish();
        let body = tree.node("Body", "a b1 b2").child(vec![a, b1, b2]).finish();
        (tree, body, a, b1, b2)
    }

    #[test]
    fn display_forms() {
        assert_eq!(send("create").to_string(), ".Send[message=create]");
        let child = Selector {
            goto_scope: Some(KeyPath::parse("body")),
            rest: Some(Box::new(Selector {
                relationship: Some(Relationship::Child),
                rest: Some(Box::new(of_type("Send"))),
                ..Selector::default()
            })),
            ..Selector::default()
        };
        assert_eq!(child.to_string(), "body > .Send");

        let mut last = of_type("Send");
        last.position = Some(Position::LastChild);
        assert_eq!(last.to_string(), ".Send:last-child");
    }

    #[test]
    fn attribute_display_for_keyword_operators() {
        let names = Value::Array(vec![Value::Identifier("foo".into()), Value::Identifier("bar".into())]);
        let key = KeyPath::parse("name");
        assert_eq!(
            Attribute::new(key.clone(), Operator::NotIn, names).to_string(),
            "name not in (foo bar)"
        );
        assert_eq!(
            Attribute::new(key.clone(), Operator::Includes, Value::Identifier("x".into())).to_string(),
            "name includes x"
        );
        assert_eq!(
            Attribute::new(key, Operator::GreaterThanOrEqual, Value::Integer(2)).to_string(),
            "name>=2"
        );
    }

    #[test]
    fn next_sibling_takes_only_the_first() {
        let (tree, _body, a, b1, _b2) = siblings_tree();
        let selector = Selector {
            relationship: Some(Relationship::NextSibling),
            rest: Some(Box::new(of_type("B"))),
            ..Selector::default()
        };
        assert_eq!(selector.query_nodes(&tree, &a, QueryOptions::default()).unwrap(), vec![b1]);
    }

    #[test]
    fn subsequent_siblings_take_all() {
        let (tree, _body, a, b1, b2) = siblings_tree();
        let selector = Selector {
            relationship: Some(Relationship::SubsequentSibling),
            rest: Some(Box::new(of_type("B"))),
            ..Selector::default()
        };
        assert_eq!(
            selector.query_nodes(&tree, &a, QueryOptions::default()).unwrap(),
            vec![b1, b2]
        );
    }

    #[test]
    fn child_flattens_transparent_wrappers() {
        let mut tree = MemoryTree::new().with_transparent_kinds(["Begin"]);
        let x = tree.node("Ivasgn", "@x = 1").finish();
        let y = tree.node("Ivasgn", "@y = 2").finish();
        let begin = tree.node("Begin", "@x = 1; @y = 2").child(x).child(y).finish();
        let nested = tree.node("Ivasgn", "@z = 3").finish();
        let deep = tree.node("If", "if c; @z = 3; end").child(nested).finish();
        let def = tree.node("Def", "def f; end").child(begin).child(deep).finish();

        let mut first = of_type("Ivasgn");
        first.position = Some(Position::FirstChild);
        let selector = Selector {
            relationship: Some(Relationship::Child),
            rest: Some(Box::new(first)),
            ..Selector::default()
        };
        assert_eq!(selector.query_nodes(&tree, &def, QueryOptions::default()).unwrap(), vec![x]);
    }

    #[test]
    fn child_reaches_list_slots_inside_wrappers() {
        let mut tree = MemoryTree::new().with_transparent_kinds(["Begin"]);
        let x = tree.node("Ivasgn", "@x = 1").finish();
        let y = tree.node("Ivasgn", "@y = 2").finish();
        let begin = tree.node("Begin", "@x = 1; @y = 2").child(vec![x, y]).finish();
        let z = tree.node("Ivasgn", "@z = 3").finish();
        let nested = Target::List(vec![Target::List(vec![Target::Node(z)]), Target::Nil]);
        let def = tree.node("Def", "def f; end").child(begin).child(nested).finish();

        let selector = Selector {
            relationship: Some(Relationship::Child),
            rest: Some(Box::new(of_type("Ivasgn"))),
            ..Selector::default()
        };
        assert_eq!(
            selector.query_nodes(&tree, &def, QueryOptions::default()).unwrap(),
            vec![x, y, z]
        );
    }

    #[test]
    fn goto_scope_list_acts_as_parent() {
        let mut tree = MemoryTree::new();
        let a = tree.node("Send", "a").field("message", Target::Sym("a".into())).finish();
        let b = tree.node("Send", "b").field("message", Target::Sym("b".into())).finish();
        let body = tree.node("Block", "a; b").field("body", vec![a, b]).finish();

        let selector = Selector {
            goto_scope: Some(KeyPath::parse("body")),
            rest: Some(Box::new(Selector {
                relationship: Some(Relationship::Child),
                rest: Some(Box::new(send("a"))),
                ..Selector::default()
            })),
            ..Selector::default()
        };
        assert_eq!(selector.query_nodes(&tree, &body, QueryOptions::default()).unwrap(), vec![a]);
    }

    #[test]
    fn pseudo_only_tests_the_root() {
        let (tree, body, a, _b1, _b2) = siblings_tree();
        let has_b = Selector {
            pseudo: Some(Pseudo {
                class: PseudoClass::Has,
                expression: Box::new(ExpressionList::new(vec![Expression::new(of_type("B"), None)])),
            }),
            ..Selector::default()
        };
        assert_eq!(has_b.query_nodes(&tree, &body, QueryOptions::default()).unwrap(), vec![body]);
        assert!(has_b.query_nodes(&tree, &a, QueryOptions::default()).unwrap().is_empty());

        let mut not_has = has_b.clone();
        if let Some(pseudo) = not_has.pseudo.as_mut() {
            pseudo.class = PseudoClass::NotHas;
        }
        assert_eq!(not_has.query_nodes(&tree, &a, QueryOptions::default()).unwrap(), vec![a]);
        assert_eq!(not_has.to_string(), ":not_has(.B)");
    }

    #[test]
    fn list_slots_are_flat_mapped() {
        let (tree, _body, a, b1, b2) = siblings_tree();
        let slot = Target::List(vec![Target::Node(a), Target::Nil, Target::Node(b1), Target::Node(b2)]);
        assert_eq!(
            of_type("B").query_slot(&tree, &slot, QueryOptions::default()).unwrap(),
            vec![b1, b2]
        );
    }
}
