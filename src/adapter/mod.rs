//! Adapter layer between the query engine and concrete syntax trees.
//!
//! The engine never inspects a node directly. Everything it needs (node
//! type, children, siblings, source text, named accessors) goes through an
//! [`Adapter`], so the same compiled query runs against any tree
//! representation that implements the trait.

pub mod errors;
pub mod memory;
pub mod ts;

use std::cmp::Ordering;
use std::fmt;

pub use errors::TreeSitterError;
pub use memory::{MemoryTree, NodeBuilder, NodeId};
pub use ts::{parse_rust, TreeSitterAdapter};

/// A value reached from a node: the node itself, a sequence slot, or a
/// host scalar produced by a named accessor or by literal coercion.
///
/// `Nil` doubles as the absent value: missing accessors and out-of-range
/// indices resolve to it instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub enum Target<N> {
    Node(N),
    List(Vec<Target<N>>),
    Str(String),
    Sym(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Nil,
}

impl<N> Target<N> {
    pub fn as_node(&self) -> Option<&N> {
        match self {
            Target::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Target::Nil)
    }

    /// Numeric view used by equality and the ordering operators.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Target::Int(value) => Some(Number::Int(*value)),
            Target::Float(value) => Some(Number::Float(*value)),
            _ => None,
        }
    }
}

/// A numeric scalar from either side of a comparison.
///
/// Two integers compare exactly. A float on either side widens both to
/// `f64`, so integers past 2^53 only lose precision against floats.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(value) => value as f64,
            Number::Float(value) => value,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (*self, *other) {
            (Number::Int(left), Number::Int(right)) => Some(left.cmp(&right)),
            (left, right) => left.as_f64().partial_cmp(&right.as_f64()),
        }
    }
}

impl<N> From<&str> for Target<N> {
    fn from(value: &str) -> Self {
        Target::Str(value.to_string())
    }
}

impl<N> From<String> for Target<N> {
    fn from(value: String) -> Self {
        Target::Str(value)
    }
}

impl<N> From<i64> for Target<N> {
    fn from(value: i64) -> Self {
        Target::Int(value)
    }
}

impl<N> From<f64> for Target<N> {
    fn from(value: f64) -> Self {
        Target::Float(value)
    }
}

impl<N> From<bool> for Target<N> {
    fn from(value: bool) -> Self {
        Target::Bool(value)
    }
}

/// Access to an externally owned tree.
///
/// Implementations must be cheap to call repeatedly: the engine asks for
/// children and attributes on every node it visits and does not cache.
pub trait Adapter {
    type Node: Clone + PartialEq + fmt::Debug;

    /// Check whether a resolved value is a node of this tree.
    fn is_node(&self, target: &Target<Self::Node>) -> bool {
        matches!(target, Target::Node(_))
    }

    /// Type tag compared against `.Tag` selectors.
    fn node_type(&self, node: &Self::Node) -> String;

    /// Source text covered by the node.
    fn source(&self, node: &Self::Node) -> String;

    /// Ordered children. Entries may be `Nil` (absent slot) or `List`
    /// (a position holding several nodes).
    fn children(&self, node: &Self::Node) -> Vec<Target<Self::Node>>;

    /// Every node after `node` in its parent's child list.
    fn siblings(&self, node: &Self::Node) -> Vec<Target<Self::Node>>;

    /// Named accessor, e.g. `name` or `arguments`. `None` when the adapter
    /// does not know the name for this node.
    fn attribute(&self, node: &Self::Node, name: &str) -> Option<Target<Self::Node>>;

    /// Reduce a literal node (number, string, symbol, boolean, nil, array
    /// literal, single-child grouping wrapper) to a host value. The engine
    /// coerces the returned value again, so an array literal may return a
    /// `List` of its element nodes and a grouping wrapper its inner node.
    fn literal(&self, _node: &Self::Node) -> Option<Target<Self::Node>> {
        None
    }

    /// Grouping construct whose children stand in for the wrapper itself
    /// in `>` child matching.
    fn is_transparent(&self, _node: &Self::Node) -> bool {
        false
    }
}

impl<A: Adapter + ?Sized> Adapter for &A {
    type Node = A::Node;

    fn is_node(&self, target: &Target<Self::Node>) -> bool {
        (**self).is_node(target)
    }

    fn node_type(&self, node: &Self::Node) -> String {
        (**self).node_type(node)
    }

    fn source(&self, node: &Self::Node) -> String {
        (**self).source(node)
    }

    fn children(&self, node: &Self::Node) -> Vec<Target<Self::Node>> {
        (**self).children(node)
    }

    fn siblings(&self, node: &Self::Node) -> Vec<Target<Self::Node>> {
        (**self).siblings(node)
    }

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<Target<Self::Node>> {
        (**self).attribute(node, name)
    }

    fn literal(&self, node: &Self::Node) -> Option<Target<Self::Node>> {
        (**self).literal(node)
    }

    fn is_transparent(&self, node: &Self::Node) -> bool {
        (**self).is_transparent(node)
    }
}

/// Reduce an actual value through the adapter's literal coercion.
///
/// Lists are coerced element by element; anything the adapter does not
/// recognize passes through unchanged.
pub fn coerce<A: Adapter>(adapter: &A, target: &Target<A::Node>) -> Target<A::Node> {
    coerce_depth(adapter, target, 0)
}

// Adapters that map a node back to itself would recurse forever.
const MAX_COERCE_DEPTH: usize = 64;

fn coerce_depth<A: Adapter>(adapter: &A, target: &Target<A::Node>, depth: usize) -> Target<A::Node> {
    if depth >= MAX_COERCE_DEPTH {
        return target.clone();
    }
    match target {
        Target::Node(node) => match adapter.literal(node) {
            Some(reduced) => coerce_depth(adapter, &reduced, depth + 1),
            None => target.clone(),
        },
        Target::List(items) => Target::List(
            items
                .iter()
                .map(|item| coerce_depth(adapter, item, depth + 1))
                .collect(),
        ),
        other => other.clone(),
    }
}
