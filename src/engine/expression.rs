//! Selector chains (`.Class .Def`) and unions (`.Send, .Block`).

use crate::adapter::{Adapter, Target};
use crate::engine::errors::MatchError;
use crate::engine::options::QueryOptions;
use crate::engine::selector::Selector;
use std::fmt;

/// A selector followed by the expression applied to each of its matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub selector: Selector,
    pub rest: Option<Box<Expression>>,
}

impl Expression {
    pub fn new(selector: Selector, rest: Option<Expression>) -> Self {
        Self {
            selector,
            rest: rest.map(Box::new),
        }
    }

    /// Nodes under `node` matched by the selector and then by each
    /// following link of the chain.
    pub fn query_nodes<A: Adapter>(
        &self,
        adapter: &A,
        node: &A::Node,
        options: QueryOptions,
    ) -> Result<Vec<A::Node>, MatchError> {
        self.query_slot(adapter, &Target::Node(node.clone()), options)
    }

    pub fn query_slot<A: Adapter>(
        &self,
        adapter: &A,
        slot: &Target<A::Node>,
        options: QueryOptions,
    ) -> Result<Vec<A::Node>, MatchError> {
        let matched = self.selector.query_slot(adapter, slot, options)?;
        let Some(rest) = &self.rest else {
            return Ok(matched);
        };
        let mut nodes = Vec::new();
        for node in &matched {
            nodes.extend(rest.query_nodes(adapter, node, options)?);
        }
        Ok(nodes)
    }

    /// True when a default-options query from `node` finds anything.
    pub fn match_node<A: Adapter>(&self, adapter: &A, node: &A::Node) -> Result<bool, MatchError> {
        Ok(!self.query_nodes(adapter, node, QueryOptions::default())?.is_empty())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selector)?;
        if let Some(rest) = &self.rest {
            write!(f, " {rest}")?;
        }
        Ok(())
    }
}

/// Union of expressions. Results are concatenated in declaration order and
/// never deduplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionList {
    expressions: Vec<Expression>,
}

impl ExpressionList {
    pub fn new(expressions: Vec<Expression>) -> Self {
        Self { expressions }
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    /// Run every expression from `node` and concatenate the results.
    ///
    /// # Limits
    ///
    /// Descendant traversal recurses once per tree level, and each link of
    /// a selector chain starts a new traversal below the previous match. Peak
    /// stack depth is therefore roughly tree depth times chain length.
    /// Trees thousands of levels deep (generated code, long binary operator
    /// chains) should be queried on a thread with a larger stack.
    pub fn query_nodes<A: Adapter>(
        &self,
        adapter: &A,
        node: &A::Node,
        options: QueryOptions,
    ) -> Result<Vec<A::Node>, MatchError> {
        self.query_slot(adapter, &Target::Node(node.clone()), options)
    }

    pub fn query_slot<A: Adapter>(
        &self,
        adapter: &A,
        slot: &Target<A::Node>,
        options: QueryOptions,
    ) -> Result<Vec<A::Node>, MatchError> {
        let mut nodes = Vec::new();
        for expression in &self.expressions {
            nodes.extend(expression.query_slot(adapter, slot, options)?);
        }
        Ok(nodes)
    }

    /// Same as [`Expression::match_node`] over the whole union.
    pub fn match_node<A: Adapter>(&self, adapter: &A, node: &A::Node) -> Result<bool, MatchError> {
        Ok(!self.query_nodes(adapter, node, QueryOptions::default())?.is_empty())
    }
}

impl fmt::Display for ExpressionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, expression) in self.expressions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{expression}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{MemoryTree, NodeId};
    use crate::engine::selector::{AttributeList, BasicSelector};

    fn of_type(node_type: &str) -> Selector {
        Selector::basic(BasicSelector::new(node_type, AttributeList::default()))
    }

    fn tree() -> (MemoryTree, NodeId, NodeId, NodeId) {
        let mut tree = MemoryTree::new();
        let inner_send = tree.node("Send", "inner").finish();
        let def = tree.node("Def", "def f; inner; end").child(inner_send).finish();
        let outer_send = tree.node("Send", "outer").finish();
        let class = tree.node("Class", "class A; end").child(vec![def, outer_send]).finish();
        (tree, class, def, inner_send)
    }

    #[test]
    fn chain_applies_rest_to_each_match() {
        let (tree, class, _def, inner_send) = tree();
        let expression = Expression::new(of_type("Def"), Some(Expression::new(of_type("Send"), None)));
        assert_eq!(
            expression.query_nodes(&tree, &class, QueryOptions::default()).unwrap(),
            vec![inner_send]
        );
        assert_eq!(expression.to_string(), ".Def .Send");
    }

    #[test]
    fn union_keeps_duplicates() {
        let (tree, class, def, _inner) = tree();
        let list = ExpressionList::new(vec![
            Expression::new(of_type("Def"), None),
            Expression::new(of_type("Def"), None),
        ]);
        assert_eq!(
            list.query_nodes(&tree, &class, QueryOptions::default()).unwrap(),
            vec![def, def]
        );
        assert_eq!(list.to_string(), ".Def, .Def");
    }

    #[test]
    fn match_node_reports_any_match() {
        let (tree, class, def, _inner) = tree();
        let list = ExpressionList::new(vec![Expression::new(of_type("Class"), None)]);
        assert!(list.match_node(&tree, &class).unwrap());
        assert!(!list.match_node(&tree, &def).unwrap());
    }
}
