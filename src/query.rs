//! One entry point for both query forms.

use crate::adapter::Adapter;
use crate::cache::get_or_compile;
use crate::compiler::ParseError;
use crate::engine::{ExpressionList, MatchError, QueryOptions};
use crate::rules::RuleSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
enum Matcher {
    Expression(Arc<ExpressionList>),
    Rules(RuleSet),
}

/// A compiled query (text or rule set) bound to the adapter it runs against.
///
/// ```
/// use node_query::{MemoryTree, NodeQuery, QueryOptions, Target};
///
/// let mut tree = MemoryTree::new();
/// let call = tree
///     .node("Send", "create(:user)")
///     .field("message", Target::Sym("create".into()))
///     .finish();
/// let root = tree.node("Begin", "create(:user)").child(call).finish();
///
/// let query = NodeQuery::new(".Send[message=create]", &tree).unwrap();
/// let nodes = query.query_nodes(&root, QueryOptions::default()).unwrap();
/// assert_eq!(nodes, vec![call]);
/// ```
#[derive(Debug, Clone)]
pub struct NodeQuery<A: Adapter> {
    matcher: Matcher,
    adapter: A,
}

impl<A: Adapter> NodeQuery<A> {
    /// Compile query text through the thread-local cache.
    pub fn new(text: &str, adapter: A) -> Result<Self, ParseError> {
        Ok(Self {
            matcher: Matcher::Expression(get_or_compile(text)?),
            adapter,
        })
    }

    pub fn from_expression(expression: ExpressionList, adapter: A) -> Self {
        Self {
            matcher: Matcher::Expression(Arc::new(expression)),
            adapter,
        }
    }

    pub fn from_rules(rules: RuleSet, adapter: A) -> Self {
        Self {
            matcher: Matcher::Rules(rules),
            adapter,
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Every node under `node` the query matches, in pre-order.
    ///
    /// # Limits
    ///
    /// Traversal is recursive. See
    /// [`ExpressionList::query_nodes`](crate::ExpressionList::query_nodes)
    /// for how deep trees affect stack use.
    pub fn query_nodes(&self, node: &A::Node, options: QueryOptions) -> Result<Vec<A::Node>, MatchError> {
        let nodes = match &self.matcher {
            Matcher::Expression(expression) => expression.query_nodes(&self.adapter, node, options)?,
            Matcher::Rules(rules) => rules.query_nodes(&self.adapter, node, options)?,
        };
        debug!(matches = nodes.len(), "query finished");
        Ok(nodes)
    }

    /// Query text matches when it finds anything under `node`; a rule set
    /// matches when `node` itself satisfies every rule.
    pub fn match_node(&self, node: &A::Node) -> Result<bool, MatchError> {
        match &self.matcher {
            Matcher::Expression(expression) => expression.match_node(&self.adapter, node),
            Matcher::Rules(rules) => rules.match_node(&self.adapter, node),
        }
    }
}
