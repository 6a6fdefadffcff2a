//! Node Query: CSS-like structural queries over syntax trees
//!
//! Queries are written either as text (`.Send[message=create] > .Sym`) or as
//! a [`RuleSet`] mapping key paths to expected values. Both run against any
//! tree that implements [`Adapter`], so the same query works on an owned
//! [`MemoryTree`] or on tree-sitter nodes through [`TreeSitterAdapter`].
//!
//! # Architecture
//!
//! Query text is compiled once into an [`ExpressionList`] AST: a union of
//! selector chains, each selector holding a node type, attribute tests,
//! an optional relationship to the previous selector and optional pseudo
//! classes or positions. Matching walks the tree through the adapter only;
//! compiled ASTs hold no tree references and are `Send + Sync`.
//!
//! Attribute keys are dotted key paths (`arguments.first.value`) resolved
//! against the candidate node. Expected values may embed `{{path}}`
//! templates evaluated against the same node.
//!
//! # Example
//!
//! ```
//! use node_query::{parse_rust, Adapter, NodeQuery, QueryOptions, TreeSitterAdapter};
//!
//! let source = "fn add(a: i32, b: i32) -> i32 { a + b }\nfn zero() -> i32 { 0 }";
//! let tree = parse_rust(source).unwrap();
//! let adapter = TreeSitterAdapter::new(source);
//!
//! let query = NodeQuery::new(".function_item[parameters.size=2]", &adapter).unwrap();
//! let nodes = query.query_nodes(&tree.root_node(), QueryOptions::default()).unwrap();
//! assert_eq!(nodes.len(), 1);
//! let name = nodes[0].child_by_field_name("name").unwrap();
//! assert_eq!(adapter.source(&name), "add");
//! ```

pub mod adapter;
pub mod cache;
pub mod compiler;
pub mod engine;
pub mod path;
pub mod pool;
pub mod query;
pub mod rules;

// Re-exports
pub use adapter::{coerce, parse_rust, Adapter, MemoryTree, NodeId, Number, Target, TreeSitterAdapter, TreeSitterError};
pub use compiler::{compile, ParseError};
pub use engine::{Expression, ExpressionList, MatchError, QueryOptions, Selector, Value};
pub use path::KeyPath;
pub use query::NodeQuery;
pub use rules::{RuleSet, RuleValue};
