//! Traversal options and the walk shared by selectors and rule sets.

use crate::adapter::Adapter;
use crate::engine::errors::MatchError;
use crate::path::{child_nodes, walk_descendants};
use serde::Deserialize;
use std::ops::ControlFlow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Test the starting node itself.
    pub including_self: bool,
    /// Walk the whole subtree instead of direct children only.
    pub recursive: bool,
    /// Return as soon as one node matches.
    pub stop_at_first_match: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            including_self: true,
            recursive: true,
            stop_at_first_match: false,
        }
    }
}

impl QueryOptions {
    pub fn including_self(mut self, value: bool) -> Self {
        self.including_self = value;
        self
    }

    pub fn recursive(mut self, value: bool) -> Self {
        self.recursive = value;
        self
    }

    pub fn stop_at_first_match(mut self, value: bool) -> Self {
        self.stop_at_first_match = value;
        self
    }
}

/// Collect every node under `node` accepted by `matches`, honoring `options`.
pub(crate) fn traverse<A, F>(
    adapter: &A,
    node: &A::Node,
    options: QueryOptions,
    mut matches: F,
) -> Result<Vec<A::Node>, MatchError>
where
    A: Adapter,
    F: FnMut(&A::Node) -> Result<bool, MatchError>,
{
    let mut nodes = Vec::new();
    if options.including_self {
        if matches(node)? {
            nodes.push(node.clone());
            if options.stop_at_first_match {
                return Ok(nodes);
            }
        }
        if !options.recursive {
            return Ok(nodes);
        }
    }

    let mut visit = |candidate: &A::Node| match matches(candidate) {
        Err(err) => ControlFlow::Break(Err(err)),
        Ok(true) => {
            nodes.push(candidate.clone());
            if options.stop_at_first_match {
                ControlFlow::Break(Ok(()))
            } else {
                ControlFlow::Continue(())
            }
        }
        Ok(false) => ControlFlow::Continue(()),
    };

    let flow = if options.recursive {
        walk_descendants(adapter, node, &mut visit)
    } else {
        child_nodes(adapter, node).iter().try_for_each(&mut visit)
    };
    if let ControlFlow::Break(Err(err)) = flow {
        return Err(err);
    }
    Ok(nodes)
}
