//! Dotted key paths (`arguments.0.name`, `body.*.type`) and the helpers
//! built on top of them: resolution against a node, `{{path}}` template
//! expansion and the pre-order descendant walk.

use crate::adapter::{Adapter, Target};
use std::fmt;
use std::ops::ControlFlow;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Name(String),
    Index(i64),
    Wildcard,
}

impl Segment {
    fn parse(part: &str) -> Self {
        if part == "*" {
            return Segment::Wildcard;
        }
        match part.parse::<i64>() {
            Ok(index) => Segment::Index(index),
            Err(_) => Segment::Name(part.to_string()),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Name(name) => write!(f, "{name}"),
            Segment::Index(index) => write!(f, "{index}"),
            Segment::Wildcard => write!(f, "*"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<Segment>,
}

impl KeyPath {
    /// Split on `.`. Never fails: an unknown segment simply resolves to
    /// `Nil` later.
    pub fn parse(input: &str) -> Self {
        let segments = input
            .split('.')
            .filter(|part| !part.is_empty())
            .map(Segment::parse)
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn resolve<A: Adapter>(&self, adapter: &A, node: &A::Node) -> Target<A::Node> {
        resolve_segments(adapter, &Target::Node(node.clone()), &self.segments)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

fn resolve_segments<A: Adapter>(
    adapter: &A,
    target: &Target<A::Node>,
    segments: &[Segment],
) -> Target<A::Node> {
    let Some((segment, rest)) = segments.split_first() else {
        return target.clone();
    };
    match segment {
        Segment::Wildcard => match target {
            Target::List(_) if rest.is_empty() => target.clone(),
            Target::List(items) => Target::List(
                items
                    .iter()
                    .map(|item| resolve_segments(adapter, item, rest))
                    .collect(),
            ),
            _ => Target::List(Vec::new()),
        },
        _ => {
            let next = step(adapter, target, segment);
            resolve_segments(adapter, &next, rest)
        }
    }
}

fn step<A: Adapter>(adapter: &A, target: &Target<A::Node>, segment: &Segment) -> Target<A::Node> {
    match target {
        Target::List(items) => list_step(items, segment),
        Target::Node(node) => node_step(adapter, node, segment),
        Target::Str(text) | Target::Sym(text) => match segment {
            Segment::Name(name) if name == "size" || name == "length" => {
                Target::Int(text.chars().count() as i64)
            }
            _ => Target::Nil,
        },
        _ => Target::Nil,
    }
}

fn node_step<A: Adapter>(adapter: &A, node: &A::Node, segment: &Segment) -> Target<A::Node> {
    let name = match segment {
        Segment::Name(name) => name.as_str(),
        _ => return list_step(&child_targets(adapter, node), segment),
    };
    if name == "node_type" || name == "nodeType" {
        return Target::Str(adapter.node_type(node));
    }
    if let Some(value) = adapter.attribute(node, name) {
        return value;
    }
    match name {
        "type" => Target::Str(adapter.node_type(node)),
        "source" => Target::Str(adapter.source(node)),
        "children" => Target::List(adapter.children(node)),
        _ => list_step(&child_targets(adapter, node), segment),
    }
}

fn list_step<N: Clone>(items: &[Target<N>], segment: &Segment) -> Target<N> {
    let len = items.len() as i64;
    let index = match segment {
        Segment::Index(index) => *index,
        Segment::Name(name) => match name.as_str() {
            "size" | "length" | "count" => return Target::Int(len),
            "first" => 0,
            "second" => 1,
            "third" => 2,
            "last" => len - 1,
            _ => return Target::Nil,
        },
        Segment::Wildcard => return Target::Nil,
    };
    let index = if index < 0 { len + index } else { index };
    usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i))
        .cloned()
        .unwrap_or(Target::Nil)
}

fn child_targets<A: Adapter>(adapter: &A, node: &A::Node) -> Vec<Target<A::Node>> {
    child_nodes(adapter, node).into_iter().map(Target::Node).collect()
}

/// Direct child nodes with list slots flattened and absent slots dropped.
pub fn child_nodes<A: Adapter>(adapter: &A, node: &A::Node) -> Vec<A::Node> {
    let mut nodes = Vec::new();
    flatten_nodes(&adapter.children(node), &mut nodes);
    nodes
}

pub fn flatten_nodes<N: Clone>(targets: &[Target<N>], out: &mut Vec<N>) {
    for target in targets {
        match target {
            Target::Node(node) => out.push(node.clone()),
            Target::List(items) => flatten_nodes(items, out),
            _ => {}
        }
    }
}

/// Pre-order walk over every descendant of `node` (not `node` itself).
pub fn walk_descendants<A, B, F>(adapter: &A, node: &A::Node, visit: &mut F) -> ControlFlow<B>
where
    A: Adapter,
    F: FnMut(&A::Node) -> ControlFlow<B>,
{
    for child in child_nodes(adapter, node) {
        visit(&child)?;
        walk_descendants(adapter, &child, visit)?;
    }
    ControlFlow::Continue(())
}

/// Text form used by string comparison and template substitution.
pub fn to_text<A: Adapter>(adapter: &A, target: &Target<A::Node>) -> String {
    match target {
        Target::Node(node) => adapter.source(node),
        Target::List(items) => items
            .iter()
            .map(|item| to_text(adapter, item))
            .collect::<Vec<_>>()
            .join(", "),
        Target::Str(text) | Target::Sym(text) => text.clone(),
        Target::Int(value) => value.to_string(),
        Target::Float(value) => value.to_string(),
        Target::Bool(value) => value.to_string(),
        Target::Nil => String::new(),
    }
}

/// Replace every `{{path}}` marker with the text of `path` resolved from `base`.
pub fn expand_template<A: Adapter>(adapter: &A, template: &str, base: &A::Node) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return out;
        };
        let path = KeyPath::parse(after[..end].trim());
        out.push_str(&to_text(adapter, &path.resolve(adapter, base)));
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}
