//! Adapter over tree-sitter syntax trees of Rust source.

use crate::adapter::errors::TreeSitterError;
use crate::adapter::{Adapter, Target};
use crate::pool::with_parser;
use tree_sitter::{Node, Tree};

const DEFAULT_TRANSPARENT_KINDS: &[&str] = &["block", "declaration_list"];

const INTEGER_SUFFIXES: &[&str] = &[
    "i128", "u128", "isize", "usize", "i16", "u16", "i32", "u32", "i64", "u64", "i8", "u8",
];

/// Parse Rust source with the pooled parser.
pub fn parse_rust(source: &str) -> Result<Tree, TreeSitterError> {
    with_parser(|parser| parser.parse(source, None))?.ok_or(TreeSitterError::ParseFailed)
}

/// Exposes tree-sitter nodes to the engine.
///
/// Children and siblings are named nodes only; punctuation and keywords
/// never show up as query candidates. Named accessors are the grammar's
/// field names (`name`, `parameters`, `body`, ...).
#[derive(Debug, Clone)]
pub struct TreeSitterAdapter<'a> {
    source: &'a str,
    transparent: Vec<String>,
}

impl<'a> TreeSitterAdapter<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            transparent: DEFAULT_TRANSPARENT_KINDS.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn with_transparent_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transparent = kinds.into_iter().map(Into::into).collect();
        self
    }

    fn text(&self, node: &Node<'a>) -> &'a str {
        self.source.get(node.byte_range()).unwrap_or("")
    }

    fn named_children(&self, node: &Node<'a>) -> Vec<Node<'a>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor).collect()
    }
}

impl<'a> Adapter for TreeSitterAdapter<'a> {
    type Node = Node<'a>;

    fn node_type(&self, node: &Node<'a>) -> String {
        node.kind().to_string()
    }

    fn source(&self, node: &Node<'a>) -> String {
        self.text(node).to_string()
    }

    fn children(&self, node: &Node<'a>) -> Vec<Target<Node<'a>>> {
        self.named_children(node).into_iter().map(Target::Node).collect()
    }

    fn siblings(&self, node: &Node<'a>) -> Vec<Target<Node<'a>>> {
        let mut siblings = Vec::new();
        let mut current = node.next_named_sibling();
        while let Some(sibling) = current {
            siblings.push(Target::Node(sibling));
            current = sibling.next_named_sibling();
        }
        siblings
    }

    fn attribute(&self, node: &Node<'a>, name: &str) -> Option<Target<Node<'a>>> {
        let mut cursor = node.walk();
        let mut found: Vec<Node<'a>> = node.children_by_field_name(name, &mut cursor).collect();
        match found.len() {
            0 => None,
            1 => found.pop().map(Target::Node),
            _ => Some(Target::List(found.into_iter().map(Target::Node).collect())),
        }
    }

    fn literal(&self, node: &Node<'a>) -> Option<Target<Node<'a>>> {
        let text = self.text(node);
        match node.kind() {
            "integer_literal" => parse_integer(text).map(Target::Int),
            "float_literal" => parse_float(text).map(Target::Float),
            "string_literal" => Some(Target::Str(strip_delimiters(text, '"').to_string())),
            "char_literal" => Some(Target::Str(strip_delimiters(text, '\'').to_string())),
            "boolean_literal" => Some(Target::Bool(text == "true")),
            "unit_expression" => Some(Target::Nil),
            "array_expression" => Some(Target::List(self.children(node))),
            "parenthesized_expression" => match self.named_children(node).as_slice() {
                [inner] => Some(Target::Node(*inner)),
                _ => None,
            },
            _ => None,
        }
    }

    fn is_transparent(&self, node: &Node<'a>) -> bool {
        let kind = node.kind();
        self.transparent.iter().any(|t| t == kind)
    }
}

fn strip_delimiters(text: &str, delimiter: char) -> &str {
    text.strip_prefix(delimiter)
        .and_then(|rest| rest.strip_suffix(delimiter))
        .unwrap_or(text)
}

fn parse_integer(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    let (radix, body) = match digits.get(..2) {
        Some("0x") => (16, &digits[2..]),
        Some("0o") => (8, &digits[2..]),
        Some("0b") => (2, &digits[2..]),
        _ => (10, digits.as_str()),
    };
    let body = INTEGER_SUFFIXES
        .iter()
        .find_map(|suffix| body.strip_suffix(suffix))
        .unwrap_or(body);
    i64::from_str_radix(body, radix).ok()
}

fn parse_float(text: &str) -> Option<f64> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    let body = digits
        .strip_suffix("f32")
        .or_else(|| digits.strip_suffix("f64"))
        .unwrap_or(&digits);
    body.parse().ok()
}
