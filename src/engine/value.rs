//! Typed literals on the right-hand side of an attribute test.
//!
//! Each variant has a fixed set of legal operators. Using any other
//! operator is an [`MatchError::InvalidOperator`] raised at match time.

use crate::adapter::{coerce, Adapter, Number, Target};
use crate::engine::errors::MatchError;
use crate::engine::selector::Selector;
use crate::path::{expand_template, to_text};
use regex::{Regex, RegexBuilder};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    StartsWith,
    EndsWith,
    Contains,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Matches,
    NotMatches,
    In,
    NotIn,
    Includes,
    NotIncludes,
}

impl Operator {
    /// Canonical spelling used when printing a query.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::StartsWith => "^=",
            Operator::EndsWith => "$=",
            Operator::Contains => "*=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::Matches => "=~",
            Operator::NotMatches => "!~",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Includes => "includes",
            Operator::NotIncludes => "not_includes",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SIMPLE_OPERATORS: &[Operator] = &[
    Operator::Equal,
    Operator::NotEqual,
    Operator::Includes,
    Operator::NotIncludes,
];

const STRING_OPERATORS: &[Operator] = &[
    Operator::Equal,
    Operator::NotEqual,
    Operator::StartsWith,
    Operator::EndsWith,
    Operator::Contains,
    Operator::Includes,
    Operator::NotIncludes,
];

const NUMBER_OPERATORS: &[Operator] = &[
    Operator::Equal,
    Operator::NotEqual,
    Operator::GreaterThan,
    Operator::GreaterThanOrEqual,
    Operator::LessThan,
    Operator::LessThanOrEqual,
    Operator::Includes,
    Operator::NotIncludes,
];

const ARRAY_OPERATORS: &[Operator] = &[
    Operator::Equal,
    Operator::NotEqual,
    Operator::In,
    Operator::NotIn,
];

const REGEXP_OPERATORS: &[Operator] = &[Operator::Matches, Operator::NotMatches];

/// Compiled regexp literal. Compares by its written form.
#[derive(Debug, Clone)]
pub struct Regexp {
    regex: Regex,
    source: String,
    flags: String,
}

impl Regexp {
    /// `i` ignores case, `m` lets `.` match newlines, `x` ignores pattern
    /// whitespace.
    pub fn new(source: &str, flags: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(flags.contains('i'))
            .dot_matches_new_line(flags.contains('m'))
            .ignore_whitespace(flags.contains('x'))
            .build()?;
        Ok(Self {
            regex,
            source: source.to_string(),
            flags: flags.to_string(),
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }
}

impl PartialEq for Regexp {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

impl fmt::Display for Regexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source.replace('/', "\\/"), self.flags)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    /// String holding `{{path}}` markers, expanded against the base node.
    Template(String),
    Identifier(String),
    Symbol(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Nil,
    Regexp(Regexp),
    Array(Vec<Value>),
    Selector(Box<Selector>),
}

impl Value {
    /// Operators this kind of value may be compared with. Anything else is
    /// reported as [`MatchError::InvalidOperator`] at match time.
    pub fn legal_operators(&self) -> &'static [Operator] {
        match self {
            Value::String(_) | Value::Template(_) | Value::Identifier(_) => STRING_OPERATORS,
            Value::Integer(_) | Value::Float(_) => NUMBER_OPERATORS,
            Value::Boolean(_) | Value::Nil | Value::Symbol(_) | Value::Selector(_) => {
                SIMPLE_OPERATORS
            }
            Value::Array(_) => ARRAY_OPERATORS,
            Value::Regexp(_) => REGEXP_OPERATORS,
        }
    }

    /// Compare `actual` against this value. `base` is the node template
    /// markers resolve against.
    pub fn matches<A: Adapter>(
        &self,
        adapter: &A,
        actual: &Target<A::Node>,
        base: &A::Node,
        operator: Operator,
    ) -> Result<bool, MatchError> {
        if !self.legal_operators().contains(&operator) {
            return Err(MatchError::InvalidOperator {
                operator: operator.to_string(),
                value: self.to_string(),
            });
        }

        let coerced = coerce(adapter, actual);
        match operator {
            Operator::Equal => self.equals(adapter, actual, &coerced, base),
            Operator::NotEqual => match self {
                Value::Array(expected) => {
                    let Some(items) = elements(actual, &coerced) else {
                        return Ok(true);
                    };
                    if items.len() != expected.len() {
                        return Ok(true);
                    }
                    for (item, value) in items.iter().zip(expected) {
                        if value.matches(adapter, item, base, Operator::NotEqual)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                _ => Ok(!self.equals(adapter, actual, &coerced, base)?),
            },
            Operator::StartsWith | Operator::EndsWith | Operator::Contains => {
                let Some(text) = self.actual_text(adapter, actual, &coerced) else {
                    return Ok(false);
                };
                let expected = self.expected_text(adapter, base);
                Ok(match operator {
                    Operator::StartsWith => text.starts_with(&expected),
                    Operator::EndsWith => text.ends_with(&expected),
                    _ => text.contains(&expected),
                })
            }
            Operator::GreaterThan
            | Operator::GreaterThanOrEqual
            | Operator::LessThan
            | Operator::LessThanOrEqual => {
                let (Some(left), Some(right)) = (coerced.as_number(), self.as_number()) else {
                    return Ok(false);
                };
                Ok(match operator {
                    Operator::GreaterThan => left > right,
                    Operator::GreaterThanOrEqual => left >= right,
                    Operator::LessThan => left < right,
                    _ => left <= right,
                })
            }
            Operator::Matches | Operator::NotMatches => {
                let Value::Regexp(regexp) = self else {
                    return Ok(false);
                };
                let text = match actual {
                    Target::Nil => return Ok(operator == Operator::NotMatches),
                    Target::Node(node) => adapter.source(node),
                    other => to_text(adapter, other),
                };
                Ok(regexp.is_match(&text) == (operator == Operator::Matches))
            }
            Operator::In | Operator::NotIn => {
                let Value::Array(expected) = self else {
                    return Ok(false);
                };
                let wanted = if operator == Operator::In {
                    Operator::Equal
                } else {
                    Operator::NotEqual
                };
                match actual {
                    Target::List(items) => {
                        for item in items {
                            if !quantify(adapter, expected, item, base, wanted)? {
                                return Ok(false);
                            }
                        }
                        Ok(true)
                    }
                    single => quantify(adapter, expected, single, base, wanted),
                }
            }
            Operator::Includes | Operator::NotIncludes => {
                let Some(items) = elements(actual, &coerced) else {
                    return Ok(false);
                };
                let mut found = false;
                for item in &items {
                    if self.matches(adapter, item, base, Operator::Equal)? {
                        found = true;
                        break;
                    }
                }
                Ok(found == (operator == Operator::Includes))
            }
        }
    }

    fn equals<A: Adapter>(
        &self,
        adapter: &A,
        actual: &Target<A::Node>,
        coerced: &Target<A::Node>,
        base: &A::Node,
    ) -> Result<bool, MatchError> {
        let equal = match self {
            Value::String(_) | Value::Template(_) | Value::Identifier(_) => {
                match self.actual_text(adapter, actual, coerced) {
                    Some(text) => text == self.expected_text(adapter, base),
                    None => false,
                }
            }
            Value::Symbol(expected) => match coerced {
                Target::Sym(text) | Target::Str(text) => text == expected,
                Target::Node(node) => {
                    let source = adapter.source(node);
                    source == format!(":{expected}") || source == *expected
                }
                _ => false,
            },
            Value::Integer(_) | Value::Float(_) => match (coerced.as_number(), self.as_number()) {
                (Some(left), Some(right)) => left == right,
                _ => false,
            },
            Value::Boolean(expected) => matches!(coerced, Target::Bool(b) if b == expected),
            Value::Nil => coerced.is_nil(),
            Value::Array(expected) => {
                let Some(items) = elements(actual, coerced) else {
                    return Ok(false);
                };
                if items.len() != expected.len() {
                    return Ok(false);
                }
                for (item, value) in items.iter().zip(expected) {
                    if !value.matches(adapter, item, base, Operator::Equal)? {
                        return Ok(false);
                    }
                }
                true
            }
            Value::Selector(selector) => match actual {
                Target::Node(node) => selector.matches(adapter, node, base)?,
                _ => false,
            },
            Value::Regexp(_) => false,
        };
        Ok(equal)
    }

    /// Text of the actual side for string-like values. `None` when the
    /// actual value has no sensible text form.
    fn actual_text<A: Adapter>(
        &self,
        adapter: &A,
        actual: &Target<A::Node>,
        coerced: &Target<A::Node>,
    ) -> Option<String> {
        match self {
            Value::Identifier(_) => match actual {
                Target::Node(node) => Some(adapter.source(node)),
                Target::List(_) => None,
                other => Some(to_text(adapter, other)),
            },
            _ => match coerced {
                Target::Nil | Target::List(_) => None,
                other => Some(to_text(adapter, other)),
            },
        }
    }

    fn expected_text<A: Adapter>(&self, adapter: &A, base: &A::Node) -> String {
        match self {
            Value::String(text) | Value::Identifier(text) | Value::Symbol(text) => text.clone(),
            Value::Template(template) => expand_template(adapter, template, base),
            other => other.to_string(),
        }
    }

    fn as_number(&self) -> Option<Number> {
        match self {
            Value::Integer(value) => Some(Number::Int(*value)),
            Value::Float(value) => Some(Number::Float(*value)),
            _ => None,
        }
    }
}

/// `in` holds when any element equals; `not in` when every element differs.
fn quantify<A: Adapter>(
    adapter: &A,
    expected: &[Value],
    actual: &Target<A::Node>,
    base: &A::Node,
    operator: Operator,
) -> Result<bool, MatchError> {
    for value in expected {
        let hit = value.matches(adapter, actual, base, operator)?;
        match operator {
            Operator::Equal if hit => return Ok(true),
            Operator::NotEqual if !hit => return Ok(false),
            _ => {}
        }
    }
    Ok(operator == Operator::NotEqual)
}

/// Elements of a sequence-valued actual, preferring the uncoerced slots.
pub(crate) fn elements<N: Clone>(actual: &Target<N>, coerced: &Target<N>) -> Option<Vec<Target<N>>> {
    match (actual, coerced) {
        (Target::List(items), _) | (_, Target::List(items)) => Some(items.clone()),
        _ => None,
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in text.chars() {
        if ch == '"' || ch == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{ch}")?;
    }
    f.write_str("\"")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(text) | Value::Template(text) => write_string(f, text),
            Value::Identifier(text) => f.write_str(text),
            Value::Symbol(text) => write!(f, ":{text}"),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value:?}"),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::Nil => f.write_str("nil"),
            Value::Regexp(regexp) => write!(f, "{regexp}"),
            Value::Array(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Value::Selector(selector) => write!(f, "{selector}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{MemoryTree, NodeId};

    struct Fixture {
        tree: MemoryTree,
        base: NodeId,
        ident: NodeId,
        int: NodeId,
        string: NodeId,
        symbol: NodeId,
        array: NodeId,
    }

    fn fixture() -> Fixture {
        let mut tree = MemoryTree::new();
        let ident = tree.node("Ident", "user").finish();
        let int = tree.node("Int", "2").literal(Target::Int(2)).finish();
        let string = tree.node("Str", "\"foo\"").literal(Target::Str("foo".into())).finish();
        let symbol = tree.node("Sym", ":create").literal(Target::Sym("create".into())).finish();
        let one = tree.node("Int", "1").literal(Target::Int(1)).finish();
        let array = tree
            .node("Array", "[1, 2]")
            .literal(Target::List(vec![Target::Node(one), Target::Node(int)]))
            .finish();
        let base = tree
            .node("Send", "user.create")
            .field("receiver", ident)
            .field("message", Target::Sym("create".into()))
            .finish();
        Fixture {
            tree,
            base,
            ident,
            int,
            string,
            symbol,
            array,
        }
    }

    fn check(f: &Fixture, value: Value, actual: Target<NodeId>, operator: Operator) -> bool {
        value.matches(&f.tree, &actual, &f.base, operator).unwrap()
    }

    #[test]
    fn identifier_compares_source() {
        let f = fixture();
        let node = Target::Node(f.ident);
        assert!(check(&f, Value::Identifier("user".into()), node.clone(), Operator::Equal));
        assert!(check(&f, Value::Identifier("us".into()), node.clone(), Operator::StartsWith));
        assert!(check(&f, Value::Identifier("er".into()), node.clone(), Operator::EndsWith));
        assert!(check(&f, Value::Identifier("se".into()), node.clone(), Operator::Contains));
        assert!(check(&f, Value::Identifier("admin".into()), node, Operator::NotEqual));
    }

    #[test]
    fn string_compares_coerced_literal() {
        let f = fixture();
        assert!(check(&f, Value::String("foo".into()), Target::Node(f.string), Operator::Equal));
        assert!(!check(&f, Value::String("".into()), Target::Nil, Operator::Equal));
    }

    #[test]
    fn numbers_compare_across_kinds() {
        let f = fixture();
        let node = Target::Node(f.int);
        assert!(check(&f, Value::Integer(2), node.clone(), Operator::Equal));
        assert!(check(&f, Value::Float(2.0), node.clone(), Operator::Equal));
        assert!(check(&f, Value::Integer(1), node.clone(), Operator::GreaterThan));
        assert!(check(&f, Value::Integer(2), node.clone(), Operator::LessThanOrEqual));
        assert!(!check(&f, Value::Integer(2), Target::Str("2".into()), Operator::GreaterThanOrEqual));
    }

    #[test]
    fn integers_past_float_precision_stay_distinct() {
        let f = fixture();
        let big = 9_007_199_254_740_993_i64;
        let actual = Target::Int(big - 1);
        assert!(!check(&f, Value::Integer(big), actual.clone(), Operator::Equal));
        assert!(check(&f, Value::Integer(big), actual.clone(), Operator::NotEqual));
        assert!(check(&f, Value::Integer(big), actual.clone(), Operator::LessThan));
        assert!(!check(&f, Value::Integer(big), actual, Operator::GreaterThanOrEqual));
        assert!(check(&f, Value::Integer(big), Target::Int(big), Operator::Equal));
    }

    #[test]
    fn symbol_matches_source_or_scalar() {
        let f = fixture();
        assert!(check(&f, Value::Symbol("create".into()), Target::Node(f.symbol), Operator::Equal));
        assert!(check(&f, Value::Symbol("create".into()), Target::Sym("create".into()), Operator::Equal));
        assert!(!check(&f, Value::Symbol("create".into()), Target::Nil, Operator::Equal));
    }

    #[test]
    fn nil_and_boolean() {
        let f = fixture();
        assert!(check(&f, Value::Nil, Target::Nil, Operator::Equal));
        assert!(check(&f, Value::Nil, Target::Node(f.ident), Operator::NotEqual));
        assert!(check(&f, Value::Boolean(true), Target::Bool(true), Operator::Equal));
        assert!(!check(&f, Value::Boolean(true), Target::Bool(false), Operator::Equal));
    }

    #[test]
    fn array_equality_is_elementwise() {
        let f = fixture();
        let expected = Value::Array(vec![Value::Integer(1), Value::Integer(2)]);
        assert!(check(&f, expected.clone(), Target::Node(f.array), Operator::Equal));
        assert!(!check(&f, expected.clone(), Target::Node(f.array), Operator::NotEqual));

        let shorter = Value::Array(vec![Value::Integer(1)]);
        assert!(!check(&f, shorter.clone(), Target::Node(f.array), Operator::Equal));
        assert!(check(&f, shorter, Target::Node(f.array), Operator::NotEqual));
        assert!(check(&f, expected, Target::Int(1), Operator::NotEqual));
    }

    #[test]
    fn in_applies_elementwise_to_lists() {
        let f = fixture();
        let names = Value::Array(vec![Value::Identifier("a".into()), Value::Identifier("b".into())]);
        let both = Target::List(vec![Target::Str("a".into()), Target::Str("b".into())]);
        let mixed = Target::List(vec![Target::Str("a".into()), Target::Str("c".into())]);

        assert!(check(&f, names.clone(), Target::Str("a".into()), Operator::In));
        assert!(check(&f, names.clone(), both.clone(), Operator::In));
        assert!(!check(&f, names.clone(), mixed.clone(), Operator::In));
        assert!(check(&f, names.clone(), Target::Str("c".into()), Operator::NotIn));
        assert!(!check(&f, names.clone(), mixed, Operator::NotIn));
        assert!(!check(&f, names, both, Operator::NotIn));
    }

    #[test]
    fn includes_needs_a_list() {
        let f = fixture();
        let list = Target::List(vec![Target::Node(f.ident), Target::Node(f.int)]);
        assert!(check(&f, Value::Identifier("user".into()), list.clone(), Operator::Includes));
        assert!(check(&f, Value::Integer(3), list.clone(), Operator::NotIncludes));
        assert!(!check(&f, Value::Identifier("user".into()), Target::Node(f.ident), Operator::Includes));
    }

    #[test]
    fn regexp_matches_source() {
        let f = fixture();
        let regexp = Value::Regexp(Regexp::new("^US", "i").unwrap());
        assert!(check(&f, regexp.clone(), Target::Node(f.ident), Operator::Matches));
        assert!(!check(&f, regexp.clone(), Target::Node(f.ident), Operator::NotMatches));
        assert!(check(&f, regexp, Target::Nil, Operator::NotMatches));
    }

    #[test]
    fn absent_values_never_match_a_regexp() {
        let f = fixture();
        let empty = Value::Regexp(Regexp::new("^$", "").unwrap());
        assert!(!check(&f, empty.clone(), Target::Nil, Operator::Matches));
        assert!(check(&f, empty.clone(), Target::Nil, Operator::NotMatches));
        assert!(check(&f, empty, Target::Str(String::new()), Operator::Matches));
    }

    #[test]
    fn template_expands_against_base() {
        let f = fixture();
        let template = Value::Template("{{receiver}}".into());
        assert!(check(&f, template, Target::Node(f.ident), Operator::Equal));
    }

    #[test]
    fn illegal_operator_is_an_error() {
        let f = fixture();
        let err = Value::String("x".into())
            .matches(&f.tree, &Target::Nil, &f.base, Operator::GreaterThan)
            .unwrap_err();
        assert_eq!(
            err,
            MatchError::InvalidOperator {
                operator: ">".into(),
                value: "\"x\"".into(),
            }
        );
        assert!(Value::Regexp(Regexp::new("x", "").unwrap())
            .matches(&f.tree, &Target::Nil, &f.base, Operator::Equal)
            .is_err());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::String("a\"b".into()).to_string(), "\"a\\\"b\"");
        assert_eq!(Value::Symbol("[]=".into()).to_string(), ":[]=");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(
            Value::Array(vec![Value::Identifier("foo".into()), Value::Nil]).to_string(),
            "(foo nil)"
        );
        assert_eq!(Value::Regexp(Regexp::new("a/b", "im").unwrap()).to_string(), "/a\\/b/im");
    }
}
