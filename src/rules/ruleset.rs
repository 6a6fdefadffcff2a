//! Declarative rule sets: nested mappings from key paths to expected values.
//!
//! ```text
//! { "node_type": "Def", "params": { "size": { "gte": 2 } } }
//! ```
//!
//! Nested maps flatten depth-first into `params.size` style paths. When
//! the last key is a keyword (`not`, `in`, `not_in`, `gt`, `gte`, `lt`,
//! `lte`, `includes`, `not_includes`, `any`) it selects the comparison
//! instead of naming an accessor.

use crate::adapter::{coerce, Adapter, Target};
use crate::engine::errors::MatchError;
use crate::engine::options::{traverse, QueryOptions};
use crate::engine::value::elements;
use crate::path::{expand_template, to_text, KeyPath};
use crate::rules::value::RuleValue;
use serde::de::{self, Deserialize, Deserializer};
use std::borrow::Cow;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Not,
    In,
    NotIn,
    Gt,
    Gte,
    Lt,
    Lte,
    Includes,
    NotIncludes,
}

impl Keyword {
    fn parse(key: &str) -> Option<Self> {
        Some(match key {
            "not" => Keyword::Not,
            "in" => Keyword::In,
            "not_in" => Keyword::NotIn,
            "gt" => Keyword::Gt,
            "gte" => Keyword::Gte,
            "lt" => Keyword::Lt,
            "lte" => Keyword::Lte,
            "includes" | "any" => Keyword::Includes,
            "not_includes" => Keyword::NotIncludes,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct RuleEntry {
    key: String,
    path: KeyPath,
    keyword: Option<Keyword>,
    expected: RuleValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    entries: Vec<RuleEntry>,
}

impl RuleSet {
    pub fn new<K, I>(rules: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, RuleValue)>,
    {
        let rules: Vec<(String, RuleValue)> =
            rules.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let mut entries = Vec::new();
        flatten(&rules, &mut Vec::new(), &mut entries);
        trace!(entries = entries.len(), "compiled rule set");
        Self { entries }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Flattened `(key, expected)` pairs in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &RuleValue)> {
        self.entries.iter().map(|e| (e.key.as_str(), &e.expected))
    }

    /// Nodes at or below `node` for which every entry holds.
    pub fn query_nodes<A: Adapter>(
        &self,
        adapter: &A,
        node: &A::Node,
        options: QueryOptions,
    ) -> Result<Vec<A::Node>, MatchError> {
        traverse(adapter, node, options, |candidate| self.match_node(adapter, candidate))
    }

    pub fn query_slot<A: Adapter>(
        &self,
        adapter: &A,
        slot: &Target<A::Node>,
        options: QueryOptions,
    ) -> Result<Vec<A::Node>, MatchError> {
        match slot {
            Target::List(items) => {
                let mut nodes = Vec::new();
                for item in items {
                    nodes.extend(self.query_slot(adapter, item, options)?);
                }
                Ok(nodes)
            }
            Target::Node(node) => self.query_nodes(adapter, node, options),
            _ => Ok(Vec::new()),
        }
    }

    /// Every flattened entry holds for `node` itself.
    pub fn match_node<A: Adapter>(&self, adapter: &A, node: &A::Node) -> Result<bool, MatchError> {
        for entry in &self.entries {
            if !entry.matches(adapter, node)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RuleValue::deserialize(deserializer)? {
            RuleValue::Map(entries) => Ok(RuleSet::new(entries)),
            _ => Err(de::Error::custom("a rule set must be a map")),
        }
    }
}

fn flatten(rules: &[(String, RuleValue)], prefix: &mut Vec<String>, out: &mut Vec<RuleEntry>) {
    for (key, value) in rules {
        prefix.push(key.clone());
        match value {
            RuleValue::Map(nested) => flatten(nested, prefix, out),
            expected => {
                let keyword = prefix.last().and_then(|last| Keyword::parse(last));
                let path_keys = match keyword {
                    Some(_) => &prefix[..prefix.len() - 1],
                    None => &prefix[..],
                };
                out.push(RuleEntry {
                    key: prefix.join("."),
                    path: KeyPath::parse(&path_keys.join(".")),
                    keyword,
                    expected: expected.clone(),
                });
            }
        }
        prefix.pop();
    }
}

impl RuleEntry {
    fn matches<A: Adapter>(&self, adapter: &A, node: &A::Node) -> Result<bool, MatchError> {
        let actual = self.path.resolve(adapter, node);
        let expected = match &self.expected {
            RuleValue::Str(template) => Cow::Owned(RuleValue::Str(expand_template(adapter, template, node))),
            other => Cow::Borrowed(other),
        };
        let expected = expected.as_ref();

        let Some(keyword) = self.keyword else {
            return self.match_value(adapter, &actual, expected);
        };
        match keyword {
            Keyword::Not => Ok(!self.match_value(adapter, &actual, expected)?),
            Keyword::In | Keyword::NotIn => {
                let RuleValue::Array(candidates) = expected else {
                    return Err(self.unsupported("expected an array"));
                };
                let mut any = false;
                for candidate in candidates {
                    if self.match_value(adapter, &actual, candidate)? {
                        any = true;
                        break;
                    }
                }
                Ok(any == (keyword == Keyword::In))
            }
            Keyword::Gt | Keyword::Gte | Keyword::Lt | Keyword::Lte => {
                let Some(right) = expected.as_number() else {
                    return Err(self.unsupported("expected a number"));
                };
                let Some(left) = coerce(adapter, &actual).as_number() else {
                    return Ok(false);
                };
                Ok(match keyword {
                    Keyword::Gt => left > right,
                    Keyword::Gte => left >= right,
                    Keyword::Lt => left < right,
                    _ => left <= right,
                })
            }
            Keyword::Includes | Keyword::NotIncludes => {
                let Some(items) = elements(&actual, &coerce(adapter, &actual)) else {
                    return Ok(false);
                };
                let mut any = false;
                for item in &items {
                    if self.match_value(adapter, item, expected)? {
                        any = true;
                        break;
                    }
                }
                Ok(any == (keyword == Keyword::Includes))
            }
        }
    }

    fn match_value<A: Adapter>(
        &self,
        adapter: &A,
        actual: &Target<A::Node>,
        expected: &RuleValue,
    ) -> Result<bool, MatchError> {
        let matched = match expected {
            RuleValue::Any => !actual.is_nil(),
            RuleValue::Nil => coerce(adapter, actual).is_nil(),
            RuleValue::Bool(b) => matches!(coerce(adapter, actual), Target::Bool(v) if v == *b),
            RuleValue::Int(_) | RuleValue::Float(_) => {
                coerce(adapter, actual).as_number() == expected.as_number()
            }
            RuleValue::Str(text) => match actual {
                Target::Node(node) => {
                    let source = adapter.source(node);
                    source == *text
                        || source == unwrap_quote(text)
                        || unwrap_quote(&source) == text
                        || unwrap_quote(&source) == unwrap_quote(text)
                }
                Target::List(_) => false,
                other => {
                    let scalar = to_text(adapter, other);
                    scalar == *text || wrap_quote(&scalar) == *text
                }
            },
            RuleValue::Sym(name) => match actual {
                Target::Node(node) => {
                    let source = adapter.source(node);
                    source == format!(":{name}") || source == *name
                }
                Target::Sym(text) | Target::Str(text) => text == name,
                _ => false,
            },
            RuleValue::Regexp(regexp) => match actual {
                Target::List(_) | Target::Nil => false,
                other => regexp.is_match(&to_text(adapter, other)),
            },
            RuleValue::Array(expected) => {
                let Some(items) = elements(actual, &coerce(adapter, actual)) else {
                    return Ok(false);
                };
                if items.len() != expected.len() {
                    return Ok(false);
                }
                for (item, value) in items.iter().zip(expected) {
                    if !self.match_value(adapter, item, value)? {
                        return Ok(false);
                    }
                }
                true
            }
            RuleValue::Map(_) => return Err(self.unsupported("nested rule inside a value")),
        };
        Ok(matched)
    }

    fn unsupported(&self, reason: &str) -> MatchError {
        MatchError::UnsupportedRuleValue {
            key: self.key.clone(),
            reason: reason.to_string(),
        }
    }
}

fn unwrap_quote(text: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}

fn wrap_quote(text: &str) -> String {
    if text.contains('\'') {
        format!("\"{text}\"")
    } else {
        format!("'{text}'")
    }
}
