//! Expected values of a rule set.

use crate::adapter::Number;
use crate::engine::value::Regexp;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use std::fmt;

/// Leaf or nested mapping of a rule set.
///
/// Deserializes from any self-describing serde format: `null`, booleans,
/// numbers, strings, sequences and maps. Map entries keep their document
/// order. Symbols, regexps and `Any` have no serialized form and are built
/// in code.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleValue {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Sym(String),
    Regexp(Regexp),
    Array(Vec<RuleValue>),
    Map(Vec<(String, RuleValue)>),
    /// Matches any value that is present.
    Any,
}

impl RuleValue {
    pub fn sym(name: impl Into<String>) -> Self {
        RuleValue::Sym(name.into())
    }

    pub fn regexp(source: &str) -> Result<Self, regex::Error> {
        Ok(RuleValue::Regexp(Regexp::new(source, "")?))
    }

    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, RuleValue)>,
    {
        RuleValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub(crate) fn as_number(&self) -> Option<Number> {
        match self {
            RuleValue::Int(value) => Some(Number::Int(*value)),
            RuleValue::Float(value) => Some(Number::Float(*value)),
            _ => None,
        }
    }
}

impl From<&str> for RuleValue {
    fn from(value: &str) -> Self {
        RuleValue::Str(value.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(value: String) -> Self {
        RuleValue::Str(value)
    }
}

impl From<i64> for RuleValue {
    fn from(value: i64) -> Self {
        RuleValue::Int(value)
    }
}

impl From<f64> for RuleValue {
    fn from(value: f64) -> Self {
        RuleValue::Float(value)
    }
}

impl From<bool> for RuleValue {
    fn from(value: bool) -> Self {
        RuleValue::Bool(value)
    }
}

impl<T: Into<RuleValue>> From<Vec<T>> for RuleValue {
    fn from(values: Vec<T>) -> Self {
        RuleValue::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<'de> Deserialize<'de> for RuleValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = RuleValue;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a rule value")
            }
            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(RuleValue::Nil)
            }
            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(RuleValue::Nil)
            }
            fn visit_some<D2>(self, deserializer: D2) -> Result<Self::Value, D2::Error>
            where
                D2: Deserializer<'de>,
            {
                RuleValue::deserialize(deserializer)
            }
            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(RuleValue::Bool(v))
            }
            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(RuleValue::Int(v))
            }
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(match i64::try_from(v) {
                    Ok(v) => RuleValue::Int(v),
                    Err(_) => RuleValue::Float(v as f64),
                })
            }
            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(RuleValue::Float(v))
            }
            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(RuleValue::Str(v.to_string()))
            }
            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(RuleValue::Str(v))
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(RuleValue::Array(items))
            }
            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, RuleValue>()? {
                    entries.push((key, value));
                }
                Ok(RuleValue::Map(entries))
            }
        }
        deserializer.deserialize_any(V)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_maps_keep_document_order() {
        let value: RuleValue =
            serde_json::from_str(r#"{"z": 1, "a": {"gt": 2.5}, "m": [null, true, "x"]}"#).unwrap();
        assert_eq!(
            value,
            RuleValue::map([
                ("z", RuleValue::Int(1)),
                ("a", RuleValue::map([("gt", RuleValue::Float(2.5))])),
                (
                    "m",
                    RuleValue::Array(vec![RuleValue::Nil, RuleValue::Bool(true), "x".into()])
                ),
            ])
        );
    }

    #[test]
    fn conversions() {
        assert_eq!(RuleValue::from(vec!["a", "b"]), RuleValue::Array(vec!["a".into(), "b".into()]));
        assert_eq!(RuleValue::sym("create"), RuleValue::Sym("create".into()));
        assert!(RuleValue::regexp("(").is_err());
    }
}
