use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("invalid operator {operator} for value {value}")]
    InvalidOperator { operator: String, value: String },

    #[error("unsupported rule value for '{key}': {reason}")]
    UnsupportedRuleValue { key: String, reason: String },
}
