//! Rule sets: the mapping-based alternative to query text.

pub mod ruleset;
pub mod value;

pub use ruleset::RuleSet;
pub use value::RuleValue;
