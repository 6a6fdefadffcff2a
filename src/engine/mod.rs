//! Selector matching and traversal.

pub mod errors;
pub mod expression;
pub mod options;
pub mod selector;
pub mod value;

pub use errors::MatchError;
pub use expression::{Expression, ExpressionList};
pub use options::QueryOptions;
pub use selector::{
    Attribute, AttributeList, BasicSelector, Position, Pseudo, PseudoClass, Relationship, Selector,
};
pub use value::{Operator, Regexp, Value};
