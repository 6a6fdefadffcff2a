//! Query text to selector AST.
//!
//! `compile` is the inverse of the AST's `Display` implementation: printing
//! a compiled query and compiling the result gives back an equal AST.
//! Printing normalizes spelling (equality prints as `=`, strings are
//! always double quoted, keyword operators are lower case).

pub mod errors;
pub mod lexer;
pub mod parser;

pub use errors::ParseError;
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::engine::expression::ExpressionList;
use tracing::debug;

/// Compile query text such as `.Def[params.size>=2]` into an expression list.
///
/// # Limits
///
/// The parser recurses once per nested selector value
/// (`[arguments=.Send[receiver=.Ident]]`) and once per chained selector, so
/// stack use grows with how deeply the query text nests. Queries come from
/// developers, not end users; untrusted text should be length-limited first.
pub fn compile(text: &str) -> Result<ExpressionList, ParseError> {
    let list = Parser::new(text)?.parse()?;
    debug!(query = text, expressions = list.expressions().len(), "compiled query");
    Ok(list)
}
