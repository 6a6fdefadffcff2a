//! Thread-local parser pooling.
//!
//! Keeps one tree-sitter parser configured for Rust per thread. The parser
//! is created on first use and reused for every later parse on that thread.

use crate::adapter::TreeSitterError;
use ast_grep_language::{LanguageExt, SupportLang};
use std::cell::RefCell;
use tree_sitter::Parser;

thread_local! {
    static RUST_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

fn rust_parser() -> Result<Parser, TreeSitterError> {
    let mut parser = Parser::new();
    let ts_lang = SupportLang::Rust.get_ts_language();
    parser
        .set_language(&ts_lang)
        .map_err(|_| TreeSitterError::LanguageSet)?;
    Ok(parser)
}

/// Execute function with the pooled Rust parser.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use node_query::pool::with_parser;
///
/// let tree = with_parser(|parser| parser.parse("fn main() {}", None))?;
/// assert!(tree.is_some());
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(f: F) -> Result<R, TreeSitterError>
where
    F: FnOnce(&mut Parser) -> R,
{
    RUST_PARSER.with(|cell| {
        let pooled = cell.borrow_mut().take();
        let mut parser = match pooled {
            Some(parser) => parser,
            None => rust_parser()?,
        };
        let result = f(&mut parser);
        *cell.borrow_mut() = Some(parser);
        Ok(result)
    })
}
