use thiserror::Error;

/// Malformed query text. Offsets count characters from the start of the query.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unexpected token `{found}` at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        offset: usize,
    },

    #[error("unexpected end of query at offset {offset}, expected {expected}")]
    UnexpectedEof { expected: &'static str, offset: usize },

    #[error("unterminated {what} starting at offset {offset}")]
    Unterminated { what: &'static str, offset: usize },

    #[error("invalid regexp at offset {offset}: {source}")]
    InvalidRegexp {
        offset: usize,
        #[source]
        source: regex::Error,
    },
}

impl ParseError {
    pub fn offset(&self) -> usize {
        match self {
            ParseError::UnexpectedChar { offset, .. }
            | ParseError::UnexpectedToken { offset, .. }
            | ParseError::UnexpectedEof { offset, .. }
            | ParseError::Unterminated { offset, .. }
            | ParseError::InvalidRegexp { offset, .. } => *offset,
        }
    }
}
