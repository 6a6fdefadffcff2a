//! Query tokenizer.
//!
//! The same character means different things depending on where it
//! appears (`.` starts a node type in a selector but is a path separator in
//! an attribute key), so the lexer keeps a stack of modes that follows the
//! bracket and parenthesis nesting.

use crate::compiler::errors::ParseError;
use crate::engine::selector::{Position, PseudoClass, Relationship};
use crate::engine::value::Operator;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `.Type`, without the dot.
    NodeType(String),
    /// Bare path before a selector, e.g. `body` in `body > .Send`.
    GotoScope(String),
    OpenBracket,
    CloseBracket,
    OpenParen,
    CloseParen,
    Comma,
    Relationship(Relationship),
    Pseudo(PseudoClass),
    Position(Position),
    Key(String),
    Operator(Operator),
    Str(String),
    Regexp { source: String, flags: String },
    /// Unquoted value: identifier, number, symbol, `true`, `false`, `nil`.
    Word(String),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::NodeType(name) => write!(f, ".{name}"),
            TokenKind::GotoScope(path) | TokenKind::Key(path) | TokenKind::Word(path) => {
                f.write_str(path)
            }
            TokenKind::OpenBracket => f.write_str("["),
            TokenKind::CloseBracket => f.write_str("]"),
            TokenKind::OpenParen => f.write_str("("),
            TokenKind::CloseParen => f.write_str(")"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Relationship(relationship) => write!(f, "{relationship}"),
            TokenKind::Pseudo(class) => write!(f, ":{class}"),
            TokenKind::Position(position) => write!(f, ":{position}"),
            TokenKind::Operator(operator) => write!(f, "{operator}"),
            TokenKind::Str(text) => write!(f, "\"{text}\""),
            TokenKind::Regexp { source, flags } => write!(f, "/{source}/{flags}"),
            TokenKind::Eof => f.write_str("end of query"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Character offset of the first character of the token.
    pub offset: usize,
    /// Whitespace directly precedes the token.
    pub spaced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Selector,
    Key,
    Operator,
    Value,
    AttrEnd,
    Array,
    ValueSelector,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    modes: Vec<Mode>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            modes: vec![Mode::Selector],
        }
    }

    /// Tokenize the whole input. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.position;
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
        self.position > start
    }

    fn mode(&self) -> Mode {
        self.modes.last().copied().unwrap_or(Mode::Selector)
    }

    fn set_mode(&mut self, mode: Mode) {
        if let Some(top) = self.modes.last_mut() {
            *top = mode;
        }
    }

    fn push_mode(&mut self, mode: Mode) {
        self.modes.push(mode);
    }

    fn pop_mode(&mut self) {
        if self.modes.len() > 1 {
            self.modes.pop();
        }
    }

    fn read_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if !accept(ch) {
                break;
            }
            result.push(ch);
            self.advance();
        }
        result
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        loop {
            let mode = self.mode();
            if mode == Mode::ValueSelector && !matches!(self.current_char(), Some('[' | ':' | '(')) {
                self.pop_mode();
                continue;
            }

            let spaced = self.skip_whitespace();
            let offset = self.position;
            let Some(ch) = self.current_char() else {
                let expected = match mode {
                    Mode::Selector => {
                        return Ok(Token {
                            kind: TokenKind::Eof,
                            offset,
                            spaced,
                        })
                    }
                    Mode::Key => "attribute key",
                    Mode::Operator => "operator",
                    Mode::Value => "value",
                    Mode::Array => "`)`",
                    Mode::AttrEnd | Mode::ValueSelector => "`]`",
                };
                return Err(ParseError::UnexpectedEof { expected, offset });
            };

            let kind = match mode {
                Mode::Selector => self.lex_selector(ch, offset)?,
                Mode::ValueSelector => self.lex_value_selector(ch, offset)?,
                Mode::Key => self.lex_key(ch, offset)?,
                Mode::Operator => self.lex_operator(ch, offset)?,
                Mode::Value => self.lex_value(ch, offset)?,
                Mode::Array => self.lex_array(ch, offset)?,
                Mode::AttrEnd => {
                    if ch != ']' {
                        return Err(ParseError::UnexpectedChar { ch, offset });
                    }
                    self.advance();
                    self.pop_mode();
                    TokenKind::CloseBracket
                }
            };
            return Ok(Token { kind, offset, spaced });
        }
    }

    fn lex_selector(&mut self, ch: char, offset: usize) -> Result<TokenKind, ParseError> {
        let kind = match ch {
            '.' if self.peek_char(1).is_some_and(is_name_start) => {
                self.advance();
                TokenKind::NodeType(self.read_while(is_name_char))
            }
            '[' => {
                self.advance();
                self.push_mode(Mode::Key);
                TokenKind::OpenBracket
            }
            '(' => {
                self.advance();
                self.push_mode(Mode::Selector);
                TokenKind::OpenParen
            }
            ')' => {
                self.advance();
                self.pop_mode();
                TokenKind::CloseParen
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            '>' | '+' | '~' => {
                self.advance();
                TokenKind::Relationship(match ch {
                    '>' => Relationship::Child,
                    '+' => Relationship::NextSibling,
                    _ => Relationship::SubsequentSibling,
                })
            }
            ':' => self.lex_colon(offset)?,
            c if is_name_start(c) => TokenKind::GotoScope(self.read_while(is_path_char)),
            _ => return Err(ParseError::UnexpectedChar { ch, offset }),
        };
        Ok(kind)
    }

    fn lex_value_selector(&mut self, ch: char, offset: usize) -> Result<TokenKind, ParseError> {
        match ch {
            '[' => {
                self.advance();
                self.push_mode(Mode::Key);
                Ok(TokenKind::OpenBracket)
            }
            '(' => {
                self.advance();
                self.push_mode(Mode::Selector);
                Ok(TokenKind::OpenParen)
            }
            _ => self.lex_colon(offset),
        }
    }

    fn lex_colon(&mut self, offset: usize) -> Result<TokenKind, ParseError> {
        self.advance();
        let name = self.read_while(is_name_char);
        match name.as_str() {
            "has" => Ok(TokenKind::Pseudo(PseudoClass::Has)),
            "not_has" => Ok(TokenKind::Pseudo(PseudoClass::NotHas)),
            "first-child" => Ok(TokenKind::Position(Position::FirstChild)),
            "last-child" => Ok(TokenKind::Position(Position::LastChild)),
            _ => Err(ParseError::UnexpectedToken {
                found: format!(":{name}"),
                expected: "pseudo class",
                offset,
            }),
        }
    }

    fn lex_key(&mut self, ch: char, offset: usize) -> Result<TokenKind, ParseError> {
        let mut key = String::new();
        while let Some(c) = self.current_char() {
            let operator_star = c == '*' && self.peek_char(1) == Some('=');
            if !is_path_char(c) || operator_star {
                break;
            }
            key.push(c);
            self.advance();
        }
        if key.is_empty() {
            return Err(ParseError::UnexpectedChar { ch, offset });
        }
        self.set_mode(Mode::Operator);
        Ok(TokenKind::Key(key))
    }

    fn lex_operator(&mut self, ch: char, offset: usize) -> Result<TokenKind, ParseError> {
        let pair = (ch, self.peek_char(1).unwrap_or('\0'));
        let symbolic = match pair {
            ('=', '=') => Some((Operator::Equal, 2)),
            ('!', '=') => Some((Operator::NotEqual, 2)),
            ('^', '=') => Some((Operator::StartsWith, 2)),
            ('$', '=') => Some((Operator::EndsWith, 2)),
            ('*', '=') => Some((Operator::Contains, 2)),
            ('>', '=') => Some((Operator::GreaterThanOrEqual, 2)),
            ('<', '=') => Some((Operator::LessThanOrEqual, 2)),
            ('=', '~') => Some((Operator::Matches, 2)),
            ('!', '~') => Some((Operator::NotMatches, 2)),
            ('=', _) => Some((Operator::Equal, 1)),
            ('>', _) => Some((Operator::GreaterThan, 1)),
            ('<', _) => Some((Operator::LessThan, 1)),
            _ => None,
        };

        let operator = match symbolic {
            Some((operator, width)) => {
                self.position += width;
                operator
            }
            None if ch.is_alphabetic() => self.lex_keyword_operator(offset)?,
            None => return Err(ParseError::UnexpectedChar { ch, offset }),
        };
        self.set_mode(Mode::Value);
        Ok(TokenKind::Operator(operator))
    }

    fn lex_keyword_operator(&mut self, offset: usize) -> Result<Operator, ParseError> {
        let word = self.read_while(|c| c.is_alphabetic() || c == '_').to_lowercase();
        let operator = match word.as_str() {
            "in" => Operator::In,
            "includes" => Operator::Includes,
            "not_in" => Operator::NotIn,
            "not_includes" => Operator::NotIncludes,
            "not" => {
                self.skip_whitespace();
                let next = self.read_while(char::is_alphabetic).to_lowercase();
                match next.as_str() {
                    "in" => Operator::NotIn,
                    "includes" => Operator::NotIncludes,
                    _ => {
                        return Err(ParseError::UnexpectedToken {
                            found: format!("not {next}"),
                            expected: "operator",
                            offset,
                        })
                    }
                }
            }
            _ => {
                return Err(ParseError::UnexpectedToken {
                    found: word,
                    expected: "operator",
                    offset,
                })
            }
        };
        Ok(operator)
    }

    fn lex_value(&mut self, ch: char, offset: usize) -> Result<TokenKind, ParseError> {
        self.set_mode(Mode::AttrEnd);
        match ch {
            '(' => {
                self.advance();
                self.push_mode(Mode::Array);
                Ok(TokenKind::OpenParen)
            }
            '.' if self.peek_char(1).is_some_and(is_name_start) => {
                self.advance();
                self.push_mode(Mode::ValueSelector);
                Ok(TokenKind::NodeType(self.read_while(is_name_char)))
            }
            _ => self.lex_scalar(ch, offset),
        }
    }

    fn lex_array(&mut self, ch: char, offset: usize) -> Result<TokenKind, ParseError> {
        if ch == ')' {
            self.advance();
            self.pop_mode();
            return Ok(TokenKind::CloseParen);
        }
        self.lex_scalar(ch, offset)
    }

    fn lex_scalar(&mut self, ch: char, offset: usize) -> Result<TokenKind, ParseError> {
        match ch {
            '"' | '\'' => self.read_string(ch, offset).map(TokenKind::Str),
            '/' => self.read_regexp(offset),
            _ => {
                let word = self.read_word();
                if word.is_empty() {
                    return Err(ParseError::UnexpectedChar { ch, offset });
                }
                Ok(TokenKind::Word(word))
            }
        }
    }

    fn read_string(&mut self, quote: char, offset: usize) -> Result<String, ParseError> {
        let mut result = String::new();
        self.advance();
        loop {
            match self.current_char() {
                None => return Err(ParseError::Unterminated { what: "string", offset }),
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                Some('\\') => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some(other) => result.push(other),
                        None => return Err(ParseError::Unterminated { what: "string", offset }),
                    }
                    self.advance();
                }
                Some(c) => {
                    result.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_regexp(&mut self, offset: usize) -> Result<TokenKind, ParseError> {
        let mut source = String::new();
        self.advance();
        loop {
            match self.current_char() {
                None => return Err(ParseError::Unterminated { what: "regexp", offset }),
                Some('/') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.current_char() {
                        Some('/') => source.push('/'),
                        Some(other) => {
                            source.push('\\');
                            source.push(other);
                        }
                        None => return Err(ParseError::Unterminated { what: "regexp", offset }),
                    }
                    self.advance();
                }
                Some(c) => {
                    source.push(c);
                    self.advance();
                }
            }
        }
        let flags = self.read_while(|c| matches!(c, 'i' | 'm' | 'x'));
        Ok(TokenKind::Regexp { source, flags })
    }

    /// Run of non-delimiter characters. `[]` pairs are part of the word so
    /// that `[]=` and `:[]` read as values.
    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.current_char() {
            if c == '[' && self.peek_char(1) == Some(']') {
                word.push_str("[]");
                self.position += 2;
                continue;
            }
            if c.is_whitespace() || matches!(c, '[' | ']' | '(' | ')' | ',') {
                break;
            }
            word.push(c);
            self.advance();
        }
        word
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn is_path_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '*' | '-')
}
