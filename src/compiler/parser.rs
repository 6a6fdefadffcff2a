//! Recursive-descent grammar over the token stream.
//!
//! ```text
//! expression_list := expression ("," expression)*
//! expression      := selector expression?
//! selector        := GOTO_SCOPE selector
//!                  | RELATIONSHIP selector
//!                  | compound
//! compound        := (NODE_TYPE attribute*)? pseudo? position?
//! pseudo          := PSEUDO "(" expression_list ")"
//! attribute       := "[" KEY OPERATOR value "]"
//! value           := "(" scalar* ")" | compound | scalar
//! ```
//!
//! A pseudo class or position written after whitespace starts a new
//! selector instead of attaching to the previous one.

use crate::compiler::errors::ParseError;
use crate::compiler::lexer::{Lexer, Token, TokenKind};
use crate::engine::expression::{Expression, ExpressionList};
use crate::engine::selector::{Attribute, AttributeList, BasicSelector, Pseudo, Selector};
use crate::engine::value::{Regexp, Value};
use crate::path::KeyPath;

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    eof: Token,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            eof: Token {
                kind: TokenKind::Eof,
                offset: input.chars().count(),
                spaced: false,
            },
        })
    }

    pub fn parse(mut self) -> Result<ExpressionList, ParseError> {
        let list = self.parse_expression_list()?;
        if self.peek().kind != TokenKind::Eof {
            return Err(self.unexpected("`,` or end of query"));
        }
        Ok(list)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&self.eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, ParseError> {
        if self.peek().kind != kind {
            return Err(self.unexpected(expected));
        }
        Ok(self.advance())
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        unexpected_token(self.peek(), expected)
    }

    fn parse_expression_list(&mut self) -> Result<ExpressionList, ParseError> {
        let mut expressions = vec![self.parse_expression()?];
        while self.peek().kind == TokenKind::Comma {
            self.advance();
            expressions.push(self.parse_expression()?);
        }
        Ok(ExpressionList::new(expressions))
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let selector = self.parse_selector()?;
        let rest = if self.starts_selector() {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Expression::new(selector, rest))
    }

    fn starts_selector(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::NodeType(_)
                | TokenKind::GotoScope(_)
                | TokenKind::Relationship(_)
                | TokenKind::Pseudo(_)
                | TokenKind::Position(_)
        )
    }

    fn parse_selector(&mut self) -> Result<Selector, ParseError> {
        match self.peek().kind.clone() {
            TokenKind::GotoScope(path) => {
                self.advance();
                let rest = self.parse_selector()?;
                Ok(Selector {
                    goto_scope: Some(KeyPath::parse(&path)),
                    rest: Some(Box::new(rest)),
                    ..Selector::default()
                })
            }
            TokenKind::Relationship(relationship) => {
                self.advance();
                let rest = self.parse_selector()?;
                Ok(Selector {
                    relationship: Some(relationship),
                    rest: Some(Box::new(rest)),
                    ..Selector::default()
                })
            }
            TokenKind::NodeType(_) | TokenKind::Pseudo(_) | TokenKind::Position(_) => {
                self.parse_compound()
            }
            _ => Err(self.unexpected("selector")),
        }
    }

    fn parse_compound(&mut self) -> Result<Selector, ParseError> {
        let mut selector = Selector::default();

        if let TokenKind::NodeType(node_type) = self.peek().kind.clone() {
            self.advance();
            let attributes = self.parse_attributes()?;
            selector.basic = Some(BasicSelector::new(node_type, attributes));
        }

        if let TokenKind::Pseudo(class) = self.peek().kind {
            if selector.basic.is_none() || !self.peek().spaced {
                self.advance();
                self.expect(TokenKind::OpenParen, "`(`")?;
                let expression = self.parse_expression_list()?;
                self.expect(TokenKind::CloseParen, "`)`")?;
                selector.pseudo = Some(Pseudo {
                    class,
                    expression: Box::new(expression),
                });
            }
        }

        if let TokenKind::Position(position) = self.peek().kind {
            let empty = selector.basic.is_none() && selector.pseudo.is_none();
            if empty || !self.peek().spaced {
                self.advance();
                selector.position = Some(position);
            }
        }

        Ok(selector)
    }

    fn parse_attributes(&mut self) -> Result<AttributeList, ParseError> {
        let mut attributes = Vec::new();
        while self.peek().kind == TokenKind::OpenBracket {
            self.advance();
            attributes.push(self.parse_attribute()?);
            self.expect(TokenKind::CloseBracket, "`]`")?;
        }
        Ok(AttributeList::new(attributes))
    }

    fn parse_attribute(&mut self) -> Result<Attribute, ParseError> {
        let token = self.advance();
        let TokenKind::Key(key) = token.kind else {
            return Err(unexpected_token(&token, "attribute key"));
        };
        let token = self.advance();
        let TokenKind::Operator(operator) = token.kind else {
            return Err(unexpected_token(&token, "operator"));
        };
        let value = self.parse_value()?;
        Ok(Attribute::new(KeyPath::parse(&key), operator, value))
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        match self.peek().kind {
            TokenKind::OpenParen => {
                self.advance();
                let mut items = Vec::new();
                while self.peek().kind != TokenKind::CloseParen {
                    items.push(self.parse_scalar()?);
                }
                self.advance();
                Ok(Value::Array(items))
            }
            TokenKind::NodeType(_) => Ok(Value::Selector(Box::new(self.parse_compound()?))),
            _ => self.parse_scalar(),
        }
    }

    fn parse_scalar(&mut self) -> Result<Value, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Str(text) if text.contains("{{") => Ok(Value::Template(text)),
            TokenKind::Str(text) => Ok(Value::String(text)),
            TokenKind::Regexp { source, flags } => Regexp::new(&source, &flags)
                .map(Value::Regexp)
                .map_err(|source| ParseError::InvalidRegexp {
                    offset: token.offset,
                    source,
                }),
            TokenKind::Word(word) => Ok(classify_word(word)),
            _ => Err(unexpected_token(&token, "value")),
        }
    }
}

fn unexpected_token(token: &Token, expected: &'static str) -> ParseError {
    match token.kind {
        TokenKind::Eof => ParseError::UnexpectedEof {
            expected,
            offset: token.offset,
        },
        _ => ParseError::UnexpectedToken {
            found: token.kind.to_string(),
            expected,
            offset: token.offset,
        },
    }
}

fn classify_word(word: String) -> Value {
    match word.as_str() {
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        "nil" => return Value::Nil,
        _ => {}
    }
    if let Some(symbol) = word.strip_prefix(':').filter(|s| !s.is_empty()) {
        return Value::Symbol(symbol.to_string());
    }
    let mut chars = word.chars();
    let numeric = match chars.next() {
        Some('-') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        Some(c) => c.is_ascii_digit(),
        None => false,
    };
    if numeric {
        if let Ok(value) = word.parse::<i64>() {
            return Value::Integer(value);
        }
        if let Ok(value) = word.parse::<f64>() {
            return Value::Float(value);
        }
    }
    Value::Identifier(word)
}
