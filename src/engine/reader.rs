use logos::{Logos, Span};
use std::fmt;

use crate::config::MAX_NESTING;
use crate::error::{Error, Result};
use crate::format::days_from_civil;

//===----------------------------------------------------------------------===//
// Utils
//===----------------------------------------------------------------------===//

/// Unescapes a string literal body: \n, \t, \r, \", \\ and \0. Unknown
/// escapes keep their backslash.
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('"') => result.push('"'),
            Some('\\') => result.push('\\'),
            Some('0') => result.push('\0'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}

fn parse_date(slice: &str) -> Option<i32> {
    let mut parts = slice.split('.');
    let year = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    days_from_civil(year, month, day)
}

//===----------------------------------------------------------------------===//
// Token
//===----------------------------------------------------------------------===//

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n,]+")]
#[logos(skip r";[^\n]*")]
pub enum Token {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let slice = lex.slice();
        unescape_string(&slice[1..slice.len() - 1])
    })]
    Str(String),

    // 2024.01.15
    #[regex(r"[0-9]{4}\.[0-9]{2}\.[0-9]{2}", priority = 5, callback = |lex| parse_date(lex.slice()))]
    Date(i32),

    #[regex(r"-?[0-9]+\.[0-9]+([eE][-+]?[0-9]+)?",
      priority = 4,
      callback = |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"-?[0-9]+", priority = 4, callback = |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    // 'name
    #[regex(r"'[A-Za-z_][A-Za-z0-9_.]*", callback = |lex| lex.slice()[1..].to_owned())]
    Symbol(String),

    #[regex(r"[A-Za-z_+\-*/<>=!?][A-Za-z0-9_+\-*/<>=!?.]*",
      priority = 1,
      callback = |lex| lex.slice().to_owned())]
    Ident(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::Date(days) => write!(f, "{}", crate::format::format_date(*days)),
            Token::Float(v) => write!(f, "{v}"),
            Token::Int(v) => write!(f, "{v}"),
            Token::Symbol(s) => write!(f, "'{s}"),
            Token::Ident(s) => write!(f, "{s}"),
        }
    }
}

//===----------------------------------------------------------------------===//
// Forms
//===----------------------------------------------------------------------===//

#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(i32),
    Str(String),
    /// A quoted symbol literal.
    Symbol(String),
    /// A bare name, resolved against the globals.
    Ident(String),
    Vector(Vec<Node>),
    /// `(op args..)`
    Call(Vec<Node>),
}

/// A form and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub form: Form,
    pub position: usize,
}

struct Reader {
    tokens: Vec<(Token, Span)>,
    position: usize,
    end: usize,
    /// Open brackets enclosing the form being read.
    depth: usize,
}

impl Reader {
    fn peek(&self) -> Option<&(Token, Span)> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<(Token, Span)> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn form(&mut self) -> Result<Node> {
        let Some((token, span)) = self.next() else {
            return Err(parse_error("unexpected end of input", self.end));
        };
        let position = span.start;
        let form = match token {
            Token::LParen => Form::Call(self.nested(Token::RParen, position)?),
            Token::LBracket => Form::Vector(self.nested(Token::RBracket, position)?),
            Token::RParen | Token::RBracket => {
                return Err(parse_error(&format!("unexpected {token}"), position));
            }
            Token::Str(s) => Form::Str(s),
            Token::Date(days) => Form::Date(days),
            Token::Float(v) => Form::Float(v),
            Token::Int(v) => Form::Int(v),
            Token::Symbol(s) => Form::Symbol(s),
            Token::Ident(name) => match name.as_str() {
                "null" => Form::Null,
                "true" => Form::Bool(true),
                "false" => Form::Bool(false),
                _ => Form::Ident(name),
            },
        };
        Ok(Node { form, position })
    }

    fn nested(&mut self, close: Token, open: usize) -> Result<Vec<Node>> {
        if self.depth >= MAX_NESTING {
            return Err(parse_error("nesting too deep", open));
        }
        self.depth += 1;
        let items = self.sequence(close, open);
        self.depth -= 1;
        items
    }

    fn sequence(&mut self, close: Token, open: usize) -> Result<Vec<Node>> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => {
                    let delimiter = if close == Token::RParen { '(' } else { '[' };
                    return Err(parse_error(&format!("unbalanced {delimiter}"), open));
                }
                Some((token, _)) if *token == close => {
                    self.position += 1;
                    return Ok(items);
                }
                Some(_) => items.push(self.form()?),
            }
        }
    }
}

fn parse_error(message: &str, position: usize) -> Error {
    Error::Parse { message: message.to_owned(), position }
}

//===----------------------------------------------------------------------===//
// Tokenizer
//===----------------------------------------------------------------------===//

pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                let span = lexer.span();
                let message = if lexer.slice().starts_with('"') {
                    "unterminated string".to_owned()
                } else {
                    format!("unexpected input {:?}", lexer.slice())
                };
                return Err(parse_error(&message, span.start));
            }
        }
    }
    Ok(tokens)
}

/// Reads every top-level form in `source`.
pub fn read(source: &str) -> Result<Vec<Node>> {
    let mut reader = Reader { tokens: tokenize(source)?, position: 0, end: source.len(), depth: 0 };
    let mut nodes = Vec::new();
    while reader.peek().is_some() {
        nodes.push(reader.form()?);
    }
    Ok(nodes)
}
