//! Tokenizer for the predicate language.

use super::ast::Comparator;
use super::PredicateError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Number(f64),
    Comparator(Comparator),
    And,
    Or,
    Not,
    In,
    Is,
    Missing,
    LParen,
    RParen,
    Comma,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier '{}'", name),
            TokenKind::Str(s) => format!("string '{}'", s),
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Comparator(op) => format!("'{}'", op.as_str()),
            TokenKind::And => "'AND'".to_string(),
            TokenKind::Or => "'OR'".to_string(),
            TokenKind::Not => "'NOT'".to_string(),
            TokenKind::In => "'IN'".to_string(),
            TokenKind::Is => "'IS'".to_string(),
            TokenKind::Missing => "'MISSING'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::Comma => "','".to_string(),
        }
    }
}

/// A token and its byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, PredicateError> {
        let mut tokens = Vec::new();
        while let Some(&(offset, c)) = self.chars.get(self.pos) {
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }
            let kind = match c {
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                ',' => self.single(TokenKind::Comma),
                '>' | '<' | '=' | '!' => self.comparator(offset, c)?,
                '\'' | '"' => self.string(offset, c)?,
                '-' if self.peek_is(1, |n| n.is_ascii_digit()) => self.number(offset)?,
                c if c.is_ascii_digit() => self.number(offset)?,
                c if is_ident_start(c) => self.word(),
                other => {
                    return Err(self.error(offset, format!("unexpected character '{}'", other)))
                }
            };
            tokens.push(Token { kind, offset });
        }
        Ok(tokens)
    }

    fn peek_is(&self, ahead: usize, f: impl Fn(char) -> bool) -> bool {
        self.chars.get(self.pos + ahead).map(|&(_, c)| f(c)).unwrap_or(false)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    fn comparator(&mut self, offset: usize, first: char) -> Result<TokenKind, PredicateError> {
        let followed_by_eq = self.peek_is(1, |n| n == '=');
        let op = match (first, followed_by_eq) {
            ('>', true) => Comparator::Ge,
            ('<', true) => Comparator::Le,
            ('=', true) => Comparator::Eq,
            ('!', true) => Comparator::Ne,
            ('>', false) => Comparator::Gt,
            ('<', false) => Comparator::Lt,
            ('=', false) => return Err(self.error(offset, "use '==' for equality")),
            _ => return Err(self.error(offset, "unexpected character '!'")),
        };
        self.pos += if followed_by_eq { 2 } else { 1 };
        Ok(TokenKind::Comparator(op))
    }

    fn string(&mut self, offset: usize, quote: char) -> Result<TokenKind, PredicateError> {
        self.pos += 1;
        let mut out = String::new();
        while let Some(&(_, c)) = self.chars.get(self.pos) {
            self.pos += 1;
            match c {
                '\\' => match self.chars.get(self.pos) {
                    Some(&(_, escaped)) => {
                        out.push(escaped);
                        self.pos += 1;
                    }
                    None => break,
                },
                c if c == quote => return Ok(TokenKind::Str(out)),
                c => out.push(c),
            }
        }
        Err(self.error(offset, "unterminated string literal"))
    }

    fn number(&mut self, offset: usize) -> Result<TokenKind, PredicateError> {
        let start = self.pos;
        if self.peek_is(0, |c| c == '-') {
            self.pos += 1;
        }
        while self.peek_is(0, |c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek_is(0, |c| c == '.') && self.peek_is(1, |c| c.is_ascii_digit()) {
            self.pos += 1;
            while self.peek_is(0, |c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if self.peek_is(0, is_ident_start) {
            return Err(self.error(offset, "malformed number"));
        }
        let text = self.slice(start, self.pos);
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error(offset, format!("malformed number '{}'", text)))
    }

    fn word(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek_is(0, is_ident_continue) {
            self.pos += 1;
        }
        match self.slice(start, self.pos) {
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "NOT" => TokenKind::Not,
            "IN" => TokenKind::In,
            "IS" => TokenKind::Is,
            "MISSING" => TokenKind::Missing,
            ident => TokenKind::Ident(ident.to_string()),
        }
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        let from = self.chars[start].0;
        let to = self
            .chars
            .get(end)
            .map(|&(i, _)| i)
            .unwrap_or(self.source.len());
        &self.source[from..to]
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> PredicateError {
        PredicateError::Syntax {
            predicate: self.source.to_string(),
            offset,
            message: message.into(),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '.'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, PredicateError> {
    Lexer::new(source).tokenize()
}
