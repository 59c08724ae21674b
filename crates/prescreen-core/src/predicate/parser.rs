//! Recursive-descent parser for the predicate language.
//!
//! ```text
//! or_expr       := and_expr ("OR" and_expr)*
//! and_expr      := term ("AND" term)*
//! term          := "NOT"? atom
//! atom          := comparison | missing_check | membership | "(" or_expr ")"
//! comparison    := identifier comparator literal
//! missing_check := identifier "IS" "NOT"? "MISSING"
//! membership    := identifier "IN" "(" literal ("," literal)* ")"
//! ```

use super::ast::{Expr, Literal, Operand};
use super::lexer::{tokenize, Token, TokenKind};
use super::PredicateError;

/// Deepest parenthesised group the parser accepts.
pub const MAX_NESTING: usize = 64;

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, PredicateError> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            pos: 0,
            depth: 0,
        })
    }

    pub fn parse(mut self) -> Result<Expr, PredicateError> {
        if self.tokens.is_empty() {
            return Err(self.error_at(0, "empty predicate"));
        }
        let expr = self.or_expr()?;
        if let Some(tok) = self.peek() {
            return Err(self.error_at(
                tok.offset,
                format!("unexpected {} after complete expression", tok.kind.describe()),
            ));
        }
        Ok(expr)
    }

    // Chains are collected flat so long AND/OR lists never deepen the tree.
    fn or_expr(&mut self) -> Result<Expr, PredicateError> {
        let mut children = vec![self.and_expr()?];
        while self.eat(&TokenKind::Or) {
            children.push(self.and_expr()?);
        }
        Ok(collapse(children, Expr::Or))
    }

    fn and_expr(&mut self) -> Result<Expr, PredicateError> {
        let mut children = vec![self.term()?];
        while self.eat(&TokenKind::And) {
            children.push(self.term()?);
        }
        Ok(collapse(children, Expr::And))
    }

    fn term(&mut self) -> Result<Expr, PredicateError> {
        if self.eat(&TokenKind::Not) {
            return Ok(Expr::Not(Box::new(self.atom()?)));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, PredicateError> {
        let tok = self.next("an identifier or '('")?;
        match tok.kind {
            TokenKind::LParen => {
                if self.depth == MAX_NESTING {
                    return Err(self.error_at(
                        tok.offset,
                        format!("parentheses nested deeper than {} levels", MAX_NESTING),
                    ));
                }
                self.depth += 1;
                let inner = self.or_expr()?;
                self.expect(&TokenKind::RParen, "')'")?;
                self.depth -= 1;
                Ok(inner)
            }
            TokenKind::Ident(name) => self.after_identifier(Operand::from_ident(&name)),
            other => Err(self.error_at(
                tok.offset,
                format!("expected an identifier or '(', found {}", other.describe()),
            )),
        }
    }

    fn after_identifier(&mut self, operand: Operand) -> Result<Expr, PredicateError> {
        let tok = self.next("a comparator, 'IS' or 'IN'")?;
        match tok.kind {
            TokenKind::Comparator(op) => {
                let literal = self.literal()?;
                Ok(Expr::Compare {
                    operand,
                    op,
                    literal,
                })
            }
            TokenKind::Is => {
                let negated = self.eat(&TokenKind::Not);
                self.expect(&TokenKind::Missing, "'MISSING'")?;
                Ok(Expr::MissingCheck { operand, negated })
            }
            TokenKind::In => {
                self.expect(&TokenKind::LParen, "'('")?;
                let mut literals = vec![self.literal()?];
                while self.eat(&TokenKind::Comma) {
                    literals.push(self.literal()?);
                }
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(Expr::In { operand, literals })
            }
            other => Err(self.error_at(
                tok.offset,
                format!(
                    "expected a comparator, 'IS' or 'IN' after '{}', found {}",
                    operand.name(),
                    other.describe()
                ),
            )),
        }
    }

    fn literal(&mut self) -> Result<Literal, PredicateError> {
        let tok = self.next("a literal")?;
        match tok.kind {
            TokenKind::Number(n) => Ok(Literal::Number(n)),
            TokenKind::Str(s) => Ok(Literal::Text(s)),
            other => Err(self.error_at(
                tok.offset,
                format!("expected a quoted string or number, found {}", other.describe()),
            )),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self, expected: &str) -> Result<Token, PredicateError> {
        match self.tokens.get(self.pos).cloned() {
            Some(tok) => {
                self.pos += 1;
                Ok(tok)
            }
            None => Err(self.error_at(
                self.source.len(),
                format!("expected {}, found end of predicate", expected),
            )),
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|t| &t.kind == kind).unwrap_or(false) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<(), PredicateError> {
        let tok = self.next(expected)?;
        if &tok.kind == kind {
            Ok(())
        } else {
            Err(self.error_at(
                tok.offset,
                format!("expected {}, found {}", expected, tok.kind.describe()),
            ))
        }
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> PredicateError {
        PredicateError::Syntax {
            predicate: self.source.to_string(),
            offset,
            message: message.into(),
        }
    }
}

fn collapse(mut children: Vec<Expr>, node: fn(Vec<Expr>) -> Expr) -> Expr {
    if children.len() == 1 {
        children.remove(0)
    } else {
        node(children)
    }
}

/// Parse a predicate string into an expression tree.
pub fn parse(source: &str) -> Result<Expr, PredicateError> {
    Parser::new(source)?.parse()
}
