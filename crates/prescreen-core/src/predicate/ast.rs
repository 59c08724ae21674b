//! Predicate syntax tree.

use std::fmt;

use super::patterns::{is_date_literal, is_datetime_literal};

/// Name of the positional pseudo-column.
pub const ROW_NUMBER: &str = "row_number";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
    Ne,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
        }
    }

    /// Whether the comparator needs an ordering rather than equality.
    pub fn is_ordering(&self) -> bool {
        !matches!(self, Comparator::Eq | Comparator::Ne)
    }

    pub fn holds(&self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Comparator::Ge => ord != Less,
            Comparator::Le => ord != Greater,
            Comparator::Gt => ord == Greater,
            Comparator::Lt => ord == Less,
            Comparator::Eq => ord == Equal,
            Comparator::Ne => ord != Equal,
        }
    }
}

/// Left-hand side of every atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    RowNumber,
    Column(String),
}

impl Operand {
    pub fn from_ident(ident: &str) -> Self {
        if ident == ROW_NUMBER {
            Operand::RowNumber
        } else {
            Operand::Column(ident.to_string())
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Operand::RowNumber => ROW_NUMBER,
            Operand::Column(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl Literal {
    pub fn is_datetime(&self) -> bool {
        matches!(self, Literal::Text(s) if is_datetime_literal(s))
    }

    pub fn is_date(&self) -> bool {
        matches!(self, Literal::Text(s) if is_date_literal(s))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => f.write_str(&crate::dataset::format_number(*n)),
            Literal::Text(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Two or more alternatives, left to right
    Or(Vec<Expr>),
    /// Two or more conjuncts, left to right
    And(Vec<Expr>),
    Not(Box<Expr>),
    Compare {
        operand: Operand,
        op: Comparator,
        literal: Literal,
    },
    MissingCheck {
        operand: Operand,
        negated: bool,
    },
    In {
        operand: Operand,
        literals: Vec<Literal>,
    },
}

impl Expr {
    /// Identifiers referenced, in first-appearance order without repeats.
    pub fn identifiers(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.visit(&mut |e| {
            let operand = match e {
                Expr::Compare { operand, .. }
                | Expr::MissingCheck { operand, .. }
                | Expr::In { operand, .. } => operand,
                _ => return,
            };
            if !out.iter().any(|n: &String| n == operand.name()) {
                out.push(operand.name().to_string());
            }
        });
        out
    }

    /// All literals in the tree.
    pub fn literals(&self) -> Vec<&Literal> {
        let mut out = Vec::new();
        self.collect_literals(&mut out);
        out
    }

    fn collect_literals<'a>(&'a self, out: &mut Vec<&'a Literal>) {
        match self {
            Expr::Or(children) | Expr::And(children) => {
                for child in children {
                    child.collect_literals(out);
                }
            }
            Expr::Not(inner) => inner.collect_literals(out),
            Expr::Compare { literal, .. } => out.push(literal),
            Expr::In { literals, .. } => out.extend(literals.iter()),
            Expr::MissingCheck { .. } => {}
        }
    }

    fn visit(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Or(children) | Expr::And(children) => {
                for child in children {
                    child.visit(f);
                }
            }
            Expr::Not(inner) => inner.visit(f),
            _ => {}
        }
    }
}
