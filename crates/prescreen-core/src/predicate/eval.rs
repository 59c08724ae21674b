//! Tree-walking evaluator over dataset columns.
//!
//! Every atom yields one boolean per row. A comparison or membership test on a
//! missing cell is `false`; `NOT` negates that `false` like any other.

use std::borrow::Cow;

use chrono::NaiveDateTime;

use crate::dataset::{format_number, Column, Dataset, Value};

use super::ast::{Comparator, Expr, Literal, Operand};
use super::patterns::{is_temporal_literal, parse_temporal};
use super::EvalCause;

/// Resolution at which temporal literals are compared within one predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalResolution {
    Date,
    DateTime,
}

impl TemporalResolution {
    /// Date-time wins when any temporal literal in the predicate carries a time.
    pub fn for_expr(expr: &Expr) -> Option<Self> {
        let literals = expr.literals();
        if literals.iter().any(|l| l.is_datetime()) {
            Some(TemporalResolution::DateTime)
        } else if literals.iter().any(|l| l.is_date()) {
            Some(TemporalResolution::Date)
        } else {
            None
        }
    }

    fn normalize(&self, dt: NaiveDateTime) -> NaiveDateTime {
        match self {
            TemporalResolution::DateTime => dt,
            TemporalResolution::Date => dt.date().and_time(chrono::NaiveTime::MIN),
        }
    }
}

/// A literal after typing against the predicate's temporal resolution.
#[derive(Debug, Clone, PartialEq)]
enum Typed {
    Number(f64),
    Text(String),
    Temporal(NaiveDateTime),
}

enum Source<'a> {
    RowNumber,
    Column(&'a Column),
}

impl<'a> Source<'a> {
    fn value(&self, row: usize) -> Cow<'a, Value> {
        match self {
            Source::RowNumber => Cow::Owned(Value::Number((row + 1) as f64)),
            Source::Column(col) => Cow::Borrowed(&col.values[row]),
        }
    }
}

pub struct Evaluator<'a> {
    dataset: &'a Dataset,
    resolution: Option<TemporalResolution>,
}

impl<'a> Evaluator<'a> {
    pub fn new(dataset: &'a Dataset, expr: &Expr) -> Self {
        Self {
            dataset,
            resolution: TemporalResolution::for_expr(expr),
        }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Vec<bool>, EvalCause> {
        match expr {
            Expr::Or(children) => self.fold(children, |acc, hit| *acc |= hit),
            Expr::And(children) => self.fold(children, |acc, hit| *acc &= hit),
            Expr::Not(inner) => Ok(self.eval(inner)?.into_iter().map(|b| !b).collect()),
            Expr::MissingCheck { operand, negated } => {
                let source = self.source(operand)?;
                Ok((0..self.dataset.n_rows())
                    .map(|row| source.value(row).is_missing() != *negated)
                    .collect())
            }
            Expr::Compare {
                operand,
                op,
                literal,
            } => {
                let source = self.source(operand)?;
                let typed = self.type_literal(literal);
                if op.is_ordering() {
                    if let Typed::Text(text) = &typed {
                        return Err(EvalCause::TypeMismatch {
                            column: operand.name().to_string(),
                            message: format!(
                                "ordering comparison '{}' needs a numeric or date literal, got '{}'",
                                op.as_str(),
                                text
                            ),
                        });
                    }
                }
                (0..self.dataset.n_rows())
                    .map(|row| self.compare(&source.value(row), *op, &typed, operand, row))
                    .collect()
            }
            Expr::In { operand, literals } => {
                let source = self.source(operand)?;
                let typed: Vec<Typed> = literals.iter().map(|l| self.type_literal(l)).collect();
                (0..self.dataset.n_rows())
                    .map(|row| {
                        let cell = source.value(row);
                        for lit in &typed {
                            if self.compare(&cell, Comparator::Eq, lit, operand, row)? {
                                return Ok(true);
                            }
                        }
                        Ok(false)
                    })
                    .collect()
            }
        }
    }

    /// Combine children left to right into one mask.
    fn fold(
        &self,
        children: &[Expr],
        combine: impl Fn(&mut bool, bool),
    ) -> Result<Vec<bool>, EvalCause> {
        let mut children = children.iter();
        let mut mask = match children.next() {
            Some(first) => self.eval(first)?,
            None => return Ok(vec![false; self.dataset.n_rows()]),
        };
        for child in children {
            let hits = self.eval(child)?;
            for (acc, hit) in mask.iter_mut().zip(hits) {
                combine(acc, hit);
            }
        }
        Ok(mask)
    }

    fn source(&self, operand: &Operand) -> Result<Source<'a>, EvalCause> {
        match operand {
            Operand::RowNumber => Ok(Source::RowNumber),
            Operand::Column(name) => self
                .dataset
                .column(name)
                .map(Source::Column)
                .ok_or_else(|| EvalCause::UnknownColumn(name.clone())),
        }
    }

    fn type_literal(&self, literal: &Literal) -> Typed {
        match (literal, self.resolution) {
            (Literal::Number(n), _) => Typed::Number(*n),
            (Literal::Text(s), Some(res)) if is_temporal_literal(s) => match parse_temporal(s) {
                Some(dt) => Typed::Temporal(res.normalize(dt)),
                // Shaped like a date but not a real one (e.g. month 13): compare as text.
                None => Typed::Text(s.clone()),
            },
            (Literal::Text(s), _) => Typed::Text(s.clone()),
        }
    }

    fn cell_temporal(&self, cell: &Value) -> Option<NaiveDateTime> {
        let res = self.resolution?;
        let dt = match cell {
            Value::Date(d) => d.and_time(chrono::NaiveTime::MIN),
            Value::DateTime(dt) => *dt,
            Value::Text(s) => parse_temporal(s)?,
            _ => return None,
        };
        Some(res.normalize(dt))
    }

    fn compare(
        &self,
        cell: &Value,
        op: Comparator,
        literal: &Typed,
        operand: &Operand,
        row: usize,
    ) -> Result<bool, EvalCause> {
        if cell.is_missing() {
            return Ok(false);
        }
        match literal {
            Typed::Temporal(lit) => match self.cell_temporal(cell) {
                Some(dt) => Ok(op.holds(dt.cmp(lit))),
                None => Err(mismatch(
                    operand,
                    row,
                    format!("value '{}' is not a date or date-time", cell),
                )),
            },
            Typed::Number(lit) => {
                let number = match cell {
                    Value::Number(n) => Some(*n),
                    Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                    Value::Text(s) => s.trim().parse::<f64>().ok(),
                    Value::Date(_) | Value::DateTime(_) => {
                        return Err(mismatch(
                            operand,
                            row,
                            format!("cannot compare date value '{}' with a number", cell),
                        ))
                    }
                    Value::Missing => None,
                };
                match number {
                    Some(n) => Ok(n.partial_cmp(lit).map(|o| op.holds(o)).unwrap_or(false)),
                    None if op.is_ordering() => Err(mismatch(
                        operand,
                        row,
                        format!("value '{}' is not numeric", cell),
                    )),
                    None => Ok(op == Comparator::Ne),
                }
            }
            Typed::Text(lit) => {
                let text = match cell {
                    Value::Number(n) => format_number(*n),
                    other => other.to_string(),
                };
                let equal = text == *lit;
                // Ordering on plain text is rejected before row evaluation.
                Ok(match op {
                    Comparator::Eq => equal,
                    Comparator::Ne => !equal,
                    _ => false,
                })
            }
        }
    }
}

fn mismatch(operand: &Operand, row: usize, message: String) -> EvalCause {
    EvalCause::TypeMismatch {
        column: operand.name().to_string(),
        message: format!("row {}: {}", row + 1, message),
    }
}
