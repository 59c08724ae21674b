//! Restricted predicate language.
//!
//! Predicates are plain strings so they can live in preregistered,
//! version-controlled configuration. They are checked in two passes:
//! a case-insensitive denylist of host-language escape hatches, then a full
//! parse against the grammar in [`parser`]. Evaluation walks the parsed tree
//! directly; nothing is ever handed to an interpreter.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod patterns;

use thiserror::Error;

use crate::dataset::Dataset;

pub use ast::{Comparator, Expr, Literal, Operand, ROW_NUMBER};
pub use eval::{Evaluator, TemporalResolution};
pub use parser::parse;

/// Errors from validating or evaluating a predicate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredicateError {
    #[error("Invalid predicate: disallowed pattern '{pattern}' in \"{predicate}\"")]
    InvalidPredicate { pattern: String, predicate: String },

    #[error("Syntax error at offset {offset} in \"{predicate}\": {message}")]
    Syntax {
        predicate: String,
        offset: usize,
        message: String,
    },

    #[error("Failed to evaluate \"{predicate}\": {cause}")]
    Evaluation {
        predicate: String,
        #[source]
        cause: EvalCause,
    },
}

/// Underlying cause of an evaluation failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalCause {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("type mismatch on '{column}': {message}")]
    TypeMismatch { column: String, message: String },
}

/// Reject predicates containing banned patterns or falling outside the grammar.
///
/// Returns nothing on success.
pub fn validate(predicate: &str) -> Result<(), PredicateError> {
    if let Some(pattern) = patterns::find_banned(predicate) {
        return Err(PredicateError::InvalidPredicate {
            pattern,
            predicate: predicate.to_string(),
        });
    }
    parse(predicate).map(|_| ())
}

/// Evaluate a predicate to one boolean per dataset row.
pub fn evaluate(predicate: &str, dataset: &Dataset) -> Result<Vec<bool>, PredicateError> {
    let expr = parse(predicate)?;
    Evaluator::new(dataset, &expr)
        .eval(&expr)
        .map_err(|cause| PredicateError::Evaluation {
            predicate: predicate.to_string(),
            cause,
        })
}

/// Comma-joined identifiers a predicate references.
pub fn fields_used(predicate: &str) -> Result<String, PredicateError> {
    Ok(parse(predicate)?.identifiers().join(","))
}
