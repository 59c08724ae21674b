//! Error taxonomy for compilation and screening.
//!
//! Every error is raised where it is detected and returned unchanged. Valid
//! input with a notable outcome is reported through audit warnings instead.

use thiserror::Error;

use crate::config::ConfigError;
use crate::dataset::DatasetError;
use crate::predicate::PredicateError;

#[derive(Error, Debug)]
pub enum ScreeningError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Predicate(#[from] PredicateError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Cannot screen an empty dataset (0 rows)")]
    EmptyDataset,

    #[error("Rule row {row}: field '{field}' must not be empty")]
    EmptyField { row: usize, field: String },

    #[error("Rule table is missing required columns: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("Rule '{rule_id}' has unknown action '{action}' (expected partition, exclude or flag)")]
    UnknownAction { rule_id: String, action: String },

    #[error("Duplicate rule ID: {0}")]
    DuplicateRuleId(String),

    #[error("Partition rule '{0}' has no assign_value")]
    MissingAssignValue(String),

    #[error("Dataset has not been screened: annotation column '{0}' is absent")]
    NotScreened(String),
}
