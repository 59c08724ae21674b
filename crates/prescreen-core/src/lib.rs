//! # prescreen-core
//!
//! Deterministic, auditable data-screening engine.
//!
//! This crate turns a declarative screening configuration into an explicit
//! rule table, applies it to a tabular dataset, and reports what happened:
//! - Which rows belong to the pretest, pilot and main partitions?
//! - Which rows were excluded, and by which rule?
//! - Which rows were flagged but remain in the analysis-eligible pool?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same configuration and data always produce the same output
//! 2. **Restricted predicates**: Rule predicates are parsed against a small
//!    grammar and walked directly; nothing is ever interpreted
//! 3. **Traceable**: Every excluded row names exactly one rule
//! 4. **Non-destructive**: Input columns are never modified; rows are only
//!    removed by an explicit [`drop_excluded`] call
//!
//! ## Example
//!
//! ```rust,ignore
//! use prescreen_core::{screen, Dataset, ScreeningConfig};
//!
//! let config = ScreeningConfig::from_yaml_file("screening.yaml")?;
//! let data = Dataset::from_path("responses.csv")?;
//! let outcome = screen(Some(&config), &data)?;
//!
//! for line in &outcome.report.summary {
//!     println!("{}", line);
//! }
//! ```

pub mod audit;
pub mod compiler;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod export;
pub mod predicate;
pub mod rules;

// Re-export main types at crate root
pub use audit::{audit, AuditReport, Evidence, ScreeningCounts, Severity, Warning};
pub use compiler::compile;
pub use config::{ConfigError, ScreeningConfig};
pub use dataset::{Column, ColumnLabels, Dataset, DatasetError, Value};
pub use engine::{apply, drop_excluded};
pub use error::ScreeningError;
pub use export::{ArtifactWriter, ExportError, Manifest};
pub use predicate::{evaluate, validate, PredicateError};
pub use rules::{Action, Category, Phase, Rule, RuleTable};

/// Everything one screening run produces.
#[derive(Debug, Clone)]
pub struct ScreeningOutcome {
    pub rules: RuleTable,
    /// Input columns plus annotations; no rows removed
    pub screened: Dataset,
    pub report: AuditReport,
}

/// Compile, apply and audit in one call.
///
/// This is the main entry point for a screening run.
///
/// # Arguments
///
/// * `config` - Screening configuration; `None` screens with no rules
/// * `dataset` - The data to screen (borrowed, never modified)
///
/// # Returns
///
/// A [`ScreeningOutcome`] containing:
/// - `rules`: The compiled rule table
/// - `screened`: The annotated copy of `dataset`
/// - `report`: Flow, overlap, summary, warnings and decision registry
pub fn screen(
    config: Option<&ScreeningConfig>,
    dataset: &Dataset,
) -> Result<ScreeningOutcome, ScreeningError> {
    let rules = compile(config, dataset)?;
    let screened = apply(dataset, &rules)?;
    let report = audit(&screened, &rules)?;
    Ok(ScreeningOutcome {
        rules,
        screened,
        report,
    })
}
