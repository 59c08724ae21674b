//! Fact-only warnings about valid but notable screening outcomes.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use super::annotations::ScreeningCounts;
use super::evidence::Evidence;
use super::flow::FlowKind;
use crate::engine::POOL_MAIN_COLUMN;
use crate::rules::{Action, RuleTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Warn,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warn => "WARN",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub id: &'static str,
    pub severity: Severity,
    /// `claim` is the warning message
    pub evidence: Evidence,
}

impl Warning {
    fn new(id: &'static str, severity: Severity, evidence: Evidence) -> Self {
        match severity {
            Severity::Warn => warn!(id, message = %evidence.claim, "Screening warning"),
            Severity::Info => info!(id, message = %evidence.claim, "Screening note"),
        }
        Self {
            id,
            severity,
            evidence,
        }
    }

    pub fn message(&self) -> &str {
        &self.evidence.claim
    }
}

/// Warnings in a fixed order: WARN entries first, then INFO.
pub(crate) fn build(counts: &ScreeningCounts, rules: &RuleTable) -> Vec<Warning> {
    let mut warnings = Vec::new();

    if rules.with_action(Action::Partition).is_empty() {
        warnings.push(Warning::new(
            "no_partitioning_declared",
            Severity::Warn,
            Evidence::from_rules(
                "No partitioning declared; pretest and pilot rows, if any, are in the main partition",
                "action",
                Action::Partition.as_str(),
            ),
        ));
    }

    if counts.n_flagged_in_pool > 0 {
        warnings.push(Warning::new(
            "flagged_in_pool",
            Severity::Warn,
            Evidence::from_summary(
                format!(
                    "{} flagged row(s) remain in the analysis-eligible pool",
                    counts.n_flagged_in_pool
                ),
                "flagged_in_pool",
            ),
        ));
    }

    if counts.n_excluded > 0 {
        warnings.push(Warning::new(
            "exclusions_applied",
            Severity::Info,
            Evidence::from_flow(
                format!("{} row(s) excluded by declared rules", counts.n_excluded),
                FlowKind::Exclusion.as_str(),
            ),
        ));
    }

    if rules.is_empty() {
        warnings.push(Warning::new(
            "no_rules_declared",
            Severity::Info,
            Evidence::from_data(
                "No screening rules declared; every row is in the analysis-eligible pool",
                POOL_MAIN_COLUMN,
            ),
        ));
    }

    warnings
}
