//! Evidence pointers for audit statements.
//!
//! Every warning must be substantiated by a location in one of the written
//! artifacts, so a reviewer can check the fact without re-running anything.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An artifact produced by a screening run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    ScreenedData,
    ScreeningRules,
    ConsortFlow,
    ConsortByReason,
    ScreeningOverlap,
    ScreeningSummary,
    ScreeningWarnings,
    DecisionRegistry,
}

impl Artifact {
    /// Every artifact, in write order.
    pub const ALL: [Artifact; 8] = [
        Artifact::ScreenedData,
        Artifact::ScreeningRules,
        Artifact::ConsortFlow,
        Artifact::ConsortByReason,
        Artifact::ScreeningOverlap,
        Artifact::ScreeningSummary,
        Artifact::ScreeningWarnings,
        Artifact::DecisionRegistry,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Artifact::ScreenedData => "screened_data.csv",
            Artifact::ScreeningRules => "screening_rules.csv",
            Artifact::ConsortFlow => "consort_flow.csv",
            Artifact::ConsortByReason => "consort_by_reason.csv",
            Artifact::ScreeningOverlap => "screening_overlap.csv",
            Artifact::ScreeningSummary => "screening_summary.txt",
            Artifact::ScreeningWarnings => "screening_warnings.csv",
            Artifact::DecisionRegistry => "decision_registry.csv",
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A fact together with where it can be checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// What this evidence supports
    pub claim: String,

    pub artifact: Artifact,

    /// Location inside the artifact (e.g., "key=rows_excluded")
    pub pointer: String,
}

impl Evidence {
    /// Evidence from a summary line.
    pub fn from_summary(claim: impl Into<String>, key: &str) -> Self {
        Self {
            claim: claim.into(),
            artifact: Artifact::ScreeningSummary,
            pointer: format!("key={}", key),
        }
    }

    /// Evidence from the rule table, selecting rules by a column value.
    pub fn from_rules(claim: impl Into<String>, column: &str, value: &str) -> Self {
        Self {
            claim: claim.into(),
            artifact: Artifact::ScreeningRules,
            pointer: format!("{}={}", column, value),
        }
    }

    /// Evidence from the flow table, selecting steps by kind.
    pub fn from_flow(claim: impl Into<String>, kind: &str) -> Self {
        Self {
            claim: claim.into(),
            artifact: Artifact::ConsortFlow,
            pointer: format!("kind={}", kind),
        }
    }

    /// Evidence from a column of the screened data.
    pub fn from_data(claim: impl Into<String>, column: &str) -> Self {
        Self {
            claim: claim.into(),
            artifact: Artifact::ScreenedData,
            pointer: format!("column={}", column),
        }
    }
}
