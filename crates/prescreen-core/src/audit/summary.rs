//! Summary lines and exclusion counts by reason.
//!
//! Labels are fact-only. The pool is always "analysis-eligible pool
//! (declared rules)", never a final or clean sample.

use std::fmt;

use serde::Serialize;

use super::annotations::{Annotations, ScreeningCounts};
use super::flow::POOL_DESCRIPTION;
use crate::rules::{Action, RuleTable, PILOT, PRETEST};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryLine {
    /// Stable key, also used as an evidence pointer
    pub key: &'static str,
    pub label: String,
    pub value: String,
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExclusionReason {
    pub rule_id: String,
    pub description: String,
    pub n_excluded: usize,
}

fn yes_no(b: bool) -> String {
    if b { "yes" } else { "no" }.to_string()
}

pub(crate) fn build(counts: &ScreeningCounts, rules: &RuleTable) -> Vec<SummaryLine> {
    let line = |key: &'static str, label: &str, value: String| SummaryLine {
        key,
        label: label.to_string(),
        value,
    };

    let pretest_declared = rules.declares_partition(PRETEST);
    let pilot_declared = rules.declares_partition(PILOT);

    vec![
        line("rows_screened", "Rows screened", counts.n_rows.to_string()),
        line(
            "partitioning_declared",
            "Partitioning declared",
            yes_no(!rules.with_action(Action::Partition).is_empty()),
        ),
        line("pretest_declared", "Pretest partition declared", yes_no(pretest_declared)),
        line("pretest_rows", "Rows in pretest partition", counts.n_pretest.to_string()),
        line("pilot_declared", "Pilot partition declared", yes_no(pilot_declared)),
        line("pilot_rows", "Rows in pilot partition", counts.n_pilot.to_string()),
        line("main_rows", "Rows in main partition", counts.n_main.to_string()),
        line("rows_excluded", "Rows excluded", counts.n_excluded.to_string()),
        line(
            "rows_flagged",
            "Rows with at least one flag",
            counts.n_flagged.to_string(),
        ),
        line(
            "flagged_in_pool",
            "Flagged rows in analysis-eligible pool",
            counts.n_flagged_in_pool.to_string(),
        ),
        line("pool_main", POOL_DESCRIPTION, counts.n_pool.to_string()),
    ]
}

/// One row per exclusion rule, in application order.
pub(crate) fn by_reason(ann: &Annotations, rules: &RuleTable) -> Vec<ExclusionReason> {
    rules
        .with_action(Action::Exclude)
        .into_iter()
        .map(|rule| ExclusionReason {
            rule_id: rule.rule_id.clone(),
            description: rule.description.clone(),
            n_excluded: ann.excluded_by.iter().filter(|by| *by == &rule.rule_id).count(),
        })
        .collect()
}
