//! Decision registry: what the researcher declared, and what was observed.

use serde::Serialize;

use super::annotations::ScreeningCounts;
use crate::rules::{Action, Category, RuleTable, PILOT, PRETEST};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Declared in the screening configuration
    Spec,
    NotDeclared,
    /// Derived from the screened data
    Observed,
}

impl DecisionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionSource::Spec => "spec",
            DecisionSource::NotDeclared => "not_declared",
            DecisionSource::Observed => "observed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub decision: &'static str,
    pub value: bool,
    pub source: DecisionSource,
    pub note: String,
}

fn declared(decision: &'static str, value: bool, note: String) -> Decision {
    Decision {
        decision,
        value,
        source: if value {
            DecisionSource::Spec
        } else {
            DecisionSource::NotDeclared
        },
        note,
    }
}

fn observed(decision: &'static str, count: usize, note: String) -> Decision {
    Decision {
        decision,
        value: count > 0,
        source: DecisionSource::Observed,
        note,
    }
}

fn rules_note(n: usize) -> String {
    format!("{} rule(s)", n)
}

pub(crate) fn build(counts: &ScreeningCounts, rules: &RuleTable) -> Vec<Decision> {
    let count_category = |c: Category| rules.iter().filter(|r| r.category == c).count();
    let n_exclusion_rules = rules.with_action(Action::Exclude).len();

    vec![
        declared(
            "pretest_partition_declared",
            rules.declares_partition(PRETEST),
            format!("{} row(s) in pretest", counts.n_pretest),
        ),
        declared(
            "pilot_partition_declared",
            rules.declares_partition(PILOT),
            format!("{} row(s) in pilot", counts.n_pilot),
        ),
        declared(
            "eligibility_declared",
            rules.has_category(Category::Eligibility),
            rules_note(count_category(Category::Eligibility)),
        ),
        declared(
            "quality_rules_declared",
            rules.has_category(Category::Quality),
            rules_note(count_category(Category::Quality)),
        ),
        declared(
            "exclusions_declared",
            n_exclusion_rules > 0,
            rules_note(n_exclusion_rules),
        ),
        observed(
            "exclusions_applied",
            counts.n_excluded,
            format!("{} row(s) excluded", counts.n_excluded),
        ),
        observed(
            "flags_present",
            counts.n_flagged,
            format!("{} row(s) flagged", counts.n_flagged),
        ),
        observed(
            "flags_present_in_pool",
            counts.n_flagged_in_pool,
            format!("{} flagged row(s) in pool", counts.n_flagged_in_pool),
        ),
        declared(
            "pool_definition_declared",
            !rules.is_empty(),
            format!("{} row(s) in analysis-eligible pool", counts.n_pool),
        ),
    ]
}
