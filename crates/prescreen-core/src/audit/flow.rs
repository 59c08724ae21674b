//! CONSORT-style participant flow.

use serde::Serialize;

use super::annotations::Annotations;
use crate::rules::{Action, RuleTable};

pub const FLAG_NOTE: &str =
    "Flags mark rows without removing them; flagged rows remain in n_remaining";
pub const POOL_DESCRIPTION: &str = "Analysis-eligible pool (declared rules)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    Start,
    Exclusion,
    Flag,
    Note,
    Pool,
}

impl FlowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::Start => "start",
            FlowKind::Exclusion => "exclusion",
            FlowKind::Flag => "flag",
            FlowKind::Note => "note",
            FlowKind::Pool => "pool",
        }
    }
}

/// One line of the flow table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowStep {
    /// 1-based position in the flow
    pub step: usize,
    pub kind: FlowKind,
    /// Empty for start, note and pool steps
    pub rule_id: String,
    pub description: String,
    pub n_affected: usize,
    pub n_remaining: usize,
}

/// Build the flow: start, one step per filter rule in application order,
/// the flag note, then the pool.
///
/// Exclusion steps decrement `n_remaining`; flag steps never do.
pub(crate) fn build(ann: &Annotations, rules: &RuleTable) -> Vec<FlowStep> {
    let mut steps = Vec::new();
    let mut remaining = ann.n_rows();

    let mut push = |kind: FlowKind, rule_id: &str, description: &str, affected: usize, remaining: usize| {
        steps.push(FlowStep {
            step: steps.len() + 1,
            kind,
            rule_id: rule_id.to_string(),
            description: description.to_string(),
            n_affected: affected,
            n_remaining: remaining,
        });
    };

    push(FlowKind::Start, "", "Rows screened", remaining, remaining);

    for rule in rules.in_application_order() {
        let affected = ann.affected_by(rule).iter().filter(|&&a| a).count();
        match rule.action {
            Action::Partition => {}
            Action::Exclude => {
                remaining = remaining.saturating_sub(affected);
                push(FlowKind::Exclusion, &rule.rule_id, &rule.description, affected, remaining);
            }
            Action::Flag => {
                push(FlowKind::Flag, &rule.rule_id, &rule.description, affected, remaining);
            }
        }
    }

    push(FlowKind::Note, "", FLAG_NOTE, 0, remaining);

    let pool = ann.pool_main.iter().filter(|&&p| p).count();
    push(FlowKind::Pool, "", POOL_DESCRIPTION, pool, pool);

    steps
}
