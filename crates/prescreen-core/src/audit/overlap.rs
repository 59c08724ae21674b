//! Pairwise overlap between filter rules.

use serde::Serialize;

use super::annotations::Annotations;
use crate::rules::{Action, RuleTable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlapRow {
    pub rule_a: String,
    pub action_a: Action,
    pub rule_b: String,
    pub action_b: Action,
    pub n_a: usize,
    pub n_b: usize,
    pub n_both: usize,
}

/// Count rows touched by both rules of every unordered pair of exclude/flag
/// rules, in application order.
///
/// Two exclusion rules never share a row (first exclusion wins), so a
/// non-zero `n_both` always involves a flag.
pub(crate) fn build(ann: &Annotations, rules: &RuleTable) -> Vec<OverlapRow> {
    let members: Vec<_> = rules
        .in_application_order()
        .into_iter()
        .filter(|r| r.action != Action::Partition)
        .map(|r| (r, ann.affected_by(r)))
        .collect();

    let mut rows = Vec::new();
    for (i, (a, in_a)) in members.iter().enumerate() {
        for (b, in_b) in &members[i + 1..] {
            rows.push(OverlapRow {
                rule_a: a.rule_id.clone(),
                action_a: a.action,
                rule_b: b.rule_id.clone(),
                action_b: b.action,
                n_a: count(in_a),
                n_b: count(in_b),
                n_both: in_a.iter().zip(in_b).filter(|(x, y)| **x && **y).count(),
            });
        }
    }
    rows
}

fn count(mask: &[bool]) -> usize {
    mask.iter().filter(|&&m| m).count()
}
