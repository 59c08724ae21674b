//! Audit aggregation over a screened dataset.
//!
//! Every table is derived from the materialized annotation columns and the
//! rule table alone. Predicates are never re-evaluated, and neither input is
//! modified.

mod annotations;
pub mod evidence;
mod flow;
mod overlap;
mod registry;
mod summary;
mod warnings;

use serde::Serialize;
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::ScreeningError;
use crate::rules::RuleTable;

use annotations::Annotations;

pub use annotations::ScreeningCounts;
pub use evidence::{Artifact, Evidence};
pub use flow::{FlowKind, FlowStep, FLAG_NOTE, POOL_DESCRIPTION};
pub use overlap::OverlapRow;
pub use registry::{Decision, DecisionSource};
pub use summary::{ExclusionReason, SummaryLine};
pub use warnings::{Severity, Warning};

/// Every audit table for one screening run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub counts: ScreeningCounts,
    pub flow: Vec<FlowStep>,
    pub by_reason: Vec<ExclusionReason>,
    pub overlap: Vec<OverlapRow>,
    pub summary: Vec<SummaryLine>,
    pub warnings: Vec<Warning>,
    pub registry: Vec<Decision>,
}

/// Derive the full audit report.
///
/// # Arguments
///
/// * `screened` - Output of [`crate::engine::apply`] for `rules`
/// * `rules` - The rule table that produced `screened`
///
/// # Returns
///
/// An [`AuditReport`], or `NotScreened` when an annotation column is absent.
pub fn audit(screened: &Dataset, rules: &RuleTable) -> Result<AuditReport, ScreeningError> {
    let ann = Annotations::read(screened, rules)?;
    let counts = ScreeningCounts::from_annotations(&ann);
    debug!(?counts, "Aggregating audit tables");

    Ok(AuditReport {
        counts,
        flow: flow::build(&ann, rules),
        by_reason: summary::by_reason(&ann, rules),
        overlap: overlap::build(&ann, rules),
        summary: summary::build(&counts, rules),
        warnings: warnings::build(&counts, rules),
        registry: registry::build(&counts, rules),
    })
}

/// CONSORT-style flow table.
pub fn consort_flow(screened: &Dataset, rules: &RuleTable) -> Result<Vec<FlowStep>, ScreeningError> {
    Ok(flow::build(&Annotations::read(screened, rules)?, rules))
}

/// Excluded-row counts per exclusion rule.
pub fn consort_by_reason(
    screened: &Dataset,
    rules: &RuleTable,
) -> Result<Vec<ExclusionReason>, ScreeningError> {
    Ok(summary::by_reason(&Annotations::read(screened, rules)?, rules))
}

/// Pairwise overlap between exclude/flag rules.
pub fn screening_overlap(
    screened: &Dataset,
    rules: &RuleTable,
) -> Result<Vec<OverlapRow>, ScreeningError> {
    Ok(overlap::build(&Annotations::read(screened, rules)?, rules))
}

pub fn screening_summary(
    screened: &Dataset,
    rules: &RuleTable,
) -> Result<Vec<SummaryLine>, ScreeningError> {
    let counts = ScreeningCounts::from_annotations(&Annotations::read(screened, rules)?);
    Ok(summary::build(&counts, rules))
}

pub fn screening_warnings(
    screened: &Dataset,
    rules: &RuleTable,
) -> Result<Vec<Warning>, ScreeningError> {
    let counts = ScreeningCounts::from_annotations(&Annotations::read(screened, rules)?);
    Ok(warnings::build(&counts, rules))
}

pub fn decision_registry(
    screened: &Dataset,
    rules: &RuleTable,
) -> Result<Vec<Decision>, ScreeningError> {
    let counts = ScreeningCounts::from_annotations(&Annotations::read(screened, rules)?);
    Ok(registry::build(&counts, rules))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Column, Value};
    use crate::engine::apply;
    use crate::rules::tests::rule;
    use crate::rules::{Action, Rule, PRETEST};

    fn data() -> Dataset {
        // row: 1     2     3     4     5     6
        // age: 30    NA    16    40    22    50
        // atn: 3     3     1     1     3     NA
        Dataset::from_columns(vec![
            Column::new(
                "age",
                vec![
                    Value::from(30.0),
                    Value::Missing,
                    Value::from(16.0),
                    Value::from(40.0),
                    Value::from(22.0),
                    Value::from(50.0),
                ],
            ),
            Column::new(
                "attn",
                vec![
                    Value::from(3.0),
                    Value::from(3.0),
                    Value::from(1.0),
                    Value::from(1.0),
                    Value::from(3.0),
                    Value::Missing,
                ],
            ),
        ])
        .unwrap()
    }

    fn rules() -> RuleTable {
        let mut pretest: Rule = rule("pre", Action::Partition, 1, "row_number IN (1)");
        pretest.assign_value = Some(PRETEST.to_string());
        RuleTable::from_rules(vec![
            pretest,
            rule("has_age", Action::Exclude, 1, "age IS NOT MISSING"),
            rule("adult", Action::Exclude, 2, "age >= 18"),
            rule("attn", Action::Flag, 3, "attn IN (3)"),
        ])
        .unwrap()
    }

    fn report() -> AuditReport {
        let rules = rules();
        audit(&apply(&data(), &rules).unwrap(), &rules).unwrap()
    }

    #[test]
    fn test_counts() {
        let counts = report().counts;
        assert_eq!(counts.n_rows, 6);
        assert_eq!(counts.n_pretest, 1);
        assert_eq!(counts.n_main, 5);
        // row 2 (missing age), row 3 (minor)
        assert_eq!(counts.n_excluded, 2);
        // rows 3, 4, 6 fail the attention check
        assert_eq!(counts.n_flagged, 3);
        // row 3 is excluded; rows 4 and 6 remain
        assert_eq!(counts.n_flagged_in_pool, 2);
        // rows 4, 5, 6
        assert_eq!(counts.n_pool, 3);
    }

    #[test]
    fn test_flow() {
        let flow = report().flow;
        let shape: Vec<(FlowKind, &str, usize, usize)> = flow
            .iter()
            .map(|s| (s.kind, s.rule_id.as_str(), s.n_affected, s.n_remaining))
            .collect();
        assert_eq!(
            shape,
            vec![
                (FlowKind::Start, "", 6, 6),
                (FlowKind::Exclusion, "has_age", 1, 5),
                (FlowKind::Exclusion, "adult", 1, 4),
                (FlowKind::Flag, "attn", 3, 4),
                (FlowKind::Note, "", 0, 4),
                (FlowKind::Pool, "", 3, 3),
            ]
        );
        assert_eq!(flow[4].description, FLAG_NOTE);
        assert_eq!(
            flow.iter().map(|s| s.step).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5, 6]
        );
    }

    #[test]
    fn test_by_reason_sums_to_total() {
        let report = report();
        let total: usize = report.by_reason.iter().map(|r| r.n_excluded).sum();
        assert_eq!(total, report.counts.n_excluded);
        assert_eq!(report.by_reason[0].rule_id, "has_age");
    }

    #[test]
    fn test_overlap_pairs() {
        let overlap = report().overlap;
        // Three filter rules, three unordered pairs; partition rules never pair.
        assert_eq!(overlap.len(), 3);
        let exclusions = &overlap[0];
        assert_eq!((exclusions.rule_a.as_str(), exclusions.rule_b.as_str()), ("has_age", "adult"));
        assert_eq!(exclusions.n_both, 0);
        let adult_attn = &overlap[2];
        assert_eq!((adult_attn.rule_a.as_str(), adult_attn.rule_b.as_str()), ("adult", "attn"));
        assert_eq!((adult_attn.n_a, adult_attn.n_b, adult_attn.n_both), (1, 3, 1));
    }

    #[test]
    fn test_summary_phrasing() {
        let summary = report().summary;
        let pool = summary.iter().find(|l| l.key == "pool_main").unwrap();
        assert_eq!(pool.to_string(), "Analysis-eligible pool (declared rules): 3");
        for line in &summary {
            let label = line.label.to_lowercase();
            assert!(!label.contains("final sample"));
            assert!(!label.contains("clean"));
            assert!(!label.contains("valid"));
        }
    }

    #[test]
    fn test_warnings() {
        let ids: Vec<&str> = report().warnings.iter().map(|w| w.id).collect();
        assert_eq!(ids, vec!["flagged_in_pool", "exclusions_applied"]);
        let exclusions = &report().warnings[1].evidence;
        assert_eq!(exclusions.artifact, Artifact::ConsortFlow);
        assert_eq!(exclusions.pointer, "kind=exclusion");

        let empty = RuleTable::empty();
        let screened = apply(&data(), &empty).unwrap();
        let warnings = screening_warnings(&screened, &empty).unwrap();
        let ids: Vec<&str> = warnings.iter().map(|w| w.id).collect();
        assert_eq!(ids, vec!["no_partitioning_declared", "no_rules_declared"]);
        assert_eq!(warnings[0].severity, Severity::Warn);
        assert_eq!(warnings[0].evidence.artifact, Artifact::ScreeningRules);
    }

    #[test]
    fn test_registry() {
        let registry = report().registry;
        let lookup = |key: &str| registry.iter().find(|d| d.decision == key).unwrap();
        assert_eq!(registry.len(), 9);
        assert!(lookup("pretest_partition_declared").value);
        assert_eq!(lookup("pretest_partition_declared").source, DecisionSource::Spec);
        assert!(!lookup("pilot_partition_declared").value);
        assert_eq!(lookup("pilot_partition_declared").source, DecisionSource::NotDeclared);
        assert_eq!(lookup("flags_present_in_pool").source, DecisionSource::Observed);
        assert_eq!(lookup("exclusions_applied").note, "2 row(s) excluded");
    }

    #[test]
    fn test_unscreened_dataset_rejected() {
        match audit(&data(), &rules()) {
            Err(ScreeningError::NotScreened(column)) => assert_eq!(column, "flag_attn"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_audit_does_not_modify_inputs() {
        let rules = rules();
        let screened = apply(&data(), &rules).unwrap();
        let before = screened.clone();
        audit(&screened, &rules).unwrap();
        assert_eq!(screened, before);
    }
}
