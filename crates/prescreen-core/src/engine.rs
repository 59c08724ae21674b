//! Screening engine: applies a rule table to a dataset.
//!
//! Precedence is fixed and non-configurable:
//! 1. Partition rules run first; the first matching rule labels a row
//! 2. Exclude rules mark rows failing their predicate; the first one wins
//! 3. Flag rules mark failures in their own column and never remove rows
//!
//! Rules only see the caller's columns, never another rule's annotations
//! beyond the "not already claimed" guards.

use tracing::{debug, info};

use crate::dataset::{Column, Dataset, Value};
use crate::error::ScreeningError;
use crate::predicate;
use crate::rules::{Action, RuleTable, FLAG_PREFIX, MAIN, PILOT, PRETEST};

pub const PARTITION_COLUMN: &str = "partition";
pub const EXCLUDED_COLUMN: &str = "excluded";
pub const EXCLUDED_BY_COLUMN: &str = "excluded_by";
pub const POOL_MAIN_COLUMN: &str = "pool_main";
pub const POOL_NOTE_COLUMN: &str = "pool_note";

/// Annotation columns every screened dataset carries (flag columns aside).
pub const ANNOTATION_COLUMNS: [&str; 5] = [
    PARTITION_COLUMN,
    EXCLUDED_COLUMN,
    EXCLUDED_BY_COLUMN,
    POOL_MAIN_COLUMN,
    POOL_NOTE_COLUMN,
];

pub const NO_RULES_NOTE: &str = "No screening rules applied";

/// Per-row screening state while rules are applied.
struct ScreeningState {
    /// `None` until a partition rule claims the row
    partition: Vec<Option<String>>,
    excluded_by: Vec<Option<String>>,
    flags: Vec<Column>,
}

impl ScreeningState {
    fn new(n_rows: usize) -> Self {
        Self {
            partition: vec![None; n_rows],
            excluded_by: vec![None; n_rows],
            flags: Vec::new(),
        }
    }

    fn assign_partition(&mut self, matches: &[bool], label: &str) -> usize {
        let mut assigned = 0;
        for (slot, &hit) in self.partition.iter_mut().zip(matches) {
            if hit && slot.is_none() {
                *slot = Some(label.to_string());
                assigned += 1;
            }
        }
        assigned
    }

    fn exclude_failures(&mut self, matches: &[bool], rule_id: &str) -> usize {
        let mut excluded = 0;
        for (slot, &hit) in self.excluded_by.iter_mut().zip(matches) {
            if !hit && slot.is_none() {
                *slot = Some(rule_id.to_string());
                excluded += 1;
            }
        }
        excluded
    }

    fn flag_failures(&mut self, matches: &[bool], column: String) -> usize {
        let values: Vec<Value> = matches.iter().map(|&hit| Value::Bool(!hit)).collect();
        let flagged = matches.iter().filter(|&&hit| !hit).count();
        self.flags.push(Column::new(column, values));
        flagged
    }

    /// Materialize annotation columns onto `dataset`.
    fn write_into(self, dataset: &mut Dataset) -> Result<(), ScreeningError> {
        let partition: Vec<String> = self
            .partition
            .into_iter()
            .map(|p| p.unwrap_or_else(|| MAIN.to_string()))
            .collect();

        let (pool_main, pool_note): (Vec<Value>, Vec<Value>) = partition
            .iter()
            .zip(&self.excluded_by)
            .map(|(label, excluded_by)| {
                let (in_pool, note) = pool_status(label, excluded_by.as_deref());
                (Value::Bool(in_pool), Value::text(note))
            })
            .unzip();

        dataset.push_column(Column::new(
            PARTITION_COLUMN,
            partition.into_iter().map(Value::Text).collect(),
        ))?;
        dataset.push_column(Column::new(
            EXCLUDED_COLUMN,
            self.excluded_by
                .iter()
                .map(|e| Value::Bool(e.is_some()))
                .collect(),
        ))?;
        dataset.push_column(Column::new(
            EXCLUDED_BY_COLUMN,
            self.excluded_by
                .into_iter()
                .map(|e| Value::Text(e.unwrap_or_default()))
                .collect(),
        ))?;
        for flag in self.flags {
            dataset.push_column(flag)?;
        }
        dataset.push_column(Column::new(POOL_MAIN_COLUMN, pool_main))?;
        dataset.push_column(Column::new(POOL_NOTE_COLUMN, pool_note))?;
        Ok(())
    }
}

/// Pool membership and note for one row. Exclusion overrides the partition.
fn pool_status(partition: &str, excluded_by: Option<&str>) -> (bool, String) {
    if let Some(rule_id) = excluded_by {
        return (false, format!("Excluded by: {}", rule_id));
    }
    let in_pool = partition != PRETEST;
    (in_pool, format!("Declared partition: {}", partition))
}

/// Drop stale annotations so a re-run never merges with prior state.
fn strip_annotations(dataset: &mut Dataset, rules: &RuleTable) {
    let flag_columns = rules
        .with_action(Action::Flag)
        .into_iter()
        .map(|r| r.flag_column());
    let mut stale: Vec<String> = ANNOTATION_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(flag_columns)
        .collect();

    // An earlier run's flag columns follow its partition column.
    let columns = dataset.columns();
    if let Some(start) = columns.iter().position(|c| c.name == PARTITION_COLUMN) {
        stale.extend(
            columns[start..]
                .iter()
                .filter(|c| c.name.starts_with(FLAG_PREFIX))
                .map(|c| c.name.clone()),
        );
    }

    for name in stale {
        if dataset.remove_column(&name).is_some() {
            debug!(column = %name, "Removed stale annotation column");
        }
    }
}

/// Apply a rule table, returning an annotated copy of `dataset`.
///
/// Existing columns are never modified; annotation columns are appended.
/// Fails with [`ScreeningError::EmptyDataset`] when there are no rows and
/// with [`ScreeningError::Predicate`] when a predicate cannot be evaluated.
pub fn apply(dataset: &Dataset, rules: &RuleTable) -> Result<Dataset, ScreeningError> {
    let n_rows = dataset.n_rows();
    if n_rows == 0 {
        return Err(ScreeningError::EmptyDataset);
    }

    let mut screened = dataset.clone();
    strip_annotations(&mut screened, rules);

    if rules.is_empty() {
        info!(rows = n_rows, "No screening rules; every row enters the main pool");
        let notes = vec![Value::text(NO_RULES_NOTE); n_rows];
        screened.push_column(Column::new(
            PARTITION_COLUMN,
            vec![Value::text(MAIN); n_rows],
        ))?;
        screened.push_column(Column::new(EXCLUDED_COLUMN, vec![Value::Bool(false); n_rows]))?;
        screened.push_column(Column::new(EXCLUDED_BY_COLUMN, vec![Value::text(""); n_rows]))?;
        screened.push_column(Column::new(POOL_MAIN_COLUMN, vec![Value::Bool(true); n_rows]))?;
        screened.push_column(Column::new(POOL_NOTE_COLUMN, notes))?;
        return Ok(screened);
    }

    let mut state = ScreeningState::new(n_rows);
    for rule in rules.in_application_order() {
        let matches = predicate::evaluate(&rule.predicate, &screened)?;

        let affected = match rule.action {
            Action::Partition => {
                let label = rule
                    .assign_value
                    .as_deref()
                    .ok_or_else(|| ScreeningError::MissingAssignValue(rule.rule_id.clone()))?;
                state.assign_partition(&matches, label)
            }
            Action::Exclude => state.exclude_failures(&matches, &rule.rule_id),
            Action::Flag => state.flag_failures(&matches, rule.flag_column()),
        };

        debug!(
            rule_id = %rule.rule_id,
            action = %rule.action,
            order = rule.order,
            affected,
            "Applied rule"
        );
    }

    let n_pretest = count_label(&state.partition, PRETEST);
    let n_pilot = count_label(&state.partition, PILOT);
    let n_excluded = state.excluded_by.iter().filter(|e| e.is_some()).count();

    state.write_into(&mut screened)?;

    info!(
        rows = n_rows,
        rules = rules.len(),
        pretest = n_pretest,
        pilot = n_pilot,
        excluded = n_excluded,
        "Screening applied"
    );
    Ok(screened)
}

fn count_label(partition: &[Option<String>], label: &str) -> usize {
    partition
        .iter()
        .filter(|p| p.as_deref() == Some(label))
        .count()
}

/// A copy of a screened dataset without its excluded rows.
///
/// Annotation columns are kept so the remaining rows stay traceable.
pub fn drop_excluded(screened: &Dataset) -> Result<Dataset, ScreeningError> {
    let excluded = screened
        .values(EXCLUDED_COLUMN)
        .ok_or_else(|| ScreeningError::NotScreened(EXCLUDED_COLUMN.to_string()))?;

    let keep: Vec<bool> = excluded.iter().map(|v| v.as_bool() != Some(true)).collect();
    let removed = keep.iter().filter(|&&k| !k).count();
    let kept = screened.filter_rows(&keep);

    info!(
        removed,
        remaining = kept.n_rows(),
        "Dropped excluded rows"
    );
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tests::rule;
    use crate::rules::Rule;

    fn column(ds: &Dataset, name: &str) -> Vec<String> {
        ds.values(name)
            .unwrap()
            .iter()
            .map(|v| v.to_string())
            .collect()
    }

    fn bools(ds: &Dataset, name: &str) -> Vec<bool> {
        ds.values(name)
            .unwrap()
            .iter()
            .map(|v| v.as_bool().unwrap())
            .collect()
    }

    fn partition_rule(id: &str, order: i64, predicate: &str, label: &str) -> Rule {
        let mut r = rule(id, Action::Partition, order, predicate);
        r.assign_value = Some(label.to_string());
        r
    }

    fn survey() -> Dataset {
        Dataset::from_columns(vec![
            Column::new(
                "StartDate",
                vec![
                    Value::text("2024-01-02"),
                    Value::text("2024-01-10"),
                    Value::text("2024-01-20"),
                    Value::text("2024-01-25"),
                    Value::text("2024-02-01"),
                ],
            ),
            Column::new(
                "age",
                vec![
                    Value::from(25.0),
                    Value::Missing,
                    Value::from(40.0),
                    Value::from(17.0),
                    Value::from(33.0),
                ],
            ),
            Column::new(
                "attn",
                vec![
                    Value::from(3.0),
                    Value::from(3.0),
                    Value::from(1.0),
                    Value::from(3.0),
                    Value::Missing,
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let result = apply(&Dataset::new(), &RuleTable::empty());
        assert!(matches!(result, Err(ScreeningError::EmptyDataset)));
    }

    #[test]
    fn test_no_rules_puts_everyone_in_main_pool() {
        let screened = apply(&survey(), &RuleTable::empty()).unwrap();
        assert_eq!(column(&screened, PARTITION_COLUMN), vec!["main"; 5]);
        assert_eq!(bools(&screened, POOL_MAIN_COLUMN), vec![true; 5]);
        assert_eq!(bools(&screened, EXCLUDED_COLUMN), vec![false; 5]);
        assert_eq!(column(&screened, POOL_NOTE_COLUMN), vec![NO_RULES_NOTE; 5]);
    }

    #[test]
    fn test_partition_first_wins_on_overlap() {
        let rules = RuleTable::from_rules(vec![
            partition_rule(
                "partition_pretest_01",
                1,
                "StartDate >= '2024-01-01' AND StartDate <= '2024-01-15'",
                PRETEST,
            ),
            partition_rule(
                "partition_pilot_01",
                2,
                "StartDate >= '2024-01-10' AND StartDate <= '2024-01-20'",
                PILOT,
            ),
        ])
        .unwrap();
        let screened = apply(&survey(), &rules).unwrap();
        assert_eq!(
            column(&screened, PARTITION_COLUMN),
            vec!["pretest", "pretest", "pilot", "main", "main"]
        );
        assert_eq!(
            bools(&screened, POOL_MAIN_COLUMN),
            vec![false, false, true, true, true]
        );
        assert_eq!(
            column(&screened, POOL_NOTE_COLUMN)[0],
            "Declared partition: pretest"
        );
    }

    #[test]
    fn test_partitions_run_before_filters_regardless_of_order() {
        let rules = RuleTable::from_rules(vec![
            rule("adult", Action::Exclude, 1, "age >= 18"),
            partition_rule("late", 99, "row_number >= 4", PILOT),
        ])
        .unwrap();
        let screened = apply(&survey(), &rules).unwrap();
        assert_eq!(
            column(&screened, PARTITION_COLUMN),
            vec!["main", "main", "main", "pilot", "pilot"]
        );
    }

    #[test]
    fn test_exclusion_single_attribution() {
        let rules = RuleTable::from_rules(vec![
            rule("has_age", Action::Exclude, 1, "age IS NOT MISSING"),
            rule("adult", Action::Exclude, 2, "age >= 18"),
        ])
        .unwrap();
        let screened = apply(&survey(), &rules).unwrap();
        // Row 2 fails both (missing age fails the comparison); the first rule claims it.
        assert_eq!(
            column(&screened, EXCLUDED_BY_COLUMN),
            vec!["", "has_age", "", "adult", ""]
        );
        assert_eq!(
            bools(&screened, EXCLUDED_COLUMN),
            vec![false, true, false, true, false]
        );
        assert_eq!(
            column(&screened, POOL_NOTE_COLUMN)[3],
            "Excluded by: adult"
        );
    }

    #[test]
    fn test_flags_never_remove_rows() {
        let rules =
            RuleTable::from_rules(vec![rule("attn", Action::Flag, 1, "attn IN (3)")]).unwrap();
        let screened = apply(&survey(), &rules).unwrap();
        assert_eq!(
            bools(&screened, "flag_attn"),
            vec![false, false, true, false, true]
        );
        assert_eq!(bools(&screened, EXCLUDED_COLUMN), vec![false; 5]);
        assert_eq!(bools(&screened, POOL_MAIN_COLUMN), vec![true; 5]);
    }

    #[test]
    fn test_pool_invariant() {
        let rules = RuleTable::from_rules(vec![
            partition_rule("pre", 1, "row_number <= 2", PRETEST),
            rule("adult", Action::Exclude, 2, "age >= 18"),
            rule("attn", Action::Flag, 3, "attn IN (3)"),
        ])
        .unwrap();
        let screened = apply(&survey(), &rules).unwrap();
        let partition = column(&screened, PARTITION_COLUMN);
        let excluded = bools(&screened, EXCLUDED_COLUMN);
        let pool = bools(&screened, POOL_MAIN_COLUMN);
        for i in 0..screened.n_rows() {
            assert_eq!(!pool[i], partition[i] == PRETEST || excluded[i], "row {}", i + 1);
        }
    }

    #[test]
    fn test_existing_columns_untouched() {
        let data = survey();
        let rules =
            RuleTable::from_rules(vec![rule("adult", Action::Exclude, 1, "age >= 18")]).unwrap();
        let screened = apply(&data, &rules).unwrap();
        for col in data.columns() {
            assert_eq!(screened.column(&col.name), Some(col));
        }
        assert_eq!(screened.n_cols(), data.n_cols() + ANNOTATION_COLUMNS.len());
    }

    #[test]
    fn test_rerun_replaces_stale_annotations() {
        let rules =
            RuleTable::from_rules(vec![rule("adult", Action::Exclude, 1, "age >= 18")]).unwrap();
        let once = apply(&survey(), &rules).unwrap();
        let twice = apply(&once, &rules).unwrap();
        assert_eq!(once, twice);

        let relaxed = apply(&once, &RuleTable::empty()).unwrap();
        assert_eq!(bools(&relaxed, EXCLUDED_COLUMN), vec![false; 5]);
    }

    #[test]
    fn test_rerun_drops_flags_of_other_tables() {
        let mut data = survey();
        data.push_column(Column::new("flag_source", vec![Value::text("web"); 5]))
            .unwrap();
        let rules =
            RuleTable::from_rules(vec![rule("attn", Action::Flag, 1, "attn IN (3)")]).unwrap();
        let once = apply(&data, &rules).unwrap();
        assert!(once.has_column("flag_attn"));

        let rerun = apply(&once, &RuleTable::empty()).unwrap();
        let names: Vec<&str> = rerun.column_names().collect();
        assert_eq!(
            names,
            vec![
                "age",
                "attn",
                "flag_source",
                PARTITION_COLUMN,
                EXCLUDED_COLUMN,
                EXCLUDED_BY_COLUMN,
                POOL_MAIN_COLUMN,
                POOL_NOTE_COLUMN,
            ]
        );
        assert_eq!(rerun, apply(&data, &RuleTable::empty()).unwrap());
    }

    #[test]
    fn test_apply_is_deterministic() {
        let rules = RuleTable::from_rules(vec![
            partition_rule("pre", 1, "row_number <= 2", PRETEST),
            rule("attn", Action::Flag, 2, "attn IN (3)"),
        ])
        .unwrap();
        assert_eq!(
            apply(&survey(), &rules).unwrap(),
            apply(&survey(), &rules).unwrap()
        );
    }

    #[test]
    fn test_evaluation_error_propagates() {
        let rules =
            RuleTable::from_rules(vec![rule("w", Action::Exclude, 1, "weight > 3")]).unwrap();
        assert!(matches!(
            apply(&survey(), &rules),
            Err(ScreeningError::Predicate(_))
        ));
    }

    #[test]
    fn test_drop_excluded() {
        let rules =
            RuleTable::from_rules(vec![rule("adult", Action::Exclude, 1, "age >= 18")]).unwrap();
        let screened = apply(&survey(), &rules).unwrap();
        let kept = drop_excluded(&screened).unwrap();
        assert_eq!(kept.n_rows(), 3);
        assert_eq!(bools(&kept, EXCLUDED_COLUMN), vec![false; 3]);
        // The screened input is left as is.
        assert_eq!(screened.n_rows(), 5);
    }

    #[test]
    fn test_drop_excluded_requires_annotations() {
        assert!(matches!(
            drop_excluded(&survey()),
            Err(ScreeningError::NotScreened(_))
        ));
    }
}
