//! Read-only view over the annotation columns of a screened dataset.

use std::collections::HashMap;

use serde::Serialize;

use crate::dataset::{Dataset, Value};
use crate::engine::{EXCLUDED_BY_COLUMN, EXCLUDED_COLUMN, PARTITION_COLUMN, POOL_MAIN_COLUMN};
use crate::error::ScreeningError;
use crate::rules::{Action, Rule, RuleTable, MAIN, PILOT, PRETEST};

/// Annotation columns decoded once per audit.
#[derive(Debug)]
pub(crate) struct Annotations {
    pub partition: Vec<String>,
    pub excluded: Vec<bool>,
    pub excluded_by: Vec<String>,
    pub pool_main: Vec<bool>,
    /// Flag columns keyed by rule id
    flags: HashMap<String, Vec<bool>>,
}

impl Annotations {
    /// Decode the annotations `rules` would have written.
    ///
    /// Fails with `NotScreened` naming the first absent column.
    pub fn read(screened: &Dataset, rules: &RuleTable) -> Result<Self, ScreeningError> {
        let mut flags = HashMap::new();
        for rule in rules.with_action(Action::Flag) {
            let values = required(screened, &rule.flag_column())?;
            flags.insert(rule.rule_id.clone(), values.iter().map(is_true).collect());
        }

        Ok(Self {
            partition: required(screened, PARTITION_COLUMN)?
                .iter()
                .map(cell_text)
                .collect(),
            excluded: required(screened, EXCLUDED_COLUMN)?
                .iter()
                .map(is_true)
                .collect(),
            excluded_by: required(screened, EXCLUDED_BY_COLUMN)?
                .iter()
                .map(cell_text)
                .collect(),
            pool_main: required(screened, POOL_MAIN_COLUMN)?
                .iter()
                .map(is_true)
                .collect(),
            flags,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.partition.len()
    }

    /// Rows a filter rule touched: excluded by it, or flagged by it.
    ///
    /// Partition rules touch nothing in this sense.
    pub fn affected_by(&self, rule: &Rule) -> Vec<bool> {
        match rule.action {
            Action::Exclude => self
                .excluded_by
                .iter()
                .map(|by| by == &rule.rule_id)
                .collect(),
            Action::Flag => self
                .flags
                .get(&rule.rule_id)
                .cloned()
                .unwrap_or_else(|| vec![false; self.n_rows()]),
            Action::Partition => vec![false; self.n_rows()],
        }
    }

    /// True for rows carrying at least one flag.
    pub fn flagged_any(&self) -> Vec<bool> {
        let mut any = vec![false; self.n_rows()];
        for column in self.flags.values() {
            for (slot, &flag) in any.iter_mut().zip(column) {
                *slot |= flag;
            }
        }
        any
    }

    pub fn count_partition(&self, label: &str) -> usize {
        self.partition.iter().filter(|p| *p == label).count()
    }
}

fn required<'a>(screened: &'a Dataset, column: &str) -> Result<&'a [Value], ScreeningError> {
    screened
        .values(column)
        .ok_or_else(|| ScreeningError::NotScreened(column.to_string()))
}

fn is_true(value: &Value) -> bool {
    value.as_bool() == Some(true)
}

fn cell_text(value: &Value) -> String {
    value.to_string()
}

/// Headline counts shared by the summary, warnings and registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScreeningCounts {
    pub n_rows: usize,
    pub n_pretest: usize,
    pub n_pilot: usize,
    pub n_main: usize,
    pub n_excluded: usize,
    pub n_flagged: usize,
    pub n_flagged_in_pool: usize,
    pub n_pool: usize,
}

impl ScreeningCounts {
    pub(crate) fn from_annotations(ann: &Annotations) -> Self {
        let flagged = ann.flagged_any();
        Self {
            n_rows: ann.n_rows(),
            n_pretest: ann.count_partition(PRETEST),
            n_pilot: ann.count_partition(PILOT),
            n_main: ann.count_partition(MAIN),
            n_excluded: ann.excluded.iter().filter(|&&e| e).count(),
            n_flagged: flagged.iter().filter(|&&f| f).count(),
            n_flagged_in_pool: flagged
                .iter()
                .zip(&ann.pool_main)
                .filter(|(f, p)| **f && **p)
                .count(),
            n_pool: ann.pool_main.iter().filter(|&&p| p).count(),
        }
    }
}
