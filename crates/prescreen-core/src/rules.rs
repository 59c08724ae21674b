//! Rule and rule-table types.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ScreeningError;

/// Partition labels a rule may assign.
pub const PRETEST: &str = "pretest";
pub const PILOT: &str = "pilot";
pub const MAIN: &str = "main";

/// Reporting classification of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Partition,
    Eligibility,
    Quality,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Partition => "partition",
            Category::Eligibility => "eligibility",
            Category::Quality => "quality",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "partition" => Some(Category::Partition),
            "eligibility" => Some(Category::Eligibility),
            "quality" => Some(Category::Quality),
            _ => None,
        }
    }
}

/// Execution semantics of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Rows matching the predicate take `assign_value` if still unassigned
    Partition,
    /// Rows failing the predicate are excluded (first exclusion wins)
    Exclude,
    /// Rows failing the predicate get `flag_<rule_id> = true`
    Flag,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Partition => "partition",
            Action::Exclude => "exclude",
            Action::Flag => "flag",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "partition" => Some(Action::Partition),
            "exclude" => Some(Action::Exclude),
            "flag" => Some(Action::Flag),
            _ => None,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Action::Partition => Phase::Partition,
            Action::Exclude | Action::Flag => Phase::Filter,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application phase. Partition rules always run before filter rules,
/// whatever their numeric `order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Partition,
    Filter,
}

/// A single compiled screening rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Stable identifier (e.g., "partition_pretest_01")
    pub rule_id: String,

    pub category: Category,

    /// Reviewer-facing explanation
    pub description: String,

    /// Comma-joined column names the predicate references (advisory)
    pub fields_used: String,

    pub predicate: String,

    pub action: Action,

    /// Application order within the rule's phase
    pub order: i64,

    /// Partition label; present only for partition rules
    #[serde(default)]
    pub assign_value: Option<String>,
}

impl Rule {
    pub fn phase(&self) -> Phase {
        self.action.phase()
    }

    /// Name of the annotation column a flag rule writes.
    pub fn flag_column(&self) -> String {
        flag_column(&self.rule_id)
    }
}

/// Prefix of every flag annotation column.
pub const FLAG_PREFIX: &str = "flag_";

pub fn flag_column(rule_id: &str) -> String {
    format!("{}{}", FLAG_PREFIX, rule_id)
}

/// An ordered, immutable table of rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table, checking ids are non-empty and unique and that
    /// partition rules carry a label.
    pub fn from_rules(rules: Vec<Rule>) -> Result<Self, ScreeningError> {
        let mut seen = HashSet::new();
        for (idx, rule) in rules.iter().enumerate() {
            if rule.rule_id.trim().is_empty() {
                return Err(ScreeningError::EmptyField {
                    row: idx + 1,
                    field: "rule_id".to_string(),
                });
            }
            if !seen.insert(rule.rule_id.as_str()) {
                return Err(ScreeningError::DuplicateRuleId(rule.rule_id.clone()));
            }
            if rule.action == Action::Partition && rule.assign_value.is_none() {
                return Err(ScreeningError::MissingAssignValue(rule.rule_id.clone()));
            }
        }
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn get(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.rule_id == rule_id)
    }

    /// Rules sorted by `(phase, order)`; ties keep table order.
    pub fn in_application_order(&self) -> Vec<&Rule> {
        let mut ordered: Vec<&Rule> = self.rules.iter().collect();
        ordered.sort_by_key(|r| (r.phase(), r.order));
        ordered
    }

    /// Rules with the given action, in application order.
    pub fn with_action(&self, action: Action) -> Vec<&Rule> {
        self.in_application_order()
            .into_iter()
            .filter(|r| r.action == action)
            .collect()
    }

    pub fn has_category(&self, category: Category) -> bool {
        self.rules.iter().any(|r| r.category == category)
    }

    /// True when some partition rule assigns `label`.
    pub fn declares_partition(&self, label: &str) -> bool {
        self.rules
            .iter()
            .any(|r| r.action == Action::Partition && r.assign_value.as_deref() == Some(label))
    }
}

impl<'a> IntoIterator for &'a RuleTable {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
