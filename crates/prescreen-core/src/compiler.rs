//! Rule compiler: configuration → ordered rule table.
//!
//! Simple mode synthesizes predicate strings from declarative sections in a
//! fixed category sequence (partitioning, eligibility, quality flags) with one
//! order counter running across all of them. Expert mode takes an explicit
//! rule table and checks it. Either way every predicate passes the validator
//! before it enters the table.

use tracing::{debug, info};

use crate::config::{
    AttentionCheck, ConfigError, Eligibility, ExpertModeConfig, PartitionSpec, Partitioning,
    QualityFlags, RuleRow, Scalar, ScreeningConfig, SimpleModeConfig,
};
use crate::dataset::Dataset;
use crate::error::ScreeningError;
use crate::predicate::patterns::{is_temporal_literal, parse_temporal};
use crate::predicate::{self, Literal, ROW_NUMBER};
use crate::rules::{Action, Category, Rule, RuleTable, MAIN, PILOT, PRETEST};

/// Columns an expert-mode rule table must provide.
pub const REQUIRED_RULE_COLUMNS: [&str; 5] =
    ["rule_id", "category", "description", "predicate", "action"];

/// Compile a configuration against a dataset.
///
/// `None` or an empty configuration yields an empty table.
pub fn compile(
    config: Option<&ScreeningConfig>,
    dataset: &Dataset,
) -> Result<RuleTable, ScreeningError> {
    let Some(config) = config.filter(|c| !c.is_empty()) else {
        info!("No screening configuration declared; rule table is empty");
        return Ok(RuleTable::empty());
    };

    let (table, mode) = match config {
        ScreeningConfig::Simple(simple) => (compile_simple(simple, dataset)?, "simple"),
        ScreeningConfig::Expert(expert) => (compile_expert(expert)?, "expert"),
    };

    info!(rules = table.len(), mode, "Compiled screening rules");
    Ok(table)
}

/// Accumulates rules and hands out strictly increasing `order` values.
struct RuleBuilder {
    rules: Vec<Rule>,
    next_order: i64,
}

impl RuleBuilder {
    fn new() -> Self {
        Self {
            rules: Vec::new(),
            next_order: 1,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        rule_id: String,
        category: Category,
        description: String,
        fields_used: String,
        predicate: String,
        action: Action,
        assign_value: Option<String>,
    ) -> Result<(), ScreeningError> {
        predicate::validate(&predicate)?;
        debug!(rule_id = %rule_id, order = self.next_order, predicate = %predicate, "Generated rule");
        self.rules.push(Rule {
            rule_id,
            category,
            description,
            fields_used,
            predicate,
            action,
            order: self.next_order,
            assign_value,
        });
        self.next_order += 1;
        Ok(())
    }

    fn finish(self) -> Result<RuleTable, ScreeningError> {
        RuleTable::from_rules(self.rules)
    }
}

fn compile_simple(
    config: &SimpleModeConfig,
    dataset: &Dataset,
) -> Result<RuleTable, ScreeningError> {
    let mut builder = RuleBuilder::new();
    if let Some(partitioning) = &config.partitioning {
        compile_partitioning(partitioning, dataset, &mut builder)?;
    }
    if let Some(eligibility) = &config.eligibility {
        compile_eligibility(eligibility, dataset, &mut builder)?;
    }
    if let Some(quality) = &config.quality_flags {
        compile_quality_flags(quality, dataset, &mut builder)?;
    }
    builder.finish()
}

// =========================================================================
// PARTITIONING
// =========================================================================

fn compile_partitioning(
    partitioning: &Partitioning,
    dataset: &Dataset,
    builder: &mut RuleBuilder,
) -> Result<(), ScreeningError> {
    for (name, section) in [(PRETEST, &partitioning.pretest), (PILOT, &partitioning.pilot)] {
        let Some(section) = section else { continue };
        let path = format!("partitioning.{}", name);

        let by = section
            .by
            .as_deref()
            .ok_or_else(|| missing(format!("{}.by", path)))?;
        let (predicate, fields_used, description) = match by {
            "date_range" => date_range_rule(name, section, &path, dataset)?,
            "ids" => id_list_rule(name, section, &path, dataset)?,
            other => {
                return Err(ConfigError::InvalidValue {
                    path: format!("{}.by", path),
                    value: other.to_string(),
                    expected: "date_range or ids".to_string(),
                }
                .into())
            }
        };

        builder.push(
            format!("partition_{}_{:02}", name, 1),
            Category::Partition,
            description,
            fields_used,
            predicate,
            Action::Partition,
            Some(name.to_string()),
        )?;
    }
    Ok(())
}

fn date_range_rule(
    name: &str,
    section: &PartitionSpec,
    path: &str,
    dataset: &Dataset,
) -> Result<(String, String, String), ScreeningError> {
    let var = section
        .date_var
        .as_deref()
        .ok_or_else(|| missing(format!("{}.date_var", path)))?;
    require_column(dataset, var, &format!("{}.date_var", path))?;

    let start = date_bound(section.start.as_deref(), &format!("{}.start", path))?;
    let end = date_bound(section.end.as_deref(), &format!("{}.end", path))?;

    Ok((
        format!("{var} >= '{start}' AND {var} <= '{end}'"),
        var.to_string(),
        format!(
            "Declared {} partition: {} from {} to {} (inclusive)",
            name, var, start, end
        ),
    ))
}

fn date_bound<'a>(value: Option<&'a str>, path: &str) -> Result<&'a str, ScreeningError> {
    let value = value.ok_or_else(|| missing(path.to_string()))?;
    if is_temporal_literal(value) && parse_temporal(value).is_some() {
        Ok(value)
    } else {
        Err(ConfigError::InvalidDateFormat {
            path: path.to_string(),
            value: value.to_string(),
        }
        .into())
    }
}

fn id_list_rule(
    name: &str,
    section: &PartitionSpec,
    path: &str,
    dataset: &Dataset,
) -> Result<(String, String, String), ScreeningError> {
    let ids_path = format!("{}.ids", path);
    let ids = match section.ids.as_deref() {
        None => return Err(missing(ids_path)),
        Some([]) => return Err(ConfigError::EmptyIdList { path: ids_path }.into()),
        Some(ids) => ids,
    };

    let (target, literals) = match section.id_var.as_deref() {
        Some(id_var) => {
            require_column(dataset, id_var, &format!("{}.id_var", path))?;
            let literals: Vec<String> = ids.iter().map(scalar_literal).collect();
            (id_var, literals)
        }
        None => {
            let literals = ids
                .iter()
                .enumerate()
                .map(|(i, id)| row_number_literal(id, &format!("{}[{}]", ids_path, i)))
                .collect::<Result<Vec<_>, _>>()?;
            (ROW_NUMBER, literals)
        }
    };

    let listed = if target == ROW_NUMBER {
        "listed row numbers".to_string()
    } else {
        format!("listed values of {}", target)
    };
    Ok((
        format!("{} IN ({})", target, literals.join(", ")),
        target.to_string(),
        format!("Declared {} partition: {} {}", name, ids.len(), listed),
    ))
}

fn row_number_literal(id: &Scalar, path: &str) -> Result<String, ScreeningError> {
    match scalar_integer(id) {
        Some(n) if n >= 1 => Ok(n.to_string()),
        _ => Err(ConfigError::InvalidValue {
            path: path.to_string(),
            value: id.to_string(),
            expected: "a positive row number".to_string(),
        }
        .into()),
    }
}

// =========================================================================
// ELIGIBILITY
// =========================================================================

fn compile_eligibility(
    eligibility: &Eligibility,
    dataset: &Dataset,
    builder: &mut RuleBuilder,
) -> Result<(), ScreeningError> {
    let vars = match eligibility.required_nonmissing.as_deref() {
        None | Some([]) => return Ok(()),
        Some(vars) => vars,
    };
    for var in vars {
        require_column(dataset, var, "eligibility.required_nonmissing")?;
    }

    let action = filter_action(
        eligibility.action.as_deref(),
        Action::Exclude,
        "eligibility.action",
    )?;
    let predicate = vars
        .iter()
        .map(|v| format!("{} IS NOT MISSING", v))
        .collect::<Vec<_>>()
        .join(" AND ");

    builder.push(
        "eligibility_required_nonmissing_01".to_string(),
        Category::Eligibility,
        format!("Required non-missing: {}", vars.join(", ")),
        vars.join(","),
        predicate,
        action,
        None,
    )
}

// =========================================================================
// QUALITY FLAGS
// =========================================================================

fn compile_quality_flags(
    quality: &QualityFlags,
    dataset: &Dataset,
    builder: &mut RuleBuilder,
) -> Result<(), ScreeningError> {
    let default_action = filter_action(
        quality.default_action.as_deref(),
        Action::Flag,
        "quality_flags.default_action",
    )?;

    let checks = quality.attention_checks.as_deref().unwrap_or(&[]);
    for (idx, check) in checks.iter().enumerate() {
        compile_attention_check(idx, check, default_action, dataset, builder)?;
    }
    Ok(())
}

fn compile_attention_check(
    idx: usize,
    check: &AttentionCheck,
    default_action: Action,
    dataset: &Dataset,
    builder: &mut RuleBuilder,
) -> Result<(), ScreeningError> {
    let path = format!("quality_flags.attention_checks[{}]", idx);

    let var = check
        .var
        .as_deref()
        .ok_or_else(|| missing(format!("{}.var", path)))?;
    let pass_values = check
        .pass_values
        .as_deref()
        .ok_or_else(|| missing(format!("{}.pass_values", path)))?;
    let description = check
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| missing(format!("{}.description", path)))?;

    if pass_values.is_empty() {
        return Err(ConfigError::InvalidValue {
            path: format!("{}.pass_values", path),
            value: "[]".to_string(),
            expected: "at least one pass value".to_string(),
        }
        .into());
    }
    require_column(dataset, var, &format!("{}.var", path))?;

    let action = filter_action(
        check.action.as_deref(),
        default_action,
        &format!("{}.action", path),
    )?;
    let values: Vec<String> = pass_values.iter().map(scalar_literal).collect();

    builder.push(
        format!("quality_attentioncheck_{}_{:02}", var, idx + 1),
        Category::Quality,
        description.to_string(),
        var.to_string(),
        format!("{} IN ({})", var, values.join(", ")),
        action,
        None,
    )
}

// =========================================================================
// EXPERT MODE
// =========================================================================

fn compile_expert(expert: &ExpertModeConfig) -> Result<RuleTable, ScreeningError> {
    let present = expert.columns();
    let missing_cols: Vec<String> = REQUIRED_RULE_COLUMNS
        .iter()
        .filter(|c| !present.contains(c))
        .map(|c| c.to_string())
        .collect();
    if !missing_cols.is_empty() {
        return Err(ScreeningError::MissingColumns {
            columns: missing_cols,
        });
    }

    let mut rules = Vec::with_capacity(expert.screening_rules.len());
    for (idx, row) in expert.screening_rules.iter().enumerate() {
        rules.push(expert_rule(idx, row)?);
    }
    RuleTable::from_rules(rules)
}

fn expert_rule(idx: usize, row: &RuleRow) -> Result<Rule, ScreeningError> {
    let row_no = idx + 1;
    let path = |field: &str| format!("screening_rules[{}].{}", idx, field);

    let rule_id = non_empty_cell(row, "rule_id", row_no)?;
    let description = non_empty_cell(row, "description", row_no)?;

    let predicate = cell_text(row, "predicate").unwrap_or_default();
    predicate::validate(&predicate)?;

    let category_name = cell_text(row, "category").unwrap_or_default();
    let category =
        Category::from_name(category_name.trim()).ok_or_else(|| ConfigError::InvalidValue {
            path: path("category"),
            value: category_name.clone(),
            expected: "partition, eligibility or quality".to_string(),
        })?;

    let action_name = cell_text(row, "action").unwrap_or_default();
    let action =
        Action::from_name(action_name.trim()).ok_or_else(|| ScreeningError::UnknownAction {
            rule_id: rule_id.clone(),
            action: action_name.clone(),
        })?;

    let fields_used = match cell_text(row, "fields_used").filter(|f| !f.trim().is_empty()) {
        Some(fields) => fields,
        None => predicate::fields_used(&predicate)?,
    };

    let order = match row.get("order").cloned().flatten() {
        None => row_no as i64,
        Some(value) => scalar_integer(&value).ok_or_else(|| ConfigError::InvalidValue {
            path: path("order"),
            value: value.to_string(),
            expected: "an integer".to_string(),
        })?,
    };

    let assign_value = match action {
        Action::Partition => {
            let label = cell_text(row, "assign_value")
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ScreeningError::MissingAssignValue(rule_id.clone()))?;
            if ![PRETEST, PILOT, MAIN].contains(&label.trim()) {
                return Err(ConfigError::InvalidValue {
                    path: path("assign_value"),
                    value: label,
                    expected: "pretest, pilot or main".to_string(),
                }
                .into());
            }
            Some(label.trim().to_string())
        }
        Action::Exclude | Action::Flag => None,
    };

    debug!(rule_id = %rule_id, order, action = %action, "Accepted expert rule");
    Ok(Rule {
        rule_id,
        category,
        description,
        fields_used,
        predicate,
        action,
        order,
        assign_value,
    })
}

fn cell_text(row: &RuleRow, key: &str) -> Option<String> {
    row.get(key).cloned().flatten().map(|s| s.to_string())
}

fn non_empty_cell(row: &RuleRow, key: &str, row_no: usize) -> Result<String, ScreeningError> {
    cell_text(row, key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ScreeningError::EmptyField {
            row: row_no,
            field: key.to_string(),
        })
}

// =========================================================================
// HELPERS
// =========================================================================

fn missing(path: String) -> ScreeningError {
    ConfigError::MissingField { path }.into()
}

fn require_column(dataset: &Dataset, column: &str, path: &str) -> Result<(), ScreeningError> {
    if dataset.has_column(column) {
        Ok(())
    } else {
        Err(ConfigError::UnknownColumn {
            path: path.to_string(),
            column: column.to_string(),
        }
        .into())
    }
}

fn scalar_integer(value: &Scalar) -> Option<i64> {
    match value {
        Scalar::Integer(n) => Some(*n),
        Scalar::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        Scalar::Text(s) => s.trim().parse::<i64>().ok(),
        Scalar::Bool(_) | Scalar::Float(_) => None,
    }
}

/// Resolve an exclude/flag action, falling back to `default`.
fn filter_action(value: Option<&str>, default: Action, path: &str) -> Result<Action, ScreeningError> {
    match value {
        None => Ok(default),
        Some(name) => match Action::from_name(name) {
            Some(action @ (Action::Exclude | Action::Flag)) => Ok(action),
            _ => Err(ConfigError::InvalidValue {
                path: path.to_string(),
                value: name.to_string(),
                expected: "exclude or flag".to_string(),
            }
            .into()),
        },
    }
}

/// Predicate literal for a configured value: numbers bare, everything else quoted.
fn scalar_literal(value: &Scalar) -> String {
    let literal = match value {
        Scalar::Integer(n) => Literal::Number(*n as f64),
        Scalar::Float(f) => Literal::Number(*f),
        Scalar::Bool(_) | Scalar::Text(_) => Literal::Text(value.to_string()),
    };
    literal.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Column, Value};

    fn dataset() -> Dataset {
        let n = 4;
        Dataset::from_columns(vec![
            Column::new("StartDate", vec![Value::text("2024-01-02"); n]),
            Column::new("age", vec![Value::from(20.0); n]),
            Column::new("consent", vec![Value::from(1.0); n]),
            Column::new("attn_check", vec![Value::from(3.0); n]),
            Column::new("colour_check", vec![Value::text("blue"); n]),
            Column::new("pid", vec![Value::text("P1"); n]),
        ])
        .unwrap()
    }

    fn compile_yaml(yaml: &str) -> Result<RuleTable, ScreeningError> {
        let config = ScreeningConfig::from_yaml(yaml).unwrap();
        compile(Some(&config), &dataset())
    }

    const FULL: &str = r#"
partitioning:
  pretest:
    by: date_range
    date_var: StartDate
    start: "2024-01-01"
    end: "2024-01-15"
  pilot:
    by: ids
    ids: [5, 6, 7]
eligibility:
  required_nonmissing: [age, consent]
quality_flags:
  attention_checks:
    - var: attn_check
      pass_values: [3]
      description: "Instructed item: select 3"
    - var: colour_check
      pass_values: ["blue", "Blue"]
      description: "Colour check"
      action: exclude
"#;

    #[test]
    fn test_none_and_empty_give_empty_table() {
        assert!(compile(None, &dataset()).unwrap().is_empty());
        assert!(compile_yaml("{}").unwrap().is_empty());
        assert!(compile_yaml("screening_rules: []").unwrap().is_empty());
    }

    #[test]
    fn test_simple_mode_generates_ordered_rules() {
        let table = compile_yaml(FULL).unwrap();
        let summary: Vec<(&str, i64, Action)> = table
            .iter()
            .map(|r| (r.rule_id.as_str(), r.order, r.action))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("partition_pretest_01", 1, Action::Partition),
                ("partition_pilot_01", 2, Action::Partition),
                ("eligibility_required_nonmissing_01", 3, Action::Exclude),
                ("quality_attentioncheck_attn_check_01", 4, Action::Flag),
                ("quality_attentioncheck_colour_check_02", 5, Action::Exclude),
            ]
        );
    }

    #[test]
    fn test_generated_predicates() {
        let table = compile_yaml(FULL).unwrap();
        let predicates: Vec<&str> = table.iter().map(|r| r.predicate.as_str()).collect();
        assert_eq!(
            predicates,
            vec![
                "StartDate >= '2024-01-01' AND StartDate <= '2024-01-15'",
                "row_number IN (5, 6, 7)",
                "age IS NOT MISSING AND consent IS NOT MISSING",
                "attn_check IN (3)",
                "colour_check IN ('blue', 'Blue')",
            ]
        );
        for rule in table.iter() {
            assert_eq!(predicate::validate(&rule.predicate), Ok(()));
        }
        assert_eq!(
            table.get("partition_pilot_01").unwrap().assign_value.as_deref(),
            Some("pilot")
        );
    }

    #[test]
    fn test_counter_has_no_gaps_when_sections_missing() {
        let table = compile_yaml(
            r#"
quality_flags:
  attention_checks:
    - var: attn_check
      pass_values: [3]
      description: "A"
"#,
        )
        .unwrap();
        assert_eq!(table.rules()[0].order, 1);
    }

    #[test]
    fn test_compile_is_deterministic() {
        assert_eq!(compile_yaml(FULL).unwrap(), compile_yaml(FULL).unwrap());
    }

    #[test]
    fn test_id_var_partition() {
        let table = compile_yaml(
            "partitioning:\n  pilot:\n    by: ids\n    id_var: pid\n    ids: [\"P1\", \"P2\"]\n",
        )
        .unwrap();
        assert_eq!(table.rules()[0].predicate, "pid IN ('P1', 'P2')");
    }

    #[test]
    fn test_datetime_bounds_accepted() {
        let table = compile_yaml(
            "partitioning:\n  pretest:\n    by: date_range\n    date_var: StartDate\n    start: \"2024-01-01 08:00:00\"\n    end: \"2024-01-01 12:00:00\"\n",
        )
        .unwrap();
        assert_eq!(
            table.rules()[0].predicate,
            "StartDate >= '2024-01-01 08:00:00' AND StartDate <= '2024-01-01 12:00:00'"
        );
    }

    #[test]
    fn test_invalid_by() {
        let err = compile_yaml("partitioning:\n  pretest:\n    by: weeks\n").unwrap_err();
        match err {
            ScreeningError::Config(ConfigError::InvalidValue { path, value, .. }) => {
                assert_eq!(path, "partitioning.pretest.by");
                assert_eq!(value, "weeks");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_date_format_names_literal() {
        let err = compile_yaml(
            "partitioning:\n  pretest:\n    by: date_range\n    date_var: StartDate\n    start: \"01/01/2024\"\n    end: \"2024-01-15\"\n",
        )
        .unwrap_err();
        match err {
            ScreeningError::Config(ConfigError::InvalidDateFormat { path, value }) => {
                assert_eq!(path, "partitioning.pretest.start");
                assert_eq!(value, "01/01/2024");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_date_var() {
        let err = compile_yaml(
            "partitioning:\n  pretest:\n    by: date_range\n    start: \"2024-01-01\"\n    end: \"2024-01-15\"\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ScreeningError::Config(ConfigError::MissingField { ref path }) if path == "partitioning.pretest.date_var"
        ));
    }

    #[test]
    fn test_empty_id_list() {
        let err = compile_yaml("partitioning:\n  pilot:\n    by: ids\n    ids: []\n").unwrap_err();
        assert!(matches!(err, ScreeningError::Config(ConfigError::EmptyIdList { .. })));
    }

    #[test]
    fn test_bad_row_number() {
        let err = compile_yaml("partitioning:\n  pilot:\n    by: ids\n    ids: [0]\n").unwrap_err();
        assert!(matches!(err, ScreeningError::Config(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_unknown_required_column() {
        let err = compile_yaml("eligibility:\n  required_nonmissing: [age, height]\n").unwrap_err();
        match err {
            ScreeningError::Config(ConfigError::UnknownColumn { column, .. }) => {
                assert_eq!(column, "height")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_eligibility_action_override_and_rejection() {
        let table =
            compile_yaml("eligibility:\n  required_nonmissing: [age]\n  action: flag\n").unwrap();
        assert_eq!(table.rules()[0].action, Action::Flag);

        let err = compile_yaml("eligibility:\n  required_nonmissing: [age]\n  action: partition\n")
            .unwrap_err();
        assert!(matches!(err, ScreeningError::Config(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_attention_check_missing_fields_name_index() {
        let err = compile_yaml(
            r#"
quality_flags:
  attention_checks:
    - var: attn_check
      pass_values: [3]
      description: "ok"
    - var: attn_check
      description: "no values"
"#,
        )
        .unwrap_err();
        match err {
            ScreeningError::Config(ConfigError::MissingField { path }) => {
                assert_eq!(path, "quality_flags.attention_checks[1].pass_values")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_default_action_applies() {
        let table = compile_yaml(
            r#"
quality_flags:
  default_action: exclude
  attention_checks:
    - var: attn_check
      pass_values: [3]
      description: "A"
"#,
        )
        .unwrap();
        assert_eq!(table.rules()[0].action, Action::Exclude);
    }

    const EXPERT: &str = r#"
screening_rules:
  - rule_id: adults
    category: eligibility
    description: "Adults with consent"
    predicate: "age >= 18 AND consent IS NOT MISSING"
    action: exclude
  - rule_id: early
    category: partition
    description: "First rows are pretest"
    predicate: "row_number <= 2"
    action: partition
    assign_value: pretest
    order: 0
"#;

    #[test]
    fn test_expert_mode_defaults() {
        let table = compile_yaml(EXPERT).unwrap();
        let adults = table.get("adults").unwrap();
        assert_eq!(adults.order, 1);
        assert_eq!(adults.fields_used, "age,consent");
        assert_eq!(adults.assign_value, None);
        let early = table.get("early").unwrap();
        assert_eq!(early.order, 0);
        assert_eq!(early.assign_value.as_deref(), Some("pretest"));
        // Table order is preserved as given.
        assert_eq!(table.rules()[0].rule_id, "adults");
    }

    #[test]
    fn test_expert_missing_columns() {
        let err = compile_yaml(
            "screening_rules:\n  - rule_id: a\n    description: d\n    predicate: \"x IS MISSING\"\n",
        )
        .unwrap_err();
        match err {
            ScreeningError::MissingColumns { columns } => {
                assert_eq!(columns, vec!["category", "action"])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_expert_empty_fields() {
        let err = compile_yaml(
            "screening_rules:\n  - rule_id: \"  \"\n    category: quality\n    description: d\n    predicate: \"x IS MISSING\"\n    action: flag\n",
        )
        .unwrap_err();
        assert!(matches!(err, ScreeningError::EmptyField { row: 1, ref field } if field == "rule_id"));
    }

    #[test]
    fn test_expert_rejects_injection() {
        let err = compile_yaml(
            "screening_rules:\n  - rule_id: a\n    category: quality\n    description: d\n    predicate: \"system('ls')\"\n    action: flag\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ScreeningError::Predicate(predicate::PredicateError::InvalidPredicate { .. })
        ));
    }

    #[test]
    fn test_expert_unknown_action() {
        let err = compile_yaml(
            "screening_rules:\n  - rule_id: a\n    category: quality\n    description: d\n    predicate: \"x IS MISSING\"\n    action: drop\n",
        )
        .unwrap_err();
        assert!(matches!(err, ScreeningError::UnknownAction { ref action, .. } if action == "drop"));
    }
}
