//! Column-oriented dataset model.
//!
//! A [`Dataset`] is an ordered list of named, equal-length columns. Rows are
//! addressed positionally; `row_number` in predicates is the 1-based position.
//! Screening never rewrites an existing column: annotations are appended to a
//! copy.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Errors raised while building or loading a dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Column '{column}' has {found} values, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Failed to read dataset file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unsupported dataset format: {0}")]
    UnsupportedFormat(String),
}

/// A single cell.
///
/// `Missing` is the null/NA representation and is distinct from an empty
/// `Text` value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Type a raw CSV cell.
    ///
    /// Empty cells and `NA` are missing, `TRUE`/`FALSE` are booleans, and
    /// decimal text is numeric only when it prints back identically. Anything
    /// else (dates, `007`, `+5`, `1.50`) stays text so that it round-trips
    /// unchanged.
    pub fn from_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "NA" {
            return Value::Missing;
        }
        match trimmed {
            "TRUE" => return Value::Bool(true),
            "FALSE" => return Value::Bool(false),
            _ => {}
        }
        if trimmed == raw && looks_numeric(raw) {
            if let Ok(n) = raw.parse::<f64>() {
                if format_number(n) == raw {
                    return Value::Number(n);
                }
            }
        }
        Value::Text(raw.to_string())
    }
}

fn looks_numeric(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    !body.is_empty()
        && body.chars().any(|c| c.is_ascii_digit())
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || c == '-' || c == '+')
        && body.starts_with(|c: char| c.is_ascii_digit() || c == '.')
}

/// Canonical text form of a number: integral values print without a fraction.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Bool(true) => f.write_str("TRUE"),
            Value::Bool(false) => f.write_str("FALSE"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Missing)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Missing => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("null, a boolean, a number or a string")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
                Ok(Value::Missing)
            }

            fn visit_none<E: de::Error>(self) -> Result<Value, E> {
                Ok(Value::Missing)
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Value, D::Error> {
                Value::deserialize(d)
            }

            fn visit_bool<E: de::Error>(self, b: bool) -> Result<Value, E> {
                Ok(Value::Bool(b))
            }

            fn visit_i64<E: de::Error>(self, n: i64) -> Result<Value, E> {
                Ok(Value::Number(n as f64))
            }

            fn visit_u64<E: de::Error>(self, n: u64) -> Result<Value, E> {
                Ok(Value::Number(n as f64))
            }

            fn visit_f64<E: de::Error>(self, n: f64) -> Result<Value, E> {
                Ok(Value::Number(n))
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<Value, E> {
                Ok(Value::Text(s.to_string()))
            }

            fn visit_string<E: de::Error>(self, s: String) -> Result<Value, E> {
                Ok(Value::Text(s))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

/// Optional label metadata attached to a column.
///
/// Carried through screening untouched; nothing in the engine reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnLabels {
    /// Variable label (question text)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Value labels (code -> human label)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub value_labels: BTreeMap<String, String>,
}

/// A named column of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<ColumnLabels>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
            labels: None,
        }
    }

    pub fn with_labels(mut self, labels: ColumnLabels) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An ordered collection of equal-length columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    columns: Vec<Column>,
}

#[derive(Deserialize)]
struct DatasetRepr {
    columns: Vec<Column>,
}

impl<'de> Deserialize<'de> for Dataset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = DatasetRepr::deserialize(deserializer)?;
        Dataset::from_columns(repr.columns).map_err(de::Error::custom)
    }
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset, rejecting ragged or duplicate columns.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let mut dataset = Self::new();
        for column in columns {
            dataset.push_column(column)?;
        }
        Ok(dataset)
    }

    /// Parse a dataset from CSV text with a header row.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut values: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];

        for record in rdr.records() {
            let record = record?;
            for (i, cell) in record.iter().enumerate() {
                if let Some(col) = values.get_mut(i) {
                    col.push(Value::from_cell(cell));
                }
            }
        }

        let columns = headers
            .into_iter()
            .zip(values)
            .map(|(name, vals)| Column::new(name, vals))
            .collect();
        Self::from_columns(columns)
    }

    /// Parse a dataset from its JSON form (`{"columns": [...]}`).
    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a dataset from a `.csv` or `.json` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Self::from_csv_reader(fs::File::open(path)?),
            "json" => Self::from_json(&fs::read_to_string(path)?),
            _ => Err(DatasetError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Number of rows (0 for a dataset without columns).
    pub fn n_rows(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn values(&self, name: &str) -> Option<&[Value]> {
        self.column(name).map(|c| c.values.as_slice())
    }

    /// Append a column; the first column fixes the row count.
    pub fn push_column(&mut self, column: Column) -> Result<(), DatasetError> {
        if self.has_column(&column.name) {
            return Err(DatasetError::DuplicateColumn(column.name));
        }
        if let Some(first) = self.columns.first() {
            if first.len() != column.len() {
                return Err(DatasetError::RaggedColumn {
                    column: column.name,
                    expected: first.len(),
                    found: column.values.len(),
                });
            }
        }
        self.columns.push(column);
        Ok(())
    }

    /// Remove a column by name, returning it if present.
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(idx))
    }

    /// A copy holding only the rows where `keep` is true.
    pub fn filter_rows(&self, keep: &[bool]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: c
                    .values
                    .iter()
                    .zip(keep)
                    .filter(|(_, k)| **k)
                    .map(|(v, _)| v.clone())
                    .collect(),
                labels: c.labels.clone(),
            })
            .collect();
        Dataset { columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_typing() {
        assert_eq!(Value::from_cell(""), Value::Missing);
        assert_eq!(Value::from_cell("NA"), Value::Missing);
        assert_eq!(Value::from_cell("18"), Value::Number(18.0));
        assert_eq!(Value::from_cell("-2.5"), Value::Number(-2.5));
        assert_eq!(Value::from_cell("TRUE"), Value::Bool(true));
        assert_eq!(Value::from_cell("2024-01-03"), Value::text("2024-01-03"));
        assert_eq!(Value::from_cell("inf"), Value::text("inf"));
        assert_eq!(Value::from_cell("abc"), Value::text("abc"));
    }

    #[test]
    fn test_non_canonical_numbers_stay_text() {
        for raw in ["007", "010", "+5", "1.50", "1e3", " 18", "-0"] {
            assert_eq!(Value::from_cell(raw), Value::text(raw), "{:?}", raw);
        }
        assert_eq!(Value::from_cell("0"), Value::Number(0.0));
        assert_eq!(Value::from_cell("0.25"), Value::Number(0.25));
    }

    #[test]
    fn test_csv_cells_display_as_read() {
        let csv = "pid,score
007,1.50
010,2
123,-0.5
";
        let ds = Dataset::from_csv_reader(csv.as_bytes()).unwrap();
        let cells: Vec<String> = ds
            .columns()
            .iter()
            .flat_map(|c| c.values.iter().map(|v| v.to_string()))
            .collect();
        assert_eq!(cells, vec!["007", "010", "123", "1.50", "2", "-0.5"]);
    }

    #[test]
    fn test_number_display_is_canonical() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Missing.to_string(), "");
    }

    #[test]
    fn test_ragged_column_rejected() {
        let result = Dataset::from_columns(vec![
            Column::new("a", vec![Value::from(1.0), Value::from(2.0)]),
            Column::new("b", vec![Value::from(1.0)]),
        ]);
        assert!(matches!(result, Err(DatasetError::RaggedColumn { .. })));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = Dataset::from_columns(vec![
            Column::new("a", vec![Value::from(1.0)]),
            Column::new("a", vec![Value::from(2.0)]),
        ]);
        assert!(matches!(result, Err(DatasetError::DuplicateColumn(_))));
    }

    #[test]
    fn test_csv_loading() {
        let csv = "id,age,start\n1,18,2024-01-02 09:00:00\n2,,2024-01-03 10:00:00\n";
        let ds = Dataset::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.n_rows(), 2);
        assert_eq!(ds.n_cols(), 3);
        assert_eq!(ds.values("age").unwrap()[1], Value::Missing);
        assert_eq!(
            ds.values("start").unwrap()[0],
            Value::text("2024-01-02 09:00:00")
        );
    }

    #[test]
    fn test_json_roundtrip_with_labels() {
        let json = r#"{"columns": [
            {"name": "consent", "values": [1, null, 2],
             "labels": {"label": "Consent given", "value_labels": {"1": "Yes", "2": "No"}}},
            {"name": "name", "values": ["a", "b", "c"]}
        ]}"#;
        let ds = Dataset::from_json(json).unwrap();
        assert_eq!(ds.n_rows(), 3);
        let labels = ds.column("consent").unwrap().labels.as_ref().unwrap();
        assert_eq!(labels.value_labels.get("1").map(String::as_str), Some("Yes"));
        assert!(ds.values("consent").unwrap()[1].is_missing());
    }

    #[test]
    fn test_filter_rows_keeps_order() {
        let ds = Dataset::from_columns(vec![Column::new(
            "x",
            vec![Value::from(1.0), Value::from(2.0), Value::from(3.0)],
        )])
        .unwrap();
        let kept = ds.filter_rows(&[true, false, true]);
        assert_eq!(
            kept.values("x").unwrap(),
            &[Value::from(1.0), Value::from(3.0)]
        );
    }
}
