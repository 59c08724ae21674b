//! Screening configuration model and loaders.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::schema::validate_config_schema;

/// Errors raised while loading or compiling a configuration.
///
/// Every variant carries the offending field path.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration does not match schema: {}", .0.join("; "))]
    SchemaError(Vec<String>),

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    #[error("Missing required field: {path}")]
    MissingField { path: String },

    #[error("Invalid value for {path}: '{value}' (expected {expected})")]
    InvalidValue {
        path: String,
        value: String,
        expected: String,
    },

    #[error("Invalid date format for {path}: '{value}' (expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)")]
    InvalidDateFormat { path: String, value: String },

    #[error("Empty id list: {path}")]
    EmptyIdList { path: String },

    #[error("Unknown column referenced by {path}: '{column}'")]
    UnknownColumn { path: String, column: String },
}

/// A scalar configuration value (id, pass value, or expert-mode cell).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(n) => write!(f, "{}", n),
            Scalar::Float(n) => write!(f, "{}", n),
            Scalar::Bool(true) => f.write_str("TRUE"),
            Scalar::Bool(false) => f.write_str("FALSE"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// One partition declaration (`partitioning.pretest` / `partitioning.pilot`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionSpec {
    /// `date_range` or `ids`
    #[serde(default)]
    pub by: Option<String>,

    #[serde(default)]
    pub date_var: Option<String>,

    #[serde(default)]
    pub start: Option<String>,

    #[serde(default)]
    pub end: Option<String>,

    /// Row numbers, or key values when `id_var` is set
    #[serde(default)]
    pub ids: Option<Vec<Scalar>>,

    /// Column holding participant keys; row numbers are used when absent
    #[serde(default)]
    pub id_var: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Partitioning {
    #[serde(default)]
    pub pretest: Option<PartitionSpec>,

    #[serde(default)]
    pub pilot: Option<PartitionSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Eligibility {
    #[serde(default)]
    pub required_nonmissing: Option<Vec<String>>,

    /// `exclude` (default) or `flag`
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttentionCheck {
    #[serde(default)]
    pub var: Option<String>,

    #[serde(default)]
    pub pass_values: Option<Vec<Scalar>>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityFlags {
    #[serde(default)]
    pub attention_checks: Option<Vec<AttentionCheck>>,

    #[serde(default)]
    pub default_action: Option<String>,
}

/// Declarative configuration: each section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimpleModeConfig {
    #[serde(default)]
    pub partitioning: Option<Partitioning>,

    #[serde(default)]
    pub eligibility: Option<Eligibility>,

    #[serde(default)]
    pub quality_flags: Option<QualityFlags>,
}

impl SimpleModeConfig {
    pub fn is_empty(&self) -> bool {
        let no_partitions = self
            .partitioning
            .as_ref()
            .map(|p| p.pretest.is_none() && p.pilot.is_none())
            .unwrap_or(true);
        no_partitions && self.eligibility.is_none() && self.quality_flags.is_none()
    }
}

/// One row of an explicit rule table; keys are column names.
pub type RuleRow = BTreeMap<String, Option<Scalar>>;

/// Explicit rule table supplied by the researcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpertModeConfig {
    pub screening_rules: Vec<RuleRow>,
}

impl ExpertModeConfig {
    /// Column names present in any row, sorted.
    pub fn columns(&self) -> Vec<&str> {
        let mut cols: Vec<&str> = self
            .screening_rules
            .iter()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();
        cols.sort_unstable();
        cols.dedup();
        cols
    }
}

/// Raw document shape. Unknown top-level keys are ignored so that screening
/// settings can live in a larger project file.
#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    partitioning: Option<Partitioning>,
    #[serde(default)]
    eligibility: Option<Eligibility>,
    #[serde(default)]
    quality_flags: Option<QualityFlags>,
    #[serde(default)]
    screening_rules: Option<Vec<RuleRow>>,
}

/// A screening configuration: declarative or an explicit rule table.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreeningConfig {
    Simple(SimpleModeConfig),
    Expert(ExpertModeConfig),
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        ScreeningConfig::Simple(SimpleModeConfig::default())
    }
}

impl ScreeningConfig {
    /// Parse a configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load by extension: `.yaml`/`.yml` or `.json`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Validate against the embedded schema, then pick the mode.
    ///
    /// A present `screening_rules` list selects expert mode; the declarative
    /// sections are then ignored.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        validate_config_schema(&value).map_err(ConfigError::SchemaError)?;

        if value.is_null() {
            return Ok(Self::default());
        }

        let doc: ConfigDocument = serde_json::from_value(value)?;
        if let Some(screening_rules) = doc.screening_rules {
            return Ok(ScreeningConfig::Expert(ExpertModeConfig { screening_rules }));
        }
        Ok(ScreeningConfig::Simple(SimpleModeConfig {
            partitioning: doc.partitioning,
            eligibility: doc.eligibility,
            quality_flags: doc.quality_flags,
        }))
    }

    /// True when compiling would yield no rules by construction.
    pub fn is_empty(&self) -> bool {
        match self {
            ScreeningConfig::Simple(simple) => simple.is_empty(),
            ScreeningConfig::Expert(expert) => expert.screening_rules.is_empty(),
        }
    }
}
