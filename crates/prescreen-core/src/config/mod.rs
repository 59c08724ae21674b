//! Screening configuration parsing and validation.
//!
//! Configurations are YAML or JSON documents validated against an embedded
//! JSON Schema, then split into the declarative (simple) or explicit rule
//! table (expert) mode.

mod parser;
mod schema;

pub use parser::{
    AttentionCheck, ConfigError, Eligibility, ExpertModeConfig, PartitionSpec, Partitioning,
    QualityFlags, RuleRow, Scalar, ScreeningConfig, SimpleModeConfig,
};
pub use schema::validate_config_schema;
