//! JSON Schema validation for screening configurations.
//!
//! The raw configuration document (YAML or JSON, both parsed to a JSON value)
//! is checked structurally before it is deserialized into typed sections, so
//! misspelled keys inside a section are reported rather than ignored.

use std::sync::OnceLock;

/// Embedded configuration schema (loaded at compile time).
const CONFIG_SCHEMA_JSON: &str = include_str!("../../schema/screening_config.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Get or initialize the compiled schema validator.
fn get_validator() -> Result<&'static jsonschema::Validator, String> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(CONFIG_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result.as_ref().map_err(Clone::clone)
}

/// Validate a configuration document against the schema.
///
/// Returns every violation as `"<message> at <instance path>"`.
pub fn validate_config_schema(document: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e])?;

    let errors: Vec<String> = validator
        .iter_errors(document)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_config_passes() {
        let value = serde_json::json!({
            "partitioning": {
                "pretest": {
                    "by": "date_range",
                    "date_var": "StartDate",
                    "start": "2024-01-01",
                    "end": "2024-01-15"
                }
            },
            "eligibility": { "required_nonmissing": ["age", "consent"] },
            "quality_flags": {
                "attention_checks": [
                    { "var": "attn", "pass_values": [3], "description": "Select 3" }
                ]
            }
        });
        assert!(validate_config_schema(&value).is_ok());
    }

    #[test]
    fn test_expert_config_passes() {
        let value = serde_json::json!({
            "screening_rules": [
                {
                    "rule_id": "elig_age",
                    "category": "eligibility",
                    "description": "Adults only",
                    "predicate": "age >= 18",
                    "action": "exclude",
                    "order": 1
                }
            ]
        });
        assert!(validate_config_schema(&value).is_ok());
    }

    #[test]
    fn test_null_document_passes() {
        assert!(validate_config_schema(&serde_json::Value::Null).is_ok());
    }

    #[test]
    fn test_misspelled_section_key_fails() {
        let value = serde_json::json!({
            "eligibility": { "requried_nonmissing": ["age"] }
        });
        let errors = validate_config_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_nested_rule_values_fail() {
        let value = serde_json::json!({
            "screening_rules": [ { "rule_id": { "nested": true } } ]
        });
        assert!(validate_config_schema(&value).is_err());
    }

    #[test]
    fn test_wrong_types_fail() {
        let value = serde_json::json!({
            "eligibility": { "required_nonmissing": "age" }
        });
        assert!(validate_config_schema(&value).is_err());
    }
}
