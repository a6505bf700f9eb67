/*
 * schema.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Schema validation of macro bodies.
//!
//! Every macro declares a schema id in its [`MacroMetadata`]. Parsed bodies
//! are checked through [`validate_macro_content`], the single point where
//! macro options meet a [`SchemaValidator`].
//!
//! The default validator, [`JsonSchemaValidator`], compiles the JSON Schemas
//! embedded from the crate's `schemas/` directory.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::{MacroError, MacroResult};
use crate::macros::MacroMetadata;

/// Schemas of the built-in macros, embedded at compile time.
const BUILTIN_SCHEMAS: &[(&str, &str)] = &[
    ("createCardsMacroSchema", include_str!("../schemas/create-cards.json")),
    ("imageMacroSchema", include_str!("../schemas/image.json")),
    ("includeMacroSchema", include_str!("../schemas/include.json")),
    ("percentageMacroSchema", include_str!("../schemas/percentage.json")),
    ("reportMacroSchema", include_str!("../schemas/report.json")),
    ("scoreCardMacroSchema", include_str!("../schemas/score-card.json")),
    ("xrefMacroSchema", include_str!("../schemas/xref.json")),
];

/// Validator over the built-in schemas, shared by every [`crate::Project`]
/// that does not bring its own.
///
/// # Panics
///
/// Panics on first use if an embedded schema is invalid. This can only
/// happen if a file under `schemas/` is edited incorrectly.
static SHARED: Lazy<Arc<JsonSchemaValidator>> = Lazy::new(|| {
    Arc::new(
        JsonSchemaValidator::with_builtin_schemas()
            .expect("Invalid built-in macro schema - this is a bug in cards-macros"),
    )
});

/// Validates structured data against a schema identified by id.
pub trait SchemaValidator: Send + Sync {
    /// Validate `data` against the schema `schema_id`.
    ///
    /// Returns the validated value, or a [`MacroError::Schema`] describing
    /// every violation.
    fn validate(&self, schema_id: &str, data: &Value) -> MacroResult<Value>;
}

/// Validate a macro's parsed body against the macro's declared schema.
pub fn validate_macro_content(
    metadata: &MacroMetadata,
    data: &Value,
    validator: &dyn SchemaValidator,
) -> MacroResult<Value> {
    validator.validate(metadata.schema_id, data)
}

/// [`SchemaValidator`] backed by the `jsonschema` crate.
#[derive(Default)]
pub struct JsonSchemaValidator {
    validators: HashMap<String, jsonschema::Validator>,
}

impl JsonSchemaValidator {
    /// Create a validator with no schemas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator with every built-in macro schema registered.
    pub fn with_builtin_schemas() -> MacroResult<Self> {
        let mut validator = Self::new();
        for (schema_id, text) in BUILTIN_SCHEMAS {
            let schema: Value = serde_json::from_str(text).map_err(|e| {
                MacroError::schema(*schema_id, format!("Invalid schema JSON: {}", e))
            })?;
            validator.register(*schema_id, &schema)?;
        }
        Ok(validator)
    }

    /// The process-wide validator over the built-in schemas.
    pub fn shared() -> Arc<dyn SchemaValidator> {
        SHARED.clone()
    }

    /// Compile and register a schema under `schema_id`.
    pub fn register(&mut self, schema_id: impl Into<String>, schema: &Value) -> MacroResult<()> {
        let schema_id = schema_id.into();
        let compiled = jsonschema::validator_for(schema)
            .map_err(|e| MacroError::schema(&schema_id, format!("Invalid schema: {}", e)))?;
        self.validators.insert(schema_id, compiled);
        Ok(())
    }

    /// Whether a schema is registered under `schema_id`.
    pub fn contains(&self, schema_id: &str) -> bool {
        self.validators.contains_key(schema_id)
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, schema_id: &str, data: &Value) -> MacroResult<Value> {
        let validator = self
            .validators
            .get(schema_id)
            .ok_or_else(|| MacroError::schema(schema_id, format!("Unknown schema: {}", schema_id)))?;

        let errors: Vec<String> = validator
            .iter_errors(data)
            .map(|e| describe_violation(&e.instance_path.to_string(), &e.to_string()))
            .collect();

        if errors.is_empty() {
            Ok(data.clone())
        } else {
            Err(MacroError::schema(schema_id, errors.join("; ")))
        }
    }
}

impl fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.validators.keys().collect();
        ids.sort();
        f.debug_struct("JsonSchemaValidator")
            .field("schemas", &ids)
            .finish()
    }
}

/// Phrase a violation so it names the offending field.
///
/// `instance_path` is a JSON pointer such as `/value` or `/parameters/limit`.
fn describe_violation(instance_path: &str, message: &str) -> String {
    let field = instance_path.trim_start_matches('/').replace('/', ".");
    if field.is_empty() {
        message.to_string()
    } else {
        format!("Invalid value for '{}': {}", field, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PERCENTAGE: MacroMetadata = MacroMetadata {
        name: "percentage",
        tag_name: "percentage-macro",
        schema_id: "percentageMacroSchema",
    };

    #[test]
    fn test_builtin_schemas_compile() {
        let validator = JsonSchemaValidator::with_builtin_schemas().unwrap();
        for (id, _) in BUILTIN_SCHEMAS {
            assert!(validator.contains(id), "missing {}", id);
        }
    }

    #[test]
    fn test_valid_data_is_returned() {
        let validator = JsonSchemaValidator::shared();
        let data = json!({"title": "T", "value": 85, "legend": "done"});
        let validated = validate_macro_content(&PERCENTAGE, &data, validator.as_ref()).unwrap();
        assert_eq!(validated, data);
    }

    #[test]
    fn test_missing_field_is_named() {
        let validator = JsonSchemaValidator::shared();
        let data = json!({"title": "T", "value": 85});
        let err = validate_macro_content(&PERCENTAGE, &data, validator.as_ref()).unwrap_err();
        assert!(matches!(err, MacroError::Schema { .. }));
        assert!(err.to_string().contains("legend"), "{}", err);
    }

    #[test]
    fn test_wrong_type_is_named() {
        let validator = JsonSchemaValidator::shared();
        let data = json!({"title": "T", "value": "85", "legend": "done"});
        let err = validate_macro_content(&PERCENTAGE, &data, validator.as_ref()).unwrap_err();
        assert!(
            err.to_string().starts_with("Invalid value for 'value'"),
            "{}",
            err
        );
    }

    #[test]
    fn test_unknown_schema_id() {
        let validator = JsonSchemaValidator::new();
        let err = validator.validate("nope", &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Unknown schema: nope");
    }

    #[test]
    fn test_register_custom_schema() {
        let mut validator = JsonSchemaValidator::new();
        validator
            .register("custom", &json!({"type": "object", "required": ["a"]}))
            .unwrap();
        assert!(validator.validate("custom", &json!({"a": 1})).is_ok());
        assert!(validator.validate("custom", &json!({})).is_err());
    }

    #[test]
    fn test_describe_violation_nested_path() {
        assert_eq!(
            describe_violation("/parameters/limit", "oops"),
            "Invalid value for 'parameters.limit': oops"
        );
        assert_eq!(describe_violation("", "oops"), "oops");
    }
}
