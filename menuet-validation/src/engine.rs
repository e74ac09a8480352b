// Compiled JSON Schema validators

use crate::normalize::{PropertyPatterns, UndeclaredFields, check_range_keywords, normalize};
use jsonschema::{Draft, JSONSchema};
use menuet_core::Error;
use menuet_core::validator::{FieldError, SchemaValidator, ValidationErrors};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A draft-07 validator for one fully prepared schema.
///
/// Validation first normalizes the data (coercion, defaults, undeclared
/// fields, `range`) and then checks it structurally; errors from both
/// steps are reported together.
#[derive(Clone)]
pub struct CompiledSchema {
    name: Arc<str>,
    schema: Arc<Value>,
    compiled: Arc<JSONSchema>,
    patterns: Arc<PropertyPatterns>,
    undeclared: UndeclaredFields,
}

impl CompiledSchema {
    pub fn compile(name: &str, schema: Value) -> Result<Self, Error> {
        let invalid = |message| Error::SchemaCompile {
            schema: name.to_string(),
            message,
        };
        check_range_keywords(&schema).map_err(invalid)?;
        let patterns = PropertyPatterns::compile(&schema).map_err(invalid)?;

        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|e| Error::SchemaCompile {
                schema: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            name: Arc::from(name),
            schema: Arc::new(schema),
            compiled: Arc::new(compiled),
            patterns: Arc::new(patterns),
            undeclared: UndeclaredFields::default(),
        })
    }

    /// Same schema, different handling of undeclared properties.
    pub fn with_undeclared(&self, undeclared: UndeclaredFields) -> Self {
        Self {
            undeclared,
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }
}

impl SchemaValidator for CompiledSchema {
    fn validate(&self, mut data: Value) -> Result<Value, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for error in normalize(&self.schema, &self.patterns, &mut data, self.undeclared) {
            errors.push(error);
        }

        if let Err(failures) = self.compiled.validate(&data) {
            for failure in failures {
                let schema_path = failure.schema_path.to_string();
                let keyword = schema_path.rsplit('/').next().unwrap_or_default().to_string();
                errors.push(FieldError::new(
                    failure.instance_path.to_string(),
                    failure.to_string(),
                    keyword,
                ));
            }
        }

        if errors.is_empty() { Ok(data) } else { Err(errors) }
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("name", &self.name)
            .field("undeclared", &self.undeclared)
            .finish()
    }
}
