//! Validator contract shared by the schema compiler and the request pipeline.
//!
//! A validator consumes a JSON value and returns either the normalized value
//! (coerced, defaults applied, undeclared fields removed) or the full list of
//! failed constraints. The pipeline never looks inside a validator; it only
//! needs the name lookup provided by [`ValidatorSet`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One failed constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// JSON pointer of the offending value (`""` for the root).
    pub path: String,
    pub message: String,
    /// Schema keyword that failed (`type`, `required`, `range`, ...).
    pub keyword: String,
}

impl FieldError {
    pub fn new(
        path: impl Into<String>,
        message: impl Into<String>,
        keyword: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            keyword: keyword.into(),
        }
    }
}

/// Collection of field errors produced by one validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(
        path: impl Into<String>,
        message: impl Into<String>,
        keyword: impl Into<String>,
    ) -> Self {
        Self {
            errors: vec![FieldError::new(path, message, keyword)],
        }
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Serialize the error list as a JSON array.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.errors).unwrap_or(Value::Array(Vec::new()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            if error.path.is_empty() {
                write!(f, "{}", error.message)?;
            } else {
                write!(f, "{}: {}", error.path, error.message)?;
            }
        }
        Ok(())
    }
}

/// A compiled validator.
pub trait SchemaValidator: Send + Sync {
    /// Validate `data`, returning the normalized value on success.
    fn validate(&self, data: Value) -> Result<Value, ValidationErrors>;
}

impl<F> SchemaValidator for F
where
    F: Fn(Value) -> Result<Value, ValidationErrors> + Send + Sync,
{
    fn validate(&self, data: Value) -> Result<Value, ValidationErrors> {
        self(data)
    }
}

/// Validator for the `"*"` wildcard: accepts anything unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl SchemaValidator for AcceptAll {
    fn validate(&self, data: Value) -> Result<Value, ValidationErrors> {
        Ok(data)
    }
}

pub type Validator = Arc<dyn SchemaValidator>;

/// Compiled validators keyed by schema name (and `$id` aliases).
#[derive(Clone, Default)]
pub struct ValidatorSet {
    validators: HashMap<String, Validator>,
    // Variants used only when a schema guards a response payload.
    responses: HashMap<String, Validator>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, validator: Validator) {
        self.validators.insert(name.into(), validator);
    }

    /// Builder-style insert, handy when assembling sets by hand.
    pub fn with<V: SchemaValidator + 'static>(mut self, name: impl Into<String>, validator: V) -> Self {
        self.insert(name, Arc::new(validator));
        self
    }

    pub fn get(&self, name: &str) -> Option<Validator> {
        self.validators.get(name).cloned()
    }

    /// Register a response-only variant of `name`.
    pub fn insert_response(&mut self, name: impl Into<String>, validator: Validator) {
        self.responses.insert(name.into(), validator);
    }

    /// Validator for a response payload, falling back to the request one.
    pub fn get_response(&self, name: &str) -> Option<Validator> {
        self.responses.get(name).cloned().or_else(|| self.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(String::as_str)
    }
}

impl fmt::Debug for ValidatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.validators.keys().collect();
        names.sort();
        f.debug_struct("ValidatorSet").field("schemas", &names).finish()
    }
}
