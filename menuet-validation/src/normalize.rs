// Data normalization applied before structural validation
//
// Mirrors the options the framework's validators always ran with: type
// coercion, defaults filled in, undeclared properties removed, every error
// collected. Also home of the `range` keyword.

use crate::documents::{DATA_KEYWORDS, SCHEMA_MAPS};
use menuet_core::validator::FieldError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::sync::LazyLock;

static NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?\s*$").expect("static pattern")
});

// Bound on `$ref` hops taken without descending into the data.
const MAX_REF_HOPS: u8 = 32;

/// What to do with object properties a schema does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndeclaredFields {
    /// Drop them silently.
    #[default]
    Strip,
    /// Report each one as an `additionalProperties` error.
    Reject,
}

/// The `patternProperties` regexes of one schema, compiled up front.
#[derive(Debug, Clone, Default)]
pub struct PropertyPatterns {
    compiled: HashMap<String, Regex>,
}

impl PropertyPatterns {
    /// Compile every `patternProperties` key found in `schema`.
    pub fn compile(schema: &Value) -> Result<Self, String> {
        let mut patterns = Self::default();
        patterns.collect(schema)?;
        Ok(patterns)
    }

    fn collect(&mut self, schema: &Value) -> Result<(), String> {
        match schema {
            Value::Object(map) => {
                for (key, value) in map {
                    if DATA_KEYWORDS.contains(&key.as_str()) {
                        continue;
                    }
                    if SCHEMA_MAPS.contains(&key.as_str()) {
                        if let Value::Object(entries) = value {
                            if key == "patternProperties" {
                                for pattern in entries.keys() {
                                    self.insert(pattern)?;
                                }
                            }
                            for entry in entries.values() {
                                self.collect(entry)?;
                            }
                            continue;
                        }
                    }
                    self.collect(value)?;
                }
                Ok(())
            }
            Value::Array(items) => items.iter().try_for_each(|item| self.collect(item)),
            _ => Ok(()),
        }
    }

    fn insert(&mut self, pattern: &str) -> Result<(), String> {
        if !self.compiled.contains_key(pattern) {
            let regex = Regex::new(pattern)
                .map_err(|e| format!("invalid patternProperties pattern {:?}: {}", pattern, e))?;
            self.compiled.insert(pattern.to_string(), regex);
        }
        Ok(())
    }

    /// Patterns that were never compiled match nothing.
    pub fn is_match(&self, pattern: &str, key: &str) -> bool {
        self.compiled.get(pattern).is_some_and(|regex| regex.is_match(key))
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

/// Normalize `data` in place against `root`, returning the errors found
/// by checks that happen during normalization (`range`, rejected fields).
pub fn normalize(
    root: &Value,
    patterns: &PropertyPatterns,
    data: &mut Value,
    undeclared: UndeclaredFields,
) -> Vec<FieldError> {
    let mut pass = Pass {
        root,
        patterns,
        undeclared,
        errors: Vec::new(),
    };
    pass.walk(root, data, "", 0, false);
    pass.errors
}

struct Pass<'s> {
    root: &'s Value,
    patterns: &'s PropertyPatterns,
    undeclared: UndeclaredFields,
    errors: Vec<FieldError>,
}

impl<'s> Pass<'s> {
    fn walk(&mut self, schema: &'s Value, data: &mut Value, path: &str, hops: u8, combined: bool) {
        let Value::Object(schema) = schema else {
            return;
        };

        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            if hops < MAX_REF_HOPS {
                if let Some(target) = local_target(self.root, reference) {
                    self.walk(target, data, path, hops + 1, combined);
                }
            }
            return;
        }

        if let Some(types) = schema.get("type") {
            coerce(types, data);
        }

        if let Some(Value::Array(branches)) = schema.get("allOf") {
            for branch in branches {
                self.walk(branch, data, path, hops, true);
            }
        }

        if let Some(range) = schema.get("range") {
            self.check_range(range, data, path);
        }

        match data {
            Value::Object(object) => self.walk_object(schema, object, path, combined),
            Value::Array(items) => self.walk_items(schema, items, path),
            _ => {}
        }
    }

    fn walk_object(
        &mut self,
        schema: &'s Map<String, Value>,
        object: &mut Map<String, Value>,
        path: &str,
        combined: bool,
    ) {
        let properties = schema.get("properties").and_then(Value::as_object);

        if let Some(properties) = properties {
            for (key, property) in properties {
                if object.contains_key(key) {
                    continue;
                }
                if let Some(default) = property.get("default") {
                    object.insert(key.clone(), default.clone());
                }
            }
        }

        let patterns = schema.get("patternProperties").and_then(Value::as_object);
        if !combined && (properties.is_some() || patterns.is_some()) {
            let compiled = self.patterns;
            let declared = |key: &str| {
                properties.is_some_and(|p| p.contains_key(key))
                    || patterns.is_some_and(|p| p.keys().any(|pattern| compiled.is_match(pattern, key)))
            };
            match self.undeclared {
                UndeclaredFields::Strip => object.retain(|key, _| declared(key.as_str())),
                UndeclaredFields::Reject => {
                    for key in object.keys().filter(|key| !declared(key.as_str())) {
                        self.errors.push(FieldError::new(
                            child_path(path, key),
                            "must NOT have additional properties",
                            "additionalProperties",
                        ));
                    }
                }
            }
        }

        if let Some(properties) = properties {
            for (key, property) in properties {
                if let Some(value) = object.get_mut(key) {
                    self.walk(property, value, &child_path(path, key), 0, false);
                }
            }
        }
    }

    fn walk_items(&mut self, schema: &'s Map<String, Value>, items: &mut [Value], path: &str) {
        match schema.get("items") {
            Some(Value::Array(positional)) => {
                for (index, (item, item_schema)) in items.iter_mut().zip(positional).enumerate() {
                    self.walk(item_schema, item, &child_path(path, &index.to_string()), 0, false);
                }
            }
            Some(item_schema @ Value::Object(_)) => {
                for (index, item) in items.iter_mut().enumerate() {
                    self.walk(item_schema, item, &child_path(path, &index.to_string()), 0, false);
                }
            }
            _ => {}
        }
    }

    fn check_range(&mut self, range: &Value, data: &Value, path: &str) {
        let (Some(value), Some((min, max))) = (data.as_f64(), range_bounds(range)) else {
            return;
        };
        if value < min || value > max {
            self.errors.push(FieldError::new(
                path,
                format!("must be >= {} and <= {}", range[0], range[1]),
                "range",
            ));
        }
    }
}

fn local_target<'s>(root: &'s Value, reference: &str) -> Option<&'s Value> {
    let pointer = reference.strip_prefix('#')?;
    if pointer.is_empty() {
        Some(root)
    } else {
        root.pointer(pointer)
    }
}

fn child_path(parent: &str, key: &str) -> String {
    format!("{}/{}", parent, key.replace('~', "~0").replace('/', "~1"))
}

fn range_bounds(range: &Value) -> Option<(f64, f64)> {
    match range.as_array().map(Vec::as_slice) {
        Some([min, max]) => Some((min.as_f64()?, max.as_f64()?)),
        _ => None,
    }
}

/// Check that every `range` keyword in `schema` is `[min, max]`.
pub fn check_range_keywords(schema: &Value) -> Result<(), String> {
    match schema {
        Value::Object(map) => {
            for (key, value) in map {
                if DATA_KEYWORDS.contains(&key.as_str()) {
                    continue;
                }
                if key == "range" && range_bounds(value).is_none() {
                    return Err(format!("range must be [min, max], got {}", value));
                }
                if SCHEMA_MAPS.contains(&key.as_str()) {
                    if let Value::Object(entries) = value {
                        for entry in entries.values() {
                            check_range_keywords(entry)?;
                        }
                        continue;
                    }
                }
                check_range_keywords(value)?;
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(check_range_keywords),
        _ => Ok(()),
    }
}

fn matches_type(kind: &str, data: &Value) -> bool {
    match kind {
        "null" => data.is_null(),
        "boolean" => data.is_boolean(),
        "string" => data.is_string(),
        "array" => data.is_array(),
        "object" => data.is_object(),
        "number" => data.is_number(),
        "integer" => data.as_f64().is_some_and(|n| n.fract() == 0.0),
        _ => false,
    }
}

fn coerce(types: &Value, data: &mut Value) {
    let kinds: Vec<&str> = match types {
        Value::String(kind) => vec![kind.as_str()],
        Value::Array(kinds) => kinds.iter().filter_map(Value::as_str).collect(),
        _ => return,
    };

    if kinds.iter().any(|kind| matches_type(kind, data)) {
        return;
    }

    if let Some(coerced) = kinds.iter().find_map(|kind| coerce_to(kind, data)) {
        *data = coerced;
    }
}

fn coerce_to(kind: &str, data: &Value) -> Option<Value> {
    match (kind, data) {
        ("string", Value::Number(n)) => Some(Value::String(n.to_string())),
        ("string", Value::Bool(b)) => Some(Value::String(b.to_string())),
        ("string", Value::Null) => Some(Value::String(String::new())),

        ("number" | "integer", Value::String(s)) if NUMERIC.is_match(s) => {
            let parsed: f64 = s.trim().trim_start_matches('+').parse().ok()?;
            if kind == "integer" && parsed.fract() != 0.0 {
                return None;
            }
            number(parsed)
        }
        ("number" | "integer", Value::Bool(b)) => Some(Value::from(u8::from(*b))),
        ("number" | "integer", Value::Null) => Some(Value::from(0)),

        ("boolean", Value::String(s)) if s == "true" || s == "false" => Some(Value::Bool(s == "true")),
        ("boolean", Value::Number(n)) if n.as_f64() == Some(1.0) => Some(Value::Bool(true)),
        ("boolean", Value::Number(n)) if n.as_f64() == Some(0.0) => Some(Value::Bool(false)),
        ("boolean", Value::Null) => Some(Value::Bool(false)),

        ("null", Value::String(s)) if s.is_empty() => Some(Value::Null),
        ("null", Value::Number(n)) if n.as_f64() == Some(0.0) => Some(Value::Null),
        ("null", Value::Bool(false)) => Some(Value::Null),

        _ => None,
    }
}

fn number(value: f64) -> Option<Value> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(Value::from(value as i64))
    } else {
        Number::from_f64(value).map(Value::Number)
    }
}
