// Inlining of references between registered schemas

use crate::documents::{DATA_KEYWORDS, SCHEMA_MAPS, SchemaDocuments};
use menuet_core::Error;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Replaces `$ref`s naming other registered schemas with the referenced
/// definitions so each compiled validator is self-contained.
///
/// A reference has the form `name` or `name#/json/pointer`; `name` may be
/// a registration name or an `$id` alias. Local references (`#/...`) of
/// the document being compiled are left for the validator to resolve;
/// local references inside an inlined document are inlined as well.
pub struct RefInliner<'a> {
    documents: &'a SchemaDocuments,
    prepared: &'a HashMap<String, Value>,
    stack: Vec<String>,
}

impl<'a> RefInliner<'a> {
    pub fn new(documents: &'a SchemaDocuments, prepared: &'a HashMap<String, Value>) -> Self {
        Self {
            documents,
            prepared,
            stack: Vec::new(),
        }
    }

    pub fn inline(&mut self, name: &str, schema: &Value) -> Result<Value, Error> {
        self.stack.clear();
        self.stack.push(format!("{}#", name));
        let result = self.walk(name, schema, schema, false);
        self.stack.clear();
        result
    }

    fn walk(&mut self, scope: &str, root: &Value, node: &Value, foreign: bool) -> Result<Value, Error> {
        match node {
            Value::Object(map) => {
                if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                    if !reference.starts_with('#') {
                        return self.external(reference);
                    }
                    if foreign {
                        return self.local(scope, root, reference);
                    }
                }

                let mut out = Map::new();
                for (key, value) in map {
                    let value = match value {
                        // entries are named subschemas, whatever their names
                        Value::Object(entries) if SCHEMA_MAPS.contains(&key.as_str()) => {
                            let mut walked = Map::new();
                            for (name, entry) in entries {
                                walked.insert(name.clone(), self.walk(scope, root, entry, foreign)?);
                            }
                            Value::Object(walked)
                        }
                        _ if DATA_KEYWORDS.contains(&key.as_str()) => value.clone(),
                        _ => self.walk(scope, root, value, foreign)?,
                    };
                    out.insert(key.clone(), value);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.walk(scope, root, item, foreign))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn external(&mut self, reference: &str) -> Result<Value, Error> {
        let (target, pointer) = reference.split_once('#').unwrap_or((reference, ""));
        let canonical = self
            .documents
            .canonical(target)
            .map(str::to_string)
            .ok_or_else(|| self.not_found(reference))?;
        let prepared = self.prepared;
        let target_root = prepared
            .get(&canonical)
            .ok_or_else(|| self.not_found(reference))?;

        self.enter(format!("{}#{}", canonical, pointer))?;
        let fragment = resolve_pointer(target_root, pointer).ok_or_else(|| self.not_found(reference))?;
        let result = self.walk(&canonical, target_root, fragment, true).map(strip_identity);
        self.stack.pop();
        result
    }

    fn local(&mut self, scope: &str, root: &Value, reference: &str) -> Result<Value, Error> {
        let pointer = &reference[1..];
        let fragment = resolve_pointer(root, pointer)
            .ok_or_else(|| self.not_found(&format!("{}{}", scope, reference)))?;

        self.enter(format!("{}#{}", scope, pointer))?;
        let result = self.walk(scope, root, fragment, true).map(strip_identity);
        self.stack.pop();
        result
    }

    fn enter(&mut self, key: String) -> Result<(), Error> {
        if self.stack.contains(&key) {
            let mut chain = self.stack.clone();
            chain.push(key);
            return Err(Error::SchemaCompile {
                schema: self.origin(),
                message: format!("circular reference: {}", chain.join(" -> ")),
            });
        }
        self.stack.push(key);
        Ok(())
    }

    fn origin(&self) -> String {
        self.stack
            .first()
            .map(|entry| entry.trim_end_matches('#').to_string())
            .unwrap_or_default()
    }

    fn not_found(&self, reference: &str) -> Error {
        Error::SchemaNotFound {
            schema: self.origin(),
            reference: reference.to_string(),
        }
    }
}

fn resolve_pointer<'v>(root: &'v Value, pointer: &str) -> Option<&'v Value> {
    if pointer.is_empty() || pointer == "/" {
        Some(root)
    } else {
        root.pointer(pointer)
    }
}

fn strip_identity(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        map.remove("$id");
        map.remove("id");
        map.remove("$schema");
    }
    value
}
