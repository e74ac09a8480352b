// Schema composition: resolution of `merge` directives

use crate::documents::{DATA_KEYWORDS, SCHEMA_MAPS, SchemaDocuments};
use menuet_core::Error;
use menuet_core::utils::deep_merge;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::trace;

const MERGE_KEYS: &[&str] = &["$merge", "merge"];
const PATCH_KEYS: &[&str] = &["$patch", "patch"];

/// Resolves `merge {source, with}` directives into plain schemas.
///
/// Operands may be an inline schema, a schema name, or `{"$ref": name}`
/// (other keys next to `$ref` are merged over the referenced schema).
/// `with` is deep-merged over `source`, then the node's own keys over
/// that. Results are memoized per registration name; the input documents
/// are never modified.
pub struct Composer<'a> {
    documents: &'a SchemaDocuments,
    composed: HashMap<String, Value>,
    stack: Vec<String>,
}

impl<'a> Composer<'a> {
    pub fn new(documents: &'a SchemaDocuments) -> Self {
        Self {
            documents,
            composed: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Fully composed definition of the schema registered as `name`.
    pub fn compose(&mut self, name: &str) -> Result<Value, Error> {
        let (canonical, document) = match (self.documents.canonical(name), self.documents.get(name)) {
            (Some(canonical), Some(document)) => (canonical.to_string(), document),
            _ => {
                return Err(Error::SchemaNotFound {
                    schema: self.stack.last().cloned().unwrap_or_else(|| name.to_string()),
                    reference: name.to_string(),
                });
            }
        };

        if let Some(done) = self.composed.get(&canonical) {
            return Ok(done.clone());
        }

        if self.stack.contains(&canonical) {
            let mut chain = self.stack.clone();
            chain.push(canonical.clone());
            return Err(Error::SchemaCompile {
                schema: canonical,
                message: format!("circular merge: {}", chain.join(" -> ")),
            });
        }

        reject_patch(&canonical, document)?;

        self.stack.push(canonical.clone());
        let result = self.compose_schema(document);
        self.stack.pop();

        let result = result?;
        trace!(schema = canonical.as_str(), "Schema composed");
        self.composed.insert(canonical, result.clone());
        Ok(result)
    }

    fn owner(&self) -> String {
        self.stack.last().cloned().unwrap_or_default()
    }

    fn compose_schema(&mut self, node: &Value) -> Result<Value, Error> {
        let Value::Object(map) = node else {
            return self.compose_any(node);
        };

        let mut own = Map::new();
        let mut directive = None;

        for (key, value) in map {
            if MERGE_KEYS.contains(&key.as_str()) {
                directive = Some(value);
            } else if SCHEMA_MAPS.contains(&key.as_str()) && value.is_object() {
                own.insert(key.clone(), self.compose_map(value)?);
            } else if DATA_KEYWORDS.contains(&key.as_str()) {
                own.insert(key.clone(), value.clone());
            } else {
                own.insert(key.clone(), self.compose_any(value)?);
            }
        }

        let own = Value::Object(own);
        match directive {
            None => Ok(own),
            Some(directive) => {
                let (source, with) = match (directive.get("source"), directive.get("with")) {
                    (Some(source), Some(with)) => (source, with),
                    _ => {
                        return Err(Error::SchemaCompile {
                            schema: self.owner(),
                            message: "merge requires both source and with".to_string(),
                        });
                    }
                };

                let source = self.operand(source)?;
                let with = self.operand(with)?;
                Ok(deep_merge(&deep_merge(&source, &with), &own))
            }
        }
    }

    fn compose_map(&mut self, map: &Value) -> Result<Value, Error> {
        let Value::Object(entries) = map else {
            return Ok(map.clone());
        };

        let mut out = Map::new();
        for (name, schema) in entries {
            out.insert(name.clone(), self.compose_schema(schema)?);
        }
        Ok(Value::Object(out))
    }

    fn compose_any(&mut self, value: &Value) -> Result<Value, Error> {
        match value {
            Value::Object(_) => self.compose_schema(value),
            Value::Array(items) => items
                .iter()
                .map(|item| self.compose_any(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn operand(&mut self, operand: &Value) -> Result<Value, Error> {
        match operand {
            Value::String(name) => self.compose(name),
            Value::Object(map) => match map.get("$ref").and_then(Value::as_str) {
                Some(reference) if !reference.starts_with('#') => {
                    let target = self.compose(reference)?;
                    let mut rest = map.clone();
                    rest.remove("$ref");
                    if rest.is_empty() {
                        return Ok(target);
                    }
                    let rest = self.compose_schema(&Value::Object(rest))?;
                    Ok(deep_merge(&target, &rest))
                }
                _ => self.compose_schema(operand),
            },
            other => Err(Error::SchemaCompile {
                schema: self.owner(),
                message: format!("invalid merge operand: {}", other),
            }),
        }
    }
}

/// Fail if a `patch` directive appears anywhere in `document`.
pub fn reject_patch(schema: &str, document: &Value) -> Result<(), Error> {
    match document {
        Value::Object(map) => {
            for (key, value) in map {
                if PATCH_KEYS.contains(&key.as_str()) {
                    return Err(Error::UnsupportedPatch(schema.to_string()));
                }
                if DATA_KEYWORDS.contains(&key.as_str()) {
                    continue;
                }
                if SCHEMA_MAPS.contains(&key.as_str()) {
                    if let Value::Object(entries) = value {
                        for entry in entries.values() {
                            reject_patch(schema, entry)?;
                        }
                        continue;
                    }
                }
                reject_patch(schema, value)?;
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(|item| reject_patch(schema, item)),
        _ => Ok(()),
    }
}
