// Raw schema documents keyed by registration name

use menuet_core::Error;
use menuet_core::fs_walk;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Keywords whose value maps names to subschemas.
pub(crate) const SCHEMA_MAPS: &[&str] = &["properties", "definitions", "patternProperties", "dependencies"];

/// Keywords whose value is instance data, never a schema.
pub(crate) const DATA_KEYWORDS: &[&str] = &["enum", "const", "default", "examples", "required"];

/// Schema documents as loaded, before composition.
///
/// Each document is reachable by its registration name and, when it
/// declares one, by its `$id` (or legacy `id`) alias.
#[derive(Debug, Clone, Default)]
pub struct SchemaDocuments {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
    aliases: HashMap<String, String>,
}

impl SchemaDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `.json` file under `dir`. A missing directory yields an
    /// empty set.
    pub fn load_dir(dir: &Path) -> Result<Self, Error> {
        let mut documents = Self::new();
        if !dir.exists() {
            debug!(dir = %dir.display(), "Schema directory not found");
            return Ok(documents);
        }

        for file in fs_walk::read_json_dir(dir)? {
            documents.insert(file.name, file.value)?;
        }

        info!(count = documents.len(), dir = %dir.display(), "Schema documents loaded");
        Ok(documents)
    }

    pub fn insert(&mut self, name: impl Into<String>, document: Value) -> Result<(), Error> {
        let name = name.into();
        if self.index.contains_key(&name) || self.aliases.contains_key(&name) {
            return Err(duplicate(&name));
        }

        if let Some(alias) = declared_id(&document) {
            if alias != name {
                if self.index.contains_key(&alias) || self.aliases.contains_key(&alias) {
                    return Err(duplicate(&alias));
                }
                self.aliases.insert(alias, name.clone());
            }
        }

        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, document));
        Ok(())
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, document: Value) -> Result<Self, Error> {
        self.insert(name, document)?;
        Ok(self)
    }

    /// Registration name for `name`, following aliases.
    pub fn canonical<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.index.contains_key(name) {
            Some(name)
        } else {
            self.aliases.get(name).map(String::as_str)
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        let name = self.canonical(name)?;
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn alias_of(&self, name: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(_, target)| target.as_str() == name)
            .map(|(alias, _)| alias.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn declared_id(document: &Value) -> Option<String> {
    document
        .get("$id")
        .or_else(|| document.get("id"))
        .and_then(Value::as_str)
        .map(|id| id.trim_end_matches('#').to_string())
        .filter(|id| !id.is_empty())
}

fn duplicate(name: &str) -> Error {
    Error::SchemaCompile {
        schema: name.to_string(),
        message: "schema name registered twice".to_string(),
    }
}
