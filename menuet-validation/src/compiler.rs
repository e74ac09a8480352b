// Schema compiler: documents + rules -> validator set

use crate::compose::Composer;
use crate::documents::SchemaDocuments;
use crate::engine::CompiledSchema;
use crate::keywords::DefaultKeywordRules;
use crate::normalize::UndeclaredFields;
use crate::refs::RefInliner;
use menuet_core::validator::ValidatorSet;
use menuet_core::Error;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Turns schema documents into the validators routes refer to.
///
/// For each document, in order: `merge` composition, default-keyword
/// injection, inlining of references to other documents, then draft-07
/// compilation. Every validator is registered under the document's name
/// and, if declared, its `$id` alias.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaCompiler {
    undeclared_response_fields: UndeclaredFields,
}

impl SchemaCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// How response validators treat properties the schema does not
    /// declare. Request validators always strip them.
    pub fn undeclared_response_fields(mut self, mode: UndeclaredFields) -> Self {
        self.undeclared_response_fields = mode;
        self
    }

    pub fn compile(
        &self,
        documents: &SchemaDocuments,
        rules: &DefaultKeywordRules,
    ) -> Result<ValidatorSet, Error> {
        let prepared = self.prepare(documents, rules)?;
        let mut inliner = RefInliner::new(documents, &prepared);
        let mut validators = ValidatorSet::new();

        for name in documents.names() {
            let schema = inliner.inline(name, &prepared[name])?;
            let compiled = CompiledSchema::compile(name, without_identity(schema))?;

            let response = (self.undeclared_response_fields != UndeclaredFields::Strip)
                .then(|| compiled.with_undeclared(self.undeclared_response_fields));
            let compiled = Arc::new(compiled);

            let mut keys = vec![name];
            keys.extend(documents.alias_of(name));
            for key in keys {
                validators.insert(key, compiled.clone());
                if let Some(response) = &response {
                    validators.insert_response(key, Arc::new(response.clone()));
                }
            }
            debug!(schema = name, "Schema compiled");
        }

        info!(count = documents.len(), "Schemas compiled");
        Ok(validators)
    }

    /// Composed and keyword-injected form of every document, by name.
    pub fn prepare(
        &self,
        documents: &SchemaDocuments,
        rules: &DefaultKeywordRules,
    ) -> Result<HashMap<String, Value>, Error> {
        let mut composer = Composer::new(documents);
        let mut prepared = HashMap::new();

        for name in documents.names() {
            let composed = composer.compose(name)?;
            prepared.insert(name.to_string(), rules.apply(name, &composed));
        }
        Ok(prepared)
    }
}

// Identity keywords would change how the validator resolves references;
// lookup by alias is handled by the validator set instead.
fn without_identity(mut schema: Value) -> Value {
    if let Value::Object(map) = &mut schema {
        map.remove("$id");
        map.remove("id");
        map.remove("$schema");
        map.remove("$async");
    }
    schema
}
