//! Schema compilation for Menuet
//!
//! Loads JSON Schema documents, resolves `merge` composition, injects
//! default keywords by schema path pattern, inlines references between
//! documents and compiles draft-07 validators that coerce, fill defaults
//! and drop undeclared properties.
//!
//! # Examples
//!
//! ```
//! use menuet_validation::{DefaultKeywordRules, SchemaCompiler, SchemaDocuments};
//! use menuet_core::SchemaValidator;
//! use serde_json::json;
//!
//! let documents = SchemaDocuments::new()
//!     .with("user/base", json!({
//!         "type": "object",
//!         "properties": {"name": {"type": "string"}},
//!         "required": ["name"]
//!     }))
//!     .unwrap()
//!     .with("user/create", json!({
//!         "merge": {
//!             "source": "user/base",
//!             "with": {"properties": {"age": {"type": "integer"}}}
//!         }
//!     }))
//!     .unwrap();
//! let rules = DefaultKeywordRules::from_value(&json!({
//!     "user/*": {"string": {"maxLength": 32}}
//! }))
//! .unwrap();
//!
//! let validators = SchemaCompiler::new().compile(&documents, &rules).unwrap();
//! let create = validators.get("user/create").unwrap();
//!
//! let data = create.validate(json!({"name": "kim", "age": "30", "extra": true})).unwrap();
//! assert_eq!(data, json!({"name": "kim", "age": 30}));
//! assert!(create.validate(json!({"age": 30})).is_err());
//! ```

mod compiler;
mod compose;
mod documents;
mod engine;
mod keywords;
mod normalize;
mod pattern;
mod refs;

pub use compiler::SchemaCompiler;
pub use compose::{Composer, reject_patch};
pub use documents::SchemaDocuments;
pub use engine::CompiledSchema;
pub use keywords::{DefaultKeywordRule, DefaultKeywordRules};
pub use normalize::{PropertyPatterns, UndeclaredFields, normalize};
pub use pattern::PathPattern;
pub use refs::RefInliner;

use menuet_core::Error;
use menuet_core::validator::ValidatorSet;
use std::path::Path;

/// Load schemas from `schema_dir` and rules from `rules_file`, then
/// compile them.
pub fn load_validators(
    schema_dir: &Path,
    rules_file: &Path,
    compiler: SchemaCompiler,
) -> Result<ValidatorSet, Error> {
    let documents = SchemaDocuments::load_dir(schema_dir)?;
    let rules = DefaultKeywordRules::load(rules_file)?;
    compiler.compile(&documents, &rules)
}
