//! Localized strings, exposed to modules as the `$string` capability.
//!
//! Each language is a flat JSON dictionary of `code -> text`, loaded from
//! `<strings dir>/<language>.json`. The language of a request comes from
//! the `lang` query parameter, then the `accept-language` cookie, then the
//! first entry of the `Accept-Language` header.

use crate::Error;
use crate::context::RequestContext;
use crate::fs_walk;
use crate::http::RequestHead;
use crate::logging::{debug, info};
use crate::utils::string::kebab;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_KEY: &str = "default";

#[derive(Debug, Clone, Default)]
pub struct Strings {
    tables: HashMap<String, Map<String, Value>>,
    default_language: String,
}

impl Strings {
    pub fn new(default_language: &str) -> Self {
        Self {
            tables: HashMap::new(),
            default_language: normalize_language(default_language),
        }
    }

    /// Add a dictionary. The first dictionary added, or the one matching
    /// the default language, becomes the fallback.
    pub fn insert(&mut self, language: &str, dictionary: Map<String, Value>) {
        let language = normalize_language(language);
        if !self.tables.contains_key(DEFAULT_KEY) || language == self.default_language {
            self.tables.insert(DEFAULT_KEY.to_string(), dictionary.clone());
        }
        self.tables.insert(language, dictionary);
    }

    /// Load every `*.json` dictionary under `dir`. A missing directory
    /// yields an empty table.
    pub fn load_dir(dir: &Path, default_language: &str) -> Result<Self, Error> {
        let mut strings = Self::new(default_language);
        if !dir.exists() {
            debug!(dir = %dir.display(), "No strings directory");
            return Ok(strings);
        }

        for file in fs_walk::read_json_dir(dir)? {
            match file.value {
                Value::Object(dictionary) => strings.insert(&file.name, dictionary),
                _ => {
                    return Err(Error::Config(format!(
                        "{} must contain a JSON object",
                        file.path.display()
                    )));
                }
            }
        }

        info!(languages = strings.languages().len(), "Strings loaded");
        Ok(strings)
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<_> = self
            .tables
            .keys()
            .filter(|key| key.as_str() != DEFAULT_KEY)
            .map(String::as_str)
            .collect();
        languages.sort();
        languages
    }

    /// Pick the request language.
    pub fn detect_language(head: &RequestHead, query: &Map<String, Value>) -> String {
        let from_query = query.get("lang").and_then(Value::as_str);
        let from_cookie = head.cookie("accept-language");
        let from_header = head
            .header("accept-language")
            .and_then(|header| header.split(',').next());

        let raw = [from_query, from_cookie, from_header]
            .into_iter()
            .flatten()
            .find(|candidate| !candidate.is_empty())
            .unwrap_or("");
        normalize_language(raw)
    }

    /// Look `code` up for `language` and substitute `{0}`, `{1}`, ...
    ///
    /// String parameters are themselves looked up as codes first.
    pub fn translate(&self, language: &str, code: &str, params: &[Value]) -> String {
        let mut text = self
            .tables
            .get(language)
            .or_else(|| self.tables.get(DEFAULT_KEY))
            .and_then(|table| table.get(code))
            .and_then(Value::as_str)
            .unwrap_or(code)
            .to_string();

        for (index, param) in params.iter().enumerate() {
            let replacement = match param {
                Value::String(nested) => self.translate(language, nested, &[]),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            let placeholder = format!("{{{index}}}");
            text = text.replace(&placeholder, &replacement);
        }

        text
    }

    /// Translate for a request.
    pub fn get(
        &self,
        head: &RequestHead,
        query: &Map<String, Value>,
        code: &str,
        params: &[Value],
    ) -> String {
        self.translate(&Self::detect_language(head, query), code, params)
    }

    /// Translate for the request a controller is handling.
    pub fn for_context(&self, ctx: &RequestContext, code: &str, params: &[Value]) -> String {
        self.get(ctx.head(), &ctx.query, code, params)
    }
}

/// `ko_KR`, `ko-KR` and `ko-kr;q=0.8` all become `ko-kr`.
fn normalize_language(raw: &str) -> String {
    let tag = raw.split(';').next().unwrap_or("").trim();
    kebab(&tag.to_lowercase())
}
