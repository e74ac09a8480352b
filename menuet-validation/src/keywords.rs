// Path-pattern scoped default keywords

use crate::pattern::PathPattern;
use menuet_core::Error;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info};

/// One rule: for schemas whose name matches `pattern`, fields of a listed
/// type receive the listed keywords unless they already declare them.
#[derive(Debug, Clone)]
pub struct DefaultKeywordRule {
    pattern: PathPattern,
    by_type: Map<String, Value>,
}

impl DefaultKeywordRule {
    pub fn new(pattern: &str, by_type: Map<String, Value>) -> Result<Self, Error> {
        for (kind, keywords) in &by_type {
            if !keywords.is_object() {
                return Err(Error::Config(format!(
                    "default keywords for type '{}' under '{}' must be an object",
                    kind, pattern
                )));
            }
        }

        Ok(Self {
            pattern: PathPattern::new(pattern)?,
            by_type,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }

    fn apply_to_field(&self, field: &mut Map<String, Value>) {
        let types: Vec<String> = match field.get("type") {
            Some(Value::String(kind)) => vec![kind.clone()],
            Some(Value::Array(kinds)) => kinds
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => return,
        };

        for kind in &types {
            let Some(Value::Object(keywords)) = self.by_type.get(kind) else {
                continue;
            };
            for (keyword, value) in keywords {
                if !field.contains_key(keyword) {
                    field.insert(keyword.clone(), value.clone());
                }
            }
        }
    }
}

/// Ordered list of default-keyword rules.
///
/// The rules file is a JSON object `{pattern: {type: {keyword: value}}}`;
/// declaration order is application order, so an earlier rule wins when
/// two rules set the same keyword.
#[derive(Debug, Clone, Default)]
pub struct DefaultKeywordRules {
    rules: Vec<DefaultKeywordRule>,
}

impl DefaultKeywordRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: &Value) -> Result<Self, Error> {
        let Value::Object(patterns) = value else {
            return Err(Error::Config(
                "default keyword rules must be a JSON object".to_string(),
            ));
        };

        let mut rules = Self::new();
        for (pattern, by_type) in patterns {
            let Value::Object(by_type) = by_type else {
                return Err(Error::Config(format!(
                    "default keyword rule '{}' must map types to keywords",
                    pattern
                )));
            };
            rules.push(DefaultKeywordRule::new(pattern, by_type.clone())?);
        }
        Ok(rules)
    }

    /// Read the rules file. A missing file means no rules.
    pub fn load(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            debug!(path = %path.display(), "No default keyword rules file");
            return Ok(Self::new());
        }

        let raw = std::fs::read(path)?;
        let value: Value = serde_json::from_slice(&raw)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        let rules = Self::from_value(&value)?;
        info!(count = rules.len(), path = %path.display(), "Default keyword rules loaded");
        Ok(rules)
    }

    pub fn push(&mut self, rule: DefaultKeywordRule) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Return `schema` with the defaults of every rule matching `name`.
    ///
    /// Fields are found through `properties` at any depth and through
    /// `definitions` at the root only. Keywords already present are kept.
    pub fn apply(&self, name: &str, schema: &Value) -> Value {
        let mut out = schema.clone();
        for rule in self.rules.iter().filter(|rule| rule.matches(name)) {
            if let Value::Object(root) = &mut out {
                if let Some(Value::Object(definitions)) = root.get_mut("definitions") {
                    for definition in definitions.values_mut() {
                        inject(rule, definition);
                    }
                }
                walk_properties(rule, root);
            }
        }
        out
    }
}

fn inject(rule: &DefaultKeywordRule, field: &mut Value) {
    if let Value::Object(map) = field {
        rule.apply_to_field(map);
        walk_properties(rule, map);
    }
}

fn walk_properties(rule: &DefaultKeywordRule, node: &mut Map<String, Value>) {
    if let Some(Value::Object(properties)) = node.get_mut("properties") {
        for field in properties.values_mut() {
            inject(rule, field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules(value: Value) -> DefaultKeywordRules {
        DefaultKeywordRules::from_value(&value).unwrap()
    }

    #[test]
    fn test_injects_only_where_absent() {
        let rules = rules(json!({"**": {"string": {"maxLength": 255, "minLength": 1}}}));
        let schema = json!({"type": "object", "properties": {
            "name": {"type": "string", "maxLength": 40},
            "age": {"type": "integer"}
        }});

        let out = rules.apply("user/create", &schema);
        assert_eq!(out["properties"]["name"], json!({"type": "string", "maxLength": 40, "minLength": 1}));
        assert_eq!(out["properties"]["age"], json!({"type": "integer"}));
        // Input untouched.
        assert!(schema["properties"]["name"].get("minLength").is_none());
    }

    #[test]
    fn test_pattern_scopes_rules() {
        let rules = rules(json!({"user/*": {"integer": {"minimum": 0}}}));
        let schema = json!({"properties": {"count": {"type": "integer"}}});

        assert_eq!(rules.apply("user/list", &schema)["properties"]["count"]["minimum"], 0);
        assert!(rules.apply("order/list", &schema)["properties"]["count"].get("minimum").is_none());
        assert!(rules.apply("user/admin/list", &schema)["properties"]["count"].get("minimum").is_none());
    }

    #[test]
    fn test_type_arrays_and_nesting() {
        let rules = rules(json!({"**": {"string": {"format": "trimmed"}}}));
        let schema = json!({"properties": {
            "note": {"type": ["string", "null"]},
            "address": {"type": "object", "properties": {"city": {"type": "string"}}}
        }});

        let out = rules.apply("order", &schema);
        assert_eq!(out["properties"]["note"]["format"], "trimmed");
        assert_eq!(out["properties"]["address"]["properties"]["city"]["format"], "trimmed");
        assert!(out["properties"]["address"].get("format").is_none());
    }

    #[test]
    fn test_definitions_only_at_root() {
        let rules = rules(json!({"**": {"string": {"maxLength": 8}}}));
        let schema = json!({
            "definitions": {"code": {"type": "string"}},
            "properties": {"inner": {"type": "object", "definitions": {"skip": {"type": "string"}}}}
        });

        let out = rules.apply("codes", &schema);
        assert_eq!(out["definitions"]["code"]["maxLength"], 8);
        assert!(out["properties"]["inner"]["definitions"]["skip"].get("maxLength").is_none());
    }

    #[test]
    fn test_earlier_rule_wins() {
        let rules = rules(json!({
            "user/*": {"string": {"maxLength": 10}},
            "**": {"string": {"maxLength": 255, "pattern": "^\\S"}}
        }));
        let out = rules.apply("user/create", &json!({"properties": {"name": {"type": "string"}}}));
        assert_eq!(out["properties"]["name"]["maxLength"], 10);
        assert_eq!(out["properties"]["name"]["pattern"], "^\\S");
    }

    #[test]
    fn test_rejects_malformed_rules() {
        assert!(DefaultKeywordRules::from_value(&json!([])).is_err());
        assert!(DefaultKeywordRules::from_value(&json!({"**": {"string": 5}})).is_err());
    }
}
