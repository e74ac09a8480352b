// Environment variable loading

use crate::{ConfigError, Result};
use menuet_core::utils::string::camel;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::env;

/// Separator between nesting levels in override variable names.
pub const NESTING_SEPARATOR: &str = "__";

/// Environment variable loader
///
/// With prefix `MENUET`, `MENUET_HTTP__PORT=8080` overrides `http.port`
/// and `MENUET_HTTP__ALLOW_CROSS_DOMAIN_ACCESS=true` overrides
/// `http.allowCrossDomainAccess`.
pub struct EnvLoader {
    prefix: Option<String>,
    vars: Option<Vec<(String, String)>>,
}

impl EnvLoader {
    /// Create a loader over the process environment
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix, vars: None }
    }

    /// Create a loader over an explicit set of variables
    pub fn from_vars<I, K, V>(prefix: Option<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix,
            vars: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    fn vars(&self) -> Vec<(String, String)> {
        match &self.vars {
            Some(vars) => vars.clone(),
            None => env::vars().collect(),
        }
    }

    /// Load all matching variables, keys lowercased and stripped of the prefix
    pub fn load(&self) -> Result<HashMap<String, String>> {
        let mut config = HashMap::new();

        for (key, value) in self.vars() {
            if let Some(trimmed) = self.strip_prefix(&key) {
                config.insert(trimmed.to_lowercase(), value);
            }
        }

        Ok(config)
    }

    /// Load a specific variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };

        match &self.vars {
            Some(vars) => vars
                .iter()
                .find(|(name, _)| *name == full_key)
                .map(|(_, value)| value.clone())
                .ok_or(ConfigError::EnvError(env::VarError::NotPresent)),
            None => env::var(&full_key).map_err(ConfigError::EnvError),
        }
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Nested configuration overrides from variables whose name contains
    /// [`NESTING_SEPARATOR`]. Values are read as JSON when they parse,
    /// otherwise kept as strings.
    pub fn overrides(&self) -> Result<Value> {
        let mut root = Map::new();

        let mut vars = self.vars();
        vars.sort();
        for (key, raw) in vars {
            let Some(trimmed) = self.strip_prefix(&key) else {
                continue;
            };
            if !trimmed.contains(NESTING_SEPARATOR) {
                continue;
            }

            let path: Vec<String> = trimmed
                .split(NESTING_SEPARATOR)
                .map(|segment| camel(&segment.to_lowercase(), false))
                .collect();
            if path.iter().any(String::is_empty) {
                return Err(ConfigError::LoadError(format!("malformed override variable {}", key)));
            }

            let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
            insert_path(&mut root, &path, value);
        }

        Ok(Value::Object(root))
    }

    fn strip_prefix<'k>(&self, key: &'k str) -> Option<&'k str> {
        match &self.prefix {
            Some(prefix) => key
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('_')),
            None => Some(key),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

fn insert_path(root: &mut Map<String, Value>, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert(last.clone(), value);
}
