// Read-only configuration, exposed to modules as `$config`

use crate::Error;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Frozen configuration document.
#[derive(Debug, Clone)]
pub struct Config(Arc<Value>);

impl Config {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Look up a dotted key such as `http.port`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self.0.as_ref(), |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, Error> {
        let value = self
            .get(key)
            .ok_or_else(|| Error::Config(format!("missing configuration key: {key}")))?;
        serde_json::from_value(value.clone())
            .map_err(|e| Error::Config(format!("invalid configuration key {key}: {e}")))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Value::Object(Default::default()))
    }
}
