// Parsing of configuration layers

use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Formats a configuration layer can be written in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Json,
    Toml,
    /// `KEY=value` lines; every value stays a string.
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("json") {
            Some(FileFormat::Json)
        } else if ext.eq_ignore_ascii_case("toml") {
            Some(FileFormat::Toml)
        } else if ext.eq_ignore_ascii_case("env") {
            Some(FileFormat::Env)
        } else {
            None
        }
    }

    pub fn parse(self, content: &str) -> Result<Value> {
        let parse_error = |e: &dyn std::fmt::Display| ConfigError::ParseError(format!("{:?}: {}", self, e));
        match self {
            FileFormat::Json => serde_json::from_str(content).map_err(|e| parse_error(&e)),
            FileFormat::Toml => {
                let table: toml::Table = toml::from_str(content).map_err(|e| parse_error(&e))?;
                serde_json::to_value(table).map_err(|e| parse_error(&e))
            }
            FileFormat::Env => dotenvy::from_read_iter(content.as_bytes())
                .map(|item| item.map(|(key, value)| (key, Value::String(value))))
                .collect::<std::result::Result<Map<_, _>, _>>()
                .map(Value::Object)
                .map_err(|e| parse_error(&e)),
        }
    }
}

/// Reads one layer file in a fixed format.
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Pick the format from the file extension.
    pub fn auto(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(FileFormat::from_extension)
            .map(Self::new)
            .ok_or_else(|| ConfigError::LoadError(format!("{}: unknown configuration format", path.display())))
    }

    pub fn load_file(&self, path: &Path) -> Result<Value> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;
        self.parse(&content)
    }

    pub fn parse(&self, content: &str) -> Result<Value> {
        self.format.parse(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let result = loader.parse(r#"{"http": {"port": 8080}}"#).unwrap();
        assert_eq!(result["http"]["port"], 8080);
    }

    #[test]
    fn test_parse_toml() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let toml = r#"
            [http]
            port = 8080
            allowCrossDomainAccess = true
        "#;

        let result = loader.parse(toml).unwrap();
        assert_eq!(result["http"]["port"], 8080);
        assert_eq!(result["http"]["allowCrossDomainAccess"], true);
    }

    #[test]
    fn test_parse_env() {
        let loader = ConfigLoader::new(FileFormat::Env);
        let env = "KEY=value\n# Comment\nQUOTED=\"quoted value\"\n";

        let result = loader.parse(env).unwrap();
        assert_eq!(result["KEY"], "value");
        assert_eq!(result["QUOTED"], "quoted value");
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("TOML"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("env"), Some(FileFormat::Env));
        assert_eq!(FileFormat::from_extension("yaml"), None);
        assert!(ConfigLoader::auto(Path::new("config/development.json")).is_ok());
        assert!(ConfigLoader::auto(Path::new("config/development")).is_err());
    }
}
