// Configuration management for Menuet applications
//
// Layers, later ones winning key by key:
//   built-in defaults
//   config/<env>.json or config/<env>.toml
//   config/paths.json (under `paths`)
//   MENUET_* environment overrides
// Relative entries under `paths` are resolved against the project root.

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{
    CacheSettings, DefaultSettings, HttpSettings, LoggingSettings, PathSettings, Settings,
    ValidationSettings,
};
pub use validation::{ConfigValidator, Validate};

use menuet_core::Config;
use menuet_core::utils::deep_merge;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Prefix of environment variables the loader reads.
pub const ENV_PREFIX: &str = "MENUET";

/// Environment used when `MENUET_ENV` is not set.
pub const DEFAULT_ENV: &str = "development";

/// Builds the layered configuration of one project.
pub struct ConfigManager {
    root: PathBuf,
    env: Option<String>,
    load_dotenv: bool,
    env_loader: EnvLoader,
}

impl ConfigManager {
    /// Create a manager for the project rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            env: None,
            load_dotenv: false,
            env_loader: EnvLoader::new(Some(ENV_PREFIX.to_string())),
        }
    }

    /// Use this environment instead of `MENUET_ENV`
    pub fn env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    /// Load `<root>/.env` into the process environment first
    pub fn load_dotenv(mut self, enable: bool) -> Self {
        self.load_dotenv = enable;
        self
    }

    /// Read overrides from `vars` instead of the process environment
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_loader = EnvLoader::from_vars(Some(ENV_PREFIX.to_string()), vars);
        self
    }

    pub fn load(self) -> Result<LoadedConfig> {
        if self.load_dotenv {
            let dotenv = self.root.join(".env");
            if dotenv.exists() {
                dotenvy::from_path(&dotenv).map_err(|e| ConfigError::LoadError(e.to_string()))?;
                debug!(path = %dotenv.display(), ".env loaded");
            }
        }

        let env = match self.env {
            Some(env) => env,
            None => self.env_loader.load_var_or("ENV", DEFAULT_ENV),
        };
        let dir = self.root.join("config");
        let mut raw = Settings::defaults_value();

        match env_file(&dir, &env) {
            Some(file) => {
                let layer = ConfigLoader::auto(&file)?.load_file(&file)?;
                raw = deep_merge(&raw, &layer);
                info!(env = env.as_str(), file = %file.display(), "Configuration loaded");
            }
            None => warn!(env = env.as_str(), dir = %dir.display(), "No configuration file for environment, using defaults"),
        }

        let paths_file = dir.join("paths.json");
        if paths_file.exists() {
            let paths = ConfigLoader::new(FileFormat::Json).load_file(&paths_file)?;
            raw = deep_merge(&raw, &json!({ "paths": paths }));
        }

        raw = deep_merge(&raw, &self.env_loader.overrides()?);
        resolve_paths(&mut raw, &self.root);

        let settings = Settings::from_value(&raw)?;
        Ok(LoadedConfig {
            root: self.root,
            env,
            raw,
            settings,
        })
    }
}

/// Result of loading: the raw document plus its typed view.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub root: PathBuf,
    pub env: String,
    pub raw: Value,
    pub settings: Settings,
}

impl LoadedConfig {
    /// The document modules receive as `$config`.
    pub fn config(&self) -> Config {
        Config::new(self.raw.clone())
    }

    /// Look up a dotted key such as `mail.sender`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .config()
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;
        serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    pub fn has(&self, key: &str) -> bool {
        self.config().get(key).is_some()
    }
}

fn env_file(dir: &Path, env: &str) -> Option<PathBuf> {
    ["json", "toml"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", env, ext)))
        .find(|path| path.exists())
}

fn resolve_paths(raw: &mut Value, root: &Path) {
    let Some(Value::Object(paths)) = raw.get_mut("paths") else {
        return;
    };

    for value in paths.values_mut() {
        if let Value::String(path) = value {
            if Path::new(path.as_str()).is_relative() {
                *path = root.join(path.as_str()).to_string_lossy().into_owned();
            }
        }
    }
}
