// Typed view of the configuration document

use crate::validation::{ConfigValidator, Validate};
use crate::{ConfigError, Result};
use menuet_core::logging::{LogConfig, LogFormat, LogLevel, LogOutput, Rotation};
use menuet_core::routing::DEFAULT_BODY_LIMIT;
use menuet_core::{RouterOptions, ServerOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Settings the framework itself reads. Application-specific keys stay in
/// the raw document exposed as `$config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub http: HttpSettings,
    pub paths: PathSettings,
    pub defaults: DefaultSettings,
    pub validation: ValidationSettings,
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpSettings {
    pub host: IpAddr,
    pub port: u16,
    /// Path prefix all routes are mounted under.
    pub base: String,
    pub allow_cross_domain_access: bool,
    /// Maximum request body size in bytes.
    pub body_limit: usize,
    /// Milliseconds; absent means no limit.
    pub request_timeout: Option<u64>,
    /// Milliseconds shutdown waits for in-flight requests.
    pub drain_timeout: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 3000,
            base: String::new(),
            allow_cross_domain_access: false,
            body_limit: DEFAULT_BODY_LIMIT,
            request_timeout: None,
            drain_timeout: 30_000,
        }
    }
}

impl HttpSettings {
    pub fn router_options(&self) -> RouterOptions {
        RouterOptions::default()
            .base_path(self.base.clone())
            .allow_cross_domain(self.allow_cross_domain_access)
            .body_limit(self.body_limit)
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            addr: SocketAddr::new(self.host, self.port),
            request_timeout: self.request_timeout.map(Duration::from_millis),
            drain_timeout: Duration::from_millis(self.drain_timeout),
        }
    }
}

/// Locations of the data files an application is assembled from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PathSettings {
    pub schemas: PathBuf,
    /// Default-keyword rules file.
    pub keywords: PathBuf,
    pub routes: PathBuf,
    pub strings: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            schemas: PathBuf::from("schemas"),
            keywords: PathBuf::from("keywords.json"),
            routes: PathBuf::from("routes"),
            strings: PathBuf::from("strings"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DefaultSettings {
    pub language: String,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationSettings {
    /// `strip` or `reject`.
    pub undeclared_response_fields: String,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            undeclared_response_fields: "strip".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingSettings {
    pub level: String,
    /// `json`, `plain`, `pretty` or `compact`.
    pub format: String,
    /// Log to this file instead of stdout.
    pub file: Option<PathBuf>,
    /// With `file`, rotate `minutely`, `hourly`, `daily` or `never`.
    pub rotation: Option<String>,
    /// Overrides `level` when set, e.g. `menuet_core=debug,info`.
    pub filter: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "plain".to_string(),
            file: None,
            rotation: None,
            filter: None,
        }
    }
}

impl LoggingSettings {
    pub fn log_config(&self) -> Result<LogConfig> {
        let level: LogLevel = self.level.parse().map_err(invalid)?;
        let format: LogFormat = self.format.parse().map_err(invalid)?;

        let output = match (&self.file, self.rotation.as_deref()) {
            (None, _) => LogOutput::Stdout,
            (Some(file), None) => LogOutput::File(file.to_string_lossy().into_owned()),
            (Some(file), Some(rotation)) => LogOutput::RollingFile {
                directory: file
                    .parent()
                    .map(|dir| dir.to_string_lossy().into_owned())
                    .unwrap_or_else(|| ".".to_string()),
                prefix: file
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "menuet.log".to_string()),
                rotation: parse_rotation(rotation)?,
            },
        };

        let mut config = LogConfig::new().level(level).format(format).output(output);
        if let Some(filter) = &self.filter {
            config = config.with_env_filter(filter.clone());
        }
        Ok(config)
    }
}

fn parse_rotation(value: &str) -> Result<Rotation> {
    match value.to_ascii_lowercase().as_str() {
        "minutely" => Ok(Rotation::Minutely),
        "hourly" => Ok(Rotation::Hourly),
        "daily" => Ok(Rotation::Daily),
        "never" => Ok(Rotation::Never),
        other => Err(ConfigError::ValidationError(format!(
            "logging.rotation must be minutely, hourly, daily or never, got '{}'",
            other
        ))),
    }
}

fn invalid(error: menuet_core::Error) -> ConfigError {
    ConfigError::ValidationError(error.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheSettings {
    /// Redis URL; absent means the in-process cache.
    pub url: Option<String>,
    /// Prepended to every key.
    pub prefix: String,
}

impl Settings {
    /// Built-in defaults as a JSON document, the bottom configuration layer.
    pub fn defaults_value() -> Value {
        serde_json::to_value(Settings::default()).unwrap_or_default()
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let settings: Settings = serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::in_range(self.http.port, 1, u16::MAX, "http.port")?;
        ConfigValidator::is_base_path(&self.http.base, "http.base")?;
        ConfigValidator::in_range(self.http.body_limit, 1, usize::MAX, "http.bodyLimit")?;
        ConfigValidator::not_empty(&self.defaults.language, "defaults.language")?;
        ConfigValidator::one_of(
            &self.validation.undeclared_response_fields,
            &["strip", "reject"],
            "validation.undeclaredResponseFields",
        )?;
        if let Some(url) = &self.cache.url {
            ConfigValidator::has_scheme(url, &["redis", "rediss"], "cache.url")?;
        }
        self.logging.log_config().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_value(&json!({})).unwrap();
        assert_eq!(settings.http.port, 3000);
        assert_eq!(settings.http.body_limit, 100 * 1024);
        assert_eq!(settings.defaults.language, "en");
        assert_eq!(settings.paths.schemas, PathBuf::from("schemas"));
        assert_eq!(Settings::defaults_value()["http"]["allowCrossDomainAccess"], false);
    }

    #[test]
    fn test_camel_case_keys() {
        let settings = Settings::from_value(&json!({
            "http": {"port": 8080, "base": "/api", "allowCrossDomainAccess": true, "requestTimeout": 1500},
            "validation": {"undeclaredResponseFields": "reject"}
        }))
        .unwrap();

        let router = settings.http.router_options();
        assert_eq!(router.base_path, "/api");
        assert!(router.allow_cross_domain);

        let server = settings.http.server_options();
        assert_eq!(server.addr.port(), 8080);
        assert_eq!(server.request_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(settings.validation.undeclared_response_fields, "reject");
    }

    #[test]
    fn test_invalid_values() {
        assert!(Settings::from_value(&json!({"http": {"port": 0}})).is_err());
        assert!(Settings::from_value(&json!({"http": {"base": "api/"}})).is_err());
        assert!(Settings::from_value(&json!({"validation": {"undeclaredResponseFields": "drop"}})).is_err());
        assert!(Settings::from_value(&json!({"logging": {"level": "loud"}})).is_err());
        assert!(Settings::from_value(&json!({"cache": {"url": "localhost"}})).is_err());
        assert!(Settings::from_value(&json!({"http": {"port": "eighty"}})).is_err());
    }

    #[test]
    fn test_rolling_log_file() {
        let logging = LoggingSettings {
            file: Some(PathBuf::from("/var/log/menuet/app.log")),
            rotation: Some("daily".to_string()),
            ..LoggingSettings::default()
        };

        let config = logging.log_config().unwrap();
        assert_eq!(
            config.output,
            LogOutput::RollingFile {
                directory: "/var/log/menuet".to_string(),
                prefix: "app.log".to_string(),
                rotation: Rotation::Daily,
            }
        );
    }
}
