//! Assembling an application from a project directory.
//!
//! A project is laid out as
//!
//! ```text
//! config/<env>.json     settings for one environment (or .toml)
//! config/paths.json     overrides for the paths below
//! schemas/              JSON Schema documents, named by relative path
//! keywords.json         default-keyword rules
//! routes/               route definition files
//! strings/              one string table per language
//! ```
//!
//! Modules come from a [`ModuleManifest`], usually the one collected by
//! `register_module!`.

use menuet_cache::{Cache, CacheConfig};
use menuet_config::{ConfigManager, LoadedConfig};
use menuet_core::logging::WorkerGuard;
use menuet_core::route::load_routes;
use menuet_core::{Application, Error, ModuleEntry, ModuleManifest, Strings};
use menuet_validation::{SchemaCompiler, UndeclaredFields, load_validators};
use std::path::PathBuf;
use tracing::info;

/// Builder for an application rooted at a project directory.
pub struct Menuet {
    root: PathBuf,
    manifest: ModuleManifest,
    env: Option<String>,
    vars: Option<Vec<(String, String)>>,
    dotenv: bool,
    logging: bool,
    cache: Option<Cache>,
}

impl Menuet {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            manifest: ModuleManifest::new(),
            env: None,
            vars: None,
            dotenv: true,
            logging: true,
            cache: None,
        }
    }

    /// Add every module registered with `register_module!`.
    pub fn registered_modules(mut self) -> Self {
        self.manifest.extend(ModuleManifest::from_registrations());
        self
    }

    pub fn manifest(mut self, manifest: ModuleManifest) -> Self {
        self.manifest.extend(manifest);
        self
    }

    pub fn module(mut self, entry: ModuleEntry) -> Self {
        self.manifest.push(entry);
        self
    }

    /// Use this environment instead of `MENUET_ENV`.
    pub fn env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    /// Read configuration overrides from `vars` instead of the process
    /// environment.
    pub fn vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Load `<root>/.env` first. On by default.
    pub fn dotenv(mut self, enable: bool) -> Self {
        self.dotenv = enable;
        self
    }

    /// Install the global log subscriber. On by default.
    pub fn logging(mut self, enable: bool) -> Self {
        self.logging = enable;
        self
    }

    /// Use this cache as `$cache` instead of the configured one.
    pub fn cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Load configuration, strings, schemas and routes, then build.
    pub async fn build(self) -> Result<MenuetApp, Error> {
        let mut manager = ConfigManager::new(self.root.clone()).load_dotenv(self.dotenv);
        if let Some(env) = self.env {
            manager = manager.env(env);
        }
        if let Some(vars) = self.vars {
            manager = manager.with_vars(vars);
        }
        let config = manager.load()?;
        let settings = &config.settings;

        let guard = if self.logging {
            Some(settings.logging.log_config()?.init()?)
        } else {
            None
        };
        info!(env = config.env.as_str(), root = %self.root.display(), "Bootstrapping application");

        let strings = Strings::load_dir(&settings.paths.strings, &settings.defaults.language)?;

        let compiler = SchemaCompiler::new()
            .undeclared_response_fields(undeclared_fields(&settings.validation.undeclared_response_fields));
        let validators = load_validators(&settings.paths.schemas, &settings.paths.keywords, compiler)?;

        let routes = load_routes(&settings.paths.routes)?;

        let cache = match self.cache {
            Some(cache) => cache,
            None => {
                let mut cache_config = CacheConfig::memory().with_key_prefix(settings.cache.prefix.clone());
                cache_config.url = settings.cache.url.clone();
                Cache::connect(cache_config)
                    .await
                    .map_err(|e| Error::Config(format!("cache: {}", e)))?
            }
        };

        let app = Application::builder()
            .manifest(self.manifest)
            .validators(validators)
            .routes(routes)
            .router_options(settings.http.router_options())
            .server_options(settings.http.server_options())
            .config(config.config())
            .strings(strings)
            .builtin("$cache", cache)
            .build()?;

        Ok(MenuetApp {
            app,
            config,
            _guard: guard,
        })
    }
}

fn undeclared_fields(mode: &str) -> UndeclaredFields {
    match mode {
        "reject" => UndeclaredFields::Reject,
        _ => UndeclaredFields::Strip,
    }
}

/// A built application together with the configuration it came from.
pub struct MenuetApp {
    pub app: Application,
    pub config: LoadedConfig,
    _guard: Option<WorkerGuard>,
}

impl MenuetApp {
    /// Run initializers, then serve until Ctrl-C or SIGTERM.
    pub async fn run(self) -> Result<(), Error> {
        let MenuetApp { app, _guard, .. } = self;
        app.run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undeclared_fields_mode() {
        assert_eq!(undeclared_fields("reject"), UndeclaredFields::Reject);
        assert_eq!(undeclared_fields("strip"), UndeclaredFields::Strip);
    }

    #[tokio::test]
    async fn test_empty_project_builds() {
        let dir = tempfile::tempdir().unwrap();
        let menuet = Menuet::new(dir.path())
            .vars(Vec::<(String, String)>::new())
            .dotenv(false)
            .logging(false)
            .build()
            .await
            .unwrap();

        assert_eq!(menuet.config.env, "development");
        assert!(menuet.app.router().routes().is_empty());
        assert!(menuet.app.registry().resolve::<Cache>("$cache").is_ok());
    }
}
