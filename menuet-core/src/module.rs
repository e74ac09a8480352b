//! Module definitions, discovery and loading.
//!
//! A module is a [`ModuleEntry`]: a hierarchical path (`user/profile`), an
//! optional explicit name, and a [`Definition`]. Entries reach the loader
//! either through a [`ModuleManifest`] built by hand or through
//! compile-time registration with [`register_module!`](crate::register_module).
//!
//! ```
//! use menuet_core::module::{ModuleEntry, ModuleLoader, ModuleManifest};
//! use menuet_core::registry::{Category, Registry};
//! use std::sync::Arc;
//!
//! struct Clock;
//! struct Greeter { _clock: Arc<Clock> }
//!
//! let mut manifest = ModuleManifest::new()
//!     .with(ModuleEntry::value(Category::Utility, "clock", Clock))
//!     .with(ModuleEntry::factory(Category::Service, "greeter", &["ClockUtil"], |deps| {
//!         Ok(Greeter { _clock: deps.get::<Clock>("ClockUtil")? })
//!     }));
//!
//! let registry = Arc::new(Registry::new());
//! ModuleLoader::new(registry.clone()).load_manifest(&mut manifest).unwrap();
//! assert!(registry.resolve::<Greeter>("GreeterService").is_ok());
//! ```

use crate::Error;
use crate::context::RequestContext;
use crate::http::Request;
use crate::inject::{Bound, Dependencies, GetterChain, Injectable};
use crate::logging::{debug, info, trace};
use crate::registry::{Capability, Category, Registry};
use crate::respond::ResponseScope;
use crate::utils::string::camel;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;

pub type BoxFuture<T> = futures_util::future::BoxFuture<'static, T>;

pub type Factory = Injectable<(), Result<Capability, Error>>;

pub type InterceptorFn = Injectable<(Request, Value), BoxFuture<Result<Request, Error>>>;
pub type Interceptor = Bound<(Request, Value), BoxFuture<Result<Request, Error>>>;

pub type HandlerFn = Injectable<RequestContext, BoxFuture<Result<Value, Error>>>;
pub type Handler = Bound<RequestContext, BoxFuture<Result<Value, Error>>>;

pub type ResolverFn = Injectable<(ResponseScope, Value), BoxFuture<Result<Value, Error>>>;
pub type Resolver = Bound<(ResponseScope, Value), BoxFuture<Result<Value, Error>>>;

pub type ErrorResolverFn = Injectable<(ResponseScope, Error), BoxFuture<Value>>;
pub type ErrorResolver = Bound<(ResponseScope, Error), BoxFuture<Value>>;

pub type InitializerFn = Injectable<(), BoxFuture<Result<(), Error>>>;
pub type Initializer = Bound<(), BoxFuture<Result<(), Error>>>;

/// How a shared-namespace module produces its value.
#[derive(Clone)]
pub enum Provide {
    /// Registered as-is.
    Value(Capability),
    /// Bound and invoked once at load time.
    Factory(Factory),
}

#[derive(Clone)]
pub enum Definition {
    Utility(Provide),
    Model(Provide),
    Service(Provide),
    Interceptor(InterceptorFn),
    /// A controller module that is a single handler.
    Controller(HandlerFn),
    /// A controller module exposing several named handlers.
    Controllers(Vec<(String, HandlerFn)>),
    DefaultResolver(ResolverFn),
    ErrorResolver(ErrorResolverFn),
    Initializer(InitializerFn),
}

impl Definition {
    pub fn category(&self) -> Category {
        match self {
            Definition::Utility(_) => Category::Utility,
            Definition::Model(_) => Category::Model,
            Definition::Service(_) => Category::Service,
            Definition::Interceptor(_) => Category::Interceptor,
            Definition::Controller(_) | Definition::Controllers(_) => Category::Controller,
            Definition::DefaultResolver(_) | Definition::ErrorResolver(_) => Category::Resolver,
            Definition::Initializer(_) => Category::Initializer,
        }
    }
}

/// Wrap an async controller closure as a [`HandlerFn`].
pub fn handler<F, Fut>(requires: &[&str], func: F) -> HandlerFn
where
    F: Fn(&Dependencies, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, Error>> + Send + 'static,
{
    Injectable::new(requires, move |deps, ctx| Box::pin(func(deps, ctx)) as BoxFuture<_>)
}

/// Wrap an async interceptor closure as an [`InterceptorFn`].
pub fn interceptor<F, Fut>(requires: &[&str], func: F) -> InterceptorFn
where
    F: Fn(&Dependencies, Request, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Request, Error>> + Send + 'static,
{
    Injectable::new(requires, move |deps, (request, options)| {
        Box::pin(func(deps, request, options)) as BoxFuture<_>
    })
}

#[derive(Clone)]
pub struct ModuleEntry {
    pub path: String,
    pub name: Option<String>,
    pub definition: Definition,
}

impl ModuleEntry {
    pub fn new(path: impl Into<String>, definition: Definition) -> Self {
        Self {
            path: path.into(),
            name: None,
            definition,
        }
    }

    /// Register under `name` instead of the derived name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn category(&self) -> Category {
        self.definition.category()
    }

    /// A utility, model or service registered as a plain value.
    pub fn value<T: Any + Send + Sync>(category: Category, path: impl Into<String>, value: T) -> Self {
        Self::provide(category, path, Provide::Value(Capability::new(value)))
    }

    /// A utility, model or service built once from its dependencies.
    pub fn factory<T, F>(category: Category, path: impl Into<String>, requires: &[&str], build: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Dependencies) -> Result<T, Error> + Send + Sync + 'static,
    {
        let factory = Injectable::new(requires, move |deps, ()| build(deps).map(Capability::new));
        Self::provide(category, path, Provide::Factory(factory))
    }

    fn provide(category: Category, path: impl Into<String>, provide: Provide) -> Self {
        let definition = match category {
            Category::Model => Definition::Model(provide),
            Category::Service => Definition::Service(provide),
            // utilities are the catch-all for plain values
            _ => Definition::Utility(provide),
        };
        Self::new(path, definition)
    }

    pub fn controller<F, Fut>(path: impl Into<String>, requires: &[&str], func: F) -> Self
    where
        F: Fn(&Dependencies, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        Self::new(path, Definition::Controller(handler(requires, func)))
    }

    /// A controller module with several named handlers, registered as
    /// `path.member`.
    pub fn controllers(path: impl Into<String>, members: Vec<(&str, HandlerFn)>) -> Self {
        let members = members
            .into_iter()
            .map(|(member, func)| (member.to_string(), func))
            .collect();
        Self::new(path, Definition::Controllers(members))
    }

    pub fn interceptor<F, Fut>(path: impl Into<String>, requires: &[&str], func: F) -> Self
    where
        F: Fn(&Dependencies, Request, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Request, Error>> + Send + 'static,
    {
        Self::new(path, Definition::Interceptor(interceptor(requires, func)))
    }

    pub fn default_resolver<F, Fut>(requires: &[&str], func: F) -> Self
    where
        F: Fn(&Dependencies, ResponseScope, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        let resolver = Injectable::new(requires, move |deps, (scope, data)| {
            Box::pin(func(deps, scope, data)) as BoxFuture<_>
        });
        Self::new("default", Definition::DefaultResolver(resolver))
    }

    pub fn error_resolver<F, Fut>(requires: &[&str], func: F) -> Self
    where
        F: Fn(&Dependencies, ResponseScope, Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        let resolver = Injectable::new(requires, move |deps, (scope, error)| {
            Box::pin(func(deps, scope, error)) as BoxFuture<_>
        });
        Self::new("error", Definition::ErrorResolver(resolver))
    }

    pub fn initializer<F, Fut>(requires: &[&str], func: F) -> Self
    where
        F: Fn(&Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let init = Injectable::new(requires, move |deps, ()| Box::pin(func(deps)) as BoxFuture<_>);
        Self::new("init", Definition::Initializer(init))
    }
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("category", &self.category())
            .finish()
    }
}

/// Compile-time module registration, collected with `inventory`.
pub struct ModuleRegistration {
    define: fn() -> ModuleEntry,
}

inventory::collect!(ModuleRegistration);

impl ModuleRegistration {
    pub const fn new(define: fn() -> ModuleEntry) -> Self {
        Self { define }
    }

    pub fn entry(&self) -> ModuleEntry {
        (self.define)()
    }
}

/// Register a module definition function with the global manifest.
///
/// ```ignore
/// fn ping() -> ModuleEntry {
///     ModuleEntry::controller("ping", &[], |_, _| async { Ok(serde_json::json!({})) })
/// }
/// menuet_core::register_module!(ping);
/// ```
#[macro_export]
macro_rules! register_module {
    ($define:path) => {
        $crate::inventory::submit! {
            $crate::module::ModuleRegistration::new($define)
        }
    };
}

/// The set of modules an application is built from.
#[derive(Clone, Default)]
pub struct ModuleManifest {
    entries: Vec<ModuleEntry>,
}

impl ModuleManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every module registered with [`register_module!`](crate::register_module).
    pub fn from_registrations() -> Self {
        let entries: Vec<_> = inventory::iter::<ModuleRegistration>
            .into_iter()
            .map(ModuleRegistration::entry)
            .collect();
        debug!(modules = entries.len(), "Collected registered modules");
        Self { entries }
    }

    pub fn with(mut self, entry: ModuleEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn push(&mut self, entry: ModuleEntry) {
        self.entries.push(entry);
    }

    pub fn extend(&mut self, other: ModuleManifest) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return the entries of `category`, sorted by path, with
    /// hidden paths (a segment starting with `.`) dropped.
    pub fn take(&mut self, category: Category) -> Vec<ModuleEntry> {
        let (mut taken, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| entry.category() == category);
        self.entries = rest;

        taken.retain(|entry| {
            let hidden = is_hidden_path(&entry.path);
            if hidden {
                trace!(path = entry.path.as_str(), "Skipping hidden module");
            }
            !hidden
        });
        taken.sort_by(|a, b| a.path.cmp(&b.path));
        taken
    }
}

fn is_hidden_path(path: &str) -> bool {
    path.split('/').any(|segment| segment.starts_with('.'))
}

/// Name a module is registered under when it has no explicit name.
///
/// Shared-namespace categories get the capitalized camel-case path plus the
/// category suffix (`user/profile` service becomes `UserProfileService`);
/// everything else keeps its path.
pub fn derive_name(category: Category, path: &str) -> String {
    match category.suffix() {
        Some(suffix) => format!("{}{}", camel(path, true), suffix),
        None => path.to_string(),
    }
}

/// Instantiates modules category by category into a [`Registry`].
pub struct ModuleLoader {
    registry: Arc<Registry>,
}

impl ModuleLoader {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Where modules of `category` look their dependencies up. Only
    /// categories loaded earlier are visible.
    pub fn getters(&self, category: Category) -> GetterChain {
        let builtins = self.registry.builtins().getter();
        let utilities = self.registry.utilities().getter();
        let models = self.registry.models().getter();
        let services = self.registry.services().getter();

        match category {
            Category::Builtin => GetterChain::new(),
            Category::Utility => GetterChain::new()
                .with("builtins", builtins)
                .with("utilities", utilities),
            Category::Model => GetterChain::new()
                .with("builtins", builtins)
                .with("utilities", utilities),
            Category::Service => GetterChain::new()
                .with("builtins", builtins)
                .with("utilities", utilities)
                .with("models", models),
            Category::Interceptor
            | Category::Controller
            | Category::Resolver
            | Category::Route
            | Category::Initializer => GetterChain::new()
                .with("builtins", builtins)
                .with("services", services)
                .with("utilities", utilities),
        }
    }

    /// Load one category. Its prerequisite category must already be loaded.
    pub fn load(&self, category: Category, entries: Vec<ModuleEntry>) -> Result<usize, Error> {
        if let Some(requires) = category.prerequisite() {
            if !self.registry.is_loaded(requires) {
                return Err(Error::LoadOrder {
                    category: category.as_str(),
                    requires: requires.as_str(),
                });
            }
        }

        let chain = self.getters(category);
        let count = entries.len();

        for entry in entries {
            if entry.category() != category {
                return Err(Error::Internal(format!(
                    "module {} is not one of the {category}",
                    entry.path
                )));
            }
            self.load_entry(entry, &chain)?;
        }

        self.registry.mark_loaded(category);
        info!(category = %category, count = count, "Modules loaded");
        Ok(count)
    }

    /// Load every module category in order, up to and including resolvers.
    /// Initializers are left in the manifest; they are bound once routes
    /// exist.
    pub fn load_manifest(&self, manifest: &mut ModuleManifest) -> Result<(), Error> {
        for category in [
            Category::Utility,
            Category::Model,
            Category::Service,
            Category::Interceptor,
            Category::Controller,
            Category::Resolver,
        ] {
            let entries = manifest.take(category);
            self.load(category, entries)?;
        }
        Ok(())
    }

    fn load_entry(&self, entry: ModuleEntry, chain: &GetterChain) -> Result<(), Error> {
        let category = entry.category();
        let origin = format!("{}/{}", category, entry.path);
        let name = entry
            .name
            .clone()
            .unwrap_or_else(|| derive_name(category, &entry.path));

        match entry.definition {
            Definition::Utility(provide) | Definition::Model(provide) | Definition::Service(provide) => {
                let capability = match provide {
                    Provide::Value(capability) => capability,
                    Provide::Factory(factory) => factory.resolve(&origin, chain)?.call(())?,
                };
                self.registry.register(category, &name, capability)
            }
            Definition::Interceptor(func) => {
                let bound = func.resolve(&origin, chain)?;
                self.registry.register_interceptor(&name, bound)
            }
            Definition::Controller(func) => {
                let bound = func.resolve(&origin, chain)?;
                self.registry.register_controller(&name, bound)
            }
            Definition::Controllers(members) => {
                for (member, func) in members {
                    let bound = func.resolve(&format!("{origin}.{member}"), chain)?;
                    self.registry
                        .register_controller(&format!("{name}.{member}"), bound)?;
                }
                Ok(())
            }
            Definition::DefaultResolver(func) => {
                let bound = func.resolve(&origin, chain)?;
                self.registry.set_default_resolver(bound)
            }
            Definition::ErrorResolver(func) => {
                let bound = func.resolve(&origin, chain)?;
                self.registry.set_error_resolver(bound)
            }
            Definition::Initializer(func) => {
                let bound = func.resolve(&origin, chain)?;
                self.registry.add_initializer(&name, bound)
            }
        }
    }
}
