// Capability registry

use crate::Error;
use crate::inject::Getter;
use crate::logging::{debug, trace};
use crate::module::{ErrorResolver, Handler, Initializer, Interceptor, Resolver};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Names no module may register under.
pub const RESERVED_NAMES: &[&str] = &[
    "req", "res", "data", "error", "context", "options", "$config", "$string", "$utils",
];

/// A type-erased, shareable capability value.
#[derive(Clone)]
pub struct Capability(Arc<dyn Any + Send + Sync>);

impl Capability {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(value)
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.0).downcast::<T>().ok()
    }

    pub fn is<T: Any + Send + Sync>(&self) -> bool {
        self.0.is::<T>()
    }

    /// True when both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Capability) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Capability(..)")
    }
}

/// Module categories, in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Builtin,
    Utility,
    Model,
    Service,
    Interceptor,
    Controller,
    Resolver,
    Route,
    Initializer,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Builtin => "builtins",
            Category::Utility => "utilities",
            Category::Model => "models",
            Category::Service => "services",
            Category::Interceptor => "interceptors",
            Category::Controller => "controllers",
            Category::Resolver => "resolvers",
            Category::Route => "routes",
            Category::Initializer => "initializer",
        }
    }

    /// Suffix appended to derived names in the shared namespace.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Category::Utility => Some("Util"),
            Category::Model => Some("Model"),
            Category::Service => Some("Service"),
            _ => None,
        }
    }

    /// Categories registering into the process-wide namespace.
    pub fn is_global(&self) -> bool {
        matches!(
            self,
            Category::Builtin | Category::Utility | Category::Model | Category::Service
        )
    }

    /// The category that must be loaded before this one.
    pub fn prerequisite(&self) -> Option<Category> {
        match self {
            Category::Builtin | Category::Utility => None,
            Category::Model => Some(Category::Utility),
            Category::Service => Some(Category::Model),
            Category::Interceptor => Some(Category::Service),
            Category::Controller => Some(Category::Interceptor),
            Category::Resolver => Some(Category::Controller),
            Category::Route => Some(Category::Resolver),
            Category::Initializer => Some(Category::Route),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name to capability table for one category.
#[derive(Clone)]
pub struct CapabilityTable {
    category: Category,
    entries: Arc<RwLock<HashMap<String, Capability>>>,
}

impl CapabilityTable {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn get(&self, name: &str) -> Option<Capability> {
        self.entries.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// A getter reading this table live, so entries registered after the
    /// getter was created are still visible.
    pub fn getter(&self) -> Getter {
        let entries = Arc::clone(&self.entries);
        Arc::new(move |name: &str| entries.read().get(name).cloned())
    }

    fn insert(&self, name: String, capability: Capability) {
        self.entries.write().insert(name, capability);
    }
}

impl fmt::Debug for CapabilityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityTable")
            .field("category", &self.category)
            .field("names", &self.names())
            .finish()
    }
}

/// Every loaded module, by category.
///
/// Populated once by the module loader and sealed before the server starts;
/// registration after sealing is rejected.
pub struct Registry {
    reserved: RwLock<HashSet<String>>,
    builtins: CapabilityTable,
    utilities: CapabilityTable,
    models: CapabilityTable,
    services: CapabilityTable,
    interceptors: RwLock<HashMap<String, Interceptor>>,
    controllers: RwLock<HashMap<String, Handler>>,
    default_resolver: RwLock<Option<Resolver>>,
    error_resolver: RwLock<Option<ErrorResolver>>,
    initializers: RwLock<Vec<(String, Initializer)>>,
    loaded: RwLock<HashSet<Category>>,
    sealed: AtomicBool,
}

impl Registry {
    pub fn new() -> Self {
        debug!("Creating capability registry");
        Self {
            reserved: RwLock::new(RESERVED_NAMES.iter().map(|name| name.to_string()).collect()),
            builtins: CapabilityTable::new(Category::Builtin),
            utilities: CapabilityTable::new(Category::Utility),
            models: CapabilityTable::new(Category::Model),
            services: CapabilityTable::new(Category::Service),
            interceptors: RwLock::new(HashMap::new()),
            controllers: RwLock::new(HashMap::new()),
            default_resolver: RwLock::new(None),
            error_resolver: RwLock::new(None),
            initializers: RwLock::new(Vec::new()),
            loaded: RwLock::new(HashSet::from([Category::Builtin])),
            sealed: AtomicBool::new(false),
        }
    }

    /// Reserve an additional name (e.g. an embedder-provided builtin that is
    /// registered later).
    pub fn reserve(&self, name: &str) {
        self.reserved.write().insert(name.to_string());
    }

    /// Register a builtin capability such as `$config` or `$cache`.
    ///
    /// Builtins may fill reserved names but, like every other entry in the
    /// shared namespace, may be registered only once.
    pub fn register_builtin(&self, name: &str, capability: Capability) -> Result<(), Error> {
        self.ensure_open()?;
        if self.global_contains(name) {
            return Err(Error::DuplicateModuleName(name.to_string()));
        }
        self.reserved.write().insert(name.to_string());
        self.builtins.insert(name.to_string(), capability);
        debug!(name = name, "Builtin capability registered");
        Ok(())
    }

    /// Register a utility, model or service in the shared namespace.
    pub fn register(&self, category: Category, name: &str, capability: Capability) -> Result<(), Error> {
        self.ensure_open()?;
        let table = match category {
            Category::Utility => &self.utilities,
            Category::Model => &self.models,
            Category::Service => &self.services,
            other => {
                return Err(Error::Internal(format!(
                    "{other} do not register into the shared namespace"
                )));
            }
        };

        if self.reserved.read().contains(name) || self.global_contains(name) {
            return Err(Error::DuplicateModuleName(name.to_string()));
        }

        table.insert(name.to_string(), capability);
        debug!(category = %category, name = name, "Module registered");
        Ok(())
    }

    pub fn register_interceptor(&self, name: &str, interceptor: Interceptor) -> Result<(), Error> {
        self.ensure_open()?;
        let mut interceptors = self.interceptors.write();
        if interceptors.contains_key(name) {
            return Err(Error::DuplicateModuleName(name.to_string()));
        }
        interceptors.insert(name.to_string(), interceptor);
        debug!(name = name, "Interceptor registered");
        Ok(())
    }

    pub fn register_controller(&self, name: &str, handler: Handler) -> Result<(), Error> {
        self.ensure_open()?;
        let mut controllers = self.controllers.write();
        if controllers.contains_key(name) {
            return Err(Error::DuplicateModuleName(name.to_string()));
        }
        controllers.insert(name.to_string(), handler);
        debug!(name = name, "Controller registered");
        Ok(())
    }

    pub fn set_default_resolver(&self, resolver: Resolver) -> Result<(), Error> {
        self.ensure_open()?;
        let mut slot = self.default_resolver.write();
        if slot.is_some() {
            return Err(Error::DuplicateModuleName("defaultResolver".into()));
        }
        *slot = Some(resolver);
        Ok(())
    }

    pub fn set_error_resolver(&self, resolver: ErrorResolver) -> Result<(), Error> {
        self.ensure_open()?;
        let mut slot = self.error_resolver.write();
        if slot.is_some() {
            return Err(Error::DuplicateModuleName("errorResolver".into()));
        }
        *slot = Some(resolver);
        Ok(())
    }

    pub fn add_initializer(&self, name: &str, initializer: Initializer) -> Result<(), Error> {
        self.ensure_open()?;
        self.initializers.write().push((name.to_string(), initializer));
        Ok(())
    }

    /// Look a name up across the shared namespace.
    pub fn get(&self, name: &str) -> Option<Capability> {
        self.builtins
            .get(name)
            .or_else(|| self.utilities.get(name))
            .or_else(|| self.models.get(name))
            .or_else(|| self.services.get(name))
    }

    /// Typed lookup across the shared namespace.
    pub fn resolve<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, Error> {
        trace!(name = name, "Resolving capability");
        self.get(name)
            .and_then(|capability| capability.downcast::<T>())
            .ok_or_else(|| Error::ProviderNotFound(name.to_string()))
    }

    pub fn table(&self, category: Category) -> Option<&CapabilityTable> {
        match category {
            Category::Builtin => Some(&self.builtins),
            Category::Utility => Some(&self.utilities),
            Category::Model => Some(&self.models),
            Category::Service => Some(&self.services),
            _ => None,
        }
    }

    pub fn builtins(&self) -> &CapabilityTable {
        &self.builtins
    }

    pub fn utilities(&self) -> &CapabilityTable {
        &self.utilities
    }

    pub fn models(&self) -> &CapabilityTable {
        &self.models
    }

    pub fn services(&self) -> &CapabilityTable {
        &self.services
    }

    pub fn interceptor(&self, name: &str) -> Option<Interceptor> {
        self.interceptors.read().get(name).cloned()
    }

    pub fn controller(&self, name: &str) -> Option<Handler> {
        self.controllers.read().get(name).cloned()
    }

    pub fn controller_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.controllers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// The installed default resolver, or the identity resolver.
    pub fn default_resolver(&self) -> Resolver {
        self.default_resolver
            .read()
            .clone()
            .unwrap_or_else(crate::respond::identity_resolver)
    }

    /// The installed error resolver, or the built-in one.
    pub fn error_resolver(&self) -> ErrorResolver {
        self.error_resolver
            .read()
            .clone()
            .unwrap_or_else(|| crate::respond::default_error_resolver(self.get("$string")))
    }

    pub fn initializers(&self) -> Vec<(String, Initializer)> {
        self.initializers.read().clone()
    }

    pub fn mark_loaded(&self, category: Category) {
        self.loaded.write().insert(category);
    }

    pub fn is_loaded(&self, category: Category) -> bool {
        self.loaded.read().contains(&category)
    }

    /// Freeze the registry; further registration fails.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
        debug!(
            utilities = self.utilities.len(),
            models = self.models.len(),
            services = self.services.len(),
            interceptors = self.interceptors.read().len(),
            controllers = self.controllers.read().len(),
            "Registry sealed"
        );
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.is_sealed() {
            return Err(Error::Internal("registry is sealed".into()));
        }
        Ok(())
    }

    fn global_contains(&self, name: &str) -> bool {
        self.builtins.contains(name)
            || self.utilities.contains(name)
            || self.models.contains(name)
            || self.services.contains(name)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("builtins", &self.builtins.names())
            .field("utilities", &self.utilities.names())
            .field("models", &self.models.names())
            .field("services", &self.services.names())
            .field("controllers", &self.controller_names())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_downcast() {
        let capability = Capability::new(42u64);
        assert!(capability.is::<u64>());
        assert_eq!(*capability.downcast::<u64>().unwrap(), 42);
        assert!(capability.downcast::<String>().is_none());
    }

    #[test]
    fn test_capability_ptr_eq() {
        let a = Capability::new(String::from("x"));
        let b = a.clone();
        let c = Capability::new(String::from("x"));
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }

    #[test]
    fn test_duplicate_across_categories_fails() {
        let registry = Registry::new();
        registry
            .register(Category::Utility, "MailUtil", Capability::new(1u8))
            .unwrap();

        let err = registry
            .register(Category::Service, "MailUtil", Capability::new(2u8))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateModuleName(name) if name == "MailUtil"));

        // the first registration is untouched
        assert_eq!(*registry.resolve::<u8>("MailUtil").unwrap(), 1);
    }

    #[test]
    fn test_reserved_names_are_rejected() {
        let registry = Registry::new();
        registry.reserve("$mailer");
        for name in ["req", "context", "$config", "$mailer"] {
            let err = registry
                .register(Category::Model, name, Capability::new(()))
                .unwrap_err();
            assert!(matches!(err, Error::DuplicateModuleName(_)));
        }
    }

    #[test]
    fn test_builtins_fill_reserved_names_once() {
        let registry = Registry::new();
        registry
            .register_builtin("$config", Capability::new(String::from("cfg")))
            .unwrap();
        assert!(registry.register_builtin("$config", Capability::new(())).is_err());
        assert_eq!(*registry.resolve::<String>("$config").unwrap(), "cfg");
    }

    #[test]
    fn test_table_getter_is_live() {
        let registry = Registry::new();
        let getter = registry.utilities().getter();
        assert!(getter("StringUtil").is_none());

        registry
            .register(Category::Utility, "StringUtil", Capability::new(()))
            .unwrap();
        assert!(getter("StringUtil").is_some());
    }

    #[test]
    fn test_sealed_registry_rejects_registration() {
        let registry = Registry::new();
        registry.seal();
        assert!(registry.is_sealed());
        assert!(
            registry
                .register(Category::Service, "LateService", Capability::new(()))
                .is_err()
        );
    }

    #[test]
    fn test_category_prerequisites_follow_load_order() {
        let order = [
            Category::Utility,
            Category::Model,
            Category::Service,
            Category::Interceptor,
            Category::Controller,
            Category::Resolver,
            Category::Route,
            Category::Initializer,
        ];
        for pair in order.windows(2) {
            assert_eq!(pair[1].prerequisite(), Some(pair[0]));
        }
        assert!(Category::Service.is_global());
        assert!(!Category::Controller.is_global());
        assert_eq!(Category::Model.suffix(), Some("Model"));
    }
}
