//! Name-based dependency resolution.
//!
//! A callable declares the names of the collaborators it needs up front
//! ([`Injectable::new`]). [`Injectable::resolve`] looks every name up in an
//! ordered [`GetterChain`] and returns a [`Bound`] callable with those
//! collaborators pre-bound. Resolution happens once, at load time; if any
//! name is missing the target is never invoked.
//!
//! ```
//! use menuet_core::inject::{GetterChain, Injectable};
//! use menuet_core::registry::Capability;
//! use std::collections::HashMap;
//!
//! let mut values = HashMap::new();
//! values.insert("greeting".to_string(), Capability::new(String::from("hello")));
//! let chain = GetterChain::new().with_values("builtins", values);
//!
//! let greet = Injectable::new(&["greeting"], |deps, name: &'static str| {
//!     let greeting = deps.get::<String>("greeting").unwrap();
//!     format!("{greeting}, {name}")
//! });
//!
//! let bound = greet.resolve("greeter", &chain).unwrap();
//! assert_eq!(bound.call("world"), "hello, world");
//! ```

use crate::Error;
use crate::logging::{debug, trace};
use crate::registry::Capability;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Looks up one capability by name.
pub type Getter = Arc<dyn Fn(&str) -> Option<Capability> + Send + Sync>;

/// Ordered list of getters; the first one that yields a value wins.
#[derive(Clone, Default)]
pub struct GetterChain {
    getters: Vec<(String, Getter)>,
}

impl GetterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a getter. `label` only shows up in logs.
    pub fn with(mut self, label: impl Into<String>, getter: Getter) -> Self {
        self.getters.push((label.into(), getter));
        self
    }

    /// Append a fixed name/value map.
    pub fn with_values(self, label: impl Into<String>, values: HashMap<String, Capability>) -> Self {
        let values = Arc::new(values);
        self.with(label, Arc::new(move |name: &str| values.get(name).cloned()))
    }

    pub fn lookup(&self, name: &str) -> Option<Capability> {
        for (label, getter) in &self.getters {
            if let Some(found) = getter(name) {
                trace!(name = name, getter = label.as_str(), "Dependency found");
                return Some(found);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.getters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.getters.is_empty()
    }
}

impl fmt::Debug for GetterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<_> = self.getters.iter().map(|(label, _)| label.as_str()).collect();
        f.debug_struct("GetterChain").field("getters", &labels).finish()
    }
}

/// Collaborators bound to a callable, in declaration order.
#[derive(Clone, Default)]
pub struct Dependencies {
    bound: Arc<Vec<(String, Capability)>>,
}

impl Dependencies {
    /// Downcast the collaborator declared as `name`.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, Error> {
        let capability = self
            .capability(name)
            .ok_or_else(|| Error::ProviderNotFound(format!("{name} was not declared as a dependency")))?;

        capability.downcast::<T>().ok_or_else(|| {
            Error::ProviderNotFound(format!(
                "{name} is not a {}",
                std::any::type_name::<T>()
            ))
        })
    }

    pub fn capability(&self, name: &str) -> Option<&Capability> {
        self.bound
            .iter()
            .find(|(bound_name, _)| bound_name == name)
            .map(|(_, capability)| capability)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bound.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

type InjectFn<A, R> = Arc<dyn Fn(&Dependencies, A) -> R + Send + Sync>;

/// A callable plus the collaborator names it requires.
pub struct Injectable<A, R> {
    requires: Arc<[String]>,
    func: InjectFn<A, R>,
}

impl<A, R> Clone for Injectable<A, R> {
    fn clone(&self) -> Self {
        Self {
            requires: Arc::clone(&self.requires),
            func: Arc::clone(&self.func),
        }
    }
}

impl<A, R> Injectable<A, R> {
    pub fn new<F>(requires: &[&str], func: F) -> Self
    where
        F: Fn(&Dependencies, A) -> R + Send + Sync + 'static,
    {
        Self {
            requires: requires.iter().map(|name| name.to_string()).collect(),
            func: Arc::new(func),
        }
    }

    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    /// Bind every required name through `chain`.
    ///
    /// `origin` identifies the module being wired and appears in the error
    /// when a name cannot be satisfied.
    pub fn resolve(&self, origin: &str, chain: &GetterChain) -> Result<Bound<A, R>, Error> {
        let mut bound = Vec::with_capacity(self.requires.len());

        for name in self.requires.iter() {
            let capability = chain.lookup(name).ok_or_else(|| Error::DependencyResolution {
                parameter: name.clone(),
                origin: origin.to_string(),
            })?;
            bound.push((name.clone(), capability));
        }

        debug!(origin = origin, dependencies = bound.len(), "Dependencies resolved");

        Ok(Bound {
            deps: Dependencies {
                bound: Arc::new(bound),
            },
            func: Arc::clone(&self.func),
        })
    }
}

impl<A, R> fmt::Debug for Injectable<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injectable")
            .field("requires", &self.requires)
            .finish()
    }
}

/// A callable whose collaborators have been resolved.
pub struct Bound<A, R> {
    deps: Dependencies,
    func: InjectFn<A, R>,
}

impl<A, R> Clone for Bound<A, R> {
    fn clone(&self) -> Self {
        Self {
            deps: self.deps.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<A, R> Bound<A, R> {
    /// Wrap a callable that needs no collaborators.
    pub fn from_fn<F>(func: F) -> Self
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        Self {
            deps: Dependencies::default(),
            func: Arc::new(move |_: &Dependencies, args: A| func(args)),
        }
    }

    /// Invoke with the call-specific arguments.
    pub fn call(&self, args: A) -> R {
        (self.func)(&self.deps, args)
    }

    pub fn dependencies(&self) -> &Dependencies {
        &self.deps
    }
}

impl<A, R> fmt::Debug for Bound<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bound").field("deps", &self.deps).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Mailer {
        sender: String,
    }

    fn chain() -> GetterChain {
        let mut first = HashMap::new();
        first.insert(
            "mailer".to_string(),
            Capability::new(Mailer {
                sender: "first".into(),
            }),
        );
        let mut second = HashMap::new();
        second.insert(
            "mailer".to_string(),
            Capability::new(Mailer {
                sender: "second".into(),
            }),
        );
        second.insert("limit".to_string(), Capability::new(10u32));

        GetterChain::new()
            .with_values("first", first)
            .with_values("second", second)
    }

    #[test]
    fn test_first_getter_wins() {
        let target = Injectable::new(&["mailer", "limit"], |deps, _: ()| {
            let mailer = deps.get::<Mailer>("mailer").unwrap();
            let limit = deps.get::<u32>("limit").unwrap();
            format!("{}:{}", mailer.sender, limit)
        });

        let bound = target.resolve("test", &chain()).unwrap();
        assert_eq!(bound.call(()), "first:10");
    }

    #[test]
    fn test_missing_dependency_fails_before_invocation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let target = Injectable::new(&["mailer", "smsGateway"], move |_, _: ()| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let err = target.resolve("services/notify", &chain()).unwrap_err();
        match err {
            Error::DependencyResolution { parameter, origin } => {
                assert_eq!(parameter, "smsGateway");
                assert_eq!(origin, "services/notify");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let target = Injectable::new(&["mailer"], |_, _: ()| ());
        let chain = chain();

        let a = target.resolve("a", &chain).unwrap();
        let b = target.resolve("b", &chain).unwrap();

        let first = a.dependencies().capability("mailer").unwrap();
        let second = b.dependencies().capability("mailer").unwrap();
        assert!(first.ptr_eq(second));
    }

    #[test]
    fn test_call_arguments_follow_dependencies() {
        let target = Injectable::new(&["limit"], |deps, requested: u32| {
            let limit = deps.get::<u32>("limit").unwrap();
            requested.min(*limit)
        });
        let bound = target.resolve("test", &chain()).unwrap();

        assert_eq!(bound.call(3), 3);
        assert_eq!(bound.call(30), 10);
    }

    #[test]
    fn test_undeclared_or_mistyped_dependency() {
        let target = Injectable::new(&["limit"], |deps, _: ()| {
            (
                deps.get::<u32>("mailer").is_err(),
                deps.get::<String>("limit").is_err(),
            )
        });
        let bound = target.resolve("test", &chain()).unwrap();
        assert_eq!(bound.call(()), (true, true));
    }

    #[test]
    fn test_from_fn_has_no_dependencies() {
        let double = Bound::from_fn(|n: i32| n * 2);
        assert!(double.dependencies().is_empty());
        assert_eq!(double.call(21), 42);
    }
}
