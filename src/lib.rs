// Menuet - module wiring and request processing for JSON APIs
//
// Modules declare the names of what they need and are wired by name;
// routes run a fixed pipeline of interceptors, schema validation, the
// handler and a resolver.

pub mod bootstrap;

pub use bootstrap::{Menuet, MenuetApp};

// Re-export core functionality
pub use menuet_core::*;

pub use menuet_cache;
pub use menuet_config;
pub use menuet_validation;

// Prelude for common imports
pub mod prelude {
    pub use crate::bootstrap::{Menuet, MenuetApp};
    pub use menuet_cache::{Cache, CacheClient};
    pub use menuet_core::{
        Application, CookieOptions, Dependencies, Error, HttpMethod, HttpRequest, HttpResponse,
        ModuleEntry, ModuleManifest, Request, RequestContext, ResponseScope, RouteDefinition,
        Strings, Utils, register_module,
    };
    pub use menuet_core::config::Config;
    pub use menuet_core::registry::Category;
}
