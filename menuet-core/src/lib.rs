// Core library for the Menuet framework
// Capability registry, dependency resolution, module loading and the
// request pipeline.

pub mod application;
pub mod config;
pub mod context;
pub mod error;
pub mod fs_walk;
pub mod http;
pub mod inject;
pub mod logging;
pub mod module;
pub mod pipeline;
pub mod registry;
pub mod respond;
pub mod route;
pub mod routing;
pub mod shutdown;
pub mod status;
pub mod strings;
pub mod utils;
pub mod validator;

// Used by `register_module!`.
#[doc(hidden)]
pub use inventory;

// Re-export commonly used types
pub use application::{Application, ApplicationBuilder, ServerOptions};
pub use config::Config;
pub use context::RequestContext;
pub use error::{Error, Result};
pub use http::{CookieOptions, HttpMethod, HttpRequest, HttpResponse, Request, RequestHead, ResponseHandle};
pub use inject::{Bound, Dependencies, GetterChain, Injectable};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use module::{ModuleEntry, ModuleLoader, ModuleManifest};
pub use pipeline::{RoutePipeline, Stage};
pub use registry::{Capability, Category, Registry};
pub use respond::ResponseScope;
pub use route::{InterceptorSpec, RouteDefinition};
pub use routing::{Router, RouterOptions};
pub use shutdown::{RequestTracker, ServerState};
pub use status::HttpStatus;
pub use strings::Strings;
pub use utils::Utils;
pub use validator::{SchemaValidator, ValidationErrors, Validator, ValidatorSet};
