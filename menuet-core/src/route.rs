//! Route definitions as declared in route files.
//!
//! A route file holds either a bare array of definitions or an object with
//! a `routes` array:
//!
//! ```json
//! [
//!   {
//!     "method": "post",
//!     "path": "/users/:id/notes",
//!     "handler": "user.addNote",
//!     "params": "user/id",
//!     "body": "note/create",
//!     "response": "*",
//!     "interceptors": ["auth", {"name": "rateLimit", "options": {"max": 10}}]
//!   }
//! ]
//! ```

use crate::Error;
use crate::fs_walk;
use crate::logging::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Schema name meaning "accept anything unchanged".
pub const WILDCARD_SCHEMA: &str = "*";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDefinition {
    /// Required; checked when the router is built so the error can name the
    /// route.
    #[serde(default)]
    pub method: Option<String>,
    pub path: String,
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub params: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub interceptors: Vec<InterceptorSpec>,
    #[serde(default)]
    pub disabled: bool,
}

impl RouteDefinition {
    pub fn new(method: &str, path: &str, handler: &str) -> Self {
        Self {
            method: Some(method.to_string()),
            path: path.to_string(),
            handler: Some(handler.to_string()),
            params: None,
            query: None,
            body: None,
            response: None,
            interceptors: Vec::new(),
            disabled: false,
        }
    }

    pub fn params(mut self, schema: &str) -> Self {
        self.params = Some(schema.to_string());
        self
    }

    pub fn query(mut self, schema: &str) -> Self {
        self.query = Some(schema.to_string());
        self
    }

    pub fn body(mut self, schema: &str) -> Self {
        self.body = Some(schema.to_string());
        self
    }

    pub fn response(mut self, schema: &str) -> Self {
        self.response = Some(schema.to_string());
        self
    }

    pub fn intercept(mut self, spec: InterceptorSpec) -> Self {
        self.interceptors.push(spec);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// An interceptor reference: a bare name or a name with options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InterceptorSpec {
    Name(String),
    Configured {
        name: String,
        #[serde(default)]
        options: Value,
    },
}

impl InterceptorSpec {
    pub fn name(&self) -> &str {
        match self {
            InterceptorSpec::Name(name) | InterceptorSpec::Configured { name, .. } => name,
        }
    }

    pub fn options(&self) -> Value {
        match self {
            InterceptorSpec::Name(_) => Value::Null,
            InterceptorSpec::Configured { options, .. } => options.clone(),
        }
    }
}

impl From<&str> for InterceptorSpec {
    fn from(name: &str) -> Self {
        InterceptorSpec::Name(name.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RouteFile {
    List(Vec<RouteDefinition>),
    Wrapped { routes: Vec<RouteDefinition> },
}

/// Parse one route file's content.
pub fn parse_routes(value: Value) -> Result<Vec<RouteDefinition>, Error> {
    match serde_json::from_value::<RouteFile>(value) {
        Ok(RouteFile::List(routes)) | Ok(RouteFile::Wrapped { routes }) => Ok(routes),
        Err(e) => Err(Error::Config(format!("invalid route definitions: {e}"))),
    }
}

/// Read every route file under `dir`, in path order. A missing directory
/// yields no routes.
pub fn load_routes(dir: &Path) -> Result<Vec<RouteDefinition>, Error> {
    if !dir.exists() {
        debug!(dir = %dir.display(), "No routes directory");
        return Ok(Vec::new());
    }

    let mut routes = Vec::new();
    for file in fs_walk::read_json_dir(dir)? {
        let parsed = parse_routes(file.value)
            .map_err(|e| Error::Config(format!("{}: {e}", file.path.display())))?;
        debug!(file = file.name.as_str(), routes = parsed.len(), "Route file read");
        routes.extend(parsed);
    }

    info!(routes = routes.len(), "Route definitions loaded");
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_both_file_shapes() {
        let bare = parse_routes(json!([{"method": "get", "path": "/ping", "handler": "ping"}])).unwrap();
        let wrapped = parse_routes(json!({"routes": [{"method": "get", "path": "/ping", "handler": "ping"}]})).unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare[0], RouteDefinition::new("get", "/ping", "ping"));
    }

    #[test]
    fn test_interceptor_specs() {
        let routes = parse_routes(json!([{
            "method": "post",
            "path": "/notes",
            "handler": "note.create",
            "interceptors": ["auth", {"name": "limit", "options": {"max": 3}}]
        }]))
        .unwrap();

        let specs = &routes[0].interceptors;
        assert_eq!(specs[0].name(), "auth");
        assert_eq!(specs[0].options(), Value::Null);
        assert_eq!(specs[1].name(), "limit");
        assert_eq!(specs[1].options(), json!({"max": 3}));
    }

    #[test]
    fn test_missing_method_still_parses() {
        let routes = parse_routes(json!([{"path": "/x", "handler": "x", "disabled": true}])).unwrap();
        assert_eq!(routes[0].method, None);
        assert!(routes[0].disabled);
    }

    #[test]
    fn test_load_routes_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("user")).unwrap();
        std::fs::write(
            dir.path().join("user/routes.json"),
            r#"{"routes": [{"method": "get", "path": "/users", "handler": "user.list"}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"[{"method": "get", "path": "/ping", "handler": "ping"}]"#,
        )
        .unwrap();

        let routes = load_routes(dir.path()).unwrap();
        let paths: Vec<_> = routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/ping", "/users"]);

        assert!(load_routes(&dir.path().join("missing")).unwrap().is_empty());
    }
}
