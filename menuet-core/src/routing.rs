// Route table and request dispatch

use crate::Error;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Request, RequestHead, parse_cookies};
use crate::logging::{debug, info, trace};
use crate::module::ErrorResolver;
use crate::pipeline::{RoutePipeline, respond_error};
use crate::registry::Registry;
use crate::route::{RouteDefinition, WILDCARD_SCHEMA};
use crate::validator::{AcceptAll, Validator, ValidatorSet};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

pub const POWERED_BY: &str = "Menuet";

/// Default request body limit, in bytes.
pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024;

static BROWSER_USER_AGENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(Mozilla|Opera)/").expect("static pattern"));

#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Prefix every route is mounted under, e.g. `/api`.
    pub base_path: String,
    /// Answer browsers with permissive CORS headers and end `OPTIONS`
    /// requests immediately.
    pub allow_cross_domain: bool,
    pub body_limit: usize,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            allow_cross_domain: false,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl RouterOptions {
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn allow_cross_domain(mut self, allow: bool) -> Self {
        self.allow_cross_domain = allow;
        self
    }

    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: HttpMethod,
    pub path: String,
    pub pipeline: RoutePipeline,
}

/// Route table plus the request parsing in front of it.
pub struct Router {
    routes: Vec<Route>,
    options: RouterOptions,
    error_resolver: ErrorResolver,
}

impl Router {
    pub fn new(options: RouterOptions, error_resolver: ErrorResolver) -> Self {
        Self {
            routes: Vec::new(),
            options,
            error_resolver,
        }
    }

    /// Build the route table from definitions, failing on the first route
    /// that references something that does not exist. Disabled routes are
    /// dropped.
    pub fn build(
        definitions: Vec<RouteDefinition>,
        registry: &Registry,
        validators: &ValidatorSet,
        options: RouterOptions,
    ) -> Result<Self, Error> {
        info!(total = definitions.len(), "Total count of APIs");

        let mut router = Router::new(options, registry.error_resolver());
        let resolver = registry.default_resolver();

        for definition in definitions {
            if definition.disabled {
                debug!(path = definition.path.as_str(), "Route disabled");
                continue;
            }
            let route = build_route(definition, registry, validators, &resolver, &router.error_resolver)?;
            router.add_route(route);
        }

        Ok(router)
    }

    pub fn add_route(&mut self, route: Route) {
        trace!(method = %route.method, path = route.path.as_str(), "Route added");
        self.routes.push(route);
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Find the first route matching `method` and `path`. `HEAD` falls back
    /// to `GET` routes.
    pub fn find(&self, method: HttpMethod, path: &str) -> Option<(&Route, HashMap<String, String>)> {
        let lookup = |wanted: HttpMethod| {
            self.routes
                .iter()
                .filter(|route| route.method == wanted)
                .find_map(|route| match_path(&route.path, path).map(|params| (route, params)))
        };

        lookup(method).or_else(|| {
            if method == HttpMethod::HEAD {
                lookup(HttpMethod::GET)
            } else {
                None
            }
        })
    }

    /// Serve a raw request.
    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        let cors = self.options.allow_cross_domain
            && request
                .header("user-agent")
                .map(|agent| BROWSER_USER_AGENT.is_match(agent))
                .unwrap_or(false);

        let mut response = if self.options.allow_cross_domain && request.method.eq_ignore_ascii_case("OPTIONS") {
            HttpResponse::ok()
        } else {
            self.dispatch(request).await
        };

        response.set_header("X-Powered-By", POWERED_BY);
        if cors {
            response.set_header("Access-Control-Allow-Origin", "*");
            response.set_header("Access-Control-Allow-Methods", "*");
            response.set_header(
                "Access-Control-Allow-Headers",
                "Authorization,X-Requested-With,Content-Type",
            );
        }
        response
    }

    async fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        let accept = request.header("accept").map(str::to_string);

        let Some(method) = HttpMethod::from_str(&request.method) else {
            return not_found(accept.as_deref());
        };
        let Some(route_path) = strip_base(&self.options.base_path, request.path()) else {
            return not_found(accept.as_deref());
        };
        let Some((route, params)) = self.find(method, route_path) else {
            debug!(method = %method, path = request.path(), "No route matched");
            return not_found(accept.as_deref());
        };

        let query = parse_query(request.query_string());
        let cookies = request
            .header("cookie")
            .map(parse_cookies)
            .unwrap_or_default();
        let head = RequestHead {
            method,
            url: request.uri.clone(),
            path: request.path().to_string(),
            headers: request.headers.clone(),
            cookies,
            remote_addr: request.remote_addr,
        };

        let body = if request.body_over_limit || request.body.len() > self.options.body_limit {
            Err(Error::PayloadTooLarge(format!(
                "request body exceeds {} bytes",
                self.options.body_limit
            )))
        } else {
            parse_body(request.header("content-type"), &request.body)
        };
        let body = match body {
            Ok(body) => body,
            Err(err) => return respond_error(&self.error_resolver, Arc::new(head), query, err).await,
        };

        let mut parsed = Request::new(head);
        parsed.params = params
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        parsed.query = query;
        parsed.body = body;

        let mut response = route.pipeline.run(parsed).await;
        if method == HttpMethod::HEAD {
            response.body.clear();
        }
        response
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .field("options", &self.options)
            .finish()
    }
}

fn build_route(
    definition: RouteDefinition,
    registry: &Registry,
    validators: &ValidatorSet,
    resolver: &crate::module::Resolver,
    error_resolver: &ErrorResolver,
) -> Result<Route, Error> {
    let path = definition.path.clone();
    let invalid = |reason: &str| Error::InvalidRoute {
        path: path.clone(),
        reason: reason.to_string(),
    };

    let method = definition
        .method
        .as_deref()
        .ok_or_else(|| invalid("method is required"))?;
    let method = HttpMethod::from_str(method)
        .ok_or_else(|| invalid(&format!("unsupported method {method}")))?;

    let handler_name = definition
        .handler
        .as_deref()
        .ok_or_else(|| invalid("handler is required"))?;
    let handler = registry
        .controller(handler_name)
        .ok_or_else(|| Error::HandlerNotFound {
            path: path.clone(),
            handler: handler_name.to_string(),
        })?;

    let mut pipeline = RoutePipeline::new(handler, resolver.clone(), error_resolver.clone());

    for spec in &definition.interceptors {
        let interceptor = registry
            .interceptor(spec.name())
            .ok_or_else(|| Error::InterceptorNotFound {
                path: path.clone(),
                name: spec.name().to_string(),
            })?;
        pipeline = pipeline.with_interceptor(spec.name(), spec.options(), interceptor);
    }

    let schema = |name: &Option<String>| -> Result<Option<Validator>, Error> {
        name.as_deref()
            .map(|name| lookup_validator(validators.get(name), &path, name))
            .transpose()
    };

    if let Some(validator) = schema(&definition.params)? {
        pipeline = pipeline.params(validator);
    }
    if let Some(validator) = schema(&definition.query)? {
        pipeline = pipeline.query(validator);
    }
    if let Some(validator) = schema(&definition.body)? {
        pipeline = pipeline.body(validator);
    }
    if let Some(name) = definition.response.as_deref() {
        pipeline = pipeline.response(lookup_validator(validators.get_response(name), &path, name)?);
    }

    debug!(method = %method, path = path.as_str(), handler = handler_name, "Route built");
    Ok(Route {
        method,
        path: definition.path,
        pipeline,
    })
}

fn lookup_validator(found: Option<Validator>, path: &str, name: &str) -> Result<Validator, Error> {
    if name == WILDCARD_SCHEMA {
        return Ok(Arc::new(AcceptAll));
    }
    found.ok_or_else(|| Error::SchemaNotFound {
        schema: path.to_string(),
        reference: name.to_string(),
    })
}

/// Match a route path pattern against a request path.
/// Returns Some(params) if matched, None otherwise.
pub fn match_path(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if pattern_parts.len() != path_parts.len() {
        return None;
    }

    let mut params = HashMap::new();

    for (pattern_part, path_part) in pattern_parts.iter().zip(path_parts.iter()) {
        if let Some(param_name) = pattern_part.strip_prefix(':') {
            let value = urlencoding::decode(path_part)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| path_part.to_string());
            params.insert(param_name.to_string(), value);
        } else if pattern_part != path_part {
            return None;
        }
    }

    Some(params)
}

/// The path below `base`, or None when the request is outside it.
fn strip_base<'a>(base: &str, path: &'a str) -> Option<&'a str> {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return Some(path);
    }
    match path.strip_prefix(base) {
        Some("") => Some("/"),
        Some(rest) if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

/// Parse a query string. Repeated keys collect into an array.
pub fn parse_query(query: &str) -> Map<String, Value> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_else(|e| {
        debug!(error = %e, "Unparseable query string ignored");
        Vec::new()
    });

    let mut map = Map::new();
    for (key, value) in pairs {
        match map.get_mut(&key) {
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                map.insert(key, Value::String(value));
            }
        }
    }
    map
}

/// Decode a request body by content type. An empty body is `{}`.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Result<Value, Error> {
    if body.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let media_type = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if media_type == "application/json" || media_type.ends_with("+json") {
        return serde_json::from_slice(body)
            .map_err(|e| Error::BadRequest(format!("invalid JSON body: {e}")));
    }
    if media_type == "application/x-www-form-urlencoded" {
        let text = std::str::from_utf8(body)
            .map_err(|e| Error::BadRequest(format!("invalid form body: {e}")))?;
        return Ok(Value::Object(parse_query(text)));
    }
    if media_type.starts_with("text/") {
        return Ok(Value::String(String::from_utf8_lossy(body).into_owned()));
    }

    Ok(Value::Object(Map::new()))
}

/// True when the client accepts JSON or HTML (or states no preference).
fn accepts_json_or_html(accept: Option<&str>) -> bool {
    let Some(accept) = accept else {
        return true;
    };
    accept
        .split(',')
        .filter_map(|entry| entry.split(';').next())
        .map(str::trim)
        .any(|media| {
            matches!(
                media,
                "*/*" | "application/*" | "text/*" | "application/json" | "text/html"
            )
        })
}

fn not_found(accept: Option<&str>) -> HttpResponse {
    if accepts_json_or_html(accept) {
        HttpResponse::not_found()
            .with_json(&Value::Object(Map::new()))
            .unwrap_or_else(|_| HttpResponse::not_found())
    } else {
        HttpResponse::not_found()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_match_path() {
        let params = match_path("/users/:id/notes/:note", "/users/42/notes/a%20b").unwrap();
        assert_eq!(params["id"], "42");
        assert_eq!(params["note"], "a b");
        assert!(match_path("/users/:id", "/users").is_none());
        assert!(match_path("/users/:id", "/posts/1").is_none());
        assert!(match_path("/ping", "/ping/").is_some());
    }

    #[test]
    fn test_strip_base() {
        assert_eq!(strip_base("", "/ping"), Some("/ping"));
        assert_eq!(strip_base("/api", "/api/ping"), Some("/ping"));
        assert_eq!(strip_base("/api/", "/api"), Some("/"));
        assert_eq!(strip_base("/api", "/apiary"), None);
        assert_eq!(strip_base("/api", "/ping"), None);
    }

    #[test]
    fn test_parse_query_repeated_keys() {
        let query = parse_query("tag=a&tag=b&tag=c&page=2&q=hello%20world");
        assert_eq!(query["tag"], json!(["a", "b", "c"]));
        assert_eq!(query["page"], "2");
        assert_eq!(query["q"], "hello world");
        assert!(parse_query("").is_empty());
    }

    #[test]
    fn test_parse_body_by_content_type() {
        assert_eq!(parse_body(None, b"").unwrap(), json!({}));
        assert_eq!(
            parse_body(Some("application/json; charset=utf-8"), br#"{"a":1}"#).unwrap(),
            json!({"a": 1})
        );
        assert_eq!(
            parse_body(Some("application/x-www-form-urlencoded"), b"a=1&b=x").unwrap(),
            json!({"a": "1", "b": "x"})
        );
        assert_eq!(parse_body(Some("text/plain"), b"hi").unwrap(), json!("hi"));
        assert_eq!(parse_body(Some("application/octet-stream"), b"\x00").unwrap(), json!({}));
        assert!(matches!(
            parse_body(Some("application/json"), b"{"),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn test_accept_negotiation_for_404() {
        assert!(accepts_json_or_html(None));
        assert!(accepts_json_or_html(Some("text/html,application/xhtml+xml;q=0.9")));
        assert!(accepts_json_or_html(Some("application/json")));
        assert!(accepts_json_or_html(Some("*/*")));
        assert!(!accepts_json_or_html(Some("image/png")));

        assert_eq!(not_found(Some("image/png")).body, Vec::<u8>::new());
        assert_eq!(not_found(Some("application/json")).body, b"{}");
    }
}
