// HTTP request and response types

use crate::Error;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// HTTP methods
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "DELETE" => Some(HttpMethod::DELETE),
            "PATCH" => Some(HttpMethod::PATCH),
            "HEAD" => Some(HttpMethod::HEAD),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw inbound request, before routing.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    /// Path plus query string, as received.
    pub uri: String,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    /// Set when the server stopped reading because the body passed the
    /// configured limit; `body` is then empty.
    pub body_over_limit: bool,
    pub remote_addr: Option<SocketAddr>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            headers: HashMap::new(),
            body: Vec::new(),
            body_over_limit: false,
            remote_addr: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(value)?;
        self.headers
            .insert("content-type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Path component of the URI.
    pub fn path(&self) -> &str {
        self.uri.split('?').next().unwrap_or("")
    }

    /// Query component of the URI, without the `?`.
    pub fn query_string(&self) -> &str {
        self.uri.split_once('?').map(|(_, query)| query).unwrap_or("")
    }
}

/// HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Repeatable headers (`Set-Cookie`) appear once per value.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(value)?;
        self.set_header("Content-Type", "application/json; charset=utf-8");
        Ok(self)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace every header with this name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Parse the body as JSON
    pub fn json(&self) -> Result<Value, Error> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Immutable facts about a request, shared by every pipeline stage.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: HttpMethod,
    pub url: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    pub remote_addr: Option<SocketAddr>,
}

impl RequestHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

/// The request as it moves through the pipeline.
///
/// Interceptors take it by value and hand it back, possibly with extra
/// params, query keys or attributes.
#[derive(Debug, Clone)]
pub struct Request {
    head: Arc<RequestHead>,
    pub params: Map<String, Value>,
    pub query: Map<String, Value>,
    pub body: Value,
    attributes: Map<String, Value>,
}

impl Request {
    pub fn new(head: RequestHead) -> Self {
        Self {
            head: Arc::new(head),
            params: Map::new(),
            query: Map::new(),
            body: Value::Object(Map::new()),
            attributes: Map::new(),
        }
    }

    pub fn head(&self) -> &Arc<RequestHead> {
        &self.head
    }

    pub fn method(&self) -> HttpMethod {
        self.head.method
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.header(name)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.head.cookie(name)
    }

    /// Attach a value for later stages (e.g. the authenticated user).
    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }
}

/// `Set-Cookie` attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    pub max_age: Option<u64>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
}

impl CookieOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn same_site(mut self, same_site: impl Into<String>) -> Self {
        self.same_site = Some(same_site.into());
        self
    }

    /// Render a `Set-Cookie` header value.
    pub fn serialize(&self, name: &str, value: &str) -> String {
        let mut cookie = format!("{}={}", name, urlencoding::encode(value));
        if let Some(max_age) = self.max_age {
            cookie.push_str(&format!("; Max-Age={max_age}"));
        }
        if let Some(domain) = &self.domain {
            cookie.push_str(&format!("; Domain={domain}"));
        }
        cookie.push_str(&format!("; Path={}", self.path.as_deref().unwrap_or("/")));
        if let Some(same_site) = &self.same_site {
            cookie.push_str(&format!("; SameSite={same_site}"));
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        cookie
    }
}

/// Parse a `Cookie` header into name/value pairs.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches('"');
            let value = urlencoding::decode(value)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| value.to_string());
            Some((name.to_string(), value))
        })
        .collect()
}

#[derive(Debug)]
struct ResponseState {
    status: u16,
    headers: Vec<(String, String)>,
    finished: Option<HttpResponse>,
}

/// Shared, mutable view of the response under construction.
///
/// Handlers reach it through the request context to set the status, add
/// headers and cookies, or finish the response themselves.
#[derive(Debug, Clone)]
pub struct ResponseHandle {
    state: Arc<Mutex<ResponseState>>,
}

impl ResponseHandle {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ResponseState {
                status: 200,
                headers: Vec::new(),
                finished: None,
            })),
        }
    }

    pub fn status(&self) -> u16 {
        self.state.lock().status
    }

    pub fn set_status(&self, status: u16) {
        self.state.lock().status = status;
    }

    /// Replace every header with this name.
    pub fn set_header(&self, name: &str, value: impl Into<String>) {
        let mut state = self.state.lock();
        state.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        state.headers.push((name.to_string(), value.into()));
    }

    pub fn append_header(&self, name: &str, value: impl Into<String>) {
        self.state.lock().headers.push((name.to_string(), value.into()));
    }

    pub fn set_cookie(&self, name: &str, value: &str, options: &CookieOptions) {
        self.append_header("Set-Cookie", options.serialize(name, value));
    }

    /// Finish the response with a raw body; the pipeline will not write
    /// anything further.
    pub fn finish(&self, content_type: &str, body: Vec<u8>) {
        let mut state = self.state.lock();
        let mut response = HttpResponse::new(state.status).with_body(body);
        response.headers = state.headers.clone();
        response.set_header("Content-Type", content_type);
        state.finished = Some(response);
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().finished.is_some()
    }

    /// Produce the final response, with `payload` as a JSON body unless the
    /// handler already finished it.
    pub fn into_response(self, payload: &Value) -> Result<HttpResponse, Error> {
        let mut state = self.state.lock();
        if let Some(finished) = state.finished.take() {
            return Ok(finished);
        }
        let mut response = HttpResponse::new(state.status);
        response.headers = std::mem::take(&mut state.headers);
        response.with_json(payload)
    }
}

impl Default for ResponseHandle {
    fn default() -> Self {
        Self::new()
    }
}
