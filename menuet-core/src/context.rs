// Request context handed to controllers

use crate::Error;
use crate::http::{CookieOptions, HttpMethod, Request, RequestHead, ResponseHandle};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Attribute key under which authentication interceptors store the token.
pub const ACCESS_TOKEN: &str = "accessToken";
/// Attribute key under which authentication interceptors store the user.
pub const USER_INFO: &str = "user";

static IPV4_MAPPED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^((0000:0000:0000:0000:0000|:):ffff:)?(\d+\.\d+\.\d+\.\d+)$")
        .expect("static pattern")
});

/// Everything a controller may read from the request, plus write access to
/// the response (status, headers, cookies).
///
/// `params`, `query` and `body` hold the validated values.
#[derive(Debug, Clone)]
pub struct RequestContext {
    head: Arc<RequestHead>,
    pub params: Map<String, Value>,
    pub query: Map<String, Value>,
    pub body: Value,
    attributes: Map<String, Value>,
    response: ResponseHandle,
}

impl RequestContext {
    pub fn new(request: Request, response: ResponseHandle) -> Self {
        let head = Arc::clone(request.head());
        let attributes = request.attributes().clone();
        Self {
            head,
            params: request.params,
            query: request.query,
            body: request.body,
            attributes,
            response,
        }
    }

    /// Request header lookup (case-insensitive). `referrer` and `referer`
    /// are interchangeable.
    pub fn get(&self, field: &str) -> Option<&str> {
        let field = field.to_ascii_lowercase();
        match field.as_str() {
            "referer" | "referrer" => self
                .head
                .header("referer")
                .or_else(|| self.head.header("referrer")),
            _ => self.head.header(&field),
        }
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.head.headers
    }

    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.head.cookies
    }

    /// Set a response cookie.
    pub fn cookie(&self, key: &str, value: &str, options: &CookieOptions) -> &Self {
        self.response.set_cookie(key, value, options);
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.head.method
    }

    pub fn url(&self) -> &str {
        &self.head.url
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.get("user-agent")
    }

    pub fn referrer(&self) -> Option<&str> {
        self.get("referer")
    }

    /// Client address: `X-Forwarded-For`, then `X-Real-IP`, then the socket
    /// peer. IPv4-mapped IPv6 addresses are reported as plain IPv4.
    pub fn remote_addr(&self) -> Option<String> {
        let address = self
            .get("x-forwarded-for")
            .map(str::to_string)
            .or_else(|| self.get("x-real-ip").map(str::to_string))
            .or_else(|| self.head.remote_addr.map(|addr| addr.ip().to_string()))?;

        Some(
            IPV4_MAPPED
                .captures(&address)
                .and_then(|caps| caps.get(3))
                .map(|ipv4| ipv4.as_str().to_string())
                .unwrap_or(address),
        )
    }

    pub fn access_token(&self) -> Option<&str> {
        self.attributes.get(ACCESS_TOKEN).and_then(Value::as_str)
    }

    pub fn user(&self) -> Option<&Value> {
        self.attributes.get(USER_INFO)
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn response(&self) -> &ResponseHandle {
        &self.response
    }

    pub fn head(&self) -> &Arc<RequestHead> {
        &self.head
    }

    /// Deserialize the validated body into a typed value.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_value(self.body.clone()).map_err(|e| Error::BadRequest(e.to_string()))
    }

    /// Deserialize the validated query into a typed value.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_value(Value::Object(self.query.clone()))
            .map_err(|e| Error::BadRequest(e.to_string()))
    }

    /// Deserialize the validated path params into a typed value.
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_value(Value::Object(self.params.clone()))
            .map_err(|e| Error::BadRequest(e.to_string()))
    }
}
