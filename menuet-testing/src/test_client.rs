// Test HTTP client

use menuet_core::{Application, Error, HttpMethod, HttpRequest, HttpResponse};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Sends requests through [`Application::handle`], no socket involved.
#[derive(Clone)]
pub struct TestClient {
    app: Arc<Application>,
}

impl TestClient {
    pub fn new(app: Arc<Application>) -> Self {
        Self { app }
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(TestRequest::new(HttpMethod::GET, path)).await
    }

    /// Make a POST request with a JSON body
    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> TestResponse {
        self.send_json(HttpMethod::POST, path, body).await
    }

    /// Make a PUT request with a JSON body
    pub async fn put<T: Serialize>(&self, path: &str, body: &T) -> TestResponse {
        self.send_json(HttpMethod::PUT, path, body).await
    }

    /// Make a PATCH request with a JSON body
    pub async fn patch<T: Serialize>(&self, path: &str, body: &T) -> TestResponse {
        self.send_json(HttpMethod::PATCH, path, body).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.send(TestRequest::new(HttpMethod::DELETE, path)).await
    }

    async fn send_json<T: Serialize>(&self, method: HttpMethod, path: &str, body: &T) -> TestResponse {
        match TestRequest::new(method, path).json(body) {
            Ok(request) => self.send(request).await,
            Err(error) => panic!("request body does not serialize: {}", error),
        }
    }

    /// Send a request built with [`TestRequest`].
    pub async fn send(&self, request: TestRequest) -> TestResponse {
        TestResponse(self.app.handle(request.build()).await)
    }
}

/// Builder for test requests
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: HttpMethod,
    path: String,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: Vec<u8>,
}

impl TestRequest {
    pub fn new(method: HttpMethod, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
            cookies: Vec::new(),
            query: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Add a header
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Add a cookie; all cookies are sent in one `Cookie` header
    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push((name.to_string(), value.to_string()));
        self
    }

    /// Add a query parameter
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Set the raw body
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and content type
    pub fn json<T: Serialize>(mut self, data: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(data)?;
        Ok(self.header("content-type", "application/json"))
    }

    /// Set a form body and content type
    pub fn form<T: Serialize>(mut self, data: &T) -> Result<Self, Error> {
        self.body = serde_urlencoded::to_string(data)
            .map_err(|e| Error::BadRequest(e.to_string()))?
            .into_bytes();
        Ok(self.header("content-type", "application/x-www-form-urlencoded"))
    }

    pub fn build(self) -> HttpRequest {
        let mut uri = self.path;
        if !self.query.is_empty() {
            let encoded = serde_urlencoded::to_string(&self.query).unwrap_or_default();
            uri.push(if uri.contains('?') { '&' } else { '?' });
            uri.push_str(&encoded);
        }

        let mut request = HttpRequest::new(self.method.as_str(), uri).with_body(self.body);
        for (name, value) in &self.headers {
            request = request.with_header(name, value.clone());
        }
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.with_header("cookie", cookie);
        }
        request
    }
}

/// Response from a test request
#[derive(Debug, Clone)]
pub struct TestResponse(pub HttpResponse);

impl TestResponse {
    pub fn status(&self) -> u16 {
        self.0.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.0.header(name)
    }

    pub fn body(&self) -> &[u8] {
        &self.0.body
    }

    /// Get the response body as string
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.0.body).into_owned()
    }

    /// Get the response body as JSON
    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, String> {
        serde_json::from_slice(&self.0.body).map_err(|e| format!("Deserialization error: {}", e))
    }

    /// The body as a JSON value, `Value::Null` when it is not JSON
    pub fn json(&self) -> Value {
        self.body_json().unwrap_or(Value::Null)
    }

    pub fn into_inner(self) -> HttpResponse {
        self.0
    }
}
