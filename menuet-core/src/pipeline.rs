//! The per-route request pipeline.
//!
//! Every request walks the same stages:
//!
//! ```text
//! Intercepting -> ValidatingParams -> ValidatingQuery -> ValidatingBody
//!   -> Handling -> Resolving -> ValidatingResponse -> Responded
//! ```
//!
//! A failure at any stage jumps to `ErrorResolving`. Validation failures
//! raised before `Handling` are the client's (400), those raised from
//! `Handling` on are the server's (500). The pipeline always produces a
//! response; it never returns an error to the caller.

use crate::Error;
use crate::context::RequestContext;
use crate::http::{HttpResponse, Request, RequestHead, ResponseHandle};
use crate::logging::{debug, error, warn};
use crate::module::{ErrorResolver, Handler, Interceptor, Resolver};
use crate::respond::ResponseScope;
use crate::validator::Validator;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{Instrument, info_span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Intercepting,
    ValidatingParams,
    ValidatingQuery,
    ValidatingBody,
    Handling,
    Resolving,
    ValidatingResponse,
    ErrorResolving,
    Responded,
}

impl Stage {
    /// True once request validation has passed.
    pub fn request_validated(&self) -> bool {
        *self >= Stage::Handling
    }
}

/// One configured interceptor of a route.
#[derive(Clone)]
pub struct InterceptorStep {
    pub name: String,
    pub options: Value,
    interceptor: Interceptor,
}

impl fmt::Debug for InterceptorStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorStep")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish()
    }
}

/// Tracks how far a request got, for error classification.
struct Progress {
    stage: Stage,
    query: Map<String, Value>,
}

/// Everything needed to serve one route.
#[derive(Clone)]
pub struct RoutePipeline {
    interceptors: Vec<InterceptorStep>,
    params: Option<Validator>,
    query: Option<Validator>,
    body: Option<Validator>,
    response: Option<Validator>,
    handler: Handler,
    resolver: Resolver,
    error_resolver: ErrorResolver,
}

impl RoutePipeline {
    pub fn new(handler: Handler, resolver: Resolver, error_resolver: ErrorResolver) -> Self {
        Self {
            interceptors: Vec::new(),
            params: None,
            query: None,
            body: None,
            response: None,
            handler,
            resolver,
            error_resolver,
        }
    }

    pub fn with_interceptor(mut self, name: impl Into<String>, options: Value, interceptor: Interceptor) -> Self {
        self.interceptors.push(InterceptorStep {
            name: name.into(),
            options,
            interceptor,
        });
        self
    }

    pub fn params(mut self, validator: Validator) -> Self {
        self.params = Some(validator);
        self
    }

    pub fn query(mut self, validator: Validator) -> Self {
        self.query = Some(validator);
        self
    }

    pub fn body(mut self, validator: Validator) -> Self {
        self.body = Some(validator);
        self
    }

    pub fn response(mut self, validator: Validator) -> Self {
        self.response = Some(validator);
        self
    }

    pub fn interceptors(&self) -> &[InterceptorStep] {
        &self.interceptors
    }

    /// Serve one request.
    pub async fn run(&self, request: Request) -> HttpResponse {
        let span = info_span!(
            "request",
            id = %uuid::Uuid::new_v4(),
            method = %request.method(),
            path = request.head().path.as_str(),
        );
        self.run_stages(request).instrument(span).await
    }

    async fn run_stages(&self, request: Request) -> HttpResponse {
        let head = Arc::clone(request.head());
        let response = ResponseHandle::new();
        let mut progress = Progress {
            stage: Stage::Intercepting,
            query: request.query.clone(),
        };

        let payload = match self.execute(request, &response, &mut progress).await {
            Ok(Some(payload)) => payload,
            // the handler finished the response itself
            Ok(None) => Value::Null,
            Err(err) => {
                let err = err.classify(progress.stage.request_validated());
                if err.is_server_error() {
                    error!(stage = ?progress.stage, error = %err, "Request failed");
                } else {
                    debug!(stage = ?progress.stage, error = %err, "Request rejected");
                }
                response.set_status(err.status_code());
                let scope = ResponseScope::new(response.clone(), head, progress.query);
                self.error_resolver.call((scope, err)).await
            }
        };

        write_response(response, &payload)
    }

    async fn execute(
        &self,
        mut request: Request,
        response: &ResponseHandle,
        progress: &mut Progress,
    ) -> Result<Option<Value>, Error> {
        let mut params_extended = Map::new();
        let mut query_extended = Map::new();

        for step in &self.interceptors {
            let param_keys: HashSet<String> = request.params.keys().cloned().collect();
            let query_keys: HashSet<String> = request.query.keys().cloned().collect();

            request = step
                .interceptor
                .call((request, step.options.clone()))
                .await?;

            collect_added(&request.params, &param_keys, &mut params_extended);
            collect_added(&request.query, &query_keys, &mut query_extended);
            progress.query = request.query.clone();
        }

        progress.stage = Stage::ValidatingParams;
        request.params = validate_object(&self.params, std::mem::take(&mut request.params))?;
        request.params.extend(params_extended);

        progress.stage = Stage::ValidatingQuery;
        request.query = validate_object(&self.query, std::mem::take(&mut request.query))?;
        request.query.extend(query_extended);
        progress.query = request.query.clone();

        progress.stage = Stage::ValidatingBody;
        request.body = match &self.body {
            Some(validator) => validator.validate(std::mem::take(&mut request.body))?,
            None => Value::Object(Map::new()),
        };

        progress.stage = Stage::Handling;
        let head = Arc::clone(request.head());
        let data = self
            .handler
            .call(RequestContext::new(request, response.clone()))
            .await?;

        if response.is_finished() {
            return Ok(None);
        }

        progress.stage = Stage::Resolving;
        let scope = ResponseScope::new(response.clone(), head, progress.query.clone());
        let result = self.resolver.call((scope, data)).await?;

        progress.stage = Stage::ValidatingResponse;
        let result = match &self.response {
            Some(validator) => validator.validate(result)?,
            None => result,
        };

        progress.stage = Stage::Responded;
        Ok(Some(result))
    }
}

impl fmt::Debug for RoutePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutePipeline")
            .field("interceptors", &self.interceptors)
            .field("params", &self.params.is_some())
            .field("query", &self.query.is_some())
            .field("body", &self.body.is_some())
            .field("response", &self.response.is_some())
            .finish()
    }
}

fn collect_added(current: &Map<String, Value>, before: &HashSet<String>, added: &mut Map<String, Value>) {
    for (key, value) in current {
        if !before.contains(key) {
            added.insert(key.clone(), value.clone());
        }
    }
}

/// Validate a params/query object. Without a validator the object is
/// reset to empty.
fn validate_object(
    validator: &Option<Validator>,
    data: Map<String, Value>,
) -> Result<Map<String, Value>, Error> {
    let Some(validator) = validator else {
        return Ok(Map::new());
    };
    match validator.validate(Value::Object(data))? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn write_response(response: ResponseHandle, payload: &Value) -> HttpResponse {
    response.into_response(payload).unwrap_or_else(|err| {
        error!(error = %err, "Cannot serialize response payload");
        HttpResponse::new(500)
    })
}

/// Answer a request that failed before reaching a route pipeline, such as
/// one with an unparseable body.
pub async fn respond_error(
    error_resolver: &ErrorResolver,
    head: Arc<RequestHead>,
    query: Map<String, Value>,
    err: Error,
) -> HttpResponse {
    let err = err.classify(false);
    warn!(path = head.path.as_str(), error = %err, "Request rejected before routing");
    let response = ResponseHandle::new();
    response.set_status(err.status_code());
    let scope = ResponseScope::new(response.clone(), head, query);
    let payload = error_resolver.call((scope, err)).await;
    write_response(response, &payload)
}
