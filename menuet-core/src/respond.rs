//! Response resolvers.
//!
//! The default resolver turns a handler's return value into the response
//! payload; the error resolver turns any failure into one. Applications may
//! install their own through the resolver category; otherwise the ones here
//! are used.

use crate::Error;
use crate::HttpStatus;
use crate::http::{RequestHead, ResponseHandle};
use crate::module::{BoxFuture, ErrorResolver, Resolver};
use crate::registry::Capability;
use crate::strings::Strings;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// What a resolver sees of the exchange: the response under construction
/// and enough of the request to pick a language.
#[derive(Debug, Clone)]
pub struct ResponseScope {
    pub response: ResponseHandle,
    pub request: Arc<RequestHead>,
    pub query: Map<String, Value>,
}

impl ResponseScope {
    pub fn new(response: ResponseHandle, request: Arc<RequestHead>, query: Map<String, Value>) -> Self {
        Self {
            response,
            request,
            query,
        }
    }

    pub fn status(&self) -> u16 {
        self.response.status()
    }

    pub fn set_status(&self, status: u16) {
        self.response.set_status(status);
    }
}

/// Returns handler data unchanged.
pub fn identity_resolver() -> Resolver {
    Resolver::from_fn(|(_, data): (ResponseScope, Value)| {
        Box::pin(async move { Ok(data) }) as BoxFuture<_>
    })
}

/// The built-in error resolver.
///
/// Produces `{name, message, code?, errors?}`. Coded errors are translated
/// through `strings` when available; the message of a server error that is
/// not a validation failure is replaced by the status reason.
pub fn default_error_resolver(strings: Option<Capability>) -> ErrorResolver {
    let strings = strings.and_then(|capability| capability.downcast::<Strings>());
    ErrorResolver::from_fn(move |(scope, error): (ResponseScope, Error)| {
        let payload = error_payload(strings.as_deref(), &scope, &error);
        Box::pin(async move { payload }) as BoxFuture<_>
    })
}

/// Serialize an error for the client.
pub fn error_payload(strings: Option<&Strings>, scope: &ResponseScope, error: &Error) -> Value {
    let mut payload = Map::new();
    payload.insert("name".into(), json!(error.name()));

    let message = match error {
        Error::Coded { code, params, .. } => {
            payload.insert("code".into(), json!(code));
            match strings {
                Some(strings) => strings.get(&scope.request, &scope.query, code, params),
                None => code.clone(),
            }
        }
        _ if error.is_validation() => error.to_string(),
        _ if error.is_server_error() => HttpStatus::InternalServerError.reason().to_string(),
        _ => error.to_string(),
    };
    payload.insert("message".into(), json!(message));

    if let Some(errors) = error.validation_errors() {
        payload.insert("errors".into(), errors.to_json());
    }

    Value::Object(payload)
}
