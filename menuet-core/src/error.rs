// Error types for the Menuet framework

use crate::HttpStatus;
use crate::validator::ValidationErrors;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Load-time errors
    #[error("cannot inject argument {parameter} in source {origin}")]
    DependencyResolution { parameter: String, origin: String },

    #[error("duplicate module with name {0} already registered")]
    DuplicateModuleName(String),

    #[error("{category} modules cannot be loaded before {requires}")]
    LoadOrder {
        category: &'static str,
        requires: &'static str,
    },

    #[error("schema {reference} referenced by {schema} not found")]
    SchemaNotFound { schema: String, reference: String },

    #[error("patch directive is not supported (schema {0})")]
    UnsupportedPatch(String),

    #[error("cannot compile schema {schema}: {message}")]
    SchemaCompile { schema: String, message: String },

    #[error("[{path}] handler {handler} not found")]
    HandlerNotFound { path: String, handler: String },

    #[error("[{path}] no such interceptor: '{name}'")]
    InterceptorNotFound { path: String, name: String },

    #[error("[{path}] {reason}")]
    InvalidRoute { path: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Request-time errors
    /// Raised by validators; the pipeline reclassifies it by stage.
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Request data validation failed: {0}")]
    RequestValidation(ValidationErrors),

    #[error("Response data validation failed: {0}")]
    ResponseValidation(ValidationErrors),

    /// Application error identified by a string-table code.
    #[error("{code}")]
    Coded {
        status: u16,
        code: String,
        params: Vec<Value>,
    },

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported Media Type: {0}")]
    UnsupportedMediaType(String),

    #[error("Too Many Requests: {0}")]
    TooManyRequests(String),

    #[error("Request Timeout: {0}")]
    RequestTimeout(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Application error with a string-table code and an explicit status.
    pub fn coded(status: u16, code: impl Into<String>) -> Self {
        Error::Coded {
            status,
            code: code.into(),
            params: Vec::new(),
        }
    }

    /// Attach substitution parameters to a coded error. Other variants are
    /// returned unchanged.
    pub fn with_params(self, new_params: Vec<Value>) -> Self {
        match self {
            Error::Coded { status, code, .. } => Error::Coded {
                status,
                code,
                params: new_params,
            },
            other => other,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) | Error::RequestValidation(_) => HttpStatus::BadRequest.code(),
            Error::ResponseValidation(_) => HttpStatus::InternalServerError.code(),
            Error::Coded { status, .. } => *status,
            Error::BadRequest(_) | Error::Json(_) => HttpStatus::BadRequest.code(),
            Error::Unauthorized(_) => HttpStatus::Unauthorized.code(),
            Error::Forbidden(_) => HttpStatus::Forbidden.code(),
            Error::NotFound(_) => HttpStatus::NotFound.code(),
            Error::Conflict(_) => HttpStatus::Conflict.code(),
            Error::PayloadTooLarge(_) => HttpStatus::PayloadTooLarge.code(),
            Error::UnsupportedMediaType(_) => HttpStatus::UnsupportedMediaType.code(),
            Error::TooManyRequests(_) => HttpStatus::TooManyRequests.code(),
            Error::RequestTimeout(_) => HttpStatus::RequestTimeout.code(),
            Error::ServiceUnavailable(_) => HttpStatus::ServiceUnavailable.code(),

            // Default to 500 for unmapped errors
            _ => HttpStatus::InternalServerError.code(),
        }
    }

    /// Get the HttpStatus enum for this error
    pub fn http_status(&self) -> HttpStatus {
        HttpStatus::from_code(self.status_code()).unwrap_or(HttpStatus::InternalServerError)
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code())
    }

    /// The validation marker: true for any schema validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::RequestValidation(_) | Error::ResponseValidation(_)
        )
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Error::Validation(errors)
            | Error::RequestValidation(errors)
            | Error::ResponseValidation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Reclassify a raw validation failure by pipeline stage: before the
    /// handler ran it is the caller's fault, afterwards it is ours.
    pub fn classify(self, request_validated: bool) -> Self {
        match self {
            Error::Validation(errors) if request_validated => Error::ResponseValidation(errors),
            Error::Validation(errors) => Error::RequestValidation(errors),
            other => other,
        }
    }

    /// Name exposed to clients by the default error resolver.
    pub fn name(&self) -> &'static str {
        match self {
            Error::Validation(_) => "ValidationError",
            Error::RequestValidation(_) => "RequestDataValidationError",
            Error::ResponseValidation(_) => "ResponseDataValidationError",
            Error::Coded { .. } => "ApplicationError",
            Error::BadRequest(_) | Error::Json(_) => "BadRequestError",
            Error::Unauthorized(_) => "UnauthorizedError",
            Error::Forbidden(_) => "ForbiddenError",
            Error::NotFound(_) => "NotFoundError",
            Error::Conflict(_) => "ConflictError",
            Error::PayloadTooLarge(_) => "PayloadTooLargeError",
            Error::UnsupportedMediaType(_) => "UnsupportedMediaTypeError",
            Error::TooManyRequests(_) => "TooManyRequestsError",
            Error::RequestTimeout(_) => "RequestTimeoutError",
            Error::ServiceUnavailable(_) => "ServiceUnavailableError",
            _ => "InternalServerError",
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_by_stage() {
        let raw = Error::from(ValidationErrors::single("/name", "is required", "required"));
        let before = raw.classify(false);
        assert_eq!(before.status_code(), 400);
        assert_eq!(before.name(), "RequestDataValidationError");

        let raw = Error::from(ValidationErrors::single("/count", "wrong type", "type"));
        let after = raw.classify(true);
        assert_eq!(after.status_code(), 500);
        assert_eq!(after.name(), "ResponseDataValidationError");
        assert!(after.is_validation());
    }

    #[test]
    fn test_classify_leaves_other_errors_alone() {
        let err = Error::NotFound("user".into()).classify(false);
        assert_eq!(err.status_code(), 404);
        assert!(!err.is_validation());
    }

    #[test]
    fn test_coded_error_status_and_params() {
        let err = Error::coded(409, "error.duplicate-email").with_params(vec![json!("a@b.c")]);
        assert_eq!(err.status_code(), 409);
        assert!(err.is_client_error());
        match err {
            Error::Coded { code, params, .. } => {
                assert_eq!(code, "error.duplicate-email");
                assert_eq!(params, vec![json!("a@b.c")]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_load_time_errors_are_server_errors() {
        let err = Error::DependencyResolution {
            parameter: "userService".into(),
            origin: "controllers/user".into(),
        };
        assert!(err.is_server_error());
        assert_eq!(
            err.to_string(),
            "cannot inject argument userService in source controllers/user"
        );
    }
}
