// HTTP status codes used by the request pipeline

macro_rules! statuses {
    ($($name:ident = $code:literal, $reason:literal;)+) => {
        /// HTTP status codes the framework produces or maps errors onto.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum HttpStatus {
            $($name = $code,)+
        }

        impl HttpStatus {
            const ALL: &'static [HttpStatus] = &[$(HttpStatus::$name,)+];

            pub fn reason(&self) -> &'static str {
                match self {
                    $(HttpStatus::$name => $reason,)+
                }
            }
        }
    };
}

statuses! {
    Ok = 200, "OK";
    Created = 201, "Created";
    NoContent = 204, "No Content";
    BadRequest = 400, "Bad Request";
    Unauthorized = 401, "Unauthorized";
    Forbidden = 403, "Forbidden";
    NotFound = 404, "Not Found";
    MethodNotAllowed = 405, "Method Not Allowed";
    RequestTimeout = 408, "Request Timeout";
    Conflict = 409, "Conflict";
    PayloadTooLarge = 413, "Payload Too Large";
    UnsupportedMediaType = 415, "Unsupported Media Type";
    UnprocessableEntity = 422, "Unprocessable Entity";
    TooManyRequests = 429, "Too Many Requests";
    InternalServerError = 500, "Internal Server Error";
    NotImplemented = 501, "Not Implemented";
    ServiceUnavailable = 503, "Service Unavailable";
}

impl HttpStatus {
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Codes outside the table map to `None`; callers fall back to 500.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|status| status.code() == code)
    }

    pub fn is_success(&self) -> bool {
        self.code() / 100 == 2
    }

    pub fn is_client_error(&self) -> bool {
        self.code() / 100 == 4
    }

    pub fn is_server_error(&self) -> bool {
        self.code() / 100 == 5
    }
}

impl std::fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            HttpStatus::Ok,
            HttpStatus::BadRequest,
            HttpStatus::NotFound,
            HttpStatus::InternalServerError,
        ] {
            assert_eq!(HttpStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(HttpStatus::from_code(299), None);
    }

    #[test]
    fn test_status_classes() {
        assert!(HttpStatus::Ok.is_success());
        assert!(HttpStatus::BadRequest.is_client_error());
        assert!(!HttpStatus::BadRequest.is_server_error());
        assert!(HttpStatus::ServiceUnavailable.is_server_error());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(HttpStatus::NotFound.to_string(), "404 Not Found");
    }
}
