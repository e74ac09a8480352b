// Test assertions for HTTP responses

use crate::TestResponse;
use menuet_core::HttpStatus;
use serde_json::Value;

/// Assert that a response has a specific status code
pub fn assert_status(response: &TestResponse, expected: u16) {
    let actual = response.status();
    assert_eq!(
        actual,
        expected,
        "Expected status {}, got {} with body {}",
        expected,
        actual,
        response.body_string()
    );
}

/// Assert that a response has a specific HTTP status
pub fn assert_http_status(response: &TestResponse, expected: HttpStatus) {
    assert_status(response, expected.code());
}

/// Assert that the JSON body equals `expected`
pub fn assert_json(response: &TestResponse, expected: &Value) {
    let actual = response.json();
    assert_eq!(&actual, expected, "JSON bodies do not match");
}

/// Assert that a response has a specific header
pub fn assert_header(response: &TestResponse, key: &str, expected: &str) {
    let actual = response.header(key);
    assert_eq!(
        actual,
        Some(expected),
        "Expected header '{}' to be '{}', got {:?}",
        key,
        expected,
        actual
    );
}

/// Assert that a response body contains a string
pub fn assert_body_contains(response: &TestResponse, expected: &str) {
    let body = response.body_string();
    assert!(
        body.contains(expected),
        "Expected body to contain '{}', but it didn't. Body: {}",
        expected,
        body
    );
}

/// Assert a validation failure body: `name` matches and some error entry
/// has `keyword`
pub fn assert_validation_error(response: &TestResponse, name: &str, keyword: &str) {
    let body = response.json();
    assert_eq!(body["name"], name, "Unexpected error name in {}", body);
    let found = body["errors"]
        .as_array()
        .is_some_and(|errors| errors.iter().any(|error| error["keyword"] == keyword));
    assert!(found, "Expected a '{}' error in {}", keyword, body);
}

fn assert_status_class(response: &TestResponse, class: u16, label: &str) {
    let status = response.status();
    assert!(
        status / 100 == class,
        "Expected {} ({}xx), got {} with body {}",
        label,
        class,
        status,
        response.body_string()
    );
}

pub fn assert_success(response: &TestResponse) {
    assert_status_class(response, 2, "success");
}

pub fn assert_client_error(response: &TestResponse) {
    assert_status_class(response, 4, "client error");
}

pub fn assert_server_error(response: &TestResponse) {
    assert_status_class(response, 5, "server error");
}

/// Assert that a response has JSON content type
pub fn assert_json_content_type(response: &TestResponse) {
    let content_type = response.header("Content-Type");
    assert!(
        content_type.is_some_and(|ct| ct.contains("application/json")),
        "Expected JSON content type, got {:?}",
        content_type
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use menuet_core::HttpResponse;
    use serde_json::json;

    fn create_test_response(status: u16, body: &str) -> TestResponse {
        TestResponse(HttpResponse::new(status).with_body(body.as_bytes().to_vec()))
    }

    #[test]
    fn test_assert_status() {
        let response = create_test_response(200, "OK");
        assert_status(&response, 200);
        assert_http_status(&response, HttpStatus::Ok);
        assert_success(&response);
    }

    #[test]
    fn test_assert_status_ranges() {
        assert_client_error(&create_test_response(404, ""));
        assert_server_error(&create_test_response(503, ""));
    }

    #[test]
    fn test_assert_body_contains() {
        let response = create_test_response(200, "Hello World");
        assert_body_contains(&response, "Hello");
    }

    #[test]
    fn test_assert_json_and_header() {
        let response = TestResponse(
            HttpResponse::ok()
                .with_json(&json!({"pong": true}))
                .unwrap()
                .with_header("X-Powered-By", "Menuet"),
        );
        assert_json(&response, &json!({"pong": true}));
        assert_json_content_type(&response);
        assert_header(&response, "x-powered-by", "Menuet");
    }

    #[test]
    fn test_assert_validation_error() {
        let response = TestResponse(
            HttpResponse::new(400)
                .with_json(&json!({
                    "name": "RequestDataValidationError",
                    "errors": [{"path": "/name", "keyword": "required"}]
                }))
                .unwrap(),
        );
        assert_validation_error(&response, "RequestDataValidationError", "required");
    }

    #[test]
    #[should_panic(expected = "Expected status 201")]
    fn test_assert_status_mismatch_panics() {
        assert_status(&create_test_response(200, ""), 201);
    }
}
