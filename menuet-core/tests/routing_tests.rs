use menuet_core::validator::AcceptAll;
use menuet_core::{
    Application, Error, HttpRequest, InterceptorSpec, ModuleEntry, RequestContext,
    RouteDefinition, RouterOptions, ValidationErrors, ValidatorSet,
};
use serde_json::{Value, json};
use std::future::Future;

fn echo(_: &menuet_core::Dependencies, ctx: RequestContext) -> impl Future<Output = Result<Value, Error>> + use<> {
    let payload = json!({"params": ctx.params, "query": ctx.query, "body": ctx.body});
    async move { Ok(payload) }
}

fn name_required(data: Value) -> Result<Value, ValidationErrors> {
    match data.get("name") {
        Some(Value::String(_)) => Ok(data),
        _ => Err(ValidationErrors::single("/name", "must have required property 'name'", "required")),
    }
}

fn app(options: RouterOptions) -> Application {
    Application::builder()
        .module(ModuleEntry::controller("echo", &[], echo))
        .validators(
            ValidatorSet::new()
                .with("user/id", AcceptAll)
                .with("user/create", name_required),
        )
        .route(RouteDefinition::new("get", "/ping", "echo"))
        .route(RouteDefinition::new("get", "/users/:id", "echo").params("user/id").query("*"))
        .route(RouteDefinition::new("post", "/users", "echo").body("user/create"))
        .route(RouteDefinition::new("get", "/hidden", "echo").disabled(true))
        .router_options(options)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_ping_has_empty_inputs() {
    let app = app(RouterOptions::default());
    let response = app
        .handle(HttpRequest::new("GET", "/ping?debug=1"))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("x-powered-by"), Some("Menuet"));
    assert_eq!(
        response.json().unwrap(),
        json!({"params": {}, "query": {}, "body": {}})
    );
}

#[tokio::test]
async fn test_path_params_and_wildcard_query() {
    let app = app(RouterOptions::default());
    let response = app
        .handle(HttpRequest::new("GET", "/users/42?tag=a&tag=b"))
        .await;

    let payload = response.json().unwrap();
    assert_eq!(payload["params"], json!({"id": "42"}));
    assert_eq!(payload["query"], json!({"tag": ["a", "b"]}));
}

#[tokio::test]
async fn test_body_validation_failure() {
    let app = app(RouterOptions::default());
    let request = HttpRequest::new("POST", "/users").with_json(&json!({})).unwrap();
    let response = app.handle(request).await;

    assert_eq!(response.status, 400);
    let payload = response.json().unwrap();
    assert_eq!(payload["name"], "RequestDataValidationError");
    assert_eq!(payload["errors"][0]["keyword"], "required");
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = app(RouterOptions::default());
    let request = HttpRequest::new("POST", "/users")
        .with_header("content-type", "application/json")
        .with_body(b"{\"name\":".to_vec());
    let response = app.handle(request).await;

    assert_eq!(response.status, 400);
    assert_eq!(response.json().unwrap()["name"], "BadRequestError");
}

#[tokio::test]
async fn test_oversized_body_is_413() {
    let app = app(RouterOptions::default().body_limit(8));
    let request = HttpRequest::new("POST", "/users")
        .with_json(&json!({"name": "a rather long name"}))
        .unwrap();
    let response = app.handle(request).await;
    assert_eq!(response.status, 413);
}

#[tokio::test]
async fn test_not_found_by_accept() {
    let app = app(RouterOptions::default());

    let json_404 = app
        .handle(HttpRequest::new("GET", "/nope").with_header("accept", "application/json"))
        .await;
    assert_eq!(json_404.status, 404);
    assert_eq!(json_404.body, b"{}");

    let image_404 = app
        .handle(HttpRequest::new("GET", "/nope").with_header("accept", "image/png"))
        .await;
    assert_eq!(image_404.status, 404);
    assert!(image_404.body.is_empty());

    let disabled = app.handle(HttpRequest::new("GET", "/hidden")).await;
    assert_eq!(disabled.status, 404);
}

#[tokio::test]
async fn test_base_path() {
    let app = app(RouterOptions::default().base_path("/api"));
    assert_eq!(app.handle(HttpRequest::new("GET", "/api/ping")).await.status, 200);
    assert_eq!(app.handle(HttpRequest::new("GET", "/ping")).await.status, 404);
}

#[tokio::test]
async fn test_head_falls_back_to_get() {
    let app = app(RouterOptions::default());
    let response = app.handle(HttpRequest::new("HEAD", "/ping")).await;
    assert_eq!(response.status, 200);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_cors_for_browsers() {
    let app = app(RouterOptions::default().allow_cross_domain(true));

    let browser = app
        .handle(HttpRequest::new("GET", "/ping").with_header("user-agent", "Mozilla/5.0 (X11)"))
        .await;
    assert_eq!(browser.header("access-control-allow-origin"), Some("*"));

    let curl = app
        .handle(HttpRequest::new("GET", "/ping").with_header("user-agent", "curl/8.0"))
        .await;
    assert_eq!(curl.header("access-control-allow-origin"), None);

    let preflight = app
        .handle(HttpRequest::new("OPTIONS", "/anything").with_header("user-agent", "Opera/9.80"))
        .await;
    assert_eq!(preflight.status, 200);
    assert!(preflight.body.is_empty());
    assert_eq!(
        preflight.header("access-control-allow-headers"),
        Some("Authorization,X-Requested-With,Content-Type")
    );
}

#[tokio::test]
async fn test_route_construction_fails_fast() {
    let missing_schema = Application::builder()
        .module(ModuleEntry::controller("echo", &[], echo))
        .route(RouteDefinition::new("post", "/users", "echo").body("user/create"))
        .build()
        .unwrap_err();
    assert!(matches!(missing_schema, Error::SchemaNotFound { ref reference, .. } if reference == "user/create"));

    let missing_interceptor = Application::builder()
        .module(ModuleEntry::controller("echo", &[], echo))
        .route(RouteDefinition::new("get", "/ping", "echo").intercept(InterceptorSpec::from("auth")))
        .build()
        .unwrap_err();
    assert!(matches!(missing_interceptor, Error::InterceptorNotFound { ref name, .. } if name == "auth"));

    let mut no_method = RouteDefinition::new("get", "/ping", "echo");
    no_method.method = None;
    let missing_method = Application::builder()
        .module(ModuleEntry::controller("echo", &[], echo))
        .route(no_method)
        .build()
        .unwrap_err();
    assert_eq!(missing_method.to_string(), "[/ping] method is required");
}
