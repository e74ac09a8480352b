// Application assembly and HTTP server

use crate::config::Config;
use crate::http::{HttpRequest, HttpResponse};
use crate::logging::{debug, error, info, warn};
use crate::module::{ModuleEntry, ModuleLoader, ModuleManifest};
use crate::registry::{Capability, Category, Registry};
use crate::route::RouteDefinition;
use crate::routing::{Router, RouterOptions};
use crate::shutdown::{Lifecycle, RequestTracker, ServerState};
use crate::strings::Strings;
use crate::utils::Utils;
use crate::validator::ValidatorSet;
use crate::Error;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use serde_json::{Map, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Listener settings.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub addr: SocketAddr,
    /// Requests running longer are answered with 503 and `{}`.
    pub request_timeout: Option<Duration>,
    /// How long shutdown waits for in-flight requests.
    pub drain_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            request_timeout: None,
            drain_timeout: Duration::from_secs(30),
        }
    }
}

/// Collects everything an [`Application`] is built from.
pub struct ApplicationBuilder {
    registry: Arc<Registry>,
    manifest: ModuleManifest,
    validators: ValidatorSet,
    routes: Vec<RouteDefinition>,
    router_options: RouterOptions,
    server_options: ServerOptions,
    config: Config,
    strings: Strings,
    builtins: Vec<(String, Capability)>,
}

impl ApplicationBuilder {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            manifest: ModuleManifest::new(),
            validators: ValidatorSet::new(),
            routes: Vec::new(),
            router_options: RouterOptions::default(),
            server_options: ServerOptions::default(),
            config: Config::default(),
            strings: Strings::default(),
            builtins: Vec::new(),
        }
    }

    pub fn manifest(mut self, manifest: ModuleManifest) -> Self {
        self.manifest.extend(manifest);
        self
    }

    pub fn module(mut self, entry: ModuleEntry) -> Self {
        self.manifest.push(entry);
        self
    }

    pub fn validators(mut self, validators: ValidatorSet) -> Self {
        self.validators = validators;
        self
    }

    pub fn routes(mut self, routes: Vec<RouteDefinition>) -> Self {
        self.routes.extend(routes);
        self
    }

    pub fn route(mut self, route: RouteDefinition) -> Self {
        self.routes.push(route);
        self
    }

    pub fn router_options(mut self, options: RouterOptions) -> Self {
        self.router_options = options;
        self
    }

    pub fn server_options(mut self, options: ServerOptions) -> Self {
        self.server_options = options;
        self
    }

    /// Exposed to modules as `$config`.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Exposed to modules as `$string`.
    pub fn strings(mut self, strings: Strings) -> Self {
        self.strings = strings;
        self
    }

    /// An extra builtin capability such as `$cache`.
    pub fn builtin<T: std::any::Any + Send + Sync>(mut self, name: &str, value: T) -> Self {
        self.builtins.push((name.to_string(), Capability::new(value)));
        self
    }

    /// Load every module category in order, build the route table, then
    /// bind the initializers.
    pub fn build(mut self) -> Result<Application, Error> {
        let registry = self.registry;
        registry.register_builtin("$config", Capability::new(self.config))?;
        registry.register_builtin("$string", Capability::new(self.strings))?;
        registry.register_builtin("$utils", Capability::new(Utils))?;
        for (name, capability) in self.builtins {
            registry.register_builtin(&name, capability)?;
        }

        let loader = ModuleLoader::new(Arc::clone(&registry));
        loader.load_manifest(&mut self.manifest)?;

        let router = Router::build(self.routes, &registry, &self.validators, self.router_options)?;
        registry.mark_loaded(Category::Route);

        let initializers = self.manifest.take(Category::Initializer);
        loader.load(Category::Initializer, initializers)?;

        if !self.manifest.is_empty() {
            warn!(remaining = self.manifest.len(), "Modules left unloaded");
        }

        registry.seal();
        info!(routes = router.routes().len(), "Application built");

        Ok(Application {
            registry,
            router: Arc::new(router),
            options: self.server_options,
            tracker: RequestTracker::new(),
            lifecycle: Lifecycle::new(),
        })
    }
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A fully wired application.
pub struct Application {
    registry: Arc<Registry>,
    router: Arc<Router>,
    options: ServerOptions,
    tracker: RequestTracker,
    lifecycle: Lifecycle,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    pub fn state(&self) -> ServerState {
        self.lifecycle.state()
    }

    /// Dispatch a request without a socket.
    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        self.router.handle(request).await
    }

    /// Run the initializers, in registration order.
    pub async fn initialize(&self) -> Result<(), Error> {
        for (name, initializer) in self.registry.initializers() {
            debug!(initializer = name.as_str(), "Running initializer");
            if let Err(e) = initializer.call(()).await {
                self.lifecycle.set(ServerState::Error);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Initialize, then serve until Ctrl-C or SIGTERM.
    pub async fn run(self) -> Result<(), Error> {
        self.initialize().await?;
        self.serve().await
    }

    /// Serve on the configured address until Ctrl-C or SIGTERM.
    pub async fn serve(self) -> Result<(), Error> {
        let listener = match TcpListener::bind(self.options.addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.lifecycle.set(ServerState::Error);
                return Err(e.into());
            }
        };
        self.serve_on(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves, then drain.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = listener.local_addr()?;
        self.lifecycle.set(ServerState::Ready);
        info!(addr = %addr, "Server listening");

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, remote) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(error = %e, "Accept failed");
                            continue;
                        }
                    };
                    self.spawn_connection(stream, remote);
                }
                _ = &mut shutdown => break,
            }
        }

        self.lifecycle.set(ServerState::Draining);
        self.tracker.stop_accepting();
        drop(listener);

        if !self.tracker.drain(self.options.drain_timeout).await {
            warn!(in_flight = self.tracker.in_flight(), "Stopping with requests in flight");
        }
        self.lifecycle.set(ServerState::Stopped);
        Ok(())
    }

    fn spawn_connection(&self, stream: tokio::net::TcpStream, remote: SocketAddr) {
        let io = TokioIo::new(stream);
        let router = Arc::clone(&self.router);
        let tracker = self.tracker.clone();
        let request_timeout = self.options.request_timeout;

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<IncomingBody>| {
                let router = Arc::clone(&router);
                let tracker = tracker.clone();
                async move { handle_request(req, router, tracker, request_timeout, remote).await }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                debug!(error = %err, remote = %remote, "Connection closed with error");
            }
        });
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("router", &self.router)
            .field("options", &self.options)
            .field("state", &self.state())
            .finish()
    }
}

async fn handle_request(
    req: Request<IncomingBody>,
    router: Arc<Router>,
    tracker: RequestTracker,
    request_timeout: Option<Duration>,
    remote: SocketAddr,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let Some(guard) = tracker.begin() else {
        return Ok(into_hyper(service_unavailable()));
    };

    let uri = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let mut request = HttpRequest::new(req.method().as_str(), uri).with_remote_addr(remote);

    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            request
                .headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
    }

    let limit = router.options().body_limit;
    match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => request.body = collected.to_bytes().to_vec(),
        Err(err) if err.is::<LengthLimitError>() => {
            debug!(limit = limit, "Request body over limit, not read further");
            request.body_over_limit = true;
        }
        Err(err) => match err.downcast::<hyper::Error>() {
            Ok(err) => return Err(*err),
            Err(err) => {
                warn!(error = %err, "Failed to read request body");
                return Ok(into_hyper(HttpResponse::new(400)));
            }
        },
    }

    let response = match request_timeout {
        Some(limit) => match tokio::time::timeout(limit, router.handle(request)).await {
            Ok(response) => response,
            Err(_) => {
                warn!(timeout_ms = limit.as_millis() as u64, "Request timed out");
                service_unavailable()
            }
        },
        None => router.handle(request).await,
    };

    guard.release();
    Ok(into_hyper(response))
}

fn service_unavailable() -> HttpResponse {
    HttpResponse::new(503)
        .with_json(&Value::Object(Map::new()))
        .unwrap_or_else(|_| HttpResponse::new(503))
}

fn into_hyper(response: HttpResponse) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(response.status);
    for (key, value) in response.headers {
        builder = builder.header(key, value);
    }

    builder
        .body(Full::new(Bytes::from(response.body)))
        .unwrap_or_else(|e| {
            error!(error = %e, "Invalid response");
            let mut fallback = Response::new(Full::new(Bytes::new()));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received"),
        _ = terminate => info!("SIGTERM received"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn ping_app() -> Application {
        Application::builder()
            .module(ModuleEntry::controller("ping", &[], |_, _| async {
                Ok(json!({"pong": true}))
            }))
            .route(RouteDefinition::new("get", "/ping", "ping"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_build_registers_builtins() {
        let app = ping_app();
        assert!(app.registry().resolve::<Config>("$config").is_ok());
        assert!(app.registry().resolve::<Strings>("$string").is_ok());
        assert!(app.registry().resolve::<Utils>("$utils").is_ok());
        assert!(app.registry().is_sealed());
        assert_eq!(app.state(), ServerState::Pending);
    }

    #[tokio::test]
    async fn test_missing_handler_fails_build() {
        let err = Application::builder()
            .route(RouteDefinition::new("get", "/ping", "ping"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::HandlerNotFound { .. }));
    }

    #[tokio::test]
    async fn test_initializers_run_in_order() {
        let app = Application::builder()
            .module(ModuleEntry::value(Category::Utility, "trail", parking_lot::Mutex::new(Vec::<u8>::new())))
            .module(ModuleEntry::initializer(&["TrailUtil"], |deps| {
                let trail = deps.get::<parking_lot::Mutex<Vec<u8>>>("TrailUtil");
                async move { trail.map(|trail| trail.lock().push(1)) }
            }))
            .build()
            .unwrap();

        app.initialize().await.unwrap();
        let trail = app
            .registry()
            .resolve::<parking_lot::Mutex<Vec<u8>>>("TrailUtil")
            .unwrap();
        assert_eq!(*trail.lock(), vec![1]);
    }

    #[tokio::test]
    async fn test_failing_initializer_sets_error_state() {
        let app = Application::builder()
            .module(ModuleEntry::initializer(&[], |_| async {
                Err(Error::Internal("seed failed".into()))
            }))
            .build()
            .unwrap();

        assert!(app.initialize().await.is_err());
        assert_eq!(app.state(), ServerState::Error);
    }

    #[tokio::test]
    async fn test_serve_answers_and_stops() {
        let app = ping_app();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(app.serve_on(listener, async {
            let _ = stopped.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /ping HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        assert!(raw.starts_with("HTTP/1.1 200"));
        assert!(raw.to_ascii_lowercase().contains("x-powered-by: menuet"));
        assert!(raw.ends_with(r#"{"pong":true}"#));

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_body_limit_enforced_while_reading() {
        let app = Application::builder()
            .module(ModuleEntry::controller("upload", &[], |_, ctx: RequestContext| async move {
                Ok(json!({"body": ctx.body}))
            }))
            .route(RouteDefinition::new("post", "/upload", "upload").body("*"))
            .router_options(RouterOptions::default().body_limit(16))
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(app.serve_on(listener, async {
            let _ = stopped.await;
        }));

        let post = |body: &str| {
            format!(
                "POST /upload HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            )
        };

        let large = format!(r#"{{"data":"{}"}}"#, "x".repeat(64));
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(post(&large).as_bytes()).await.unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 413"), "{raw}");
        assert!(raw.contains("PayloadTooLargeError"), "{raw}");

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(post(r#"{"a":1}"#).as_bytes()).await.unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 200"), "{raw}");
        assert!(raw.ends_with(r#"{"body":{"a":1}}"#));

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_request_timeout_answers_503() {
        let app = Application::builder()
            .module(ModuleEntry::controller("slow", &[], |_, _| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(json!({}))
            }))
            .route(RouteDefinition::new("get", "/slow", "slow"))
            .server_options(ServerOptions {
                request_timeout: Some(Duration::from_millis(50)),
                ..ServerOptions::default()
            })
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(app.serve_on(listener, async {
            let _ = stopped.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /slow HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        assert!(raw.starts_with("HTTP/1.1 503"));
        assert!(raw.ends_with("{}"));

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
