//! Testing utilities for Menuet applications.
//!
//! - [`TestApp`] / [`TestClient`]: drive a built application through its
//!   real route table without opening a socket
//! - [`MockController`], [`MockService`], [`CallLog`]: record calls
//! - [`TestProject`]: temporary project trees for loaders that read disk
//! - assertions over [`TestResponse`]
//!
//! ```
//! use menuet_core::{Application, ModuleEntry, RouteDefinition};
//! use menuet_testing::*;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let app = TestApp::build(
//!     Application::builder()
//!         .module(ModuleEntry::controller("ping", &[], |_, _| async { Ok(json!({"pong": true})) }))
//!         .route(RouteDefinition::new("get", "/ping", "ping")),
//! )
//! .unwrap();
//!
//! let response = app.client().get("/ping").await;
//! assert_status(&response, 200);
//! assert_json(&response, &json!({"pong": true}));
//! # });
//! ```

pub mod assertions;
pub mod mock;
pub mod project;
pub mod test_app;
pub mod test_client;

pub use assertions::*;
pub use mock::{CallLog, MockController, MockService};
pub use project::TestProject;
pub use test_app::TestApp;
pub use test_client::{TestClient, TestRequest, TestResponse};
