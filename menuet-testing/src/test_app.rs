// Test application wrapper

use crate::TestClient;
use menuet_core::{Application, ApplicationBuilder, Error, Registry};
use std::any::Any;
use std::sync::Arc;

/// A built application plus helpers for driving it in tests.
#[derive(Clone)]
pub struct TestApp {
    app: Arc<Application>,
}

impl TestApp {
    pub fn new(app: Application) -> Self {
        Self { app: Arc::new(app) }
    }

    /// Build `builder` and wrap the result.
    pub fn build(builder: ApplicationBuilder) -> Result<Self, Error> {
        builder.build().map(Self::new)
    }

    /// Build `builder` and run its initializers.
    pub async fn start(builder: ApplicationBuilder) -> Result<Self, Error> {
        let test_app = Self::build(builder)?;
        test_app.app.initialize().await?;
        Ok(test_app)
    }

    pub fn app(&self) -> &Application {
        &self.app
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.app.registry()
    }

    /// Resolve a registered capability, e.g. `get::<MyService>("UserService")`.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.app.registry().resolve(name).ok()
    }

    /// Client dispatching straight into the route table.
    pub fn client(&self) -> TestClient {
        TestClient::new(Arc::clone(&self.app))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use menuet_core::{Category, ModuleEntry};

    #[test]
    fn test_build_and_resolve() {
        let app = TestApp::build(
            Application::builder().module(ModuleEntry::value(Category::Utility, "answer", 42u32)),
        )
        .unwrap();

        assert_eq!(app.get::<u32>("AnswerUtil").as_deref(), Some(&42));
        assert!(app.get::<u32>("MissingUtil").is_none());
        assert!(app.registry().is_sealed());
    }

    #[tokio::test]
    async fn test_start_runs_initializers() {
        let result = TestApp::start(Application::builder().module(ModuleEntry::initializer(&[], |_| async {
            Err(Error::Internal("boom".into()))
        })))
        .await;
        assert!(result.is_err());
    }
}
