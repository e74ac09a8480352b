use menuet_core::module::{ModuleEntry, ModuleLoader, ModuleManifest, handler};
use menuet_core::{
    Application, Category, Config, Error, HttpRequest, Registry, RouteDefinition, Strings,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

struct Mailer {
    outbox: Mutex<Vec<String>>,
}

struct UserModel;

struct UserService {
    mailer: Arc<Mailer>,
    _model: Arc<UserModel>,
}

impl UserService {
    fn welcome(&self, name: &str) {
        self.mailer.outbox.lock().push(format!("welcome {name}"));
    }
}

fn mailer() -> ModuleEntry {
    ModuleEntry::value(
        Category::Utility,
        "mailer",
        Mailer {
            outbox: Mutex::new(Vec::new()),
        },
    )
}

fn user_model() -> ModuleEntry {
    ModuleEntry::value(Category::Model, "user", UserModel)
}

fn user_service() -> ModuleEntry {
    ModuleEntry::factory(Category::Service, "user", &["MailerUtil", "UserModel"], |deps| {
        Ok(UserService {
            mailer: deps.get("MailerUtil")?,
            _model: deps.get("UserModel")?,
        })
    })
}

fn user_controller() -> ModuleEntry {
    ModuleEntry::controllers(
        "user",
        vec![(
            "signUp",
            handler(&["UserService"], |deps, ctx| {
                let service = deps.get::<UserService>("UserService").unwrap();
                async move {
                    let name = ctx.body["name"].as_str().unwrap_or("stranger").to_string();
                    service.welcome(&name);
                    Ok(json!({"name": name}))
                }
            }),
        )],
    )
}

menuet_core::register_module!(mailer);
menuet_core::register_module!(user_model);
menuet_core::register_module!(user_service);
menuet_core::register_module!(user_controller);

#[tokio::test]
async fn test_registered_modules_serve_requests() {
    let app = Application::builder()
        .manifest(ModuleManifest::from_registrations())
        .route(RouteDefinition::new("post", "/users", "user.signUp").body("*"))
        .build()
        .unwrap();

    let request = HttpRequest::new("POST", "/users")
        .with_json(&json!({"name": "kim"}))
        .unwrap();
    let response = app.handle(request).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.json().unwrap(), json!({"name": "kim"}));

    let mailer = app.registry().resolve::<Mailer>("MailerUtil").unwrap();
    assert_eq!(*mailer.outbox.lock(), vec!["welcome kim".to_string()]);
}

#[test]
fn test_builtins_are_visible_to_every_category() {
    let registry = Arc::new(Registry::new());
    registry
        .register_builtin("$config", menuet_core::Capability::new(Config::new(json!({"site": "menuet"}))))
        .unwrap();
    let loader = ModuleLoader::new(Arc::clone(&registry));

    let mut manifest = ModuleManifest::new()
        .with(ModuleEntry::factory(Category::Utility, "site", &["$config"], |deps| {
            let config = deps.get::<Config>("$config")?;
            Ok(config.get_as::<String>("site")?)
        }))
        .with(ModuleEntry::factory(Category::Service, "site", &["$config", "SiteUtil"], |deps| {
            let site = deps.get::<String>("SiteUtil")?;
            Ok(format!("{}!", site))
        }));

    loader.load_manifest(&mut manifest).unwrap();
    assert_eq!(*registry.resolve::<String>("SiteService").unwrap(), "menuet!");
}

#[test]
fn test_models_cannot_see_services() {
    let registry = Arc::new(Registry::new());
    let loader = ModuleLoader::new(registry);

    let mut manifest = ModuleManifest::new()
        .with(ModuleEntry::value(Category::Service, "audit", 0u8))
        .with(ModuleEntry::factory(Category::Model, "order", &["AuditService"], |_| Ok(())));

    let err = loader.load_manifest(&mut manifest).unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot inject argument AuditService in source models/order"
    );
}

#[tokio::test]
async fn test_string_builtin_reaches_controllers() {
    let mut strings = Strings::new("en");
    strings.insert("en", json!({"hello": "Hello {0}"}).as_object().cloned().unwrap());

    let app = Application::builder()
        .strings(strings)
        .module(ModuleEntry::controller("hello", &["$string"], |deps, ctx| {
            let strings = deps.get::<Strings>("$string").unwrap();
            async move {
                Ok(json!({"message": strings.for_context(&ctx, "hello", &[json!("world")])}))
            }
        }))
        .route(RouteDefinition::new("get", "/hello", "hello"))
        .build()
        .unwrap();

    let response = app.handle(HttpRequest::new("GET", "/hello")).await;
    assert_eq!(response.json().unwrap()["message"], "Hello world");
}

#[test]
fn test_explicit_name_conflicting_with_builtin_fails() {
    let err = Application::builder()
        .module(ModuleEntry::value(Category::Utility, "whatever", ()).named("$utils"))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateModuleName(ref name) if name == "$utils"));
}
