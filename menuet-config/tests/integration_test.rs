//! Integration tests for menuet-config

use menuet_config::*;
use serde_json::json;
use std::fs;
use std::path::Path;

fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

#[test]
fn test_layers_apply_in_order() {
    let dir = project(&[
        (
            "config/production.json",
            r#"{"http": {"port": 8080, "base": "/api"}, "mail": {"sender": "noreply@menuet.dev"}}"#,
        ),
        ("config/paths.json", r#"{"schemas": "app/schemas", "uploads": "var/uploads"}"#),
    ]);

    let loaded = ConfigManager::new(dir.path())
        .env("production")
        .with_vars(vec![("MENUET_HTTP__PORT", "9090"), ("UNRELATED", "1")])
        .load()
        .unwrap();

    let settings = &loaded.settings;
    assert_eq!(settings.http.port, 9090);
    assert_eq!(settings.http.base, "/api");
    assert_eq!(settings.paths.schemas, dir.path().join("app/schemas"));
    assert_eq!(settings.paths.routes, dir.path().join("routes"));
    assert_eq!(
        loaded.get::<String>("paths.uploads").unwrap(),
        dir.path().join("var/uploads").to_string_lossy()
    );
    assert_eq!(loaded.get::<String>("mail.sender").unwrap(), "noreply@menuet.dev");
}

#[test]
fn test_config_builtin_sees_raw_document() {
    let dir = project(&[("config/development.json", r#"{"feature": {"beta": true}}"#)]);

    let loaded = ConfigManager::new(dir.path())
        .with_vars(Vec::<(String, String)>::new())
        .load()
        .unwrap();

    let config = loaded.config();
    assert_eq!(config.get("feature.beta"), Some(&json!(true)));
    assert_eq!(config.get_as::<u16>("http.port").unwrap(), 3000);
}

#[test]
fn test_absolute_paths_are_kept() {
    let dir = project(&[("config/paths.json", r#"{"strings": "/opt/strings"}"#)]);

    let loaded = ConfigManager::new(dir.path())
        .with_vars(Vec::<(String, String)>::new())
        .load()
        .unwrap();
    assert_eq!(loaded.settings.paths.strings, Path::new("/opt/strings"));
}

#[test]
fn test_invalid_file_reports_parse_error() {
    let dir = project(&[("config/development.json", "{ not json")]);

    let err = ConfigManager::new(dir.path())
        .with_vars(Vec::<(String, String)>::new())
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));

    let core: menuet_core::Error = err.into();
    assert!(matches!(core, menuet_core::Error::Config(_)));
}

#[test]
fn test_invalid_setting_is_rejected() {
    let dir = project(&[(
        "config/development.json",
        r#"{"validation": {"undeclaredResponseFields": "ignore"}}"#,
    )]);

    let err = ConfigManager::new(dir.path())
        .with_vars(Vec::<(String, String)>::new())
        .load()
        .unwrap_err();
    assert!(err.to_string().contains("validation.undeclaredResponseFields"));
}
