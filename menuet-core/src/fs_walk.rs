//! Recursive discovery of data files (schemas, routes, strings).
//!
//! Files are visited in file-name order. Hidden entries (names starting
//! with `.`) are skipped together with everything beneath them. A file's
//! logical name is its path relative to the root, `/`-separated, without
//! the extension: `schemas/user/create.json` becomes `user/create`.
//!
//! Files are read on every call; nothing is cached between loads.

use crate::Error;
use crate::logging::{debug, trace};
use serde_json::Value;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A discovered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundFile {
    pub name: String,
    pub path: PathBuf,
}

/// A parsed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFile {
    pub name: String,
    pub path: PathBuf,
    pub value: Value,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

fn logical_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut parts: Vec<String> = relative
        .parent()
        .into_iter()
        .flat_map(|parent| parent.components())
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if let Some(stem) = relative.file_stem() {
        parts.push(stem.to_string_lossy().into_owned());
    }
    parts.join("/")
}

/// List files under `root` whose extension is in `extensions`
/// (without the dot, compared case-insensitively).
pub fn walk(root: &Path, extensions: &[&str]) -> Result<Vec<FoundFile>, Error> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry))
    {
        let entry = entry.map_err(|e| {
            Error::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let accepted = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);
        if !accepted {
            trace!(path = %entry.path().display(), "Skipping file with unaccepted extension");
            continue;
        }

        found.push(FoundFile {
            name: logical_name(root, entry.path()),
            path: entry.path().to_path_buf(),
        });
    }

    debug!(root = %root.display(), files = found.len(), "Directory walked");
    Ok(found)
}

/// Parse every `.json` file under `root`.
pub fn read_json_dir(root: &Path) -> Result<Vec<JsonFile>, Error> {
    walk(root, &["json"])?
        .into_iter()
        .map(|file| {
            let raw = std::fs::read(&file.path)?;
            let value = serde_json::from_slice(&raw).map_err(|e| {
                Error::Config(format!("cannot parse {}: {e}", file.path.display()))
            })?;
            Ok(JsonFile {
                name: file.name,
                path: file.path,
                value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_walk_names_and_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("user/admin")).unwrap();
        fs::write(dir.path().join("ping.json"), "{}").unwrap();
        fs::write(dir.path().join("user/create.json"), "{}").unwrap();
        fs::write(dir.path().join("user/admin/list.json"), "{}").unwrap();
        fs::write(dir.path().join("user/notes.txt"), "x").unwrap();

        let names: Vec<_> = walk(dir.path(), &["json"])
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["ping", "user/admin/list", "user/create"]);
    }

    #[test]
    fn test_walk_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".cache")).unwrap();
        fs::write(dir.path().join(".cache/a.json"), "{}").unwrap();
        fs::write(dir.path().join(".draft.json"), "{}").unwrap();
        fs::write(dir.path().join("real.json"), "{}").unwrap();

        let files = walk(dir.path(), &["json"]).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "real");
    }

    #[test]
    fn test_read_json_dir_rereads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("en.json");
        fs::write(&path, r#"{"hello": "Hello"}"#).unwrap();
        assert_eq!(read_json_dir(dir.path()).unwrap()[0].value["hello"], "Hello");

        fs::write(&path, r#"{"hello": "Hi"}"#).unwrap();
        assert_eq!(read_json_dir(dir.path()).unwrap()[0].value["hello"], "Hi");
    }

    #[test]
    fn test_read_json_dir_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        assert!(matches!(read_json_dir(dir.path()), Err(Error::Config(_))));
    }
}
