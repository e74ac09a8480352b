// Temporary project directories for tests that load from disk

use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway project tree (`config/`, `schemas/`, `routes/`, `strings/`,
/// ...) removed when dropped.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of `relative` inside the project
    pub fn join(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write a text file, creating parent directories
    pub fn file(&self, relative: &str, content: &str) -> io::Result<&Self> {
        let path = self.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(self)
    }

    /// Write a pretty-printed JSON file
    pub fn json(&self, relative: &str, value: &Value) -> io::Result<&Self> {
        let content = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        self.file(relative, &content)
    }
}
