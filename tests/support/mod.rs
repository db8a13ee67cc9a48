//! Shared fixtures for integration tests

#![allow(dead_code)]

use serverpack::fs::RealFileSystem;
use serverpack::{BuildConfig, GroupResolver, ResolutionResult, SourceDescriptor};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const PACKAGE_JSON: &str = r#"{
  "name": "frontend",
  "version": "1.0.0",
  "scripts": {
    "build": "mkdir -p public && cp src/index.html public/index.html",
    "start": "node server.js"
  },
  "engines": {
    "node": "20.x"
  }
}
"#;

/// Application directory on disk, removed when dropped
pub struct AppFixture {
    dir: TempDir,
}

impl AppFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(self, relative: &str, content: &str) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write fixture file");
        self
    }

    pub fn dir(self, relative: &str) -> Self {
        fs::create_dir_all(self.dir.path().join(relative)).expect("Failed to create directory");
        self
    }

    /// Node frontend with a build script and sources under `src/`
    pub fn npm_frontend() -> Self {
        Self::new()
            .file("package.json", PACKAGE_JSON)
            .file("package-lock.json", "{}")
            .file("src/index.html", "<h1>Hello</h1>")
    }

    pub fn yarn_frontend() -> Self {
        Self::npm_frontend().file("yarn.lock", "# yarn lockfile v1\n")
    }

    /// Static site served by the named server's configuration file
    pub fn static_site(config_file: &str) -> Self {
        Self::new()
            .file(config_file, "# server configuration\n")
            .file("public/index.html", "<h1>Static</h1>")
    }

    /// Service binding under `bindings/`, with a `type` file when `kind` is set
    pub fn binding(self, name: &str, kind: Option<&str>) -> Self {
        let fixture = self.file(
            &format!("bindings/{}/ca.pem", name),
            "-----BEGIN CERTIFICATE-----\n",
        );
        match kind {
            Some(kind) => fixture.file(&format!("bindings/{}/type", name), kind),
            None => fixture,
        }
    }

    pub fn scan(&self, config: &BuildConfig) -> SourceDescriptor {
        SourceDescriptor::scan(&RealFileSystem, self.path(), config).expect("Failed to scan fixture")
    }

    pub fn resolve(&self, vars: &[(&str, &str)]) -> ResolutionResult {
        let config = BuildConfig::from_vars(vars.iter().copied()).expect("Invalid configuration");
        let source = self.scan(&config);
        GroupResolver::with_defaults()
            .resolve(&source, &config)
            .expect("Resolution failed")
    }
}
