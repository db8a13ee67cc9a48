//! Build configuration for the resolver
//!
//! The resolver never reads the process environment. Options are collected at
//! the process boundary into a [`BuildConfig`] and passed by value.
//!
//! # Recognized options
//!
//! - `BP_NODE_RUN_SCRIPTS`: comma-separated scripts for the run-script stage
//! - `BP_NODE_VERSION`: Node.js version constraint for the engine stage
//! - `BP_LIVE_RELOAD_ENABLED`: enable watchexec live reload (boolean)
//! - `BP_IMAGE_LABELS`: `key=value` pairs applied as image labels
//! - `BPE_<NAME>`: environment variable `NAME` injected into the launch image
//! - `BP_WEB_SERVER`: explicit web server (`nginx` or `httpd`)
//! - `BP_EXCLUDE_FILES` / `BP_INCLUDE_FILES`: colon-separated path globs
//! - `SERVICE_BINDING_ROOT`: directory holding service bindings
//! - `PORT`: only consumed by the run harness
//!
//! Anything else is ignored.
//!
//! # Example
//!
//! ```
//! use serverpack::BuildConfig;
//!
//! let config = BuildConfig::from_vars([
//!     ("BP_NODE_RUN_SCRIPTS", "build"),
//!     ("BPE_SOME_VARIABLE", "some-value"),
//!     ("HOME", "/root"),
//! ])
//! .unwrap();
//!
//! assert_eq!(config.node_run_scripts, vec!["build".to_string()]);
//! assert!(config.has_environment_variables());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, trace};

pub const BP_NODE_RUN_SCRIPTS: &str = "BP_NODE_RUN_SCRIPTS";
pub const BP_NODE_VERSION: &str = "BP_NODE_VERSION";
pub const BP_LIVE_RELOAD_ENABLED: &str = "BP_LIVE_RELOAD_ENABLED";
pub const BP_IMAGE_LABELS: &str = "BP_IMAGE_LABELS";
pub const BP_WEB_SERVER: &str = "BP_WEB_SERVER";
pub const BP_EXCLUDE_FILES: &str = "BP_EXCLUDE_FILES";
pub const BP_INCLUDE_FILES: &str = "BP_INCLUDE_FILES";
pub const SERVICE_BINDING_ROOT: &str = "SERVICE_BINDING_ROOT";
pub const PORT: &str = "PORT";
pub const BPE_PREFIX: &str = "BPE_";

/// Separator used by the file inclusion/exclusion options
const PATH_LIST_SEPARATOR: char = ':';

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid boolean for {key}: {value:?}. Valid options: true, false, 1, 0, t, f")]
    InvalidBoolean { key: String, value: String },

    #[error("Invalid web server: {0:?}. Valid options: nginx, httpd")]
    InvalidWebServer(String),

    #[error("Invalid PORT: {0:?}")]
    InvalidPort(String),

    #[error("Malformed image label {entry:?}: expected key=value")]
    MalformedLabel { entry: String },

    #[error("Unterminated quote in {key}: {value:?}")]
    UnterminatedQuote { key: String, value: String },

    #[error("Environment variable key {key:?} has no name after the BPE_ prefix")]
    EmptyEnvironmentName { key: String },

    #[error("Invalid pattern {pattern:?} in {key}: {message}")]
    InvalidPattern {
        key: String,
        pattern: String,
        message: String,
    },

    #[error("{key} names script {script:?} which package.json does not define")]
    UnknownRunScript { key: String, script: String },

    #[error("Failed to parse project.toml: {0}")]
    ProjectToml(String),
}

/// Web server explicitly requested through `BP_WEB_SERVER`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebServer {
    Nginx,
    Httpd,
}

impl FromStr for WebServer {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nginx" => Ok(Self::Nginx),
            "httpd" => Ok(Self::Httpd),
            _ => Err(ConfigError::InvalidWebServer(s.to_string())),
        }
    }
}

impl fmt::Display for WebServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nginx => write!(f, "nginx"),
            Self::Httpd => write!(f, "httpd"),
        }
    }
}

/// Recognized build options, parsed and validated.
///
/// Free-form values (`BP_IMAGE_LABELS`, `BPE_*`) are kept raw here and turned
/// into mappings by [`crate::metadata`] when the owning stage is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildConfig {
    pub node_run_scripts: Vec<String>,
    pub node_version: Option<String>,
    pub live_reload_enabled: bool,
    pub image_labels: Option<String>,
    /// Raw `BPE_*` pairs in the order they were supplied
    pub environment: Vec<(String, String)>,
    pub web_server: Option<WebServer>,
    pub exclude_files: Vec<String>,
    pub include_files: Vec<String>,
    pub service_binding_root: Option<PathBuf>,
    pub port: Option<u16>,
}

impl BuildConfig {
    /// Builds a configuration from raw key/value pairs.
    ///
    /// When a key appears more than once the last value wins.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();

        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                BP_NODE_RUN_SCRIPTS => config.node_run_scripts = split_list(value, ','),
                BP_NODE_VERSION => config.node_version = non_blank(value),
                BP_LIVE_RELOAD_ENABLED => config.live_reload_enabled = parse_bool(key, value)?,
                BP_IMAGE_LABELS => config.image_labels = Some(value.to_string()),
                BP_WEB_SERVER => {
                    config.web_server = match non_blank(value) {
                        Some(v) => Some(v.parse()?),
                        None => None,
                    }
                }
                BP_EXCLUDE_FILES => {
                    config.exclude_files = split_list(value, PATH_LIST_SEPARATOR)
                }
                BP_INCLUDE_FILES => {
                    config.include_files = split_list(value, PATH_LIST_SEPARATOR)
                }
                SERVICE_BINDING_ROOT => {
                    config.service_binding_root = non_blank(value).map(PathBuf::from)
                }
                PORT => {
                    config.port = match non_blank(value) {
                        Some(v) => Some(
                            v.parse::<u16>()
                                .map_err(|_| ConfigError::InvalidPort(value.to_string()))?,
                        ),
                        None => None,
                    }
                }
                _ if key.starts_with(BPE_PREFIX) => {
                    config.environment.push((key.to_string(), value.to_string()))
                }
                _ => trace!(key, "Ignoring unrecognized option"),
            }
        }

        debug!(
            run_scripts = ?config.node_run_scripts,
            live_reload = config.live_reload_enabled,
            web_server = ?config.web_server,
            bpe_count = config.environment.len(),
            "Build configuration loaded"
        );

        Ok(config)
    }

    /// Reads the recognized options from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(process_vars())
    }

    pub fn has_environment_variables(&self) -> bool {
        !self.environment.is_empty()
    }

    /// True when `BP_IMAGE_LABELS` is set to something other than whitespace
    pub fn has_image_labels(&self) -> bool {
        self.image_labels
            .as_deref()
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn has_source_filters(&self) -> bool {
        !self.exclude_files.is_empty() || !self.include_files.is_empty()
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();

        if !self.node_run_scripts.is_empty() {
            map.insert(BP_NODE_RUN_SCRIPTS.to_string(), self.node_run_scripts.join(","));
        }
        if let Some(ref version) = self.node_version {
            map.insert(BP_NODE_VERSION.to_string(), version.clone());
        }
        map.insert(
            BP_LIVE_RELOAD_ENABLED.to_string(),
            self.live_reload_enabled.to_string(),
        );
        if let Some(ref labels) = self.image_labels {
            map.insert(BP_IMAGE_LABELS.to_string(), labels.clone());
        }
        if let Some(server) = self.web_server {
            map.insert(BP_WEB_SERVER.to_string(), server.to_string());
        }
        if !self.exclude_files.is_empty() {
            map.insert(BP_EXCLUDE_FILES.to_string(), self.exclude_files.join(":"));
        }
        if !self.include_files.is_empty() {
            map.insert(BP_INCLUDE_FILES.to_string(), self.include_files.join(":"));
        }
        if let Some(ref root) = self.service_binding_root {
            map.insert(SERVICE_BINDING_ROOT.to_string(), root.display().to_string());
        }
        if let Some(port) = self.port {
            map.insert(PORT.to_string(), port.to_string());
        }
        for (key, value) in &self.environment {
            map.insert(key.clone(), value.clone());
        }

        map
    }
}

impl fmt::Display for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Build Configuration:")?;
        for (key, value) in self.to_display_map() {
            writeln!(f, "  {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Process environment as UTF-8 pairs. Entries that are not valid UTF-8 can
/// never be recognized options and are skipped.
pub fn process_vars() -> Vec<(String, String)> {
    env::vars_os()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (key, _) => {
                trace!(key = ?key, "Skipping non UTF-8 environment entry");
                None
            }
        })
        .collect()
}

/// Parses a boolean: `1 t T TRUE true True`, their false forms, or blank
pub fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "" | "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(ConfigError::InvalidBoolean {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn split_list(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProjectDescriptor {
    #[serde(default)]
    io: Option<IoTable>,
    #[serde(default)]
    build: Option<BuildTable>,
}

#[derive(Debug, Default, Deserialize)]
struct IoTable {
    #[serde(default)]
    buildpacks: Option<BuildTable>,
}

#[derive(Debug, Default, Deserialize)]
struct BuildTable {
    #[serde(default)]
    build: Option<BuildEnvTable>,
    #[serde(default)]
    env: Vec<EnvEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct BuildEnvTable {
    #[serde(default)]
    env: Vec<EnvEntry>,
}

#[derive(Debug, Deserialize)]
struct EnvEntry {
    name: String,
    #[serde(default)]
    value: String,
}

/// Extracts build-time environment entries from a `project.toml` descriptor.
///
/// Both `[[io.buildpacks.build.env]]` and the legacy `[[build.env]]` tables are
/// read; legacy entries come first so the newer table wins on conflicts.
pub fn project_build_env(content: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let descriptor: ProjectDescriptor =
        toml::from_str(content).map_err(|e| ConfigError::ProjectToml(e.to_string()))?;

    let legacy = descriptor.build.map(|b| b.env).unwrap_or_default();
    let current = descriptor
        .io
        .and_then(|io| io.buildpacks)
        .and_then(|bp| bp.build)
        .map(|b| b.env)
        .unwrap_or_default();

    Ok(legacy
        .into_iter()
        .chain(current)
        .map(|e| (e.name, e.value))
        .collect())
}
