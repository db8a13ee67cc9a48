//! Stage metadata and the pure parsers that produce it
//!
//! Everything here is a string-to-mapping transformation with no access to the
//! filesystem or the process environment.

use crate::config::{ConfigError, BPE_PREFIX, BP_IMAGE_LABELS};
use crate::exclusion::ExclusionPlan;
use crate::source::Process;
use serde::Serialize;
use std::collections::BTreeMap;

/// Data a stage injects rather than files it contributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StageMetadata {
    None,
    Certificates {
        bindings: Vec<String>,
    },
    NodeEngine {
        version: Option<String>,
        source: Option<VersionSource>,
    },
    RunScripts {
        scripts: Vec<String>,
    },
    WebServer {
        selected_by: WebServerSelection,
    },
    Environment {
        variables: BTreeMap<String, String>,
    },
    Labels {
        labels: BTreeMap<String, String>,
    },
    LiveReload {
        enabled: bool,
    },
    Processes {
        processes: Vec<Process>,
    },
    SourceRemoval(ExclusionPlan),
}

impl StageMetadata {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Injected environment variables, if this is an environment stage
    pub fn variables(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Environment { variables } => Some(variables),
            _ => None,
        }
    }

    pub fn labels(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Labels { labels } => Some(labels),
            _ => None,
        }
    }
}

/// Where the Node.js version constraint came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VersionSource {
    #[serde(rename = "BP_NODE_VERSION")]
    BuildConfig,
    #[serde(rename = "package.json")]
    PackageJson,
    #[serde(rename = ".nvmrc")]
    Nvmrc,
    #[serde(rename = ".node-version")]
    NodeVersionFile,
}

/// Why a web server was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WebServerSelection {
    /// `BP_WEB_SERVER` names it
    Explicit,
    /// Its configuration file is in the app
    Marker,
    /// Frontend app without a server config; NGINX serves the build output
    FrontendDefault,
}

/// Turns `BPE_<NAME>=value` pairs into `NAME=value`. Later keys win.
pub fn parse_environment_variables(
    pairs: &[(String, String)],
) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut variables = BTreeMap::new();

    for (key, value) in pairs {
        let name = key.strip_prefix(BPE_PREFIX).unwrap_or(key);
        if name.is_empty() {
            return Err(ConfigError::EmptyEnvironmentName { key: key.clone() });
        }
        variables.insert(name.to_string(), value.clone());
    }

    Ok(variables)
}

/// Parses `BP_IMAGE_LABELS`.
///
/// Pairs are separated by whitespace and split on the first `=`. Double quotes
/// group text containing whitespace and are removed, so
/// `description="static site" tier=web` gives two labels.
pub fn parse_image_labels(raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut labels = BTreeMap::new();

    for token in split_quoted(raw)? {
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedLabel {
                entry: token.clone(),
            })?;
        if key.is_empty() {
            return Err(ConfigError::MalformedLabel { entry: token });
        }
        labels.insert(key.to_string(), value.to_string());
    }

    Ok(labels)
}

fn split_quoted(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for c in raw.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quoted {
        return Err(ConfigError::UnterminatedQuote {
            key: BP_IMAGE_LABELS.to_string(),
            value: raw.to_string(),
        });
    }
    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}
