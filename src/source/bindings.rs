//! Service bindings discovered under `SERVICE_BINDING_ROOT`

use crate::fs::FileSystem;
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Binding type consumed by the CA certificates stage
pub const CA_CERTIFICATES_BINDING: &str = "ca-certificates";

/// File holding the binding type, per the service binding layout
const TYPE_FILE: &str = "type";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub path: PathBuf,
}

impl Binding {
    pub fn new(name: impl Into<String>, kind: Option<&str>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind: kind.map(str::to_string),
            path: path.into(),
        }
    }

    /// A binding matches when its `type` file or, lacking one, its directory
    /// name equals `binding_type`.
    pub fn is_type(&self, binding_type: &str) -> bool {
        match self.kind.as_deref() {
            Some(kind) => kind == binding_type,
            None => self.name == binding_type,
        }
    }
}

/// Lists the bindings under `root`, sorted by name.
///
/// A missing root yields no bindings.
pub fn scan_bindings(fs: &dyn FileSystem, root: &Path) -> Result<Vec<Binding>> {
    if !fs.is_dir(root) {
        debug!(root = %root.display(), "Binding root not present");
        return Ok(Vec::new());
    }

    let mut bindings = Vec::new();
    for entry in fs.read_dir(root)? {
        if !entry.is_dir() {
            continue;
        }

        let type_path = entry.path().join(TYPE_FILE);
        let kind = if fs.is_file(&type_path) {
            match fs.read_to_string(&type_path) {
                Ok(content) => Some(content.trim().to_string()).filter(|k| !k.is_empty()),
                Err(e) => {
                    warn!(binding = entry.file_name(), error = %e, "Failed to read binding type");
                    None
                }
            }
        } else {
            None
        };

        debug!(binding = entry.file_name(), kind = ?kind, "Found binding");
        bindings.push(Binding {
            name: entry.file_name().to_string(),
            kind,
            path: entry.path().to_path_buf(),
        });
    }

    Ok(bindings)
}
