//! Read-only description of an application source tree
//!
//! A [`SourceDescriptor`] is built once per build, either by scanning a
//! directory through a [`FileSystem`] or through [`SourceDescriptorBuilder`].
//! All I/O happens here; resolution only reads the finished descriptor.

pub mod bindings;
pub mod package;
pub mod procfile;

pub use bindings::{Binding, CA_CERTIFICATES_BINDING};
pub use package::PackageManifest;
pub use procfile::{Process, Procfile};

use crate::config::BuildConfig;
use crate::fs::FileSystem;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const PACKAGE_JSON: &str = "package.json";
pub const YARN_LOCK: &str = "yarn.lock";
pub const PROCFILE: &str = "Procfile";
pub const NGINX_CONF: &str = "nginx.conf";
pub const HTTPD_CONF: &str = "httpd.conf";
pub const NVMRC: &str = ".nvmrc";
pub const NODE_VERSION_FILE: &str = ".node-version";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// Version constraint read from a version file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionFile {
    pub file: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    root: PathBuf,
    entries: BTreeMap<String, EntryKind>,
    package: Option<PackageManifest>,
    procfile: Option<Procfile>,
    version_file: Option<VersionFile>,
    bindings: Vec<Binding>,
}

impl SourceDescriptor {
    pub fn builder(root: impl Into<PathBuf>) -> SourceDescriptorBuilder {
        SourceDescriptorBuilder::new(root)
    }

    /// Scans the top level of `root` and the configured binding root.
    ///
    /// A relative `SERVICE_BINDING_ROOT` is resolved against `root`.
    pub fn scan(fs: &dyn FileSystem, root: &Path, config: &BuildConfig) -> Result<Self> {
        if !fs.is_dir(root) {
            anyhow::bail!("Application path is not a directory: {:?}", root);
        }
        let root = fs
            .canonicalize(root)
            .context("Failed to canonicalize application path")?;

        let mut builder = SourceDescriptorBuilder::new(root.clone());
        for entry in fs.read_dir(&root)? {
            if entry.is_dir() {
                builder = builder.dir(entry.file_name());
                continue;
            }
            if !entry.is_file() {
                debug!(
                    entry = entry.file_name(),
                    "Skipping entry that is neither file nor directory"
                );
                continue;
            }

            // Unreadable markers still count as present, just without facts
            let content = if SourceDescriptorBuilder::is_parsed_marker(entry.file_name()) {
                match fs.read_to_string(entry.path()) {
                    Ok(content) => Some(content),
                    Err(e) => {
                        warn!(marker = entry.file_name(), error = %e, "Failed to read marker file");
                        None
                    }
                }
            } else {
                None
            };
            builder = match content {
                Some(content) => builder.file_with_content(entry.file_name(), &content),
                None => builder.file(entry.file_name()),
            };
        }

        if let Some(binding_root) = &config.service_binding_root {
            let binding_root = if binding_root.is_absolute() {
                binding_root.clone()
            } else {
                root.join(binding_root)
            };
            for binding in bindings::scan_bindings(fs, &binding_root)? {
                builder = builder.binding(binding);
            }
        }

        let descriptor = builder.build();
        info!(
            root = %descriptor.root.display(),
            entries = descriptor.entries.len(),
            bindings = descriptor.bindings.len(),
            "Scanned application source"
        );
        Ok(descriptor)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.entries.get(name) == Some(&EntryKind::File)
    }

    /// Top-level entry names, sorted
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entry_kind(&self, name: &str) -> Option<EntryKind> {
        self.entries.get(name).copied()
    }

    pub fn is_node_app(&self) -> bool {
        self.has_file(PACKAGE_JSON)
    }

    pub fn package(&self) -> Option<&PackageManifest> {
        self.package.as_ref()
    }

    pub fn procfile(&self) -> Option<&Procfile> {
        self.procfile.as_ref()
    }

    pub fn version_file(&self) -> Option<&VersionFile> {
        self.version_file.as_ref()
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn bindings_of_type<'a>(&'a self, binding_type: &'a str) -> impl Iterator<Item = &'a Binding> {
        self.bindings.iter().filter(move |b| b.is_type(binding_type))
    }
}

/// Builds a [`SourceDescriptor`] without touching a filesystem
#[derive(Debug, Clone)]
pub struct SourceDescriptorBuilder {
    root: PathBuf,
    entries: BTreeMap<String, EntryKind>,
    package: Option<PackageManifest>,
    procfile: Option<Procfile>,
    version_files: BTreeMap<String, String>,
    bindings: Vec<Binding>,
}

impl SourceDescriptorBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: BTreeMap::new(),
            package: None,
            procfile: None,
            version_files: BTreeMap::new(),
            bindings: Vec::new(),
        }
    }

    /// Marker files whose content feeds stage metadata
    fn is_parsed_marker(name: &str) -> bool {
        matches!(name, PACKAGE_JSON | PROCFILE | NVMRC | NODE_VERSION_FILE)
    }

    pub fn file(mut self, name: &str) -> Self {
        self.entries.insert(name.to_string(), EntryKind::File);
        if name == PACKAGE_JSON && self.package.is_none() {
            self.package = Some(PackageManifest::default());
        }
        if name == PROCFILE && self.procfile.is_none() {
            self.procfile = Some(Procfile::default());
        }
        self
    }

    pub fn file_with_content(mut self, name: &str, content: &str) -> Self {
        self.entries.insert(name.to_string(), EntryKind::File);
        match name {
            PACKAGE_JSON => self.package = Some(PackageManifest::parse(content)),
            PROCFILE => self.procfile = Some(Procfile::parse(content)),
            NVMRC | NODE_VERSION_FILE => {
                if let Some(version) = package::normalize_version_file(content) {
                    self.version_files.insert(name.to_string(), version);
                }
            }
            _ => {}
        }
        self
    }

    pub fn dir(mut self, name: &str) -> Self {
        self.entries.insert(name.to_string(), EntryKind::Directory);
        self
    }

    pub fn binding(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn build(mut self) -> SourceDescriptor {
        self.bindings.sort_by(|a, b| a.name.cmp(&b.name));

        // .nvmrc wins over .node-version
        let version_file = [NVMRC, NODE_VERSION_FILE].iter().find_map(|file| {
            self.version_files.get(*file).map(|version| VersionFile {
                file: file.to_string(),
                version: version.clone(),
            })
        });

        debug!(
            entries = ?self.entries.keys().collect::<Vec<_>>(),
            "Built source descriptor"
        );

        SourceDescriptor {
            root: self.root,
            entries: self.entries,
            package: self.package,
            procfile: self.procfile,
            version_file,
            bindings: self.bindings,
        }
    }
}
