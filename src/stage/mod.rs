//! Stage candidates for the web servers buildpack group
//!
//! Every sub-buildpack the group can run is a [`StageCandidate`]: an
//! identifier, a family tag, a priority inside its family, a detection
//! predicate, an optional requirement on another family or stage, and an
//! optional metadata producer. [`StageTable`] holds the candidates in output
//! order.
//!
//! # Example
//!
//! ```
//! use serverpack::stage::{Family, StageId, StageTable};
//!
//! let table = StageTable::with_defaults();
//! let nginx = table.get(StageId::Nginx).unwrap();
//! assert_eq!(nginx.family, Family::WebServer);
//! assert!(Family::WebServer.is_exclusive());
//! ```

#[macro_use]
pub mod id_enum_macro;

pub mod stage_id;
pub mod table;

pub use stage_id::StageId;
pub use table::StageTable;

use crate::config::{BuildConfig, ConfigError};
use crate::metadata::StageMetadata;
use crate::source::SourceDescriptor;
use serde::Serialize;
use std::fmt;

/// Mutual exclusion and ordering groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Family {
    Certificates,
    NodeRuntime,
    PackageManager,
    WebServer,
    Utility,
}

impl Family {
    /// At most one member of an exclusive family is included
    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::PackageManager | Self::WebServer)
    }

    /// Families that make up the core of the group; utilities never reorder them
    pub fn is_mandatory(&self) -> bool {
        matches!(self, Self::NodeRuntime | Self::PackageManager | Self::WebServer)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Certificates => "certificates",
            Self::NodeRuntime => "node-runtime",
            Self::PackageManager => "package-manager",
            Self::WebServer => "web-server",
            Self::Utility => "utility",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Companion rule: a candidate whose predicate holds is still dropped unless
/// its requirement is included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "kebab-case")]
pub enum Requirement {
    None,
    Family(Family),
    Stage(StageId),
}

/// Inputs visible to predicates and metadata producers
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext<'a> {
    pub source: &'a SourceDescriptor,
    pub config: &'a BuildConfig,
}

impl<'a> DetectionContext<'a> {
    pub fn new(source: &'a SourceDescriptor, config: &'a BuildConfig) -> Self {
        Self { source, config }
    }
}

pub type DetectFn = fn(&DetectionContext<'_>) -> bool;
pub type MetadataFn = fn(&DetectionContext<'_>) -> Result<StageMetadata, ConfigError>;

#[derive(Clone)]
pub struct StageCandidate {
    pub id: StageId,
    pub family: Family,
    /// Higher wins inside an exclusive family
    pub priority: u8,
    pub requires: Requirement,
    pub detect: DetectFn,
    pub metadata: Option<MetadataFn>,
}

impl StageCandidate {
    pub fn new(id: StageId, family: Family, detect: DetectFn) -> Self {
        Self {
            id,
            family,
            priority: 0,
            requires: Requirement::None,
            detect,
            metadata: None,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn requires(mut self, requirement: Requirement) -> Self {
        self.requires = requirement;
        self
    }

    pub fn with_metadata(mut self, producer: MetadataFn) -> Self {
        self.metadata = Some(producer);
        self
    }

    pub fn detect(&self, ctx: &DetectionContext<'_>) -> bool {
        (self.detect)(ctx)
    }

    pub fn extract_metadata(&self, ctx: &DetectionContext<'_>) -> Result<StageMetadata, ConfigError> {
        match self.metadata {
            Some(producer) => producer(ctx),
            None => Ok(StageMetadata::None),
        }
    }
}

impl fmt::Debug for StageCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageCandidate")
            .field("id", &self.id)
            .field("family", &self.family)
            .field("priority", &self.priority)
            .field("requires", &self.requires)
            .field("has_metadata", &self.metadata.is_some())
            .finish()
    }
}
