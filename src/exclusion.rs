//! Source removal planning
//!
//! Decides which top-level paths of the application leave the final image.
//! The plan is computed from the unmodified [`SourceDescriptor`]; applying it
//! is up to the stage that runs last.

use crate::config::{ConfigError, BP_EXCLUDE_FILES, BP_INCLUDE_FILES};
use crate::source::{EntryKind, SourceDescriptor};
use ignore::overrides::{Override, OverrideBuilder};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Remove paths matching any pattern
    Exclude,
    /// Keep only paths matching a pattern
    Include,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExclusionPlan {
    pub mode: FilterMode,
    pub patterns: Vec<String>,
    pub removed: Vec<String>,
    pub retained: Vec<String>,
}

impl ExclusionPlan {
    pub fn removes(&self, path: &str) -> bool {
        self.removed.iter().any(|p| p == path)
    }
}

/// Builds the removal plan, or `None` when no patterns are configured.
///
/// Include patterns take precedence; exclude patterns are ignored when both are
/// set.
pub fn plan_source_removal(
    source: &SourceDescriptor,
    include: &[String],
    exclude: &[String],
) -> Result<Option<ExclusionPlan>, ConfigError> {
    let (mode, key, patterns) = match (include.is_empty(), exclude.is_empty()) {
        (true, true) => return Ok(None),
        (false, excluded_empty) => {
            if !excluded_empty {
                warn!("{} is set, ignoring {}", BP_INCLUDE_FILES, BP_EXCLUDE_FILES);
            }
            (FilterMode::Include, BP_INCLUDE_FILES, include)
        }
        (true, false) => (FilterMode::Exclude, BP_EXCLUDE_FILES, exclude),
    };

    let matcher = build_matcher(source, key, patterns)?;

    let mut removed = Vec::new();
    let mut retained = Vec::new();
    for path in source.paths() {
        let is_dir = source.entry_kind(path) == Some(EntryKind::Directory);
        let matched = matcher.matched(source.root().join(path), is_dir).is_whitelist();
        let remove = match mode {
            FilterMode::Exclude => matched,
            FilterMode::Include => !matched,
        };

        if remove {
            removed.push(path.to_string());
        } else {
            retained.push(path.to_string());
        }
    }

    debug!(mode = ?mode, removed = ?removed, "Planned source removal");

    Ok(Some(ExclusionPlan {
        mode,
        patterns: patterns.to_vec(),
        removed,
        retained,
    }))
}

fn build_matcher(
    source: &SourceDescriptor,
    key: &str,
    patterns: &[String],
) -> Result<Override, ConfigError> {
    let invalid = |pattern: &str, e: ignore::Error| ConfigError::InvalidPattern {
        key: key.to_string(),
        pattern: pattern.to_string(),
        message: e.to_string(),
    };

    let mut builder = OverrideBuilder::new(source.root());
    for pattern in patterns {
        let glob = pattern.trim_start_matches("./");
        builder.add(glob).map_err(|e| invalid(pattern, e))?;
    }
    builder.build().map_err(|e| invalid(&patterns.join(":"), e))
}
