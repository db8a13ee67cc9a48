use crate::metadata::StageMetadata;
use crate::stage::{Family, Requirement, StageId};
use serde::Serialize;
use std::fmt;

/// Why a candidate ended up in or out of the group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum Decision {
    Included,
    NotDetected,
    /// A higher-priority member of the same exclusive family was chosen
    Outranked { by: StageId },
    MissingRequirement { requirement: Requirement },
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Included => write!(f, "included"),
            Self::NotDetected => write!(f, "not detected"),
            Self::Outranked { by } => write!(f, "outranked by {}", by.display_name()),
            Self::MissingRequirement { requirement } => match requirement {
                Requirement::None => write!(f, "missing requirement"),
                Requirement::Family(family) => write!(f, "requires a {} stage", family),
                Requirement::Stage(id) => write!(f, "requires {}", id.display_name()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionEntry {
    pub stage: StageId,
    pub family: Family,
    pub included: bool,
    pub decision: Decision,
    #[serde(skip_serializing_if = "StageMetadata::is_none")]
    pub metadata: StageMetadata,
}

impl ResolutionEntry {
    pub fn display_name(&self) -> &'static str {
        self.stage.display_name()
    }
}

/// One entry per candidate, in table order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    entries: Vec<ResolutionEntry>,
}

impl ResolutionResult {
    pub fn new(entries: Vec<ResolutionEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ResolutionEntry] {
        &self.entries
    }

    pub fn included(&self) -> impl Iterator<Item = &ResolutionEntry> {
        self.entries.iter().filter(|e| e.included)
    }

    pub fn get(&self, stage: StageId) -> Option<&ResolutionEntry> {
        self.entries.iter().find(|e| e.stage == stage)
    }

    pub fn is_included(&self, stage: StageId) -> bool {
        self.get(stage).map_or(false, |e| e.included)
    }

    /// Display names of the included stages, in execution order
    pub fn log_lines(&self) -> Vec<&'static str> {
        self.included().map(|e| e.display_name()).collect()
    }

    /// A web server or a package manager made it into the group
    pub fn is_runnable(&self) -> bool {
        self.included()
            .any(|e| matches!(e.family, Family::WebServer | Family::PackageManager))
    }

    pub fn metadata(&self, stage: StageId) -> Option<&StageMetadata> {
        self.get(stage)
            .filter(|e| e.included)
            .map(|e| &e.metadata)
    }
}
