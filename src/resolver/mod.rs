//! Buildpack group resolution
//!
//! [`GroupResolver`] reduces a [`StageTable`] against a source descriptor and a
//! build configuration:
//!
//! 1. every candidate's predicate is evaluated;
//! 2. each exclusive family keeps its highest-priority detected member, ties
//!    going to the earlier table entry;
//! 3. requirements are applied until nothing else drops out;
//! 4. included stages produce their metadata. The first metadata error aborts
//!    the resolution.
//!
//! Output order is always table order, so identical inputs serialize to
//! identical bytes.

mod result;

pub use result::{Decision, ResolutionEntry, ResolutionResult};

use crate::config::{BuildConfig, ConfigError};
use crate::metadata::StageMetadata;
use crate::source::SourceDescriptor;
use crate::stage::{DetectionContext, Family, Requirement, StageId, StageTable};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid build configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid stage table: {0}")]
    InvalidTable(String),
}

#[derive(Debug, Clone)]
pub struct GroupResolver {
    table: StageTable,
}

impl GroupResolver {
    /// Wraps a table after checking that ids are unique and every stage
    /// requirement points into the table
    pub fn new(table: StageTable) -> Result<Self, ResolveError> {
        let mut seen = HashSet::new();
        for candidate in table.candidates() {
            if !seen.insert(candidate.id) {
                return Err(ResolveError::InvalidTable(format!(
                    "duplicate stage {}",
                    candidate.id
                )));
            }
        }

        for candidate in table.candidates() {
            if let Requirement::Stage(required) = candidate.requires {
                if required == candidate.id {
                    return Err(ResolveError::InvalidTable(format!(
                        "stage {} requires itself",
                        candidate.id
                    )));
                }
                if table.get(required).is_none() {
                    return Err(ResolveError::InvalidTable(format!(
                        "stage {} requires unknown stage {}",
                        candidate.id, required
                    )));
                }
            }
        }

        Ok(Self { table })
    }

    pub fn with_defaults() -> Self {
        Self {
            table: StageTable::with_defaults(),
        }
    }

    pub fn table(&self) -> &StageTable {
        &self.table
    }

    pub fn resolve(
        &self,
        source: &SourceDescriptor,
        config: &BuildConfig,
    ) -> Result<ResolutionResult, ResolveError> {
        let ctx = DetectionContext::new(source, config);
        let candidates = self.table.candidates();

        let detected: Vec<bool> = candidates.iter().map(|c| c.detect(&ctx)).collect();
        let mut decisions: Vec<Decision> = detected
            .iter()
            .map(|&hit| {
                if hit {
                    Decision::Included
                } else {
                    Decision::NotDetected
                }
            })
            .collect();

        // Exclusive families
        let mut winners: BTreeMap<Family, usize> = BTreeMap::new();
        for (index, candidate) in candidates.iter().enumerate() {
            if !candidate.family.is_exclusive() || !detected[index] {
                continue;
            }
            match winners.get(&candidate.family) {
                Some(&best) if candidates[best].priority >= candidate.priority => {}
                _ => {
                    winners.insert(candidate.family, index);
                }
            }
        }
        for (index, candidate) in candidates.iter().enumerate() {
            if let Some(&winner) = winners.get(&candidate.family) {
                if winner != index && detected[index] {
                    decisions[index] = Decision::Outranked {
                        by: candidates[winner].id,
                    };
                }
            }
        }

        // Requirements, until stable
        loop {
            let mut changed = false;
            for (index, candidate) in candidates.iter().enumerate() {
                if decisions[index] != Decision::Included {
                    continue;
                }
                let satisfied = match candidate.requires {
                    Requirement::None => true,
                    Requirement::Family(family) => candidates
                        .iter()
                        .zip(&decisions)
                        .any(|(c, d)| c.family == family && *d == Decision::Included),
                    Requirement::Stage(id) => candidates
                        .iter()
                        .zip(&decisions)
                        .any(|(c, d)| c.id == id && *d == Decision::Included),
                };
                if !satisfied {
                    decisions[index] = Decision::MissingRequirement {
                        requirement: candidate.requires,
                    };
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let mut entries = Vec::with_capacity(candidates.len());
        for (candidate, decision) in candidates.iter().zip(decisions) {
            let included = decision == Decision::Included;
            let metadata = if included {
                candidate.extract_metadata(&ctx)?
            } else {
                StageMetadata::None
            };

            debug!(
                stage = candidate.id.key(),
                family = %candidate.family,
                decision = ?decision,
                "Resolved candidate"
            );

            entries.push(ResolutionEntry {
                stage: candidate.id,
                family: candidate.family,
                included,
                decision,
                metadata,
            });
        }

        let result = ResolutionResult::new(entries);
        info!(
            included = result.included().count(),
            runnable = result.is_runnable(),
            "Resolved buildpack group: {}",
            result.log_lines().join(", ")
        );

        Ok(result)
    }

    /// Resolves and returns only the ids of the included stages
    pub fn resolve_ids(
        &self,
        source: &SourceDescriptor,
        config: &BuildConfig,
    ) -> Result<Vec<StageId>, ResolveError> {
        Ok(self
            .resolve(source, config)?
            .included()
            .map(|e| e.stage)
            .collect())
    }
}

impl Default for GroupResolver {
    fn default() -> Self {
        Self::with_defaults()
    }
}
