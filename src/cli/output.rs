//! Output formatting for resolution results and the stage table
//!
//! JSON and YAML serialize the same structures; the human format is meant for
//! a terminal and lists the group in execution order followed by the skipped
//! candidates.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::metadata::{StageMetadata, WebServerSelection};
use crate::resolver::{Decision, ResolutionResult};
use crate::stage::{Family, Requirement, StageTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// One row of `serverpack stages`
#[derive(Debug, Clone, Serialize)]
pub struct StageRow {
    pub stage: &'static str,
    pub name: &'static str,
    pub family: Family,
    pub exclusive: bool,
    pub priority: u8,
    pub requires: Requirement,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, result: &ResolutionResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result)
                .context("Failed to serialize resolution result to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(result)
                .context("Failed to serialize resolution result to YAML"),
            OutputFormat::Human => Ok(self.format_human(result)),
        }
    }

    pub fn format_stages(&self, table: &StageTable) -> Result<String> {
        let rows = stage_rows(table);
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&rows).context("Failed to serialize stages to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(&rows).context("Failed to serialize stages to YAML")
            }
            OutputFormat::Human => Ok(self.format_stages_human(&rows)),
        }
    }

    fn format_human(&self, result: &ResolutionResult) -> String {
        let mut output = String::new();

        if result.is_runnable() {
            output.push_str("\u{2713} Buildpack Group\n");
        } else {
            output.push_str("\u{26A0} Buildpack Group (no web server or package manager)\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        let included: Vec<_> = result.included().collect();
        if included.is_empty() {
            output.push_str("No buildpacks detected\n");
        }
        for (i, entry) in included.iter().enumerate() {
            output.push_str(&format!(
                "{:>2}. {:<36} {}\n",
                i + 1,
                entry.display_name(),
                entry.stage.key()
            ));
            if let Some(detail) = describe_metadata(&entry.metadata) {
                output.push_str(&format!("    \u{2514}\u{2500} {}\n", detail));
            }
        }

        let skipped: Vec<_> = result
            .entries()
            .iter()
            .filter(|e| {
                matches!(
                    e.decision,
                    Decision::Outranked { .. } | Decision::MissingRequirement { .. }
                )
            })
            .collect();
        if !skipped.is_empty() {
            output.push_str("\nSkipped:\n");
            for entry in skipped {
                output.push_str(&format!("  - {}: {}\n", entry.display_name(), entry.decision));
            }
        }

        output
    }

    fn format_stages_human(&self, rows: &[StageRow]) -> String {
        let mut output = String::new();
        output.push_str("Buildpack Candidates\n");
        output.push_str(RULE);
        output.push('\n');

        for (i, row) in rows.iter().enumerate() {
            output.push_str(&format!(
                "{:>2}. {:<36} {:<16}",
                i + 1,
                row.name,
                row.family.name()
            ));
            if row.exclusive {
                output.push_str(&format!(" priority {}", row.priority));
            }
            match row.requires {
                Requirement::None => {}
                Requirement::Family(family) => {
                    output.push_str(&format!(" (requires a {} stage)", family))
                }
                Requirement::Stage(id) => {
                    output.push_str(&format!(" (requires {})", id.display_name()))
                }
            }
            output.push('\n');
        }

        output
    }
}

pub fn stage_rows(table: &StageTable) -> Vec<StageRow> {
    table
        .candidates()
        .iter()
        .map(|c| StageRow {
            stage: c.id.key(),
            name: c.id.display_name(),
            family: c.family,
            exclusive: c.family.is_exclusive(),
            priority: c.priority,
            requires: c.requires,
        })
        .collect()
}

fn describe_metadata(metadata: &StageMetadata) -> Option<String> {
    let detail = match metadata {
        StageMetadata::None => return None,
        StageMetadata::Certificates { bindings } => format!("bindings: {}", bindings.join(", ")),
        StageMetadata::NodeEngine { version, source } => match (version, source) {
            (Some(version), Some(source)) => {
                let source = serde_json::to_value(source)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                format!("version {} from {}", version, source)
            }
            _ => "default version".to_string(),
        },
        StageMetadata::RunScripts { scripts } if scripts.is_empty() => return None,
        StageMetadata::RunScripts { scripts } => format!("scripts: {}", scripts.join(", ")),
        StageMetadata::WebServer { selected_by } => match selected_by {
            WebServerSelection::Explicit => "selected by BP_WEB_SERVER".to_string(),
            WebServerSelection::Marker => "selected by configuration file".to_string(),
            WebServerSelection::FrontendDefault => "selected by frontend default".to_string(),
        },
        StageMetadata::Environment { variables } => variables
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" "),
        StageMetadata::Labels { labels } => labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" "),
        StageMetadata::LiveReload { enabled } => format!("live reload enabled: {}", enabled),
        StageMetadata::Processes { processes } if processes.is_empty() => {
            "no processes".to_string()
        }
        StageMetadata::Processes { processes } => processes
            .iter()
            .map(|p| p.kind.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        StageMetadata::SourceRemoval(plan) if plan.removed.is_empty() => {
            "nothing removed".to_string()
        }
        StageMetadata::SourceRemoval(plan) => format!("removes {}", plan.removed.join(", ")),
    };
    Some(detail)
}
