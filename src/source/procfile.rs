//! Procfile parsing

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Process type used as the default launch process
pub const DEFAULT_PROCESS_TYPE: &str = "web";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Process {
    #[serde(rename = "type")]
    pub kind: String,
    pub command: String,
    pub default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Procfile {
    pub processes: Vec<Process>,
}

fn process_line() -> &'static Regex {
    static PROCESS_LINE: OnceLock<Regex> = OnceLock::new();
    PROCESS_LINE.get_or_init(|| Regex::new(r"^([A-Za-z0-9_-]+):\s*(.+)$").expect("valid regex"))
}

impl Procfile {
    /// Parses `type: command` lines. Lines that don't match are skipped and a
    /// repeated type replaces the earlier command in place.
    pub fn parse(content: &str) -> Self {
        let mut processes: Vec<Process> = Vec::new();

        for line in content.lines() {
            let Some(caps) = process_line().captures(line.trim_end()) else {
                continue;
            };
            let kind = caps[1].to_string();
            let command = caps[2].trim().to_string();

            match processes.iter_mut().find(|p| p.kind == kind) {
                Some(existing) => existing.command = command,
                None => processes.push(Process {
                    default: kind == DEFAULT_PROCESS_TYPE,
                    kind,
                    command,
                }),
            }
        }

        Self { processes }
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn web(&self) -> Option<&Process> {
        self.processes.iter().find(|p| p.default)
    }
}
