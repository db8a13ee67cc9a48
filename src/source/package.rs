//! `package.json` facts used by the Node.js stages

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageManifest {
    /// Script names, or `None` when the manifest could not be parsed
    pub scripts: Option<BTreeSet<String>>,
    /// Raw `engines.node` constraint
    pub node_engine: Option<String>,
}

impl PackageManifest {
    /// Parses the manifest leniently: invalid JSON still marks the app as a
    /// Node app, it just carries no facts.
    pub fn parse(content: &str) -> Self {
        let package: serde_json::Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "package.json is not valid JSON");
                return Self::default();
            }
        };

        let scripts = package["scripts"]
            .as_object()
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default();

        let node_engine = package["engines"]["node"]
            .as_str()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Self {
            scripts: Some(scripts),
            node_engine,
        }
    }

    /// `None` when the script set is unknown
    pub fn has_script(&self, name: &str) -> Option<bool> {
        self.scripts.as_ref().map(|s| s.contains(name))
    }
}

/// Trims a version file (`.nvmrc`, `.node-version`) down to its constraint
pub fn normalize_version_file(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.trim_start_matches('v').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scripts_and_engine() {
        let manifest = PackageManifest::parse(
            r#"{
                "name": "react-app",
                "scripts": {"build": "react-scripts build", "start": "react-scripts start"},
                "engines": {"node": ">=18"}
            }"#,
        );

        assert_eq!(manifest.has_script("build"), Some(true));
        assert_eq!(manifest.has_script("deploy"), Some(false));
        assert_eq!(manifest.node_engine.as_deref(), Some(">=18"));
    }

    #[test]
    fn test_manifest_without_scripts() {
        let manifest = PackageManifest::parse(r#"{"name": "bare"}"#);
        assert_eq!(manifest.has_script("build"), Some(false));
        assert_eq!(manifest.node_engine, None);
    }

    #[test]
    fn test_invalid_json_has_unknown_scripts() {
        let manifest = PackageManifest::parse("{ not json");
        assert_eq!(manifest.has_script("build"), None);
    }

    #[test]
    fn test_normalize_version_file() {
        assert_eq!(normalize_version_file("v18.17.0\n").as_deref(), Some("18.17.0"));
        assert_eq!(normalize_version_file("\n# pinned\n20\n").as_deref(), Some("20"));
        assert_eq!(normalize_version_file("  \n"), None);
    }
}
