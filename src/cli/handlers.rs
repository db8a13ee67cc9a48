//! Command handlers. Each returns the process exit code.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::commands::{ResolveArgs, StagesArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::{process_vars, project_build_env, BuildConfig};
use crate::fs::{FileSystem, RealFileSystem};
use crate::resolver::GroupResolver;
use crate::source::SourceDescriptor;
use crate::stage::StageTable;

pub const PROJECT_DESCRIPTOR: &str = "project.toml";

pub const EXIT_OK: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_NOT_RUNNABLE: i32 = 2;

pub fn handle_resolve(args: &ResolveArgs, quiet: bool) -> i32 {
    let app_path = match &args.app_path {
        Some(path) => path.clone(),
        None => match env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                error!("Failed to get current directory: {}", e);
                return EXIT_ERROR;
            }
        },
    };
    debug!("Application path: {}", app_path.display());

    let fs = RealFileSystem;
    let process_env: Vec<(String, String)> = if args.no_process_env {
        Vec::new()
    } else {
        process_vars()
    };

    let vars = match collect_build_vars(&fs, &app_path, process_env, &args.env) {
        Ok(vars) => vars,
        Err(e) => {
            error!("{:#}", e);
            return EXIT_ERROR;
        }
    };

    let config = match BuildConfig::from_vars(vars) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return EXIT_ERROR;
        }
    };

    let source = match SourceDescriptor::scan(&fs, &app_path, &config) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to scan application: {:#}", e);
            return EXIT_ERROR;
        }
    };

    let result = match GroupResolver::with_defaults().resolve(&source, &config) {
        Ok(result) => result,
        Err(e) => {
            error!("Resolution failed: {}", e);
            return EXIT_ERROR;
        }
    };

    let formatter = OutputFormatter::new(args.format.into());
    let output = match formatter.format(&result) {
        Ok(out) => out,
        Err(e) => {
            error!("Failed to format output: {}", e);
            return EXIT_ERROR;
        }
    };

    if let Err(code) = emit(&output, args.output.as_deref(), quiet) {
        return code;
    }

    if result.is_runnable() {
        EXIT_OK
    } else {
        warn!("No web server or package manager detected");
        EXIT_NOT_RUNNABLE
    }
}

pub fn handle_stages(args: &StagesArgs) -> i32 {
    let format: OutputFormat = args.format.into();
    match OutputFormatter::new(format).format_stages(&StageTable::with_defaults()) {
        Ok(output) => {
            println!("{}", output);
            EXIT_OK
        }
        Err(e) => {
            error!("Failed to format output: {}", e);
            EXIT_ERROR
        }
    }
}

/// Layers build options from lowest to highest precedence: `project.toml`
/// build env, the process environment, then `--env` flags.
pub fn collect_build_vars(
    fs: &dyn FileSystem,
    app_path: &Path,
    process_env: Vec<(String, String)>,
    overrides: &[(String, String)],
) -> Result<Vec<(String, String)>> {
    let mut vars = Vec::new();

    let descriptor: PathBuf = app_path.join(PROJECT_DESCRIPTOR);
    if fs.is_file(&descriptor) {
        let content = fs
            .read_to_string(&descriptor)
            .with_context(|| format!("Failed to read {}", descriptor.display()))?;
        let entries = project_build_env(&content)
            .with_context(|| format!("Invalid {}", descriptor.display()))?;
        debug!(count = entries.len(), "Loaded build env from project.toml");
        vars.extend(entries);
    }

    vars.extend(process_env);
    vars.extend(overrides.iter().cloned());
    Ok(vars)
}

fn emit(output: &str, path: Option<&Path>, quiet: bool) -> std::result::Result<(), i32> {
    match path {
        Some(output_file) => match std::fs::write(output_file, output) {
            Ok(_) => {
                info!("Output written to: {}", output_file.display());
                if !quiet {
                    println!("Output written to: {}", output_file.display());
                }
                Ok(())
            }
            Err(e) => {
                error!("Failed to write output to file: {}", e);
                Err(EXIT_ERROR)
            }
        },
        None => {
            println!("{}", output);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_layering_precedence() {
        let fs = MockFileSystem::new().with_file(
            "/workspace/project.toml",
            r#"
[[io.buildpacks.build.env]]
name = "BP_WEB_SERVER"
value = "nginx"

[[io.buildpacks.build.env]]
name = "BP_NODE_RUN_SCRIPTS"
value = "build"
"#,
        );

        let vars = collect_build_vars(
            &fs,
            Path::new("/workspace"),
            pairs(&[("BP_WEB_SERVER", "httpd")]),
            &pairs(&[("BP_NODE_RUN_SCRIPTS", "lint")]),
        )
        .unwrap();

        let config = BuildConfig::from_vars(vars).unwrap();
        assert_eq!(config.web_server, Some(crate::config::WebServer::Httpd));
        assert_eq!(config.node_run_scripts, vec!["lint"]);
    }

    #[test]
    fn test_missing_project_descriptor_is_fine() {
        let fs = MockFileSystem::new();
        let vars = collect_build_vars(&fs, Path::new("/workspace"), Vec::new(), &[]).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn test_invalid_project_descriptor() {
        let fs = MockFileSystem::new().with_file("/workspace/project.toml", "[[build.env]\n");
        let err = collect_build_vars(&fs, Path::new("/workspace"), Vec::new(), &[]).unwrap_err();
        assert!(format!("{:#}", err).contains("project.toml"));
    }
}
