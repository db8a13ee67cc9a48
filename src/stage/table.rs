use super::{DetectionContext, Family, Requirement, StageCandidate, StageId};
use crate::config::{ConfigError, WebServer, BP_NODE_RUN_SCRIPTS};
use crate::exclusion::plan_source_removal;
use crate::metadata::{
    parse_environment_variables, parse_image_labels, StageMetadata, VersionSource,
    WebServerSelection,
};
use crate::source::{
    CA_CERTIFICATES_BINDING, HTTPD_CONF, NGINX_CONF, NODE_VERSION_FILE, NVMRC, YARN_LOCK,
};

/// Ordered candidate table. Output order of a resolution is table order.
#[derive(Debug, Clone)]
pub struct StageTable {
    candidates: Vec<StageCandidate>,
}

impl StageTable {
    pub fn new(candidates: Vec<StageCandidate>) -> Self {
        Self { candidates }
    }

    pub fn with_defaults() -> Self {
        Self::new(vec![
            StageCandidate::new(StageId::CaCertificates, Family::Certificates, detect_ca_certificates)
                .with_metadata(certificates_metadata),
            StageCandidate::new(StageId::NodeEngine, Family::NodeRuntime, detect_node_app)
                .requires(Requirement::Family(Family::PackageManager))
                .with_metadata(node_engine_metadata),
            StageCandidate::new(StageId::Yarn, Family::NodeRuntime, detect_yarn_lock)
                .requires(Requirement::Stage(StageId::YarnInstall)),
            StageCandidate::new(StageId::YarnInstall, Family::PackageManager, detect_yarn_lock)
                .with_priority(20),
            StageCandidate::new(StageId::NpmInstall, Family::PackageManager, detect_node_app)
                .with_priority(10),
            StageCandidate::new(StageId::NodeRunScript, Family::NodeRuntime, detect_node_app)
                .requires(Requirement::Family(Family::PackageManager))
                .with_metadata(run_scripts_metadata),
            StageCandidate::new(StageId::Nginx, Family::WebServer, detect_nginx)
                .with_priority(20)
                .with_metadata(nginx_metadata),
            StageCandidate::new(StageId::Httpd, Family::WebServer, detect_httpd)
                .with_priority(10)
                .with_metadata(httpd_metadata),
            // Utility order is fixed with source removal last. See the utility order
            // decision in DESIGN.md before moving these.
            StageCandidate::new(StageId::EnvironmentVariables, Family::Utility, detect_environment)
                .with_metadata(environment_metadata),
            StageCandidate::new(StageId::ImageLabels, Family::Utility, detect_image_labels)
                .with_metadata(labels_metadata),
            StageCandidate::new(StageId::Watchexec, Family::Utility, detect_live_reload)
                .with_metadata(|ctx| {
                    Ok(StageMetadata::LiveReload {
                        enabled: ctx.config.live_reload_enabled,
                    })
                }),
            StageCandidate::new(StageId::Procfile, Family::Utility, detect_procfile)
                .with_metadata(procfile_metadata),
            StageCandidate::new(StageId::SourceRemoval, Family::Utility, detect_source_filters)
                .with_metadata(source_removal_metadata),
        ])
    }

    pub fn candidates(&self) -> &[StageCandidate] {
        &self.candidates
    }

    pub fn get(&self, id: StageId) -> Option<&StageCandidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn family_members(&self, family: Family) -> Vec<StageId> {
        self.candidates
            .iter()
            .filter(|c| c.family == family)
            .map(|c| c.id)
            .collect()
    }
}

impl Default for StageTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn detect_ca_certificates(ctx: &DetectionContext<'_>) -> bool {
    ctx.source
        .bindings_of_type(CA_CERTIFICATES_BINDING)
        .next()
        .is_some()
}

fn detect_node_app(ctx: &DetectionContext<'_>) -> bool {
    ctx.source.is_node_app()
}

fn detect_yarn_lock(ctx: &DetectionContext<'_>) -> bool {
    ctx.source.is_node_app() && ctx.source.has_file(YARN_LOCK)
}

fn detect_nginx(ctx: &DetectionContext<'_>) -> bool {
    nginx_selection(ctx).is_some()
}

fn detect_httpd(ctx: &DetectionContext<'_>) -> bool {
    httpd_selection(ctx).is_some()
}

/// NGINX applies when requested, when `nginx.conf` exists, or as the default
/// server for a frontend without an `httpd.conf`
fn nginx_selection(ctx: &DetectionContext<'_>) -> Option<WebServerSelection> {
    match ctx.config.web_server {
        Some(WebServer::Nginx) => Some(WebServerSelection::Explicit),
        Some(WebServer::Httpd) => None,
        None if ctx.source.has_file(NGINX_CONF) => Some(WebServerSelection::Marker),
        None if ctx.source.is_node_app() && !ctx.source.has_file(HTTPD_CONF) => {
            Some(WebServerSelection::FrontendDefault)
        }
        None => None,
    }
}

fn httpd_selection(ctx: &DetectionContext<'_>) -> Option<WebServerSelection> {
    match ctx.config.web_server {
        Some(WebServer::Httpd) => Some(WebServerSelection::Explicit),
        Some(WebServer::Nginx) => None,
        None if ctx.source.has_file(HTTPD_CONF) => Some(WebServerSelection::Marker),
        None => None,
    }
}

fn detect_environment(ctx: &DetectionContext<'_>) -> bool {
    ctx.config.has_environment_variables()
}

fn detect_image_labels(ctx: &DetectionContext<'_>) -> bool {
    ctx.config.has_image_labels()
}

fn detect_live_reload(ctx: &DetectionContext<'_>) -> bool {
    ctx.config.live_reload_enabled
}

fn detect_procfile(ctx: &DetectionContext<'_>) -> bool {
    ctx.source.procfile().is_some()
}

fn detect_source_filters(ctx: &DetectionContext<'_>) -> bool {
    ctx.config.has_source_filters()
}

fn certificates_metadata(ctx: &DetectionContext<'_>) -> Result<StageMetadata, ConfigError> {
    Ok(StageMetadata::Certificates {
        bindings: ctx
            .source
            .bindings_of_type(CA_CERTIFICATES_BINDING)
            .map(|b| b.name.clone())
            .collect(),
    })
}

fn node_engine_metadata(ctx: &DetectionContext<'_>) -> Result<StageMetadata, ConfigError> {
    let from_package = || {
        ctx.source
            .package()
            .and_then(|p| p.node_engine.clone())
            .map(|v| (v, VersionSource::PackageJson))
    };
    let from_version_file = || {
        ctx.source.version_file().map(|f| {
            let source = match f.file.as_str() {
                NVMRC => VersionSource::Nvmrc,
                NODE_VERSION_FILE => VersionSource::NodeVersionFile,
                _ => VersionSource::Nvmrc,
            };
            (f.version.clone(), source)
        })
    };

    let resolved = ctx
        .config
        .node_version
        .clone()
        .map(|v| (v, VersionSource::BuildConfig))
        .or_else(from_package)
        .or_else(from_version_file);

    Ok(match resolved {
        Some((version, source)) => StageMetadata::NodeEngine {
            version: Some(version),
            source: Some(source),
        },
        None => StageMetadata::NodeEngine {
            version: None,
            source: None,
        },
    })
}

fn run_scripts_metadata(ctx: &DetectionContext<'_>) -> Result<StageMetadata, ConfigError> {
    let scripts = &ctx.config.node_run_scripts;

    if let Some(package) = ctx.source.package() {
        for script in scripts {
            if package.has_script(script) == Some(false) {
                return Err(ConfigError::UnknownRunScript {
                    key: BP_NODE_RUN_SCRIPTS.to_string(),
                    script: script.clone(),
                });
            }
        }
    }

    Ok(StageMetadata::RunScripts {
        scripts: scripts.clone(),
    })
}

fn nginx_metadata(ctx: &DetectionContext<'_>) -> Result<StageMetadata, ConfigError> {
    Ok(web_server_metadata(nginx_selection(ctx)))
}

fn httpd_metadata(ctx: &DetectionContext<'_>) -> Result<StageMetadata, ConfigError> {
    Ok(web_server_metadata(httpd_selection(ctx)))
}

fn web_server_metadata(selection: Option<WebServerSelection>) -> StageMetadata {
    match selection {
        Some(selected_by) => StageMetadata::WebServer { selected_by },
        None => StageMetadata::None,
    }
}

fn environment_metadata(ctx: &DetectionContext<'_>) -> Result<StageMetadata, ConfigError> {
    Ok(StageMetadata::Environment {
        variables: parse_environment_variables(&ctx.config.environment)?,
    })
}

fn labels_metadata(ctx: &DetectionContext<'_>) -> Result<StageMetadata, ConfigError> {
    let raw = ctx.config.image_labels.as_deref().unwrap_or_default();
    Ok(StageMetadata::Labels {
        labels: parse_image_labels(raw)?,
    })
}

fn procfile_metadata(ctx: &DetectionContext<'_>) -> Result<StageMetadata, ConfigError> {
    Ok(StageMetadata::Processes {
        processes: ctx
            .source
            .procfile()
            .map(|p| p.processes.clone())
            .unwrap_or_default(),
    })
}

fn source_removal_metadata(ctx: &DetectionContext<'_>) -> Result<StageMetadata, ConfigError> {
    let plan = plan_source_removal(
        ctx.source,
        &ctx.config.include_files,
        &ctx.config.exclude_files,
    )?;
    Ok(plan.map_or(StageMetadata::None, StageMetadata::SourceRemoval))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use crate::source::SourceDescriptor;

    fn order(table: &StageTable) -> Vec<&'static str> {
        table.candidates().iter().map(|c| c.id.key()).collect()
    }

    #[test]
    fn test_default_table_order() {
        let table = StageTable::with_defaults();
        assert_eq!(
            order(&table),
            vec![
                "paketo-buildpacks/ca-certificates",
                "paketo-buildpacks/node-engine",
                "paketo-buildpacks/yarn",
                "paketo-buildpacks/yarn-install",
                "paketo-buildpacks/npm-install",
                "paketo-buildpacks/node-run-script",
                "paketo-buildpacks/nginx",
                "paketo-buildpacks/httpd",
                "paketo-buildpacks/environment-variables",
                "paketo-buildpacks/image-labels",
                "paketo-buildpacks/watchexec",
                "paketo-buildpacks/procfile",
                "paketo-buildpacks/source-removal",
            ]
        );
        assert_eq!(table.len(), StageId::all_variants().len());
    }

    #[test]
    fn test_family_members() {
        let table = StageTable::with_defaults();
        assert_eq!(
            table.family_members(Family::WebServer),
            vec![StageId::Nginx, StageId::Httpd]
        );
        assert_eq!(
            table.family_members(Family::PackageManager),
            vec![StageId::YarnInstall, StageId::NpmInstall]
        );
    }

    #[test]
    fn test_nginx_predicate_rules() {
        let config = BuildConfig::default();

        let both = SourceDescriptor::builder("/workspace")
            .file("nginx.conf")
            .file("httpd.conf")
            .build();
        let ctx = DetectionContext::new(&both, &config);
        assert_eq!(nginx_selection(&ctx), Some(WebServerSelection::Marker));
        assert_eq!(httpd_selection(&ctx), Some(WebServerSelection::Marker));

        let frontend = SourceDescriptor::builder("/workspace").file("package.json").build();
        let ctx = DetectionContext::new(&frontend, &config);
        assert_eq!(nginx_selection(&ctx), Some(WebServerSelection::FrontendDefault));
        assert_eq!(httpd_selection(&ctx), None);

        let httpd_frontend = SourceDescriptor::builder("/workspace")
            .file("package.json")
            .file("httpd.conf")
            .build();
        let ctx = DetectionContext::new(&httpd_frontend, &config);
        assert_eq!(nginx_selection(&ctx), None);

        let empty = SourceDescriptor::builder("/workspace").build();
        let ctx = DetectionContext::new(&empty, &config);
        assert_eq!(nginx_selection(&ctx), None);
        assert_eq!(httpd_selection(&ctx), None);
    }

    #[test]
    fn test_explicit_web_server_overrides_markers() {
        let source = SourceDescriptor::builder("/workspace").file("nginx.conf").build();
        let config = BuildConfig::from_vars([("BP_WEB_SERVER", "httpd")]).unwrap();
        let ctx = DetectionContext::new(&source, &config);

        assert_eq!(nginx_selection(&ctx), None);
        assert_eq!(httpd_selection(&ctx), Some(WebServerSelection::Explicit));
    }

    #[test]
    fn test_node_engine_version_priority() {
        let source = SourceDescriptor::builder("/workspace")
            .file_with_content("package.json", r#"{"engines": {"node": "18"}}"#)
            .file_with_content(".nvmrc", "20")
            .build();

        let config = BuildConfig::default();
        let ctx = DetectionContext::new(&source, &config);
        assert_eq!(
            node_engine_metadata(&ctx).unwrap(),
            StageMetadata::NodeEngine {
                version: Some("18".to_string()),
                source: Some(VersionSource::PackageJson),
            }
        );

        let config = BuildConfig::from_vars([("BP_NODE_VERSION", "16.*")]).unwrap();
        let ctx = DetectionContext::new(&source, &config);
        assert_eq!(
            node_engine_metadata(&ctx).unwrap(),
            StageMetadata::NodeEngine {
                version: Some("16.*".to_string()),
                source: Some(VersionSource::BuildConfig),
            }
        );

        let nvmrc_only = SourceDescriptor::builder("/workspace")
            .file("package.json")
            .file_with_content(".nvmrc", "20")
            .build();
        let config = BuildConfig::default();
        let ctx = DetectionContext::new(&nvmrc_only, &config);
        assert_eq!(
            node_engine_metadata(&ctx).unwrap(),
            StageMetadata::NodeEngine {
                version: Some("20".to_string()),
                source: Some(VersionSource::Nvmrc),
            }
        );
    }

    #[test]
    fn test_run_scripts_checked_against_package() {
        let source = SourceDescriptor::builder("/workspace")
            .file_with_content("package.json", r#"{"scripts": {"build": "vite build"}}"#)
            .build();

        let config = BuildConfig::from_vars([("BP_NODE_RUN_SCRIPTS", "build")]).unwrap();
        let ctx = DetectionContext::new(&source, &config);
        assert_eq!(
            run_scripts_metadata(&ctx).unwrap(),
            StageMetadata::RunScripts {
                scripts: vec!["build".to_string()]
            }
        );

        let config = BuildConfig::from_vars([("BP_NODE_RUN_SCRIPTS", "build,deploy")]).unwrap();
        let ctx = DetectionContext::new(&source, &config);
        assert_eq!(
            run_scripts_metadata(&ctx).unwrap_err(),
            ConfigError::UnknownRunScript {
                key: "BP_NODE_RUN_SCRIPTS".to_string(),
                script: "deploy".to_string(),
            }
        );
    }

    #[test]
    fn test_run_scripts_unknown_package_is_not_checked() {
        let source = SourceDescriptor::builder("/workspace").file("package.json").build();
        let config = BuildConfig::from_vars([("BP_NODE_RUN_SCRIPTS", "anything")]).unwrap();
        let ctx = DetectionContext::new(&source, &config);
        assert!(run_scripts_metadata(&ctx).is_ok());
    }
}
