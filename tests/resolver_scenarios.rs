//! Resolution scenarios against application trees on disk

mod support;

use serverpack::metadata::{VersionSource, WebServerSelection};
use serverpack::{
    BuildConfig, ConfigError, Decision, FilterMode, GroupResolver, ResolveError, StageId,
    StageMetadata,
};
use std::collections::BTreeMap;
use support::AppFixture;
use yare::parameterized;

#[parameterized(
    nginx_marker = { "nginx.conf", &["Buildpack for Nginx Server"] },
    httpd_marker = { "httpd.conf", &["Buildpack for Apache HTTP Server"] },
)]
fn test_static_site(config_file: &str, expected: &[&str]) {
    let result = AppFixture::static_site(config_file).resolve(&[]);

    assert_eq!(result.log_lines(), expected);
    assert!(result.is_runnable());
}

#[test]
fn test_nginx_takes_precedence_over_httpd() {
    let fixture = AppFixture::static_site("nginx.conf").file("httpd.conf", "Listen 8080\n");
    let result = fixture.resolve(&[]);

    assert_eq!(result.log_lines(), vec!["Buildpack for Nginx Server"]);
    assert_eq!(
        result.get(StageId::Httpd).unwrap().decision,
        Decision::Outranked { by: StageId::Nginx }
    );
    assert_eq!(
        result.metadata(StageId::Nginx),
        Some(&StageMetadata::WebServer {
            selected_by: WebServerSelection::Marker
        })
    );
}

#[parameterized(
    npm = {
        AppFixture::npm_frontend(),
        &[
            "Buildpack for Node Engine",
            "Buildpack for NPM Install",
            "Buildpack for Node Run Script",
            "Buildpack for Nginx Server",
        ]
    },
    yarn = {
        AppFixture::yarn_frontend(),
        &[
            "Buildpack for Node Engine",
            "Buildpack for Yarn",
            "Buildpack for Yarn Install",
            "Buildpack for Node Run Script",
            "Buildpack for Nginx Server",
        ]
    },
    npm_with_httpd = {
        AppFixture::npm_frontend().file("httpd.conf", "Listen 8080\n"),
        &[
            "Buildpack for Node Engine",
            "Buildpack for NPM Install",
            "Buildpack for Node Run Script",
            "Buildpack for Apache HTTP Server",
        ]
    },
)]
fn test_frontend_group(fixture: AppFixture, expected: &[&str]) {
    let result = fixture.resolve(&[("BP_NODE_RUN_SCRIPTS", "build")]);
    assert_eq!(result.log_lines(), expected);
}

#[test]
fn test_explicit_web_server_for_frontend() {
    let result = AppFixture::npm_frontend().resolve(&[("BP_WEB_SERVER", "httpd")]);

    assert!(result.is_included(StageId::Httpd));
    assert!(!result.is_included(StageId::Nginx));
    assert_eq!(
        result.get(StageId::Nginx).unwrap().decision,
        Decision::NotDetected
    );
}

#[test]
fn test_node_engine_version_from_package() {
    let result = AppFixture::npm_frontend()
        .file(".nvmrc", "v18\n")
        .resolve(&[]);

    assert_eq!(
        result.metadata(StageId::NodeEngine),
        Some(&StageMetadata::NodeEngine {
            version: Some("20.x".to_string()),
            source: Some(VersionSource::PackageJson),
        })
    );
}

#[test]
fn test_environment_variables_stage() {
    let result = AppFixture::static_site("nginx.conf").resolve(&[("BPE_SOME_VARIABLE", "some-value")]);

    assert_eq!(
        result.log_lines(),
        vec!["Buildpack for Nginx Server", "Buildpack for Environment Variables"]
    );
    assert_eq!(
        result
            .metadata(StageId::EnvironmentVariables)
            .and_then(StageMetadata::variables),
        Some(&BTreeMap::from([(
            "SOME_VARIABLE".to_string(),
            "some-value".to_string()
        )]))
    );
}

#[test]
fn test_utilities_follow_mandatory_stages_in_fixed_order() {
    let fixture = AppFixture::npm_frontend().file("Procfile", "web: node server.js\n");
    let result = fixture.resolve(&[
        ("BP_LIVE_RELOAD_ENABLED", "true"),
        ("BP_IMAGE_LABELS", "some-label=some-value"),
        ("BPE_SOME_VARIABLE", "some-value"),
    ]);

    assert_eq!(
        result.log_lines(),
        vec![
            "Buildpack for Node Engine",
            "Buildpack for NPM Install",
            "Buildpack for Node Run Script",
            "Buildpack for Nginx Server",
            "Buildpack for Environment Variables",
            "Buildpack for Image Labels",
            "Buildpack for Watchexec",
            "Buildpack for Procfile",
        ]
    );

    let labels = result
        .metadata(StageId::ImageLabels)
        .and_then(StageMetadata::labels)
        .unwrap();
    assert_eq!(labels["some-label"], "some-value");

    match result.metadata(StageId::Procfile) {
        Some(StageMetadata::Processes { processes }) => {
            assert_eq!(processes.len(), 1);
            assert_eq!(processes[0].kind, "web");
            assert!(processes[0].default);
        }
        other => panic!("unexpected procfile metadata: {:?}", other),
    }
}

#[test]
fn test_utilities_never_displace_mandatory_stages() {
    let plain = AppFixture::npm_frontend().resolve(&[]);
    let with_utilities = AppFixture::npm_frontend()
        .file("Procfile", "web: node server.js\n")
        .resolve(&[("BPE_A", "1"), ("BP_EXCLUDE_FILES", "src")]);

    let mandatory = |r: &serverpack::ResolutionResult| -> Vec<StageId> {
        r.included()
            .filter(|e| e.family.is_mandatory())
            .map(|e| e.stage)
            .collect()
    };
    assert_eq!(mandatory(&plain), mandatory(&with_utilities));
}

#[parameterized(
    type_file = { "my-certs", Some("ca-certificates") },
    directory_name = { "ca-certificates", None },
)]
fn test_ca_certificates_binding(name: &str, kind: Option<&str>) {
    let fixture = AppFixture::static_site("nginx.conf").binding(name, kind);
    let result = fixture.resolve(&[("SERVICE_BINDING_ROOT", "bindings")]);

    assert_eq!(
        result.log_lines(),
        vec!["Buildpack for CA Certificates", "Buildpack for Nginx Server"]
    );
    assert_eq!(
        result.metadata(StageId::CaCertificates),
        Some(&StageMetadata::Certificates {
            bindings: vec![name.to_string()]
        })
    );
}

#[test]
fn test_unrelated_binding_is_ignored() {
    let fixture = AppFixture::static_site("nginx.conf").binding("db", Some("postgresql"));
    let result = fixture.resolve(&[("SERVICE_BINDING_ROOT", "bindings")]);

    assert!(!result.is_included(StageId::CaCertificates));
}

#[test]
fn test_source_removal_runs_last_and_excludes_src() {
    let fixture = AppFixture::npm_frontend().file("Procfile", "web: node server.js\n");
    let result = fixture.resolve(&[("BP_EXCLUDE_FILES", "src")]);

    let last = result.included().last().unwrap();
    assert_eq!(last.stage, StageId::SourceRemoval);

    match &last.metadata {
        StageMetadata::SourceRemoval(plan) => {
            assert_eq!(plan.mode, FilterMode::Exclude);
            assert_eq!(plan.removed, vec!["src"]);
            assert!(plan.retained.contains(&"package.json".to_string()));
        }
        other => panic!("unexpected source removal metadata: {:?}", other),
    }

    // Exclusion never changes detection.
    assert!(result.is_included(StageId::NpmInstall));
    assert!(result.is_included(StageId::Procfile));
}

#[test]
fn test_unknown_run_script_fails_resolution() {
    let fixture = AppFixture::npm_frontend();
    let config = BuildConfig::from_vars([("BP_NODE_RUN_SCRIPTS", "build,missing")]).unwrap();
    let source = fixture.scan(&config);

    let err = GroupResolver::with_defaults()
        .resolve(&source, &config)
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Config(ConfigError::UnknownRunScript { ref script, .. }) if script == "missing"
    ));
}

#[test]
fn test_malformed_labels_fail_resolution() {
    let fixture = AppFixture::static_site("nginx.conf");
    let config = BuildConfig::from_vars([("BP_IMAGE_LABELS", "no-equals-sign")]).unwrap();
    let source = fixture.scan(&config);

    assert!(GroupResolver::with_defaults().resolve(&source, &config).is_err());
}

#[test]
fn test_empty_directory_is_not_runnable() {
    let result = AppFixture::new().dir("docs").resolve(&[("BPE_A", "1")]);

    assert!(!result.is_runnable());
    assert_eq!(result.log_lines(), vec!["Buildpack for Environment Variables"]);
}

#[test]
fn test_resolution_is_deterministic() {
    let fixture = AppFixture::yarn_frontend()
        .file("nginx.conf", "")
        .file("httpd.conf", "")
        .file("Procfile", "web: yarn start\nworker: node worker.js\n");
    let vars = [
        ("BPE_B", "2"),
        ("BPE_A", "1"),
        ("BP_IMAGE_LABELS", "z=1 a=2"),
        ("BP_EXCLUDE_FILES", "src:README.md"),
    ];

    let first = serde_json::to_string(&fixture.resolve(&vars)).unwrap();
    for _ in 0..5 {
        assert_eq!(serde_json::to_string(&fixture.resolve(&vars)).unwrap(), first);
    }
}

#[test]
fn test_at_most_one_member_per_exclusive_family() {
    let fixture = AppFixture::yarn_frontend()
        .file("nginx.conf", "")
        .file("httpd.conf", "");
    let result = fixture.resolve(&[]);

    for family in [serverpack::Family::WebServer, serverpack::Family::PackageManager] {
        let count = result.included().filter(|e| e.family == family).count();
        assert_eq!(count, 1, "family {}", family);
    }
}
