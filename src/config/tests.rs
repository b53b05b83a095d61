//! Tests for the config module

use super::*;
use crate::domain::value_objects::Backend;
use std::fs;
use tempfile::tempdir;

fn write_config(dir: &std::path::Path, yaml: &str) -> std::path::PathBuf {
    let path = dir.join("spinx.yaml");
    fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn test_minimal_config_applies_backend_defaults() {
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), "serviceName: shop\nregion: us-east-1\n");

    let (spec, warnings) = load_with_warnings(&path, Backend::AwsFargate).unwrap();

    assert!(warnings.is_empty());
    assert_eq!(spec.service_name, "shop");
    assert_eq!(spec.sizing.cpu, "256");
    assert_eq!(spec.sizing.memory, "512");
    assert_eq!(spec.container_port, 8080);
    assert_eq!(spec.desired_count, 1);
    assert_eq!(spec.max_instances, 10);
    assert_eq!(spec.timeout_seconds, 300);
    assert!(spec.allow_unauthenticated);
    assert_eq!(spec.names.cluster, "shop-cluster");
}

#[test]
fn test_numeric_sizing_is_read_as_text() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "serviceName: shop\nregion: eastus\ncpu: 0.5\nmemory: 1.0Gi\n",
    );

    let (spec, _) = load_with_warnings(&path, Backend::AzureContainerApps).unwrap();
    assert_eq!(spec.sizing.cpu, "0.5");
    assert_eq!(spec.sizing.memory, "1.0Gi");
}

#[test]
fn test_unknown_keys_warn_with_suggestion() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "serviceName: shop\nregion: us-east-1\ndesiredCont: 2\n",
    );

    let (spec, warnings) = load_with_warnings(&path, Backend::AwsFargate).unwrap();

    assert_eq!(spec.desired_count, 1);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].key, "desiredCont");
    assert_eq!(warnings[0].line, Some(3));
    assert_eq!(warnings[0].suggestion.as_deref(), Some("desiredCount"));
}

#[test]
fn test_paths_resolve_against_config_dir() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "serviceName: shop\nregion: us-east-1\ndockerfilePath: docker/Dockerfile\nbuildContext: app\n",
    );

    let (spec, _) = load_with_warnings(&path, Backend::AwsFargate).unwrap();
    let base = dir.path().canonicalize().unwrap();
    assert_eq!(spec.image_source.dockerfile, base.join("docker/Dockerfile"));
    assert_eq!(spec.image_source.context, base.join("app"));
}

#[test]
fn test_env_file_is_base_and_yaml_overrides() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".env"), "LOG_LEVEL=debug\nDB_HOST=db.internal\n").unwrap();
    let path = write_config(
        dir.path(),
        r#"
serviceName: shop
region: us-east-1
environmentFile: .env
environmentVariables:
  LOG_LEVEL: info
  WORKERS: 4
"#,
    );

    let (spec, warnings) = load_with_warnings(&path, Backend::AwsFargate).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(spec.environment["LOG_LEVEL"], "info");
    assert_eq!(spec.environment["DB_HOST"], "db.internal");
    assert_eq!(spec.environment["WORKERS"], "4");
}

#[test]
fn test_missing_env_file_is_a_warning() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "serviceName: shop\nregion: us-east-1\nenvironmentFile: missing.env\n",
    );

    let (spec, warnings) = load_with_warnings(&path, Backend::AwsFargate).unwrap();
    assert!(spec.environment.is_empty());
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].key, "environmentFile");
    assert_eq!(warnings[0].kind, WarningKind::UnreadableEnvFile);
    assert!(warnings[0].detail.is_some());
}

#[test]
fn test_uppercase_service_name_is_rejected_before_setup() {
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), "serviceName: MyShop
region: us-east-1
");

    let err = load_with_warnings(&path, Backend::AwsFargate).unwrap_err();
    assert!(
        err.to_string().contains("repositoryName 'MyShop' must be lowercase"),
        "{err}"
    );
}

#[test]
fn test_lowercase_repository_override_rescues_mixed_case_service() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "serviceName: MyShop
region: us-east-1
repositoryName: myshop
",
    );

    let (spec, _) = load_with_warnings(&path, Backend::AwsFargate).unwrap();
    assert_eq!(spec.names.repository, "myshop");
    assert_eq!(spec.names.cluster, "MyShop-cluster");
}

#[test]
fn test_cloud_run_service_must_be_lowercase() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "serviceName: MyShop
region: us-central1
projectId: p
repositoryName: myshop
",
    );

    let err = load_with_warnings(&path, Backend::GcpCloudRun).unwrap_err();
    assert!(err.to_string().contains("serviceName 'MyShop' must be lowercase"), "{err}");
}

#[test]
fn test_missing_config_file() {
    let dir = tempdir().unwrap();
    let err = load_with_warnings(&dir.path().join("nope.yaml"), Backend::AwsFargate).unwrap_err();
    assert!(matches!(err, crate::error::SpinxError::ConfigNotFound { .. }));
}

#[test]
fn test_gcp_requires_project_id() {
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), "serviceName: shop\nregion: us-central1\n");

    let err = load_with_warnings(&path, Backend::GcpCloudRun).unwrap_err();
    assert!(err.to_string().contains("projectId is required"));
}

#[test]
fn test_long_names_are_rejected_for_aws() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "serviceName: a-really-long-service-name-for-alb\nregion: us-east-1\n",
    );

    let err = load_with_warnings(&path, Backend::AwsFargate).unwrap_err();
    assert!(err.to_string().contains("exceeds 32 characters"));
}

#[test]
fn test_name_overrides_apply() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "serviceName: shop\nregion: us-east-1\nclusterName: shared\nloadBalancerName: edge\n",
    );

    let (spec, _) = load_with_warnings(&path, Backend::AwsFargate).unwrap();
    assert_eq!(spec.names.cluster, "shared");
    assert_eq!(spec.names.load_balancer, "edge");
}

#[test]
fn test_min_instances_must_not_exceed_max() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "serviceName: shop\nregion: us-central1\nprojectId: p\nminInstances: 5\nmaxInstances: 2\n",
    );

    let err = load_with_warnings(&path, Backend::GcpCloudRun).unwrap_err();
    assert!(err.to_string().contains("must not exceed"));
}

#[test]
fn test_resolve_path_expands_home() {
    let home = dirs::home_dir().unwrap();
    assert_eq!(
        resolve_path(std::path::Path::new("/srv"), "~/app/Dockerfile"),
        home.join("app/Dockerfile")
    );
    assert_eq!(
        resolve_path(std::path::Path::new("/srv"), "/abs/Dockerfile"),
        std::path::PathBuf::from("/abs/Dockerfile")
    );
}
