//! Configuration loading, path resolution and validation

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::entities::{DeploymentSpec, HealthCheck, ImageSource, Sizing};
use crate::domain::value_objects::{Backend, ConfigWarning};
use crate::error::{SpinxError, SpinxResult};

use super::env_file::{display_value, merge_environment, parse_env_file};
use super::types::{DeployConfig, KNOWN_KEYS};

/// Load a deployment file for `backend`, collecting non-fatal warnings
/// (unknown keys, unreadable environment file).
pub fn load_with_warnings(
    path: &Path,
    backend: Backend,
) -> SpinxResult<(DeploymentSpec, Vec<ConfigWarning>)> {
    if !path.is_file() {
        return Err(SpinxError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;

    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = serde_yaml_ng::Deserializer::from_str(&content);
    let config: DeployConfig = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| invalid(path, e.to_string()))?;

    let mut warnings: Vec<ConfigWarning> = unknown_paths
        .into_iter()
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning::unknown_key(key.clone(), path, find_line_number(&content, &key))
                .with_suggestion(suggest_key(&key))
        })
        .collect();

    let config = with_env_overrides(config, path, &mut warnings);
    let base_dir = config_dir(path);
    let spec = build_spec(config, backend, &base_dir, path, &mut warnings)?;
    validate(&spec).map_err(|message| invalid(path, message))?;

    for warning in &warnings {
        tracing::warn!("{}", warning);
    }
    for (key, value) in &spec.environment {
        tracing::debug!(key = %key, value = %display_value(key, value), "environment");
    }

    Ok((spec, warnings))
}

/// Apply environment variable overrides (SPINX_* prefix)
pub fn with_env_overrides(
    mut config: DeployConfig,
    path: &Path,
    warnings: &mut Vec<ConfigWarning>,
) -> DeployConfig {
    // SPINX_REGION
    if let Ok(region) = std::env::var("SPINX_REGION") {
        if !region.trim().is_empty() {
            config.region = Some(region.trim().to_string());
        }
    }

    // SPINX_DESIRED_COUNT
    if let Ok(count) = std::env::var("SPINX_DESIRED_COUNT") {
        match count.trim().parse::<u32>() {
            Ok(parsed) => config.desired_count = parsed,
            Err(_) => warnings.push(ConfigWarning::invalid_value(
                "SPINX_DESIRED_COUNT",
                path,
                format!("ignoring non-numeric value '{}'", count),
            )),
        }
    }

    config
}

fn build_spec(
    config: DeployConfig,
    backend: Backend,
    base_dir: &Path,
    path: &Path,
    warnings: &mut Vec<ConfigWarning>,
) -> SpinxResult<DeploymentSpec> {
    let service_name = config
        .service_name
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| invalid(path, "serviceName is required"))?;
    let region = config
        .region
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| invalid(path, "region is required"))?;

    let mut spec = DeploymentSpec::new(backend, service_name, region);
    spec.project_id = config.project_id.filter(|s| !s.trim().is_empty());

    let (default_cpu, default_memory) = backend.default_sizing();
    spec.sizing = Sizing {
        cpu: config
            .cpu
            .map(|s| s.into_string())
            .unwrap_or_else(|| default_cpu.to_string()),
        memory: config
            .memory
            .map(|s| s.into_string())
            .unwrap_or_else(|| default_memory.to_string()),
    };
    spec.container_port = config.container_port;
    spec.image_source = ImageSource {
        dockerfile: resolve_path(base_dir, &config.dockerfile_path),
        context: resolve_path(base_dir, &config.build_context),
    };
    spec.desired_count = config.desired_count;
    spec.min_instances = config.min_instances;
    spec.max_instances = config.max_instances;
    spec.timeout_seconds = config.timeout;
    spec.health_check = HealthCheck {
        path: config.health_check_path,
        interval_seconds: config.health_check_interval_seconds,
    };
    spec.enable_https = config.enable_https;
    spec.certificate_arn = config.certificate_arn.filter(|s| !s.trim().is_empty());
    spec.allow_unauthenticated = config.allow_unauthenticated;

    let file_vars = match &config.environment_file {
        Some(env_file) => {
            let env_path = resolve_path(base_dir, env_file);
            match fs::read_to_string(&env_path) {
                Ok(content) => parse_env_file(&content),
                Err(err) => {
                    warnings.push(ConfigWarning::env_file_unreadable(
                        path,
                        format!("cannot read {}: {}", env_path.display(), err),
                    ));
                    BTreeMap::new()
                }
            }
        }
        None => BTreeMap::new(),
    };
    let explicit = config
        .environment_variables
        .into_iter()
        .map(|(k, v)| (k, v.into_string()))
        .collect();
    spec.environment = merge_environment(file_vars, explicit);

    let names = &mut spec.names;
    override_name(&mut names.resource_group, config.resource_group);
    override_name(&mut names.registry, config.registry_name);
    override_name(&mut names.environment, config.environment_name);
    override_name(&mut names.cluster, config.cluster_name);
    override_name(&mut names.repository, config.repository_name);
    if backend == Backend::AwsFargate {
        override_name(&mut names.service, config.ecs_service_name);
    }
    override_name(&mut names.load_balancer, config.load_balancer_name);
    override_name(&mut names.target_group, config.target_group_name);
    override_name(&mut names.log_group, config.log_group_name);
    override_name(&mut names.task_family, config.task_family);
    override_name(&mut names.execution_role, config.execution_role_name);
    override_name(&mut names.task_role, config.task_role_name);

    Ok(spec)
}

fn override_name(slot: &mut String, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        *slot = value;
    }
}

/// Check the rules the backends would otherwise reject mid-run
pub fn validate(spec: &DeploymentSpec) -> Result<(), String> {
    if spec.backend == Backend::GcpCloudRun && spec.project_id.is_none() {
        return Err("projectId is required for gcp-cloudrun".to_string());
    }
    if spec.container_port == 0 {
        return Err("containerPort must be greater than 0".to_string());
    }
    if spec.desired_count == 0 {
        return Err("desiredCount must be greater than 0".to_string());
    }
    if spec.min_instances > spec.max_instances {
        return Err(format!(
            "minInstances ({}) must not exceed maxInstances ({})",
            spec.min_instances, spec.max_instances
        ));
    }

    // Registries and service names on these backends reject uppercase outright
    let mut lowercase_only = vec![];
    if matches!(spec.backend, Backend::AwsFargate | Backend::GcpCloudRun) {
        lowercase_only.push(("repositoryName", &spec.names.repository));
    }
    if matches!(spec.backend, Backend::GcpCloudRun | Backend::AzureContainerApps) {
        lowercase_only.push(("serviceName", &spec.names.service));
    }
    for (key, name) in lowercase_only {
        if name.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(format!(
                "{key} '{name}' must be lowercase on {}; use a lowercase serviceName or set {key}",
                spec.backend
            ));
        }
    }

    match spec.backend {
        Backend::AwsFargate => {
            for (key, name) in [
                ("loadBalancerName", &spec.names.load_balancer),
                ("targetGroupName", &spec.names.target_group),
            ] {
                if name.len() > 32 {
                    return Err(format!(
                        "{key} '{name}' exceeds 32 characters; shorten serviceName or set {key}"
                    ));
                }
            }
        }
        Backend::AzureContainerApps => {
            let registry = &spec.names.registry;
            if !registry.chars().all(|c| c.is_ascii_alphanumeric())
                || !(5..=50).contains(&registry.len())
            {
                return Err(format!(
                    "registryName '{registry}' must be 5-50 alphanumeric characters"
                ));
            }
        }
        Backend::GcpCloudRun => {}
    }

    Ok(())
}

/// Directory relative paths in the file resolve against
fn config_dir(path: &Path) -> PathBuf {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    dir.canonicalize().unwrap_or(dir)
}

/// Expand a leading `~/`, keep absolute paths, join the rest onto `base`
pub fn resolve_path(base: &Path, raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn invalid(path: &Path, message: impl Into<String>) -> SpinxError {
    SpinxError::InvalidConfig {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    for (i, line) in content.lines().enumerate() {
        if line.trim_start().starts_with(needle) {
            return Some(i + 1);
        }
    }
    None
}

fn suggest_key(unknown: &str) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &candidate in KNOWN_KEYS {
        let dist = levenshtein(&unknown.to_lowercase(), &candidate.to_lowercase());
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate.to_string()),
        _ => None,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut prev: Vec<usize> = (0..=b_bytes.len()).collect();
    let mut curr = vec![0usize; b_bytes.len() + 1];

    for (i, &ac) in a_bytes.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b_bytes.iter().enumerate() {
            let cost = usize::from(ac != bc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }

    prev[b_bytes.len()]
}
