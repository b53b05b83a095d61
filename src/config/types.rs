//! Configuration type definitions
//!
//! Mirrors the YAML file one-to-one (camelCase keys). Backend defaults and
//! derived names are applied later, when the loader builds a
//! [`DeploymentSpec`](crate::domain::entities::DeploymentSpec).

use std::collections::BTreeMap;

use serde::Deserialize;

/// A YAML scalar read as text (`cpu: 256`, `cpu: "0.5"`, `DEBUG: true`)
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar(pub String);

#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarDe {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = match ScalarDe::deserialize(deserializer)? {
            ScalarDe::Text(s) => s,
            ScalarDe::Int(i) => i.to_string(),
            ScalarDe::Float(f) => f.to_string(),
            ScalarDe::Bool(b) => b.to_string(),
        };
        Ok(Scalar(text))
    }
}

impl Scalar {
    pub fn into_string(self) -> String {
        self.0
    }
}

/// Deployment configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfig {
    pub service_name: Option<String>,
    pub region: Option<String>,

    /// GCP project id
    pub project_id: Option<String>,

    /// Azure scope names (defaulted from the service name)
    pub resource_group: Option<String>,
    pub registry_name: Option<String>,
    pub environment_name: Option<String>,

    #[serde(default = "default_dockerfile_path")]
    pub dockerfile_path: String,

    #[serde(default = "default_build_context")]
    pub build_context: String,

    #[serde(default = "default_container_port")]
    pub container_port: u16,

    pub cpu: Option<Scalar>,
    pub memory: Option<Scalar>,

    #[serde(default = "default_desired_count")]
    pub desired_count: u32,

    #[serde(default)]
    pub min_instances: u32,

    #[serde(default = "default_max_instances")]
    pub max_instances: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u32,

    #[serde(default = "default_health_check_path")]
    pub health_check_path: String,

    #[serde(default = "default_health_check_interval")]
    pub health_check_interval_seconds: u32,

    #[serde(default)]
    pub enable_https: bool,

    pub certificate_arn: Option<String>,

    #[serde(default = "default_true")]
    pub allow_unauthenticated: bool,

    #[serde(default)]
    pub environment_variables: BTreeMap<String, Scalar>,

    pub environment_file: Option<String>,

    // Overrides for derived resource names
    pub cluster_name: Option<String>,
    pub repository_name: Option<String>,
    pub ecs_service_name: Option<String>,
    pub load_balancer_name: Option<String>,
    pub target_group_name: Option<String>,
    pub log_group_name: Option<String>,
    pub task_family: Option<String>,
    pub execution_role_name: Option<String>,
    pub task_role_name: Option<String>,
}

/// Every key the file may contain, for typo suggestions
pub(crate) const KNOWN_KEYS: &[&str] = &[
    "serviceName",
    "region",
    "projectId",
    "resourceGroup",
    "registryName",
    "environmentName",
    "dockerfilePath",
    "buildContext",
    "containerPort",
    "cpu",
    "memory",
    "desiredCount",
    "minInstances",
    "maxInstances",
    "timeout",
    "healthCheckPath",
    "healthCheckIntervalSeconds",
    "enableHttps",
    "certificateArn",
    "allowUnauthenticated",
    "environmentVariables",
    "environmentFile",
    "clusterName",
    "repositoryName",
    "ecsServiceName",
    "loadBalancerName",
    "targetGroupName",
    "logGroupName",
    "taskFamily",
    "executionRoleName",
    "taskRoleName",
];

fn default_dockerfile_path() -> String {
    "Dockerfile".to_string()
}

fn default_build_context() -> String {
    ".".to_string()
}

fn default_container_port() -> u16 {
    8080
}

fn default_desired_count() -> u32 {
    1
}

fn default_max_instances() -> u32 {
    10
}

fn default_timeout() -> u32 {
    300
}

fn default_health_check_path() -> String {
    "/health".to_string()
}

fn default_health_check_interval() -> u32 {
    30
}

fn default_true() -> bool {
    true
}
