//! Deployment specification entity
//!
//! The immutable description of one deployment, built once per run by the
//! config loader and shared read-only by every layer after that.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::domain::value_objects::{Backend, ResourceKind};

/// Platform APIs a Cloud Run deployment needs enabled
pub const REQUIRED_APIS: [&str; 2] = ["run.googleapis.com", "artifactregistry.googleapis.com"];

/// Compute sizing in the units the backend expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sizing {
    pub cpu: String,
    pub memory: String,
}

/// Where the container image is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    /// Absolute path to the Dockerfile
    pub dockerfile: PathBuf,
    /// Absolute path to the build context directory
    pub context: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    pub path: String,
    pub interval_seconds: u32,
}

/// Names of every backend resource a deployment owns.
///
/// Derived from the service name; individual entries may be overridden
/// in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    pub repository: String,
    pub cluster: String,
    pub service: String,
    pub load_balancer: String,
    pub target_group: String,
    pub execution_role: String,
    pub task_role: String,
    pub log_group: String,
    pub task_family: String,
    pub service_security_group: String,
    pub alb_security_group: String,
    pub resource_group: String,
    pub registry: String,
    pub environment: String,
    pub log_workspace: String,
}

impl ResourceNames {
    /// Derive the default names for a service on a backend
    pub fn derive(backend: Backend, service_name: &str) -> Self {
        let service = match backend {
            Backend::AwsFargate => format!("{service_name}-service"),
            Backend::GcpCloudRun | Backend::AzureContainerApps => service_name.to_string(),
        };

        Self {
            repository: service_name.to_string(),
            cluster: format!("{service_name}-cluster"),
            service,
            load_balancer: format!("{service_name}-alb"),
            target_group: format!("{service_name}-tg"),
            execution_role: format!("{service_name}-execution-role"),
            task_role: format!("{service_name}-task-role"),
            log_group: format!("/ecs/{service_name}"),
            task_family: format!("{service_name}-task"),
            service_security_group: format!("{service_name}-sg"),
            alb_security_group: format!("{service_name}-alb-sg"),
            resource_group: format!("{service_name}-rg"),
            registry: registry_name(service_name),
            environment: format!("{service_name}-env"),
            log_workspace: format!("{service_name}-logs"),
        }
    }
}

/// Azure registry names are alphanumeric only
fn registry_name(service_name: &str) -> String {
    let mut name: String = service_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    name.push_str("registry");
    name
}

/// Everything one run needs to know about the deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSpec {
    pub backend: Backend,
    pub service_name: String,
    /// AWS region, GCP region or Azure location
    pub region: String,
    /// GCP project id
    pub project_id: Option<String>,
    pub sizing: Sizing,
    pub container_port: u16,
    pub image_source: ImageSource,
    pub desired_count: u32,
    pub min_instances: u32,
    pub max_instances: u32,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    pub health_check: HealthCheck,
    pub enable_https: bool,
    pub certificate_arn: Option<String>,
    pub allow_unauthenticated: bool,
    /// Merged environment (`.env` file overridden by explicit YAML entries)
    pub environment: BTreeMap<String, String>,
    pub names: ResourceNames,
}

impl DeploymentSpec {
    /// Spec with every default applied; used by tests and as the loader's base
    pub fn new(backend: Backend, service_name: impl Into<String>, region: impl Into<String>) -> Self {
        let service_name = service_name.into();
        let (cpu, memory) = backend.default_sizing();
        Self {
            backend,
            names: ResourceNames::derive(backend, &service_name),
            service_name,
            region: region.into(),
            project_id: None,
            sizing: Sizing {
                cpu: cpu.to_string(),
                memory: memory.to_string(),
            },
            container_port: 8080,
            image_source: ImageSource {
                dockerfile: PathBuf::from("Dockerfile"),
                context: PathBuf::from("."),
            },
            desired_count: 1,
            min_instances: 0,
            max_instances: 10,
            timeout_seconds: 300,
            health_check: HealthCheck {
                path: "/health".to_string(),
                interval_seconds: 30,
            },
            enable_https: false,
            certificate_arn: None,
            allow_unauthenticated: true,
            environment: BTreeMap::new(),
        }
    }

    /// Whether the AWS load balancer gets an HTTPS listener
    pub fn https_listener(&self) -> bool {
        self.enable_https && self.certificate_arn.is_some()
    }

    /// Logical name of the resource of `kind` on this deployment's backend
    pub fn resource_name(&self, kind: ResourceKind) -> String {
        let names = &self.names;
        match (self.backend, kind) {
            (_, ResourceKind::Service) => names.service.clone(),
            (Backend::AzureContainerApps, ResourceKind::Registry) => names.registry.clone(),
            (_, ResourceKind::Registry) => names.repository.clone(),
            (_, ResourceKind::ResourceGroup) => names.resource_group.clone(),
            (_, ResourceKind::ServiceApis) => REQUIRED_APIS.join(","),
            (_, ResourceKind::Network) => "default-vpc".to_string(),
            (_, ResourceKind::Identity) => names.execution_role.clone(),
            (Backend::AzureContainerApps, ResourceKind::ComputeCluster) => names.environment.clone(),
            (_, ResourceKind::ComputeCluster) => names.cluster.clone(),
            (_, ResourceKind::LoadBalancer) => names.load_balancer.clone(),
            (Backend::AzureContainerApps, ResourceKind::LogSink) => names.log_workspace.clone(),
            (_, ResourceKind::LogSink) => names.log_group.clone(),
            (Backend::AwsFargate, ResourceKind::Revision) => names.task_family.clone(),
            (_, ResourceKind::Revision) => names.service.clone(),
        }
    }

    /// Every name this deployment chose, including the service name itself
    pub fn owned_names(&self) -> Vec<String> {
        let n = &self.names;
        vec![
            self.service_name.clone(),
            n.repository.clone(),
            n.cluster.clone(),
            n.service.clone(),
            n.load_balancer.clone(),
            n.target_group.clone(),
            n.execution_role.clone(),
            n.task_role.clone(),
            n.log_group.clone(),
            n.task_family.clone(),
            n.service_security_group.clone(),
            n.alb_security_group.clone(),
            n.resource_group.clone(),
            n.registry.clone(),
            n.environment.clone(),
            n.log_workspace.clone(),
        ]
    }

    /// Every name worth checking by hand after a destroy
    pub fn manual_check_names(&self) -> Vec<String> {
        let names = &self.names;
        match self.backend {
            Backend::AwsFargate => vec![
                names.service.clone(),
                names.task_family.clone(),
                names.cluster.clone(),
                names.load_balancer.clone(),
                names.target_group.clone(),
                names.alb_security_group.clone(),
                names.service_security_group.clone(),
                names.execution_role.clone(),
                names.task_role.clone(),
                names.log_group.clone(),
                names.repository.clone(),
            ],
            Backend::GcpCloudRun => vec![names.service.clone(), names.repository.clone()],
            Backend::AzureContainerApps => vec![
                names.service.clone(),
                names.environment.clone(),
                names.log_workspace.clone(),
                names.registry.clone(),
                names.resource_group.clone(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_aws_names_from_service() {
        let names = ResourceNames::derive(Backend::AwsFargate, "shop");
        assert_eq!(names.cluster, "shop-cluster");
        assert_eq!(names.service, "shop-service");
        assert_eq!(names.load_balancer, "shop-alb");
        assert_eq!(names.log_group, "/ecs/shop");
        assert_eq!(names.task_family, "shop-task");
    }

    #[test]
    fn cloud_run_service_keeps_plain_name() {
        let names = ResourceNames::derive(Backend::GcpCloudRun, "shop");
        assert_eq!(names.service, "shop");
    }

    #[test]
    fn azure_registry_is_alphanumeric() {
        let names = ResourceNames::derive(Backend::AzureContainerApps, "My-Shop_2");
        assert_eq!(names.registry, "myshop2registry");
    }

    #[test]
    fn resource_name_follows_backend() {
        let aws = DeploymentSpec::new(Backend::AwsFargate, "shop", "us-east-1");
        assert_eq!(aws.resource_name(ResourceKind::ComputeCluster), "shop-cluster");
        assert_eq!(aws.resource_name(ResourceKind::Revision), "shop-task");

        let azure = DeploymentSpec::new(Backend::AzureContainerApps, "shop", "eastus");
        assert_eq!(azure.resource_name(ResourceKind::ComputeCluster), "shop-env");
        assert_eq!(azure.resource_name(ResourceKind::Registry), "shopregistry");
        assert_eq!(azure.resource_name(ResourceKind::LogSink), "shop-logs");
    }

    #[test]
    fn owned_names_include_overrides() {
        let mut spec = DeploymentSpec::new(Backend::AzureContainerApps, "shop", "eastus");
        spec.names.resource_group = "platform".to_string();
        let owned = spec.owned_names();
        assert!(owned.contains(&"shop".to_string()));
        assert!(owned.contains(&"platform".to_string()));
        assert!(owned.contains(&"shopregistry".to_string()));
    }

    #[test]
    fn https_requires_certificate() {
        let mut spec = DeploymentSpec::new(Backend::AwsFargate, "shop", "us-east-1");
        spec.enable_https = true;
        assert!(!spec.https_listener());
        spec.certificate_arn = Some("arn:aws:acm:cert".to_string());
        assert!(spec.https_listener());
    }

    #[test]
    fn defaults_follow_backend_sizing() {
        let gcp = DeploymentSpec::new(Backend::GcpCloudRun, "shop", "us-central1");
        assert_eq!(gcp.sizing.cpu, "1");
        assert_eq!(gcp.sizing.memory, "512Mi");
        assert_eq!(gcp.container_port, 8080);
        assert_eq!(gcp.health_check.path, "/health");
    }
}
