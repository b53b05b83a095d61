//! Backend value object - which container platform a deployment targets

use serde::{Deserialize, Serialize};

/// Cloud backend (container-orchestration platform)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// AWS ECS on Fargate behind an Application Load Balancer
    AwsFargate,
    /// Google Cloud Run with Artifact Registry
    #[value(name = "gcp-cloudrun")]
    #[serde(rename = "gcp-cloudrun")]
    GcpCloudRun,
    /// Azure Container Apps with Azure Container Registry
    AzureContainerApps,
}

impl Backend {
    pub const ALL: [Backend; 3] = [
        Backend::AwsFargate,
        Backend::GcpCloudRun,
        Backend::AzureContainerApps,
    ];

    /// Name used on the command line (`spinx <backend> ...`)
    pub fn cli_name(&self) -> &'static str {
        match self {
            Backend::AwsFargate => "aws-fargate",
            Backend::GcpCloudRun => "gcp-cloudrun",
            Backend::AzureContainerApps => "azure-container-apps",
        }
    }

    /// Human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::AwsFargate => "AWS Fargate",
            Backend::GcpCloudRun => "GCP Cloud Run",
            Backend::AzureContainerApps => "Azure Container Apps",
        }
    }

    /// The provider command-line tool every adapter call goes through
    pub fn cli_tool(&self) -> &'static str {
        match self {
            Backend::AwsFargate => "aws",
            Backend::GcpCloudRun => "gcloud",
            Backend::AzureContainerApps => "az",
        }
    }

    /// Default (cpu, memory) in the units the backend expects
    pub fn default_sizing(&self) -> (&'static str, &'static str) {
        match self {
            Backend::AwsFargate => ("256", "512"),
            Backend::GcpCloudRun => ("1", "512Mi"),
            Backend::AzureContainerApps => ("0.5", "1.0Gi"),
        }
    }

    /// Command that re-runs provisioning, used in remediation messages
    pub fn setup_hint(&self) -> String {
        format!("spinx {} setup <config>", self.cli_name())
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
