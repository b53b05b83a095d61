//! Resource kinds managed by the reconciliation core

use serde::Serialize;

/// Kind of backend resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Platform APIs that must be enabled before anything else (GCP)
    ServiceApis,
    /// Resource group scoping every other resource (Azure)
    ResourceGroup,
    /// Container image registry / repository
    Registry,
    /// Network and subnets
    Network,
    /// Roles the running tasks assume
    Identity,
    /// Compute cluster / managed environment
    ComputeCluster,
    /// Load balancer with target group and listener
    LoadBalancer,
    /// Log group / workspace
    LogSink,
    /// Immutable task definition / revision
    Revision,
    /// The running service
    Service,
}

impl ResourceKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::ServiceApis => "platform APIs",
            ResourceKind::ResourceGroup => "resource group",
            ResourceKind::Registry => "image registry",
            ResourceKind::Network => "network",
            ResourceKind::Identity => "identity",
            ResourceKind::ComputeCluster => "compute cluster",
            ResourceKind::LoadBalancer => "load balancer",
            ResourceKind::LogSink => "log sink",
            ResourceKind::Revision => "revision",
            ResourceKind::Service => "service",
        }
    }

    /// Kinds whose running workloads must stop before deletion
    pub fn requires_drain(&self) -> bool {
        matches!(self, ResourceKind::ComputeCluster)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
