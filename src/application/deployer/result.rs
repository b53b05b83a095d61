//! Deployer Reports
//!
//! What each operation did, in a shape the presentation layer renders as
//! text or JSON.

use serde::Serialize;

use crate::domain::entities::{DeploymentSpec, ResourceDescriptor, RolloutAttempt, RolloutState};
use crate::domain::services::{
    AbsentResource, ProvisionOutcome, RolloutOutcome, TeardownFailure, TeardownOutcome,
    WaitOutcome,
};
use crate::domain::value_objects::{Backend, ResourceKind};

/// One ensured resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupStep {
    pub kind: ResourceKind,
    pub name: String,
    pub id: String,
    /// `false` when the resource already existed
    pub created: bool,
}

/// Result of `setup`
#[derive(Debug, Clone, Serialize)]
pub struct SetupReport {
    pub backend: Backend,
    pub service_name: String,
    pub region: String,
    /// In plan order
    pub steps: Vec<SetupStep>,
}

impl SetupReport {
    pub fn new(spec: &DeploymentSpec, outcome: ProvisionOutcome) -> Self {
        let steps = outcome
            .steps
            .into_iter()
            .map(|ensured| {
                let created = ensured.was_created();
                let descriptor = ensured.into_descriptor();
                SetupStep {
                    kind: descriptor.kind,
                    name: descriptor.name,
                    id: descriptor.id,
                    created,
                }
            })
            .collect();
        Self {
            backend: spec.backend,
            service_name: spec.service_name.clone(),
            region: spec.region.clone(),
            steps,
        }
    }

    pub fn created_count(&self) -> usize {
        self.steps.iter().filter(|s| s.created).count()
    }

    pub fn existing_count(&self) -> usize {
        self.steps.len() - self.created_count()
    }
}

/// How the post-deploy stability wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StabilityReport {
    Stable { polls: u32 },
    /// The window ran out; the deploy still counts as done
    TimedOut { polls: u32 },
}

impl StabilityReport {
    pub fn is_stable(&self) -> bool {
        matches!(self, StabilityReport::Stable { .. })
    }
}

impl From<WaitOutcome> for StabilityReport {
    fn from(outcome: WaitOutcome) -> Self {
        match outcome {
            WaitOutcome::Ready { polls } => StabilityReport::Stable { polls },
            WaitOutcome::TimedOut { polls } => StabilityReport::TimedOut { polls },
        }
    }
}

/// Server entry for an MCP client pointing at the deployed service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McpClientConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub transport: String,
    pub url: String,
}

impl McpClientConfig {
    /// Streamable HTTP entry at `<service_url>/mcp`
    pub fn http(name: impl Into<String>, service_url: &str) -> Self {
        Self {
            name: name.into(),
            transport: "http".to_string(),
            url: format!("{}/mcp", service_url.trim_end_matches('/')),
        }
    }

    /// `"name": { .. }` fragment, ready to paste into a client's server map
    pub fn snippet(&self) -> String {
        let body = serde_json::json!({ "type": self.transport, "url": self.url });
        format!(
            "{}: {}",
            serde_json::Value::String(self.name.clone()),
            serde_json::to_string_pretty(&body).unwrap_or_default()
        )
    }
}

/// Result of `deploy`
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub backend: Backend,
    pub service_name: String,
    pub image: String,
    pub revision: String,
    pub service: String,
    pub url: Option<String>,
    /// Present whenever the URL is known
    pub mcp_client: Option<McpClientConfig>,
    /// Every service-update attempt, in order
    pub attempts: Vec<RolloutAttempt>,
    pub stability: StabilityReport,
    pub image_confirmed: bool,
    /// States visited, ending in `done`
    pub states: Vec<RolloutState>,
}

impl DeployReport {
    pub fn new(spec: &DeploymentSpec, outcome: RolloutOutcome) -> Self {
        Self {
            backend: spec.backend,
            service_name: spec.service_name.clone(),
            image: outcome.image.to_string(),
            revision: outcome.revision.id,
            service: outcome.service.id,
            mcp_client: outcome
                .url
                .as_deref()
                .map(|url| McpClientConfig::http(spec.service_name.clone(), url)),
            url: outcome.url,
            attempts: outcome.attempts,
            stability: outcome.stability.into(),
            image_confirmed: outcome.image_confirmed,
            states: outcome.states,
        }
    }
}

/// Result of `destroy`. Always produced, even when removals failed.
#[derive(Debug, Clone, Serialize)]
pub struct TeardownReport {
    pub backend: Backend,
    pub service_name: String,
    pub region: String,
    /// In removal order
    pub removed: Vec<ResourceDescriptor>,
    pub absent: Vec<AbsentResource>,
    pub failures: Vec<TeardownFailure>,
    pub drain_timeouts: Vec<ResourceKind>,
    pub interrupted: bool,
    /// Names to verify by hand in the provider console
    pub manual_check: Vec<String>,
}

impl TeardownReport {
    pub fn new(spec: &DeploymentSpec, outcome: TeardownOutcome) -> Self {
        Self {
            backend: spec.backend,
            service_name: spec.service_name.clone(),
            region: spec.region.clone(),
            removed: outcome.removed,
            absent: outcome.absent,
            failures: outcome.failures,
            drain_timeouts: outcome.drain_timeouts,
            interrupted: outcome.interrupted,
            manual_check: spec.manual_check_names(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.interrupted
    }
}
