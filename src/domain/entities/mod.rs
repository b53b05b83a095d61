//! Domain Entities
//!
//! Core business objects of the reconciliation engine.

pub mod deployment_spec;
pub mod plan;
pub mod resource;
pub mod rollout;

pub use deployment_spec::{
    DeploymentSpec, HealthCheck, ImageSource, ResourceNames, Sizing, REQUIRED_APIS,
};
pub use plan::{PlanError, ProvisioningPlan, ProvisioningStep};
pub use resource::{Ensured, Lookup, ResourceDescriptor, ResourceSet};
pub use rollout::{AttemptOutcome, ImageRef, RolloutAttempt, RolloutState};
