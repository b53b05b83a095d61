//! spinx - multi-cloud container deployment
//!
//! spinx deploys one containerized service to AWS Fargate, GCP Cloud Run or
//! Azure Container Apps from a single YAML file. A backend-neutral
//! reconciliation core provisions resources in dependency order, rolls out
//! new revisions with bounded retries and tears everything down in reverse.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod logging;
pub mod presentation;

// Re-exports for convenience
pub use application::{
    DeployReport, Deployer, DeployerOptions, SetupReport, StabilityReport, TeardownReport,
};
pub use domain::entities::DeploymentSpec;
pub use domain::value_objects::{Backend, ErrorClass, ResourceKind};
pub use error::{SpinxError, SpinxResult};
