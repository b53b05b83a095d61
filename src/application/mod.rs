//! Application Layer
//!
//! Composes the domain services into the operations a user runs. Rules about
//! ordering, retrying and waiting stay in `domain::services`; this layer only
//! sequences them and turns outcomes into reports.
//!
//! - `Deployer` - setup, deploy, destroy and log streaming for one backend

pub mod deployer;

pub use deployer::{
    DeployReport, Deployer, DeployerOptions, McpClientConfig, SetupReport, SetupStep,
    StabilityReport, TeardownReport,
};
