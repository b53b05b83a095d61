//! Backend bindings
//!
//! One [`ResourceAdapter`] per supported platform, each driving the
//! provider's own CLI through a [`CommandRunner`].

mod aws_fargate;
mod azure_container_apps;
pub(crate) mod cli;
mod gcp_cloudrun;

pub use aws_fargate::AwsFargate;
pub use azure_container_apps::AzureContainerApps;
pub use gcp_cloudrun::GcpCloudRun;

use crate::domain::entities::DeploymentSpec;
use crate::domain::ports::{CommandRunner, ResourceAdapter};
use crate::domain::value_objects::Backend;
use crate::infrastructure::process::SystemCommandRunner;

/// Adapter for the deployment's backend, running real provider commands
pub fn build_adapter(spec: &DeploymentSpec) -> Box<dyn ResourceAdapter> {
    build_adapter_with(spec, SystemCommandRunner::new())
}

pub fn build_adapter_with<R>(spec: &DeploymentSpec, runner: R) -> Box<dyn ResourceAdapter>
where
    R: CommandRunner + 'static,
{
    match spec.backend {
        Backend::AwsFargate => Box::new(AwsFargate::new(spec.clone(), runner)),
        Backend::GcpCloudRun => Box::new(GcpCloudRun::new(spec.clone(), runner)),
        Backend::AzureContainerApps => Box::new(AzureContainerApps::new(spec.clone(), runner)),
    }
}
