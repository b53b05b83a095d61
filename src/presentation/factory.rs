//! Deployer Factory
//!
//! Wires a `Deployer` with real infrastructure: the system process runner,
//! the docker publisher, the Ctrl+C-aware sleeper and the backend adapter.
//! This is the dependency injection point for the binary.

use std::path::Path;

use crate::application::Deployer;
use crate::config::{load_with_warnings, ConfigWarning};
use crate::domain::value_objects::Backend;
use crate::error::{SpinxError, SpinxResult};
use crate::infrastructure::{
    build_adapter, DockerPublisher, Interrupt, InterruptibleSleeper, SystemCommandRunner,
};

/// Install hint shown when a tool is missing
fn install_hint(tool: &str) -> &'static str {
    match tool {
        "aws" => "install the AWS CLI v2 and run 'aws configure'",
        "gcloud" => "install the Google Cloud SDK and run 'gcloud auth login'",
        "az" => "install the Azure CLI and run 'az login'",
        "docker" => "install Docker and make sure the daemon is running",
        _ => "install it and retry",
    }
}

/// Tools an operation on `backend` shells out to
pub fn required_tools(backend: Backend) -> [&'static str; 2] {
    [backend.cli_tool(), "docker"]
}

/// Fail on the first required tool `is_installed` rejects
pub fn check_tools(backend: Backend, is_installed: impl Fn(&str) -> bool) -> SpinxResult<()> {
    for tool in required_tools(backend) {
        if !is_installed(tool) {
            return Err(SpinxError::ToolMissing {
                tool: tool.to_string(),
                hint: install_hint(tool).to_string(),
            });
        }
        tracing::debug!(tool, "found on PATH");
    }
    Ok(())
}

/// Load the configuration, check tools and credentials, and build the deployer
///
/// The configuration is read first so a missing or invalid file is reported
/// before anything touches the network.
pub fn create_deployer(
    config_path: &Path,
    backend: Backend,
    interrupt: Interrupt,
) -> SpinxResult<(Deployer, Vec<ConfigWarning>)> {
    let (spec, warnings) = load_with_warnings(config_path, backend)?;
    check_tools(backend, |tool| which::which(tool).is_ok())?;

    let adapter = build_adapter(&spec);
    let publisher = DockerPublisher::new(SystemCommandRunner::new());
    let sleeper = InterruptibleSleeper::new(interrupt);

    let deployer = Deployer::new(spec, adapter, Box::new(publisher), Box::new(sleeper));
    deployer.verify_credentials()?;
    Ok((deployer, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_tools_include_docker() {
        assert_eq!(required_tools(Backend::AwsFargate), ["aws", "docker"]);
        assert_eq!(required_tools(Backend::GcpCloudRun), ["gcloud", "docker"]);
        assert_eq!(required_tools(Backend::AzureContainerApps), ["az", "docker"]);
    }

    #[test]
    fn check_tools_reports_first_missing_tool() {
        let err = check_tools(Backend::AzureContainerApps, |tool| tool == "docker").unwrap_err();
        match err {
            SpinxError::ToolMissing { tool, hint } => {
                assert_eq!(tool, "az");
                assert!(hint.contains("az login"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn check_tools_missing_docker() {
        let err = check_tools(Backend::GcpCloudRun, |tool| tool == "gcloud").unwrap_err();
        assert!(err.to_string().starts_with("'docker' is not installed"));
    }

    #[test]
    fn check_tools_all_present() {
        assert!(check_tools(Backend::AwsFargate, |_| true).is_ok());
    }

    #[test]
    fn create_deployer_reports_missing_config_first() {
        let dir = tempfile::tempdir().unwrap();
        let result = create_deployer(
            &dir.path().join("absent.yaml"),
            Backend::AwsFargate,
            Interrupt::new(),
        );
        assert!(matches!(result, Err(SpinxError::ConfigNotFound { .. })));
    }
}
