//! Deployer Use Case
//!
//! Composes the reconciliation core for one backend:
//! 1. `setup` - ensure every provisioned resource, in plan order
//! 2. `deploy` - run the rollout state machine
//! 3. `destroy` - discover, then remove in reverse order
//! 4. `logs` - hand the terminal to the provider's log tail
//!
//! Pure orchestration; the rules live in domain services.

use crate::domain::entities::DeploymentSpec;
use crate::domain::ports::{ImagePublisher, ResourceAdapter, Sleeper};
use crate::domain::services::{provision, teardown, RolloutController};
use crate::error::{SpinxError, SpinxResult};

use super::options::DeployerOptions;
use super::result::{DeployReport, SetupReport, TeardownReport};

/// Deployer - every operation for one configured deployment
///
/// Parameterized by its ports so tests can run it against an in-memory
/// backend and a recording sleeper.
pub struct Deployer {
    spec: DeploymentSpec,
    adapter: Box<dyn ResourceAdapter>,
    publisher: Box<dyn ImagePublisher>,
    sleeper: Box<dyn Sleeper>,
    options: DeployerOptions,
}

impl Deployer {
    pub fn new(
        spec: DeploymentSpec,
        adapter: Box<dyn ResourceAdapter>,
        publisher: Box<dyn ImagePublisher>,
        sleeper: Box<dyn Sleeper>,
    ) -> Self {
        Self {
            spec,
            adapter,
            publisher,
            sleeper,
            options: DeployerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DeployerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn spec(&self) -> &DeploymentSpec {
        &self.spec
    }

    /// Confirm the provider CLI is logged in before any real work
    pub fn verify_credentials(&self) -> SpinxResult<()> {
        self.adapter
            .verify_credentials()
            .map_err(|source| SpinxError::Credentials {
                backend: self.spec.backend,
                source,
            })
    }

    /// Create whatever is missing; existing resources are left untouched
    pub fn setup(&self) -> SpinxResult<SetupReport> {
        tracing::info!(
            backend = %self.spec.backend,
            service = %self.spec.service_name,
            region = %self.spec.region,
            "setting up"
        );
        let outcome = provision(self.adapter.as_ref(), &self.spec)?;
        let report = SetupReport::new(&self.spec, outcome);
        tracing::info!(
            created = report.created_count(),
            existing = report.existing_count(),
            "setup complete"
        );
        Ok(report)
    }

    /// Build, push and roll out a new revision
    pub fn deploy(&self) -> SpinxResult<DeployReport> {
        tracing::info!(
            backend = %self.spec.backend,
            service = %self.spec.service_name,
            "deploying"
        );
        let outcome = RolloutController::new(
            self.adapter.as_ref(),
            self.publisher.as_ref(),
            self.sleeper.as_ref(),
            &self.spec,
            self.options.rollout.clone(),
        )
        .run()?;
        Ok(DeployReport::new(&self.spec, outcome))
    }

    /// Remove everything this deployment owns. Never fails.
    pub fn destroy(&self) -> TeardownReport {
        tracing::info!(
            backend = %self.spec.backend,
            service = %self.spec.service_name,
            region = %self.spec.region,
            "destroying"
        );
        let outcome = teardown(
            self.adapter.as_ref(),
            &self.spec,
            self.sleeper.as_ref(),
            &self.options.drain,
        );
        let report = TeardownReport::new(&self.spec, outcome);
        if report.is_clean() {
            tracing::info!(removed = report.removed.len(), "destroy complete");
        } else {
            tracing::warn!(
                removed = report.removed.len(),
                failed = report.failures.len(),
                "destroy finished with leftovers"
            );
        }
        report
    }

    /// Stream recent log entries from the backend
    pub fn logs(&self) -> SpinxResult<()> {
        tracing::debug!(service = %self.spec.service_name, "streaming logs");
        self.adapter.stream_logs().map_err(SpinxError::from)
    }
}
