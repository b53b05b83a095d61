//! Rollout controller
//!
//! The deploy-time state machine:
//!
//! ```text
//! ValidatingPreconditions -> Publishing -> Registering -> UpdatingService
//!     -> AwaitingStability -> Done
//! ```
//!
//! `Failed` is reachable from every state before `Done`. The precondition
//! gate only ever looks resources up; it never creates one.

use std::time::Duration;

use crate::domain::entities::{
    DeploymentSpec, ImageRef, Lookup, ResourceDescriptor, ResourceSet, RolloutAttempt,
    RolloutState,
};
use crate::domain::ports::{ImagePublisher, ResourceAdapter, Sleeper};
use crate::domain::services::readiness::{wait_until, WaitOutcome, WaitPolicy};
use crate::domain::services::retry::{retry, RetryFailure, RetryPolicy};
use crate::error::{SpinxError, SpinxResult};

/// Timing knobs of a rollout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutPolicy {
    pub retry: RetryPolicy,
    pub stability: WaitPolicy,
    /// Wait before re-checking an image the backend cannot see yet
    pub image_probe_delay: Duration,
}

impl Default for RolloutPolicy {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            stability: WaitPolicy::service_stable(),
            image_probe_delay: Duration::from_secs(10),
        }
    }
}

/// Everything a successful rollout produced
#[derive(Debug, Clone)]
pub struct RolloutOutcome {
    pub image: ImageRef,
    pub revision: ResourceDescriptor,
    pub service: ResourceDescriptor,
    pub url: Option<String>,
    pub attempts: Vec<RolloutAttempt>,
    pub stability: WaitOutcome,
    /// Whether the post-push existence probe saw the image
    pub image_confirmed: bool,
    pub states: Vec<RolloutState>,
}

pub struct RolloutController<'a> {
    adapter: &'a dyn ResourceAdapter,
    publisher: &'a dyn ImagePublisher,
    sleeper: &'a dyn Sleeper,
    spec: &'a DeploymentSpec,
    policy: RolloutPolicy,
    states: Vec<RolloutState>,
}

impl<'a> RolloutController<'a> {
    pub fn new(
        adapter: &'a dyn ResourceAdapter,
        publisher: &'a dyn ImagePublisher,
        sleeper: &'a dyn Sleeper,
        spec: &'a DeploymentSpec,
        policy: RolloutPolicy,
    ) -> Self {
        Self {
            adapter,
            publisher,
            sleeper,
            spec,
            policy,
            states: Vec::new(),
        }
    }

    fn enter(&mut self, state: RolloutState) {
        tracing::info!(state = %state, "rollout");
        self.states.push(state);
    }

    fn fail(&mut self, state: RolloutState, source: SpinxError) -> SpinxError {
        tracing::error!(state = %state, error = %source, "rollout failed");
        self.states.push(RolloutState::Failed);
        SpinxError::Rollout {
            state,
            source: Box::new(source),
        }
    }

    /// Drive the state machine to `Done`
    pub fn run(mut self) -> SpinxResult<RolloutOutcome> {
        self.enter(RolloutState::ValidatingPreconditions);
        let mut resources = self
            .validate_preconditions()
            .map_err(|e| self.fail(RolloutState::ValidatingPreconditions, e))?;

        self.enter(RolloutState::Publishing);
        let (image, image_confirmed) = self
            .publish(&resources)
            .map_err(|e| self.fail(RolloutState::Publishing, e))?;

        self.enter(RolloutState::Registering);
        let revision = self
            .adapter
            .register_revision(&resources, &image)
            .map_err(|e| self.fail(RolloutState::Registering, e.into()))?;
        tracing::info!(revision = %revision.id, "registered revision");
        resources.insert(revision.clone());

        self.enter(RolloutState::UpdatingService);
        let retried = retry(&self.policy.retry, self.sleeper, "update service", |_| {
            self.adapter.apply_service(&resources, &revision)
        });
        let attempts = retried.attempts;
        let service = retried.result.map_err(|failure| {
            let source = match failure {
                RetryFailure::Fatal { error, .. } => SpinxError::Adapter(error),
                RetryFailure::Exhausted { attempts, last } => {
                    SpinxError::RetriesExhausted { attempts, last }
                }
                RetryFailure::Interrupted { .. } => SpinxError::Interrupted,
            };
            self.fail(RolloutState::UpdatingService, source)
        })?;
        resources.insert(service.clone());

        self.enter(RolloutState::AwaitingStability);
        let stability = wait_until(&self.policy.stability, self.sleeper, "service stable", || {
            self.adapter.service_stable(&service)
        })
        .map_err(|_| self.fail(RolloutState::AwaitingStability, SpinxError::Interrupted))?;

        let url = match self.adapter.service_url(&resources) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(error = %err, "could not determine service URL");
                None
            }
        };

        self.enter(RolloutState::Done);
        Ok(RolloutOutcome {
            image,
            revision,
            service,
            url,
            attempts,
            stability,
            image_confirmed,
            states: self.states,
        })
    }

    /// Look every provisioned kind up; a missing one blocks the rollout
    fn validate_preconditions(&self) -> SpinxResult<ResourceSet> {
        let mut resources = ResourceSet::new();
        for kind in self.adapter.provisioning_plan()?.kinds() {
            let missing = || SpinxError::MissingPrecondition {
                kind,
                name: self.spec.resource_name(kind),
                hint: self.spec.backend.setup_hint(),
            };
            match self.adapter.lookup(kind, &resources) {
                Ok(Lookup::Found(descriptor)) => resources.insert(descriptor),
                Ok(Lookup::NotFound) => return Err(missing()),
                Err(err) if err.class.is_not_found() => return Err(missing()),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(resources)
    }

    fn publish(&self, resources: &ResourceSet) -> SpinxResult<(ImageRef, bool)> {
        let source = &self.spec.image_source;
        let tag = self.publisher.unique_tag(source);
        let image = self.adapter.image_reference(resources, &tag)?;
        tracing::info!(image = %image, "publishing image");

        self.adapter.authenticate_registry(&image)?;
        self.publisher.publish(&image, source)?;

        Ok((image.clone(), self.probe_image(&image)?))
    }

    /// Best-effort check that the backend can see the pushed image
    fn probe_image(&self, image: &ImageRef) -> SpinxResult<bool> {
        for check in 1..=2 {
            match self.adapter.image_exists(image) {
                Ok(true) => {
                    tracing::debug!(image = %image, "image visible in registry");
                    return Ok(true);
                }
                Ok(false) => tracing::debug!(image = %image, check, "image not visible yet"),
                Err(err) => tracing::debug!(image = %image, check, error = %err, "image probe failed"),
            }
            if check == 1 {
                self.sleeper
                    .sleep(self.policy.image_probe_delay)
                    .map_err(|_| SpinxError::Interrupted)?;
            }
        }
        tracing::warn!(image = %image, "could not confirm the image in the registry; continuing");
        Ok(false)
    }
}
