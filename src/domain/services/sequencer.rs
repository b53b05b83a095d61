//! Provisioning sequencer
//!
//! Setup walks the adapter's plan forward, ensuring one kind at a time and
//! handing each step only the descriptors it declared as dependencies. The
//! first failure aborts. Teardown discovers what exists, then removes it in
//! exact reverse order and keeps going past individual failures.

use serde::Serialize;

use crate::domain::entities::{DeploymentSpec, Ensured, Lookup, ResourceDescriptor, ResourceSet};
use crate::domain::ports::{ResourceAdapter, Sleeper};
use crate::domain::services::readiness::{wait_until, WaitOutcome, WaitPolicy};
use crate::domain::value_objects::{ErrorClass, ResourceKind};
use crate::error::{SpinxError, SpinxResult};

/// What setup did, step by step
#[derive(Debug, Clone, Default)]
pub struct ProvisionOutcome {
    pub resources: ResourceSet,
    /// In plan order
    pub steps: Vec<Ensured>,
}

/// Ensure every kind in the adapter's plan, in order
pub fn provision(adapter: &dyn ResourceAdapter, spec: &DeploymentSpec) -> SpinxResult<ProvisionOutcome> {
    let plan = adapter.provisioning_plan()?;
    let mut outcome = ProvisionOutcome::default();

    for step in plan.steps() {
        let name = spec.resource_name(step.kind);
        let deps = outcome.resources.subset(&step.depends_on);
        tracing::debug!(kind = %step.kind, name = %name, "ensuring");

        let ensured = adapter
            .ensure(step.kind, &deps)
            .map_err(|source| SpinxError::StepFailed {
                kind: step.kind,
                name: name.clone(),
                source,
            })?;

        if ensured.was_created() {
            tracing::info!(kind = %step.kind, name = %name, "created");
        } else {
            tracing::info!(kind = %step.kind, name = %name, "already exists");
        }

        outcome.resources.insert(ensured.descriptor().clone());
        outcome.steps.push(ensured);
    }

    Ok(outcome)
}

/// A resource teardown could not remove (or could not even look up)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownFailure {
    pub kind: ResourceKind,
    pub name: String,
    pub class: ErrorClass,
    pub message: String,
}

/// A resource teardown found nothing to remove for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbsentResource {
    pub kind: ResourceKind,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct TeardownOutcome {
    /// In removal order
    pub removed: Vec<ResourceDescriptor>,
    pub absent: Vec<AbsentResource>,
    pub failures: Vec<TeardownFailure>,
    /// Drain waits that ran out of time before deletion went ahead
    pub drain_timeouts: Vec<ResourceKind>,
    pub interrupted: bool,
}

impl TeardownOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.interrupted
    }

    fn fail(&mut self, kind: ResourceKind, name: String, message: String) {
        tracing::warn!(kind = %kind, name = %name, error = %message, "teardown step failed; continuing");
        self.failures.push(TeardownFailure {
            kind,
            name,
            class: ErrorClass::PartialTeardownFailure,
            message,
        });
    }

    fn absent(&mut self, kind: ResourceKind, name: String) {
        tracing::info!(kind = %kind, name = %name, "already absent");
        self.absent.push(AbsentResource { kind, name });
    }
}

/// Kinds in the order they come into existence: plan, then rollout
pub fn teardown_plan(adapter: &dyn ResourceAdapter) -> Vec<ResourceKind> {
    let mut kinds: Vec<ResourceKind> = adapter
        .provisioning_steps()
        .iter()
        .map(|step| step.kind)
        .collect();
    for kind in adapter.rollout_kinds() {
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    kinds
}

/// Remove everything the deployment owns. Never fails.
pub fn teardown(
    adapter: &dyn ResourceAdapter,
    spec: &DeploymentSpec,
    sleeper: &dyn Sleeper,
    drain: &WaitPolicy,
) -> TeardownOutcome {
    let order = teardown_plan(adapter);
    let mut outcome = TeardownOutcome::default();
    let mut found = ResourceSet::new();

    for &kind in &order {
        let name = spec.resource_name(kind);
        match adapter.lookup(kind, &found) {
            Ok(Lookup::Found(descriptor)) => found.insert(descriptor),
            Ok(Lookup::NotFound) => outcome.absent(kind, name),
            Err(err) if err.class.is_not_found() => outcome.absent(kind, name),
            Err(err) => outcome.fail(kind, name, err.to_string()),
        }
    }

    for &kind in order.iter().rev() {
        let Some(descriptor) = found.get(kind) else {
            continue;
        };

        if sleeper.is_interrupted() {
            outcome.interrupted = true;
            break;
        }

        if kind.requires_drain() {
            let waited = wait_until(drain, sleeper, "tasks drained", || adapter.is_drained(descriptor));
            match waited {
                Ok(WaitOutcome::TimedOut { .. }) => outcome.drain_timeouts.push(kind),
                Ok(WaitOutcome::Ready { .. }) => {}
                Err(_) => {
                    outcome.interrupted = true;
                    break;
                }
            }
        }

        tracing::debug!(kind = %kind, name = %descriptor.name, "removing");
        match adapter.remove(descriptor) {
            Ok(()) => {
                tracing::info!(kind = %kind, name = %descriptor.name, "removed");
                outcome.removed.push(descriptor.clone());
            }
            Err(err) if err.class.is_not_found() => outcome.absent(kind, descriptor.name.clone()),
            Err(err) => outcome.fail(kind, descriptor.name.clone(), err.to_string()),
        }
    }

    if outcome.interrupted {
        tracing::warn!("teardown interrupted; remaining resources were left in place");
    }

    outcome
}
