//! Resource Adapter Port
//!
//! One implementation per backend. The reconciliation core drives
//! provisioning, rollout and teardown exclusively through this trait and
//! never inspects provider messages: every failure arrives already
//! classified as an [`ErrorClass`].

use crate::domain::entities::{
    Ensured, ImageRef, Lookup, PlanError, ProvisioningPlan, ProvisioningStep, ResourceDescriptor,
    ResourceSet,
};
use crate::domain::value_objects::{Backend, ErrorClass, ResourceKind, TransientCause};

/// Classified failure from a backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterError {
    pub class: ErrorClass,
    pub message: String,
}

impl AdapterError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotFound, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Transient(TransientCause::Backend), message)
    }

    pub fn image_not_visible(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Transient(TransientCause::ImageNotVisible), message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Fatal, message)
    }
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.message, self.class)
    }
}

impl std::error::Error for AdapterError {}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Backend binding used by the reconciliation core
pub trait ResourceAdapter {
    fn backend(&self) -> Backend;

    /// The backend's fixed setup order, dependencies first
    fn provisioning_steps(&self) -> Vec<ProvisioningStep>;

    fn provisioning_plan(&self) -> Result<ProvisioningPlan, PlanError> {
        ProvisioningPlan::new(self.provisioning_steps())
    }

    /// Kinds created by deploy that teardown removes before provisioned kinds.
    ///
    /// Listed in creation order; teardown reverses them.
    fn rollout_kinds(&self) -> Vec<ResourceKind>;

    /// Read-only existence check
    fn lookup(&self, kind: ResourceKind, deps: &ResourceSet) -> AdapterResult<Lookup>;

    /// Create the resource; only called after `lookup` returned `NotFound`
    fn create(&self, kind: ResourceKind, deps: &ResourceSet) -> AdapterResult<ResourceDescriptor>;

    /// Look up, creating only when absent. Existing resources are returned unchanged.
    fn ensure(&self, kind: ResourceKind, deps: &ResourceSet) -> AdapterResult<Ensured> {
        match self.lookup(kind, deps)? {
            Lookup::Found(descriptor) => Ok(Ensured::Existing(descriptor)),
            Lookup::NotFound => self.create(kind, deps).map(Ensured::Created),
        }
    }

    /// Delete the resource. A `NotFound` error means it is already gone.
    fn remove(&self, descriptor: &ResourceDescriptor) -> AdapterResult<()>;

    /// Whether workloads running inside the resource have stopped
    fn is_drained(&self, _descriptor: &ResourceDescriptor) -> AdapterResult<bool> {
        Ok(true)
    }

    /// Confirm the provider CLI is logged in for the configured scope
    fn verify_credentials(&self) -> AdapterResult<()>;

    /// Full image reference for `tag` inside the provisioned registry
    fn image_reference(&self, resources: &ResourceSet, tag: &str) -> AdapterResult<ImageRef>;

    /// Log the local image builder in to the registry
    fn authenticate_registry(&self, image: &ImageRef) -> AdapterResult<()>;

    /// Whether the backend can already see `image`
    fn image_exists(&self, image: &ImageRef) -> AdapterResult<bool>;

    /// Register a new immutable revision running `image`
    fn register_revision(
        &self,
        resources: &ResourceSet,
        image: &ImageRef,
    ) -> AdapterResult<ResourceDescriptor>;

    /// Create the service, or point the existing one at `revision`
    fn apply_service(
        &self,
        resources: &ResourceSet,
        revision: &ResourceDescriptor,
    ) -> AdapterResult<ResourceDescriptor>;

    /// Whether the service has settled on its latest revision
    fn service_stable(&self, service: &ResourceDescriptor) -> AdapterResult<bool>;

    /// Public URL of the running service, if it has one
    fn service_url(&self, resources: &ResourceSet) -> AdapterResult<Option<String>>;

    /// Stream recent log entries to the terminal
    fn stream_logs(&self) -> AdapterResult<()>;
}
