//! In-memory cloud for driving the `Deployer` end to end.
//!
//! The adapter, publisher and sleeper share state through `Rc<RefCell<_>>`
//! so a test can hand boxed ports to the deployer and still inspect what
//! happened afterwards.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use spinx::domain::entities::{
    DeploymentSpec, ImageRef, ImageSource, Lookup, ProvisioningStep, ResourceDescriptor,
    ResourceSet,
};
use spinx::domain::ports::{
    AdapterError, AdapterResult, ImagePublisher, Interrupted, PublishError, ResourceAdapter,
    Sleeper,
};
use spinx::domain::services::{RetryPolicy, RolloutPolicy, WaitPolicy};
use spinx::domain::value_objects::{Backend, ResourceKind};
use spinx::{Deployer, DeployerOptions};

#[derive(Debug, Default)]
pub struct CloudState {
    pub live: BTreeMap<ResourceKind, ResourceDescriptor>,
    pub creates: Vec<ResourceKind>,
    pub removes: Vec<ResourceKind>,
    /// Kinds whose removal fails
    pub stuck: Vec<ResourceKind>,
    /// Kinds whose creation fails fatally
    pub refused: Vec<ResourceKind>,
    /// Errors returned by successive `apply_service` calls before it succeeds
    pub apply_failures: VecDeque<AdapterError>,
    pub apply_calls: u32,
    pub stable: bool,
    pub image_visible: bool,
    pub published: Vec<String>,
    next_id: u32,
}

impl CloudState {
    fn insert(&mut self, kind: ResourceKind, name: String) -> ResourceDescriptor {
        self.next_id += 1;
        let descriptor = ResourceDescriptor::new(kind, name, format!("id-{}", self.next_id));
        self.live.insert(kind, descriptor.clone());
        descriptor
    }
}

/// Handle on the shared state
#[derive(Clone, Default)]
pub struct Cloud {
    pub state: Rc<RefCell<CloudState>>,
    pub slept: Rc<RefCell<Vec<Duration>>>,
    /// Sleeps allowed before the sleeper reports an interrupt
    pub interrupt_after: Rc<RefCell<Option<usize>>>,
}

impl Cloud {
    pub fn new() -> Self {
        let cloud = Self::default();
        {
            let mut state = cloud.state.borrow_mut();
            state.stable = true;
            state.image_visible = true;
        }
        cloud
    }

    pub fn spec() -> DeploymentSpec {
        DeploymentSpec::new(Backend::AwsFargate, "shop", "us-east-1")
    }

    /// Deployer over this cloud with the production retry schedule and a
    /// short stability window
    pub fn deployer(&self) -> Deployer {
        let options = DeployerOptions::new()
            .with_rollout(RolloutPolicy {
                retry: RetryPolicy::default(),
                stability: WaitPolicy {
                    interval: Duration::from_secs(15),
                    window: Duration::from_secs(60),
                    max_polls: None,
                },
                image_probe_delay: Duration::from_secs(10),
            })
            .with_drain(WaitPolicy::tasks_drained());
        Deployer::new(
            Self::spec(),
            Box::new(InMemoryBackend {
                state: self.state.clone(),
                spec: Self::spec(),
            }),
            Box::new(FakePublisher {
                state: self.state.clone(),
            }),
            Box::new(RecordingSleeper {
                slept: self.slept.clone(),
                interrupt_after: self.interrupt_after.clone(),
            }),
        )
        .with_options(options)
    }

    pub fn creates(&self) -> Vec<ResourceKind> {
        self.state.borrow().creates.clone()
    }

    pub fn removes(&self) -> Vec<ResourceKind> {
        self.state.borrow().removes.clone()
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }
}

/// Fargate-shaped plan: roles before the cluster, network before the load balancer
pub struct InMemoryBackend {
    state: Rc<RefCell<CloudState>>,
    spec: DeploymentSpec,
}

impl ResourceAdapter for InMemoryBackend {
    fn backend(&self) -> Backend {
        Backend::AwsFargate
    }

    fn provisioning_steps(&self) -> Vec<ProvisioningStep> {
        vec![
            ProvisioningStep::new(ResourceKind::Network),
            ProvisioningStep::new(ResourceKind::Identity),
            ProvisioningStep::new(ResourceKind::ComputeCluster).after(ResourceKind::Identity),
            ProvisioningStep::new(ResourceKind::LoadBalancer).after(ResourceKind::Network),
            ProvisioningStep::new(ResourceKind::LogSink),
        ]
    }

    fn rollout_kinds(&self) -> Vec<ResourceKind> {
        vec![ResourceKind::Revision, ResourceKind::Service]
    }

    fn lookup(&self, kind: ResourceKind, _deps: &ResourceSet) -> AdapterResult<Lookup> {
        Ok(match self.state.borrow().live.get(&kind) {
            Some(descriptor) => Lookup::Found(descriptor.clone()),
            None => Lookup::NotFound,
        })
    }

    fn create(&self, kind: ResourceKind, _deps: &ResourceSet) -> AdapterResult<ResourceDescriptor> {
        let mut state = self.state.borrow_mut();
        if state.refused.contains(&kind) {
            return Err(AdapterError::fatal("AccessDenied: not authorized to create"));
        }
        state.creates.push(kind);
        Ok(state.insert(kind, self.spec.resource_name(kind)))
    }

    fn remove(&self, descriptor: &ResourceDescriptor) -> AdapterResult<()> {
        let mut state = self.state.borrow_mut();
        state.removes.push(descriptor.kind);
        if state.stuck.contains(&descriptor.kind) {
            return Err(AdapterError::transient("resource is still in use"));
        }
        state.live.remove(&descriptor.kind);
        Ok(())
    }

    fn verify_credentials(&self) -> AdapterResult<()> {
        Ok(())
    }

    fn image_reference(&self, _resources: &ResourceSet, tag: &str) -> AdapterResult<ImageRef> {
        Ok(ImageRef::new("registry.local/shop", tag))
    }

    fn authenticate_registry(&self, _image: &ImageRef) -> AdapterResult<()> {
        Ok(())
    }

    fn image_exists(&self, _image: &ImageRef) -> AdapterResult<bool> {
        Ok(self.state.borrow().image_visible)
    }

    fn register_revision(
        &self,
        _resources: &ResourceSet,
        _image: &ImageRef,
    ) -> AdapterResult<ResourceDescriptor> {
        let mut state = self.state.borrow_mut();
        Ok(state.insert(ResourceKind::Revision, self.spec.names.task_family.clone()))
    }

    fn apply_service(
        &self,
        _resources: &ResourceSet,
        _revision: &ResourceDescriptor,
    ) -> AdapterResult<ResourceDescriptor> {
        let mut state = self.state.borrow_mut();
        state.apply_calls += 1;
        if let Some(err) = state.apply_failures.pop_front() {
            return Err(err);
        }
        Ok(state.insert(ResourceKind::Service, self.spec.names.service.clone()))
    }

    fn service_stable(&self, _service: &ResourceDescriptor) -> AdapterResult<bool> {
        Ok(self.state.borrow().stable)
    }

    fn service_url(&self, _resources: &ResourceSet) -> AdapterResult<Option<String>> {
        Ok(Some("http://shop.local".to_string()))
    }

    fn stream_logs(&self) -> AdapterResult<()> {
        Ok(())
    }
}

pub struct FakePublisher {
    state: Rc<RefCell<CloudState>>,
}

impl ImagePublisher for FakePublisher {
    fn unique_tag(&self, _source: &ImageSource) -> String {
        "abc1234-1700000000".to_string()
    }

    fn publish(&self, image: &ImageRef, _source: &ImageSource) -> Result<(), PublishError> {
        self.state.borrow_mut().published.push(image.to_string());
        Ok(())
    }
}

/// Records every requested sleep instead of sleeping
pub struct RecordingSleeper {
    slept: Rc<RefCell<Vec<Duration>>>,
    interrupt_after: Rc<RefCell<Option<usize>>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        if self.is_interrupted() {
            return Err(Interrupted);
        }
        self.slept.borrow_mut().push(duration);
        Ok(())
    }

    fn is_interrupted(&self) -> bool {
        matches!(*self.interrupt_after.borrow(), Some(limit) if self.slept.borrow().len() >= limit)
    }
}
