//! Provisioning plan: the declared dependency order of setup steps

use crate::domain::value_objects::ResourceKind;

/// One setup step: the kind to ensure and the kinds it needs first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningStep {
    pub kind: ResourceKind,
    pub depends_on: Vec<ResourceKind>,
}

impl ProvisioningStep {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            depends_on: Vec::new(),
        }
    }

    pub fn after(mut self, dependency: ResourceKind) -> Self {
        self.depends_on.push(dependency);
        self
    }
}

/// Why a plan was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    DuplicateKind(ResourceKind),
    /// `step` depends on `dependency`, which is not an earlier step
    UnorderedDependency {
        step: ResourceKind,
        dependency: ResourceKind,
    },
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateKind(kind) => write!(f, "{} appears more than once", kind),
            Self::UnorderedDependency { step, dependency } => write!(
                f,
                "{} depends on {}, which is not provisioned before it",
                step, dependency
            ),
        }
    }
}

impl std::error::Error for PlanError {}

/// Ordered, validated list of provisioning steps.
///
/// Every dependency appears earlier in the list and no kind repeats, so
/// executing the steps in order (and tearing down in reverse) is always
/// dependency-safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningPlan {
    steps: Vec<ProvisioningStep>,
}

impl ProvisioningPlan {
    pub fn new(steps: Vec<ProvisioningStep>) -> Result<Self, PlanError> {
        let mut seen: Vec<ResourceKind> = Vec::with_capacity(steps.len());
        for step in &steps {
            if seen.contains(&step.kind) {
                return Err(PlanError::DuplicateKind(step.kind));
            }
            if let Some(missing) = step.depends_on.iter().find(|dep| !seen.contains(dep)) {
                return Err(PlanError::UnorderedDependency {
                    step: step.kind,
                    dependency: *missing,
                });
            }
            seen.push(step.kind);
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[ProvisioningStep] {
        &self.steps
    }

    /// Kinds in setup order
    pub fn kinds(&self) -> Vec<ResourceKind> {
        self.steps.iter().map(|s| s.kind).collect()
    }

    /// Kinds in teardown order
    pub fn reversed_kinds(&self) -> Vec<ResourceKind> {
        self.steps.iter().rev().map(|s| s.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
