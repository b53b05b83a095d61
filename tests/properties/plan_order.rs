//! Property tests for provisioning plan ordering.

use proptest::prelude::*;

use spinx::domain::entities::{PlanError, ProvisioningPlan, ProvisioningStep};
use spinx::ResourceKind;

const KINDS: [ResourceKind; 8] = [
    ResourceKind::ServiceApis,
    ResourceKind::ResourceGroup,
    ResourceKind::Registry,
    ResourceKind::Network,
    ResourceKind::Identity,
    ResourceKind::ComputeCluster,
    ResourceKind::LoadBalancer,
    ResourceKind::LogSink,
];

/// Distinct kinds in random order, each with a random subset of earlier
/// kinds as dependencies
fn ordered_steps() -> impl Strategy<Value = Vec<ProvisioningStep>> {
    proptest::sample::subsequence(KINDS.to_vec(), 0..=KINDS.len())
        .prop_shuffle()
        .prop_flat_map(|kinds| {
            let n = kinds.len();
            (
                Just(kinds),
                proptest::collection::vec(proptest::collection::vec(any::<bool>(), n), n),
            )
        })
        .prop_map(|(kinds, masks)| {
            kinds
                .iter()
                .enumerate()
                .map(|(i, kind)| {
                    (0..i)
                        .filter(|j| masks[i][*j])
                        .fold(ProvisioningStep::new(*kind), |step, j| step.after(kinds[j]))
                })
                .collect()
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: A plan whose dependencies all point backwards is accepted as declared.
    #[test]
    fn property_backward_dependencies_are_accepted(steps in ordered_steps()) {
        let expected: Vec<_> = steps.iter().map(|s| s.kind).collect();
        let plan = ProvisioningPlan::new(steps).unwrap();
        prop_assert_eq!(plan.kinds(), expected);
    }

    /// PROPERTY: Teardown order is exactly the reverse of setup order, so
    /// every resource is removed before anything it depends on.
    #[test]
    fn property_teardown_removes_dependents_first(steps in ordered_steps()) {
        let plan = ProvisioningPlan::new(steps).unwrap();
        let mut reversed = plan.kinds();
        reversed.reverse();
        prop_assert_eq!(plan.reversed_kinds(), reversed.clone());

        for step in plan.steps() {
            let own = reversed.iter().position(|k| *k == step.kind).unwrap();
            for dep in &step.depends_on {
                let dep_pos = reversed.iter().position(|k| k == dep).unwrap();
                prop_assert!(own < dep_pos, "{} removed after its dependency {}", step.kind, dep);
            }
        }
    }

    /// PROPERTY: Moving a step in front of one of its dependencies is rejected.
    #[test]
    fn property_forward_dependency_is_rejected(steps in ordered_steps()) {
        let Some(position) = steps.iter().position(|s| !s.depends_on.is_empty()) else {
            return Ok(());
        };
        let mut reordered = steps.clone();
        let step = reordered.remove(position);
        let kind = step.kind;
        reordered.insert(0, step);

        let err = ProvisioningPlan::new(reordered).unwrap_err();
        let is_unordered = matches!(err, PlanError::UnorderedDependency { step, .. } if step == kind);
        prop_assert!(is_unordered);
    }

    /// PROPERTY: Repeating a kind is rejected.
    #[test]
    fn property_duplicate_kind_is_rejected(steps in ordered_steps(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!steps.is_empty());
        let kind = steps[pick.index(steps.len())].kind;
        let mut duplicated = steps.clone();
        duplicated.push(ProvisioningStep::new(kind));

        prop_assert_eq!(ProvisioningPlan::new(duplicated), Err(PlanError::DuplicateKind(kind)));
    }
}
