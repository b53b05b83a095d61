//! Property tests for the retry schedule.

use std::cell::RefCell;
use std::time::Duration;

use proptest::prelude::*;

use spinx::domain::ports::{AdapterError, Interrupted, Sleeper};
use spinx::domain::services::{retry, RetryFailure, RetryPolicy};
use spinx::domain::value_objects::{ErrorClass, TransientCause};

#[derive(Default)]
struct Recorder(RefCell<Vec<Duration>>);

impl Sleeper for Recorder {
    fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        self.0.borrow_mut().push(duration);
        Ok(())
    }
}

fn retryable_class() -> impl Strategy<Value = ErrorClass> {
    prop_oneof![
        Just(ErrorClass::Transient(TransientCause::ImageNotVisible)),
        Just(ErrorClass::Transient(TransientCause::Backend)),
        Just(ErrorClass::NotFound),
    ]
}

fn policy() -> impl Strategy<Value = RetryPolicy> {
    (1u32..=6, 1u64..=60, 0u64..=60, 1u64..=30).prop_map(|(max, base, step, flat)| RetryPolicy {
        max_attempts: max,
        propagation_base: Duration::from_secs(base),
        propagation_increment: Duration::from_secs(step),
        flat_delay: Duration::from_secs(flat),
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: Fatal failures never get a delay.
    #[test]
    fn property_fatal_is_never_retried(policy in policy(), attempt in 1u32..10) {
        prop_assert_eq!(policy.delay_after(attempt, ErrorClass::Fatal), None);
    }

    /// PROPERTY: No delay is offered once the attempt bound is reached.
    #[test]
    fn property_bound_is_respected(policy in policy(), class in retryable_class(), extra in 0u32..5) {
        prop_assert_eq!(policy.delay_after(policy.max_attempts + extra, class), None);
    }

    /// PROPERTY: Image-propagation delays never shrink; other delays are flat.
    #[test]
    fn property_propagation_delay_grows(policy in policy()) {
        let image = ErrorClass::Transient(TransientCause::ImageNotVisible);
        let delays: Vec<_> = (1..policy.max_attempts)
            .filter_map(|attempt| policy.delay_after(attempt, image))
            .collect();
        prop_assert_eq!(delays.len() as u32, policy.max_attempts - 1);
        prop_assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        if let Some(first) = delays.first() {
            prop_assert_eq!(*first, policy.propagation_base);
        }

        let backend = ErrorClass::Transient(TransientCause::Backend);
        for attempt in 1..policy.max_attempts {
            prop_assert_eq!(policy.delay_after(attempt, backend), Some(policy.flat_delay));
        }
    }

    /// PROPERTY: An always-failing retryable operation runs exactly
    /// `max_attempts` times, sleeps between tries only, and reports the last cause.
    #[test]
    fn property_persistent_failure_exhausts(policy in policy(), class in retryable_class()) {
        let sleeper = Recorder::default();
        let outcome = retry(&policy, &sleeper, "update service", |attempt: u32| -> Result<(), AdapterError> {
            Err(AdapterError::new(class, format!("failure #{attempt}")))
        });

        prop_assert_eq!(outcome.attempts.len() as u32, policy.max_attempts);
        prop_assert_eq!(sleeper.0.borrow().len() as u32, policy.max_attempts - 1);
        match outcome.result {
            Err(RetryFailure::Exhausted { attempts, last }) => {
                prop_assert_eq!(attempts, policy.max_attempts);
                prop_assert_eq!(last.message, format!("failure #{}", policy.max_attempts));
            }
            other => prop_assert!(false, "unexpected result: {:?}", other),
        }
    }

    /// PROPERTY: Success on attempt `k` means exactly `k` attempts and `k - 1` sleeps.
    #[test]
    fn property_success_stops_retrying(policy in policy(), succeed_at in 1u32..=6) {
        prop_assume!(succeed_at <= policy.max_attempts);
        let sleeper = Recorder::default();
        let outcome = retry(&policy, &sleeper, "update service", |attempt: u32| {
            if attempt < succeed_at {
                Err(AdapterError::image_not_visible("manifest unknown"))
            } else {
                Ok(attempt)
            }
        });

        prop_assert_eq!(outcome.result.ok(), Some(succeed_at));
        prop_assert_eq!(outcome.attempts.len() as u32, succeed_at);
        prop_assert_eq!(sleeper.0.borrow().len() as u32, succeed_at - 1);
    }
}
