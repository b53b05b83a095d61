//! Property tests for the readiness waiter.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use proptest::prelude::*;

use spinx::domain::ports::{AdapterError, Interrupted, Sleeper};
use spinx::domain::services::{wait_until, WaitOutcome, WaitPolicy};

#[derive(Default)]
struct Recorder(RefCell<Vec<Duration>>);

impl Sleeper for Recorder {
    fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        self.0.borrow_mut().push(duration);
        Ok(())
    }
}

fn wait_policy() -> impl Strategy<Value = WaitPolicy> {
    (1u64..=30, 0u64..=600, proptest::option::of(0u32..=40)).prop_map(|(interval, window, cap)| {
        WaitPolicy {
            interval: Duration::from_secs(interval),
            window: Duration::from_secs(window),
            max_polls: cap,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: The budget is at least one poll and never exceeds the cap.
    #[test]
    fn property_budget_is_bounded(policy in wait_policy()) {
        let budget = policy.poll_budget();
        prop_assert!(budget >= 1);
        if let Some(cap) = policy.max_polls {
            prop_assert!(budget <= cap.max(1));
        }
    }

    /// PROPERTY: A predicate that never holds ends in a soft timeout after
    /// exactly one sleep between each pair of polls.
    #[test]
    fn property_never_ready_times_out(policy in wait_policy(), failing in any::<bool>()) {
        let sleeper = Recorder::default();
        let polls = Cell::new(0u32);
        let outcome = wait_until(&policy, &sleeper, "service stable", || {
            polls.set(polls.get() + 1);
            if failing {
                Err(AdapterError::transient("describe throttled"))
            } else {
                Ok(false)
            }
        })
        .unwrap();

        let budget = policy.poll_budget();
        prop_assert_eq!(outcome, WaitOutcome::TimedOut { polls: budget });
        prop_assert_eq!(polls.get(), budget);
        prop_assert_eq!(sleeper.0.borrow().clone(), vec![policy.interval; (budget - 1) as usize]);
    }

    /// PROPERTY: Readiness on poll `k` stops the wait there.
    #[test]
    fn property_ready_stops_polling(policy in wait_policy(), ready_at in 1u32..=20) {
        prop_assume!(ready_at <= policy.poll_budget());
        let sleeper = Recorder::default();
        let polls = Cell::new(0u32);
        let outcome = wait_until(&policy, &sleeper, "service stable", || {
            polls.set(polls.get() + 1);
            Ok(polls.get() >= ready_at)
        })
        .unwrap();

        prop_assert_eq!(outcome, WaitOutcome::Ready { polls: ready_at });
        prop_assert_eq!(sleeper.0.borrow().len() as u32, ready_at - 1);
    }
}
