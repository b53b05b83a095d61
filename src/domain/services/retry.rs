//! Retry/backoff engine
//!
//! Wraps a fallible backend operation with a bounded schedule whose delay
//! depends on the failure's class: image propagation gets a growing wait,
//! everything else non-fatal a flat one, fatal errors are never retried.

use std::time::Duration;

use chrono::Utc;

use crate::domain::entities::{AttemptOutcome, RolloutAttempt};
use crate::domain::ports::{AdapterError, Sleeper};
use crate::domain::value_objects::{ErrorClass, TransientCause};

/// Policy for retrying a classified operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first
    pub max_attempts: u32,
    /// Wait after the first image-propagation failure
    pub propagation_base: Duration,
    /// Added for every further image-propagation failure
    pub propagation_increment: Duration,
    /// Wait after any other non-fatal failure
    pub flat_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            propagation_base: Duration::from_secs(30),
            propagation_increment: Duration::from_secs(30),
            flat_delay: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next try after the `attempt`-th failure (1-indexed).
    ///
    /// Returns `None` when the failure must not be retried, either because
    /// it is fatal or because the bound is reached.
    pub fn delay_after(&self, attempt: u32, class: ErrorClass) -> Option<Duration> {
        if attempt >= self.max_attempts || !class.is_retryable() {
            return None;
        }
        match class {
            ErrorClass::Transient(TransientCause::ImageNotVisible) => {
                Some(self.propagation_base + self.propagation_increment * attempt.saturating_sub(1))
            }
            _ => Some(self.flat_delay),
        }
    }
}

/// Why a retried operation gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryFailure {
    /// Not retried
    Fatal { attempt: u32, error: AdapterError },
    /// Every allowed attempt failed
    Exhausted { attempts: u32, last: AdapterError },
    /// Cancelled while waiting between attempts
    Interrupted { attempt: u32 },
}

/// Outcome of a retried operation, with every attempt recorded
#[derive(Debug)]
pub struct Retried<T> {
    pub result: Result<T, RetryFailure>,
    pub attempts: Vec<RolloutAttempt>,
}

/// Run `operation` under `policy`, sleeping through `sleeper` between tries
pub fn retry<T, F>(policy: &RetryPolicy, sleeper: &dyn Sleeper, label: &str, mut operation: F) -> Retried<T>
where
    F: FnMut(u32) -> Result<T, AdapterError>,
{
    let mut attempts = Vec::new();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let started_at = Utc::now();
        tracing::debug!(operation = label, attempt, "attempt started");

        match operation(attempt) {
            Ok(value) => {
                attempts.push(RolloutAttempt {
                    attempt,
                    started_at,
                    outcome: AttemptOutcome::Succeeded,
                });
                return Retried {
                    result: Ok(value),
                    attempts,
                };
            }
            Err(error) => {
                attempts.push(RolloutAttempt {
                    attempt,
                    started_at,
                    outcome: AttemptOutcome::Failed {
                        class: error.class,
                        message: error.message.clone(),
                    },
                });

                if error.class.is_fatal() {
                    tracing::warn!(operation = label, attempt, error = %error, "fatal failure, not retrying");
                    return Retried {
                        result: Err(RetryFailure::Fatal { attempt, error }),
                        attempts,
                    };
                }

                let Some(delay) = policy.delay_after(attempt, error.class) else {
                    tracing::warn!(operation = label, attempts = attempt, error = %error, "retries exhausted");
                    return Retried {
                        result: Err(RetryFailure::Exhausted {
                            attempts: attempt,
                            last: error,
                        }),
                        attempts,
                    };
                };

                tracing::info!(
                    operation = label,
                    attempt,
                    class = %error.class,
                    delay_secs = delay.as_secs(),
                    "attempt failed, retrying"
                );
                if sleeper.sleep(delay).is_err() {
                    return Retried {
                        result: Err(RetryFailure::Interrupted { attempt }),
                        attempts,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::Interrupted;
    use proptest::prelude::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSleeper {
        slept: RefCell<Vec<Duration>>,
        interrupt_on: Option<usize>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
            let mut slept = self.slept.borrow_mut();
            slept.push(duration);
            if self.interrupt_on == Some(slept.len()) {
                return Err(Interrupted);
            }
            Ok(())
        }
    }

    #[test]
    fn image_propagation_converges_on_third_attempt() {
        let sleeper = RecordingSleeper::default();
        let retried = retry(&RetryPolicy::default(), &sleeper, "update service", |attempt| {
            if attempt < 3 {
                Err(AdapterError::image_not_visible("CannotPullContainerError: image not found"))
            } else {
                Ok("svc")
            }
        });

        assert_eq!(retried.result, Ok("svc"));
        assert_eq!(retried.attempts.len(), 3);
        assert!(retried.attempts[2].succeeded());
        assert_eq!(
            *sleeper.slept.borrow(),
            vec![Duration::from_secs(30), Duration::from_secs(60)]
        );
    }

    #[test]
    fn always_transient_exhausts_with_last_cause() {
        let sleeper = RecordingSleeper::default();
        let retried: Retried<()> = retry(&RetryPolicy::default(), &sleeper, "op", |attempt| {
            Err(AdapterError::transient(format!("throttled #{attempt}")))
        });

        assert_eq!(
            retried.result,
            Err(RetryFailure::Exhausted {
                attempts: 3,
                last: AdapterError::transient("throttled #3"),
            })
        );
        assert_eq!(retried.attempts.len(), 3);
        assert_eq!(
            *sleeper.slept.borrow(),
            vec![Duration::from_secs(15), Duration::from_secs(15)]
        );
    }

    #[test]
    fn fatal_is_not_retried() {
        let sleeper = RecordingSleeper::default();
        let retried: Retried<()> = retry(&RetryPolicy::default(), &sleeper, "op", |_| {
            Err(AdapterError::fatal("AccessDenied"))
        });

        assert!(matches!(retried.result, Err(RetryFailure::Fatal { attempt: 1, .. })));
        assert!(sleeper.slept.borrow().is_empty());
    }

    #[test]
    fn interruption_during_wait_stops_retrying() {
        let sleeper = RecordingSleeper {
            interrupt_on: Some(1),
            ..Default::default()
        };
        let mut calls = 0;
        let retried: Retried<()> = retry(&RetryPolicy::default(), &sleeper, "op", |_| {
            calls += 1;
            Err(AdapterError::transient("busy"))
        });

        assert_eq!(retried.result, Err(RetryFailure::Interrupted { attempt: 1 }));
        assert_eq!(calls, 1);
        assert_eq!(retried.attempts.len(), 1);
    }

    proptest! {
        #[test]
        fn never_exceeds_bound(max_attempts in 1u32..8, image in any::<bool>()) {
            let policy = RetryPolicy { max_attempts, ..RetryPolicy::default() };
            let sleeper = RecordingSleeper::default();
            let retried: Retried<()> = retry(&policy, &sleeper, "op", |_| {
                if image {
                    Err(AdapterError::image_not_visible("image not found"))
                } else {
                    Err(AdapterError::transient("busy"))
                }
            });
            prop_assert_eq!(retried.attempts.len() as u32, max_attempts);
            prop_assert_eq!(sleeper.slept.borrow().len() as u32, max_attempts - 1);
        }

        #[test]
        fn propagation_delays_grow_linearly(attempt in 1u32..3) {
            let policy = RetryPolicy::default();
            let delay = policy
                .delay_after(attempt, ErrorClass::Transient(TransientCause::ImageNotVisible))
                .unwrap();
            prop_assert_eq!(delay, Duration::from_secs(30 * u64::from(attempt)));
        }
    }
}
