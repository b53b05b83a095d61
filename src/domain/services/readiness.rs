//! Readiness waiter
//!
//! Polls a backend predicate with a soft deadline. Timing out is not an
//! error: callers log it and carry on.

use std::time::Duration;

use crate::domain::ports::{AdapterResult, Interrupted, Sleeper};

/// How often and for how long to poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub window: Duration,
    /// Hard cap on polls, independent of the window
    pub max_polls: Option<u32>,
}

impl WaitPolicy {
    /// Waiting for a rolled-out service to settle
    pub fn service_stable() -> Self {
        Self {
            interval: Duration::from_secs(15),
            window: Duration::from_secs(600),
            max_polls: None,
        }
    }

    /// Waiting for tasks to stop before deleting their cluster
    pub fn tasks_drained() -> Self {
        Self {
            interval: Duration::from_secs(10),
            window: Duration::from_secs(300),
            max_polls: Some(30),
        }
    }

    /// Polls that fit the window (at least one), capped by `max_polls`
    pub fn poll_budget(&self) -> u32 {
        let interval = self.interval.as_millis().max(1);
        let by_window = self.window.as_millis().div_ceil(interval).max(1);
        let by_window = u32::try_from(by_window).unwrap_or(u32::MAX);
        match self.max_polls {
            Some(cap) => by_window.min(cap.max(1)),
            None => by_window,
        }
    }
}

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready { polls: u32 },
    TimedOut { polls: u32 },
}

impl WaitOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, WaitOutcome::Ready { .. })
    }

    pub fn polls(&self) -> u32 {
        match self {
            WaitOutcome::Ready { polls } | WaitOutcome::TimedOut { polls } => *polls,
        }
    }
}

/// Poll `predicate` until it holds or the budget runs out.
///
/// The predicate is checked first, then the waiter sleeps one interval
/// between checks. Predicate errors count as "not yet".
pub fn wait_until<F>(
    policy: &WaitPolicy,
    sleeper: &dyn Sleeper,
    label: &str,
    mut predicate: F,
) -> Result<WaitOutcome, Interrupted>
where
    F: FnMut() -> AdapterResult<bool>,
{
    let budget = policy.poll_budget();

    for poll in 1..=budget {
        match predicate() {
            Ok(true) => {
                tracing::info!(wait = label, polls = poll, "ready");
                return Ok(WaitOutcome::Ready { polls: poll });
            }
            Ok(false) => tracing::debug!(wait = label, poll, "not ready yet"),
            Err(err) => tracing::debug!(wait = label, poll, error = %err, "poll failed, treating as not ready"),
        }

        if poll < budget {
            sleeper.sleep(policy.interval)?;
        }
    }

    tracing::warn!(
        wait = label,
        polls = budget,
        window_secs = policy.window.as_secs(),
        "timed out waiting; continuing anyway"
    );
    Ok(WaitOutcome::TimedOut { polls: budget })
}
