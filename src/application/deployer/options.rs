//! Deployer Options
//!
//! Timing policies for one run. The defaults are the production schedule;
//! tests shrink them or swap the sleeper.

use crate::domain::services::{RolloutPolicy, WaitPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployerOptions {
    /// Retry schedule, stability window and image probe delay for `deploy`
    pub rollout: RolloutPolicy,
    /// How long `destroy` waits for a cluster's tasks to stop
    pub drain: WaitPolicy,
}

impl Default for DeployerOptions {
    fn default() -> Self {
        Self {
            rollout: RolloutPolicy::default(),
            drain: WaitPolicy::tasks_drained(),
        }
    }
}

impl DeployerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rollout(mut self, rollout: RolloutPolicy) -> Self {
        self.rollout = rollout;
        self
    }

    pub fn with_drain(mut self, drain: WaitPolicy) -> Self {
        self.drain = drain;
        self
    }
}
