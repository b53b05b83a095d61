//! Domain Services
//!
//! The reconciliation core: retry engine, readiness waiter, provisioning
//! sequencer and rollout controller. They reach the outside world only
//! through the ports, so every schedule runs deterministically under a
//! recording sleeper.

pub mod readiness;
pub mod retry;
pub mod rollout;
pub mod sequencer;

pub use readiness::{wait_until, WaitOutcome, WaitPolicy};
pub use retry::{retry, Retried, RetryFailure, RetryPolicy};
pub use rollout::{RolloutController, RolloutOutcome, RolloutPolicy};
pub use sequencer::{
    provision, teardown, teardown_plan, AbsentResource, ProvisionOutcome, TeardownFailure,
    TeardownOutcome,
};
