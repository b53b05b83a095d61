//! Sleeper Port
//!
//! Blocking waits go through this trait so that cancellation can cut them
//! short and tests can record delays instead of sleeping.

use std::time::Duration;

/// A wait was cut short by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

impl std::fmt::Display for Interrupted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("interrupted")
    }
}

impl std::error::Error for Interrupted {}

pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> Result<(), Interrupted>;

    /// Whether cancellation was requested, without waiting
    fn is_interrupted(&self) -> bool {
        false
    }
}
