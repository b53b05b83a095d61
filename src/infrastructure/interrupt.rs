//! Cooperative cancellation
//!
//! Ctrl+C flips a shared flag; the sleeper checks it in small slices so
//! that long waits (retry backoff, readiness polling) end promptly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::ports::{Interrupted, Sleeper};

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag that is set when the user presses Ctrl+C
    pub fn install_ctrlc() -> Self {
        let interrupt = Self::new();
        let flag = interrupt.flag.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .expect("Error setting Ctrl+C handler");
        interrupt
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Blocking sleeper that wakes early when interrupted
#[derive(Debug, Clone)]
pub struct InterruptibleSleeper {
    interrupt: Interrupt,
    slice: Duration,
}

impl InterruptibleSleeper {
    pub fn new(interrupt: Interrupt) -> Self {
        Self {
            interrupt,
            slice: Duration::from_millis(250),
        }
    }
}

impl Sleeper for InterruptibleSleeper {
    fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let mut remaining = duration;
        while !remaining.is_zero() {
            if self.interrupt.is_set() {
                return Err(Interrupted);
            }
            let step = remaining.min(self.slice);
            std::thread::sleep(step);
            remaining -= step;
        }
        if self.interrupt.is_set() {
            return Err(Interrupted);
        }
        Ok(())
    }

    fn is_interrupted(&self) -> bool {
        self.interrupt.is_set()
    }
}
