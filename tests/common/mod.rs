//! Common test utilities for spinx integration tests.
//!
//! This module provides:
//! - `Cloud`: in-memory backend, publisher and sleeper wired into a `Deployer`
//! - `TestEnv`: temp directory with config fixtures plus a CLI runner
//! - Fixtures: reusable configuration files

#![allow(dead_code)]

pub mod backend;
pub mod env;
pub mod fixtures;

pub use backend::*;
pub use env::*;
pub use fixtures::*;
