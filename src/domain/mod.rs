//! Domain Layer
//!
//! The reconciliation and rollout engine, without I/O.
//!
//! ## Structure
//!
//! - `entities/` - Deployment spec, descriptors, provisioning plan, rollout attempts
//! - `value_objects/` - Backend, resource kinds, error classes
//! - `services/` - Retry engine, readiness waiter, sequencer, rollout controller
//! - `ports/` - Interface definitions for infrastructure
//!
//! ## Design Principles
//!
//! 1. **No I/O** - Backends, processes and clocks are reached through ports
//! 2. **Live state** - Nothing is persisted locally; every run looks the backend up
//! 3. **Typed failures** - The core branches on `ErrorClass`, never on messages

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;
