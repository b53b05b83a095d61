//! Domain Ports (Interfaces)
//!
//! These traits define the boundaries of the domain layer.
//! Infrastructure layer provides concrete implementations.

pub mod command_runner;
pub mod image_publisher;
pub mod resource_adapter;
pub mod sleeper;

pub use command_runner::{CommandError, CommandOutput, CommandRunner, Invocation};
pub use image_publisher::{ImagePublisher, PublishError};
pub use resource_adapter::{AdapterError, AdapterResult, ResourceAdapter};
pub use sleeper::{Interrupted, Sleeper};
