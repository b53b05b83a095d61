//! Infrastructure Layer
//!
//! Concrete implementations of domain ports.
//! This layer handles all I/O operations.
//!
//! ## Structure
//!
//! - `process/` - Running external tools (system and scripted runners)
//! - `backends/` - Resource adapters for AWS Fargate, Cloud Run and Container Apps
//! - `publish/` - Docker image build, tag and push
//! - `interrupt` - Ctrl+C flag and interruptible sleeper

pub mod backends;
pub mod interrupt;
pub mod process;
pub mod publish;

// Re-export for convenience
pub use backends::{build_adapter, build_adapter_with};
pub use interrupt::{Interrupt, InterruptibleSleeper};
pub use process::SystemCommandRunner;
pub use publish::DockerPublisher;
