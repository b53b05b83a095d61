//! Deployer Module
//!
//! One façade per run: `setup`, `deploy`, `destroy` and `logs` against the
//! configured backend.
//!
//! ## Structure
//!
//! - `options` - Retry, stability and drain policies (`DeployerOptions`)
//! - `result` - Reports (`SetupReport`, `DeployReport`, `TeardownReport`)
//! - `use_case` - The `Deployer` itself
//!
//! ## Usage
//!
//! ```ignore
//! use spinx::application::Deployer;
//!
//! let deployer = Deployer::new(spec, adapter, publisher, sleeper);
//! let report = deployer.setup()?;
//! ```

mod options;
mod result;
mod use_case;

pub use options::DeployerOptions;
pub use result::{
    DeployReport, McpClientConfig, SetupReport, SetupStep, StabilityReport, TeardownReport,
};
pub use use_case::Deployer;
