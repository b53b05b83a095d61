//! Presentation Layer
//!
//! This layer handles:
//! - CLI argument parsing (via clap)
//! - Wiring the deployer with infrastructure dependencies
//! - Report rendering (text/JSON)
//!
//! ## Usage
//!
//! ```ignore
//! use spinx::presentation::{create_deployer, Cli};
//!
//! let (deployer, _warnings) = create_deployer(&cli.config, cli.backend, interrupt)?;
//! let report = deployer.setup()?;
//! ```

pub mod cli;
pub mod factory;
pub mod output;

pub use cli::{Cli, Operation};
pub use factory::create_deployer;
pub use output::{create_renderer, format_error, OutputFormat, ReportRenderer};
