//! Configuration module for spinx
//!
//! Configuration hierarchy:
//! 1. Environment variables (SPINX_REGION, SPINX_DESIRED_COUNT)
//! 2. The deployment YAML file named on the command line
//! 3. `.env` file referenced by `environmentFile` (environment only)
//! 4. Backend defaults and names derived from `serviceName`

mod env_file;
mod loader;
#[cfg(test)]
mod tests;
mod types;

pub use crate::domain::value_objects::{ConfigWarning, WarningKind};

pub use env_file::{display_value, is_sensitive, mask_secret, merge_environment, parse_env_file};
pub use loader::{load_with_warnings, resolve_path, validate, with_env_overrides};
pub use types::{DeployConfig, Scalar};
