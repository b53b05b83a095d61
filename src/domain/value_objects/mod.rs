//! Domain Value Objects
//!
//! Immutable value types that represent domain concepts.

mod backend;
mod config_warning;
mod error_class;
mod resource_kind;

pub use backend::Backend;
pub use config_warning::{ConfigWarning, WarningKind};
pub use error_class::{ErrorClass, TransientCause};
pub use resource_kind::ResourceKind;
