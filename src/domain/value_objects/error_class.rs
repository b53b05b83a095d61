//! Error classification attached to every backend failure.
//!
//! Adapters translate provider failures into one of these classes; the
//! reconciliation core only ever branches on the class, never on messages.

use serde::Serialize;

/// Why a transient failure is expected to clear on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransientCause {
    /// The referenced image is not yet pullable by the backend (registry propagation)
    ImageNotVisible,
    /// Throttling, eventual consistency, or an unclassified backend failure
    Backend,
}

/// Classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorClass {
    /// The resource does not exist; drives the create path
    NotFound,
    /// Safe to retry
    Transient(TransientCause),
    /// Configuration, authentication, quota, or retry exhaustion
    Fatal,
    /// A teardown step failed; reported, never aborts destroy
    PartialTeardownFailure,
}

impl ErrorClass {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ErrorClass::NotFound)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorClass::Fatal)
    }

    /// Whether the retry engine may attempt the operation again
    pub fn is_retryable(&self) -> bool {
        !self.is_fatal()
    }

    /// Short label for logs and reports
    pub fn label(&self) -> &'static str {
        match self {
            ErrorClass::NotFound => "not-found",
            ErrorClass::Transient(TransientCause::ImageNotVisible) => "image-not-visible",
            ErrorClass::Transient(TransientCause::Backend) => "transient",
            ErrorClass::Fatal => "fatal",
            ErrorClass::PartialTeardownFailure => "partial-teardown-failure",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
