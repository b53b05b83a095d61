//! Error types for spinx
//!
//! Uses `thiserror` for library errors; the binary wraps them in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::entities::{PlanError, RolloutState};
use crate::domain::ports::{AdapterError, PublishError};
use crate::domain::value_objects::{Backend, ErrorClass, ResourceKind};

/// Result type alias for spinx operations
pub type SpinxResult<T> = Result<T, SpinxError>;

/// Main error type for spinx operations
#[derive(Error, Debug)]
pub enum SpinxError {
    /// Configuration file does not exist
    #[error("configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parsed but failed validation
    #[error("invalid configuration in {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required command-line tool is not on PATH
    #[error("'{tool}' is not installed or not on PATH ({hint})")]
    ToolMissing { tool: String, hint: String },

    /// The backend CLI is not authenticated
    #[error("{backend} credentials could not be verified: {source}")]
    Credentials {
        backend: Backend,
        #[source]
        source: AdapterError,
    },

    /// A provisioning step failed; setup stops here
    #[error("setup failed at {kind} '{name}': {source}")]
    StepFailed {
        kind: ResourceKind,
        name: String,
        #[source]
        source: AdapterError,
    },

    /// A backend declared an inconsistent provisioning plan
    #[error("invalid provisioning plan: {0}")]
    InvalidPlan(#[from] PlanError),

    /// Deploy found a provisioned resource missing
    #[error("{kind} '{name}' does not exist; run setup first: {hint}")]
    MissingPrecondition {
        kind: ResourceKind,
        name: String,
        hint: String,
    },

    /// A rollout stage failed
    #[error("deploy failed while {state}: {source}")]
    Rollout {
        state: RolloutState,
        #[source]
        source: Box<SpinxError>,
    },

    /// Unretried backend failure
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    /// The retry bound was reached
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: AdapterError,
    },

    /// Cancelled by the user (Ctrl+C)
    #[error("interrupted")]
    Interrupted,
}

impl SpinxError {
    /// Classification used for reporting and exit codes
    pub fn class(&self) -> ErrorClass {
        match self {
            SpinxError::Adapter(err) => err.class,
            SpinxError::StepFailed { source, .. } => source.class,
            SpinxError::RetriesExhausted { last, .. } => last.class,
            SpinxError::Rollout { source, .. } => source.class(),
            _ => ErrorClass::Fatal,
        }
    }

    /// Whether the error (or the stage error it wraps) is a cancellation
    pub fn is_interrupted(&self) -> bool {
        match self {
            SpinxError::Interrupted => true,
            SpinxError::Rollout { source, .. } => source.is_interrupted(),
            _ => false,
        }
    }

    /// Rollout state the failure happened in, if any
    pub fn rollout_state(&self) -> Option<RolloutState> {
        match self {
            SpinxError::Rollout { state, .. } => Some(*state),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::TransientCause;

    #[test]
    fn test_error_display_missing_precondition() {
        let err = SpinxError::MissingPrecondition {
            kind: ResourceKind::ComputeCluster,
            name: "shop-cluster".to_string(),
            hint: Backend::AwsFargate.setup_hint(),
        };
        assert_eq!(
            err.to_string(),
            "compute cluster 'shop-cluster' does not exist; run setup first: spinx aws-fargate setup <config>"
        );
    }

    #[test]
    fn test_error_display_step_failed() {
        let err = SpinxError::StepFailed {
            kind: ResourceKind::LoadBalancer,
            name: "shop-alb".to_string(),
            source: AdapterError::fatal("AccessDenied"),
        };
        assert_eq!(
            err.to_string(),
            "setup failed at load balancer 'shop-alb': AccessDenied [fatal]"
        );
    }

    #[test]
    fn test_rollout_wrapping_keeps_interrupt() {
        let err = SpinxError::Rollout {
            state: RolloutState::UpdatingService,
            source: Box::new(SpinxError::Interrupted),
        };
        assert!(err.is_interrupted());
        assert_eq!(err.rollout_state(), Some(RolloutState::UpdatingService));
        assert_eq!(err.class(), ErrorClass::Fatal);
    }

    #[test]
    fn test_exhausted_retries_keep_last_cause_class() {
        let err = SpinxError::RetriesExhausted {
            attempts: 3,
            last: AdapterError::image_not_visible("manifest unknown"),
        };
        assert_eq!(err.class(), ErrorClass::Transient(TransientCause::ImageNotVisible));
        assert_eq!(err.to_string(), "gave up after 3 attempts: manifest unknown [image-not-visible]");
    }
}
