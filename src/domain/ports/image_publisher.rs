//! Image Publisher Port
//!
//! Builds the container image from the configured source and pushes it.

use crate::domain::entities::{ImageRef, ImageSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// No usable image builder on this machine
    BuilderUnavailable(String),
    BuildFailed(String),
    PushFailed(String),
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BuilderUnavailable(msg) => write!(f, "Image builder unavailable: {}", msg),
            Self::BuildFailed(msg) => write!(f, "Image build failed: {}", msg),
            Self::PushFailed(msg) => write!(f, "Image push failed: {}", msg),
        }
    }
}

impl std::error::Error for PublishError {}

pub trait ImagePublisher {
    /// A tag no earlier build of this service used
    fn unique_tag(&self, source: &ImageSource) -> String;

    /// Build `source` as `image` and push it to its registry
    fn publish(&self, image: &ImageRef, source: &ImageSource) -> Result<(), PublishError>;
}
