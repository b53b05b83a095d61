//! Rollout entities: image references, controller states and attempts

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_objects::ErrorClass;

/// A fully qualified container image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    /// Registry host and repository path, without tag
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Registry host (everything before the first `/`)
    pub fn registry_host(&self) -> &str {
        self.repository
            .split_once('/')
            .map(|(host, _)| host)
            .unwrap_or(&self.repository)
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// States of the deploy-time state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RolloutState {
    ValidatingPreconditions,
    Publishing,
    Registering,
    UpdatingService,
    AwaitingStability,
    Done,
    Failed,
}

impl RolloutState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RolloutState::ValidatingPreconditions => "validating-preconditions",
            RolloutState::Publishing => "publishing",
            RolloutState::Registering => "registering",
            RolloutState::UpdatingService => "updating-service",
            RolloutState::AwaitingStability => "awaiting-stability",
            RolloutState::Done => "done",
            RolloutState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RolloutState::Done | RolloutState::Failed)
    }
}

impl std::fmt::Display for RolloutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one attempt ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "kebab-case")]
pub enum AttemptOutcome {
    Succeeded,
    Failed { class: ErrorClass, message: String },
}

/// One try of a retried operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolloutAttempt {
    /// 1-based attempt number
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub outcome: AttemptOutcome,
}

impl RolloutAttempt {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_ref_display_joins_tag() {
        let image = ImageRef::new("123.dkr.ecr.us-east-1.amazonaws.com/shop", "abc123-1700000000");
        assert_eq!(
            image.to_string(),
            "123.dkr.ecr.us-east-1.amazonaws.com/shop:abc123-1700000000"
        );
        assert_eq!(image.registry_host(), "123.dkr.ecr.us-east-1.amazonaws.com");
    }

    #[test]
    fn terminal_states() {
        assert!(RolloutState::Done.is_terminal());
        assert!(RolloutState::Failed.is_terminal());
        assert!(!RolloutState::AwaitingStability.is_terminal());
    }
}
