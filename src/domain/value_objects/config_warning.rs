//! Configuration warning value object.

use std::path::PathBuf;

/// What a [`ConfigWarning`] is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A key the deployment YAML does not define
    UnknownKey,
    /// A value that could not be used and was ignored
    InvalidValue,
    /// The `environmentFile` could not be read
    UnreadableEnvFile,
}

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub kind: WarningKind,
    /// The config key (or environment variable) the warning is about
    pub key: String,
    /// The file where the warning occurred
    pub file: PathBuf,
    /// The line number (1-indexed) if available
    pub line: Option<usize>,
    /// Closest known key, for likely typos
    pub suggestion: Option<String>,
    /// What went wrong, for everything but unknown keys
    pub detail: Option<String>,
}

impl ConfigWarning {
    pub fn unknown_key(key: impl Into<String>, file: impl Into<PathBuf>, line: Option<usize>) -> Self {
        Self {
            kind: WarningKind::UnknownKey,
            key: key.into(),
            file: file.into(),
            line,
            suggestion: None,
            detail: None,
        }
    }

    /// A value that was ignored, e.g. a non-numeric `SPINX_DESIRED_COUNT`
    pub fn invalid_value(
        key: impl Into<String>,
        file: impl Into<PathBuf>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind: WarningKind::InvalidValue,
            key: key.into(),
            file: file.into(),
            line: None,
            suggestion: None,
            detail: Some(detail.into()),
        }
    }

    pub fn env_file_unreadable(file: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::UnreadableEnvFile,
            key: "environmentFile".to_string(),
            file: file.into(),
            line: None,
            suggestion: None,
            detail: Some(detail.into()),
        }
    }

    pub fn with_suggestion(mut self, suggestion: Option<String>) -> Self {
        self.suggestion = suggestion;
        self
    }
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(detail) = &self.detail {
            return write!(f, "{}: {} ({})", self.file.display(), detail, self.key);
        }
        match self.line {
            Some(line) => write!(
                f,
                "{}:{}: unknown key '{}' ignored",
                self.file.display(),
                line,
                self.key
            )?,
            None => write!(
                f,
                "{}: unknown key '{}' ignored",
                self.file.display(),
                self.key
            )?,
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean '{}'?)", suggestion)?;
        }
        Ok(())
    }
}
