//! Provider CLI invocation and error classification
//!
//! Every backend talks to its cloud through the provider's command-line
//! tool with JSON output. Failures are classified here, once, from each
//! backend's signature table; the reconciliation core only sees the class.

use serde_json::Value;

use crate::domain::ports::{AdapterError, AdapterResult, CommandError, CommandRunner, Invocation};
use crate::domain::value_objects::{ErrorClass, TransientCause};

/// A failure signature: every needle must occur (case-insensitively)
pub struct Signature {
    pub needles: &'static [&'static str],
    pub class: ErrorClass,
}

pub const fn sig(needles: &'static [&'static str], class: ErrorClass) -> Signature {
    Signature { needles, class }
}

pub const IMAGE_NOT_VISIBLE: ErrorClass = ErrorClass::Transient(TransientCause::ImageNotVisible);
pub const TRANSIENT: ErrorClass = ErrorClass::Transient(TransientCause::Backend);

/// Classify `message` against `table`; the first matching signature wins.
///
/// Messages matching nothing are treated as transient so that the retry
/// bound, not a guess, decides when to give up.
pub fn classify(table: &[Signature], message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    table
        .iter()
        .find(|s| s.needles.iter().all(|n| lower.contains(n)))
        .map(|s| s.class)
        .unwrap_or(TRANSIENT)
}

/// Runs one provider tool and classifies its failures
pub struct ProviderCli<R: CommandRunner> {
    runner: R,
    signatures: &'static [Signature],
    owned_names: Vec<String>,
}

impl<R: CommandRunner> ProviderCli<R> {
    pub fn new(runner: R, signatures: &'static [Signature]) -> Self {
        Self {
            runner,
            signatures,
            owned_names: Vec::new(),
        }
    }

    /// Names the deployment chose itself; they are blanked out of provider
    /// messages before classification so a name like `image-api` cannot
    /// match a signature.
    pub fn with_owned_names(mut self, names: impl IntoIterator<Item = String>) -> Self {
        let mut names: Vec<String> = names
            .into_iter()
            .map(|n| n.to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        // Longest first so `shop-alb-sg` is blanked before `shop-alb`
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        names.dedup();
        self.owned_names = names;
        self
    }

    fn classify(&self, message: &str) -> ErrorClass {
        let mut scrubbed = message.to_lowercase();
        for name in &self.owned_names {
            scrubbed = scrubbed.replace(name.as_str(), "<name>");
        }
        classify(self.signatures, &scrubbed)
    }

    fn command_error(&self, err: CommandError) -> AdapterError {
        match err {
            CommandError::NotInstalled(_) => AdapterError::fatal(err.to_string()),
            CommandError::Spawn(_) => AdapterError::transient(err.to_string()),
        }
    }

    /// Run and return stdout, or the classified failure
    pub fn run(&self, invocation: &Invocation) -> AdapterResult<String> {
        let output = self
            .runner
            .run(invocation)
            .map_err(|e| self.command_error(e))?;
        if output.success {
            return Ok(output.stdout);
        }
        let message = if output.stderr.trim().is_empty() {
            output.stdout.trim().to_string()
        } else {
            output.stderr.trim().to_string()
        };
        let class = self.classify(&message);
        tracing::debug!(command = %invocation.program, class = %class, "provider call failed");
        Err(AdapterError::new(class, message))
    }

    /// Run and parse stdout as JSON (empty output is `null`)
    pub fn json(&self, invocation: &Invocation) -> AdapterResult<Value> {
        let stdout = self.run(invocation)?;
        if stdout.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&stdout).map_err(|e| {
            AdapterError::fatal(format!(
                "unexpected output from {}: {}",
                invocation.program, e
            ))
        })
    }

    /// Run with the terminal attached
    pub fn stream(&self, invocation: &Invocation) -> AdapterResult<()> {
        let output = self
            .runner
            .run_streaming(invocation)
            .map_err(|e| self.command_error(e))?;
        if output.success {
            Ok(())
        } else {
            Err(AdapterError::transient(format!(
                "{} exited with {:?}",
                invocation.program, output.code
            )))
        }
    }
}

/// Turn a `NotFound` failure into `None`
pub fn optional<T>(result: AdapterResult<T>) -> AdapterResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.class.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// String at a JSON pointer, or a fatal "unexpected output" error
pub fn str_at<'v>(value: &'v Value, pointer: &str) -> AdapterResult<&'v str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| AdapterError::fatal(format!("missing '{}' in provider output", pointer)))
}

/// Strings of an array at a JSON pointer (missing array is empty)
pub fn strings_at(value: &Value, pointer: &str) -> Vec<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Revision suffix derived from an image tag.
///
/// Lowercase letters, digits and hyphens only, starting with a letter.
pub fn revision_suffix(tag: &str) -> String {
    let cleaned: String = tag
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let mut suffix = format!("v{}", cleaned.trim_matches('-'));
    suffix.truncate(24);
    suffix.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::CommandOutput;
    use crate::infrastructure::process::scripted::ScriptedRunner;

    const TABLE: &[Signature] = &[
        sig(&["image", "not found"], IMAGE_NOT_VISIBLE),
        sig(&["accessdenied"], ErrorClass::Fatal),
        sig(&["not found"], ErrorClass::NotFound),
    ];

    #[test]
    fn first_matching_signature_wins() {
        assert_eq!(
            classify(TABLE, "CannotPullContainerError: image Not Found"),
            IMAGE_NOT_VISIBLE
        );
        assert_eq!(classify(TABLE, "repository not found"), ErrorClass::NotFound);
        assert_eq!(
            classify(TABLE, "An error occurred (AccessDenied)"),
            ErrorClass::Fatal
        );
    }

    #[test]
    fn unknown_messages_are_transient() {
        assert_eq!(classify(TABLE, "something odd happened"), TRANSIENT);
    }

    #[test]
    fn failed_command_is_classified_from_stderr() {
        let runner = ScriptedRunner::new();
        runner.on(&["aws"], CommandOutput::failed("Cluster not found."));
        let cli = ProviderCli::new(&runner, TABLE);

        let err = cli.run(&Invocation::new("aws").arg("ecs")).unwrap_err();
        assert_eq!(err.class, ErrorClass::NotFound);
        assert_eq!(err.message, "Cluster not found.");
    }

    #[test]
    fn owned_names_do_not_trigger_signatures() {
        let runner = ScriptedRunner::new();
        runner.on(
            &["aws"],
            CommandOutput::failed("Repository 'image-api' not found"),
        );
        let plain = ProviderCli::new(&runner, TABLE);
        assert_eq!(
            plain.run(&Invocation::new("aws")).unwrap_err().class,
            IMAGE_NOT_VISIBLE
        );

        let owned = ProviderCli::new(&runner, TABLE)
            .with_owned_names(["image-api".to_string(), "image-api-alb".to_string()]);
        let err = owned.run(&Invocation::new("aws")).unwrap_err();
        assert_eq!(err.class, ErrorClass::NotFound);
        // The reported message keeps the real name
        assert_eq!(err.message, "Repository 'image-api' not found");
    }

    #[test]
    fn json_parses_stdout() {
        let runner = ScriptedRunner::new();
        runner.on(&["aws"], CommandOutput::ok(r#"{"a": {"b": ["x", "y"]}}"#));
        let cli = ProviderCli::new(&runner, TABLE);

        let value = cli.json(&Invocation::new("aws")).unwrap();
        assert_eq!(strings_at(&value, "/a/b"), vec!["x", "y"]);
        assert!(str_at(&value, "/a/c").is_err());
    }

    #[test]
    fn revision_suffix_is_dns_safe() {
        assert_eq!(revision_suffix("a1b2c3d-1700000000"), "va1b2c3d-1700000000");
        assert_eq!(revision_suffix("Build_1700000000"), "vbuild-1700000000");
        assert_eq!(revision_suffix("0123456789abcdef0123456789").len(), 24);
    }

    #[test]
    fn optional_maps_not_found_to_none() {
        let missing: AdapterResult<u8> = Err(AdapterError::not_found("gone"));
        assert_eq!(optional(missing), Ok(None));
        let fatal: AdapterResult<u8> = Err(AdapterError::fatal("denied"));
        assert!(optional(fatal).is_err());
    }
}
