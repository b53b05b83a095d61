//! Unique image tags: `<git short hash>-<unix seconds>`, or
//! `build-<unix seconds>` outside a git checkout

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::domain::ports::{CommandRunner, Invocation};

/// Short commit hash of the checkout containing `dir`, if any
pub fn git_short_hash(runner: &dyn CommandRunner, dir: &Path) -> Option<String> {
    let invocation = Invocation::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .current_dir(dir);
    let output = runner.run(&invocation).ok()?;
    let hash = output.stdout.trim();
    if output.success && !hash.is_empty() {
        Some(hash.to_string())
    } else {
        None
    }
}

pub fn unique_tag(runner: &dyn CommandRunner, dir: &Path, now: DateTime<Utc>) -> String {
    let timestamp = now.timestamp();
    match git_short_hash(runner, dir) {
        Some(hash) => format!("{hash}-{timestamp}"),
        None => {
            tracing::debug!(dir = %dir.display(), "no git revision; using build tag");
            format!("build-{timestamp}")
        }
    }
}
