//! CLI Argument Parsing
//!
//! `spinx <backend> <operation> <config>`. Backend and operation are
//! positional value enums so a typo fails in clap with exit code 2 before
//! any configuration is read.
//!
//! Global flags (`--json`, `-v`) may appear anywhere on the line.

use std::path::PathBuf;

use clap::Parser;

use crate::domain::value_objects::Backend;

/// What to do with the deployment
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create every resource the backend needs (safe to repeat)
    Setup,
    /// Build, push and roll out a new revision
    Deploy,
    /// Remove everything the deployment owns
    Destroy,
    /// Show recent log entries
    Logs,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Setup => "setup",
            Operation::Deploy => "deploy",
            Operation::Destroy => "destroy",
            Operation::Logs => "logs",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// spinx - deploy one container service to AWS Fargate, GCP Cloud Run or Azure Container Apps
#[derive(Parser, Debug)]
#[command(name = "spinx")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Examples:\n  \
    spinx aws-fargate setup deploy.yaml\n  \
    spinx gcp-cloudrun deploy deploy.yaml --json\n  \
    spinx azure-container-apps destroy deploy.yaml\n\n\
    Exit codes: 0 success, 1 failure, 130 interrupted (destroy always exits 0).")]
pub struct Cli {
    /// Target backend
    #[arg(value_enum)]
    pub backend: Backend,

    /// Operation to run
    #[arg(value_enum)]
    pub operation: Operation,

    /// Path to the deployment YAML file
    pub config: PathBuf,

    /// Print the report as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}
