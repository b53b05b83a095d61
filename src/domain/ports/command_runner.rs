//! Command Runner Port
//!
//! Every external tool (`docker`, `git`, `aws`, `gcloud`, `az`) is driven
//! through this trait so that adapters can be tested against scripted output.

use std::path::PathBuf;

/// A single argument, remembering whether it must be kept out of logs
#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg {
    Plain(String),
    Secret(String),
}

/// A command line to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    args: Vec<Arg>,
    pub env: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
    /// Written to the child's stdin; never logged
    pub stdin: Option<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            current_dir: None,
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Plain(arg.into()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args
            .extend(args.into_iter().map(|a| Arg::Plain(a.into())));
        self
    }

    /// An argument that is passed through but redacted in `display()`
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Secret(arg.into()));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Arguments as passed to the process
    pub fn argv(&self) -> Vec<&str> {
        self.args
            .iter()
            .map(|a| match a {
                Arg::Plain(s) | Arg::Secret(s) => s.as_str(),
            })
            .collect()
    }

    /// Whether any argument equals `value`
    pub fn has_arg(&self, value: &str) -> bool {
        self.argv().contains(&value)
    }

    /// Command line for logs, with secret arguments replaced
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            match arg {
                Arg::Plain(s) => line.push_str(s),
                Arg::Secret(_) => line.push_str("***"),
            }
        }
        line
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(1),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// The process could not be run at all
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Program not found on PATH
    NotInstalled(String),
    /// Spawning or waiting on the process failed
    Spawn(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInstalled(program) => write!(f, "'{}' is not installed", program),
            Self::Spawn(msg) => write!(f, "failed to run command: {}", msg),
        }
    }
}

impl std::error::Error for CommandError {}

pub trait CommandRunner {
    /// Run to completion, capturing stdout and stderr
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError>;

    /// Run with inherited stdio (builds, pushes, log tails).
    ///
    /// The returned output carries only the exit status.
    fn run_streaming(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        (**self).run(invocation)
    }

    fn run_streaming(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        (**self).run_streaming(invocation)
    }
}
