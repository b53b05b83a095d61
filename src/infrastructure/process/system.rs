//! Command runner backed by `std::process::Command`

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

use crate::domain::ports::{CommandError, CommandOutput, CommandRunner, Invocation};

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(invocation.argv());
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &invocation.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn spawn_error(invocation: &Invocation, err: std::io::Error) -> CommandError {
        if err.kind() == ErrorKind::NotFound {
            CommandError::NotInstalled(invocation.program.clone())
        } else {
            CommandError::Spawn(format!("{}: {}", invocation.program, err))
        }
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        tracing::debug!(command = %invocation.display(), "running");

        let mut cmd = Self::command(invocation);
        cmd.stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| Self::spawn_error(invocation, e))?;

        if let Some(input) = &invocation.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(input.as_bytes())
                    .map_err(|e| CommandError::Spawn(e.to_string()))?;
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| CommandError::Spawn(e.to_string()))?;

        let result = CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.success {
            tracing::debug!(
                command = %invocation.program,
                code = ?result.code,
                stderr = %result.stderr.trim(),
                "command failed"
            );
        }
        Ok(result)
    }

    fn run_streaming(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        tracing::debug!(command = %invocation.display(), "running (streaming)");

        let status = Self::command(invocation)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| Self::spawn_error(invocation, e))?;

        Ok(CommandOutput {
            success: status.success(),
            code: status.code(),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}
