//! Process execution
//!
//! `SystemCommandRunner` runs real processes. Tests script the output of
//! each command with `ScriptedRunner` instead.

mod system;

#[cfg(test)]
pub(crate) mod scripted;

pub use system::SystemCommandRunner;
