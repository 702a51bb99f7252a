//! # Shell Executor
//!
//! Runs `cmd:` tasks in the project's working directory. The command line
//! is split on whitespace into program and arguments; no shell is
//! involved, so there is no interpolation or quoting. stdout and stderr
//! are inherited so task output streams straight to the user.

use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};

/// Capability interface for running shell tasks.
pub trait ShellRunner {
    /// Run `command_line` in `cwd`, returning the exit code.
    ///
    /// A non-zero exit is returned as `Ok(code)`; only failure to spawn
    /// or an empty command line is an `Err`.
    fn run(&self, command_line: &str, cwd: &Path) -> Result<i32>;
}

/// Default implementation using `std::process::Command`.
pub struct SystemShell;

impl ShellRunner for SystemShell {
    fn run(&self, command_line: &str, cwd: &Path) -> Result<i32> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next().ok_or_else(|| Error::ShellTask {
            command: command_line.to_string(),
            message: "empty command line".to_string(),
        })?;

        let status = Command::new(program)
            .args(parts)
            .current_dir(cwd)
            .status()
            .map_err(|e| Error::ShellTask {
                command: command_line.to_string(),
                message: format!("failed to spawn: {}", e),
            })?;

        // A killed-by-signal process has no code; report it as failure.
        Ok(status.code().unwrap_or(-1))
    }
}
