//! # Task DSL
//!
//! Each task token in a profile is parsed into a [`TaskAction`], a closed
//! enum that keeps the whole grammar in one place and testable in
//! isolation from filesystem and network effects. Parsing is purely
//! syntactic; whether a named module key actually exists is checked at
//! execution time.
//!
//! Grammar:
//!
//! | token                        | action                          |
//! |------------------------------|---------------------------------|
//! | `modules`                    | sync every declared module      |
//! | `modules:<key>`              | sync one module                 |
//! | `-modules`                   | remove every declared module    |
//! | `-modules:<key>`             | remove one module               |
//! | `quack:<path>[:<profile>]`   | invoke a nested configuration   |
//! | `cmd:<shell-text>`           | run a shell command             |
//!
//! `<shell-text>` is everything after the `cmd:` prefix, verbatim; shell
//! text may itself contain colons and is never re-split.

use crate::error::{Error, Result};

/// A parsed task, ready for dispatch by the execution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    /// Sync every module declared in the current config.
    SyncAllModules,
    /// Sync one module by key.
    SyncModule(String),
    /// Remove every module declared in the current config.
    RemoveAllModules,
    /// Remove one module by key.
    RemoveModule(String),
    /// Run a command line in the project's working directory.
    RunShell(String),
    /// Re-enter the engine against a nested configuration file.
    InvokeNested { config: String, profile: String },
}

/// Parse a single task token.
pub fn parse(token: &str) -> Result<TaskAction> {
    if token == "modules" {
        return Ok(TaskAction::SyncAllModules);
    }
    if token == "-modules" {
        return Ok(TaskAction::RemoveAllModules);
    }
    if let Some(key) = token.strip_prefix("modules:") {
        if !key.is_empty() {
            return Ok(TaskAction::SyncModule(key.to_string()));
        }
    }
    if let Some(key) = token.strip_prefix("-modules:") {
        if !key.is_empty() {
            return Ok(TaskAction::RemoveModule(key.to_string()));
        }
    }
    if let Some(descriptor) = token.strip_prefix("quack:") {
        if !descriptor.is_empty() {
            let (config, profile) = parse_descriptor(descriptor);
            return Ok(TaskAction::InvokeNested {
                config: config.to_string(),
                profile: profile.to_string(),
            });
        }
    }
    if let Some(command) = token.strip_prefix("cmd:") {
        if !command.is_empty() {
            return Ok(TaskAction::RunShell(command.to_string()));
        }
    }
    Err(Error::UnrecognizedTask {
        token: token.to_string(),
    })
}

/// Split a nested-invocation descriptor `"<config-path>[:<profile>]"` on
/// its last colon. A descriptor with no colon names a config whose
/// profile defaults to `init`.
pub fn parse_descriptor(descriptor: &str) -> (&str, &str) {
    match descriptor.rsplit_once(':') {
        Some((config, profile)) if !config.is_empty() && !profile.is_empty() => (config, profile),
        Some((config, _)) if !config.is_empty() => (config, crate::config::DEFAULT_PROFILE),
        _ => (descriptor, crate::config::DEFAULT_PROFILE),
    }
}
