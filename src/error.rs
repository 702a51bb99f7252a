//! # Error Handling
//!
//! Centralized error type for the `quack` core, built with `thiserror`.
//! Every failure mode the engine can surface has its own variant, and each
//! variant carries the originating context (module key, task token, profile
//! name, config path) so a failed pipeline can be diagnosed from the message
//! alone.
//!
//! Configuration-structural errors (`Config`, `InvalidModuleSpec`,
//! `ProfileNotFound`, `UnrecognizedTask`, `UnknownModule`,
//! `CyclicInvocation`, `RecursionTooDeep`) abort the whole invocation:
//! the declared pipeline cannot be executed as written. Module-sync errors
//! (`RepositoryUnreachable`, `ReferenceNotFound`, `PathNotFound`) stop the
//! enclosing profile at that point. `ShellTask` is reported but, by
//! default, does not abort the remaining task list; see the engine for the
//! `fail-fast` policy hook.

use thiserror::Error;

/// Main error type for quack operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration document is structurally invalid.
    ///
    /// Includes the specific issue and optionally a hint about how to fix
    /// it.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A module declaration is missing or malformed (no repository URL,
    /// bad hexsha, key escaping the project root).
    #[error("Invalid module spec for '{module}': {message}")]
    InvalidModuleSpec { module: String, message: String },

    /// The module's repository could not be reached (network, auth, or a
    /// URL that points nowhere).
    #[error("Repository unreachable for module '{module}' ({url}): {message}")]
    RepositoryUnreachable {
        module: String,
        url: String,
        message: String,
    },

    /// The resolved branch/tag/hexsha does not exist in the repository.
    #[error("Reference '{reference}' not found for module '{module}' in {url}")]
    ReferenceNotFound {
        module: String,
        url: String,
        reference: String,
    },

    /// The declared sub-path does not exist at the resolved reference.
    #[error("Path '{path}' not found in module '{module}' at {reference}")]
    PathNotFound {
        module: String,
        path: String,
        reference: String,
    },

    /// A task named a module key absent from the config's module mapping.
    #[error("Unknown module key '{module}' in task '{token}'")]
    UnknownModule { module: String, token: String },

    /// A task token matched no rule of the task grammar.
    #[error("Unrecognized task token '{token}'")]
    UnrecognizedTask { token: String },

    /// The requested profile is absent from the config's profile mapping.
    #[error("Profile '{profile}' not found in {config}")]
    ProfileNotFound { profile: String, config: String },

    /// A nested invocation re-entered a (config, profile) pair already on
    /// the call stack.
    #[error("Cyclic nested invocation: {cycle}")]
    CyclicInvocation { cycle: String },

    /// The nested-invocation chain exceeded the fixed maximum depth.
    #[error("Nested invocation too deep (depth {depth}, max {max}) at {config}:{profile}")]
    RecursionTooDeep {
        depth: usize,
        max: usize,
        config: String,
        profile: String,
    },

    /// A git operation failed in a way that maps onto no more specific
    /// variant (local checkout, rev-parse).
    #[error("Git operation failed for module '{module}': {message}")]
    Git { module: String, message: String },

    /// A shell task exited non-zero or could not be spawned.
    #[error("Shell task failed: {command} - {message}")]
    ShellTask { command: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
