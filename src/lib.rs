//! # Quack Core Library
//!
//! This library implements the core of `quack`, a tool that declaratively
//! vendors third-party code fragments (modules) from external git
//! repositories at a pinned reference, and runs named, ordered task
//! pipelines (profiles) that sync those modules, invoke shell commands,
//! and recursively trigger quack itself in subordinate projects.
//!
//! ## Quick Example
//!
//! ```
//! use quack::{config, task};
//! use quack::task::TaskAction;
//!
//! let yaml = r#"
//! name: demo
//! modules:
//!   subscribe:
//!     repository: 'https://github.com/example/subscribe.git'
//!     branch: master
//! profiles:
//!   init:
//!     tasks: ['modules']
//!   clean:
//!     tasks: ['-modules']
//! "#;
//! let project = config::parse(yaml).unwrap();
//! assert!(project.modules.contains_key("subscribe"));
//!
//! assert_eq!(task::parse("-modules").unwrap(), TaskAction::RemoveAllModules);
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: the `quack.yaml` schema — project
//!   metadata, the module mapping, and the profile mapping. Every valid
//!   config has an `init` profile, the default when none is named.
//! - **Reference resolution (`reference`)**: pure selection of the single
//!   commit a module pins, with hexsha > tag > branch > default-branch
//!   precedence.
//! - **Task DSL (`task`)**: each task token parses into a closed
//!   [`task::TaskAction`] enum, keeping the grammar in one place.
//! - **Synchronization (`sync`)**: idempotent materialization and removal
//!   of module working copies, with a persisted last-synced marker so an
//!   unchanged module costs one `ls-remote` and no clone.
//! - **Execution (`engine`, `recursion`)**: profile runs — dependencies
//!   first, then tasks in order — with nested invocations re-entering the
//!   engine under an explicit recursion stack that detects cycles and
//!   bounds depth.
//! - **Collaborators (`git`, `gitignore`, `shell`)**: narrow trait
//!   interfaces to the system git binary, the project's `.gitignore`, and
//!   process spawning; all mockable in tests.
//!
//! Execution is single-threaded and synchronous by design: later tasks
//! may depend on filesystem state produced by earlier ones, and nested
//! invocations run in-line to preserve that ordering transitively.

pub mod config;
pub mod engine;
pub mod error;
pub mod git;
pub mod gitignore;
pub mod recursion;
pub mod reference;
pub mod shell;
pub mod suggestions;
pub mod sync;
pub mod task;
