//! # Profile Execution Engine
//!
//! Runs a named profile of a loaded [`ProjectConfig`]: resolves its
//! dependencies (which may re-enter this same engine against nested
//! configurations), then interprets and executes its task list in declared
//! order, dispatching to the module synchronizer and the shell runner.
//!
//! The engine holds its collaborators as boxed trait objects so tests can
//! inject mocks; the defaults shell out to the system git binary and
//! spawn processes directly.
//!
//! ## Failure policy
//!
//! The whole task list is parsed, and sync tasks' module keys checked,
//! before anything executes; an unparseable pipeline never runs
//! partially. A
//! dependency failure aborts the profile before any task runs. A failed
//! module sync stops the profile at that task, since later tasks commonly
//! assume the module exists. A failed shell task is reported and counted
//! but does not stop the remaining tasks, unless the profile sets
//! `fail-fast: true`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{self, ProjectConfig};
use crate::error::{Error, Result};
use crate::git::{GitClient, SystemGit};
use crate::gitignore::{GitignoreFile, IgnoreList};
use crate::recursion::RecursionStack;
use crate::shell::{ShellRunner, SystemShell};
use crate::sync::Synchronizer;
use crate::task::{self, TaskAction};

/// Counters reported after a profile run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Tasks executed (including reported-but-tolerated shell failures).
    pub tasks: usize,
    /// Dependencies resolved before the tasks ran.
    pub dependencies: usize,
    /// Shell tasks that failed without aborting the profile.
    pub shell_failures: usize,
}

/// Executes profiles against loaded configurations.
pub struct Engine {
    git: Box<dyn GitClient>,
    shell: Box<dyn ShellRunner>,
}

impl Engine {
    /// Engine with the default collaborators (system git, direct process
    /// spawning).
    pub fn new() -> Self {
        Self {
            git: Box::new(SystemGit),
            shell: Box::new(SystemShell),
        }
    }

    /// Engine with injected collaborators, used by tests.
    pub fn with_collaborators(git: Box<dyn GitClient>, shell: Box<dyn ShellRunner>) -> Self {
        Self { git, shell }
    }

    /// Run `profile_name` from `config`, which was loaded from
    /// `config_path`. The recursion stack is carried explicitly; the
    /// top-level caller passes a fresh one.
    pub fn run(
        &self,
        config: &ProjectConfig,
        config_path: &Path,
        profile_name: &str,
        stack: &mut RecursionStack,
    ) -> Result<RunStats> {
        let profile = config
            .profiles
            .get(profile_name)
            .ok_or_else(|| Error::ProfileNotFound {
                profile: profile_name.to_string(),
                config: config_path.display().to_string(),
            })?;

        stack.push(config_path, profile_name)?;
        let result = self.run_profile(config, config_path, profile_name, profile, stack);
        // The frame must come off on every exit path.
        stack.pop();
        result
    }

    fn run_profile(
        &self,
        config: &ProjectConfig,
        config_path: &Path,
        profile_name: &str,
        profile: &crate::config::ProfileSpec,
        stack: &mut RecursionStack,
    ) -> Result<RunStats> {
        let project_root = project_root_of(config_path);

        // Structural pass: the whole task list must parse, and sync
        // tasks may only name declared modules, before anything
        // executes. Removal of an undeclared key is tolerated below.
        let actions = profile
            .tasks
            .iter()
            .map(|token| task::parse(token))
            .collect::<Result<Vec<_>>>()?;
        for (token, action) in profile.tasks.iter().zip(&actions) {
            if let TaskAction::SyncModule(key) = action {
                if !config.modules.contains_key(key) {
                    return Err(Error::UnknownModule {
                        module: key.clone(),
                        token: token.clone(),
                    });
                }
            }
        }

        let mut stats = RunStats::default();

        // Dependencies are preconditions, not best-effort: any failure
        // aborts before the first task runs.
        for dep in profile.dependency_list()? {
            if dep.kind != "quack" {
                log::warn!(
                    "ignoring unsupported dependency kind '{}' in profile '{}'",
                    dep.kind,
                    profile_name
                );
                continue;
            }
            let (nested_config, nested_profile) = task::parse_descriptor(&dep.descriptor);
            self.run_nested(nested_config, nested_profile, &project_root, stack)?;
            stats.dependencies += 1;
        }

        if actions.is_empty() {
            log::info!("no tasks in profile '{}'", profile_name);
        }

        let gitignore_file = GitignoreFile::new(&project_root);
        let ignore: Option<&dyn IgnoreList> = config
            .gitignore
            .then_some(&gitignore_file as &dyn IgnoreList);
        let synchronizer = Synchronizer::new(&project_root, self.git.as_ref(), ignore);

        for (token, action) in profile.tasks.iter().zip(actions) {
            match action {
                TaskAction::SyncAllModules => {
                    if config.modules.is_empty() {
                        log::warn!("no modules declared; nothing to sync");
                    }
                    for (key, spec) in &config.modules {
                        synchronizer.sync(key, spec)?;
                    }
                }
                TaskAction::SyncModule(key) => {
                    let spec = config
                        .modules
                        .get(&key)
                        .ok_or_else(|| Error::UnknownModule {
                            module: key.clone(),
                            token: token.clone(),
                        })?;
                    synchronizer.sync(&key, spec)?;
                }
                TaskAction::RemoveAllModules => {
                    for key in config.modules.keys() {
                        synchronizer.remove(key)?;
                    }
                }
                TaskAction::RemoveModule(key) => {
                    // Removal only touches declared modules; an
                    // undeclared key never synced anything to remove.
                    if config.modules.contains_key(&key) {
                        synchronizer.remove(&key)?;
                    } else {
                        log::warn!("module '{}' is not declared; nothing to remove", key);
                    }
                }
                TaskAction::RunShell(command) => {
                    let failure = match self.shell.run(&command, &project_root) {
                        Ok(0) => None,
                        Ok(code) => Some(Error::ShellTask {
                            command: command.clone(),
                            message: format!("exited with status {}", code),
                        }),
                        Err(err) => Some(err),
                    };
                    if let Some(err) = failure {
                        if profile.fail_fast {
                            return Err(err);
                        }
                        log::warn!("{} (continuing)", err);
                        stats.shell_failures += 1;
                    }
                }
                TaskAction::InvokeNested {
                    config: nested_config,
                    profile: nested_profile,
                } => {
                    self.run_nested(&nested_config, &nested_profile, &project_root, stack)?;
                }
            }
            stats.tasks += 1;
        }

        Ok(stats)
    }

    /// Load a nested configuration and re-enter `run` against it, with the
    /// path resolved relative to the current project's directory and the
    /// same recursion stack carried down.
    fn run_nested(
        &self,
        config_rel: &str,
        profile: &str,
        base: &Path,
        stack: &mut RecursionStack,
    ) -> Result<RunStats> {
        let nested_path = base.join(config_rel);
        let nested_config = config::from_file(&nested_path)?;
        let nested_path = fs::canonicalize(&nested_path).unwrap_or(nested_path);
        log::info!(
            "entering nested config {} (profile '{}')",
            nested_path.display(),
            profile
        );
        self.run(&nested_config, &nested_path, profile, stack)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory the config file lives in; the project's working directory
/// for every path this invocation touches.
fn project_root_of(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
