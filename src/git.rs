//! # Version-Control Client
//!
//! The narrow interface the core uses to talk to git, plus the default
//! implementation that shells out to the system `git` binary. Using the
//! system binary means SSH keys, credential helpers, personal access
//! tokens, and anything else configured in `~/.gitconfig` work without
//! this tool managing credentials itself.
//!
//! The [`GitClient`] trait exists so the synchronizer and engine can be
//! tested against mock implementations without network access or real
//! repositories.

use std::fs;
use std::path::Path;
use std::process::Command;

use crate::reference::RefSelector;
use thiserror::Error;

/// Low-level git failures, classified where the stderr is visible.
///
/// The synchronizer attaches the module key and maps these onto the
/// crate-level error taxonomy.
#[derive(Error, Debug)]
pub enum GitError {
    /// Network or auth failure reaching the remote.
    #[error("{message}")]
    Unreachable { message: String },

    /// The requested branch/tag/commit does not exist.
    #[error("reference '{reference}' not found")]
    RefNotFound { reference: String },

    /// A git command failed for some other reason.
    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Capability interface for version-control operations.
pub trait GitClient {
    /// Resolve a selector to a commit id without cloning, via the remote's
    /// advertised refs. A hexsha selector resolves to itself.
    fn lookup_remote(&self, url: &str, selector: &RefSelector) -> Result<String, GitError>;

    /// Clone `url` into `dest`, replacing anything already there. When
    /// `reference` names a branch or tag the clone is restricted to it;
    /// otherwise a full clone is made so any commit can be checked out.
    fn clone_repo(&self, url: &str, dest: &Path, reference: Option<&str>) -> Result<(), GitError>;

    /// Detach the working copy at the given commit.
    fn checkout(&self, workdir: &Path, commit: &str) -> Result<(), GitError>;

    /// Full commit id of the working copy's HEAD.
    fn head_commit(&self, workdir: &Path) -> Result<String, GitError>;
}

/// Default implementation backed by the system `git` command.
pub struct SystemGit;

impl GitClient for SystemGit {
    fn lookup_remote(&self, url: &str, selector: &RefSelector) -> Result<String, GitError> {
        let mut args: Vec<String> = vec!["ls-remote".to_string()];
        match selector {
            RefSelector::Hexsha(sha) => return Ok(sha.clone()),
            RefSelector::Branch(branch) => {
                args.push("--heads".to_string());
                args.push(url.to_string());
                args.push(branch.clone());
            }
            RefSelector::Tag(tag) => {
                args.push("--tags".to_string());
                args.push(url.to_string());
                args.push(format!("refs/tags/{}", tag));
                // Peeled form resolves annotated tags to their commit.
                args.push(format!("refs/tags/{}^{{}}", tag));
            }
            RefSelector::DefaultBranch => {
                args.push(url.to_string());
                args.push("HEAD".to_string());
            }
        }

        let output = Command::new("git").args(&args).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(GitError::Unreachable { message: stderr });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_lookup(&stdout).ok_or_else(|| GitError::RefNotFound {
            reference: selector.to_string(),
        })
    }

    fn clone_repo(&self, url: &str, dest: &Path, reference: Option<&str>) -> Result<(), GitError> {
        // git won't clone into an existing non-empty directory
        if dest.exists() {
            fs::remove_dir_all(dest)?;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut command = Command::new("git");
        command.arg("clone").arg("--quiet");
        // A hexsha pin can sit on any branch, so the clone is only
        // restricted when a branch or tag names what to fetch.
        if let Some(reference) = reference {
            command.args(["--single-branch", "--branch", reference]);
        }
        let output = command.arg(url).arg(dest).output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_clone_stderr(&stderr, reference));
        }
        Ok(())
    }

    fn checkout(&self, workdir: &Path, commit: &str) -> Result<(), GitError> {
        let output = Command::new("git")
            .args(["checkout", "--quiet", "--detach", commit])
            .current_dir(workdir)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("did not match any")
                || stderr.contains("unknown revision")
                || stderr.contains("reference is not a tree")
            {
                return Err(GitError::RefNotFound {
                    reference: commit.to_string(),
                });
            }
            return Err(GitError::Command {
                command: format!("checkout {}", commit),
                stderr: stderr.to_string(),
            });
        }
        Ok(())
    }

    fn head_commit(&self, workdir: &Path) -> Result<String, GitError> {
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(workdir)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::Command {
                command: "rev-parse HEAD".to_string(),
                stderr: stderr.to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Pick the commit id out of `git ls-remote` output.
///
/// Output format is `<hash>\t<ref>` per line. When an annotated tag is
/// listed, the peeled `^{}` line carries the commit the tag points at and
/// wins over the tag object itself.
fn parse_lookup(stdout: &str) -> Option<String> {
    let mut first = None;
    for line in stdout.lines() {
        let mut parts = line.split('\t');
        let hash = parts.next()?.trim();
        let ref_name = parts.next().unwrap_or("");
        if hash.is_empty() {
            continue;
        }
        if ref_name.ends_with("^{}") {
            return Some(hash.to_string());
        }
        if first.is_none() {
            first = Some(hash.to_string());
        }
    }
    first
}

/// Classify a failed clone from its stderr.
fn classify_clone_stderr(stderr: &str, reference: Option<&str>) -> GitError {
    if let Some(reference) = reference {
        if stderr.contains("Remote branch")
            || stderr.contains("not found in upstream")
            || stderr.contains("could not find remote branch")
        {
            return GitError::RefNotFound {
                reference: reference.to_string(),
            };
        }
    }
    let message = if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
    {
        format!(
            "Authentication failed. Make sure you have access to the repository.\n\
             For private repos, ensure you have:\n\
             - SSH key added to ssh-agent\n\
             - Git credentials configured\n\
             - Personal access token set up\n\
             Error: {}",
            stderr
        )
    } else {
        stderr.to_string()
    };
    GitError::Unreachable { message }
}
