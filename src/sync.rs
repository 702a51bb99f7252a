//! # Module Synchronizer
//!
//! Materializes and removes module working copies, idempotently.
//!
//! ## Sync flow
//!
//! 1. Resolve the module's selector (pure, see [`crate::reference`]).
//! 2. Resolve the selector to a commit id via the remote's advertised
//!    refs, without cloning. A hexsha pin resolves to itself.
//! 3. Compare against the persisted head marker
//!    (`.quack/heads/<key>`). If it matches and the target exists, the
//!    module is already up to date and no clone happens at all.
//! 4. Otherwise clone into the staging area (`.quack/modules/<key>`),
//!    check out the resolved commit, and extract the declared sub-path
//!    into the target path — a directory tree with `.git*` entries
//!    skipped, or a single file when `isfile` is set. Any prior target is
//!    discarded first, never merged into.
//! 5. Record the full commit id in the head marker and maintain the
//!    project's `.gitignore` entry when enabled.
//!
//! Removal deletes the target and its marker; removing a module that was
//! never synced is a no-op.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::ModuleSpec;
use crate::error::{Error, Result};
use crate::git::{GitClient, GitError};
use crate::gitignore::IgnoreList;
use crate::reference::{self, ResolvedModule};

/// Staging area for clones, relative to the project root.
const STAGING_DIR: &str = ".quack/modules";

/// Persisted last-synced commit markers, relative to the project root.
const HEADS_DIR: &str = ".quack/heads";

/// What a sync call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The working copy was (re)materialized at this commit.
    Synced { commit: String },
    /// The marker matched the freshly resolved commit; nothing was done.
    UpToDate { commit: String },
}

impl SyncOutcome {
    pub fn commit(&self) -> &str {
        match self {
            SyncOutcome::Synced { commit } | SyncOutcome::UpToDate { commit } => commit,
        }
    }
}

/// Synchronizes module working copies under one project root.
pub struct Synchronizer<'a> {
    project_root: PathBuf,
    git: &'a dyn GitClient,
    ignore: Option<&'a dyn IgnoreList>,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        project_root: &Path,
        git: &'a dyn GitClient,
        ignore: Option<&'a dyn IgnoreList>,
    ) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            git,
            ignore,
        }
    }

    /// Ensure the module's target path contains the resolved reference's
    /// content. Idempotent: an unchanged resolved commit with an existing
    /// target is a no-op without any clone or fetch.
    pub fn sync(&self, key: &str, spec: &ModuleSpec) -> Result<SyncOutcome> {
        let resolved = reference::resolve(key, spec)?;
        let pinned = self
            .git
            .lookup_remote(&resolved.url, &resolved.selector)
            .map_err(|e| classify(e, key, &resolved))?;

        let target = self.project_root.join(key);
        if let Some(last) = self.read_marker(key)? {
            if commits_match(&last, &pinned) && target.exists() {
                log::info!("module '{}' already at {}", key, last);
                return Ok(SyncOutcome::UpToDate { commit: last });
            }
        }

        log::info!("cloning {} for module '{}'", resolved.url, key);
        let staging = self.project_root.join(STAGING_DIR).join(key);
        self.git
            .clone_repo(&resolved.url, &staging, resolved.selector.clone_ref())
            .map_err(|e| classify(e, key, &resolved))?;
        self.git
            .checkout(&staging, &pinned)
            .map_err(|e| classify(e, key, &resolved))?;
        let commit = self
            .git
            .head_commit(&staging)
            .map_err(|e| classify(e, key, &resolved))?;

        let source = match spec.path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => staging.join(path),
            _ => staging.clone(),
        };
        if !source.exists() || (spec.isfile && !source.is_file()) {
            let _ = fs::remove_dir_all(&staging);
            return Err(Error::PathNotFound {
                module: key.to_string(),
                path: spec.path.clone().unwrap_or_default(),
                reference: commit,
            });
        }

        if spec.isfile {
            remove_target(&target)?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&source, &target)?;
        } else {
            remove_target(&target)?;
            copy_tree(&source, &target)?;
        }

        if let Err(e) = fs::remove_dir_all(&staging) {
            log::warn!("could not clean staging dir for '{}': {}", key, e);
        }
        self.write_marker(key, &commit)?;
        if let Some(ignore) = self.ignore {
            ignore.add(key)?;
        }

        log::info!("synced module '{}' at {}", key, commit);
        Ok(SyncOutcome::Synced { commit })
    }

    /// Delete the module's working copy and marker if present. Returns
    /// whether anything was removed; a never-synced module is a no-op.
    pub fn remove(&self, key: &str) -> Result<bool> {
        reference::validate_key(key)?;

        let target = self.project_root.join(key);
        let removed = if target.is_file() {
            fs::remove_file(&target)?;
            true
        } else if target.is_dir() {
            fs::remove_dir_all(&target)?;
            true
        } else {
            false
        };

        let marker = self.marker_path(key);
        if marker.exists() {
            fs::remove_file(&marker)?;
        }

        if removed {
            if let Some(ignore) = self.ignore {
                ignore.remove(key)?;
            }
            log::info!("cleaned module '{}'", key);
        }
        Ok(removed)
    }

    fn marker_path(&self, key: &str) -> PathBuf {
        self.project_root.join(HEADS_DIR).join(key)
    }

    fn read_marker(&self, key: &str) -> Result<Option<String>> {
        let path = self.marker_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let commit = content.trim().to_string();
        Ok(if commit.is_empty() { None } else { Some(commit) })
    }

    fn write_marker(&self, key: &str, commit: &str) -> Result<()> {
        let path = self.marker_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, format!("{}\n", commit))?;
        Ok(())
    }
}

/// Whether two commit ids name the same commit, allowing one side to be
/// an abbreviation of the other (short hexsha pins).
fn commits_match(a: &str, b: &str) -> bool {
    a == b || a.starts_with(b) || b.starts_with(a)
}

fn remove_target(target: &Path) -> Result<()> {
    if target.is_file() {
        fs::remove_file(target)?;
    } else if target.is_dir() {
        fs::remove_dir_all(target)?;
    }
    Ok(())
}

/// Copy a directory tree, skipping `.git*` entries so the vendored copy
/// carries no repository metadata.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    let walker = WalkDir::new(src).into_iter().filter_entry(|entry| {
        entry.path() == src || !entry.file_name().to_string_lossy().starts_with(".git")
    });
    for entry in walker {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        // Walk entries are always under the walk root.
        let rel = match entry.path().strip_prefix(src) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let out = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&out)?;
        } else {
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &out)?;
        }
    }
    Ok(())
}

/// Attach module context to a low-level git failure and map it onto the
/// crate error taxonomy.
fn classify(err: GitError, module: &str, resolved: &ResolvedModule) -> Error {
    match err {
        GitError::Unreachable { message } => Error::RepositoryUnreachable {
            module: module.to_string(),
            url: resolved.url.clone(),
            message,
        },
        GitError::RefNotFound { reference } => Error::ReferenceNotFound {
            module: module.to_string(),
            url: resolved.url.clone(),
            reference,
        },
        GitError::Command { command, stderr } => Error::Git {
            module: module.to_string(),
            message: format!("{}: {}", command, stderr),
        },
        GitError::Io(e) => Error::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::RefSelector;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const COMMIT_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const COMMIT_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    /// Mock git client that materializes a fixed file tree on clone and
    /// records every call.
    struct MockGit {
        commit: Mutex<String>,
        files: Vec<(&'static str, &'static str)>,
        lookup_calls: Arc<Mutex<Vec<String>>>,
        clone_calls: Arc<Mutex<Vec<(String, Option<String>)>>>,
        fail_lookup: Option<fn() -> GitError>,
    }

    impl MockGit {
        fn new(files: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                commit: Mutex::new(COMMIT_A.to_string()),
                files,
                lookup_calls: Arc::new(Mutex::new(Vec::new())),
                clone_calls: Arc::new(Mutex::new(Vec::new())),
                fail_lookup: None,
            }
        }

        fn set_commit(&self, commit: &str) {
            *self.commit.lock().unwrap() = commit.to_string();
        }

        fn clone_count(&self) -> usize {
            self.clone_calls.lock().unwrap().len()
        }
    }

    impl GitClient for MockGit {
        fn lookup_remote(
            &self,
            url: &str,
            selector: &RefSelector,
        ) -> std::result::Result<String, GitError> {
            self.lookup_calls.lock().unwrap().push(url.to_string());
            if let Some(fail) = self.fail_lookup {
                return Err(fail());
            }
            match selector {
                RefSelector::Hexsha(sha) => Ok(sha.clone()),
                _ => Ok(self.commit.lock().unwrap().clone()),
            }
        }

        fn clone_repo(
            &self,
            url: &str,
            dest: &Path,
            reference: Option<&str>,
        ) -> std::result::Result<(), GitError> {
            self.clone_calls
                .lock()
                .unwrap()
                .push((url.to_string(), reference.map(str::to_string)));
            fs::create_dir_all(dest)?;
            // Repository metadata that the extraction must skip.
            fs::create_dir_all(dest.join(".git"))?;
            fs::write(dest.join(".git/config"), "[core]")?;
            fs::write(dest.join(".gitmodules"), "")?;
            for (rel, content) in &self.files {
                let path = dest.join(rel);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, content)?;
            }
            Ok(())
        }

        fn checkout(&self, _workdir: &Path, _commit: &str) -> std::result::Result<(), GitError> {
            Ok(())
        }

        fn head_commit(&self, _workdir: &Path) -> std::result::Result<String, GitError> {
            Ok(self.commit.lock().unwrap().clone())
        }
    }

    /// Mock ignore list recording adds and removes.
    #[derive(Default)]
    struct MockIgnore {
        added: Mutex<Vec<String>>,
        removed: Mutex<Vec<String>>,
    }

    impl IgnoreList for MockIgnore {
        fn add(&self, entry: &str) -> crate::error::Result<()> {
            self.added.lock().unwrap().push(entry.to_string());
            Ok(())
        }

        fn remove(&self, entry: &str) -> crate::error::Result<()> {
            self.removed.lock().unwrap().push(entry.to_string());
            Ok(())
        }
    }

    fn branch_spec(url: &str) -> ModuleSpec {
        ModuleSpec {
            repository: Some(url.to_string()),
            branch: Some("master".to_string()),
            ..ModuleSpec::default()
        }
    }

    #[test]
    fn test_sync_materializes_target() {
        let temp = TempDir::new().unwrap();
        let git = MockGit::new(vec![("README.md", "readme"), ("src/lib.rs", "code")]);
        let sync = Synchronizer::new(temp.path(), &git, None);

        let outcome = sync
            .sync("pyanalytic", &branch_spec("https://example.com/r.git"))
            .unwrap();
        assert_eq!(outcome, SyncOutcome::Synced {
            commit: COMMIT_A.to_string()
        });

        let target = temp.path().join("pyanalytic");
        assert_eq!(fs::read_to_string(target.join("README.md")).unwrap(), "readme");
        assert_eq!(fs::read_to_string(target.join("src/lib.rs")).unwrap(), "code");
        // Repository metadata is not vendored.
        assert!(!target.join(".git").exists());
        assert!(!target.join(".gitmodules").exists());
        // Staging is cleaned up, marker persisted.
        assert!(!temp.path().join(".quack/modules/pyanalytic").exists());
        let marker = fs::read_to_string(temp.path().join(".quack/heads/pyanalytic")).unwrap();
        assert_eq!(marker.trim(), COMMIT_A);
    }

    #[test]
    fn test_sync_twice_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let git = MockGit::new(vec![("file.txt", "v1")]);
        let sync = Synchronizer::new(temp.path(), &git, None);
        let spec = branch_spec("https://example.com/r.git");

        sync.sync("m", &spec).unwrap();
        let second = sync.sync("m", &spec).unwrap();

        assert_eq!(second, SyncOutcome::UpToDate {
            commit: COMMIT_A.to_string()
        });
        // One clone total: the second call stopped at the marker check.
        assert_eq!(git.clone_count(), 1);
    }

    #[test]
    fn test_sync_rematerializes_on_new_commit() {
        let temp = TempDir::new().unwrap();
        let git = MockGit::new(vec![("file.txt", "content")]);
        let sync = Synchronizer::new(temp.path(), &git, None);
        let spec = branch_spec("https://example.com/r.git");

        sync.sync("m", &spec).unwrap();
        git.set_commit(COMMIT_B);
        let outcome = sync.sync("m", &spec).unwrap();

        assert_eq!(outcome, SyncOutcome::Synced {
            commit: COMMIT_B.to_string()
        });
        assert_eq!(git.clone_count(), 2);
        let marker = fs::read_to_string(temp.path().join(".quack/heads/m")).unwrap();
        assert_eq!(marker.trim(), COMMIT_B);
    }

    #[test]
    fn test_sync_missing_target_resyncs_despite_marker() {
        let temp = TempDir::new().unwrap();
        let git = MockGit::new(vec![("file.txt", "content")]);
        let sync = Synchronizer::new(temp.path(), &git, None);
        let spec = branch_spec("https://example.com/r.git");

        sync.sync("m", &spec).unwrap();
        fs::remove_dir_all(temp.path().join("m")).unwrap();

        let outcome = sync.sync("m", &spec).unwrap();
        assert!(matches!(outcome, SyncOutcome::Synced { .. }));
        assert!(temp.path().join("m/file.txt").exists());
    }

    #[test]
    fn test_sync_short_hexsha_matches_marker_by_prefix() {
        let temp = TempDir::new().unwrap();
        let git = MockGit::new(vec![("file.txt", "content")]);
        let sync = Synchronizer::new(temp.path(), &git, None);
        let spec = ModuleSpec {
            repository: Some("https://example.com/r.git".to_string()),
            hexsha: Some(COMMIT_A[..8].to_string()),
            ..ModuleSpec::default()
        };

        sync.sync("m", &spec).unwrap();
        let second = sync.sync("m", &spec).unwrap();
        assert!(matches!(second, SyncOutcome::UpToDate { .. }));
        assert_eq!(git.clone_count(), 1);
    }

    #[test]
    fn test_sync_extracts_subpath() {
        let temp = TempDir::new().unwrap();
        let git = MockGit::new(vec![
            ("sub/inner.txt", "inner"),
            ("top.txt", "top"),
        ]);
        let sync = Synchronizer::new(temp.path(), &git, None);
        let spec = ModuleSpec {
            repository: Some("https://example.com/r.git".to_string()),
            path: Some("sub".to_string()),
            branch: Some("master".to_string()),
            ..ModuleSpec::default()
        };

        sync.sync("m", &spec).unwrap();
        assert_eq!(
            fs::read_to_string(temp.path().join("m/inner.txt")).unwrap(),
            "inner"
        );
        assert!(!temp.path().join("m/top.txt").exists());
    }

    #[test]
    fn test_sync_missing_subpath_fails() {
        let temp = TempDir::new().unwrap();
        let git = MockGit::new(vec![("top.txt", "top")]);
        let sync = Synchronizer::new(temp.path(), &git, None);
        let spec = ModuleSpec {
            repository: Some("https://example.com/r.git".to_string()),
            path: Some("no/such/dir".to_string()),
            branch: Some("master".to_string()),
            ..ModuleSpec::default()
        };

        let err = sync.sync("m", &spec).unwrap_err();
        match err {
            Error::PathNotFound { module, path, .. } => {
                assert_eq!(module, "m");
                assert_eq!(path, "no/such/dir");
            }
            other => panic!("expected PathNotFound, got {:?}", other),
        }
        assert!(!temp.path().join("m").exists());
    }

    #[test]
    fn test_sync_isfile_places_single_file() {
        let temp = TempDir::new().unwrap();
        let git = MockGit::new(vec![("scripts/toggle.js", "js")]);
        let sync = Synchronizer::new(temp.path(), &git, None);
        let spec = ModuleSpec {
            repository: Some("https://example.com/r.git".to_string()),
            path: Some("scripts/toggle.js".to_string()),
            branch: Some("master".to_string()),
            isfile: true,
            ..ModuleSpec::default()
        };

        sync.sync("toggleicon.js", &spec).unwrap();
        let target = temp.path().join("toggleicon.js");
        assert!(target.is_file());
        assert_eq!(fs::read_to_string(&target).unwrap(), "js");
    }

    #[test]
    fn test_sync_isfile_on_directory_fails() {
        let temp = TempDir::new().unwrap();
        let git = MockGit::new(vec![("scripts/toggle.js", "js")]);
        let sync = Synchronizer::new(temp.path(), &git, None);
        let spec = ModuleSpec {
            repository: Some("https://example.com/r.git".to_string()),
            path: Some("scripts".to_string()),
            branch: Some("master".to_string()),
            isfile: true,
            ..ModuleSpec::default()
        };

        assert!(matches!(
            sync.sync("m", &spec).unwrap_err(),
            Error::PathNotFound { .. }
        ));
    }

    #[test]
    fn test_sync_maintains_gitignore() {
        let temp = TempDir::new().unwrap();
        let git = MockGit::new(vec![("file.txt", "content")]);
        let ignore = MockIgnore::default();
        let sync = Synchronizer::new(temp.path(), &git, Some(&ignore));

        sync.sync("m", &branch_spec("https://example.com/r.git"))
            .unwrap();
        assert_eq!(*ignore.added.lock().unwrap(), vec!["m".to_string()]);

        sync.remove("m").unwrap();
        assert_eq!(*ignore.removed.lock().unwrap(), vec!["m".to_string()]);
    }

    #[test]
    fn test_sync_lookup_failure_carries_module_context() {
        let temp = TempDir::new().unwrap();
        let mut git = MockGit::new(vec![]);
        git.fail_lookup = Some(|| GitError::Unreachable {
            message: "Could not resolve host".to_string(),
        });
        let sync = Synchronizer::new(temp.path(), &git, None);

        let err = sync
            .sync("pyanalytic", &branch_spec("https://example.com/r.git"))
            .unwrap_err();
        match err {
            Error::RepositoryUnreachable { module, url, .. } => {
                assert_eq!(module, "pyanalytic");
                assert_eq!(url, "https://example.com/r.git");
            }
            other => panic!("expected RepositoryUnreachable, got {:?}", other),
        }
        assert_eq!(git.clone_count(), 0);
    }

    #[test]
    fn test_sync_missing_reference_classified() {
        let temp = TempDir::new().unwrap();
        let mut git = MockGit::new(vec![]);
        git.fail_lookup = Some(|| GitError::RefNotFound {
            reference: "nope".to_string(),
        });
        let sync = Synchronizer::new(temp.path(), &git, None);

        let err = sync
            .sync("m", &branch_spec("https://example.com/r.git"))
            .unwrap_err();
        assert!(matches!(err, Error::ReferenceNotFound { reference, .. } if reference == "nope"));
    }

    #[test]
    fn test_remove_twice_is_noop() {
        let temp = TempDir::new().unwrap();
        let git = MockGit::new(vec![("file.txt", "content")]);
        let sync = Synchronizer::new(temp.path(), &git, None);

        sync.sync("m", &branch_spec("https://example.com/r.git"))
            .unwrap();

        assert!(sync.remove("m").unwrap());
        assert!(!temp.path().join("m").exists());
        assert!(!temp.path().join(".quack/heads/m").exists());

        // Second removal: no error, no side effect.
        assert!(!sync.remove("m").unwrap());
    }

    #[test]
    fn test_remove_never_synced_module_is_noop() {
        let temp = TempDir::new().unwrap();
        let git = MockGit::new(vec![]);
        let sync = Synchronizer::new(temp.path(), &git, None);
        assert!(!sync.remove("never-synced").unwrap());
    }

    #[test]
    fn test_remove_rejects_escaping_key() {
        let temp = TempDir::new().unwrap();
        let git = MockGit::new(vec![]);
        let sync = Synchronizer::new(temp.path(), &git, None);
        assert!(matches!(
            sync.remove("../outside").unwrap_err(),
            Error::InvalidModuleSpec { .. }
        ));
    }

    #[test]
    fn test_commits_match() {
        assert!(commits_match(COMMIT_A, COMMIT_A));
        assert!(commits_match(COMMIT_A, &COMMIT_A[..8]));
        assert!(commits_match(&COMMIT_A[..8], COMMIT_A));
        assert!(!commits_match(COMMIT_A, COMMIT_B));
    }
}
