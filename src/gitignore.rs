//! # Ignore-List Maintenance
//!
//! When a project's `gitignore` flag is true, synced module paths are kept
//! in the project's `.gitignore` so vendored content never shows up as
//! untracked. The [`IgnoreList`] trait is the seam; [`GitignoreFile`] is
//! the default implementation that edits the file in place, preserving
//! unrelated lines and never duplicating entries.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Capability interface for ignore-list maintenance.
pub trait IgnoreList {
    /// Ensure `entry` is listed. Adding an existing entry is a no-op.
    fn add(&self, entry: &str) -> Result<()>;

    /// Ensure `entry` is not listed. Removing an absent entry is a no-op.
    fn remove(&self, entry: &str) -> Result<()>;
}

/// `.gitignore` file editor.
pub struct GitignoreFile {
    path: PathBuf,
}

impl GitignoreFile {
    pub fn new(project_root: &Path) -> Self {
        Self {
            path: project_root.join(".gitignore"),
        }
    }

    fn lines(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(content.lines().map(str::to_string).collect())
    }

    fn write_lines(&self, lines: &[String]) -> Result<()> {
        let mut content = lines.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl IgnoreList for GitignoreFile {
    fn add(&self, entry: &str) -> Result<()> {
        let mut lines = self.lines()?;
        if lines.iter().any(|line| line.trim() == entry) {
            return Ok(());
        }
        lines.push(entry.to_string());
        self.write_lines(&lines)
    }

    fn remove(&self, entry: &str) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let lines = self.lines()?;
        let kept: Vec<String> = lines
            .into_iter()
            .filter(|line| line.trim() != entry)
            .collect();
        self.write_lines(&kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_creates_file() {
        let temp = TempDir::new().unwrap();
        let ignore = GitignoreFile::new(temp.path());

        ignore.add("pyanalytic").unwrap();

        let content = fs::read_to_string(temp.path().join(".gitignore")).unwrap();
        assert_eq!(content, "pyanalytic\n");
    }

    #[test]
    fn test_add_is_deduplicated() {
        let temp = TempDir::new().unwrap();
        let ignore = GitignoreFile::new(temp.path());

        ignore.add("subscribe").unwrap();
        ignore.add("subscribe").unwrap();

        let content = fs::read_to_string(temp.path().join(".gitignore")).unwrap();
        assert_eq!(content.matches("subscribe").count(), 1);
    }

    #[test]
    fn test_add_preserves_existing_lines() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".gitignore"), "target/\n*.log\n").unwrap();
        let ignore = GitignoreFile::new(temp.path());

        ignore.add("toggleicon").unwrap();

        let content = fs::read_to_string(temp.path().join(".gitignore")).unwrap();
        assert_eq!(content, "target/\n*.log\ntoggleicon\n");
    }

    #[test]
    fn test_remove_keeps_other_lines() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".gitignore"), "target/\npyanalytic\n*.log\n").unwrap();
        let ignore = GitignoreFile::new(temp.path());

        ignore.remove("pyanalytic").unwrap();

        let content = fs::read_to_string(temp.path().join(".gitignore")).unwrap();
        assert_eq!(content, "target/\n*.log\n");
    }

    #[test]
    fn test_remove_absent_entry_is_noop() {
        let temp = TempDir::new().unwrap();
        let ignore = GitignoreFile::new(temp.path());

        // No .gitignore at all; nothing is created either
        ignore.remove("missing").unwrap();
        assert!(!temp.path().join(".gitignore").exists());
    }
}
