//! # Reference Resolution
//!
//! Pure validation and selector resolution for module declarations. Given
//! a [`ModuleSpec`], this module decides which single version-control
//! reference will be materialized, without touching the network or the
//! filesystem.
//!
//! The declared format allows a module to carry more than one of
//! branch/tag/hexsha at once. Rather than erroring ambiguously, resolution
//! applies a fixed precedence: **hexsha > tag > branch > repository
//! default**. A hexsha is the least ambiguous, most reproducible pin; a
//! branch is the most mutable and only applies when nothing more specific
//! is given.

use crate::config::ModuleSpec;
use crate::error::{Error, Result};
use std::path::Path;

/// The single selector chosen for a module, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefSelector {
    /// An exact commit id, possibly abbreviated.
    Hexsha(String),
    /// A tag name.
    Tag(String),
    /// A branch name.
    Branch(String),
    /// The head of the repository's default branch.
    DefaultBranch,
}

impl RefSelector {
    /// The branch or tag name usable for a single-branch clone, if any.
    pub fn clone_ref(&self) -> Option<&str> {
        match self {
            RefSelector::Tag(name) | RefSelector::Branch(name) => Some(name),
            RefSelector::Hexsha(_) | RefSelector::DefaultBranch => None,
        }
    }
}

impl std::fmt::Display for RefSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefSelector::Hexsha(sha) => write!(f, "{}", sha),
            RefSelector::Tag(tag) => write!(f, "tags/{}", tag),
            RefSelector::Branch(branch) => write!(f, "{}", branch),
            RefSelector::DefaultBranch => write!(f, "HEAD"),
        }
    }
}

/// A validated module declaration, ready for the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub url: String,
    pub selector: RefSelector,
}

/// Validate a module declaration and choose its selector.
///
/// Fails with `InvalidModuleSpec` when the repository URL is missing or
/// malformed, when a declared hexsha is not plausible hex, or when the
/// module key itself would escape the project root on materialization.
pub fn resolve(key: &str, spec: &ModuleSpec) -> Result<ResolvedModule> {
    validate_key(key)?;

    let url = spec
        .repository
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Error::InvalidModuleSpec {
            module: key.to_string(),
            message: "missing repository url".to_string(),
        })?;
    validate_url(key, url)?;

    // Precedence: hexsha > tag > branch > repository default.
    let selector = if let Some(hexsha) = non_empty(&spec.hexsha) {
        validate_hexsha(key, hexsha)?;
        RefSelector::Hexsha(hexsha.to_string())
    } else if let Some(tag) = non_empty(&spec.tag) {
        RefSelector::Tag(tag.to_string())
    } else if let Some(branch) = non_empty(&spec.branch) {
        RefSelector::Branch(branch.to_string())
    } else {
        RefSelector::DefaultBranch
    };

    Ok(ResolvedModule {
        url: url.to_string(),
        selector,
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Module keys become paths under the project root; reject anything that
/// could land outside it.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let path = Path::new(key);
    let escapes = key.is_empty()
        || path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir));
    if escapes {
        return Err(Error::InvalidModuleSpec {
            module: key.to_string(),
            message: "module key must be a relative path inside the project".to_string(),
        });
    }
    Ok(())
}

fn validate_url(key: &str, url: &str) -> Result<()> {
    // Scheme URLs must parse; scp-style (git@host:path) and local paths
    // are passed through to the git client as-is.
    if url.contains("://") && url::Url::parse(url).is_err() {
        return Err(Error::InvalidModuleSpec {
            module: key.to_string(),
            message: format!("malformed repository url '{}'", url),
        });
    }
    Ok(())
}

fn validate_hexsha(key: &str, hexsha: &str) -> Result<()> {
    let plausible =
        (4..=40).contains(&hexsha.len()) && hexsha.chars().all(|c| c.is_ascii_hexdigit());
    if !plausible {
        return Err(Error::InvalidModuleSpec {
            module: key.to_string(),
            message: format!("'{}' is not a commit hexsha", hexsha),
        });
    }
    Ok(())
}
