//! # Recursion Context
//!
//! Nested `quack` invocations re-enter the whole engine, and nothing in
//! the declared format forbids two configs from invoking each other. The
//! call stack of (config path, profile) frames is carried explicitly
//! through every `run` call, making cycle detection a pure function of
//! passed-in state rather than hidden global history.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Upper bound on nested-invocation depth, bounding runaway chains that
/// are long but never exactly cyclic.
pub const MAX_DEPTH: usize = 16;

/// One in-flight invocation: which config and which profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecursionFrame {
    pub config: PathBuf,
    pub profile: String,
}

impl RecursionFrame {
    fn describe(&self) -> String {
        format!("{}:{}", self.config.display(), self.profile)
    }
}

/// Explicit call stack of nested invocations.
#[derive(Debug)]
pub struct RecursionStack {
    frames: Vec<RecursionFrame>,
    max_depth: usize,
}

impl Default for RecursionStack {
    fn default() -> Self {
        Self::new()
    }
}

impl RecursionStack {
    pub fn new() -> Self {
        Self::with_max_depth(MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Push a frame for `(config, profile)`.
    ///
    /// Fails with `CyclicInvocation` (rendering the whole chain) if an
    /// identical frame is already on the stack, and with
    /// `RecursionTooDeep` past the configured depth.
    pub fn push(&mut self, config: &Path, profile: &str) -> Result<()> {
        let frame = RecursionFrame {
            config: config.to_path_buf(),
            profile: profile.to_string(),
        };

        if self.frames.contains(&frame) {
            let cycle = self
                .frames
                .iter()
                .chain(std::iter::once(&frame))
                .map(RecursionFrame::describe)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(Error::CyclicInvocation { cycle });
        }

        if self.frames.len() >= self.max_depth {
            return Err(Error::RecursionTooDeep {
                depth: self.frames.len() + 1,
                max: self.max_depth,
                config: config.display().to_string(),
                profile: profile.to_string(),
            });
        }

        self.frames.push(frame);
        Ok(())
    }

    /// Pop the most recent frame. Called on every exit path of a `run`.
    pub fn pop(&mut self) {
        self.frames.pop();
    }
}
