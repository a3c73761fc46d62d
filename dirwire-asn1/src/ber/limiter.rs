//! Sequence scope tracking
//!
//! Every open SEQUENCE or SET gets a bounded scope holding its declared
//! length and the number of bytes consumed so far. The root scope is
//! unbounded: top-level reads are limited only by what the byte source has
//! buffered and by the maximum element size.
//!
//! Scopes are stored by value in a stack that is never shrunk, so opening a
//! container after the first few messages reuses an existing slot instead of
//! allocating.

use crate::error::{DirError, DirResult};

/// One level of the scope stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Root scope, bounded only by the byte source
    Unbounded,
    /// An open container
    Bounded { limit: usize, consumed: usize },
}

impl Scope {
    /// Bytes left in this scope, `None` for the root
    pub fn remaining(&self) -> Option<usize> {
        match *self {
            Scope::Unbounded => None,
            Scope::Bounded { limit, consumed } => Some(limit - consumed),
        }
    }
}

/// LIFO stack of scopes with the root at the bottom
#[derive(Debug, Clone)]
pub struct ScopeStack {
    /// Scope slots. Only `scopes[..depth + 1]` are live; the rest are kept
    /// for reuse.
    scopes: Vec<Scope>,
    /// Number of open containers
    depth: usize,
}

impl ScopeStack {
    /// Create a stack holding only the root scope
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::Unbounded],
            depth: 0,
        }
    }

    /// Number of open containers
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Check if no container is open
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// Number of scope slots allocated so far (live or spare)
    pub fn capacity(&self) -> usize {
        self.scopes.len()
    }

    /// The innermost open scope
    pub fn current(&self) -> Scope {
        self.scopes[self.depth]
    }

    /// Bytes left in the innermost container, `None` at the root
    pub fn remaining(&self) -> Option<usize> {
        self.current().remaining()
    }

    fn live(&self) -> &[Scope] {
        &self.scopes[..=self.depth]
    }

    /// Check that `size` more bytes fit in every open scope
    ///
    /// The innermost scope is checked first, then each enclosing one, so the
    /// reported `remaining` is the tightest budget that was violated first.
    ///
    /// # Error Handling
    /// Returns `NestedOverflow` if any scope would be exceeded. Nothing is
    /// modified either way.
    pub fn check_limit(&self, size: usize) -> DirResult<()> {
        for scope in self.live().iter().rev() {
            if let Some(remaining) = scope.remaining() {
                if size > remaining {
                    return Err(DirError::NestedOverflow {
                        length: size,
                        remaining,
                    });
                }
            }
        }
        Ok(())
    }

    /// Account for `size` bytes read inside the current scope
    ///
    /// The check runs against all open scopes before any of them is
    /// charged, so a failed call leaves every scope untouched.
    pub fn consume(&mut self, size: usize) -> DirResult<()> {
        self.check_limit(size)?;
        let depth = self.depth;
        for scope in &mut self.scopes[..=depth] {
            if let Scope::Bounded { consumed, .. } = scope {
                *consumed += size;
            }
        }
        Ok(())
    }

    /// Open a container of `limit` bytes inside the current scope
    ///
    /// # Error Handling
    /// Returns `NestedOverflow` if the container does not fit in the
    /// enclosing scopes.
    pub fn push(&mut self, limit: usize) -> DirResult<()> {
        self.check_limit(limit)?;
        self.depth += 1;
        let scope = Scope::Bounded { limit, consumed: 0 };
        if self.depth < self.scopes.len() {
            self.scopes[self.depth] = scope;
        } else {
            self.scopes.push(scope);
        }
        Ok(())
    }

    /// Close the innermost container
    ///
    /// The caller must have consumed (or discarded) the scope's remaining
    /// bytes first.
    ///
    /// # Error Handling
    /// Returns `UnbalancedSequence` if only the root scope is open.
    pub fn pop(&mut self) -> DirResult<()> {
        if self.is_root() {
            return Err(DirError::UnbalancedSequence);
        }
        self.depth -= 1;
        Ok(())
    }

    /// Collapse back to the root scope, keeping spare slots for reuse
    pub fn reset(&mut self) {
        self.depth = 0;
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
