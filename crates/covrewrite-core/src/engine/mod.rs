//! The binary-rewriting engine seam.
//!
//! Opening an artifact, symbolizing it, patching code and serializing the
//! result are the engine's job. The orchestrator only drives it through the
//! two traits defined here:
//!
//! - [`Engine`]: opens an artifact and hands back an editing [`Session`]
//! - [`Session`]: one exclusively owned, editable artifact image
//!
//! A session is released when it is dropped, so every early return of a run
//! gives the artifact back to the engine.
//!
//! ## Backends
//!
//! - [`memory`]: scripted in-memory artifacts with fault injection
//! - `elf`: ELF symbolization with `goblin` and `capstone` (feature `elf-engine`)

#[cfg(feature = "elf-engine")]
pub mod elf;
pub mod memory;

use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors reported by an engine backend
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EngineError {
    /// I/O failure while reading or writing an artifact
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// The file is not an artifact this engine understands
    #[error("malformed artifact: {0}")]
    Malformed(String),

    /// A named library or artifact could not be found
    #[error("not found: {0}")]
    NotFound(String),

    /// The engine refused the requested edit
    #[error("{0}")]
    Rejected(String),
}

impl EngineError {
    /// Creates a new malformed-artifact error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Creates a new not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Creates a new rejection error
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}

/// Which side of a function an instrumentation point sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointKind {
    /// Function entry
    Entry,
    /// Function exit (every return site)
    Exit,
}

impl PointKind {
    /// Lowercase label used in diagnostics and serialized tables
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Exit => "exit",
        }
    }
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an inserted call goes relative to its points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallPlacement {
    /// Immediately before the point
    Before,
    /// Immediately after the point
    After,
}

impl CallPlacement {
    /// Placement used for a probe at points of `kind`
    pub fn for_kind(kind: PointKind) -> Self {
        match kind {
            PointKind::Entry => Self::Before,
            PointKind::Exit => Self::After,
        }
    }

    /// Lowercase label used in diagnostics and serialized tables
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

/// Opaque handle for a successfully inserted call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnippetHandle(pub u64);

/// A rewriting engine able to open artifacts for editing
pub trait Engine {
    /// Editing session over one opened artifact
    type Session: Session;

    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Open the artifact at `path` for editing
    fn open(&self, path: &Path) -> Result<Self::Session, EngineError>;
}

impl<E: Engine + ?Sized> Engine for &E {
    type Session = E::Session;

    fn name(&self) -> &str {
        (**self).name()
    }

    fn open(&self, path: &Path) -> Result<Self::Session, EngineError> {
        (**self).open(path)
    }
}

/// An opened, editable artifact image
///
/// Handles returned by one session are only meaningful to that session.
pub trait Session {
    /// Module handle
    type Module: Clone;
    /// Function handle
    type Function: Clone;
    /// Instrumentation point handle
    type Point;

    /// Load an auxiliary library into the artifact's image
    fn load_library(&mut self, name: &str) -> Result<(), EngineError>;

    /// Find a function by exact name anywhere in the image, first match wins
    fn find_function(&self, name: &str) -> Option<Self::Function>;

    /// Every module of the image
    fn modules(&self) -> Vec<Self::Module>;

    /// Display name of a module, derived from its on-disk path
    fn module_name(&self, module: &Self::Module) -> String;

    /// Whether the module is a shared library
    fn is_shared_library(&self, module: &Self::Module) -> bool;

    /// Every function declared in a module, in engine order
    fn functions(&self, module: &Self::Module) -> Vec<Self::Function>;

    /// Name of a function as the engine reports it
    fn function_name(&self, function: &Self::Function) -> String;

    /// Instrumentation points of `kind` within a function
    fn find_points(&self, function: &Self::Function, kind: PointKind) -> Vec<Self::Point>;

    /// Insert a call to `hook(literal)` at every one of `points`
    fn insert_call(
        &mut self,
        hook: &Self::Function,
        literal: &str,
        points: &[Self::Point],
        placement: CallPlacement,
    ) -> Result<SnippetHandle, EngineError>;

    /// Serialize the edited artifact to `path`
    fn write(&mut self, path: &Path) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_follows_point_kind() {
        assert_eq!(CallPlacement::for_kind(PointKind::Entry), CallPlacement::Before);
        assert_eq!(CallPlacement::for_kind(PointKind::Exit), CallPlacement::After);
    }

    #[test]
    fn test_engine_error_display() {
        assert_eq!(EngineError::rejected("busy").to_string(), "busy");
        assert!(EngineError::not_found("libInst.so")
            .to_string()
            .contains("libInst.so"));
    }
}
