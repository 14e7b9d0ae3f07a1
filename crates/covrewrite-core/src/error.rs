//! Error types for the covrewrite-core library.
//!
//! Every fatal condition of an instrumentation run is a variant of [`Error`].
//! The two non-fatal conditions (no module matched the target, the probe
//! library failed to load) are not errors of the run: they are reported
//! through [`RunResult`](crate::RunResult) and logged.

use crate::engine::{EngineError, PointKind};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for covrewrite operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors of an instrumentation run
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The run configuration is unusable
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The artifact could not be opened for editing
    #[error("failed to open '{path}' for editing: {source}")]
    Open {
        /// Path of the artifact
        path: PathBuf,
        /// Underlying engine error
        #[source]
        source: EngineError,
    },

    /// One or both probe hooks are not present in the artifact's image
    #[error("could not resolve probe hook(s) {}: aborting", .missing.join(", "))]
    HookResolution {
        /// Hook names that did not resolve
        missing: Vec<String>,
    },

    /// The module selected for instrumentation is not a shared library
    #[error("module '{module}' is not a shared library, cannot instrument")]
    NotInstrumentable {
        /// Display name of the module
        module: String,
    },

    /// A function offers no usable instrumentation point
    #[error("function '{function}' has no {kind} instrumentation point")]
    NoInsertionPoint {
        /// Name of the function
        function: String,
        /// Which side of the function lacked points
        kind: PointKind,
    },

    /// The engine rejected a probe insertion
    #[error("failed to insert instrumentation at function {kind} of '{function}': {source}")]
    Insertion {
        /// Name of the function
        function: String,
        /// Which side of the function the insertion targeted
        kind: PointKind,
        /// Underlying engine error
        #[source]
        source: EngineError,
    },

    /// One or more functions failed under the accumulating failure policy
    #[error("{} function(s) could not be instrumented: {}", .failures.len(), summarize(.failures))]
    Instrumentation {
        /// Every per-function failure, in processing order
        failures: Vec<FunctionFailure>,
    },

    /// The rewritten artifact could not be serialized
    #[error("failed to write output file '{path}': {source}")]
    Write {
        /// Requested output path
        path: PathBuf,
        /// Underlying engine error
        #[source]
        source: EngineError,
    },
}

impl Error {
    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new open error
    pub fn open(path: impl Into<PathBuf>, source: EngineError) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Creates a new write error
    pub fn write(path: impl Into<PathBuf>, source: EngineError) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a new not-instrumentable error
    pub fn not_instrumentable(module: impl Into<String>) -> Self {
        Self::NotInstrumentable {
            module: module.into(),
        }
    }

    /// Returns true if this error concerns a single function rather than the run setup
    pub fn is_per_function(&self) -> bool {
        matches!(
            self,
            Self::NoInsertionPoint { .. } | Self::Insertion { .. } | Self::Instrumentation { .. }
        )
    }
}

impl From<FunctionFailure> for Error {
    fn from(failure: FunctionFailure) -> Self {
        let FunctionFailure { function, reason } = failure;
        match reason {
            FailureReason::NoInsertionPoint(kind) => Self::NoInsertionPoint { function, kind },
            FailureReason::Insertion(kind, source) => Self::Insertion {
                function,
                kind,
                source,
            },
        }
    }
}

/// Why a single function could not be instrumented
#[derive(Debug)]
pub enum FailureReason {
    /// The engine reported no points of this kind
    NoInsertionPoint(PointKind),
    /// The engine refused the insertion at this kind of point
    Insertion(PointKind, EngineError),
}

/// A per-function failure recorded during a run
#[derive(Debug)]
pub struct FunctionFailure {
    /// Name of the function as reported by the engine
    pub function: String,
    /// What went wrong
    pub reason: FailureReason,
}

impl FunctionFailure {
    /// Creates a failure for a function lacking points of `kind`
    pub fn no_insertion_point(function: impl Into<String>, kind: PointKind) -> Self {
        Self {
            function: function.into(),
            reason: FailureReason::NoInsertionPoint(kind),
        }
    }

    /// Creates a failure for a rejected insertion
    pub fn insertion(function: impl Into<String>, kind: PointKind, source: EngineError) -> Self {
        Self {
            function: function.into(),
            reason: FailureReason::Insertion(kind, source),
        }
    }
}

impl fmt::Display for FunctionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            FailureReason::NoInsertionPoint(kind) => {
                write!(f, "{}: no {} point", self.function, kind)
            }
            FailureReason::Insertion(kind, source) => {
                write!(f, "{}: {} insertion rejected ({})", self.function, kind, source)
            }
        }
    }
}

fn summarize(failures: &[FunctionFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::HookResolution {
            missing: vec!["FEntryCoverage".into(), "FExitCoverage".into()],
        };
        assert!(err.to_string().contains("FEntryCoverage, FExitCoverage"));

        let err = Error::not_instrumentable("a.out");
        assert!(err.to_string().contains("'a.out' is not a shared library"));
    }

    #[test]
    fn test_failure_converts_to_single_error() {
        let err: Error = FunctionFailure::no_insertion_point("f1", PointKind::Exit).into();
        assert!(matches!(
            err,
            Error::NoInsertionPoint { ref function, kind: PointKind::Exit } if function == "f1"
        ));
        assert!(err.is_per_function());
    }

    #[test]
    fn test_accumulated_failures_are_listed() {
        let err = Error::Instrumentation {
            failures: vec![
                FunctionFailure::no_insertion_point("f1", PointKind::Entry),
                FunctionFailure::insertion("f2", PointKind::Exit, EngineError::rejected("no slot")),
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("2 function(s)"));
        assert!(msg.contains("f1: no entry point"));
        assert!(msg.contains("f2: exit insertion rejected (no slot)"));
        assert!(!Error::config("x").is_per_function());
    }
}
