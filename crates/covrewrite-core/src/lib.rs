//! # covrewrite-core
//!
//! A library for preparing a compiled artifact for code-coverage measurement
//! by static rewriting: every function of one shared library module inside
//! the artifact gets a call to an entry hook and an exit hook, each passed
//! the function's name.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`]: Immutable run configuration
//! - [`engine`]: The rewriting-engine seam and its backends
//! - [`instrument`]: Module selection, function enumeration, probe binding
//!   and the orchestrator driving them
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use covrewrite_core::engine::elf::ElfEngine;
//! use covrewrite_core::{InstrumentConfig, Instrumenter};
//!
//! let config = InstrumentConfig::new("/opt/app/lib/libwidget.so", "libwidget.cov.so");
//! let engine = ElfEngine::new(vec!["/opt/probes/lib".into()]);
//!
//! let result = Instrumenter::new(engine, &config).run()?;
//! println!("instrumented {} function(s)", result.functions_processed());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! Any binary-rewriting backend can drive a run by implementing
//! [`Engine`] and [`Session`].

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod config;
pub mod engine;
pub mod error;
pub mod instrument;

// Re-export primary types for convenience
pub use config::{FailurePolicy, InstrumentConfig};
pub use engine::{CallPlacement, Engine, EngineError, PointKind, Session, SnippetHandle};
pub use error::{Error, FailureReason, FunctionFailure, Result};
pub use instrument::{
    instrument, InstrumentedFunction, Instrumenter, ProbeBinding, ProbePair, RunResult, Selection,
};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
