//! Instrumentation planning and insertion.
//!
//! A run goes through these steps, in order, with no feedback between them:
//!
//! 1. Open the artifact for editing
//! 2. Load the probe library (a failure here is only a warning)
//! 3. Resolve the entry and exit hooks (a failure here is fatal)
//! 4. Select the target module by basename ([`select`])
//! 5. For every function of that module ([`functions`]), bind the hooks to
//!    its name ([`probe`]) and insert both calls
//! 6. Write the rewritten artifact
//!
//! The output file exists after a run if and only if every function of the
//! selected module was fully instrumented (or no module matched at all).
//! The artifact is written to a staging file next to the output and renamed
//! into place, so a failed write leaves nothing behind.

pub mod functions;
pub mod probe;
pub mod select;

use crate::config::{FailurePolicy, InstrumentConfig};
use crate::engine::{Engine, EngineError, PointKind, Session};
use crate::error::{Error, FunctionFailure, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

pub use functions::{enumerate_functions, FunctionInfo};
pub use probe::{Hook, ProbeBinder, ProbeBinding, ProbeHooks, ProbePair};
pub use select::{basename, ModuleCandidate, ModuleSelector, SelectionError};

/// What the run decided about the target module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The named module was instrumented
    Instrumented {
        /// Display name of the module
        module: String,
    },
    /// No module matched; nothing was instrumented
    NoMatch {
        /// Basename that was searched for
        target: String,
    },
}

/// A fully instrumented function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentedFunction {
    /// Name as reported by the engine
    pub name: String,
    /// The entry and exit bindings inserted for it
    pub probes: ProbePair,
    /// Number of entry points that received the entry call
    pub entry_points: usize,
    /// Number of exit points that received the exit call
    pub exit_points: usize,
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Module selection outcome
    pub selection: Selection,
    /// Every instrumented function, in engine order
    pub functions: Vec<InstrumentedFunction>,
    /// Whether the probe library loaded without complaint
    pub library_loaded: bool,
    /// Path the rewritten artifact was written to
    pub output: PathBuf,
}

impl RunResult {
    /// Number of functions that were instrumented
    pub fn functions_processed(&self) -> usize {
        self.functions.len()
    }

    /// Display name of the instrumented module, if any matched
    pub fn module(&self) -> Option<&str> {
        match &self.selection {
            Selection::Instrumented { module } => Some(module.as_str()),
            Selection::NoMatch { .. } => None,
        }
    }

    /// The instrumented function called `name`
    pub fn function(&self, name: &str) -> Option<&InstrumentedFunction> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Drives one instrumentation run through an [`Engine`]
#[derive(Debug)]
pub struct Instrumenter<'c, E> {
    engine: E,
    config: &'c InstrumentConfig,
}

impl<'c, E: Engine> Instrumenter<'c, E> {
    /// Creates an instrumenter; pass `&engine` to keep ownership of the engine
    pub fn new(engine: E, config: &'c InstrumentConfig) -> Self {
        Self { engine, config }
    }

    /// Runs the whole pipeline and writes the output artifact
    pub fn run(&self) -> Result<RunResult> {
        let config = self.config;
        config.validate()?;

        if config.include_shared_libs {
            debug!("Including linked shared libraries is reserved; only the target module is instrumented");
        }

        info!(
            "Opening {} with the {} engine",
            config.input.display(),
            self.engine.name()
        );
        let mut session = self
            .engine
            .open(&config.input)
            .map_err(|e| Error::open(&config.input, e))?;

        let library_loaded = match session.load_library(&config.probe_library) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Loading {} failed: {}. Make sure its directory is on the library search path, \
                     or preload it when launching the rewritten binary",
                    config.probe_library, e
                );
                false
            }
        };

        debug!("Searching for hook functions");
        let hooks = resolve_hooks(&session, config)?;

        debug!("Getting modules");
        let candidates = module_candidates(&session);
        let selector = ModuleSelector::new(&config.skip_libraries);

        let (selection, functions) = match selector.select(&candidates, &config.target_identity()) {
            Ok(module) => {
                info!("Instrumenting module {}", module.name);
                let functions = self.instrument_module(&mut session, &module.handle, &hooks)?;
                (
                    Selection::Instrumented {
                        module: module.name.clone(),
                    },
                    functions,
                )
            }
            Err(SelectionError::NoMatch { target }) => {
                warn!("No module matches {}, nothing to instrument", target);
                (Selection::NoMatch { target }, Vec::new())
            }
            Err(SelectionError::NotInstrumentable { module }) => {
                return Err(Error::not_instrumentable(module));
            }
        };

        info!("Writing {}", config.output.display());
        write_atomically(&mut session, &config.output)?;

        info!("Instrumented {} function(s)", functions.len());
        Ok(RunResult {
            selection,
            functions,
            library_loaded,
            output: config.output.clone(),
        })
    }

    fn instrument_module<S: Session>(
        &self,
        session: &mut S,
        module: &S::Module,
        hooks: &ProbeHooks<S::Function>,
    ) -> Result<Vec<InstrumentedFunction>> {
        let functions = enumerate_functions(session, module);
        let binder = ProbeBinder::new(hooks);

        let mut instrumented = Vec::with_capacity(functions.len());
        let mut failures = Vec::new();

        for function in &functions {
            debug!("Instrumenting function {}", function.name);
            match instrument_function(session, function, &binder, hooks) {
                Ok(done) => instrumented.push(done),
                Err(failure) => match self.config.failure_policy {
                    FailurePolicy::FailFast => return Err(failure.into()),
                    FailurePolicy::Accumulate => {
                        warn!("{}", failure);
                        failures.push(failure);
                    }
                },
            }
        }

        if !failures.is_empty() {
            return Err(Error::Instrumentation { failures });
        }
        Ok(instrumented)
    }
}

/// Runs one instrumentation of `config` through `engine`
pub fn instrument<E: Engine>(engine: E, config: &InstrumentConfig) -> Result<RunResult> {
    Instrumenter::new(engine, config).run()
}

fn resolve_hooks<S: Session>(session: &S, config: &InstrumentConfig) -> Result<ProbeHooks<S::Function>> {
    let entry = session.find_function(&config.entry_hook);
    let exit = session.find_function(&config.exit_hook);

    match (entry, exit) {
        (Some(entry), Some(exit)) => Ok(ProbeHooks {
            entry: Hook {
                name: config.entry_hook.clone(),
                handle: entry,
            },
            exit: Hook {
                name: config.exit_hook.clone(),
                handle: exit,
            },
        }),
        (entry, exit) => {
            let mut missing = Vec::new();
            if entry.is_none() {
                missing.push(config.entry_hook.clone());
            }
            if exit.is_none() {
                missing.push(config.exit_hook.clone());
            }
            Err(Error::HookResolution { missing })
        }
    }
}

fn module_candidates<S: Session>(session: &S) -> Vec<ModuleCandidate<S::Module>> {
    session
        .modules()
        .into_iter()
        .map(|handle| ModuleCandidate {
            name: session.module_name(&handle),
            shared_library: session.is_shared_library(&handle),
            handle,
        })
        .collect()
}

fn instrument_function<S: Session>(
    session: &mut S,
    function: &FunctionInfo<S::Function>,
    binder: &ProbeBinder<'_, S::Function>,
    hooks: &ProbeHooks<S::Function>,
) -> std::result::Result<InstrumentedFunction, FunctionFailure> {
    let entry_points = session.find_points(&function.handle, PointKind::Entry);
    if entry_points.is_empty() {
        return Err(FunctionFailure::no_insertion_point(&function.name, PointKind::Entry));
    }
    let exit_points = session.find_points(&function.handle, PointKind::Exit);
    if exit_points.is_empty() {
        return Err(FunctionFailure::no_insertion_point(&function.name, PointKind::Exit));
    }

    let probes = binder.bind(function);
    for (binding, points) in [(&probes.entry, &entry_points), (&probes.exit, &exit_points)] {
        let hook = hooks.for_kind(binding.kind);
        let handle = session
            .insert_call(&hook.handle, &binding.literal, points, binding.placement())
            .map_err(|e| FunctionFailure::insertion(&function.name, binding.kind, e))?;
        trace!(
            "{}({:?}) {} {} point(s): {:?}",
            binding.hook,
            binding.literal,
            binding.placement().as_str(),
            points.len(),
            handle
        );
    }

    Ok(InstrumentedFunction {
        name: function.name.clone(),
        entry_points: entry_points.len(),
        exit_points: exit_points.len(),
        probes,
    })
}

fn staging_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".covrewrite-partial");
    output.with_file_name(name)
}

fn write_atomically<S: Session>(session: &mut S, output: &Path) -> Result<()> {
    let staging = staging_path(output);

    if let Err(e) = session.write(&staging) {
        let _ = fs::remove_file(&staging);
        return Err(Error::write(output, e));
    }
    if let Err(e) = fs::rename(&staging, output) {
        let _ = fs::remove_file(&staging);
        return Err(Error::write(output, EngineError::Io(e)));
    }
    Ok(())
}
