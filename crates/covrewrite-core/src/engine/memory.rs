//! In-memory engine backend.
//!
//! Artifacts are described directly as modules and functions with a number of
//! entry and exit points, probe libraries as lists of exported names. Every
//! load, insertion and write is recorded in a shared [`EngineLog`], and
//! individual insertions or writes can be made to fail.
//!
//! ```
//! use covrewrite_core::engine::memory::{
//!     MemoryArtifact, MemoryEngine, MemoryLibrary, MemoryModule,
//! };
//!
//! let engine = MemoryEngine::new()
//!     .with_artifact(
//!         "/opt/app/libA.so",
//!         MemoryArtifact::new().with_module(MemoryModule::shared_library("libA.so").with_functions(["f1"])),
//!     )
//!     .with_library(MemoryLibrary::new("libInst.so", ["FEntryCoverage", "FExitCoverage"]));
//! assert_eq!(engine.log().open_sessions, 0);
//! ```

use super::{CallPlacement, Engine, EngineError, PointKind, Session, SnippetHandle};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::trace;

/// A function with a fixed number of instrumentation points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFunction {
    /// Function name
    pub name: String,
    /// Number of entry points
    pub entry_points: usize,
    /// Number of exit points
    pub exit_points: usize,
}

impl MemoryFunction {
    /// A function with one entry and one exit point
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry_points: 1,
            exit_points: 1,
        }
    }

    /// Sets the number of entry points
    pub fn entry_points(mut self, count: usize) -> Self {
        self.entry_points = count;
        self
    }

    /// Sets the number of exit points
    pub fn exit_points(mut self, count: usize) -> Self {
        self.exit_points = count;
        self
    }
}

/// A module inside an in-memory artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryModule {
    /// Module name, usually a path
    pub name: String,
    /// Whether the module is a shared library
    pub shared_library: bool,
    /// Functions declared in the module
    pub functions: Vec<MemoryFunction>,
}

impl MemoryModule {
    /// A shared library module with no functions
    pub fn shared_library(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared_library: true,
            functions: Vec::new(),
        }
    }

    /// A main-program module with no functions
    pub fn program(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared_library: false,
            functions: Vec::new(),
        }
    }

    /// Adds a function
    pub fn with_function(mut self, function: MemoryFunction) -> Self {
        self.functions.push(function);
        self
    }

    /// Adds one single-entry, single-exit function per name
    pub fn with_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.functions
            .extend(names.into_iter().map(MemoryFunction::new));
        self
    }
}

/// An artifact made of modules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryArtifact {
    /// Modules in engine order
    pub modules: Vec<MemoryModule>,
}

impl MemoryArtifact {
    /// Creates an empty artifact
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module
    pub fn with_module(mut self, module: MemoryModule) -> Self {
        self.modules.push(module);
        self
    }
}

/// A loadable library and the function names it exports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLibrary {
    /// File name the library is loaded by
    pub name: String,
    /// Exported function names
    pub exports: Vec<String>,
}

impl MemoryLibrary {
    /// Creates a library exporting `exports`
    pub fn new<I, S>(name: impl Into<String>, exports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            exports: exports.into_iter().map(Into::into).collect(),
        }
    }
}

/// One call inserted through a memory session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedInsertion {
    /// Function whose points received the call
    pub function: String,
    /// Name of the called hook
    pub hook: String,
    /// Literal argument passed to the hook
    pub literal: String,
    /// Point kind the call was attached to
    pub kind: PointKind,
    /// Placement relative to the points
    pub placement: CallPlacement,
    /// Number of points covered
    pub points: usize,
}

/// Everything the engine observed, shared by all of its sessions
#[derive(Debug, Clone, Default)]
pub struct EngineLog {
    /// Artifacts opened, in order
    pub opened: Vec<PathBuf>,
    /// Libraries successfully loaded, in order
    pub loaded: Vec<String>,
    /// Successful insertions, in order
    pub insertions: Vec<RecordedInsertion>,
    /// Output paths successfully written
    pub writes: Vec<PathBuf>,
    /// Sessions opened and not yet dropped
    pub open_sessions: usize,
}

impl EngineLog {
    /// Insertions that targeted `function`
    pub fn insertions_for<'a>(
        &'a self,
        function: &'a str,
    ) -> impl Iterator<Item = &'a RecordedInsertion> + 'a {
        self.insertions.iter().filter(move |i| i.function == function)
    }
}

/// Engine serving scripted in-memory artifacts
#[derive(Debug, Default)]
pub struct MemoryEngine {
    artifacts: HashMap<PathBuf, MemoryArtifact>,
    libraries: HashMap<String, MemoryLibrary>,
    rejected: HashSet<(String, PointKind)>,
    fail_writes: bool,
    log: Rc<RefCell<EngineLog>>,
}

impl MemoryEngine {
    /// Creates an engine that knows no artifacts
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an artifact under `path`
    pub fn with_artifact(mut self, path: impl Into<PathBuf>, artifact: MemoryArtifact) -> Self {
        self.artifacts.insert(path.into(), artifact);
        self
    }

    /// Makes a library available to `load_library`
    pub fn with_library(mut self, library: MemoryLibrary) -> Self {
        self.libraries.insert(library.name.clone(), library);
        self
    }

    /// Rejects every insertion at `kind` points of `function`
    pub fn reject_insertion(mut self, function: impl Into<String>, kind: PointKind) -> Self {
        self.rejected.insert((function.into(), kind));
        self
    }

    /// Makes every write fail
    pub fn fail_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Snapshot of everything observed so far
    pub fn log(&self) -> EngineLog {
        self.log.borrow().clone()
    }
}

impl Engine for MemoryEngine {
    type Session = MemorySession;

    fn name(&self) -> &str {
        "memory"
    }

    fn open(&self, path: &Path) -> Result<MemorySession, EngineError> {
        let artifact = self
            .artifacts
            .get(path)
            .cloned()
            .ok_or_else(|| EngineError::not_found(path.display().to_string()))?;

        {
            let mut log = self.log.borrow_mut();
            log.opened.push(path.to_path_buf());
            log.open_sessions += 1;
        }

        Ok(MemorySession {
            modules: artifact.modules,
            libraries: self.libraries.clone(),
            rejected: self.rejected.clone(),
            fail_writes: self.fail_writes,
            log: Rc::clone(&self.log),
            loaded: Vec::new(),
            inserted: Vec::new(),
            next_handle: 0,
        })
    }
}

/// Function handle of a memory session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryFunctionRef {
    module: usize,
    index: usize,
}

/// Point handle of a memory session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryPoint {
    function: MemoryFunctionRef,
    kind: PointKind,
    index: usize,
}

/// Editing session over a cloned [`MemoryArtifact`]
#[derive(Debug)]
pub struct MemorySession {
    modules: Vec<MemoryModule>,
    libraries: HashMap<String, MemoryLibrary>,
    rejected: HashSet<(String, PointKind)>,
    fail_writes: bool,
    log: Rc<RefCell<EngineLog>>,
    loaded: Vec<String>,
    inserted: Vec<RecordedInsertion>,
    next_handle: u64,
}

impl MemorySession {
    fn function(&self, function: &MemoryFunctionRef) -> &MemoryFunction {
        &self.modules[function.module].functions[function.index]
    }
}

impl Session for MemorySession {
    type Module = usize;
    type Function = MemoryFunctionRef;
    type Point = MemoryPoint;

    fn load_library(&mut self, name: &str) -> Result<(), EngineError> {
        let library = self
            .libraries
            .get(name)
            .ok_or_else(|| EngineError::not_found(name))?;

        // A loaded library joins the image as one more module
        let module = MemoryModule::shared_library(&library.name).with_functions(library.exports.clone());
        self.modules.push(module);
        self.loaded.push(name.to_string());
        self.log.borrow_mut().loaded.push(name.to_string());
        Ok(())
    }

    fn find_function(&self, name: &str) -> Option<MemoryFunctionRef> {
        self.modules.iter().enumerate().find_map(|(module, m)| {
            m.functions
                .iter()
                .position(|f| f.name == name)
                .map(|index| MemoryFunctionRef { module, index })
        })
    }

    fn modules(&self) -> Vec<usize> {
        (0..self.modules.len()).collect()
    }

    fn module_name(&self, module: &usize) -> String {
        self.modules[*module].name.clone()
    }

    fn is_shared_library(&self, module: &usize) -> bool {
        self.modules[*module].shared_library
    }

    fn functions(&self, module: &usize) -> Vec<MemoryFunctionRef> {
        (0..self.modules[*module].functions.len())
            .map(|index| MemoryFunctionRef {
                module: *module,
                index,
            })
            .collect()
    }

    fn function_name(&self, function: &MemoryFunctionRef) -> String {
        self.function(function).name.clone()
    }

    fn find_points(&self, function: &MemoryFunctionRef, kind: PointKind) -> Vec<MemoryPoint> {
        let f = self.function(function);
        let count = match kind {
            PointKind::Entry => f.entry_points,
            PointKind::Exit => f.exit_points,
        };
        (0..count)
            .map(|index| MemoryPoint {
                function: *function,
                kind,
                index,
            })
            .collect()
    }

    fn insert_call(
        &mut self,
        hook: &MemoryFunctionRef,
        literal: &str,
        points: &[MemoryPoint],
        placement: CallPlacement,
    ) -> Result<SnippetHandle, EngineError> {
        let Some(first) = points.first() else {
            return Err(EngineError::rejected("no points to insert at"));
        };

        let target = self.function(&first.function).name.clone();
        if self.rejected.contains(&(target.clone(), first.kind)) {
            return Err(EngineError::rejected(format!(
                "insertion refused at {} of {}",
                first.kind, target
            )));
        }

        let hook = self.function(hook).name.clone();
        trace!("memory: {} {}({:?}) at {} point(s)", placement.as_str(), hook, literal, points.len());

        let insertion = RecordedInsertion {
            function: target,
            hook,
            literal: literal.to_string(),
            kind: first.kind,
            placement,
            points: points.len(),
        };
        self.log.borrow_mut().insertions.push(insertion.clone());
        self.inserted.push(insertion);

        self.next_handle += 1;
        Ok(SnippetHandle(self.next_handle))
    }

    fn write(&mut self, path: &Path) -> Result<(), EngineError> {
        if self.fail_writes {
            return Err(EngineError::rejected("write refused"));
        }

        let mut listing = String::new();
        for library in &self.loaded {
            let _ = writeln!(listing, "needs\t{}", library);
        }
        for insertion in &self.inserted {
            let _ = writeln!(
                listing,
                "{}\t{}\t{}\t{}",
                insertion.placement.as_str(),
                insertion.hook,
                insertion.function,
                insertion.literal
            );
        }

        std::fs::write(path, listing)?;
        self.log.borrow_mut().writes.push(path.to_path_buf());
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        let mut log = self.log.borrow_mut();
        log.open_sessions = log.open_sessions.saturating_sub(1);
    }
}
