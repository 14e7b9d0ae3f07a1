//! Run configuration.
//!
//! [`InstrumentConfig`] is built once from parsed arguments, validated, and
//! then only ever read by the orchestrator.

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Library that provides the probe hooks
pub const DEFAULT_PROBE_LIBRARY: &str = "libInst.so";

/// Hook called on function entry
pub const DEFAULT_ENTRY_HOOK: &str = "FEntryCoverage";

/// Hook called on function exit
pub const DEFAULT_EXIT_HOOK: &str = "FExitCoverage";

/// Libraries that are never instrumented: the probe library itself, the C and
/// C++ runtimes and the dynamic loaders
pub const DEFAULT_SKIP_LIBRARIES: &[&str] = &[
    "libInst.so",
    "libc.so.6",
    "libc.so.7",
    "ld-2.5.so",
    "ld-linux.so.2",
    "ld-lsb.so.3",
    "ld-linux-x86-64.so.2",
    "ld-lsb-x86-64.so",
    "ld-elf.so.1",
    "ld-elf32.so.1",
    "libstdc++.so.6",
];

/// What to do when a single function cannot be instrumented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the run on the first failing function
    #[default]
    FailFast,
    /// Process every function, then fail the run listing all failures
    Accumulate,
}

/// Immutable configuration of one instrumentation run
#[derive(Debug, Clone)]
pub struct InstrumentConfig {
    /// Artifact to open
    pub input: PathBuf,
    /// Where the rewritten artifact goes
    pub output: PathBuf,
    /// Identity of the module to instrument, matched by basename.
    /// Defaults to the input path.
    pub target: Option<String>,
    /// Library loaded into the artifact to provide the hooks
    pub probe_library: String,
    /// Name of the entry hook
    pub entry_hook: String,
    /// Name of the exit hook
    pub exit_hook: String,
    /// Module basenames that are never selected
    pub skip_libraries: BTreeSet<String>,
    /// Reserved: instrument every linked shared library as well. No effect yet.
    pub include_shared_libs: bool,
    /// Per-function failure handling
    pub failure_policy: FailurePolicy,
}

impl InstrumentConfig {
    /// Creates a config with default hooks, probe library and skip list
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            target: None,
            probe_library: DEFAULT_PROBE_LIBRARY.to_string(),
            entry_hook: DEFAULT_ENTRY_HOOK.to_string(),
            exit_hook: DEFAULT_EXIT_HOOK.to_string(),
            skip_libraries: DEFAULT_SKIP_LIBRARIES.iter().map(|s| s.to_string()).collect(),
            include_shared_libs: false,
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Sets the target identity
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Sets the probe library name
    pub fn probe_library(mut self, name: impl Into<String>) -> Self {
        self.probe_library = name.into();
        self
    }

    /// Sets both hook names
    pub fn hooks(mut self, entry: impl Into<String>, exit: impl Into<String>) -> Self {
        self.entry_hook = entry.into();
        self.exit_hook = exit.into();
        self
    }

    /// Replaces the skip list
    pub fn skip_libraries<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_libraries = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the reserved include-all-shared-libraries flag
    pub fn include_shared_libs(mut self, include: bool) -> Self {
        self.include_shared_libs = include;
        self
    }

    /// Sets the failure policy
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// The identity modules are matched against
    pub fn target_identity(&self) -> String {
        match &self.target {
            Some(target) => target.clone(),
            None => self.input.to_string_lossy().into_owned(),
        }
    }

    /// Checks the config before any engine interaction
    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            return Err(Error::config("input artifact not specified"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(Error::config("output artifact not specified"));
        }
        if same_path(&self.input, &self.output) {
            return Err(Error::config(format!(
                "output would overwrite the input artifact '{}'",
                self.input.display()
            )));
        }
        if self.probe_library.trim().is_empty() {
            return Err(Error::config("probe library name is empty"));
        }
        if self.entry_hook.trim().is_empty() || self.exit_hook.trim().is_empty() {
            return Err(Error::config("hook names must not be empty"));
        }
        if self.target_identity().trim().is_empty() {
            return Err(Error::config("target identity is empty"));
        }
        Ok(())
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
