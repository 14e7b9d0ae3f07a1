//! Module selection.
//!
//! The module to instrument is the one whose display name has the same final
//! path segment as the target identity. Comparison is exact and
//! case-sensitive; `/` and `\` both count as separators.

use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, warn};

/// A module as seen by the selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCandidate<M> {
    /// Engine handle
    pub handle: M,
    /// Display name reported by the engine
    pub name: String,
    /// Whether the engine flags the module as a shared library
    pub shared_library: bool,
}

/// Why no module was selected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// No eligible module has the target's basename; not fatal
    #[error("no module matches '{target}'")]
    NoMatch {
        /// Basename that was searched for
        target: String,
    },

    /// The matching module is not a shared library; fatal
    #[error("module '{module}' is not a shared library")]
    NotInstrumentable {
        /// Display name of the module
        module: String,
    },
}

/// Final path segment of `path`, accepting both `/` and `\` separators
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Picks the single module to instrument
#[derive(Debug, Clone, Copy)]
pub struct ModuleSelector<'a> {
    skip: &'a BTreeSet<String>,
}

impl<'a> ModuleSelector<'a> {
    /// Creates a selector that never picks modules named in `skip`
    pub fn new(skip: &'a BTreeSet<String>) -> Self {
        Self { skip }
    }

    /// Selects the first module whose basename equals the target's basename
    pub fn select<'m, M>(
        &self,
        modules: &'m [ModuleCandidate<M>],
        target: &str,
    ) -> Result<&'m ModuleCandidate<M>, SelectionError> {
        let wanted = basename(target);

        for module in modules {
            let name = basename(&module.name);
            debug!("module {}, target {}", module.name, wanted);

            if name != wanted {
                continue;
            }
            if self.skip.contains(name) {
                warn!("Module {} is on the skip list, not instrumenting it", module.name);
                continue;
            }
            if !module.shared_library {
                return Err(SelectionError::NotInstrumentable {
                    module: module.name.clone(),
                });
            }
            return Ok(module);
        }

        Err(SelectionError::NoMatch {
            target: wanted.to_string(),
        })
    }
}
