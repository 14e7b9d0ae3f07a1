//! Probe bindings: which hook is called where, with which literal.

use super::functions::FunctionInfo;
use crate::engine::{CallPlacement, PointKind};

/// A hook routine resolved inside the artifact's image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook<F> {
    /// Name the hook was resolved by
    pub name: String,
    /// Engine handle of the routine
    pub handle: F,
}

/// The entry and exit hooks of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHooks<F> {
    /// Called before every function entry point
    pub entry: Hook<F>,
    /// Called after every function exit point
    pub exit: Hook<F>,
}

impl<F> ProbeHooks<F> {
    /// Hook serving points of `kind`
    pub fn for_kind(&self, kind: PointKind) -> &Hook<F> {
        match kind {
            PointKind::Entry => &self.entry,
            PointKind::Exit => &self.exit,
        }
    }
}

/// One planned probe call: `hook(literal)` at the `kind` points of a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeBinding {
    /// Side of the function the call is attached to
    pub kind: PointKind,
    /// Name of the called hook
    pub hook: String,
    /// Literal string argument, the function's name
    pub literal: String,
}

impl ProbeBinding {
    /// Placement of the call relative to its points
    pub fn placement(&self) -> CallPlacement {
        CallPlacement::for_kind(self.kind)
    }
}

/// Entry and exit bindings of one function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbePair {
    /// Binding for the entry points
    pub entry: ProbeBinding,
    /// Binding for the exit points
    pub exit: ProbeBinding,
}

/// Builds probe bindings against a fixed pair of hooks
#[derive(Debug, Clone, Copy)]
pub struct ProbeBinder<'h, F> {
    hooks: &'h ProbeHooks<F>,
}

impl<'h, F> ProbeBinder<'h, F> {
    /// Creates a binder for `hooks`
    pub fn new(hooks: &'h ProbeHooks<F>) -> Self {
        Self { hooks }
    }

    /// Binds both hooks to `function`, passing its name verbatim
    pub fn bind<G>(&self, function: &FunctionInfo<G>) -> ProbePair {
        ProbePair {
            entry: self.binding(PointKind::Entry, &function.name),
            exit: self.binding(PointKind::Exit, &function.name),
        }
    }

    fn binding(&self, kind: PointKind, name: &str) -> ProbeBinding {
        ProbeBinding {
            kind,
            hook: self.hooks.for_kind(kind).name.clone(),
            literal: name.to_string(),
        }
    }
}
