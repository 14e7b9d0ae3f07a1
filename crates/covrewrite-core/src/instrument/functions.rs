//! Function enumeration for the selected module.

use crate::engine::Session;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A function of the selected module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo<F> {
    /// Engine handle
    pub handle: F,
    /// Name exactly as the engine reports it
    pub name: String,
}

/// Lists every function of `module`, in engine order
pub fn enumerate_functions<S: Session>(
    session: &S,
    module: &S::Module,
) -> Vec<FunctionInfo<S::Function>> {
    let functions: Vec<_> = session
        .functions(module)
        .into_iter()
        .map(|handle| FunctionInfo {
            name: session.function_name(&handle),
            handle,
        })
        .collect();

    debug!("Module has {} function(s)", functions.len());

    for name in duplicate_names(&functions) {
        warn!(
            "Function name {} occurs more than once; its coverage records will be merged",
            name
        );
    }

    functions
}

/// Names shared by more than one function, sorted
pub fn duplicate_names<F>(functions: &[FunctionInfo<F>]) -> Vec<&str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for function in functions {
        *counts.entry(function.name.as_str()).or_default() += 1;
    }

    let mut duplicates: Vec<&str> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name)
        .collect();
    duplicates.sort_unstable();
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{MemoryArtifact, MemoryEngine, MemoryModule};
    use crate::engine::Engine;
    use std::collections::BTreeSet;
    use std::path::Path;

    #[test]
    fn test_enumerates_every_function() {
        let engine = MemoryEngine::new().with_artifact(
            "app",
            MemoryArtifact::new()
                .with_module(MemoryModule::program("app").with_functions(["main"]))
                .with_module(MemoryModule::shared_library("A.so").with_functions(["f1", "f2", "f3"])),
        );
        let session = engine.open(Path::new("app")).unwrap();

        let names: BTreeSet<String> = enumerate_functions(&session, &1)
            .into_iter()
            .map(|f| f.name)
            .collect();
        let expected: BTreeSet<String> = ["f1", "f2", "f3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_empty_module() {
        let engine = MemoryEngine::new().with_artifact(
            "lib.so",
            MemoryArtifact::new().with_module(MemoryModule::shared_library("lib.so")),
        );
        let session = engine.open(Path::new("lib.so")).unwrap();
        assert!(enumerate_functions(&session, &0).is_empty());
    }

    #[test]
    fn test_duplicate_names() {
        let functions: Vec<FunctionInfo<()>> = ["b", "a", "b", "c", "a"]
            .iter()
            .map(|name| FunctionInfo {
                handle: (),
                name: name.to_string(),
            })
            .collect();
        assert_eq!(duplicate_names(&functions), vec!["a", "b"]);
    }
}
