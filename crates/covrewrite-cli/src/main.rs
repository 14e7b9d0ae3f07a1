//! covrewrite - Statically insert coverage probes into a shared library
//!
//! This tool rewrites a compiled artifact so that every function of the
//! target shared library calls an entry hook and an exit hook, each passed
//! the function's name. The hooks live in a separately loaded probe library
//! that records coverage when the rewritten artifact runs.

use anyhow::{Context, Result};
use clap::Parser;
use covrewrite_core::config::{DEFAULT_ENTRY_HOOK, DEFAULT_EXIT_HOOK, DEFAULT_PROBE_LIBRARY};
use covrewrite_core::engine::elf::ElfEngine;
use covrewrite_core::{FailurePolicy, InstrumentConfig, Instrumenter, RunResult, Selection};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

/// Statically insert coverage probes into every function of a shared library
#[derive(Parser, Debug)]
#[command(name = "covrewrite")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Artifact to instrument
    input: PathBuf,

    /// Where to write the rewritten artifact
    output: PathBuf,

    /// Also instrument every linked shared library (reserved, currently no effect)
    #[arg(short = 's', long = "shared-libs")]
    shared_libs: bool,

    /// Module to instrument, matched by file name [default: the input's file name]
    #[arg(short, long)]
    target: Option<String>,

    /// Library providing the probe hooks
    #[arg(long, env = "COVREWRITE_PROBE_LIBRARY", default_value = DEFAULT_PROBE_LIBRARY)]
    probe_library: String,

    /// Hook called on every function entry
    #[arg(long, env = "COVREWRITE_ENTRY_HOOK", default_value = DEFAULT_ENTRY_HOOK)]
    entry_hook: String,

    /// Hook called on every function exit
    #[arg(long, env = "COVREWRITE_EXIT_HOOK", default_value = DEFAULT_EXIT_HOOK)]
    exit_hook: String,

    /// Directory searched for the probe library (repeatable, or `:`-separated)
    #[arg(
        short = 'L',
        long = "library-path",
        env = "COVREWRITE_LIBRARY_PATH",
        value_delimiter = ':'
    )]
    library_path: Vec<PathBuf>,

    /// Additional library file name that must never be instrumented
    #[arg(long = "skip", value_name = "LIBRARY")]
    skip: Vec<String>,

    /// Attempt every function and report all failures instead of stopping at the first
    #[arg(long)]
    keep_going: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    println!(
        "Instrumenting {}, output {}",
        cli.input.display(),
        cli.output.display()
    );

    let config = build_config(&cli);
    let search_dirs = library_search_dirs(&cli.library_path, &cli.input, env::var_os("LD_LIBRARY_PATH"));
    debug!("Probe library search path: {:?}", search_dirs);

    let engine = ElfEngine::new(search_dirs);
    let result = Instrumenter::new(engine, &config)
        .run()
        .with_context(|| format!("Failed to instrument {}", cli.input.display()))?;

    println!("{}", summary(&result));
    Ok(())
}

/// Build the immutable run configuration from parsed arguments
fn build_config(cli: &Cli) -> InstrumentConfig {
    let mut config = InstrumentConfig::new(&cli.input, &cli.output)
        .probe_library(&cli.probe_library)
        .hooks(&cli.entry_hook, &cli.exit_hook)
        .include_shared_libs(cli.shared_libs)
        .failure_policy(if cli.keep_going {
            FailurePolicy::Accumulate
        } else {
            FailurePolicy::FailFast
        });

    if let Some(target) = &cli.target {
        config = config.target(target);
    }
    config.skip_libraries.extend(cli.skip.iter().cloned());
    config
}

/// Explicit directories first, then `LD_LIBRARY_PATH`, then the input's directory
fn library_search_dirs(
    explicit: &[PathBuf],
    input: &Path,
    ld_library_path: Option<std::ffi::OsString>,
) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = explicit.to_vec();

    if let Some(paths) = ld_library_path {
        dirs.extend(env::split_paths(&paths).filter(|p| !p.as_os_str().is_empty()));
    }

    if let Some(parent) = input.parent().filter(|p| !p.as_os_str().is_empty()) {
        dirs.push(parent.to_path_buf());
    }

    let mut seen = std::collections::HashSet::new();
    dirs.retain(|dir| seen.insert(dir.clone()));
    dirs
}

/// One-line confirmation printed on success
fn summary(result: &RunResult) -> String {
    match &result.selection {
        Selection::Instrumented { module } => format!(
            "Instrumented {} function(s) in {}, wrote {}",
            result.functions_processed(),
            module,
            result.output.display()
        ),
        Selection::NoMatch { target } => format!(
            "No module named {} found, wrote {} without instrumentation",
            target,
            result.output.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covrewrite_core::instrument::{ProbeBinding, ProbePair};
    use covrewrite_core::{InstrumentedFunction, PointKind};
    use std::ffi::OsString;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("covrewrite").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_missing_output_is_rejected() {
        assert!(Cli::try_parse_from(["covrewrite", "libA.so"]).is_err());
        assert!(Cli::try_parse_from(["covrewrite"]).is_err());
    }

    #[test]
    fn test_build_config_defaults() {
        let cli = parse(&["-s", "/opt/lib/libA.so", "out.so"]);
        let config = build_config(&cli);

        assert!(config.include_shared_libs);
        assert_eq!(config.target_identity(), "/opt/lib/libA.so");
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert!(config.skip_libraries.contains("libInst.so"));
    }

    #[test]
    fn test_build_config_overrides() {
        let cli = parse(&[
            "--target",
            "libB.so",
            "--keep-going",
            "--skip",
            "libz.so.1",
            "--entry-hook",
            "enter",
            "--exit-hook",
            "leave",
            "app",
            "app.cov",
        ]);
        let config = build_config(&cli);

        assert_eq!(config.target_identity(), "libB.so");
        assert_eq!(config.failure_policy, FailurePolicy::Accumulate);
        assert!(config.skip_libraries.contains("libz.so.1"));
        assert!(config.skip_libraries.contains("libc.so.6"));
        assert_eq!(config.entry_hook, "enter");
        assert_eq!(config.exit_hook, "leave");
    }

    #[test]
    fn test_library_search_dirs_order() {
        let dirs = library_search_dirs(
            &[PathBuf::from("/probes")],
            Path::new("/opt/app/libA.so"),
            Some(OsString::from("/usr/local/lib::/probes")),
        );
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/probes"),
                PathBuf::from("/usr/local/lib"),
                PathBuf::from("/opt/app"),
            ]
        );

        assert!(library_search_dirs(&[], Path::new("libA.so"), None).is_empty());
    }

    #[test]
    fn test_summary() {
        let binding = |kind, hook: &str| ProbeBinding {
            kind,
            hook: hook.to_string(),
            literal: "f1".to_string(),
        };
        let result = RunResult {
            selection: Selection::Instrumented {
                module: "libA.so".into(),
            },
            functions: vec![InstrumentedFunction {
                name: "f1".into(),
                probes: ProbePair {
                    entry: binding(PointKind::Entry, "FEntryCoverage"),
                    exit: binding(PointKind::Exit, "FExitCoverage"),
                },
                entry_points: 1,
                exit_points: 2,
            }],
            library_loaded: true,
            output: PathBuf::from("out.so"),
        };
        assert_eq!(
            summary(&result),
            "Instrumented 1 function(s) in libA.so, wrote out.so"
        );
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
