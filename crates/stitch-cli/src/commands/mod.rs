//! Command implementations and the plumbing they share

pub mod build;
pub mod collect;
pub mod jar;
pub mod lock;
pub mod order;
pub mod run;
pub mod test;

use crate::GlobalArgs;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use stitch_build::{BuildError, BuildResult, ErrorCategory, Pipeline, ProcessExecutor};
use stitch_config::{Config, ConfigError, ConfigLoader};
use stitch_package::PackageError;
use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber.
///
/// `-q` and `-v` pick a fixed level; otherwise `RUST_LOG` applies, falling
/// back to `info`.
pub fn init_logging(args: &GlobalArgs) {
    let filter = match (args.quiet, args.verbose) {
        (true, _) => EnvFilter::new("error"),
        (false, 0) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        (false, 1) => EnvFilter::new("debug"),
        (false, _) => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load configuration, applying command-line overrides
pub fn load_config(args: &GlobalArgs) -> Result<Config> {
    let start = match &args.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    let mut config = ConfigLoader::new()
        .load_from_directory(&start)
        .with_context(|| format!("Failed to load project configuration from {}", start.display()))?;

    if !args.platforms.is_empty() {
        config.platform_override = Some(args.platforms.clone());
    }
    Ok(config)
}

/// Load configuration and build the pipeline
pub fn pipeline(args: &GlobalArgs) -> Result<Pipeline> {
    let config = load_config(args)?;
    Pipeline::from_config(&config).context("Invalid project")
}

/// Run `step`, first passing the default test suite through the gate when
/// `test_first` is set
pub fn gated<T>(
    pipeline: &Pipeline,
    test_first: bool,
    step: impl FnOnce(&Pipeline) -> BuildResult<T>,
) -> BuildResult<T> {
    if !test_first {
        return step(pipeline);
    }
    let mut gate = pipeline.test_gate();
    pipeline.verify_then(&mut gate, &ProcessExecutor, step)
}

/// Exit status of a failed command, picked from the first classified error
/// in the chain: 3 configuration, 4 resolution, 5 tests, 1 anything else
pub fn exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        let category = if let Some(err) = cause.downcast_ref::<BuildError>() {
            err.category()
        } else if cause.downcast_ref::<ConfigError>().is_some() {
            ErrorCategory::Configuration
        } else if let Some(err) = cause.downcast_ref::<PackageError>() {
            match err {
                e if e.is_configuration() => ErrorCategory::Configuration,
                PackageError::IoError { .. } => ErrorCategory::Io,
                _ => ErrorCategory::Resolution,
            }
        } else {
            continue;
        };
        return match category {
            ErrorCategory::Configuration => 3,
            ErrorCategory::Resolution => 4,
            ErrorCategory::Test => 5,
            ErrorCategory::Io => 1,
        };
    }
    1
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

/// Path relative to the current directory when possible, for display
pub fn display_path(path: &std::path::Path) -> PathBuf {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(PathBuf::from))
        .unwrap_or_else(|| path.to_path_buf())
}
