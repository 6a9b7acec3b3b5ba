//! Run command - launch an entry point as a standalone tool

use super::pipeline;
use crate::GlobalArgs;
use anyhow::{Context, Result};

/// Launch `entry`; returns the tool's exit code
pub fn run(args: &GlobalArgs, entry: &str, tool_args: &str) -> Result<i32> {
    let pipeline = pipeline(args)?;
    let launcher = pipeline.launcher(entry, tool_args)?;
    let status = launcher
        .run()
        .with_context(|| format!("Failed to launch '{}'", entry))?;
    // terminated by a signal
    Ok(status.code().unwrap_or(1))
}
