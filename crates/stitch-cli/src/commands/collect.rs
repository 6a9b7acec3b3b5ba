//! Collect command

use super::{display_path, gated, pipeline, print_json};
use crate::GlobalArgs;
use anyhow::{Context, Result};

pub fn run(args: &GlobalArgs, test_first: bool) -> Result<()> {
    let pipeline = pipeline(args)?;
    let collected = gated(&pipeline, test_first, |p| p.collect()).context("Collect failed")?;

    if args.json {
        return print_json(&collected);
    }
    if !args.quiet {
        println!(
            "Collected {} files into {}",
            collected.report.files_written,
            display_path(&collected.archive).display()
        );
    }
    Ok(())
}
