//! Build command - primary application archive plus native placement

use super::{display_path, gated, pipeline, print_json};
use crate::GlobalArgs;
use anyhow::{Context, Result};

/// Run the build command
pub fn run(args: &GlobalArgs, test_first: bool) -> Result<()> {
    let pipeline = pipeline(args)?;
    let build = gated(&pipeline, test_first, |p| p.build_primary()).context("Build failed")?;

    if args.json {
        return print_json(&build);
    }

    if !args.quiet {
        println!(
            "Built {} ({}) -> {}",
            build.archive.entry_point,
            build.archive.mode,
            display_path(&build.archive.path).display()
        );
        for native in build.natives.iter().filter(|n| n.copied) {
            println!("  placed {}", display_path(&native.destination).display());
        }
        if !build.archive.report.missing_inputs.is_empty() {
            println!(
                "  {} classpath entries were missing",
                build.archive.report.missing_inputs.len()
            );
        }
    }
    Ok(())
}
