//! Jar command - archives for selected entry points

use super::{display_path, gated, pipeline, print_json};
use crate::GlobalArgs;
use anyhow::{Context, Result};

/// Run the jar command.
///
/// Every requested entry point is attempted; a failed one is reported and
/// the command fails only after the rest have been built.
pub fn run(args: &GlobalArgs, entries: &[String], all: bool, test_first: bool) -> Result<()> {
    let pipeline = pipeline(args)?;
    let report = gated(&pipeline, test_first, |p| {
        if all {
            p.assemble_all_entry_points()
        } else {
            p.assemble_entry_points(entries)
        }
    })
    .context("Assembly failed")?;

    if args.json {
        let results: Vec<_> = report
            .results
            .iter()
            .map(|(name, result)| match result {
                Ok(build) => serde_json::json!({
                    "entry_point": name,
                    "status": "built",
                    "archive": build.archive,
                    "natives": build.natives,
                }),
                Err(err) => serde_json::json!({
                    "entry_point": name,
                    "status": "failed",
                    "error": err.to_string(),
                }),
            })
            .collect();
        print_json(&results)?;
    } else if !args.quiet {
        for (name, result) in &report.results {
            match result {
                Ok(build) => {
                    let summary = &build.archive.report;
                    println!(
                        "{:<16} {:<4} {} ({} files, {} duplicates skipped, {} signatures stripped)",
                        name,
                        build.archive.mode,
                        display_path(&build.archive.path).display(),
                        summary.files_written,
                        summary.duplicates_skipped,
                        summary.signatures_stripped
                    );
                }
                Err(err) => println!("{:<16} failed: {}", name, err),
            }
        }
    }

    report.into_result().context("Assembly failed")?;
    Ok(())
}
