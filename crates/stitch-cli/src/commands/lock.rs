//! Lock command - refresh checksums in stitch.lock

use super::{display_path, load_config, print_json};
use crate::GlobalArgs;
use anyhow::{Context, Result};
use stitch_package::Lockfile;

pub fn run(args: &GlobalArgs) -> Result<()> {
    let config = load_config(args)?;
    let path = config.lockfile_path();

    let mut lockfile = Lockfile::from_file(&path)
        .with_context(|| format!("Failed to read lockfile {}", path.display()))?;
    let updated = lockfile
        .refresh_checksums(config.project_root())
        .context("Failed to compute checksums")?;
    lockfile
        .write_to_file(&path)
        .with_context(|| format!("Failed to write lockfile {}", path.display()))?;

    if args.json {
        return print_json(&serde_json::json!({
            "lockfile": path,
            "checksums": updated,
            "generated_at": lockfile.metadata.generated_at,
        }));
    }
    if !args.quiet {
        println!(
            "Updated {} checksums in {}",
            updated,
            display_path(&path).display()
        );
    }
    Ok(())
}
