//! Order command - subproject build order and parallel layers

use super::{load_config, print_json};
use crate::GlobalArgs;
use anyhow::Result;
use stitch_build::{BuildGraph, SubprojectNode};

pub fn run(args: &GlobalArgs) -> Result<()> {
    let config = load_config(args)?;

    let mut graph = BuildGraph::new();
    for sub in &config.project.subprojects {
        graph.add_subproject(
            SubprojectNode::new(&sub.name, config.resolve_path(&sub.classes))
                .with_dependencies(sub.depends_on.iter().cloned()),
        );
    }
    graph.validate()?;

    let order = graph.compute_build_order()?;
    let layers = graph.parallel_build_groups()?;

    if args.json {
        return print_json(&serde_json::json!({
            "order": order,
            "layers": layers,
        }));
    }

    for (i, name) in order.iter().enumerate() {
        let deps = graph
            .get(name)
            .map(|n| n.dependencies.join(", "))
            .unwrap_or_default();
        if deps.is_empty() {
            println!("{:>3}. {}", i + 1, name);
        } else {
            println!("{:>3}. {} (after {})", i + 1, name, deps);
        }
    }
    if !args.quiet {
        println!();
        for (i, layer) in layers.iter().enumerate() {
            println!("layer {}: {}", i + 1, layer.join(" "));
        }
    }
    Ok(())
}
