//! Build order property tests

use proptest::prelude::*;
use std::collections::HashMap;
use stitch_build::{BuildError, BuildGraph, SubprojectNode};

/// Random DAG: node `i` may only depend on nodes with a smaller index
fn arb_dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..12).prop_flat_map(|n| {
        (0..n)
            .map(|i| proptest::collection::vec(0..i.max(1), 0..=i.min(4)))
            .collect::<Vec<_>>()
    })
}

fn to_graph(edges: &[Vec<usize>]) -> BuildGraph {
    let mut graph = BuildGraph::new();
    for (i, deps) in edges.iter().enumerate() {
        let deps: Vec<String> = deps
            .iter()
            .filter(|d| **d < i)
            .map(|d| format!("sub{:02}", d))
            .collect();
        graph.add_subproject(
            SubprojectNode::new(format!("sub{:02}", i), format!("sub{:02}/classes", i))
                .with_dependencies(deps),
        );
    }
    graph
}

proptest! {
    #[test]
    fn order_respects_every_edge(edges in arb_dag()) {
        let graph = to_graph(&edges);
        let order = graph.compute_build_order().unwrap();
        prop_assert_eq!(order.len(), graph.len());

        let position: HashMap<&str, usize> =
            order.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();
        for node in graph.subprojects() {
            for dep in &node.dependencies {
                prop_assert!(position[dep.as_str()] < position[node.name.as_str()]);
            }
        }
    }

    #[test]
    fn layers_only_depend_on_earlier_layers(edges in arb_dag()) {
        let graph = to_graph(&edges);
        let layers = graph.parallel_build_groups().unwrap();

        let mut layer_of = HashMap::new();
        for (i, layer) in layers.iter().enumerate() {
            for name in layer {
                layer_of.insert(name.clone(), i);
            }
        }
        prop_assert_eq!(layer_of.len(), graph.len());
        for node in graph.subprojects() {
            for dep in &node.dependencies {
                prop_assert!(layer_of[dep] < layer_of[&node.name]);
            }
        }
    }

    #[test]
    fn order_is_deterministic(edges in arb_dag()) {
        let graph = to_graph(&edges);
        prop_assert_eq!(graph.compute_build_order().unwrap(), graph.compute_build_order().unwrap());
    }

    #[test]
    fn back_edge_is_always_a_cycle(edges in arb_dag()) {
        let mut graph = to_graph(&edges);
        let n = graph.len();
        // first and last depend on each other (a self edge when they coincide)
        let first = "sub00".to_string();
        let last = format!("sub{:02}", n - 1);
        graph.add_subproject(SubprojectNode::new(&first, "c").with_dependencies([last.clone()]));
        let last_deps = {
            let mut deps = graph.get(&last).unwrap().dependencies.clone();
            deps.push(first.clone());
            deps
        };
        graph.add_subproject(SubprojectNode::new(&last, "c").with_dependencies(last_deps));

        prop_assert!(matches!(
            graph.compute_build_order(),
            Err(BuildError::CircularDependency(_))
        ));
    }
}
