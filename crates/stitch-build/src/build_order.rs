//! Build order computation for subprojects using topological sort
use crate::error::{BuildError, BuildResult};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;

/// A subproject in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubprojectNode {
    /// Subproject name
    pub name: String,
    /// Compiled output directory
    pub classes_dir: PathBuf,
    /// Subprojects that must be built first, in declaration order
    pub dependencies: Vec<String>,
}

impl SubprojectNode {
    /// Create a new subproject node
    pub fn new(name: impl Into<String>, classes_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            classes_dir: classes_dir.into(),
            dependencies: Vec::new(),
        }
    }

    /// Add dependencies
    pub fn with_dependencies<S: Into<String>>(mut self, dependencies: impl IntoIterator<Item = S>) -> Self {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }
}

/// Explicit subproject dependency graph.
///
/// Nodes are kept sorted by name so every traversal, and therefore every
/// build order, is deterministic.
#[derive(Debug, Clone, Default)]
pub struct BuildGraph {
    subprojects: BTreeMap<String, SubprojectNode>,
}

impl BuildGraph {
    /// Create a new empty build graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subproject to the graph, replacing one with the same name
    pub fn add_subproject(&mut self, node: SubprojectNode) {
        self.subprojects.insert(node.name.clone(), node);
    }

    /// Get a subproject by name
    pub fn get(&self, name: &str) -> Option<&SubprojectNode> {
        self.subprojects.get(name)
    }

    /// Get a subproject by name or fail
    pub fn require(&self, name: &str) -> BuildResult<&SubprojectNode> {
        self.get(name)
            .ok_or_else(|| BuildError::subproject_not_found(name))
    }

    /// All subprojects, sorted by name
    pub fn subprojects(&self) -> impl Iterator<Item = &SubprojectNode> {
        self.subprojects.values()
    }

    pub fn len(&self) -> usize {
        self.subprojects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subprojects.is_empty()
    }

    /// Validate that every declared prerequisite exists and that the graph is acyclic
    pub fn validate(&self) -> BuildResult<()> {
        for (name, node) in &self.subprojects {
            for dep in &node.dependencies {
                if !self.subprojects.contains_key(dep) {
                    return Err(BuildError::subproject_not_found(format!(
                        "{} (required by {})",
                        dep, name
                    )));
                }
            }
        }
        self.compute_build_order().map(|_| ())
    }

    /// Compute topological build order using Kahn's algorithm.
    ///
    /// Among subprojects that are ready at the same time the lexicographically
    /// smallest name goes first. A cycle yields `CircularDependency` and no
    /// ordering at all.
    pub fn compute_build_order(&self) -> BuildResult<Vec<String>> {
        let mut remaining = self.in_degrees();
        let mut ready: BTreeSet<&str> = remaining
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut order = Vec::with_capacity(self.subprojects.len());

        while let Some(name) = ready.pop_first() {
            order.push(name.to_string());

            for (dependent, node) in &self.subprojects {
                let edges = node.dependencies.iter().filter(|d| *d == name).count();
                if edges == 0 {
                    continue;
                }
                if let Some(degree) = remaining.get_mut(dependent.as_str()) {
                    *degree -= edges;
                    if *degree == 0 {
                        ready.insert(dependent.as_str());
                    }
                }
            }
        }

        if order.len() != self.subprojects.len() {
            return Err(BuildError::CircularDependency(self.find_cycle()));
        }

        Ok(order)
    }

    /// Number of known prerequisites per subproject
    fn in_degrees(&self) -> BTreeMap<&str, usize> {
        self.subprojects
            .iter()
            .map(|(name, node)| {
                let known = node
                    .dependencies
                    .iter()
                    .filter(|d| self.subprojects.contains_key(*d))
                    .count();
                (name.as_str(), known)
            })
            .collect()
    }

    /// Group subprojects into layers that can be built concurrently.
    ///
    /// Every subproject in layer `n` depends only on subprojects in layers
    /// before `n`.
    pub fn parallel_build_groups(&self) -> BuildResult<Vec<Vec<String>>> {
        self.groups_for(self.subprojects.keys().cloned().collect())
    }

    /// Layers restricted to `names` (which must be closed under prerequisites)
    pub fn groups_for(&self, names: BTreeSet<String>) -> BuildResult<Vec<Vec<String>>> {
        let mut groups = Vec::new();
        let mut built: HashSet<String> = HashSet::new();

        loop {
            let group: Vec<String> = names
                .iter()
                .filter(|name| !built.contains(*name))
                .filter(|name| {
                    self.subprojects
                        .get(*name)
                        .map(|n| n.dependencies.iter().all(|d| built.contains(d)))
                        .unwrap_or(false)
                })
                .cloned()
                .collect();

            if group.is_empty() {
                break;
            }

            built.extend(group.iter().cloned());
            groups.push(group);
        }

        if built.len() != names.len() {
            return Err(BuildError::CircularDependency(self.find_cycle()));
        }

        Ok(groups)
    }

    /// Transitive prerequisites of `name` in build order, excluding `name`
    pub fn prerequisite_closure(&self, name: &str) -> BuildResult<Vec<String>> {
        self.require(name)?;

        let mut closure = BTreeSet::new();
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            let node = self.require(&current)?;
            for dep in &node.dependencies {
                if closure.insert(dep.clone()) {
                    stack.push(dep.clone());
                }
            }
        }

        if closure.contains(name) {
            return Err(BuildError::CircularDependency(self.find_cycle()));
        }

        let order = self.compute_build_order()?;
        Ok(order.into_iter().filter(|n| closure.contains(n)).collect())
    }

    /// Subprojects that depend on `name`, directly or transitively
    pub fn dependents_of(&self, name: &str) -> BTreeSet<String> {
        let mut dependents = BTreeSet::new();
        let mut frontier = vec![name.to_string()];
        while let Some(current) = frontier.pop() {
            for (candidate, node) in &self.subprojects {
                if node.dependencies.contains(&current) && dependents.insert(candidate.clone()) {
                    frontier.push(candidate.clone());
                }
            }
        }
        dependents
    }

    /// Find a cycle in the graph (for error reporting)
    fn find_cycle(&self) -> String {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for name in self.subprojects.keys() {
            if let Some(cycle) = self.dfs_find_cycle(name, &mut visited, &mut rec_stack, &mut path)
            {
                return cycle;
            }
        }

        "unknown cycle".to_string()
    }

    /// DFS to find a cycle
    fn dfs_find_cycle(
        &self,
        name: &str,
        visited: &mut HashSet<String>,
        rec_stack: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<String> {
        if rec_stack.contains(name) {
            let start = path.iter().position(|m| m == name).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(name.to_string());
            return Some(cycle.join(" -> "));
        }

        if !visited.insert(name.to_string()) {
            return None;
        }

        rec_stack.insert(name.to_string());
        path.push(name.to_string());

        if let Some(node) = self.subprojects.get(name) {
            for dep in &node.dependencies {
                if let Some(cycle) = self.dfs_find_cycle(dep, visited, rec_stack, path) {
                    return Some(cycle);
                }
            }
        }

        rec_stack.remove(name);
        path.pop();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(name: &str, deps: &[&str]) -> SubprojectNode {
        SubprojectNode::new(name, format!("{}/classes", name)).with_dependencies(deps.iter().copied())
    }

    fn graph(nodes: &[(&str, &[&str])]) -> BuildGraph {
        let mut graph = BuildGraph::new();
        for (name, deps) in nodes {
            graph.add_subproject(node(name, deps));
        }
        graph
    }

    #[test]
    fn test_empty_graph() {
        let graph = BuildGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.compute_build_order().unwrap(), Vec::<String>::new());
        assert!(graph.parallel_build_groups().unwrap().is_empty());
    }

    #[test]
    fn test_linear_dependency_chain() {
        let graph = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);
        assert_eq!(graph.compute_build_order().unwrap(), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_diamond_dependency_is_deterministic() {
        let graph = graph(&[
            ("desktop", &["editor-desktop", "jogl2"]),
            ("editor-desktop", &["common"]),
            ("jogl2", &["common"]),
            ("common", &[]),
        ]);

        let order = graph.compute_build_order().unwrap();
        assert_eq!(order, vec!["common", "editor-desktop", "jogl2", "desktop"]);
    }

    #[test]
    fn test_duplicate_edge_counts_once_per_occurrence() {
        let graph = graph(&[("a", &["b", "b"]), ("b", &[])]);
        assert_eq!(graph.compute_build_order().unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn test_circular_dependency_names_cycle() {
        let graph = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"]), ("d", &[])]);

        match graph.compute_build_order() {
            Err(BuildError::CircularDependency(cycle)) => {
                assert_eq!(cycle, "a -> b -> c -> a");
            }
            other => panic!("Expected CircularDependency error, got {:?}", other),
        }
    }

    #[test]
    fn test_self_cycle() {
        let graph = graph(&[("a", &["a"])]);
        match graph.compute_build_order() {
            Err(BuildError::CircularDependency(cycle)) => assert_eq!(cycle, "a -> a"),
            other => panic!("Expected CircularDependency error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_dependency() {
        let graph = graph(&[("a", &["nonexistent"])]);
        match graph.validate() {
            Err(BuildError::SubprojectNotFound { subproject }) => {
                assert!(subproject.contains("nonexistent"));
                assert!(subproject.contains("required by a"));
            }
            other => panic!("Expected SubprojectNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_parallel_build_groups_diamond() {
        let graph = graph(&[("a", &["b", "c"]), ("b", &["d"]), ("c", &["d"]), ("d", &[])]);

        let groups = graph.parallel_build_groups().unwrap();
        assert_eq!(
            groups,
            vec![
                vec!["d".to_string()],
                vec!["b".to_string(), "c".to_string()],
                vec!["a".to_string()]
            ]
        );
    }

    #[test]
    fn test_parallel_build_groups_cycle() {
        let graph = graph(&[("a", &["b"]), ("b", &["a"])]);
        assert!(matches!(
            graph.parallel_build_groups(),
            Err(BuildError::CircularDependency(_))
        ));
    }

    #[test]
    fn test_prerequisite_closure() {
        let graph = graph(&[
            ("desktop", &["editor-desktop", "renderer-desktop"]),
            ("editor-desktop", &["editor-base"]),
            ("renderer-desktop", &[]),
            ("editor-base", &[]),
            ("web", &["editor-base"]),
        ]);

        let closure = graph.prerequisite_closure("desktop").unwrap();
        assert_eq!(
            closure,
            vec!["editor-base", "editor-desktop", "renderer-desktop"]
        );
        assert!(graph.prerequisite_closure("editor-base").unwrap().is_empty());
        assert!(graph.prerequisite_closure("missing").is_err());
    }

    #[test]
    fn test_dependents_of() {
        let graph = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &[]), ("x", &[])]);
        let dependents: Vec<_> = graph.dependents_of("c").into_iter().collect();
        assert_eq!(dependents, vec!["a", "b"]);
        assert!(graph.dependents_of("x").is_empty());
    }

    #[test]
    fn test_node_with_deps() {
        let node = SubprojectNode::new("test", "test/classes").with_dependencies(["dep1", "dep2"]);
        assert_eq!(node.dependencies, vec!["dep1", "dep2"]);
        assert_eq!(node.classes_dir, PathBuf::from("test/classes"));
    }
}
