use std::collections::{HashMap, VecDeque};

use crate::container::descriptor::Dependency;
use crate::errors::AssemblyError;

/// A declared dependency together with the component that satisfies it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    pub dependency: Dependency,
    /// `None` only for optional dependencies nothing provides
    pub target: Option<String>,
}

/// Components currently on the DFS stack, for cycle reporting
#[derive(Debug, Clone, Default)]
pub struct ResolutionPath {
    pub components: Vec<String>,
}

impl ResolutionPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str) {
        self.components.push(name.to_string());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.components.pop()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.iter().any(|c| c == name)
    }

    /// The closed cycle ending at `name`, e.g. `[x, y, x]`
    pub fn cycle_to(&self, name: &str) -> Vec<String> {
        let start = self
            .components
            .iter()
            .position(|c| c == name)
            .unwrap_or(0);
        let mut cycle = self.components[start..].to_vec();
        cycle.push(name.to_string());
        cycle
    }
}

/// Dependency graph node
#[derive(Debug)]
pub struct DependencyNode {
    pub name: String,
    pub dependencies: Vec<String>,
    pub dependents: Vec<String>,
}

/// Construction-order graph over component names.
///
/// Nodes keep registration order so that sorting is deterministic: among
/// components whose dependencies are all satisfied, the earlier registered
/// one is constructed first.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    index: HashMap<String, usize>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, eager dependency targets)` pairs in registration order
    pub fn build<'a, I>(components: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Vec<String>)>,
    {
        let mut graph = Self::new();
        for (name, dependencies) in components {
            graph.add_component(name, &dependencies);
        }
        graph.build_reverse_dependencies();
        graph
    }

    /// Add a component, replacing any node with the same name
    pub fn add_component(&mut self, name: &str, dependencies: &[String]) {
        let node = DependencyNode {
            name: name.to_string(),
            dependencies: dependencies.to_vec(),
            dependents: Vec::new(),
        };
        match self.index.get(name) {
            Some(&pos) => self.nodes[pos] = node,
            None => {
                self.index.insert(name.to_string(), self.nodes.len());
                self.nodes.push(node);
            }
        }
    }

    fn build_reverse_dependencies(&mut self) {
        for node in &mut self.nodes {
            node.dependents.clear();
        }

        let edges: Vec<(String, Vec<String>)> = self
            .nodes
            .iter()
            .map(|node| (node.name.clone(), node.dependencies.clone()))
            .collect();

        for (name, deps) in edges {
            for dep in deps {
                if let Some(&pos) = self.index.get(&dep) {
                    self.nodes[pos].dependents.push(name.clone());
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Fail with the first cycle found, walking nodes in registration order.
    ///
    /// The walk keeps its own stack of `(node, next edge)` frames, so graph
    /// depth is bounded by memory rather than by the thread's stack.
    pub fn detect_cycles(&self) -> Result<(), AssemblyError> {
        let mut visited = vec![false; self.nodes.len()];
        let mut on_path = vec![false; self.nodes.len()];
        let mut path = ResolutionPath::new();
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for start in 0..self.nodes.len() {
            if visited[start] {
                continue;
            }
            path.push(&self.nodes[start].name);
            on_path[start] = true;
            stack.push((start, 0));

            while let Some(frame) = stack.last_mut() {
                let (pos, next) = *frame;
                let node = &self.nodes[pos];

                let Some(dep) = node.dependencies.get(next) else {
                    stack.pop();
                    path.pop();
                    on_path[pos] = false;
                    visited[pos] = true;
                    continue;
                };
                frame.1 += 1;

                let Some(&dep_pos) = self.index.get(dep) else {
                    continue;
                };
                if on_path[dep_pos] {
                    return Err(AssemblyError::CyclicDependency {
                        path: path.cycle_to(dep),
                    });
                }
                if !visited[dep_pos] {
                    path.push(dep);
                    on_path[dep_pos] = true;
                    stack.push((dep_pos, 0));
                }
            }
        }

        Ok(())
    }

    /// Dependencies before dependents
    pub fn topological_sort(&self) -> Result<Vec<String>, AssemblyError> {
        self.detect_cycles()?;

        let mut in_degree: Vec<usize> = self
            .nodes
            .iter()
            .map(|node| {
                node.dependencies
                    .iter()
                    .filter(|dep| self.index.contains_key(dep.as_str()))
                    .count()
            })
            .collect();

        let mut queue: VecDeque<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(pos, _)| pos)
            .collect();

        let mut result = Vec::with_capacity(self.nodes.len());
        while let Some(pos) = queue.pop_front() {
            let node = &self.nodes[pos];
            result.push(node.name.clone());

            for dependent in &node.dependents {
                if let Some(&dep_pos) = self.index.get(dependent) {
                    in_degree[dep_pos] -= 1;
                    if in_degree[dep_pos] == 0 {
                        queue.push_back(dep_pos);
                    }
                }
            }
        }

        // detect_cycles already rejected every cycle
        debug_assert_eq!(result.len(), self.nodes.len());

        Ok(result)
    }

    pub fn dependencies(&self, name: &str) -> Option<&[String]> {
        self.index
            .get(name)
            .map(|&pos| self.nodes[pos].dependencies.as_slice())
    }

    pub fn dependents(&self, name: &str) -> Option<&[String]> {
        self.index
            .get(name)
            .map(|&pos| self.nodes[pos].dependents.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_cycle_path_is_closed() {
        let graph = DependencyGraph::build(vec![
            ("x", deps(&["y"])),
            ("y", deps(&["x"])),
        ]);

        let err = graph.detect_cycles().unwrap_err();
        assert_eq!(err.cycle_path().unwrap(), &deps(&["x", "y", "x"])[..]);
        assert_eq!(err.to_string(), "Cyclic dependency: x -> y -> x");
    }

    #[test]
    fn test_three_node_cycle_starts_at_entry() {
        let graph = DependencyGraph::build(vec![
            ("root", deps(&["a"])),
            ("a", deps(&["b"])),
            ("b", deps(&["c"])),
            ("c", deps(&["a"])),
        ]);

        let err = graph.topological_sort().unwrap_err();
        assert_eq!(err.cycle_path().unwrap(), &deps(&["a", "b", "c", "a"])[..]);
    }

    #[test]
    fn test_self_dependency() {
        let graph = DependencyGraph::build(vec![("loop", deps(&["loop"]))]);

        let err = graph.detect_cycles().unwrap_err();
        assert_eq!(err.cycle_path().unwrap(), &deps(&["loop", "loop"])[..]);
    }

    #[test]
    fn test_topological_sort_orders_dependencies_first() {
        let graph = DependencyGraph::build(vec![
            ("a", deps(&["b"])),
            ("b", deps(&["c"])),
            ("c", vec![]),
        ]);

        assert_eq!(graph.topological_sort().unwrap(), deps(&["c", "b", "a"]));
        assert_eq!(graph.dependents("c").unwrap(), &deps(&["b"])[..]);
        assert_eq!(graph.dependencies("a").unwrap(), &deps(&["b"])[..]);
    }

    #[test]
    fn test_independent_components_keep_registration_order() {
        let graph = DependencyGraph::build(vec![
            ("web", vec![]),
            ("db", vec![]),
            ("users", deps(&["db"])),
            ("bus", vec![]),
        ]);

        assert_eq!(
            graph.topological_sort().unwrap(),
            deps(&["web", "db", "bus", "users"])
        );
    }

    #[test]
    fn test_unknown_edges_are_ignored() {
        let graph = DependencyGraph::build(vec![("a", deps(&["ghost"]))]);

        assert_eq!(graph.topological_sort().unwrap(), deps(&["a"]));
    }

    #[test]
    fn test_add_component_replaces_node() {
        let mut graph = DependencyGraph::new();
        graph.add_component("a", &deps(&["b"]));
        graph.add_component("b", &[]);
        graph.add_component("a", &[]);
        graph.build_reverse_dependencies();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.topological_sort().unwrap(), deps(&["a", "b"]));
    }

    #[test]
    fn test_long_chain_sorts_without_recursion() {
        let names: Vec<String> = (0..10_000).map(|i| format!("c{}", i)).collect();
        let graph = DependencyGraph::build(names.iter().enumerate().map(|(i, name)| {
            let deps: Vec<String> = names.get(i + 1).cloned().into_iter().collect();
            (name.as_str(), deps)
        }));

        let order = graph.topological_sort().unwrap();

        assert_eq!(order.len(), 10_000);
        assert_eq!(order.first().map(String::as_str), Some("c9999"));
        assert_eq!(order.last().map(String::as_str), Some("c0"));
    }

    #[test]
    fn test_cycle_at_the_end_of_a_long_chain() {
        let names: Vec<String> = (0..10_000).map(|i| format!("c{}", i)).collect();
        let graph = DependencyGraph::build(names.iter().enumerate().map(|(i, name)| {
            let next = match names.get(i + 1) {
                Some(next) => next.clone(),
                None => "c9998".to_string(),
            };
            (name.as_str(), vec![next])
        }));

        let err = graph.detect_cycles().unwrap_err();
        assert_eq!(err.cycle_path().unwrap(), &deps(&["c9998", "c9999", "c9998"])[..]);
    }

    #[test]
    fn test_resolution_path() {
        let mut path = ResolutionPath::new();
        path.push("a");
        path.push("b");

        assert!(path.contains("a"));
        assert_eq!(path.cycle_to("a"), deps(&["a", "b", "a"]));
        assert_eq!(path.pop(), Some("b".to_string()));
        assert!(!path.contains("b"));
    }
}
