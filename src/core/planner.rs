//! Build order planning
//!
//! Computes the order in which repositories are built: explicit
//! dependencies and producer/consumer edges both force the earlier repo to
//! come first.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::edges::EdgeTable;
use crate::core::registry::Registry;
use crate::error::ResolverError;

/// Dependency graph over repository names
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// node -> nodes that must come after it
    successors: BTreeMap<String, BTreeSet<String>>,
    /// node -> number of nodes that must come before it
    in_degree: BTreeMap<String, usize>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with no edges
    pub fn add_node(&mut self, name: &str) {
        self.successors.entry(name.to_string()).or_default();
        self.in_degree.entry(name.to_string()).or_insert(0);
    }

    /// Require `before` to come before `after`
    ///
    /// Repeated edges are counted once.
    pub fn add_edge(&mut self, before: &str, after: &str) {
        self.add_node(before);
        self.add_node(after);
        let inserted = self
            .successors
            .get_mut(before)
            .is_some_and(|succ| succ.insert(after.to_string()));
        if inserted {
            if let Some(degree) = self.in_degree.get_mut(after) {
                *degree += 1;
            }
        }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.in_degree.len()
    }

    /// True if the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.in_degree.is_empty()
    }

    /// Kahn's algorithm with a name-ordered frontier
    ///
    /// Among nodes that become eligible at the same time, the
    /// lexicographically smallest is emitted first, so the result is
    /// reproducible for a given graph.
    pub fn topological_sort(&self) -> Result<Vec<String>, ResolverError> {
        let mut in_degree = self.in_degree.clone();
        let mut frontier: BTreeSet<&str> = self
            .in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(name, _)| name.as_str())
            .collect();
        let mut order = Vec::with_capacity(in_degree.len());

        while let Some(node) = frontier.pop_first() {
            order.push(node.to_string());
            for next in self.successors.get(node).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(next) {
                    *degree -= 1;
                    if *degree == 0 {
                        frontier.insert(next.as_str());
                    }
                }
            }
        }

        if order.len() < self.len() {
            let emitted: BTreeSet<&str> = order.iter().map(String::as_str).collect();
            return Err(ResolverError::CyclicDependency {
                cycle: self.cycle_members(&emitted),
            });
        }

        Ok(order)
    }

    /// Nodes left after a sort that still lead back into a cycle
    ///
    /// Leftover nodes that only hang downstream of a cycle are peeled off
    /// from the sink end, the mirror image of the forward pass.
    fn cycle_members(&self, emitted: &BTreeSet<&str>) -> Vec<String> {
        let leftover: BTreeSet<&str> = self
            .in_degree
            .keys()
            .map(String::as_str)
            .filter(|name| !emitted.contains(name))
            .collect();

        let mut predecessors: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut out_degree: BTreeMap<&str, usize> = BTreeMap::new();
        for &node in &leftover {
            let next: Vec<&str> = self
                .successors
                .get(node)
                .into_iter()
                .flatten()
                .map(String::as_str)
                .filter(|succ| leftover.contains(succ))
                .collect();
            out_degree.insert(node, next.len());
            for succ in next {
                predecessors.entry(succ).or_default().push(node);
            }
        }

        let mut sinks: Vec<&str> = out_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&name, _)| name)
            .collect();
        let mut peeled = BTreeSet::new();
        while let Some(node) = sinks.pop() {
            peeled.insert(node);
            for &pred in predecessors.get(node).into_iter().flatten() {
                if let Some(degree) = out_degree.get_mut(pred) {
                    *degree -= 1;
                    if *degree == 0 {
                        sinks.push(pred);
                    }
                }
            }
        }

        leftover
            .into_iter()
            .filter(|name| !peeled.contains(name))
            .map(str::to_string)
            .collect()
    }

    /// Check if the graph has any cycles
    pub fn has_cycle(&self) -> bool {
        self.topological_sort().is_err()
    }
}

/// A valid sequence for building every registered repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOrder {
    names: Vec<String>,
}

impl BuildOrder {
    /// Names in build order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of `name`, if present
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Number of repositories
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if there is nothing to build
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate names in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Plan a build order over every registered repository
///
/// Explicit dependencies on unregistered repos are rejected. Edges from the
/// table only count when both ends are registered.
pub fn plan_order(registry: &Registry, edges: &EdgeTable) -> Result<BuildOrder, ResolverError> {
    let mut graph = DependencyGraph::new();

    for repo in registry.all() {
        graph.add_node(&repo.name);
        for dep in &repo.explicit_dependencies {
            if !registry.contains(dep) {
                return Err(ResolverError::NotRegistered {
                    repo: repo.name.clone(),
                    dependency: dep.clone(),
                });
            }
            graph.add_edge(dep, &repo.name);
        }
    }

    for edge in edges.edges() {
        if registry.contains(&edge.producer) && registry.contains(&edge.consumer) {
            graph.add_edge(&edge.producer, &edge.consumer);
        }
    }

    let names = graph.topological_sort()?;
    tracing::debug!("Build order: {}", names.join(" -> "));
    Ok(BuildOrder { names })
}
