//! Dependency graph over work specifications

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{workspec::WorkSpec, OrchestraError, Result};

/// A dependency that names no spec in the current set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct DanglingDependency {
    pub agent: String,
    pub dependency: String,
}

/// Directed graph `dependency -> dependent`, in input order
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    /// dependents of each node, ascending input position
    dependents: Vec<Vec<usize>>,
    in_degree: Vec<usize>,
    dangling: Vec<DanglingDependency>,
}

impl DependencyGraph {
    /// Build the graph; dangling dependencies are recorded and ignored
    pub fn build(specs: &[WorkSpec]) -> Result<Self> {
        let mut index = HashMap::with_capacity(specs.len());
        let mut nodes = Vec::with_capacity(specs.len());
        for (pos, spec) in specs.iter().enumerate() {
            if index.insert(spec.name.clone(), pos).is_some() {
                return Err(OrchestraError::DuplicateName(spec.name.clone()));
            }
            nodes.push(spec.name.clone());
        }

        let mut dependents = vec![Vec::new(); specs.len()];
        let mut in_degree = vec![0; specs.len()];
        let mut dangling = Vec::new();

        for (pos, spec) in specs.iter().enumerate() {
            let mut seen = HashSet::new();
            for dep in &spec.dependencies {
                if !seen.insert(dep.as_str()) {
                    continue;
                }
                match index.get(dep) {
                    Some(&dep_pos) => {
                        dependents[dep_pos].push(pos);
                        in_degree[pos] += 1;
                    }
                    None => {
                        tracing::warn!(
                            "Agent '{}' depends on unknown agent '{}', ignoring",
                            spec.name,
                            dep
                        );
                        dangling.push(DanglingDependency {
                            agent: spec.name.clone(),
                            dependency: dep.clone(),
                        });
                    }
                }
            }
        }

        // specs are walked in order, so each list is already ascending
        Ok(Self {
            nodes,
            dependents,
            in_degree,
            dangling,
        })
    }

    /// Kahn's algorithm with a FIFO ready queue seeded in input order
    pub fn execution_order(&self) -> Result<Vec<String>> {
        let mut in_degree = self.in_degree.clone();
        let mut ready: VecDeque<usize> = (0..self.nodes.len())
            .filter(|&pos| in_degree[pos] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(pos) = ready.pop_front() {
            order.push(pos);
            for &dependent in &self.dependents[pos] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push_back(dependent);
                }
            }
        }

        if order.len() < self.nodes.len() {
            let agents: Vec<String> = (0..self.nodes.len())
                .filter(|&pos| in_degree[pos] > 0)
                .map(|pos| self.nodes[pos].clone())
                .collect();
            return Err(OrchestraError::Cycle { agents });
        }

        Ok(order.into_iter().map(|pos| self.nodes[pos].clone()).collect())
    }

    /// Build and order in one step
    pub fn resolve(specs: &[WorkSpec]) -> Result<Vec<String>> {
        let order = Self::build(specs)?.execution_order()?;
        tracing::info!("Execution order resolved: {}", order.join(" -> "));
        Ok(order)
    }

    pub fn dangling(&self) -> &[DanglingDependency] {
        &self.dangling
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, deps: &[&str]) -> WorkSpec {
        deps.iter()
            .fold(WorkSpec::new(name, "worker"), |spec, dep| spec.depends_on(*dep))
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn test_chain_order() {
        let specs = vec![spec("A", &[]), spec("B", &["A"]), spec("C", &["A", "B"])];
        assert_eq!(DependencyGraph::resolve(&specs).unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_every_dependency_precedes_its_dependent() {
        let specs = vec![
            spec("report", &["analyze", "collect"]),
            spec("analyze", &["collect"]),
            spec("collect", &[]),
            spec("notify", &["report"]),
            spec("audit", &[]),
        ];
        let order = DependencyGraph::resolve(&specs).unwrap();

        assert_eq!(order.len(), specs.len());
        for s in &specs {
            for dep in &s.dependencies {
                assert!(position(&order, dep) < position(&order, &s.name));
            }
        }
    }

    #[test]
    fn test_ties_follow_input_order() {
        let specs = vec![spec("Z", &[]), spec("Y", &["Z"]), spec("X", &[]), spec("W", &["Z"])];
        assert_eq!(DependencyGraph::resolve(&specs).unwrap(), vec!["Z", "X", "Y", "W"]);
    }

    #[test]
    fn test_two_node_cycle() {
        let specs = vec![spec("A", &["B"]), spec("B", &["A"])];
        match DependencyGraph::resolve(&specs) {
            Err(OrchestraError::Cycle { agents }) => assert_eq!(agents, vec!["A", "B"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_names_only_unresolved_agents() {
        let specs = vec![
            spec("root", &[]),
            spec("A", &["root", "C"]),
            spec("B", &["A"]),
            spec("C", &["B"]),
            spec("tail", &["C"]),
        ];
        match DependencyGraph::resolve(&specs) {
            Err(OrchestraError::Cycle { agents }) => {
                assert_eq!(agents, vec!["A", "B", "C", "tail"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let specs = vec![spec("solo", &["solo"])];
        assert!(matches!(
            DependencyGraph::resolve(&specs),
            Err(OrchestraError::Cycle { .. })
        ));
    }

    #[test]
    fn test_dangling_dependency_is_inert() {
        let specs = vec![spec("A", &["Ghost"]), spec("B", &["A"])];
        let graph = DependencyGraph::build(&specs).unwrap();

        assert_eq!(graph.execution_order().unwrap(), vec!["A", "B"]);
        assert_eq!(
            graph.dangling(),
            &[DanglingDependency {
                agent: "A".into(),
                dependency: "Ghost".into()
            }]
        );
    }

    #[test]
    fn test_repeated_dependency_counts_once() {
        let specs = vec![spec("A", &[]), spec("B", &["A", "A"])];
        assert_eq!(DependencyGraph::resolve(&specs).unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let specs = vec![spec("A", &[]), spec("A", &[])];
        assert!(matches!(
            DependencyGraph::build(&specs),
            Err(OrchestraError::DuplicateName(name)) if name == "A"
        ));
    }

    #[test]
    fn test_empty_input() {
        let graph = DependencyGraph::build(&[]).unwrap();
        assert!(graph.is_empty());
        assert!(graph.execution_order().unwrap().is_empty());
    }
}
