//! Reference graph for static analysis.
//!
//! This module provides [`RefGraph`], a [petgraph]-backed view of the
//! registry where nodes are `(category, name)` rules and edges are the
//! references between them. It supports advisory checks ahead of
//! generation: finding rules unreachable from a start rule, and trap
//! loops (reference cycles that can neither produce output nor escape).
//! These checks are separate from
//! [`Registry::preprocess`](crate::Registry::preprocess), which prunes
//! on its own depth analysis.
//!
//! [petgraph]: https://docs.rs/petgraph

use crate::error::Error;
use crate::field::{Field, WILDCARD};
use crate::registry::Registry;
use crate::Result;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::prelude::Dfs;
use std::collections::{HashMap, HashSet};

/// Graph representation of the registry's reference structure.
///
/// # Example
///
/// ```rust
/// use gramgen::{fields, Def, Field, Ref, Registry};
///
/// let mut registry = Registry::new();
/// registry.define(Def::new("s", fields!["a", Field::from(Ref::new("b"))]));
/// registry.define(Def::new("b", fields!["b"]));
/// registry.define(Def::new("orphan", fields!["o"]));
///
/// let graph = registry.graph();
/// assert!(graph.check_unreachable("default", "s").is_err());
/// assert!(graph.check_trap_loop().is_ok());
/// ```
pub struct RefGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
    /// rules that can produce output without following any reference
    grounded: HashSet<NodeIndex>,
}

fn node_label(cat: &str, name: &str) -> String {
    format!("{cat}::{name}")
}

impl Registry {
    /// Builds the reference graph over the current definitions.
    pub fn graph(&self) -> RefGraph {
        let mut graph = DiGraph::new();
        let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
        let mut grounded = HashSet::new();

        for (cat, rules) in &self.defs {
            for (name, defs) in rules {
                let label = node_label(cat, name);
                let node = *nodes
                    .entry(label.clone())
                    .or_insert_with(|| graph.add_node(label));
                if defs.iter().any(|def| ref_free_expansion_in(&def.values)) {
                    grounded.insert(node);
                }
            }
        }
        for (cat, rules) in &self.defs {
            for (name, defs) in rules {
                let from = nodes[&node_label(cat, name)];
                for def in defs {
                    let mut targets = Vec::new();
                    for value in &def.values {
                        collect_ref_labels(value, &mut targets);
                    }
                    for target in targets {
                        let to = *nodes
                            .entry(target.clone())
                            .or_insert_with(|| graph.add_node(target));
                        graph.add_edge(from, to, ());
                    }
                }
            }
        }
        RefGraph {
            graph,
            nodes,
            grounded,
        }
    }
}

impl RefGraph {
    /// Checks that every rule is reachable from `(cat, name)`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnreachableRules` listing the rules depth-first
    /// search cannot reach.
    pub fn check_unreachable(&self, cat: &str, name: &str) -> Result<&Self> {
        let start = self
            .nodes
            .get(&node_label(cat, name))
            .ok_or_else(|| Error::NameMissing {
                cat: cat.into(),
                name: name.into(),
            })?;
        let mut reachable = HashSet::new();
        let mut dfs = Dfs::new(&self.graph, *start);
        while let Some(nx) = dfs.next(&self.graph) {
            reachable.insert(nx);
        }
        let unreachable: Vec<String> = self
            .graph
            .node_indices()
            .filter(|nx| !reachable.contains(nx))
            .map(|nx| self.graph[nx].clone())
            .collect();
        if !unreachable.is_empty() {
            return Err(Error::UnreachableRules {
                rules: unreachable,
            });
        }
        Ok(self)
    }

    /// Checks for trap loops.
    ///
    /// A trap loop is a strongly connected component where no rule can
    /// produce output without a reference and every outgoing edge stays
    /// within the component, so generation can never escape it.
    ///
    /// # Errors
    ///
    /// Returns `Error::TrapLoop` listing the trapped rules.
    pub fn check_trap_loop(&self) -> Result<&Self> {
        for scc in petgraph::algo::tarjan_scc(&self.graph) {
            if self.is_trap_loop(&scc) {
                let rules = scc.iter().map(|nx| self.graph[*nx].clone()).collect();
                return Err(Error::TrapLoop { rules });
            }
        }
        Ok(self)
    }

    fn is_trap_loop(&self, scc: &[NodeIndex]) -> bool {
        if scc.iter().any(|nx| self.grounded.contains(nx)) {
            return false;
        }
        let targets: HashSet<NodeIndex> = scc
            .iter()
            .flat_map(|nx| self.graph.neighbors(*nx))
            .collect();
        targets == scc.iter().copied().collect()
    }
}

/// Whether some expansion of the fields avoids every reference.
fn ref_free_expansion_in(values: &[Field]) -> bool {
    values.iter().all(avoids_refs)
}

fn avoids_refs(field: &Field) -> bool {
    match field {
        Field::Lit(_) | Field::Int(_) | Field::Float(_) | Field::Str(_) => true,
        Field::Opt(_) => true,
        Field::Ref(_) => false,
        Field::Or(f) => f.values.iter().any(avoids_refs),
        Field::And(f) => f.values.iter().all(avoids_refs),
        Field::Join(f) => f.values.iter().all(avoids_refs),
        Field::Quote(f) => f.values.iter().all(avoids_refs),
        Field::Custom(f) => f.shortest_is_nothing() || f.children().iter().all(avoids_refs),
    }
}

fn collect_ref_labels(field: &Field, labels: &mut Vec<String>) {
    match field {
        // wildcard references have no static target
        Field::Ref(f) if f.name != WILDCARD => labels.push(node_label(&f.cat, &f.name)),
        Field::Ref(_) => {}
        Field::And(f) => f.values.iter().for_each(|v| collect_ref_labels(v, labels)),
        Field::Or(f) => f.values.iter().for_each(|v| collect_ref_labels(v, labels)),
        Field::Join(f) => f.values.iter().for_each(|v| collect_ref_labels(v, labels)),
        Field::Opt(f) => f.values.iter().for_each(|v| collect_ref_labels(v, labels)),
        Field::Quote(f) => f.values.iter().for_each(|v| collect_ref_labels(v, labels)),
        Field::Custom(f) => f.children().iter().for_each(|v| collect_ref_labels(v, labels)),
        Field::Lit(_) | Field::Int(_) | Field::Float(_) | Field::Str(_) => {}
    }
}

#[cfg(test)]
mod test {
    use crate::error::Error;
    use crate::field::{Def, Field, Or, Ref};
    use crate::fields;
    use crate::registry::Registry;

    #[test]
    fn unreachable_rules_are_reported() {
        let mut registry = Registry::new();
        registry.define(Def::new("s", fields![Field::from(Ref::new("b"))]));
        registry.define(Def::new("b", fields!["b"]));
        registry.define(Def::new("orphan", fields!["o"]));
        let graph = registry.graph();
        let err = graph
            .check_unreachable("default", "s")
            .map(|_| ())
            .unwrap_err();
        match err {
            Error::UnreachableRules { rules } => {
                assert_eq!(rules, vec!["default::orphan".to_string()]);
            }
            other => panic!("expected UnreachableRules, got {other:?}"),
        }
    }

    #[test]
    fn fully_connected_grammar_passes() {
        let mut registry = Registry::new();
        registry.define(Def::new("s", fields![Field::from(Ref::new("b"))]));
        registry.define(Def::new("b", fields!["b"]));
        let graph = registry.graph();
        assert!(graph.check_unreachable("default", "s").is_ok());
        assert!(graph.check_trap_loop().is_ok());
    }

    #[test]
    fn mutual_cycle_without_output_is_a_trap() {
        let mut registry = Registry::new();
        registry.define(Def::new("a", fields![Field::from(Ref::new("b"))]));
        registry.define(Def::new("b", fields![Field::from(Ref::new("a"))]));
        let graph = registry.graph();
        let err = graph.check_trap_loop().map(|_| ()).unwrap_err();
        match err {
            Error::TrapLoop { rules } => assert_eq!(rules.len(), 2),
            other => panic!("expected TrapLoop, got {other:?}"),
        }
    }

    #[test]
    fn a_leaf_branch_defuses_the_trap() {
        let mut registry = Registry::new();
        registry.define(Def::new(
            "a",
            fields![Or::new(fields![Ref::new("a"), "leaf"])],
        ));
        let graph = registry.graph();
        assert!(graph.check_trap_loop().is_ok());
    }
}
