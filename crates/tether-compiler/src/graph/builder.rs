//! Builds the constraint graph: one node per constraint, dependency edges
//! `dependency → dependent`, and an undirected conflict list.

use std::collections::BTreeSet;

use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use tether_core::errors::CompileError;
use tether_core::{Constraint, ConstraintSet};

/// Ephemeral arena graph borrowing from a [`ConstraintSet`].
///
/// Nodes are added in ascending id order, so node indices (and everything
/// derived from them) do not depend on how the set was assembled.
pub struct ConstraintGraph<'a> {
    pub(crate) graph: DiGraph<&'a Constraint, ()>,
    index: FxHashMap<&'a str, NodeIndex>,
    /// Normalized `(lower index, higher index)` pairs, deduplicated.
    conflicts: Vec<(NodeIndex, NodeIndex)>,
}

impl<'a> ConstraintGraph<'a> {
    /// Validate every constraint and build the graph.
    pub fn build(set: &'a ConstraintSet) -> Result<Self, CompileError> {
        let mut graph = DiGraph::with_capacity(set.len(), 0);
        let mut index = FxHashMap::default();

        for constraint in set {
            validate(constraint)?;
            let node = graph.add_node(constraint);
            index.insert(constraint.id.as_str(), node);
        }

        let mut conflicts = BTreeSet::new();
        for constraint in set {
            let node = index[constraint.id.as_str()];
            for dep in &constraint.depends_on {
                let dep_node = lookup(&index, constraint, dep)?;
                graph.add_edge(dep_node, node, ());
            }
            for other in &constraint.conflicts_with {
                let other_node = lookup(&index, constraint, other)?;
                conflicts.insert((node.min(other_node), node.max(other_node)));
            }
        }

        Ok(Self {
            graph,
            index,
            conflicts: conflicts.into_iter().collect(),
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn get(&self, id: &str) -> Option<&'a Constraint> {
        self.index.get(id).map(|&n| self.graph[n])
    }

    pub(crate) fn constraint(&self, node: NodeIndex) -> &'a Constraint {
        self.graph[node]
    }

    /// Conflict pairs, each reported once.
    pub fn conflicts(&self) -> impl Iterator<Item = (&'a Constraint, &'a Constraint)> + '_ {
        self.conflicts
            .iter()
            .map(|&(a, b)| (self.graph[a], self.graph[b]))
    }
}

fn lookup(
    index: &FxHashMap<&str, NodeIndex>,
    from: &Constraint,
    target: &str,
) -> Result<NodeIndex, CompileError> {
    index
        .get(target)
        .copied()
        .ok_or_else(|| CompileError::DanglingReference {
            constraint_id: from.id.clone(),
            missing_id: target.to_string(),
        })
}

fn validate(c: &Constraint) -> Result<(), CompileError> {
    if c.id.trim().is_empty() {
        return Err(CompileError::invalid(&c.id, "empty id"));
    }
    if !(0.0..=1.0).contains(&c.confidence) {
        return Err(CompileError::invalid(
            &c.id,
            format!("confidence {} outside [0, 1]", c.confidence),
        ));
    }
    if !c.enforcement.accepts(&c.spec) {
        return Err(CompileError::invalid(
            &c.id,
            format!("payload cannot be enforced as {}", c.enforcement),
        ));
    }
    if c.depends_on.contains(&c.id) {
        return Err(CompileError::invalid(&c.id, "depends on itself"));
    }
    if c.conflicts_with.contains(&c.id) {
        return Err(CompileError::invalid(&c.id, "conflicts with itself"));
    }
    Ok(())
}
