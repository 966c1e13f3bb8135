//! Resolves a constraint graph into a deterministic enforcement order.
//!
//! Dependencies are ordered with Kahn's algorithm; among ready nodes the
//! highest priority goes first, then the smallest id. Conflicts are settled by
//! priority: the lower side is demoted to advisory, a tie is a hard error.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use rustc_hash::FxHashSet;

use tether_core::errors::CompileError;
use tether_core::ir::{AdvisoryEntry, AdvisoryReason, CompilationNote};
use tether_core::{Constraint, Priority};

use super::builder::ConstraintGraph;

/// Output of resolution and the sole input of every representation compiler.
#[derive(Debug, Clone)]
pub struct ResolvedConstraints<'a> {
    /// Enforced constraints, dependencies before dependents.
    pub ordered: Vec<&'a Constraint>,
    /// Declared-advisory and demoted constraints, in the same order.
    pub advisory: Vec<AdvisoryEntry>,
    pub notes: Vec<CompilationNote>,
}

pub fn resolve<'a>(graph: &ConstraintGraph<'a>) -> Result<ResolvedConstraints<'a>, CompileError> {
    let order = topological_order(graph)?;
    let demoted = resolve_conflicts(graph)?;

    let mut ordered = Vec::with_capacity(order.len());
    let mut advisory = Vec::new();
    for node in order {
        let c = graph.constraint(node);
        if let Some(winner) = demoted.winners.get(c.id.as_str()) {
            advisory.push(AdvisoryEntry {
                constraint_id: c.id.clone(),
                priority: c.priority,
                reason: AdvisoryReason::ConflictDemoted {
                    winner: (*winner).to_string(),
                },
            });
        } else if !c.is_enforced() {
            advisory.push(AdvisoryEntry {
                constraint_id: c.id.clone(),
                priority: c.priority,
                reason: AdvisoryReason::Declared,
            });
        } else {
            ordered.push(c);
        }
    }

    Ok(ResolvedConstraints {
        ordered,
        advisory,
        notes: demoted.notes,
    })
}

fn topological_order(graph: &ConstraintGraph<'_>) -> Result<Vec<NodeIndex>, CompileError> {
    let g = &graph.graph;
    let mut in_degree: Vec<usize> = g
        .node_indices()
        .map(|n| g.neighbors_directed(n, Direction::Incoming).count())
        .collect();

    let key = |n: NodeIndex| {
        let c = g[n];
        (c.priority, Reverse(c.id.as_str()), n)
    };
    let mut ready: BinaryHeap<(Priority, Reverse<&str>, NodeIndex)> = g
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .map(key)
        .collect();

    let mut order = Vec::with_capacity(g.node_count());
    while let Some((_, _, node)) = ready.pop() {
        order.push(node);
        for next in g.neighbors_directed(node, Direction::Outgoing) {
            let degree = &mut in_degree[next.index()];
            *degree -= 1;
            if *degree == 0 {
                ready.push(key(next));
            }
        }
    }

    if order.len() < g.node_count() {
        let mut ids: Vec<String> = tarjan_scc(g)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .flatten()
            .map(|n| g[n].id.clone())
            .collect();
        ids.sort();
        return Err(CompileError::DependencyCycle { ids });
    }
    Ok(order)
}

struct Demotions<'a> {
    /// demoted id → winning id
    winners: BTreeMap<&'a str, &'a str>,
    notes: Vec<CompilationNote>,
}

fn resolve_conflicts<'a>(graph: &ConstraintGraph<'a>) -> Result<Demotions<'a>, CompileError> {
    let mut pairs: Vec<(&'a Constraint, &'a Constraint)> = graph
        .conflicts()
        .map(|(a, b)| if a.priority >= b.priority { (a, b) } else { (b, a) })
        .collect();
    // Highest-stakes pairs first; ids break ties.
    pairs.sort_by(|(a1, b1), (a2, b2)| {
        a2.priority
            .cmp(&a1.priority)
            .then(b2.priority.cmp(&b1.priority))
            .then_with(|| a1.id.cmp(&a2.id))
            .then_with(|| b1.id.cmp(&b2.id))
    });

    let mut demoted: FxHashSet<&str> = FxHashSet::default();
    let mut out = Demotions {
        winners: BTreeMap::new(),
        notes: Vec::new(),
    };

    for (high, low) in pairs {
        if !high.is_enforced() || !low.is_enforced() {
            continue;
        }
        if demoted.contains(high.id.as_str()) || demoted.contains(low.id.as_str()) {
            continue;
        }
        if high.priority == low.priority {
            let (a, b) = if high.id <= low.id { (high, low) } else { (low, high) };
            return Err(CompileError::UnresolvableConflict {
                a: a.id.clone(),
                b: b.id.clone(),
                priority: high.priority.to_string(),
            });
        }

        tracing::info!(
            kept = %high.id,
            demoted = %low.id,
            "conflict resolved by priority; demoting to advisory"
        );
        demoted.insert(low.id.as_str());
        out.winners.insert(low.id.as_str(), high.id.as_str());
        out.notes.push(CompilationNote::ConflictResolved {
            kept: high.id.clone(),
            demoted: low.id.clone(),
            kept_priority: high.priority,
            demoted_priority: low.priority,
        });
    }
    Ok(out)
}
