//! Property tests for graph resolution and compilation determinism.

use proptest::prelude::*;

use tether_core::errors::CompileError;
use tether_core::{Constraint, ConstraintSet, FieldType, Priority};
use tether_compiler::{resolve, ConstraintCompiler, ConstraintGraph};

fn priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Optional),
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
        Just(Priority::Critical),
    ]
}

/// Constraints `c0..cn` where `ci` may only depend on `cj` with `j < i`,
/// so the dependency graph is acyclic by construction.
fn acyclic_set() -> impl Strategy<Value = Vec<Constraint>> {
    (1usize..24)
        .prop_flat_map(|n| {
            (
                proptest::collection::vec(priority(), n),
                proptest::collection::vec(proptest::collection::vec(any::<bool>(), n), n),
            )
        })
        .prop_map(|(priorities, edges)| {
            priorities
                .into_iter()
                .enumerate()
                .map(|(i, p)| {
                    let mut c = Constraint::field(
                        format!("c{i:02}"),
                        p,
                        &format!("f{i}"),
                        FieldType::String,
                    );
                    for (j, &edge) in edges[i].iter().enumerate().take(i) {
                        if edge {
                            c = c.depends_on(format!("c{j:02}"));
                        }
                    }
                    c
                })
                .collect()
        })
}

proptest! {
    #[test]
    fn acyclic_dependencies_never_report_a_cycle(records in acyclic_set()) {
        let set = ConstraintSet::from_records(records).unwrap();
        let graph = ConstraintGraph::build(&set).unwrap();
        let resolved = resolve(&graph);
        prop_assert!(!matches!(resolved, Err(CompileError::DependencyCycle { .. })), "acyclic set reported a dependency cycle");

        // Every dependency precedes its dependent.
        let resolved = resolved.unwrap();
        let position = |id: &str| resolved.ordered.iter().position(|c| c.id == id);
        for c in &resolved.ordered {
            for dep in &c.depends_on {
                prop_assert!(position(dep.as_str()) < position(c.id.as_str()));
            }
        }
    }

    #[test]
    fn compilation_ignores_record_order(records in acyclic_set(), seed in any::<u64>()) {
        let mut shuffled = records.clone();
        let len = shuffled.len();
        shuffled.rotate_left((seed as usize) % len);
        shuffled.reverse();

        let a = ConstraintSet::from_records(records).unwrap();
        let b = ConstraintSet::from_records(shuffled).unwrap();
        let compiler = ConstraintCompiler::default();
        let ir_a = compiler.compile(&a).unwrap();
        let ir_b = compiler.compile(&b).unwrap();
        prop_assert_eq!(ir_a.content_digest(), ir_b.content_digest());
    }
}

#[test]
fn dense_chain_of_120_dependencies_resolves_in_order() {
    let records: Vec<Constraint> = (0..16)
        .map(|i| {
            let id = format!("c{i:02}");
            let base = Constraint::field(id, Priority::Low, &format!("f{i}"), FieldType::String);
            (0..i).fold(base, |c, j| c.depends_on(format!("c{j:02}")))
        })
        .collect();
    let set = ConstraintSet::from_records(records).unwrap();
    let graph = ConstraintGraph::build(&set).unwrap();
    assert_eq!(graph.dependency_count(), 120);

    let resolved = resolve(&graph).unwrap();
    let ids: Vec<&str> = resolved.ordered.iter().map(|c| c.id.as_str()).collect();
    let expected: Vec<String> = (0..16).map(|i| format!("c{i:02}")).collect();
    assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
}
