//! Property tests for the duplicate and cycle predicates.
//!
//! The reachability oracle is petgraph's `has_path_connecting`, run over the
//! same edge list the validator sees.

use petgraph::algo::has_path_connecting;
use petgraph::graphmap::DiGraphMap;
use proptest::prelude::*;
use std::collections::BTreeSet;
use taskdeps::domain::{Dependency, DependencyId, DependencyRequest, Entity, TaskId};
use taskdeps::validator::{closes_cycle, has_duplicate};

const MAX_NODES: u64 = 12;

fn to_edges(pairs: &[(u64, u64)]) -> Vec<Dependency> {
    pairs
        .iter()
        .zip(1..)
        .map(|(&(task, depends_on), id)| {
            Dependency::from_request(DependencyId::new(id), DependencyRequest::new(task, depends_on))
        })
        .collect()
}

fn reachable(pairs: &[(u64, u64)], from: u64, to: u64) -> bool {
    let mut graph = DiGraphMap::<u64, ()>::new();
    for node in 0..MAX_NODES {
        graph.add_node(node);
    }
    for &(a, b) in pairs {
        graph.add_edge(a, b, ());
    }
    has_path_connecting(&graph, from, to, None)
}

/// Acyclic edge sets: every edge points from a higher id to a lower one.
fn dag() -> impl Strategy<Value = Vec<(u64, u64)>> {
    prop::collection::btree_set((0..MAX_NODES, 0..MAX_NODES), 0..40).prop_map(|pairs| {
        pairs
            .into_iter()
            .filter(|(a, b)| a != b)
            .map(|(a, b)| (a.max(b), a.min(b)))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    })
}

/// Arbitrary edge sets without self-loops or duplicates, cycles allowed.
fn any_graph() -> impl Strategy<Value = Vec<(u64, u64)>> {
    prop::collection::btree_set((0..MAX_NODES, 0..MAX_NODES), 0..40)
        .prop_map(|pairs| pairs.into_iter().filter(|(a, b)| a != b).collect())
}

proptest! {
    #[test]
    fn self_loops_are_always_circular(pairs in any_graph(), node in 0..MAX_NODES) {
        prop_assert!(closes_cycle(&to_edges(&pairs), TaskId::new(node), TaskId::new(node)));
    }

    #[test]
    fn cycle_check_matches_reachability_on_dags(
        pairs in dag(),
        task in 0..MAX_NODES,
        depends_on in 0..MAX_NODES,
    ) {
        let expected = task == depends_on || reachable(&pairs, depends_on, task);
        prop_assert_eq!(
            closes_cycle(&to_edges(&pairs), TaskId::new(task), TaskId::new(depends_on)),
            expected
        );
    }

    #[test]
    fn reversing_any_dag_edge_is_circular(pairs in dag()) {
        let edges = to_edges(&pairs);
        for &(a, b) in &pairs {
            prop_assert!(closes_cycle(&edges, TaskId::new(b), TaskId::new(a)));
        }
    }

    #[test]
    fn cycle_check_terminates_on_cyclic_graphs(
        pairs in any_graph(),
        task in 0..MAX_NODES,
        depends_on in 0..MAX_NODES,
    ) {
        let expected = task == depends_on || reachable(&pairs, depends_on, task);
        prop_assert_eq!(
            closes_cycle(&to_edges(&pairs), TaskId::new(task), TaskId::new(depends_on)),
            expected
        );
    }

    #[test]
    fn duplicates_are_exact_ordered_pairs(
        pairs in any_graph(),
        task in 0..MAX_NODES,
        depends_on in 0..MAX_NODES,
    ) {
        let edges = to_edges(&pairs);
        let present = pairs.contains(&(task, depends_on));
        prop_assert_eq!(
            has_duplicate(&edges, TaskId::new(task), TaskId::new(depends_on), None),
            present
        );
    }

    #[test]
    fn a_row_never_duplicates_itself(pairs in any_graph()) {
        let edges = to_edges(&pairs);
        for edge in &edges {
            prop_assert!(has_duplicate(&edges, edge.task_id, edge.dependent_task_id, None));
            prop_assert!(!has_duplicate(
                &edges,
                edge.task_id,
                edge.dependent_task_id,
                Some(edge.id)
            ));
        }
    }
}
