//! End-to-end behaviour of the task graph over the in-memory store and cache.
//!
//! # Test Coverage
//!
//! - Rejection scenarios for duplicate and circular edges
//! - Update re-validation against the proposed endpoints
//! - Cache round trips and delete idempotence
//! - Page staleness under both invalidation strategies
//! - Concurrent creates racing on the same or reversed pair

use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;
use taskdeps::cache::{Cache, MemoryCache};
use taskdeps::config::{EngineConfig, PageInvalidation};
use taskdeps::domain::{DependencyId, DependencyRequest, PageRequest, TaskId, TaskRequest};
use taskdeps::store::{Repository, Store};
use taskdeps::{Error, TaskGraph};

// =============================================================================
// Test Helpers
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Duplicate,
    Circular,
}

fn rejection(err: &Error) -> Option<Rejection> {
    match err {
        Error::DuplicateEdge { .. } => Some(Rejection::Duplicate),
        Error::CircularEdge { .. } => Some(Rejection::Circular),
        _ => None,
    }
}

fn graph_with_cache(invalidation: PageInvalidation) -> (TaskGraph, Arc<MemoryCache>) {
    let mut config = EngineConfig::default();
    config.cache.page_invalidation = invalidation;
    let cache = Arc::new(MemoryCache::new());
    let graph = TaskGraph::new(Store::in_memory(), cache.clone(), &config);
    (graph, cache)
}

async fn graph_with_edges(pairs: &[(u64, u64)]) -> TaskGraph {
    let graph = TaskGraph::in_memory();
    for &(task, depends_on) in pairs {
        graph
            .create_dependency(DependencyRequest::new(task, depends_on))
            .await
            .unwrap();
    }
    graph
}

// =============================================================================
// Validation Scenarios
// =============================================================================

#[rstest]
#[case::two_cycle(&[(2, 1)], (1, 2), Rejection::Circular)]
#[case::three_cycle(&[(3, 2), (2, 1)], (1, 3), Rejection::Circular)]
#[case::repeated_pair(&[(1, 2)], (1, 2), Rejection::Duplicate)]
#[case::self_loop(&[], (4, 4), Rejection::Circular)]
#[case::long_chain(&[(5, 4), (4, 3), (3, 2), (2, 1)], (1, 5), Rejection::Circular)]
#[tokio::test]
async fn test_rejected_creates(
    #[case] existing: &[(u64, u64)],
    #[case] proposed: (u64, u64),
    #[case] expected: Rejection,
) {
    let graph = graph_with_edges(existing).await;
    let before = graph.list_dependencies(PageRequest::default()).await.unwrap();

    let err = graph
        .create_dependency(DependencyRequest::new(proposed.0, proposed.1))
        .await
        .unwrap_err();
    assert_eq!(rejection(&err), Some(expected), "got {err}");
    assert_eq!(err.status_code(), 400);

    let after = graph.list_dependencies(PageRequest::default()).await.unwrap();
    assert_eq!(before, after);
}

#[rstest]
#[case::parallel_path(&[(3, 2), (2, 1)], (3, 1))]
#[case::shared_target(&[(3, 1)], (2, 1))]
#[case::disconnected(&[(1, 2)], (3, 4))]
#[tokio::test]
async fn test_accepted_creates(#[case] existing: &[(u64, u64)], #[case] proposed: (u64, u64)) {
    let graph = graph_with_edges(existing).await;
    let edge = graph
        .create_dependency(DependencyRequest::new(proposed.0, proposed.1))
        .await
        .unwrap();
    assert_eq!(edge.task_id, TaskId::new(proposed.0));
    assert_eq!(edge.dependent_task_id, TaskId::new(proposed.1));
    assert_eq!(graph.get_dependency(edge.id).await.unwrap(), edge);
}

#[tokio::test]
async fn test_reversed_pair_is_circular_not_duplicate() {
    let graph = graph_with_edges(&[(3, 2)]).await;
    assert!(!graph
        .validator()
        .is_duplicate(TaskId::new(2), TaskId::new(3), None)
        .await
        .unwrap());

    let err = graph
        .create_dependency(DependencyRequest::new(2, 3))
        .await
        .unwrap_err();
    assert_eq!(rejection(&err), Some(Rejection::Circular));
}

#[tokio::test]
async fn test_same_pair_twice_is_duplicate() {
    let graph = TaskGraph::in_memory();
    graph
        .create_dependency(DependencyRequest::new(1, 2))
        .await
        .unwrap();

    let err = graph
        .create_dependency(DependencyRequest::new(1, 2))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("duplicate dependency"));
}

#[tokio::test]
async fn test_unchanged_update_is_allowed() {
    let graph = graph_with_edges(&[(10, 11), (11, 12), (12, 13), (13, 14), (1, 2)]).await;
    let id = DependencyId::new(5);
    assert_eq!(
        graph.get_dependency(id).await.unwrap().task_id,
        TaskId::new(1)
    );

    let updated = graph
        .update_dependency(id, DependencyRequest::new(1, 2))
        .await
        .unwrap();
    assert_eq!(updated.id, id);
    assert_eq!(updated.dependent_task_id, TaskId::new(2));
}

#[tokio::test]
async fn test_update_validates_proposed_endpoints() {
    let graph = graph_with_edges(&[(3, 2), (2, 1), (5, 6)]).await;

    // Row 2 moves from 2 -> 1 to 1 -> 3. Its old endpoints no longer count,
    // so 1 -> 3 -> 2 is acyclic.
    let moved = graph
        .update_dependency(DependencyId::new(2), DependencyRequest::new(1, 3))
        .await
        .unwrap();
    assert_eq!(moved.task_id, TaskId::new(1));

    // Moving row 3 to 2 -> 1 would close 1 -> 3 -> 2 -> 1.
    let err = graph
        .update_dependency(DependencyId::new(3), DependencyRequest::new(2, 1))
        .await
        .unwrap_err();
    assert_eq!(rejection(&err), Some(Rejection::Circular));

    // Moving row 3 onto row 1's pair is a duplicate.
    let err = graph
        .update_dependency(DependencyId::new(3), DependencyRequest::new(3, 2))
        .await
        .unwrap_err();
    assert_eq!(rejection(&err), Some(Rejection::Duplicate));
}

// =============================================================================
// Cache Coherence
// =============================================================================

#[tokio::test]
async fn test_get_after_write_returns_written_value() {
    let (graph, cache) = graph_with_cache(PageInvalidation::OnWrite);

    let created = graph
        .create_task(TaskRequest::titled("Draft"))
        .await
        .unwrap();
    assert_eq!(graph.get_task(created.id).await.unwrap(), created);

    let mut request = TaskRequest::titled("Final");
    request.description = "Reviewed".to_string();
    let updated = graph.update_task(created.id, request).await.unwrap();
    assert_eq!(graph.get_task(created.id).await.unwrap(), updated);

    let raw = cache
        .get_string(&format!("TaskItem_{}", created.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&raw).unwrap()["title"], "Final");

    let edge = graph
        .create_dependency(DependencyRequest::new(created.id.get(), 99))
        .await
        .unwrap();
    assert!(cache.contains_key(&format!("TaskDependency_{}", edge.id)).await);
    assert_eq!(graph.get_dependency(edge.id).await.unwrap(), edge);
}

#[tokio::test]
async fn test_repeated_delete_is_not_found() {
    let (graph, cache) = graph_with_cache(PageInvalidation::OnWrite);
    let edge = graph
        .create_dependency(DependencyRequest::new(1, 2))
        .await
        .unwrap();
    let keep = graph
        .create_dependency(DependencyRequest::new(2, 3))
        .await
        .unwrap();

    graph.delete_dependency(edge.id).await.unwrap();
    for _ in 0..2 {
        let err = graph.delete_dependency(edge.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(err.status_code(), 404);
    }

    assert!(!cache.contains_key(&format!("TaskDependency_{}", edge.id)).await);
    let remaining = graph.list_dependencies(PageRequest::default()).await.unwrap();
    assert_eq!(remaining, vec![keep]);
}

#[tokio::test]
async fn test_missing_ids_name_kind_and_id() {
    let graph = TaskGraph::in_memory();

    let err = graph.get_task(TaskId::new(42)).await.unwrap_err();
    assert_eq!(err.to_string(), "Task with ID 42 not found");

    let err = graph.get_dependency(DependencyId::new(7)).await.unwrap_err();
    assert_eq!(err.to_string(), "Task Dependency with ID 7 not found");
}

#[tokio::test]
async fn test_page_past_the_end_is_empty() {
    let graph = TaskGraph::in_memory();
    graph.create_task(TaskRequest::titled("only")).await.unwrap();

    let page = PageRequest::new(3, 20).unwrap();
    assert!(graph.list_tasks(page).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ttl_only_pages_are_whole_and_bounded_by_ttl() {
    let (graph, _cache) = graph_with_cache(PageInvalidation::TtlOnly);
    let page = PageRequest::new(1, 20).unwrap();
    graph.create_task(TaskRequest::titled("first")).await.unwrap();
    graph.create_task(TaskRequest::titled("second")).await.unwrap();

    let cached = graph.list_tasks(page).await.unwrap();
    let added = graph.create_task(TaskRequest::titled("third")).await.unwrap();

    // Within the TTL the page is exactly the earlier listing.
    tokio::time::advance(Duration::from_secs(299)).await;
    assert_eq!(graph.list_tasks(page).await.unwrap(), cached);

    // Once the TTL has elapsed the page is fetched again.
    tokio::time::advance(Duration::from_secs(1)).await;
    let fresh = graph.list_tasks(page).await.unwrap();
    assert_eq!(fresh.len(), 3);
    assert_eq!(fresh[0], added);
    assert_eq!(&fresh[1..], &cached[..]);
}

#[tokio::test]
async fn test_on_write_pages_reflect_writes_immediately() {
    let (graph, _cache) = graph_with_cache(PageInvalidation::OnWrite);
    let page = PageRequest::new(1, 20).unwrap();
    let first = graph.create_task(TaskRequest::titled("first")).await.unwrap();
    assert_eq!(graph.list_tasks(page).await.unwrap(), vec![first.clone()]);

    let second = graph.create_task(TaskRequest::titled("second")).await.unwrap();
    assert_eq!(
        graph.list_tasks(page).await.unwrap(),
        vec![second.clone(), first.clone()]
    );

    graph
        .update_task(first.id, TaskRequest::titled("renamed"))
        .await
        .unwrap();
    let listed = graph.list_tasks(page).await.unwrap();
    assert_eq!(listed[1].title, "renamed");

    graph.delete_task(second.id).await.unwrap();
    let listed = graph.list_tasks(page).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_dependency_pages_are_oldest_first() {
    let graph = graph_with_edges(&[(1, 2), (2, 3), (3, 4)]).await;
    let page = PageRequest::new(2, 2).unwrap();
    let rows = graph.list_dependencies(page).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, DependencyId::new(3));
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_identical_creates_insert_once() {
    let graph = Arc::new(TaskGraph::in_memory());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let graph = Arc::clone(&graph);
            tokio::spawn(async move {
                graph
                    .create_dependency(DependencyRequest::new(1, 2))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(err) => assert_eq!(rejection(&err), Some(Rejection::Duplicate)),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(graph.store().dependencies.count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reverse_edges_never_both_land() {
    for round in 0..20u64 {
        let graph = Arc::new(TaskGraph::in_memory());
        let (a, b) = (round * 2 + 1, round * 2 + 2);

        let forward = {
            let graph = Arc::clone(&graph);
            tokio::spawn(async move { graph.create_dependency(DependencyRequest::new(a, b)).await })
        };
        let backward = {
            let graph = Arc::clone(&graph);
            tokio::spawn(async move { graph.create_dependency(DependencyRequest::new(b, a)).await })
        };

        let outcomes = [forward.await.unwrap(), backward.await.unwrap()];
        let landed = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        assert_eq!(landed, 1);
        for outcome in &outcomes {
            if let Err(err) = outcome {
                assert_eq!(rejection(err), Some(Rejection::Circular));
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cache_matches_store_after_concurrent_updates() {
    let graph = Arc::new(TaskGraph::in_memory());
    let task = graph.create_task(TaskRequest::titled("v0")).await.unwrap();

    let mut handles = Vec::new();
    for n in 1..=24 {
        let graph = Arc::clone(&graph);
        handles.push(tokio::spawn(async move {
            if n % 3 == 0 {
                graph.get_task(task.id).await.map(|_| ())
            } else {
                graph
                    .update_task(task.id, TaskRequest::titled(format!("v{n}")))
                    .await
                    .map(|_| ())
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = graph.store().tasks.get_by_id(task.id).await.unwrap().unwrap();
    assert_eq!(graph.get_task(task.id).await.unwrap(), stored);
}
