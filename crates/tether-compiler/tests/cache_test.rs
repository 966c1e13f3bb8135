//! Artifact cache behaviour under concurrency and eviction.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use tether_core::{Constraint, ConstraintSet, FieldType, Priority};
use tether_compiler::{ArtifactCache, ConstraintCompiler};

fn set(field: &str) -> ConstraintSet {
    ConstraintSet::from_records(vec![
        Constraint::field(format!("{field}-type"), Priority::High, field, FieldType::Number),
        Constraint::regex(format!("{field}-format"), Priority::High, field, "[0-9]+"),
    ])
    .unwrap()
}

#[test]
fn fifty_concurrent_misses_compile_once() {
    let cache = ArtifactCache::new(16);
    let compiler = ConstraintCompiler::default();
    let target = set("amount");
    let compilations = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(50));

    let digests: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let cache = &cache;
                let compiler = &compiler;
                let target = &target;
                let compilations = Arc::clone(&compilations);
                let barrier = Arc::clone(&barrier);
                scope.spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_compile(target, |s| {
                            compilations.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            compiler.compile(s)
                        })
                        .unwrap()
                        .content_digest()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(compilations.load(Ordering::SeqCst), 1);
    assert_eq!(digests.len(), 50);
    assert!(digests.iter().all(|d| *d == digests[0]));

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits + stats.coalesced, 49);
}

#[test]
fn unrelated_fingerprints_compile_independently() {
    let cache = ArtifactCache::new(16);
    let compiler = ConstraintCompiler::default();
    let compilations = AtomicUsize::new(0);

    thread::scope(|scope| {
        for field in ["a", "b", "c", "d"] {
            let cache = &cache;
            let compiler = &compiler;
            let compilations = &compilations;
            scope.spawn(move || {
                cache
                    .get_or_compile(&set(field), |s| {
                        compilations.fetch_add(1, Ordering::SeqCst);
                        compiler.compile(s)
                    })
                    .unwrap();
            });
        }
    });

    assert_eq!(compilations.load(Ordering::SeqCst), 4);
    cache.run_pending_tasks();
    assert_eq!(cache.stats().entries, 4);
}

#[test]
fn retrieved_copies_are_isolated() {
    let cache = ArtifactCache::new(4);
    let compiler = ConstraintCompiler::default();
    let target = set("amount");

    let mut first = compiler.compile_cached(&cache, &target).unwrap();
    first.schema = None;
    first.advisory.clear();
    if let Some(regex_set) = first.regex_set.as_mut() {
        regex_set.patterns.clear();
    }

    let second = compiler.compile_cached(&cache, &target).unwrap();
    assert!(second.schema.is_some());
    assert_eq!(second.regex_set.unwrap().patterns.len(), 1);
}

#[test]
fn least_recently_used_entry_is_evicted() {
    let cache = ArtifactCache::new(2);
    let compiler = ConstraintCompiler::default();
    let (a, b, c) = (set("a"), set("b"), set("c"));

    compiler.compile_cached(&cache, &a).unwrap();
    cache.run_pending_tasks();
    compiler.compile_cached(&cache, &b).unwrap();
    cache.run_pending_tasks();
    // Touch `a` so `b` becomes the least recently used.
    compiler.compile_cached(&cache, &a).unwrap();
    cache.run_pending_tasks();
    compiler.compile_cached(&cache, &c).unwrap();
    cache.run_pending_tasks();

    assert!(cache.contains(&a.fingerprint()));
    assert!(!cache.contains(&b.fingerprint()));
    assert!(cache.contains(&c.fingerprint()));
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn clear_and_invalidate_remove_entries() {
    let cache = ArtifactCache::new(4);
    let compiler = ConstraintCompiler::default();
    let (a, b) = (set("a"), set("b"));
    compiler.compile_cached(&cache, &a).unwrap();
    compiler.compile_cached(&cache, &b).unwrap();

    cache.invalidate(&a.fingerprint());
    assert!(!cache.contains(&a.fingerprint()));
    assert!(cache.contains(&b.fingerprint()));

    cache.clear();
    assert!(cache.get(&b.fingerprint()).is_none());
}

#[test]
fn compile_errors_reach_every_caller() {
    let cache = ArtifactCache::new(4);
    let compiler = ConstraintCompiler::default();
    let broken = ConstraintSet::from_records(vec![
        Constraint::regex("bad", Priority::High, "x", "(unclosed"),
    ])
    .unwrap();

    for _ in 0..2 {
        let err = compiler.compile_cached(&cache, &broken).unwrap_err();
        assert_eq!(err.constraint_ids(), vec!["bad"]);
    }
    assert_eq!(cache.stats().misses, 2);
}
