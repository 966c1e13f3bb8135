//! Compiled artifact cache.
//!
//! Content-addressed by constraint-set fingerprint, LRU-evicted at a fixed
//! capacity, with singleflight compilation: concurrent misses on one
//! fingerprint run the compiler once and share its result. Stored entries
//! carry a checksum; an entry failing verification is dropped and rebuilt.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;

use tether_core::config::CacheConfig;
use tether_core::errors::{CacheError, CompileError, TetherErrorCode};
use tether_core::{ConstraintIR, ConstraintSet, Fingerprint};

/// A stored IR with its integrity checksum.
#[derive(Debug)]
pub struct CacheEntry {
    ir: ConstraintIR,
    checksum: Fingerprint,
    inserted_at: DateTime<Utc>,
    hits: AtomicU64,
}

impl CacheEntry {
    fn new(ir: ConstraintIR) -> Self {
        Self {
            checksum: ir.content_digest(),
            ir,
            inserted_at: Utc::now(),
            hits: AtomicU64::new(0),
        }
    }

    fn verify(&self, key: &Fingerprint) -> Result<(), CacheError> {
        let reason = if self.ir.source_fingerprint != *key {
            "stored IR belongs to a different fingerprint"
        } else if self.ir.content_digest() != self.checksum {
            "content checksum mismatch"
        } else {
            return Ok(());
        };
        Err(CacheError::CacheCorruption {
            fingerprint: key.to_hex(),
            reason: reason.to_string(),
        })
    }

    pub fn inserted_at(&self) -> DateTime<Utc> {
        self.inserted_at
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    evictions: AtomicU64,
    corruptions: AtomicU64,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    /// Lookups that ran the compiler.
    pub misses: u64,
    /// Lookups served by another caller's compilation.
    pub coalesced: u64,
    pub evictions: u64,
    pub corruptions: u64,
    pub entries: u64,
}

impl CacheStats {
    /// Share of lookups that did not run the compiler.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.coalesced;
        if total == 0 {
            0.0
        } else {
            (self.hits + self.coalesced) as f64 / total as f64
        }
    }
}

/// In-process cache of compiled IRs. Cheap to clone; clones share storage.
#[derive(Clone)]
pub struct ArtifactCache {
    cache: Cache<Fingerprint, Arc<CacheEntry>>,
    counters: Arc<Counters>,
}

impl ArtifactCache {
    /// Create a cache holding at most `capacity` compiled IRs.
    pub fn new(capacity: u64) -> Self {
        let counters = Arc::new(Counters::default());
        let evictions = Arc::clone(&counters);
        let cache = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(move |_key, _value, cause: RemovalCause| {
                if cause.was_evicted() {
                    evictions.evictions.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();
        Self { cache, counters }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.effective_capacity())
    }

    /// Return the IR for `set`, compiling it with `compile` on a miss.
    ///
    /// Every caller receives its own copy. Failed compilations are not
    /// cached; every waiter on that compilation receives the error.
    pub fn get_or_compile<F>(
        &self,
        set: &ConstraintSet,
        compile: F,
    ) -> Result<ConstraintIR, CompileError>
    where
        F: FnOnce(&ConstraintSet) -> Result<ConstraintIR, CompileError>,
    {
        let key = set.fingerprint();

        if let Some(entry) = self.cache.get(&key) {
            match entry.verify(&key) {
                Ok(()) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    entry.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(entry.ir.clone());
                }
                Err(e) => {
                    tracing::warn!(
                        fingerprint = %key.short(),
                        error = %e.tagged_string(),
                        "dropping corrupted cache entry"
                    );
                    self.counters.corruptions.fetch_add(1, Ordering::Relaxed);
                    self.cache.invalidate(&key);
                }
            }
        }

        let compiled_here = AtomicBool::new(false);
        let result = self.cache.try_get_with(key, || {
            compiled_here.store(true, Ordering::Relaxed);
            compile(set).map(|ir| Arc::new(CacheEntry::new(ir)))
        });

        if compiled_here.load(Ordering::Relaxed) {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
        }

        match result {
            Ok(entry) => {
                tracing::debug!(fingerprint = %key.short(), "cache fill");
                Ok(entry.ir.clone())
            }
            Err(shared) => Err(CompileError::clone(&shared)),
        }
    }

    /// Lookup without compiling. Verifies integrity like `get_or_compile`.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<ConstraintIR> {
        let entry = self.cache.get(fingerprint)?;
        match entry.verify(fingerprint) {
            Ok(()) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                entry.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.ir.clone())
            }
            Err(e) => {
                tracing::warn!(error = %e.tagged_string(), "dropping corrupted cache entry");
                self.counters.corruptions.fetch_add(1, Ordering::Relaxed);
                self.cache.invalidate(fingerprint);
                None
            }
        }
    }

    /// Whether an entry is present. Does not count as an access.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.cache.contains_key(fingerprint)
    }

    pub fn invalidate(&self, fingerprint: &Fingerprint) {
        self.cache.invalidate(fingerprint);
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Apply pending evictions and bookkeeping now instead of lazily.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            corruptions: self.counters.corruptions.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
        }
    }
}

impl std::fmt::Debug for ArtifactCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCache")
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tether_core::{Constraint, FieldType, Priority};

    use super::*;

    fn set(field: &str) -> ConstraintSet {
        ConstraintSet::from_records(vec![Constraint::field(
            format!("{field}-type"),
            Priority::High,
            field,
            FieldType::String,
        )])
        .unwrap()
    }

    fn fake_compile(set: &ConstraintSet) -> Result<ConstraintIR, CompileError> {
        Ok(ConstraintIR::empty(set.fingerprint()))
    }

    #[test]
    fn second_lookup_is_a_hit() {
        let cache = ArtifactCache::new(8);
        let s = set("a");
        let first = cache.get_or_compile(&s, fake_compile).unwrap();
        let second = cache
            .get_or_compile(&s, |_| panic!("must not recompile"))
            .unwrap();
        assert!(first.same_content(&second));

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = ArtifactCache::new(8);
        let s = set("a");
        let err = cache
            .get_or_compile(&s, |_| Err(CompileError::invalid("a-type", "boom")))
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidConstraint { .. }));
        assert!(!cache.contains(&s.fingerprint()));
        cache.get_or_compile(&s, fake_compile).unwrap();
        assert!(cache.contains(&s.fingerprint()));
    }

    #[test]
    fn corrupted_entry_is_recompiled() {
        let cache = ArtifactCache::new(8);
        let s = set("a");
        let key = s.fingerprint();
        cache.get_or_compile(&s, fake_compile).unwrap();

        // Swap in an entry whose content no longer matches its checksum.
        let stored = cache.cache.get(&key).unwrap();
        let mut tampered = stored.ir.clone();
        tampered.notes.push(tether_core::ir::CompilationNote::ConflictResolved {
            kept: "x".into(),
            demoted: "y".into(),
            kept_priority: Priority::High,
            demoted_priority: Priority::Low,
        });
        cache.cache.insert(
            key,
            Arc::new(CacheEntry {
                ir: tampered,
                checksum: stored.checksum,
                inserted_at: stored.inserted_at,
                hits: AtomicU64::new(0),
            }),
        );

        let mut recompiled = 0;
        let ir = cache
            .get_or_compile(&s, |s| {
                recompiled += 1;
                fake_compile(s)
            })
            .unwrap();
        assert_eq!(recompiled, 1);
        assert!(ir.notes.is_empty());
        assert_eq!(cache.stats().corruptions, 1);
    }

    #[test]
    fn entry_for_another_fingerprint_is_corrupt() {
        let cache = ArtifactCache::new(8);
        let a = set("a");
        let b = set("b");
        let wrong = ConstraintIR::empty(b.fingerprint());
        cache.cache.insert(a.fingerprint(), Arc::new(CacheEntry::new(wrong)));
        assert!(cache.get(&a.fingerprint()).is_none());
        assert_eq!(cache.stats().corruptions, 1);
    }

    #[test]
    fn entry_tracks_its_own_hits() {
        let cache = ArtifactCache::new(8);
        let s = set("a");
        cache.get_or_compile(&s, fake_compile).unwrap();
        cache.get(&s.fingerprint()).unwrap();
        cache.get(&s.fingerprint()).unwrap();
        let entry = cache.cache.get(&s.fingerprint()).unwrap();
        assert_eq!(entry.hits(), 2);
        assert!(entry.inserted_at() <= Utc::now());
    }
}
