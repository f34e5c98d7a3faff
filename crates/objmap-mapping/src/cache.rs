//! Rule set cache
//!
//! One slot per type name. The first caller for a type builds its rule set
//! while holding the slot's lock, so concurrent first lookups wait for that
//! single build instead of racing.

use crate::rule::RuleSet;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, trace};

type Slot = Arc<Mutex<Option<Arc<RuleSet>>>>;

/// Concurrent cache of built rule sets keyed by type name
#[derive(Debug, Default)]
pub struct RuleSetCache {
    slots: DashMap<String, Slot>,
    builds: AtomicUsize,
}

impl RuleSetCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached rule set for `type_name`, building it on first use
    ///
    /// A failed build leaves the slot empty; the next caller tries again.
    ///
    /// # Errors
    ///
    /// Returns whatever error `build` returns.
    pub fn get_or_build<F>(&self, type_name: &str, build: F) -> crate::Result<Arc<RuleSet>>
    where
        F: FnOnce() -> crate::Result<RuleSet>,
    {
        let slot = self.slot(type_name);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(rules) = guard.as_ref() {
            debug!("Cache hit for rule set: {}", type_name);
            return Ok(Arc::clone(rules));
        }

        trace!("Cache miss for rule set: {}", type_name);
        let rules = Arc::new(build()?);
        self.builds.fetch_add(1, Ordering::SeqCst);
        info!(rules = rules.len(), "Built rule set for {}", type_name);

        *guard = Some(Arc::clone(&rules));
        Ok(rules)
    }

    fn slot(&self, type_name: &str) -> Slot {
        if let Some(slot) = self.slots.get(type_name) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.slots.entry(type_name.to_string()).or_default().value())
    }

    /// Cached rule set, without building
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<Arc<RuleSet>> {
        let slot = Arc::clone(self.slots.get(type_name)?.value());
        let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// Drop every cached rule set; the build counter keeps counting
    pub fn reset(&self) {
        info!("Resetting rule set cache ({} types)", self.slots.len());
        self.slots.clear();
    }

    /// Number of builds executed since creation
    #[must_use]
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Number of types with a slot (built or being built)
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn test_builds_once() {
        let cache = RuleSetCache::new();

        let first = cache.get_or_build("Person", || Ok(RuleSet::new("Person"))).unwrap();
        let second = cache
            .get_or_build("Person", || panic!("must not rebuild"))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.builds(), 1);
        assert!(cache.get("Person").is_some());
        assert!(cache.get("Other").is_none());
    }

    #[test]
    fn test_failed_build_is_retried() {
        let cache = RuleSetCache::new();

        let failed = cache.get_or_build("Ghost", || {
            Err(crate::Error::UnknownType("Ghost".to_string()))
        });
        assert!(failed.is_err());
        assert!(cache.get("Ghost").is_none());

        cache.get_or_build("Ghost", || Ok(RuleSet::new("Ghost"))).unwrap();
        assert_eq!(cache.builds(), 1);
    }

    #[test]
    fn test_reset_forces_rebuild() {
        let cache = RuleSetCache::new();
        cache.get_or_build("Person", || Ok(RuleSet::new("Person"))).unwrap();
        cache.reset();
        assert!(cache.is_empty());

        cache.get_or_build("Person", || Ok(RuleSet::new("Person"))).unwrap();
        assert_eq!(cache.builds(), 2);
    }

    #[test]
    fn test_concurrent_first_lookup_builds_once() {
        const THREADS: usize = 16;
        let cache = RuleSetCache::new();
        let barrier = Barrier::new(THREADS);

        let results: Vec<Arc<RuleSet>> = std::thread::scope(|scope| {
            let cache = &cache;
            let barrier = &barrier;
            let mut handles = Vec::with_capacity(THREADS);
            for _ in 0..THREADS {
                handles.push(scope.spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_build("Shared", || {
                            std::thread::sleep(std::time::Duration::from_millis(20));
                            Ok(RuleSet::new("Shared"))
                        })
                        .unwrap()
                }));
            }
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(cache.builds(), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
