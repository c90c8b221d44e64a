use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

type Cell<V> = Arc<Mutex<Option<V>>>;

/// Compute-once cache keyed by argument tuple.
///
/// Each key owns a cell whose lock is held while its value is computed, so
/// concurrent first calls with the same key run the computation once and the
/// others wait for its result. Different keys compute in parallel. Failed
/// computations leave the cell empty and the next caller retries.
pub struct MemoCache<K, V> {
    cells: Mutex<HashMap<K, Cell<V>>>,
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Cached value for `key`, computing it with `compute` on first use.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(cells.entry(key).or_default())
        };

        let mut slot = cell.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = slot.as_ref() {
            return Ok(value.clone());
        }
        match compute() {
            Ok(value) => {
                *slot = Some(value.clone());
                Ok(value)
            }
            Err(e) => {
                self.forget_failed(&cell);
                Err(e)
            }
        }
    }

    /// Drop a cell whose computation failed, unless other callers are
    /// already waiting on it to retry.
    fn forget_failed(&self, cell: &Cell<V>) {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one held by the failing caller.
        if Arc::strong_count(cell) == 2 {
            cells.retain(|_, c| !Arc::ptr_eq(c, cell));
        }
    }

    /// Number of keys with a cell, cached or still computing.
    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Cached value for `key` without computing anything.
    pub fn get(&self, key: &K) -> Option<V> {
        let cell = {
            let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
            cells.get(key).cloned()?
        };
        let slot = cell.lock().unwrap_or_else(PoisonError::into_inner);
        slot.clone()
    }

    /// Number of keys with a cached value.
    pub fn len(&self) -> usize {
        let cells: Vec<Cell<V>> = self
            .cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        cells
            .iter()
            .filter(|cell| {
                cell.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<K, V> Default for MemoCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_second_call_uses_cached_value() {
        let cache = MemoCache::new();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(true)
        };

        assert_eq!(cache.get_or_try_insert_with("a", compute), Ok(true));
        assert_eq!(cache.get_or_try_insert_with("a", compute), Ok(true));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get(&"a"), Some(true));
    }

    #[test]
    fn test_distinct_keys_compute_separately() {
        let cache = MemoCache::new();
        cache.get_or_try_insert_with(("a", 0), || Ok::<_, ()>(1)).unwrap();
        cache.get_or_try_insert_with(("a", 1), || Ok::<_, ()>(2)).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&("a", 1)), Some(2));
    }

    #[test]
    fn test_failure_is_not_cached() {
        let cache: MemoCache<&str, bool> = MemoCache::new();

        assert_eq!(cache.get_or_try_insert_with("a", || Err("boom")), Err("boom"));
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_try_insert_with("a", || Ok::<_, &str>(false)), Ok(false));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failing_keys_do_not_accumulate() {
        let cache: MemoCache<usize, bool> = MemoCache::new();

        for key in 0..100 {
            assert!(cache.get_or_try_insert_with(key, || Err::<bool, _>("unreadable")).is_err());
        }

        assert_eq!(cache.tracked_keys(), 0);
        cache.get_or_try_insert_with(7, || Ok::<_, ()>(true)).unwrap();
        assert_eq!(cache.tracked_keys(), 1);
    }

    #[test]
    fn test_clear_forgets_values() {
        let cache = MemoCache::new();
        cache.get_or_try_insert_with(1, || Ok::<_, ()>(true)).unwrap();
        cache.clear();
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn test_concurrent_first_calls_compute_once() {
        let cache = Arc::new(MemoCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_try_insert_with("same", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok::<_, ()>(true)
                        })
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|&r| r));
    }
}
