use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::hash::Hash;
use std::sync::Arc;

/// Concurrent map of compute-once cells.
///
/// Callers racing on the same key block on the first caller's initialization
/// and reuse its value. A failed initialization leaves the cell empty, so the
/// next caller runs its own attempt.
pub struct OnceMap<K, V> {
    cells: DashMap<K, Arc<OnceCell<V>>>,
}

impl<K, V> OnceMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            cells: DashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.cells.get(key).and_then(|cell| cell.get().cloned())
    }

    pub fn get_or_try_init<E>(&self, key: K, init: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        // Clone the cell out so the shard lock is not held during initialization
        let cell = Arc::clone(self.cells.entry(key).or_default().value());
        cell.get_or_try_init(init).cloned()
    }

    pub fn remove(&self, key: &K) {
        self.cells.remove(key);
    }

    pub fn clear(&self) {
        self.cells.clear();
    }

    /// Number of initialized entries.
    pub fn len(&self) -> usize {
        self.cells.iter().filter(|cell| cell.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for OnceMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_failed_init_is_not_memoized() {
        let map: OnceMap<&str, u32> = OnceMap::new();

        let failed: Result<u32, &str> = map.get_or_try_init("key", || Err("boom"));
        assert!(failed.is_err());
        assert_eq!(map.get(&"key"), None);
        assert!(map.is_empty());

        let ok: Result<u32, &str> = map.get_or_try_init("key", || Ok(7));
        assert_eq!(ok, Ok(7));

        let cached: Result<u32, &str> = map.get_or_try_init("key", || Ok(8));
        assert_eq!(cached, Ok(7));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_racing_callers_share_one_computation() {
        let map: OnceMap<u32, u64> = OnceMap::new();
        let calls = AtomicUsize::new(0);
        let threads = 8;
        let barrier = Barrier::new(threads);

        std::thread::scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|| {
                    barrier.wait();
                    let value: Result<u64, ()> = map.get_or_try_init(1, || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(20));
                        Ok(42)
                    });
                    assert_eq!(value, Ok(42));
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
