// src/reclaim.rs - Reclamation primitives for the threshold controller

use crate::scheduler::guard::lock;
use log::debug;
use lru::LruCache;
use std::sync::Mutex;

/// Frees or compacts a managed resource pool down to `budget`.
///
/// Must be safe to call repeatedly: the focus-lost path and the idle path
/// may both reclaim in the same session with no ordering between them.
pub trait Reclaimer: Send + Sync {
    /// Returns how many units were released.
    fn reclaim(&self, budget: u64) -> anyhow::Result<usize>;
}

impl<F> Reclaimer for F
where
    F: Fn(u64) -> anyhow::Result<usize> + Send + Sync,
{
    fn reclaim(&self, budget: u64) -> anyhow::Result<usize> {
        self(budget)
    }
}

/// LRU cache of derived text (rendered views, formatted buffers) that the
/// host can rebuild on demand. Reclaiming evicts least-recently-used entries
/// until at most `budget` remain.
#[derive(Debug)]
pub struct ViewCache {
    cache: Mutex<LruCache<String, String>>,
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewCache {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(LruCache::unbounded()),
        }
    }

    /// Get a view from the cache, or build it with `loader`
    ///
    /// # Arguments
    ///
    /// * `key` - Unique name of the view (task name plus generation)
    /// * `loader` - Builds the view when it is not cached
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The cached or freshly built view
    /// * `Err(anyhow::Error)` - If the loader fails; nothing is cached
    pub fn get_or_load<F>(&self, key: &str, loader: F) -> anyhow::Result<String>
    where
        F: FnOnce() -> anyhow::Result<String>,
    {
        let mut cache = lock(&self.cache);

        if let Some(view) = cache.get(key) {
            return Ok(view.clone());
        }

        let view = loader()?;
        cache.put(key.to_string(), view.clone());
        Ok(view)
    }

    pub fn insert(&self, key: &str, view: String) {
        lock(&self.cache).put(key.to_string(), view);
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.cache).contains(key)
    }

    pub fn clear(&self) {
        lock(&self.cache).clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.cache).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.cache).is_empty()
    }
}

impl Reclaimer for ViewCache {
    fn reclaim(&self, budget: u64) -> anyhow::Result<usize> {
        let budget = usize::try_from(budget).unwrap_or(usize::MAX);
        let mut cache = lock(&self.cache);
        let mut evicted = 0;
        while cache.len() > budget {
            if cache.pop_lru().is_none() {
                break;
            }
            evicted += 1;
        }
        debug!("Reclaimed {} cached views (budget {})", evicted, budget);
        Ok(evicted)
    }
}
