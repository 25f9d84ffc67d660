use lru::LruCache;
use tracing::trace;

/// Lowercased text and its word split, as used by word-prefix matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSearchData {
    pub lowercased: String,
    pub words: Vec<String>,
}

#[derive(Debug)]
struct CacheEntry {
    data: CachedSearchData,
    size: usize,
}

/// Size-bounded LRU memo of [`CachedSearchData`], keyed by the raw text.
///
/// Sizes are estimates: 2 bytes per character of the key and the lowercased text,
/// 8 bytes per word slot and 2 bytes per character of each word. `size()` never
/// exceeds `max_size()` once a `set` has returned.
pub struct SearchCache {
    // Unbounded by count; eviction is driven by the byte budget.
    entries: LruCache<String, CacheEntry>,
    total_size: usize,
    max_size: usize,
}

impl std::fmt::Debug for SearchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchCache")
            .field("len", &self.entries.len())
            .field("total_size", &self.total_size)
            .field("max_size", &self.max_size)
            .finish()
    }
}

impl SearchCache {
    pub fn new(max_size_bytes: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            total_size: 0,
            max_size: max_size_bytes,
        }
    }

    pub fn get(&mut self, key: &str) -> Option<CachedSearchData> {
        self.entries.get(key).map(|entry| entry.data.clone())
    }

    pub fn set(&mut self, key: &str, data: CachedSearchData) {
        let size = estimate_size(key, &data);

        if let Some((_, replaced)) = self.entries.push(key.to_string(), CacheEntry { data, size }) {
            self.total_size -= replaced.size;
        }
        self.total_size += size;

        self.evict_if_needed();
    }

    pub fn get_or_compute<F>(&mut self, key: &str, compute: F) -> CachedSearchData
    where
        F: FnOnce() -> CachedSearchData,
    {
        if let Some(cached) = self.get(key) {
            return cached;
        }
        let computed = compute();
        self.set(key, computed.clone());
        computed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_size = 0;
    }

    pub fn size(&self) -> usize {
        self.total_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_if_needed(&mut self) {
        while self.total_size > self.max_size {
            let Some((key, entry)) = self.entries.pop_lru() else { break };
            self.total_size -= entry.size;
            trace!(key = %key, size = entry.size, "Evicted search cache entry");
        }
    }
}

fn estimate_size(key: &str, data: &CachedSearchData) -> usize {
    let chars = |s: &str| s.chars().count();
    (chars(key) + chars(&data.lowercased)) * 2
        + data.words.len() * 8
        + data.words.iter().map(|w| chars(w) * 2).sum::<usize>()
}
