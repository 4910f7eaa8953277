use document_model::DocumentState;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug)]
struct CacheEntry {
    state: DocumentState,
    last_used: u64,
}

/// Bounded, strictly least-recently-used map from document URI to its last analysis state.
///
/// Both [`get`](Self::get) and [`set`](Self::set) mark the key as most recently used.
/// Entries never expire; they leave through eviction or explicit removal only.
#[derive(Debug)]
pub struct DocumentStateCache {
    entries: HashMap<String, CacheEntry>,
    capacity: usize,
    clock: u64,
}

impl DocumentStateCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub fn get(&mut self, uri: &str) -> Option<&DocumentState> {
        let now = self.tick();
        let entry = self.entries.get_mut(uri)?;
        entry.last_used = now;
        Some(&entry.state)
    }

    /// Stores `state`, returning the URI evicted to make room for it, if any.
    pub fn set(&mut self, uri: impl Into<String>, state: DocumentState) -> Option<String> {
        let uri = uri.into();
        let last_used = self.tick();
        self.entries
            .insert(uri.clone(), CacheEntry { state, last_used });

        if self.entries.len() <= self.capacity {
            return None;
        }

        let evicted = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone())?;
        self.entries.remove(&evicted);
        info!(
            "Evicted least recently used document {} (capacity {})",
            evicted, self.capacity
        );
        Some(evicted)
    }

    pub fn delete(&mut self, uri: &str) -> bool {
        let removed = self.entries.remove(uri).is_some();
        if removed {
            debug!("Removed cached analysis state for {}", uri);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.entries.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn state(uri: &str, version: i64) -> DocumentState {
        DocumentState {
            uri: uri.to_string(),
            version,
            content_hash: format!("hash-{version}"),
            language: "typescript".to_string(),
            line_count: 1,
            last_modified_at: Utc::now(),
            last_analyzed_at: None,
            scopes: Vec::new(),
            content: String::new(),
        }
    }

    #[test]
    fn test_set_and_get() {
        let mut cache = DocumentStateCache::new(2);
        assert!(cache.is_empty());

        cache.set("a", state("a", 1));

        assert_eq!(cache.get("a").map(|s| s.version), Some(1));
        assert!(cache.get("b").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_set_replaces_existing_entry() {
        let mut cache = DocumentStateCache::new(2);
        cache.set("a", state("a", 1));
        let evicted = cache.set("a", state("a", 2));

        assert_eq!(evicted, None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").map(|s| s.version), Some(2));
    }

    #[test]
    fn test_evicts_least_recently_set() {
        let mut cache = DocumentStateCache::new(2);
        cache.set("a", state("a", 1));
        cache.set("b", state("b", 1));
        let evicted = cache.set("c", state("c", 1));

        assert_eq!(evicted.as_deref(), Some("a"));
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a"));
    }

    #[test]
    fn test_get_refreshes_recency() {
        let mut cache = DocumentStateCache::new(2);
        cache.set("a", state("a", 1));
        cache.set("b", state("b", 1));
        cache.get("a");
        let evicted = cache.set("c", state("c", 1));

        assert_eq!(evicted.as_deref(), Some("b"));
        assert!(cache.contains("a"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn test_delete_and_clear() {
        let mut cache = DocumentStateCache::new(4);
        cache.set("a", state("a", 1));
        cache.set("b", state("b", 1));

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut cache = DocumentStateCache::new(0);
        cache.set("a", state("a", 1));

        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.len(), 1);
    }
}
