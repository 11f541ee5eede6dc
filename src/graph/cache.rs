//! Bounded memoization for search and inspect lookups.
//!
//! The decision-maker often repeats a search or inspection a few steps apart.
//! [`CachedGraph`] remembers recent answers keyed by the normalized argument.
//! Callers get equal values back, not the same allocation.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;

use super::{EntityRecord, GraphBackend, GraphResult, PropertyExample, QueryStatus, Row, SearchHit};

/// Fixed-capacity map that evicts the oldest insertion first.
pub struct BoundedCache<K, V> {
    capacity: usize,
    inner: Mutex<CacheInner<K, V>>,
}

struct CacheInner<K, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
}

impl<K: Eq + Hash + Clone, V: Clone> BoundedCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.entries.insert(key.clone(), value).is_none() {
            inner.order.push_back(key);
        }
        while inner.entries.len() > self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<K, V> std::fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// A [`GraphBackend`] wrapper that memoizes successful search and inspect calls.
///
/// Queries and property examples pass straight through. Failed lookups are not cached.
pub struct CachedGraph<G> {
    inner: G,
    searches: BoundedCache<(String, usize), Vec<SearchHit>>,
    entities: BoundedCache<String, EntityRecord>,
}

impl<G: GraphBackend> CachedGraph<G> {
    pub fn new(inner: G, capacity: usize) -> Self {
        Self {
            inner,
            searches: BoundedCache::new(capacity),
            entities: BoundedCache::new(capacity),
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    /// Cached entries across both lookup kinds.
    pub fn cached_entries(&self) -> usize {
        self.searches.len() + self.entities.len()
    }
}

fn search_key(term: &str) -> String {
    term.trim().to_lowercase()
}

impl<G: GraphBackend> GraphBackend for CachedGraph<G> {
    fn query(&self, sparql: &str) -> (Vec<Row>, QueryStatus) {
        self.inner.query(sparql)
    }

    fn search(&self, term: &str, limit: usize) -> GraphResult<Vec<SearchHit>> {
        let key = (search_key(term), limit);
        if let Some(hits) = self.searches.get(&key) {
            tracing::debug!(term, "search cache hit");
            return Ok(hits);
        }
        let hits = self.inner.search(term.trim(), limit)?;
        self.searches.insert(key, hits.clone());
        Ok(hits)
    }

    fn inspect_entity(&self, id: &str) -> GraphResult<EntityRecord> {
        let key = id.trim().to_string();
        if let Some(record) = self.entities.get(&key) {
            tracing::debug!(id, "inspect cache hit");
            return Ok(record);
        }
        let record = self.inner.inspect_entity(&key)?;
        self.entities.insert(key, record.clone());
        Ok(record)
    }

    fn property_examples(
        &self,
        property: &str,
        limit: usize,
    ) -> GraphResult<Vec<PropertyExample>> {
        self.inner.property_examples(property, limit)
    }
}

impl<G: std::fmt::Debug> std::fmt::Debug for CachedGraph<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedGraph")
            .field("inner", &self.inner)
            .field("capacity", &self.searches.capacity())
            .finish()
    }
}
