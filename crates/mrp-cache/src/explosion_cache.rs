use chrono::{DateTime, Utc};
use mrp_core::{GrossRequirement, PartNumber, Serial};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Memoization key: identical `(part, target serial)` pairs expand to the
/// same unit structure regardless of demanded quantity.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ExplosionCacheKey {
    pub part: PartNumber,
    pub target_serial: Serial,
}

impl ExplosionCacheKey {
    pub fn new(part: PartNumber, target_serial: Serial) -> Self {
        Self {
            part,
            target_serial,
        }
    }
}

/// One memoized subtree, normalized to a demand of one unit. Traces are
/// relative to the subtree root (bare part number at the root) so a hit
/// can re-anchor them under any demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplosionCacheEntry {
    pub unit_requirements: Vec<GrossRequirement>,
    pub lead_time_days: i64,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entries kept before the oldest insertion is evicted; 0 = unbounded
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 5_000 }
    }
}

/// Counters observed by a run; a pure accelerator must prove itself here
/// rather than in the plan output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub evictions: u64,
}

/// Shared explosion memo (C7). Lookups take the read lock; the single
/// write at insertion (and any eviction) briefly holds the exclusive lock.
/// Hit/miss counters are atomics so hits stay non-exclusive.
pub struct ExplosionCache {
    state: RwLock<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
    config: CacheConfig,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<ExplosionCacheKey, ExplosionCacheEntry>,
    insertion_order: VecDeque<ExplosionCacheKey>,
    evictions: u64,
}

impl ExplosionCache {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            config,
        }
    }

    /// Unbounded cache
    pub fn unbounded() -> Self {
        Self::with_config(CacheConfig { max_entries: 0 })
    }

    pub fn get(&self, key: &ExplosionCacheKey) -> Option<ExplosionCacheEntry> {
        let state = self.state.read().unwrap();
        match state.entries.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn contains(&self, key: &ExplosionCacheKey) -> bool {
        let state = self.state.read().unwrap();
        state.entries.contains_key(key)
    }

    pub fn insert(&self, key: ExplosionCacheKey, entry: ExplosionCacheEntry) {
        let mut state = self.state.write().unwrap();

        if state.entries.insert(key.clone(), entry).is_none() {
            state.insertion_order.push_back(key);
        }

        if self.config.max_entries > 0 {
            while state.entries.len() > self.config.max_entries {
                let Some(oldest) = state.insertion_order.pop_front() else {
                    break;
                };
                state.entries.remove(&oldest);
                state.evictions += 1;
            }
        }
    }

    pub fn clear(&self) {
        let mut state = self.state.write().unwrap();
        state.entries.clear();
        state.insertion_order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.read().unwrap();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: state.entries.len(),
            evictions: state.evictions,
        }
    }

    pub fn reset_counters(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

impl Default for ExplosionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn key(part: &str) -> ExplosionCacheKey {
        ExplosionCacheKey::new(PartNumber::new(part), Serial::new("SN001"))
    }

    fn entry(part: &str) -> ExplosionCacheEntry {
        ExplosionCacheEntry {
            unit_requirements: vec![GrossRequirement {
                part: PartNumber::new(part),
                quantity: 1,
                need_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                demand_trace: part.to_string(),
                location: "FACTORY".to_string(),
                target_serial: Serial::new("SN001"),
            }],
            lead_time_days: 10,
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn test_basic_put_get() {
        let cache = ExplosionCache::new();

        assert!(cache.get(&key("A")).is_none());
        cache.insert(key("A"), entry("A"));

        let cached = cache.get(&key("A")).unwrap();
        assert_eq!(cached.unit_requirements.len(), 1);
        assert_eq!(cached.lead_time_days, 10);

        // Different serial under the same part must miss
        let other = ExplosionCacheKey::new(PartNumber::new("A"), Serial::new("SN002"));
        assert!(cache.get(&other).is_none());
    }

    #[test]
    fn test_hit_miss_counters() {
        let cache = ExplosionCache::new();
        cache.insert(key("A"), entry("A"));

        cache.get(&key("A"));
        cache.get(&key("A"));
        cache.get(&key("B"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_oldest_entry_evicted_first() {
        let cache = ExplosionCache::with_config(CacheConfig { max_entries: 2 });

        cache.insert(key("A"), entry("A"));
        cache.insert(key("B"), entry("B"));
        cache.insert(key("C"), entry("C"));

        assert!(cache.get(&key("A")).is_none()); // evicted
        assert!(cache.get(&key("B")).is_some());
        assert!(cache.get(&key("C")).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_reinsert_does_not_grow_order() {
        let cache = ExplosionCache::with_config(CacheConfig { max_entries: 2 });

        cache.insert(key("A"), entry("A"));
        cache.insert(key("A"), entry("A"));
        cache.insert(key("B"), entry("B"));

        // Both still resident: the re-insert must not have queued A twice
        assert!(cache.get(&key("A")).is_some());
        assert!(cache.get(&key("B")).is_some());
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_unbounded_when_zero() {
        let cache = ExplosionCache::unbounded();
        for i in 0..100 {
            cache.insert(key(&format!("P{}", i)), entry("X"));
        }
        assert_eq!(cache.stats().entries, 100);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_clear() {
        let cache = ExplosionCache::new();
        cache.insert(key("A"), entry("A"));
        cache.clear();
        assert!(cache.get(&key("A")).is_none());
        assert_eq!(cache.stats().entries, 0);
    }
}
