use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// A map whose entries go stale `ttl` after insertion.
///
/// Stale entries are never returned. They stay in memory until overwritten,
/// purged, or the cache is cleared.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (V, Instant)>,
}

impl<K: Eq + Hash, V> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.get_at(key, Instant::now())
    }

    /// Same as [`Self::get`], evaluated at `now`.
    pub fn get_at(&self, key: &K, now: Instant) -> Option<&V> {
        let (value, inserted_at) = self.entries.get(key)?;
        let age = now.saturating_duration_since(*inserted_at);
        (age < self.ttl).then_some(value)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&mut self, key: K, value: V, now: Instant) {
        self.entries.insert(key, (value, now));
    }

    /// Time since `key` was stored, fresh or not.
    pub fn age(&self, key: &K) -> Option<Duration> {
        self.entries
            .get(key)
            .map(|(_, inserted_at)| inserted_at.elapsed())
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(value, _)| value)
    }

    /// Drops every stale entry and returns how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, (_, inserted_at)| inserted_at.elapsed() < ttl);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_should_return_fresh_entries() {
        let mut cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(&1));
        assert_eq!(cache.get(&"b"), None);
    }

    #[test]
    fn get_at_should_hide_entries_past_ttl() {
        let mut cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert_at("a", 1, t0);

        assert_eq!(cache.get_at(&"a", t0 + Duration::from_secs(59)), Some(&1));
        assert_eq!(cache.get_at(&"a", t0 + Duration::from_secs(60)), None);
        assert_eq!(cache.len(), 1, "stale entries stay until purged");
    }

    #[test]
    fn zero_ttl_should_never_hit() {
        let mut cache: TtlCache<u8, u8> = TtlCache::new(Duration::ZERO);
        cache.insert(1, 1);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_should_refresh_timestamp() {
        let mut cache: TtlCache<u8, u8> = TtlCache::new(Duration::from_secs(10));
        let t0 = Instant::now();
        cache.insert_at(1, 1, t0);
        cache.insert_at(1, 2, t0 + Duration::from_secs(8));
        assert_eq!(cache.get_at(&1, t0 + Duration::from_secs(12)), Some(&2));
    }

    #[test]
    fn clear_should_empty_cache() {
        let mut cache: TtlCache<u8, u8> = TtlCache::new(Duration::from_secs(10));
        cache.insert(1, 1);
        cache.insert(2, 2);
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.age(&1).is_none());
    }
}
