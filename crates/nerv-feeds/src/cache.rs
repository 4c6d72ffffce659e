use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Values remembered for a fixed time-to-live. The caller supplies the clock
/// reading so expiry is deterministic under test.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (Instant, V)>,
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

    /// Returns the value for `key` if it was stored less than one TTL before `now`.
    pub fn get(&self, key: &K, now: Instant) -> Option<&V> {
        let (stored_at, value) = self.entries.get(key)?;
        (now.saturating_duration_since(*stored_at) < self.ttl).then_some(value)
    }

    pub fn insert(&mut self, key: K, value: V, now: Instant) {
        self.entries.insert(key, (now, value));
    }

    pub fn invalidate(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(15 * 60);

    #[test]
    fn fresh_entry_is_returned() {
        let t0 = Instant::now();
        let mut cache = TtlCache::new(TTL);
        cache.insert("cal", 3, t0);
        assert_eq!(cache.get(&"cal", t0 + Duration::from_secs(60)), Some(&3));
    }

    #[test]
    fn entry_expires_at_ttl() {
        let t0 = Instant::now();
        let mut cache = TtlCache::new(TTL);
        cache.insert("cal", 3, t0);
        assert_eq!(cache.get(&"cal", t0 + TTL - Duration::from_secs(1)), Some(&3));
        assert_eq!(cache.get(&"cal", t0 + TTL), None);
    }

    #[test]
    fn reinsert_refreshes_timestamp() {
        let t0 = Instant::now();
        let mut cache = TtlCache::new(TTL);
        cache.insert("cal", 1, t0);
        let later = t0 + TTL + Duration::from_secs(5);
        cache.insert("cal", 2, later);
        assert_eq!(cache.get(&"cal", later + Duration::from_secs(1)), Some(&2));
    }

    #[test]
    fn invalidate_and_clear_drop_entries() {
        let t0 = Instant::now();
        let mut cache = TtlCache::new(TTL);
        cache.insert("a", 1, t0);
        cache.insert("b", 2, t0);
        assert_eq!(cache.invalidate(&"a"), Some(1));
        assert_eq!(cache.get(&"a", t0), None);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn clock_going_backwards_counts_as_fresh() {
        let t0 = Instant::now() + Duration::from_secs(10);
        let mut cache = TtlCache::new(TTL);
        cache.insert("cal", 7, t0);
        assert_eq!(cache.get(&"cal", t0 - Duration::from_secs(5)), Some(&7));
    }
}
