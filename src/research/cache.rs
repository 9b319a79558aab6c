use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// In-memory cache of research findings keyed by normalized topic.
///
/// Entries expire after `ttl`. When full, the oldest entry is evicted.
#[derive(Clone, Debug)]
pub struct SearchCache {
    max_size: usize,
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, (Instant, String)>>>,
}

impl SearchCache {
    pub const DEFAULT_MAX_SIZE: usize = 100;
    pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            max_size,
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Lower-cased, trimmed form used as the cache key.
    pub fn normalize(topic: &str) -> String {
        topic.trim().to_lowercase()
    }

    pub fn get(&self, topic: &str) -> Option<String> {
        let key = Self::normalize(topic);
        let mut entries = self.entries.lock().expect("search cache lock poisoned");

        let expired = match entries.get(&key) {
            Some((stored_at, _)) => stored_at.elapsed() > self.ttl,
            None => return None,
        };
        if expired {
            tracing::debug!(topic = %key, "Research cache entry expired");
            entries.remove(&key);
            return None;
        }
        entries.get(&key).map(|(_, value)| value.clone())
    }

    pub fn insert(&self, topic: &str, findings: String) {
        if self.max_size == 0 {
            return;
        }
        let key = Self::normalize(topic);
        let mut entries = self.entries.lock().expect("search cache lock poisoned");

        if entries.len() >= self.max_size && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, (stored_at, _))| *stored_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                tracing::debug!(topic = %oldest, "Research cache full, evicting oldest entry");
                entries.remove(&oldest);
            }
        }
        entries.insert(key, (Instant::now(), findings));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("search cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_SIZE, Self::DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_case_and_surrounding_space() {
        let cache = SearchCache::default();
        cache.insert("  Meal Planning ", "findings".to_string());
        assert_eq!(cache.get("meal planning").as_deref(), Some("findings"));
    }

    #[test]
    fn evicts_oldest_when_full() {
        let cache = SearchCache::new(2, Duration::from_secs(60));
        cache.insert("first", "1".to_string());
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("second", "2".to_string());
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("third", "3".to_string());

        assert_eq!(cache.len(), 2);
        assert!(cache.get("first").is_none());
        assert!(cache.get("second").is_some());
        assert!(cache.get("third").is_some());
    }

    #[test]
    fn overwriting_a_key_does_not_evict() {
        let cache = SearchCache::new(1, Duration::from_secs(60));
        cache.insert("topic", "old".to_string());
        cache.insert("topic", "new".to_string());
        assert_eq!(cache.get("topic").as_deref(), Some("new"));
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = SearchCache::new(10, Duration::from_millis(0));
        cache.insert("topic", "value".to_string());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("topic").is_none());
        assert!(cache.is_empty());
    }
}
