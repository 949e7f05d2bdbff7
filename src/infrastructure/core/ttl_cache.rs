use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Memoized values with a fixed time-to-live, owned by whoever builds it.
///
/// Expired entries are evicted when read and swept on every insert, so keys that are never
/// read again do not accumulate. Values are cloned out, so keep `V` cheap to clone.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now()).await
    }

    pub async fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now()).await;
    }

    async fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        None
    }

    async fn insert_at(&self, key: K, value: V, now: Instant) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
