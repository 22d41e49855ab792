//! In-process context cache keyed by adventure id.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use storyloom_core::error::CoreError;
use storyloom_core::ports::ContextCache;
use storyloom_core::types::DbId;

/// How long an assembled character context stays cached.
pub const CONTEXT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// Per-adventure slot. The generation outlives the entry so a write that
/// raced an invalidation can still be refused after the entry is gone.
#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    entry: Option<CacheEntry>,
}

impl Slot {
    fn live(&self, now: Instant) -> Option<&CacheEntry> {
        self.entry.as_ref().filter(|e| e.expires_at > now)
    }
}

/// [`ContextCache`] backed by a concurrent map with per-entry expiry.
///
/// Expired entries are dropped lazily on read. Generation checks and writes
/// happen under the map's per-key lock.
#[derive(Debug, Default)]
pub struct InMemoryContextCache {
    slots: DashMap<DbId, Slot>,
}

impl InMemoryContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.slots.retain(|_, slot| {
            if slot.live(now).is_none() {
                slot.entry = None;
            }
            slot.entry.is_some() || slot.generation > 0
        });
    }
}

#[async_trait]
impl ContextCache for InMemoryContextCache {
    async fn get(&self, adventure_id: DbId) -> Result<Option<String>, CoreError> {
        let now = Instant::now();
        let Some(mut slot) = self.slots.get_mut(&adventure_id) else {
            return Ok(None);
        };
        if let Some(entry) = slot.live(now) {
            return Ok(Some(entry.value.clone()));
        }
        slot.entry = None;
        Ok(None)
    }

    async fn generation(&self, adventure_id: DbId) -> Result<u64, CoreError> {
        Ok(self
            .slots
            .get(&adventure_id)
            .map_or(0, |slot| slot.generation))
    }

    async fn set_if_generation(
        &self,
        adventure_id: DbId,
        value: String,
        ttl: Duration,
        generation: u64,
    ) -> Result<bool, CoreError> {
        let mut slot = self.slots.entry(adventure_id).or_default();
        if slot.generation != generation {
            return Ok(false);
        }
        slot.entry = Some(CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        });
        Ok(true)
    }

    async fn invalidate(&self, adventure_id: DbId) -> Result<(), CoreError> {
        let mut slot = self.slots.entry(adventure_id).or_default();
        slot.generation += 1;
        slot.entry = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_invalidate() {
        let cache = InMemoryContextCache::new();
        assert_eq!(cache.get(1).await.unwrap(), None);

        let generation = cache.generation(1).await.unwrap();
        assert!(cache
            .set_if_generation(1, "ctx".into(), CONTEXT_CACHE_TTL, generation)
            .await
            .unwrap());
        assert_eq!(cache.get(1).await.unwrap().as_deref(), Some("ctx"));
        assert_eq!(cache.get(2).await.unwrap(), None);

        cache.invalidate(1).await.unwrap();
        assert_eq!(cache.get(1).await.unwrap(), None);
        assert_eq!(cache.generation(1).await.unwrap(), generation + 1);
    }

    #[tokio::test]
    async fn write_after_invalidation_is_refused() {
        let cache = InMemoryContextCache::new();
        let before = cache.generation(7).await.unwrap();

        cache.invalidate(7).await.unwrap();
        let stored = cache
            .set_if_generation(7, "stale".into(), CONTEXT_CACHE_TTL, before)
            .await
            .unwrap();
        assert!(!stored);
        assert_eq!(cache.get(7).await.unwrap(), None);

        cache.purge_expired();
        assert_eq!(cache.generation(7).await.unwrap(), before + 1, "purge keeps generations");
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let cache = InMemoryContextCache::new();
        cache.set_if_generation(1, "stale".into(), Duration::ZERO, 0).await.unwrap();
        cache
            .set_if_generation(2, "fresh".into(), CONTEXT_CACHE_TTL, 0)
            .await
            .unwrap();

        assert_eq!(cache.get(1).await.unwrap(), None);
        assert_eq!(cache.len(), 1, "expired entry is dropped on read");

        cache.set_if_generation(3, "stale".into(), Duration::ZERO, 0).await.unwrap();
        cache.purge_expired();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(2).await.unwrap().as_deref(), Some("fresh"));
    }
}
