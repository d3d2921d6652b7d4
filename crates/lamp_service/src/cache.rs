//! In-memory reading cache with per-entry expiry.
//!
//! Uses `DashMap` so device requests can read concurrently while the
//! scheduler writes; each write only locks its own shard.

use std::time::Duration;

use async_trait::async_trait;
use common::{Error, SurfReading};
use dashmap::DashMap;
use tokio::time::Instant;

/// Key-value store for the latest reading of each location.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Latest unexpired reading, or `None` on absence or expiry.
    async fn get(&self, location: &str) -> Result<Option<SurfReading>, Error>;

    /// Store `reading`, replacing any previous entry for `location`.
    async fn put(&self, location: &str, reading: SurfReading, ttl: Duration) -> Result<(), Error>;

    /// Verify the store is reachable.
    async fn ping(&self) -> Result<(), Error>;

    /// Drop every expired entry. Returns how many were removed.
    fn purge_expired(&self) -> usize;

    /// Number of entries currently held, expired or not.
    fn entry_count(&self) -> usize;
}

/// A cached reading with its expiry deadline.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub reading: SurfReading,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-local cache store.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, location: &str) -> Result<Option<SurfReading>, Error> {
        let now = Instant::now();
        let hit = match self.entries.get(location) {
            Some(entry) if !entry.is_expired(now) => Some(entry.reading.clone()),
            Some(_) => None,
            None => return Ok(None),
        };

        if hit.is_none() {
            // remove_if re-checks expiry, so a concurrent put survives.
            self.entries.remove_if(location, |_, entry| entry.is_expired(now));
        }
        Ok(hit)
    }

    async fn put(&self, location: &str, reading: SurfReading, ttl: Duration) -> Result<(), Error> {
        self.entries.insert(
            location.to_string(),
            CacheEntry {
                reading,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), Error> {
        Ok(())
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const TTL: Duration = Duration::from_secs(1800);

    fn reading(location: &str, wave: f64) -> SurfReading {
        SurfReading {
            location: location.into(),
            wave_height_m: Some(wave),
            wave_period_s: Some(7.5),
            wind_speed_mps: Some(5.0),
            wind_direction_deg: Some(280),
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_then_get_returns_same_reading() {
        let cache = MemoryCache::new();
        let r = reading("Hadera, Israel", 1.2);

        cache.put("Hadera, Israel", r.clone(), TTL).await.expect("put");
        tokio::time::advance(Duration::from_secs(1799)).await;

        assert_eq!(cache.get("Hadera, Israel").await.expect("get"), Some(r));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::new();
        cache
            .put("Haifa, Israel", reading("Haifa, Israel", 0.6), TTL)
            .await
            .expect("put");

        tokio::time::advance(TTL).await;

        assert_eq!(cache.get("Haifa, Israel").await.expect("get"), None);
        assert_eq!(cache.entry_count(), 0, "expired entry should be dropped on read");
    }

    #[tokio::test]
    async fn test_absent_key_is_a_miss() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("Nowhere").await.expect("get"), None);
    }

    #[tokio::test]
    async fn test_put_replaces_previous_reading() {
        let cache = MemoryCache::new();
        cache.put("Ashdod, Israel", reading("Ashdod, Israel", 0.3), TTL).await.expect("put");
        cache.put("Ashdod, Israel", reading("Ashdod, Israel", 0.9), TTL).await.expect("put");

        let got = cache.get("Ashdod, Israel").await.expect("get").expect("hit");
        assert_eq!(got.wave_height_m, Some(0.9));
        assert_eq!(cache.entry_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_keeps_fresh_entries() {
        let cache = MemoryCache::new();
        cache
            .put("Old", reading("Old", 1.0), Duration::from_secs(10))
            .await
            .expect("put");
        cache.put("Fresh", reading("Fresh", 1.0), TTL).await.expect("put");

        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.entry_count(), 1);
        assert!(cache.get("Fresh").await.expect("get").is_some());
    }
}
