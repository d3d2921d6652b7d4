//! Periodic refresh of every configured location into the cache.
//!
//! A tick that arrives while a cycle is still in flight is dropped rather
//! than queued, so a slow upstream can never stack up overlapping cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::Location;
use surf_client::SurfFetcher;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

impl SchedulerState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ran,
    Skipped,
}

/// Counts from one refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub updated: usize,
    pub failed: usize,
    pub purged: usize,
}

pub struct RefreshScheduler {
    fetcher: Arc<dyn SurfFetcher>,
    cache: Arc<dyn CacheStore>,
    locations: Vec<Location>,
    ttl: Duration,
    interval: Duration,
    running: AtomicBool,
}

/// Clears the running flag when a cycle ends, including on panic.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RefreshScheduler {
    pub fn new(
        fetcher: Arc<dyn SurfFetcher>,
        cache: Arc<dyn CacheStore>,
        locations: Vec<Location>,
        ttl: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            cache,
            locations,
            ttl,
            interval,
            running: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::Acquire) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one cycle unless one is already in flight.
    pub async fn tick(&self) -> TickOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Refresh already running, skipping tick");
            return TickOutcome::Skipped;
        }
        let _guard = RunGuard(&self.running);

        self.run_cycle().await;
        TickOutcome::Ran
    }

    /// Fetch every location in order and write each reading through to the
    /// cache. Failures are logged per location and never abort the cycle.
    pub async fn run_cycle(&self) -> CycleSummary {
        let mut summary = CycleSummary {
            purged: self.cache.purge_expired(),
            ..Default::default()
        };

        for location in &self.locations {
            let reading = match self.fetcher.fetch(location).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(location = %location.name, "Refresh fetch failed: {}", e);
                    summary.failed += 1;
                    continue;
                }
            };

            match self.cache.put(&location.name, reading, self.ttl).await {
                Ok(()) => summary.updated += 1,
                Err(e) => {
                    warn!(location = %location.name, "Cache write failed: {}", e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            updated = summary.updated,
            failed = summary.failed,
            purged = summary.purged,
            "Refresh cycle complete"
        );
        summary
    }

    /// Drive `tick` on a fixed interval. The first tick fires immediately.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(
                "Refresh scheduler started: {} locations every {}s",
                self.locations.len(),
                self.interval.as_secs()
            );

            loop {
                ticker.tick().await;
                let scheduler = Arc::clone(&self);
                tokio::spawn(async move {
                    scheduler.tick().await;
                });
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::testing::{location, reading, FakeFetcher, RecordingCache};

    const TTL: Duration = Duration::from_secs(1800);
    const INTERVAL: Duration = Duration::from_secs(900);

    fn coast() -> Vec<Location> {
        vec![
            location("Tel Aviv, Israel"),
            location("Hadera, Israel"),
            location("Haifa, Israel"),
        ]
    }

    #[tokio::test]
    async fn test_timeout_on_one_location_still_updates_the_rest() {
        let fetcher = FakeFetcher::default()
            .with_reading(reading("Tel Aviv, Israel", 0.7, 4.0))
            .with_timeout("Hadera, Israel")
            .with_reading(reading("Haifa, Israel", 0.9, 8.0));
        let cache = Arc::new(MemoryCache::new());
        let scheduler = RefreshScheduler::new(Arc::new(fetcher), cache.clone(), coast(), TTL, INTERVAL);

        let summary = scheduler.run_cycle().await;

        assert_eq!(summary.updated, 2);
        assert_eq!(summary.failed, 1);
        assert!(cache.get("Tel Aviv, Israel").await.expect("get").is_some());
        assert!(cache.get("Haifa, Israel").await.expect("get").is_some());
        assert!(cache.get("Hadera, Israel").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_back_to_back_cycles_are_idempotent() {
        let fetcher = FakeFetcher::default()
            .with_reading(reading("Tel Aviv, Israel", 0.7, 4.0))
            .with_reading(reading("Hadera, Israel", 1.2, 5.0))
            .with_reading(reading("Haifa, Israel", 0.9, 8.0));
        let cache = Arc::new(MemoryCache::new());
        let scheduler = RefreshScheduler::new(Arc::new(fetcher), cache.clone(), coast(), TTL, INTERVAL);

        scheduler.run_cycle().await;
        let mut first = Vec::new();
        for loc in coast() {
            first.push(cache.get(&loc.name).await.expect("get"));
        }

        scheduler.run_cycle().await;
        let mut second = Vec::new();
        for loc in coast() {
            second.push(cache.get(&loc.name).await.expect("get"));
        }

        assert_eq!(first, second);
        assert_eq!(cache.entry_count(), 3);
    }

    #[tokio::test]
    async fn test_tick_while_running_is_skipped() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with_reading(reading("Hadera, Israel", 1.2, 5.0))
                .gated(),
        );
        let cache = Arc::new(RecordingCache::default());
        let scheduler = Arc::new(RefreshScheduler::new(
            fetcher.clone(),
            cache.clone(),
            vec![location("Hadera, Israel")],
            TTL,
            INTERVAL,
        ));

        let first = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.tick().await }
        });
        while fetcher.call_count() == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(scheduler.state(), SchedulerState::Running);
        assert_eq!(scheduler.tick().await, TickOutcome::Skipped);

        fetcher.release();
        assert_eq!(first.await.expect("join"), TickOutcome::Ran);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(cache.writes.lock().expect("lock").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_purges_expired_entries() {
        let cache = Arc::new(MemoryCache::new());
        cache
            .put("Ashdod, Israel", reading("Ashdod, Israel", 0.4, 3.0), Duration::from_secs(60))
            .await
            .expect("put");
        tokio::time::advance(Duration::from_secs(61)).await;

        let scheduler = RefreshScheduler::new(
            Arc::new(FakeFetcher::default()),
            cache.clone(),
            Vec::new(),
            TTL,
            INTERVAL,
        );

        assert_eq!(scheduler.run_cycle().await.purged, 1);
        assert_eq!(cache.entry_count(), 0);
    }
}
