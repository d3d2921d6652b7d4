//! Fakes shared by the scheduler and service tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use common::{Error, Location, SurfReading};
use surf_client::SurfFetcher;
use tokio::sync::Notify;

use crate::cache::CacheStore;

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 13, 6, 0, 0).single().unwrap_or_default()
}

pub fn location(name: &str) -> Location {
    Location {
        name: name.into(),
        lat: 32.0,
        lon: 34.8,
        sources: Vec::new(),
    }
}

pub fn reading(name: &str, wave: f64, wind: f64) -> SurfReading {
    SurfReading {
        location: name.into(),
        wave_height_m: Some(wave),
        wave_period_s: Some(6.0),
        wind_speed_mps: Some(wind),
        wind_direction_deg: Some(270),
        fetched_at: fixed_time(),
    }
}

/// Fetcher serving canned readings; listed locations time out.
#[derive(Default)]
pub struct FakeFetcher {
    readings: HashMap<String, SurfReading>,
    timeouts: HashSet<String>,
    gate: Option<Notify>,
    pub calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn with_reading(mut self, reading: SurfReading) -> Self {
        self.readings.insert(reading.location.clone(), reading);
        self
    }

    pub fn with_timeout(mut self, location: &str) -> Self {
        self.timeouts.insert(location.to_string());
        self
    }

    /// Block every fetch until `release` is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SurfFetcher for FakeFetcher {
    async fn fetch(&self, location: &Location) -> Result<SurfReading, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.timeouts.contains(&location.name) {
            return Err(Error::Timeout {
                source_name: location.name.clone(),
                after_ms: 10_000,
            });
        }
        self.readings
            .get(&location.name)
            .cloned()
            .ok_or_else(|| Error::upstream(&location.name, "returned 404: not found"))
    }

    async fn ping(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Cache whose backend is unreachable.
pub struct DownCache;

#[async_trait]
impl CacheStore for DownCache {
    async fn get(&self, _location: &str) -> Result<Option<SurfReading>, Error> {
        Err(Error::CacheUnavailable("connection refused".into()))
    }

    async fn put(&self, _location: &str, _reading: SurfReading, _ttl: Duration) -> Result<(), Error> {
        Err(Error::CacheUnavailable("connection refused".into()))
    }

    async fn ping(&self) -> Result<(), Error> {
        Err(Error::CacheUnavailable("connection refused".into()))
    }

    fn purge_expired(&self) -> usize {
        0
    }

    fn entry_count(&self) -> usize {
        0
    }
}

/// Cache that records every write.
#[derive(Default)]
pub struct RecordingCache {
    pub writes: Mutex<Vec<String>>,
    inner: crate::cache::MemoryCache,
}

#[async_trait]
impl CacheStore for RecordingCache {
    async fn get(&self, location: &str) -> Result<Option<SurfReading>, Error> {
        self.inner.get(location).await
    }

    async fn put(&self, location: &str, reading: SurfReading, ttl: Duration) -> Result<(), Error> {
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(location.to_string());
        }
        self.inner.put(location, reading, ttl).await
    }

    async fn ping(&self) -> Result<(), Error> {
        Ok(())
    }

    fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }

    fn entry_count(&self) -> usize {
        self.inner.entry_count()
    }
}
