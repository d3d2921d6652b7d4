//! Lamp configuration read path.
//!
//! A device poll resolves the lamp, peeks the cache for its location and
//! only falls back to a live fetch on a miss. Each path ends in one
//! [`ConfigOutcome`], which maps to the device document.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::config::BrightnessConfig;
use common::{ArduinoResponse, Error, LampConfig, LampServerConfig, Location, SurfReading};
use serde::Serialize;
use surf_client::SurfFetcher;
use tracing::{debug, info, warn};

use crate::brightness::brightness_value;
use crate::cache::CacheStore;
use crate::registry::LampRegistry;

/// How a configuration request was answered.
#[derive(Debug)]
pub enum ConfigOutcome {
    Unregistered,
    Hit { lamp: LampConfig, reading: SurfReading },
    Fetched { lamp: LampConfig, reading: SurfReading },
    FetchFailed { lamp: LampConfig, error: Error },
}

impl ConfigOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unregistered => "unregistered",
            Self::Hit { .. } => "hit",
            Self::Fetched { .. } => "fetched",
            Self::FetchFailed { .. } => "fetch_failed",
        }
    }

    pub fn to_response(&self, table: &BrightnessConfig) -> ArduinoResponse {
        match self {
            Self::Unregistered => ArduinoResponse {
                registered: false,
                brightness: table.levels.value_for(table.default_level),
                location_used: String::new(),
                wave_height_m: None,
                wave_period_s: None,
                wind_speed_mps: None,
                wind_deg: None,
                error: None,
            },
            Self::Hit { lamp, reading } | Self::Fetched { lamp, reading } => ArduinoResponse {
                registered: true,
                brightness: brightness_value(
                    &table.with_overrides(lamp.wave_height_m, lamp.wind_speed_mps),
                    reading.wave_height_m,
                    reading.wind_speed_mps,
                    lamp.brightness_level,
                ),
                location_used: lamp.location.clone(),
                wave_height_m: reading.wave_height_m,
                wave_period_s: reading.wave_period_s,
                wind_speed_mps: reading.wind_speed_mps,
                wind_deg: reading.wind_direction_deg,
                error: None,
            },
            Self::FetchFailed { lamp, error } => ArduinoResponse {
                registered: true,
                brightness: table.levels.value_for(lamp.brightness_level),
                location_used: lamp.location.clone(),
                wave_height_m: None,
                wave_period_s: None,
                wind_speed_mps: None,
                wind_deg: None,
                error: Some(error.to_string()),
            },
        }
    }
}

/// A registered lamp with whatever the cache currently holds for it.
#[derive(Debug, Clone, Serialize)]
pub struct LampStatus {
    pub lamp_id: String,
    pub location: String,
    pub reading: Option<SurfReading>,
}

pub struct LampConfigService {
    registry: Arc<dyn LampRegistry>,
    cache: Arc<dyn CacheStore>,
    fetcher: Arc<dyn SurfFetcher>,
    locations: HashMap<String, Location>,
    brightness: BrightnessConfig,
    ttl: Duration,
}

impl LampConfigService {
    pub fn new(
        registry: Arc<dyn LampRegistry>,
        cache: Arc<dyn CacheStore>,
        fetcher: Arc<dyn SurfFetcher>,
        locations: impl IntoIterator<Item = Location>,
        brightness: BrightnessConfig,
        ttl: Duration,
    ) -> Self {
        Self {
            registry,
            cache,
            fetcher,
            locations: locations.into_iter().map(|l| (l.name.clone(), l)).collect(),
            brightness,
            ttl,
        }
    }

    pub fn from_config(
        cfg: &LampServerConfig,
        registry: Arc<dyn LampRegistry>,
        cache: Arc<dyn CacheStore>,
        fetcher: Arc<dyn SurfFetcher>,
    ) -> Self {
        Self::new(
            registry,
            cache,
            fetcher,
            cfg.locations.iter().cloned(),
            cfg.brightness.clone(),
            Duration::from_secs(cfg.cache.ttl_secs),
        )
    }

    pub fn brightness(&self) -> &BrightnessConfig {
        &self.brightness
    }

    /// Work out how to answer `lamp_id`. Only an unreachable cache is an
    /// `Err`; every upstream problem becomes `FetchFailed`.
    pub async fn resolve(&self, lamp_id: &str) -> Result<ConfigOutcome, Error> {
        let lamp = match self.registry.resolve(lamp_id).await {
            Ok(lamp) => lamp,
            Err(Error::UnknownDevice(_)) => return Ok(ConfigOutcome::Unregistered),
            Err(e) => return Err(e),
        };

        if let Some(reading) = self.cache.get(&lamp.location).await? {
            return Ok(ConfigOutcome::Hit { lamp, reading });
        }

        let Some(location) = self.locations.get(&lamp.location) else {
            let error = Error::Config(format!("location '{}' is not configured", lamp.location));
            return Ok(ConfigOutcome::FetchFailed { lamp, error });
        };

        debug!(lamp_id, location = %location.name, "Cache miss, fetching");
        match self.fetcher.fetch(location).await {
            Ok(reading) => {
                if let Err(e) = self.cache.put(&location.name, reading.clone(), self.ttl).await {
                    warn!(location = %location.name, "Write-through failed: {}", e);
                }
                Ok(ConfigOutcome::Fetched { lamp, reading })
            }
            Err(error) => {
                warn!(lamp_id, location = %location.name, "On-demand fetch failed: {}", error);
                Ok(ConfigOutcome::FetchFailed { lamp, error })
            }
        }
    }

    /// Device document for `lamp_id`.
    pub async fn get_config(&self, lamp_id: &str) -> Result<ArduinoResponse, Error> {
        let outcome = self.resolve(lamp_id).await?;
        let response = outcome.to_response(&self.brightness);
        info!(
            lamp_id,
            outcome = outcome.label(),
            brightness = response.brightness,
            "Served lamp config"
        );
        Ok(response)
    }

    /// Every registered lamp with its cached reading. Never fetches.
    pub async fn overview(&self) -> Result<Vec<LampStatus>, Error> {
        let lamps = self.registry.lamps().await?;
        let mut statuses = Vec::with_capacity(lamps.len());
        for lamp in lamps {
            let reading = self.cache.get(&lamp.location).await?;
            statuses.push(LampStatus {
                lamp_id: lamp.lamp_id,
                location: lamp.location,
                reading,
            });
        }
        Ok(statuses)
    }
}
