//! Domain types shared across the service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BandThresholds;

// ── Surf readings ─────────────────────────────────────────────────────

/// Canonical reading for one location, produced by the fetcher.
///
/// Every metric is optional: providers routinely omit fields and a partial
/// reading is still a valid reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfReading {
    pub location: String,
    pub wave_height_m: Option<f64>,
    pub wave_period_s: Option<f64>,
    pub wind_speed_mps: Option<f64>,
    pub wind_direction_deg: Option<i32>,
    pub fetched_at: DateTime<Utc>,
}

/// Metrics extracted from a single provider payload.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartialReading {
    pub wave_height_m: Option<f64>,
    pub wave_period_s: Option<f64>,
    pub wind_speed_mps: Option<f64>,
    pub wind_direction_deg: Option<i32>,
}

impl PartialReading {
    /// True once every metric is present.
    pub fn is_complete(&self) -> bool {
        self.wave_height_m.is_some()
            && self.wave_period_s.is_some()
            && self.wind_speed_mps.is_some()
            && self.wind_direction_deg.is_some()
    }

    /// Fill every field still missing in `self` from `other`.
    pub fn fill_from(&mut self, other: &PartialReading) {
        self.wave_height_m = self.wave_height_m.or(other.wave_height_m);
        self.wave_period_s = self.wave_period_s.or(other.wave_period_s);
        self.wind_speed_mps = self.wind_speed_mps.or(other.wind_speed_mps);
        self.wind_direction_deg = self.wind_direction_deg.or(other.wind_direction_deg);
    }

    pub fn into_reading(self, location: impl Into<String>, fetched_at: DateTime<Utc>) -> SurfReading {
        SurfReading {
            location: location.into(),
            wave_height_m: self.wave_height_m,
            wave_period_s: self.wave_period_s,
            wind_speed_mps: self.wind_speed_mps,
            wind_direction_deg: self.wind_direction_deg,
            fetched_at,
        }
    }
}

// ── Lamps ─────────────────────────────────────────────────────────────

/// Brightness band a lamp is driven at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrightnessLevel {
    Low,
    Mid,
    High,
}

/// A lamp as resolved by the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LampConfig {
    pub lamp_id: String,
    /// Location name; empty for unregistered lamps.
    pub location: String,
    /// Band used when no metric is available.
    pub brightness_level: BrightnessLevel,
    /// Per-lamp wave band thresholds; the global table applies when unset.
    pub wave_height_m: Option<BandThresholds>,
    /// Per-lamp wind band thresholds; the global table applies when unset.
    pub wind_speed_mps: Option<BandThresholds>,
    pub registered: bool,
}

// ── Wire types ────────────────────────────────────────────────────────

/// Document served to polling lamp devices. Field names and types are a
/// fixed contract with the firmware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArduinoResponse {
    pub registered: bool,
    pub brightness: u8,
    pub location_used: String,
    pub wave_height_m: Option<f64>,
    pub wave_period_s: Option<f64>,
    pub wind_speed_mps: Option<f64>,
    pub wind_deg: Option<i32>,
    pub error: Option<String>,
}
