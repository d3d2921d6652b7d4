//! Service configuration types.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::BrightnessLevel;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LampServerConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Locations to keep fresh in the cache.
    #[serde(default = "default_locations")]
    pub locations: Vec<Location>,

    /// Registered lamps.
    #[serde(default)]
    pub lamps: Vec<LampRecord>,

    /// Cache parameters.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Timing parameters (seconds).
    #[serde(default)]
    pub timing: TimingConfig,

    /// Outbound provider settings.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Brightness threshold table.
    #[serde(default)]
    pub brightness: BrightnessConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

/// A named physical point and the providers that describe it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Human-readable name, also the cache key (e.g. "Hadera, Israel").
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Provider endpoints, merged by ascending `priority`.
    #[serde(default)]
    pub sources: Vec<ProviderSource>,
}

impl Location {
    /// Sources ordered by priority; ties keep declaration order.
    pub fn sources_by_priority(&self) -> Vec<&ProviderSource> {
        let mut sources: Vec<&ProviderSource> = self.sources.iter().collect();
        sources.sort_by_key(|s| s.priority);
        sources
    }
}

/// One provider endpoint for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSource {
    /// Payload format. Detected from the URL host when omitted.
    #[serde(default)]
    pub kind: Option<ProviderKind>,
    pub url: String,
    /// 1 = highest priority.
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Sent as a bearer token when present.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ProviderSource {
    pub fn resolved_kind(&self) -> Option<ProviderKind> {
        self.kind.or_else(|| ProviderKind::detect(&self.url))
    }
}

/// Supported provider payload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// marine-api.open-meteo.com hourly wave data.
    OpenMeteoMarine,
    /// api.open-meteo.com hourly 10m wind data.
    OpenMeteoWind,
    /// Israel Oceanographic buoy station JSON.
    Isramar,
    /// openweathermap.org current weather.
    OpenWeatherMap,
}

impl ProviderKind {
    /// Guess the payload format from the endpoint host. Paths and query
    /// strings are ignored.
    pub fn detect(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();
        let on = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

        if on("marine-api.open-meteo.com") {
            Some(Self::OpenMeteoMarine)
        } else if on("open-meteo.com") {
            Some(Self::OpenMeteoWind)
        } else if on("isramar.ocean.org.il") {
            Some(Self::Isramar)
        } else if on("openweathermap.org") {
            Some(Self::OpenWeatherMap)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::OpenMeteoMarine => "open_meteo_marine",
            Self::OpenMeteoWind => "open_meteo_wind",
            Self::Isramar => "isramar",
            Self::OpenWeatherMap => "open_weather_map",
        }
    }
}

/// A lamp registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LampRecord {
    pub lamp_id: String,
    /// Name of a configured location.
    pub location: String,
    /// Band used when no metric is available; falls back to
    /// `brightness.default_level`.
    #[serde(default)]
    pub brightness_level: Option<BrightnessLevel>,
    /// Overrides `brightness.wave_height_m` for this lamp.
    #[serde(default)]
    pub wave_height_m: Option<BandThresholds>,
    /// Overrides `brightness.wind_speed_mps` for this lamp.
    #[serde(default)]
    pub wind_speed_mps: Option<BandThresholds>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cached reading.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

/// Timing configuration (all values in seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Refresh scheduler interval.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Bound on a single provider request.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Heartbeat log interval.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Outbound request budget shared by every provider call.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Endpoint hit by the readiness check. Defaults to the first
    /// configured source.
    #[serde(default)]
    pub ready_check_url: Option<String>,
}

/// Threshold table mapping metrics to brightness bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrightnessConfig {
    /// Band used when no metric is available.
    #[serde(default = "default_level")]
    pub default_level: BrightnessLevel,

    #[serde(default = "default_wave_thresholds")]
    pub wave_height_m: BandThresholds,

    #[serde(default = "default_wind_thresholds")]
    pub wind_speed_mps: BandThresholds,

    #[serde(default)]
    pub levels: LevelValues,
}

/// Lower bounds of the mid and high bands for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandThresholds {
    pub mid: f64,
    pub high: f64,
}

/// Device brightness emitted for each band (0-255).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelValues {
    #[serde(default = "default_low_value")]
    pub low: u8,
    #[serde(default = "default_mid_value")]
    pub mid: u8,
    #[serde(default = "default_high_value")]
    pub high: u8,
}

impl LevelValues {
    pub fn value_for(&self, level: BrightnessLevel) -> u8 {
        match level {
            BrightnessLevel::Low => self.low,
            BrightnessLevel::Mid => self.mid,
            BrightnessLevel::High => self.high,
        }
    }
}

impl BrightnessConfig {
    /// This table with a lamp's own band thresholds swapped in.
    pub fn with_overrides(
        &self,
        wave_height_m: Option<BandThresholds>,
        wind_speed_mps: Option<BandThresholds>,
    ) -> Self {
        Self {
            wave_height_m: wave_height_m.unwrap_or(self.wave_height_m),
            wind_speed_mps: wind_speed_mps.unwrap_or(self.wind_speed_mps),
            ..self.clone()
        }
    }
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_bind_addr() -> String {
    "0.0.0.0:8080".into()
}
fn default_priority() -> u32 {
    1
}
fn default_cache_ttl() -> u64 {
    1800
}
fn default_refresh_interval() -> u64 {
    900
}
fn default_fetch_timeout() -> u64 {
    10
}
fn default_heartbeat_interval() -> u64 {
    300
}
fn default_requests_per_minute() -> u32 {
    60
}
fn default_user_agent() -> String {
    "SurfLamp-Agent/1.0".into()
}
fn default_level() -> BrightnessLevel {
    BrightnessLevel::Mid
}
fn default_wave_thresholds() -> BandThresholds {
    BandThresholds { mid: 0.5, high: 1.0 }
}
fn default_wind_thresholds() -> BandThresholds {
    BandThresholds {
        mid: 6.0,
        high: 11.0,
    }
}
fn default_low_value() -> u8 {
    13
}
fn default_mid_value() -> u8 {
    77
}
fn default_high_value() -> u8 {
    255
}

fn open_meteo_location(name: &str, lat: f64, lon: f64) -> Location {
    Location {
        name: name.into(),
        lat,
        lon,
        sources: vec![
            ProviderSource {
                kind: Some(ProviderKind::OpenMeteoMarine),
                url: format!(
                    "https://marine-api.open-meteo.com/v1/marine?latitude={lat}&longitude={lon}&hourly=wave_height,wave_period,wave_direction"
                ),
                priority: 1,
                api_key: None,
            },
            ProviderSource {
                kind: Some(ProviderKind::OpenMeteoWind),
                url: format!(
                    "https://api.open-meteo.com/v1/forecast?latitude={lat}&longitude={lon}&hourly=wind_speed_10m,wind_direction_10m&wind_speed_unit=ms"
                ),
                priority: 2,
                api_key: None,
            },
        ],
    }
}

fn default_locations() -> Vec<Location> {
    let hadera = Location {
        name: "Hadera, Israel".into(),
        lat: 32.4365,
        lon: 34.9196,
        sources: vec![
            ProviderSource {
                kind: Some(ProviderKind::Isramar),
                url: "https://isramar.ocean.org.il/isramar2009/station/data/Hadera_Hs_Per.json"
                    .into(),
                priority: 1,
                api_key: None,
            },
            ProviderSource {
                kind: Some(ProviderKind::OpenMeteoWind),
                url: "https://api.open-meteo.com/v1/forecast?latitude=32.4365&longitude=34.9196&hourly=wind_speed_10m,wind_direction_10m&wind_speed_unit=ms".into(),
                priority: 2,
                api_key: None,
            },
            ProviderSource {
                kind: Some(ProviderKind::OpenMeteoWind),
                url: "https://api.open-meteo.com/v1/gfs?latitude=32.4365&longitude=34.9196&hourly=wind_speed_10m,wind_direction_10m&wind_speed_unit=ms".into(),
                priority: 3,
                api_key: None,
            },
        ],
    };

    vec![
        open_meteo_location("Tel Aviv, Israel", 32.0853, 34.7818),
        hadera,
        open_meteo_location("Ashdod, Israel", 31.7939, 34.6328),
        open_meteo_location("Haifa, Israel", 32.7940, 34.9896),
        open_meteo_location("Netanya, Israel", 32.3215, 34.8532),
        open_meteo_location("Nahariya, Israel", 33.006, 35.094),
        open_meteo_location("Ashkelon, Israel", 31.6699, 34.5738),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            fetch_timeout_secs: default_fetch_timeout(),
            heartbeat_interval_secs: default_heartbeat_interval(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            user_agent: default_user_agent(),
            ready_check_url: None,
        }
    }
}

impl Default for LevelValues {
    fn default() -> Self {
        Self {
            low: default_low_value(),
            mid: default_mid_value(),
            high: default_high_value(),
        }
    }
}

impl Default for BrightnessConfig {
    fn default() -> Self {
        Self {
            default_level: default_level(),
            wave_height_m: default_wave_thresholds(),
            wind_speed_mps: default_wind_thresholds(),
            levels: LevelValues::default(),
        }
    }
}

impl Default for LampServerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            locations: default_locations(),
            lamps: Vec::new(),
            cache: CacheConfig::default(),
            timing: TimingConfig::default(),
            providers: ProvidersConfig::default(),
            brightness: BrightnessConfig::default(),
        }
    }
}
