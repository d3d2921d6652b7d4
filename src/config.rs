//! Configuration loader: defaults, config.toml, .env, then env overrides.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use common::config::BandThresholds;
use common::{Error, LampServerConfig, ProviderKind};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn check_thresholds(name: &str, t: &BandThresholds, issues: &mut Vec<String>) {
    if !(t.mid.is_finite() && t.high.is_finite()) || t.mid < 0.0 || t.high < 0.0 {
        issues.push(format!("{name} thresholds must be finite and >= 0"));
    } else if t.mid > t.high {
        issues.push(format!(
            "{name}.mid ({}) must be <= {name}.high ({})",
            t.mid, t.high
        ));
    }
}

pub fn validate_config(config: &LampServerConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.locations.is_empty() {
        issues.push("locations must contain at least one location".into());
    }

    let mut names = HashSet::new();
    for location in &config.locations {
        if !names.insert(location.name.as_str()) {
            issues.push(format!("duplicate location name '{}'", location.name));
        }
        if location.sources.is_empty() {
            issues.push(format!("location '{}' has no sources", location.name));
        }
        for source in &location.sources {
            match source.resolved_kind() {
                None => issues.push(format!(
                    "location '{}': cannot determine provider kind for {}",
                    location.name, source.url
                )),
                Some(ProviderKind::OpenMeteoWind) if !source.url.contains("wind_speed_unit=ms") => {
                    issues.push(format!(
                        "location '{}': open-meteo wind URL must request wind_speed_unit=ms",
                        location.name
                    ))
                }
                Some(_) => {}
            }
        }
    }

    let mut lamp_ids = HashSet::new();
    for lamp in &config.lamps {
        if !lamp_ids.insert(lamp.lamp_id.as_str()) {
            issues.push(format!("duplicate lamp id '{}'", lamp.lamp_id));
        }
        if !names.contains(lamp.location.as_str()) {
            issues.push(format!(
                "lamp '{}' references unknown location '{}'",
                lamp.lamp_id, lamp.location
            ));
        }
        if let Some(t) = &lamp.wave_height_m {
            check_thresholds(&format!("lamps[{}].wave_height_m", lamp.lamp_id), t, &mut issues);
        }
        if let Some(t) = &lamp.wind_speed_mps {
            check_thresholds(&format!("lamps[{}].wind_speed_mps", lamp.lamp_id), t, &mut issues);
        }
    }

    if !(600..=1800).contains(&config.timing.refresh_interval_secs) {
        issues.push("timing.refresh_interval_secs must be between 600 and 1800".into());
    }
    if config.timing.fetch_timeout_secs == 0 {
        issues.push("timing.fetch_timeout_secs must be > 0".into());
    }
    if config.timing.heartbeat_interval_secs == 0 {
        issues.push("timing.heartbeat_interval_secs must be > 0".into());
    }
    if config.cache.ttl_secs == 0 {
        issues.push("cache.ttl_secs must be > 0".into());
    }
    if config.providers.requests_per_minute == 0 {
        issues.push("providers.requests_per_minute must be > 0".into());
    }

    check_thresholds("brightness.wave_height_m", &config.brightness.wave_height_m, &mut issues);
    check_thresholds("brightness.wind_speed_mps", &config.brightness.wind_speed_mps, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

fn read_config_file(path: &Path) -> Result<LampServerConfig, Error> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

fn apply_env_overrides(
    config: &mut LampServerConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(), Error> {
    if let Some(bind) = env("SURF_LAMP_BIND") {
        config.server.bind_addr = bind.trim().to_string();
    }
    if let Some(raw) = env("SURF_LAMP_CACHE_TTL_SECS") {
        config.cache.ttl_secs = parse_positive_u64(&raw, "SURF_LAMP_CACHE_TTL_SECS")?;
    }
    if let Some(raw) = env("SURF_LAMP_REFRESH_INTERVAL_SECS") {
        config.timing.refresh_interval_secs =
            parse_positive_u64(&raw, "SURF_LAMP_REFRESH_INTERVAL_SECS")?;
    }
    if let Some(raw) = env("SURF_LAMP_FETCH_TIMEOUT_SECS") {
        config.timing.fetch_timeout_secs = parse_positive_u64(&raw, "SURF_LAMP_FETCH_TIMEOUT_SECS")?;
    }
    if let Some(raw) = env("SURF_LAMP_REQUESTS_PER_MINUTE") {
        let rpm = parse_positive_u64(&raw, "SURF_LAMP_REQUESTS_PER_MINUTE")?;
        config.providers.requests_per_minute = u32::try_from(rpm).map_err(|_| {
            Error::Config("SURF_LAMP_REQUESTS_PER_MINUTE is out of range".into())
        })?;
    }
    Ok(())
}

fn load_with(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<LampServerConfig, Error> {
    // An explicitly named file must exist; the default one is optional.
    let explicit: Option<PathBuf> = path
        .map(Path::to_path_buf)
        .or_else(|| env("SURF_LAMP_CONFIG").map(PathBuf::from));

    let mut config = match explicit {
        Some(p) => read_config_file(&p)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                read_config_file(default_path)?
            } else {
                tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
                LampServerConfig::default()
            }
        }
    };

    apply_env_overrides(&mut config, env)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load service configuration from the environment and an optional file.
pub fn load_config(path: Option<&Path>) -> Result<LampServerConfig, Error> {
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }
    load_with(path, |name| std::env::var(name).ok())
}
