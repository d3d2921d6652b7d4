//! Provider payload normalization.
//!
//! Each provider speaks its own JSON dialect. These functions pull the
//! canonical metrics out of a parsed payload and never fail on missing
//! fields: a metric the provider omitted is simply `None`.

use chrono::{DateTime, Timelike, Utc};
use common::{Error, PartialReading, ProviderKind};
use serde_json::Value;
use tracing::debug;

const ISRAMAR_WAVE_HEIGHT: &str = "Significant wave height";
const ISRAMAR_WAVE_PERIOD: &str = "Peak wave period";

/// Extract metrics from a provider payload.
///
/// Returns `Error::Upstream` only when the payload is not a JSON object.
pub fn normalize(
    kind: ProviderKind,
    source_name: &str,
    payload: &Value,
    now: DateTime<Utc>,
) -> Result<PartialReading, Error> {
    if !payload.is_object() {
        return Err(Error::upstream(
            source_name,
            format!("expected a JSON object from {}", kind.label()),
        ));
    }

    let reading = match kind {
        ProviderKind::OpenMeteoMarine => open_meteo_marine(payload, now),
        ProviderKind::OpenMeteoWind => open_meteo_wind(payload, now),
        ProviderKind::Isramar => isramar(payload),
        ProviderKind::OpenWeatherMap => open_weather_map(payload),
    };

    debug!("{} ({}): {:?}", source_name, kind.label(), reading);
    Ok(reading)
}

/// Index of the current UTC hour in an open-meteo `hourly.time` array.
///
/// Falls back to 0 when the hour is not present.
pub fn current_hour_index(times: &[Value], now: DateTime<Utc>) -> usize {
    let hour = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .unwrap_or(now);
    let prefix = hour.format("%Y-%m-%dT%H:%M").to_string();

    times
        .iter()
        .position(|t| t.as_str().is_some_and(|s| s.starts_with(&prefix)))
        .unwrap_or(0)
}

fn hourly_value(payload: &Value, field: &str, index: usize) -> Option<f64> {
    payload
        .get("hourly")?
        .get(field)?
        .as_array()?
        .get(index)?
        .as_f64()
        .filter(|v| v.is_finite())
}

fn hourly_index(payload: &Value, now: DateTime<Utc>) -> usize {
    payload
        .get("hourly")
        .and_then(|h| h.get("time"))
        .and_then(Value::as_array)
        .map(|times| current_hour_index(times, now))
        .unwrap_or(0)
}

fn direction(raw: Option<f64>) -> Option<i32> {
    raw.filter(|v| v.is_finite())
        .map(|deg| (deg.round() as i64).rem_euclid(360) as i32)
}

fn open_meteo_marine(payload: &Value, now: DateTime<Utc>) -> PartialReading {
    let i = hourly_index(payload, now);
    PartialReading {
        wave_height_m: hourly_value(payload, "wave_height", i),
        wave_period_s: hourly_value(payload, "wave_period", i),
        ..Default::default()
    }
}

fn open_meteo_wind(payload: &Value, now: DateTime<Utc>) -> PartialReading {
    let i = hourly_index(payload, now);
    PartialReading {
        wind_speed_mps: hourly_value(payload, "wind_speed_10m", i),
        wind_direction_deg: direction(hourly_value(payload, "wind_direction_10m", i)),
        ..Default::default()
    }
}

fn isramar(payload: &Value) -> PartialReading {
    let mut reading = PartialReading::default();
    let Some(params) = payload.get("parameters").and_then(Value::as_array) else {
        return reading;
    };

    for param in params {
        let name = param.get("name").and_then(Value::as_str).unwrap_or_default();
        let first = param
            .get("values")
            .and_then(Value::as_array)
            .and_then(|v| v.first())
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite());

        if name.contains(ISRAMAR_WAVE_HEIGHT) {
            reading.wave_height_m = reading.wave_height_m.or(first);
        } else if name.contains(ISRAMAR_WAVE_PERIOD) {
            reading.wave_period_s = reading.wave_period_s.or(first);
        }
    }

    reading
}

fn open_weather_map(payload: &Value) -> PartialReading {
    let wind = payload.get("wind");
    PartialReading {
        wind_speed_mps: wind
            .and_then(|w| w.get("speed"))
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite()),
        wind_direction_deg: direction(wind.and_then(|w| w.get("deg")).and_then(Value::as_f64)),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    #[test]
    fn test_marine_uses_current_hour() {
        let payload = json!({
            "hourly": {
                "time": ["2025-09-13T00:00", "2025-09-13T01:00", "2025-09-13T02:00"],
                "wave_height": [0.4, 0.9, 1.3],
                "wave_period": [5.0, 6.5, 7.0],
                "wave_direction": [270, 280, 290]
            }
        });

        let reading = normalize(
            ProviderKind::OpenMeteoMarine,
            "marine",
            &payload,
            at("2025-09-13T01:42:10Z"),
        )
        .expect("object payload");

        assert_eq!(reading.wave_height_m, Some(0.9));
        assert_eq!(reading.wave_period_s, Some(6.5));
        assert_eq!(reading.wind_speed_mps, None);
        assert_eq!(reading.wind_direction_deg, None);
    }

    #[test]
    fn test_missing_hour_falls_back_to_first_entry() {
        let times = vec![json!("2025-09-13T00:00"), json!("2025-09-13T01:00")];
        assert_eq!(current_hour_index(&times, at("2030-01-01T05:00:00Z")), 0);
        assert_eq!(current_hour_index(&times, at("2025-09-13T01:59:59Z")), 1);
    }

    #[test]
    fn test_wind_partial_data_is_null_not_error() {
        let payload = json!({
            "hourly": {
                "time": ["2025-09-13T00:00"],
                "wind_speed_10m": [null],
                "wind_direction_10m": [359.6]
            }
        });

        let reading = normalize(
            ProviderKind::OpenMeteoWind,
            "wind",
            &payload,
            at("2025-09-13T00:10:00Z"),
        )
        .expect("object payload");

        assert_eq!(reading.wind_speed_mps, None);
        assert_eq!(reading.wind_direction_deg, Some(0));
    }

    #[test]
    fn test_isramar_parameters() {
        let payload = json!({
            "datetime": "2025-08-14 17:00 UTC",
            "parameters": [
                {"name": "Significant wave height", "units": "m", "values": [0.41]},
                {"name": "Peak wave period", "units": "s", "values": [3.5]},
                {"name": "Water temperature", "units": "C", "values": []}
            ]
        });

        let reading =
            normalize(ProviderKind::Isramar, "isramar", &payload, Utc::now()).expect("object");

        assert_eq!(reading.wave_height_m, Some(0.41));
        assert_eq!(reading.wave_period_s, Some(3.5));
        assert_eq!(reading.wind_speed_mps, None);
    }

    #[test]
    fn test_isramar_without_parameters_is_empty() {
        let reading = normalize(ProviderKind::Isramar, "isramar", &json!({}), Utc::now())
            .expect("object payload");
        assert_eq!(reading, PartialReading::default());
    }

    #[test]
    fn test_open_weather_map_wind() {
        let payload = json!({
            "name": "Hadera",
            "main": {"temp": 298.1, "humidity": 60},
            "wind": {"speed": 5.2, "deg": 300}
        });

        let reading = normalize(ProviderKind::OpenWeatherMap, "owm", &payload, Utc::now())
            .expect("object payload");

        assert_eq!(reading.wind_speed_mps, Some(5.2));
        assert_eq!(reading.wind_direction_deg, Some(300));
        assert_eq!(reading.wave_height_m, None);
    }

    #[test]
    fn test_non_object_payload_is_upstream_error() {
        let err = normalize(ProviderKind::OpenWeatherMap, "owm", &json!([1, 2]), Utc::now())
            .expect_err("array payload must be rejected");
        assert!(matches!(err, Error::Upstream { .. }));
    }

    #[test]
    fn test_negative_direction_wraps() {
        assert_eq!(direction(Some(-90.0)), Some(270));
        assert_eq!(direction(Some(720.4)), Some(0));
        assert_eq!(direction(Some(f64::NAN)), None);
    }
}
