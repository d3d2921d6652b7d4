//! Brightness derivation from surf metrics.

use common::config::{BandThresholds, BrightnessConfig};
use common::BrightnessLevel;

fn band(value: Option<f64>, thresholds: &BandThresholds) -> Option<BrightnessLevel> {
    let v = value.filter(|v| v.is_finite())?;
    Some(if v >= thresholds.high {
        BrightnessLevel::High
    } else if v >= thresholds.mid {
        BrightnessLevel::Mid
    } else {
        BrightnessLevel::Low
    })
}

/// Band for a pair of metrics. The brighter metric wins; a missing or
/// non-finite metric does not contribute; with neither, `fallback` is used.
pub fn brightness_level(
    table: &BrightnessConfig,
    wave_height_m: Option<f64>,
    wind_speed_mps: Option<f64>,
    fallback: BrightnessLevel,
) -> BrightnessLevel {
    let wave = band(wave_height_m, &table.wave_height_m);
    let wind = band(wind_speed_mps, &table.wind_speed_mps);

    match (wave, wind) {
        (Some(a), Some(b)) => a.max(b),
        (Some(a), None) | (None, Some(a)) => a,
        (None, None) => fallback,
    }
}

/// Device brightness (0-255) for a pair of metrics.
pub fn brightness_value(
    table: &BrightnessConfig,
    wave_height_m: Option<f64>,
    wind_speed_mps: Option<f64>,
    fallback: BrightnessLevel,
) -> u8 {
    let level = brightness_level(table, wave_height_m, wind_speed_mps, fallback);
    table.levels.value_for(level)
}
