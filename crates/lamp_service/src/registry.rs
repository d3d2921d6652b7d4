//! Lamp registrations.

use std::collections::HashMap;

use async_trait::async_trait;
use common::{Error, LampConfig, LampServerConfig};

/// Lookup of registered lamps.
#[async_trait]
pub trait LampRegistry: Send + Sync {
    /// Resolve a lamp, failing with `Error::UnknownDevice` if it is not
    /// registered.
    async fn resolve(&self, lamp_id: &str) -> Result<LampConfig, Error>;

    /// Every registered lamp, ordered by id.
    async fn lamps(&self) -> Result<Vec<LampConfig>, Error>;
}

/// Registry loaded once from the service configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    lamps: HashMap<String, LampConfig>,
}

impl StaticRegistry {
    pub fn new(lamps: impl IntoIterator<Item = LampConfig>) -> Self {
        Self {
            lamps: lamps.into_iter().map(|l| (l.lamp_id.clone(), l)).collect(),
        }
    }

    pub fn from_config(cfg: &LampServerConfig) -> Self {
        Self::new(cfg.lamps.iter().map(|record| LampConfig {
            lamp_id: record.lamp_id.clone(),
            location: record.location.clone(),
            brightness_level: record
                .brightness_level
                .unwrap_or(cfg.brightness.default_level),
            wave_height_m: record.wave_height_m,
            wind_speed_mps: record.wind_speed_mps,
            registered: true,
        }))
    }
}

#[async_trait]
impl LampRegistry for StaticRegistry {
    async fn resolve(&self, lamp_id: &str) -> Result<LampConfig, Error> {
        self.lamps
            .get(lamp_id)
            .cloned()
            .ok_or_else(|| Error::UnknownDevice(lamp_id.to_string()))
    }

    async fn lamps(&self) -> Result<Vec<LampConfig>, Error> {
        let mut lamps: Vec<LampConfig> = self.lamps.values().cloned().collect();
        lamps.sort_by(|a, b| a.lamp_id.cmp(&b.lamp_id));
        Ok(lamps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::{BandThresholds, LampRecord};
    use common::BrightnessLevel;

    fn config() -> LampServerConfig {
        let mut cfg = LampServerConfig::default();
        cfg.lamps = vec![
            LampRecord {
                lamp_id: "lamp-b".into(),
                location: "Haifa, Israel".into(),
                brightness_level: Some(BrightnessLevel::Low),
                wave_height_m: Some(BandThresholds { mid: 1.0, high: 2.0 }),
                wind_speed_mps: None,
            },
            LampRecord {
                lamp_id: "lamp-a".into(),
                location: "Hadera, Israel".into(),
                brightness_level: None,
                wave_height_m: None,
                wind_speed_mps: None,
            },
        ];
        cfg
    }

    #[tokio::test]
    async fn test_resolve_registered_lamp() {
        let registry = StaticRegistry::from_config(&config());

        let lamp = registry.resolve("lamp-a").await.expect("registered");
        assert!(lamp.registered);
        assert_eq!(lamp.location, "Hadera, Israel");
        assert_eq!(lamp.brightness_level, BrightnessLevel::Mid);

        let lamp = registry.resolve("lamp-b").await.expect("registered");
        assert_eq!(lamp.brightness_level, BrightnessLevel::Low);
        assert_eq!(lamp.wave_height_m, Some(BandThresholds { mid: 1.0, high: 2.0 }));
        assert_eq!(lamp.wind_speed_mps, None);
    }

    #[tokio::test]
    async fn test_unknown_lamp_is_unknown_device() {
        let registry = StaticRegistry::from_config(&config());
        let err = registry.resolve("ghost").await.expect_err("not registered");
        assert!(matches!(err, Error::UnknownDevice(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_lamps_sorted_by_id() {
        let registry = StaticRegistry::from_config(&config());
        let ids: Vec<String> = registry
            .lamps()
            .await
            .expect("list")
            .into_iter()
            .map(|l| l.lamp_id)
            .collect();
        assert_eq!(ids, vec!["lamp-a", "lamp-b"]);
    }
}
