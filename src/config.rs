use crate::types::Config;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::warn;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read config {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            warn!("Config {} not found, using defaults", path);
            Ok(Config::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        let z = &self.zone;
        for (name, v) in [
            ("x_min", z.x_min),
            ("y_min", z.y_min),
            ("x_max", z.x_max),
            ("y_max", z.y_max),
        ] {
            if !(0.0..=1.0).contains(&v) {
                bail!("zone.{} must be within [0, 1], got {}", name, v);
            }
        }
        if z.x_min >= z.x_max || z.y_min >= z.y_max {
            bail!("zone must satisfy x_min < x_max and y_min < y_max");
        }

        if self.accident.min_vehicles < 2 {
            bail!(
                "accident.min_vehicles must be at least 2, got {}",
                self.accident.min_vehicles
            );
        }
        if !(self.accident.min_iou > 0.0 && self.accident.min_iou <= 1.0) {
            bail!(
                "accident.min_iou must be within (0, 1], got {}",
                self.accident.min_iou
            );
        }

        let a = &self.analytics;
        if a.window_capacity == 0 {
            bail!("analytics.window_capacity must be positive");
        }
        if !(a.medium_from < a.high_from && a.high_from < a.congested_from) {
            bail!("analytics thresholds must be strictly ascending");
        }

        if self.store.violation_capacity == 0 {
            bail!("store.violation_capacity must be positive");
        }

        let h = &self.heartbeat;
        if h.sweep_interval_secs == 0 {
            bail!("heartbeat.sweep_interval_secs must be positive");
        }
        if h.offline_after_secs == 0 {
            bail!("heartbeat.offline_after_secs must be positive");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "accident:\n  min_vehicles: 4\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.accident.min_vehicles, 4);
        assert!((config.accident.min_iou - 0.2).abs() < 1e-6);
        assert_eq!(config.store.violation_capacity, 500);
        assert_eq!(config.analytics.window_capacity, 30);
        assert_eq!(config.challan.amounts.get("accident"), Some(&0));
    }

    #[test]
    fn test_rejects_inverted_zone() {
        let mut config = Config::default();
        config.zone.y_min = 0.5;
        config.zone.y_max = 0.25;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_single_vehicle_cluster() {
        let mut config = Config::default();
        config.accident.min_vehicles = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unordered_thresholds() {
        let mut config = Config::default();
        config.analytics.high_from = 3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_sweep_interval() {
        let mut config = Config::default();
        config.heartbeat.sweep_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.heartbeat.offline_after_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = Config::load_or_default("/nonexistent/traffic.yaml").unwrap();
        assert_eq!(config.zone.y_max, 0.25);
    }
}
