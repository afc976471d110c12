use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::control_system::traffic_light_controller::SignalTiming;
use crate::error::{ConfigError, Result};
use crate::flow_analyzer::reward::RewardConfig;
use crate::global_variables::*;

/// Every recognised coordinator option. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// RSU detection radius around each junction, meters.
    pub rsu_radius_m: f64,
    /// Junctions ahead of an emergency vehicle to plan for.
    pub lookahead_junctions: usize,
    /// Ticks without re-detection before a plan is retired.
    pub redetection_timeout_ticks: u64,
    /// Radius for the Density/ExternalPolicy proximity predicate, meters.
    pub proximity_radius_m: f64,
    /// Consecutive ticks the proximity predicate must hold before a mode switch.
    pub debounce_ticks: u32,
    pub clearance_ticks: u32,
    /// Clearance used when a greenwave override forces a change. At least 1.
    pub override_clearance_ticks: u32,
    pub density_low: f64,
    pub density_high: f64,
    pub halting_speed_mps: f64,
    pub default_min_hold_ticks: u32,
    pub default_max_hold_ticks: u32,
    pub reward: RewardConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            rsu_radius_m: DEFAULT_RSU_RADIUS_M,
            lookahead_junctions: DEFAULT_LOOKAHEAD_JUNCTIONS,
            redetection_timeout_ticks: DEFAULT_REDETECTION_TIMEOUT_TICKS,
            proximity_radius_m: DEFAULT_PROXIMITY_RADIUS_M,
            debounce_ticks: DEFAULT_DEBOUNCE_TICKS,
            clearance_ticks: DEFAULT_CLEARANCE_TICKS,
            override_clearance_ticks: DEFAULT_OVERRIDE_CLEARANCE_TICKS,
            density_low: DEFAULT_DENSITY_LOW,
            density_high: DEFAULT_DENSITY_HIGH,
            halting_speed_mps: DEFAULT_HALTING_SPEED_MPS,
            default_min_hold_ticks: DEFAULT_MIN_HOLD_TICKS,
            default_max_hold_ticks: DEFAULT_MAX_HOLD_TICKS,
            reward: RewardConfig::default(),
        }
    }
}

fn invalid(option: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidOption {
        option,
        reason: reason.into(),
    }
}

impl CoordinatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.rsu_radius_m > 0.0) {
            return Err(invalid("rsu_radius_m", "must be positive"));
        }
        if !(self.proximity_radius_m > 0.0) {
            return Err(invalid("proximity_radius_m", "must be positive"));
        }
        if self.lookahead_junctions == 0 {
            return Err(invalid("lookahead_junctions", "must be at least 1"));
        }
        if self.debounce_ticks == 0 {
            return Err(invalid("debounce_ticks", "must be at least 1"));
        }
        if self.clearance_ticks == 0 {
            return Err(invalid("clearance_ticks", "must be at least 1"));
        }
        if self.override_clearance_ticks == 0 {
            return Err(invalid("override_clearance_ticks", "must be at least 1"));
        }
        if self.override_clearance_ticks > self.clearance_ticks {
            return Err(invalid(
                "override_clearance_ticks",
                format!(
                    "{} exceeds normal clearance of {}",
                    self.override_clearance_ticks, self.clearance_ticks
                ),
            ));
        }
        if !(self.density_low < self.density_high) {
            return Err(invalid(
                "density_low",
                format!(
                    "low threshold {} must be below high threshold {}",
                    self.density_low, self.density_high
                ),
            ));
        }
        if self.default_min_hold_ticks > self.default_max_hold_ticks {
            return Err(invalid(
                "default_min_hold_ticks",
                format!(
                    "{} exceeds default max hold {}",
                    self.default_min_hold_ticks, self.default_max_hold_ticks
                ),
            ));
        }
        let r = &self.reward;
        if r.emergency_slow_speed_mps > r.emergency_fast_speed_mps {
            return Err(invalid(
                "reward.emergency_slow_speed_mps",
                "slow threshold above fast threshold",
            ));
        }
        Ok(())
    }

    pub fn signal_timing(&self) -> SignalTiming {
        SignalTiming {
            clearance_ticks: self.clearance_ticks,
            override_clearance_ticks: self.override_clearance_ticks,
            density_low: self.density_low,
            density_high: self.density_high,
            default_min_hold: self.default_min_hold_ticks,
            default_max_hold: self.default_max_hold_ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CoordinatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lookahead_junctions, 5);
        assert_eq!(config.redetection_timeout_ticks, 10);
        assert_eq!(config.debounce_ticks, 2);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = CoordinatorConfig::from_json_str(r#"{"rsu_radius_m": 80.0, "reward": {"emergency_bonus": 10.0}}"#)
            .unwrap();
        assert_eq!(config.rsu_radius_m, 80.0);
        assert_eq!(config.reward.emergency_bonus, 10.0);
        assert_eq!(config.reward.emergency_penalty, DEFAULT_EMERGENCY_PENALTY);
        assert_eq!(config.clearance_ticks, DEFAULT_CLEARANCE_TICKS);
    }

    #[test]
    fn override_clearance_floor_is_enforced() {
        let err = CoordinatorConfig::from_json_str(r#"{"override_clearance_ticks": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { option: "override_clearance_ticks", .. }));
        let err = CoordinatorConfig::from_json_str(r#"{"override_clearance_ticks": 5, "clearance_ticks": 3}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { .. }));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let config = CoordinatorConfig {
            density_low: 9.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = CoordinatorConfig {
            default_min_hold_ticks: 50,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = CoordinatorConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
