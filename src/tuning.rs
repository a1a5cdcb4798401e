//! Simulation tuning settings loaded from config

use bevy::log::warn;
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::constants::*;

fn default_tick_seconds() -> f32 {
    TICK_SECONDS
}
fn default_max_ticks() -> u64 {
    MAX_TICKS
}
fn default_max_fall() -> i32 {
    MAX_FALL
}

/// Path to simulation tuning config
pub const SIM_TUNING_FILE: &str = "config/tuning.json";

/// Serializable tuning values stored in config
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimTuning {
    /// Seconds per tick when the driver is paced by wall clock
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f32,
    /// Tick limit before a run ends as timed out
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    /// Longest fall resolved in one tick
    #[serde(default = "default_max_fall")]
    pub max_fall: i32,
}

impl Default for SimTuning {
    fn default() -> Self {
        Self {
            tick_seconds: TICK_SECONDS,
            max_ticks: MAX_TICKS,
            max_fall: MAX_FALL,
        }
    }
}

pub fn load_sim_tuning_from_file(path: &str) -> Result<SimTuning, String> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))?;
    serde_json::from_str(&contents).map_err(|e| format!("Failed to parse {}: {}", path, e))
}

/// Load tuning from the default file, falling back to defaults with a warning
pub fn load_sim_tuning() -> SimTuning {
    match load_sim_tuning_from_file(SIM_TUNING_FILE) {
        Ok(tuning) => tuning,
        Err(err) => {
            warn!("{}", err);
            SimTuning::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let tuning: SimTuning = serde_json::from_str(r#"{ "max_ticks": 40 }"#).unwrap();
        assert_eq!(tuning.max_ticks, 40);
        assert_eq!(tuning.max_fall, MAX_FALL);
        assert!((tuning.tick_seconds - TICK_SECONDS).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_sim_tuning_from_file("config/does_not_exist.json").is_err());
    }
}
