use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROGRESS_STEP: f64 = 0.02;
pub const COLLISION_DISTANCE: f64 = 40.0;
pub const COLLISION_COOLDOWN_FRAMES: u32 = 30;
pub const BUBBLE_DURATION_MS: u64 = 2000;
pub const HISTORY_CAPACITY: usize = 10;
pub const PROXIMITY_DISTANCE: f64 = 100.0;
pub const SPAWN_MIN: f64 = 50.0;
pub const SPAWN_EXTENT: f64 = 400.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for the frame engine. Every field falls back to its default when
/// omitted from a JSON override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Progress added to a motion task on every frame.
    pub progress_step: f64,
    /// Two animating sprites closer than this swap their queues.
    pub collision_distance: f64,
    /// Frames a sprite ignores collisions after a swap.
    pub collision_cooldown_frames: u32,
    /// How long a say/think bubble stays up.
    pub bubble_duration_ms: u64,
    /// Number of collision records kept for display.
    pub history_capacity: usize,
    /// Pairs closer than this get a proximity indicator.
    pub proximity_distance: f64,
    pub spawn_min: f64,
    pub spawn_extent: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            progress_step: PROGRESS_STEP,
            collision_distance: COLLISION_DISTANCE,
            collision_cooldown_frames: COLLISION_COOLDOWN_FRAMES,
            bubble_duration_ms: BUBBLE_DURATION_MS,
            history_capacity: HISTORY_CAPACITY,
            proximity_distance: PROXIMITY_DISTANCE,
            spawn_min: SPAWN_MIN,
            spawn_extent: SPAWN_EXTENT,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.progress_step > 0.0 && self.progress_step <= 1.0) {
            return Err(ConfigError::InvalidConfig(
                "progress_step must be within (0, 1]",
            ));
        }
        if !(self.collision_distance > 0.0) {
            return Err(ConfigError::InvalidConfig(
                "collision_distance must be positive",
            ));
        }
        if self.proximity_distance < self.collision_distance {
            return Err(ConfigError::InvalidConfig(
                "proximity_distance must not be below collision_distance",
            ));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "history_capacity must be non-zero",
            ));
        }
        if !(self.spawn_extent > 0.0) {
            return Err(ConfigError::InvalidConfig("spawn_extent must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_overrides_keep_unspecified_defaults() {
        let config =
            SimulationConfig::from_json_str(r#"{ "collision_distance": 25.0 }"#).unwrap();
        assert_eq!(config.collision_distance, 25.0);
        assert_eq!(config.collision_cooldown_frames, COLLISION_COOLDOWN_FRAMES);
        assert_eq!(config.history_capacity, HISTORY_CAPACITY);
    }

    #[test]
    fn rejects_zero_step() {
        let err = SimulationConfig::from_json_str(r#"{ "progress_step": 0.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = SimulationConfig::from_json_str("{ progress_step").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_empty_history() {
        let config = SimulationConfig {
            history_capacity: 0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
