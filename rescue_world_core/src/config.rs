//! Mission configuration, loadable from (partial) JSON documents.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Direction, KeyColor, camera::CameraConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    pub enabled: bool,
    /// Fixed lava tiles per room; `0` switches to the probabilistic mode.
    pub per_room: usize,
    /// Chance that a room receives 1-3 lava tiles when `per_room` is 0.
    pub probability: f64,
    pub skip_locked_rooms: bool,
}

impl Default for HazardConfig {
    fn default() -> Self {
        HazardConfig {
            enabled: true,
            per_room: 0,
            probability: 0.5,
            skip_locked_rooms: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VictimConfig {
    pub fake_per_room: usize,
    pub real_per_room: usize,
    /// Real-victim variant reserved for locked rooms.
    pub important_variant: Direction,
}

impl Default for VictimConfig {
    fn default() -> Self {
        VictimConfig {
            fake_per_room: 3,
            real_per_room: 1,
            important_variant: Direction::Up,
        }
    }
}

/// Inputs to [`calculate_max_steps`](crate::instruction::calculate_max_steps)
/// besides the layout itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepBudgetConfig {
    pub exploration_factor: f64,
    pub steps_per_victim: usize,
    pub safety_buffer: f64,
}

impl Default for StepBudgetConfig {
    fn default() -> Self {
        StepBudgetConfig {
            exploration_factor: 0.5,
            steps_per_victim: 5,
            safety_buffer: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RescueConfig {
    pub room_size: usize,
    pub num_rows: usize,
    pub num_cols: usize,
    /// Fraction of rooms to lock (at least one is always locked).
    pub locked_room_prob: f64,
    /// When false, generation rejects layouts with unreachable objects.
    pub unblocking: bool,
    /// Re-run the reachability check after victims are placed.
    pub revalidate_victims: bool,
    pub hazards: HazardConfig,
    pub victims: VictimConfig,
    pub step_budget: StepBudgetConfig,
    /// Pins the episode step limit instead of deriving it from the layout.
    pub max_steps: Option<usize>,
    pub max_generation_attempts: usize,
    pub max_topology_attempts: usize,
    pub max_agent_placement_attempts: usize,
    pub seed: Option<u64>,
    pub camera: CameraConfig,
}

impl Default for RescueConfig {
    fn default() -> Self {
        RescueConfig {
            room_size: 8,
            num_rows: 3,
            num_cols: 3,
            locked_room_prob: 0.5,
            unblocking: false,
            revalidate_victims: true,
            hazards: HazardConfig::default(),
            victims: VictimConfig::default(),
            step_budget: StepBudgetConfig::default(),
            max_steps: None,
            max_generation_attempts: 100,
            max_topology_attempts: 1000,
            max_agent_placement_attempts: 1000,
            seed: None,
            camera: CameraConfig::default(),
        }
    }
}

impl RescueConfig {
    /// Parses a JSON config; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RescueConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Rooms in the lattice.
    pub fn num_rooms(&self) -> usize {
        self.num_rows * self.num_cols
    }

    /// Number of rooms the topology pass locks.
    pub fn num_locked_rooms(&self) -> usize {
        ((self.num_rooms() as f64 * self.locked_room_prob) as usize).max(1)
    }

    /// Grid size in tiles, `(width, height)`.
    pub fn grid_dims(&self) -> (usize, usize) {
        let step = self.room_size.saturating_sub(1);
        (step * self.num_cols + 1, step * self.num_rows + 1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        if self.room_size < 3 {
            return invalid(format!("room_size must be at least 3, got {}", self.room_size));
        }
        if self.num_rooms() < 2 {
            return invalid(format!(
                "need at least two rooms, got {}x{}",
                self.num_rows, self.num_cols
            ));
        }
        let locked = self.num_locked_rooms();
        if locked > KeyColor::ALL.len() {
            return invalid(format!(
                "{locked} locked rooms exceed the {} key colours",
                KeyColor::ALL.len()
            ));
        }
        if locked >= self.num_rooms() {
            return invalid(format!(
                "{locked} locked rooms leave no room for keys and the agent"
            ));
        }
        if self.max_generation_attempts == 0 {
            return invalid("max_generation_attempts must be positive".into());
        }
        for (name, p) in [
            ("locked_room_prob", self.locked_room_prob),
            ("hazards.probability", self.hazards.probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("{name} must lie in [0, 1], got {p}"));
            }
        }
        self.camera.validate(self.grid_dims())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = RescueConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid_dims(), (22, 22));
        assert_eq!(config.num_locked_rooms(), 4);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config = RescueConfig::from_json_str(
            r#"{ "num_rows": 2, "num_cols": 2, "victims": { "important_variant": "down" } }"#,
        )
        .unwrap();
        assert_eq!(config.num_rooms(), 4);
        assert_eq!(config.victims.important_variant, Direction::Down);
        assert_eq!(config.victims.fake_per_room, 3);
        assert_eq!(config.room_size, 8);
    }

    #[test]
    fn too_many_locked_rooms_are_rejected() {
        let config = RescueConfig {
            num_rows: 4,
            num_cols: 4,
            locked_room_prob: 0.9,
            ..RescueConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn single_room_cannot_host_a_locked_room() {
        let config = RescueConfig {
            num_rows: 1,
            num_cols: 1,
            ..RescueConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_reads_a_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "room_size": 6, "seed": 11 }}"#).unwrap();
        let config = RescueConfig::load(file.path()).unwrap();
        assert_eq!(config.room_size, 6);
        assert_eq!(config.seed, Some(11));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            RescueConfig::from_json_str("{ room_size: }"),
            Err(ConfigError::Parse(_))
        ));
    }
}
