//! Game settings
//!
//! Loaded from an optional JSON file; every field falls back to the
//! constants in [`crate::consts`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SettingsError;

/// Simulation and gameplay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Maps ===
    /// Directory holding one map file per level
    pub maze_dir: PathBuf,
    /// File name prefix, the level number is appended (`Maze1`, `Maze2`, ...)
    pub map_prefix: String,
    /// Level loaded on start and after a reset
    pub first_level: u32,

    // === World ===
    pub world_width: f32,
    pub world_height: f32,

    // === Clock ===
    /// Fixed physics step in seconds
    pub step_time: f32,
    /// Clamp applied to each frame's elapsed time
    pub max_frame_time: f32,
    pub velocity_iterations: usize,
    pub position_iterations: usize,

    // === Player ===
    /// Grid cell (row, column) the player spawns on
    pub player_start: (u32, u32),
    pub player_radius: f32,
    pub player_speed: f32,
    pub player_max_health: u32,

    // === Gameplay ===
    pub win_score: u32,
    pub treasure_value: u32,
    pub trap_damage: u32,
    pub monster_health: u32,
    pub monster_speed: f32,
    pub monster_aggro_radius: f32,
    pub monster_contact_damage: u32,
    pub attack_range: f32,
    pub attack_damage: u32,
    pub attack_cooldown: f32,

    /// Seed for monster wandering
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            maze_dir: PathBuf::from("assets/maze"),
            map_prefix: "Maze".to_string(),
            first_level: 1,

            world_width: WORLD_WIDTH,
            world_height: WORLD_HEIGHT,

            step_time: STEP_TIME,
            max_frame_time: MAX_FRAME_TIME,
            velocity_iterations: VELOCITY_ITERATIONS,
            position_iterations: POSITION_ITERATIONS,

            player_start: (1, 1),
            player_radius: PLAYER_RADIUS,
            player_speed: PLAYER_SPEED,
            player_max_health: PLAYER_MAX_HEALTH,

            win_score: WIN_SCORE,
            treasure_value: TREASURE_VALUE,
            trap_damage: TRAP_DAMAGE,
            monster_health: MONSTER_HEALTH,
            monster_speed: MONSTER_SPEED,
            monster_aggro_radius: MONSTER_AGGRO_RADIUS,
            monster_contact_damage: MONSTER_CONTACT_DAMAGE,
            attack_range: ATTACK_RANGE,
            attack_damage: ATTACK_DAMAGE,
            attack_cooldown: ATTACK_COOLDOWN,

            seed: 0x5eed_0f_3a2e,
        }
    }
}

impl Settings {
    /// Parse settings from JSON text. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the fixed-step clock and solver cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |field: &'static str, reason: &'static str| -> Result<(), SettingsError> {
            Err(SettingsError::Invalid { field, reason })
        };
        if !(self.step_time.is_finite() && self.step_time > 0.0) {
            return invalid("step_time", "must be a positive number of seconds");
        }
        if !(self.max_frame_time.is_finite() && self.max_frame_time >= 0.0) {
            return invalid("max_frame_time", "must be zero or more seconds");
        }
        if self.velocity_iterations == 0 {
            return invalid("velocity_iterations", "must be at least 1");
        }
        if self.position_iterations == 0 {
            return invalid("position_iterations", "must be at least 1");
        }
        Ok(())
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file is absent or invalid
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Wall collider radius derived from the world width
    pub fn wall_radius(&self) -> f32 {
        self.world_width / WALL_RADIUS_DIVISOR
    }

    /// Path of the map file for a level
    pub fn map_path(&self, level: u32) -> PathBuf {
        self.maze_dir.join(format!("{}{}", self.map_prefix, level))
    }
}
