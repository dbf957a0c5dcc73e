//! Portal Maze - simulation core of a top-down maze action game
//!
//! Core modules:
//! - `maze`: Map parsing, world population and per-level entity records
//! - `sim`: Physics adapter, portals, collision routing, fixed-step clock and game loop
//! - `settings`: Data-driven configuration
//! - `error`: Error taxonomy shared by the loaders and the lifecycle

pub mod error;
pub mod maze;
pub mod settings;
pub mod sim;

pub use error::{LifecycleError, LinkLineError, MapError, SettingsError};
pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (45 Hz)
    pub const STEP_TIME: f32 = 1.0 / 45.0;
    /// Largest slice of real time accepted per frame (stall guard)
    pub const MAX_FRAME_TIME: f32 = 0.25;
    /// Velocity solver iterations per step
    pub const VELOCITY_ITERATIONS: usize = 6;
    /// Position (stabilization) iterations per step
    pub const POSITION_ITERATIONS: usize = 2;

    /// Virtual world dimensions in physics units
    pub const WORLD_WIDTH: f32 = 60.0;
    pub const WORLD_HEIGHT: f32 = 60.0;

    /// Wall collider radius is a fraction of the world width
    pub const WALL_RADIUS_DIVISOR: f32 = 90.0;

    /// Score needed to win a run
    pub const WIN_SCORE: u32 = 50;
    /// Score granted by a single treasure
    pub const TREASURE_VALUE: u32 = 10;

    /// Player defaults
    pub const PLAYER_RADIUS: f32 = 0.3;
    pub const PLAYER_SPEED: f32 = 8.0;
    pub const PLAYER_MAX_HEALTH: u32 = 100;

    /// Hazards
    pub const TRAP_RADIUS: f32 = 0.5;
    pub const TRAP_DAMAGE: u32 = 10;
    pub const TREASURE_RADIUS: f32 = 0.4;
    pub const PORTAL_RADIUS: f32 = 0.5;

    /// Monster defaults
    pub const MONSTER_RADIUS: f32 = 0.3;
    pub const MONSTER_HEALTH: u32 = 3;
    pub const MONSTER_SPEED: f32 = 3.0;
    pub const MONSTER_AGGRO_RADIUS: f32 = 8.0;
    pub const MONSTER_CONTACT_DAMAGE: u32 = 5;
    /// Seconds between wander heading changes
    pub const MONSTER_WANDER_INTERVAL: f32 = 1.5;

    /// Melee attack
    pub const ATTACK_RANGE: f32 = 1.6;
    pub const ATTACK_DAMAGE: u32 = 1;
    pub const ATTACK_COOLDOWN: f32 = 0.4;
}

/// Convert a map grid cell to a world position.
///
/// The map grid is top-down while the physics world is bottom-up, so rows
/// are inverted against the world height.
#[inline]
pub fn grid_to_world(row: u32, column: u32, world_height: f32) -> Vec2 {
    Vec2::new(column as f32 + 1.0, world_height - (row as f32 + 1.0))
}

/// Unit vector for an angle in radians
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_to_world_inverts_rows() {
        let top_left = grid_to_world(0, 0, consts::WORLD_HEIGHT);
        assert_eq!(top_left, Vec2::new(1.0, 59.0));

        let below = grid_to_world(2, 3, consts::WORLD_HEIGHT);
        assert_eq!(below, Vec2::new(4.0, 57.0));
    }

    #[test]
    fn test_heading_is_unit_length() {
        for i in 0..16 {
            let angle = i as f32 * std::f32::consts::TAU / 16.0;
            assert!((heading(angle).length() - 1.0).abs() < 1e-5);
        }
    }
}
