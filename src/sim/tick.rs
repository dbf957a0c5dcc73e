//! Per-frame update
//!
//! One call to [`tick`] handles a rendered frame: commands first, then the
//! deferred work recorded by the previous frame's contacts, then as many
//! fixed physics steps as the clock releases.

use glam::Vec2;

use super::world::GameWorld;
use crate::error::LifecycleError;

/// Input commands for a single frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Desired movement direction (clamped to unit length)
    pub movement: Vec2,
    /// Aim angle in radians
    pub aim: Option<f32>,
    /// Melee attack
    pub attack: bool,
    /// Pause toggle
    pub pause: bool,
    /// Restart from the first level
    pub reset: bool,
}

/// Advance the world by one frame of `elapsed` seconds.
///
/// Returns the number of fixed steps taken. Nothing moves while the game is
/// paused, won or lost, and the clock keeps its accumulator untouched.
pub fn tick(
    world: &mut GameWorld,
    input: &TickInput,
    elapsed: f32,
) -> Result<u32, LifecycleError> {
    if input.reset {
        world.reset()?;
    }
    if input.pause {
        world.toggle_pause();
    }
    if !world.phase().is_running() {
        return Ok(0);
    }

    let dt = if elapsed.is_finite() {
        elapsed.clamp(0.0, world.settings().max_frame_time)
    } else {
        0.0
    };

    world.set_movement(input.movement);
    if let Some(angle) = input.aim {
        world.aim(angle);
    }
    if input.attack {
        world.attack();
    }

    // Deferred work must land before the world steps again
    world.consume_teleport()?;
    world.flush_removals();
    world.steer_monsters(dt);

    let steps = world.advance_clock(elapsed);
    world.cool_down(dt);
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::STEP_TIME;
    use crate::grid_to_world;
    use crate::maze::MemoryMaps;
    use crate::settings::Settings;
    use crate::sim::physics::Role;
    use crate::sim::portal::PortalId;
    use crate::sim::state::{GameEvent, GamePhase};

    const FRAME: f32 = 0.03;

    fn world(settings: Settings, level: &str) -> GameWorld {
        GameWorld::new(settings, MemoryMaps::new().with_level(1, level)).unwrap()
    }

    fn near(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < 1e-3
    }

    #[test]
    fn test_portal_round_trip() {
        let mut world = world(
            Settings::default(),
            "Portals Links:\nhall|5,5,1|15,5,1\nFIN",
        );
        let (a, b) = (PortalId(0), PortalId(1));
        let a_pos = grid_to_world(5, 5, 60.0);
        let b_pos = grid_to_world(5, 15, 60.0);
        let input = TickInput::default();

        // Entering A only records the request
        world.place_player(a_pos);
        assert_eq!(tick(&mut world, &input, FRAME), Ok(1));
        assert_eq!(world.pending_teleport().map(|p| p.portal), Some(a));
        assert!(near(world.player_position(), a_pos));

        // Teleport lands on B, which is disarmed; leaving A rearms it
        tick(&mut world, &input, FRAME).unwrap();
        assert!(near(world.player_position(), b_pos));
        assert!(world.portal_network().get(a).unwrap().active);
        assert!(!world.portal_network().get(b).unwrap().active);

        // Arriving on B cannot bounce the player straight back
        tick(&mut world, &input, FRAME).unwrap();
        assert!(near(world.player_position(), b_pos));

        // Walking off B rearms it
        world.place_player(Vec2::new(30.0, 30.0));
        tick(&mut world, &input, FRAME).unwrap();
        assert!(world.portal_network().get(b).unwrap().active);
    }

    #[test]
    fn test_walk_into_treasure() {
        let mut world = world(Settings::default(), "#####\n#  $#\n#####");
        let input = TickInput {
            movement: Vec2::X,
            ..Default::default()
        };
        for _ in 0..30 {
            tick(&mut world, &input, 1.0 / 60.0).unwrap();
        }
        assert_eq!(world.score(), 10);
        assert_eq!(world.physics().count_role(Role::Treasure), 0);
        assert!(
            world
                .drain_events()
                .contains(&GameEvent::TreasureCollected { value: 10, score: 10 })
        );
        // Walls still hold the player inside the corridor
        assert!(world.player_position().x < 5.0);
    }

    #[test]
    fn test_reaching_win_score_freezes_world() {
        let settings = Settings {
            win_score: 10,
            ..Default::default()
        };
        let mut world = world(settings, "\n\n\n   $");
        world.place_player(grid_to_world(3, 3, 60.0));
        tick(&mut world, &TickInput::default(), FRAME).unwrap();
        assert_eq!(world.phase(), GamePhase::Won);
        assert_eq!(tick(&mut world, &TickInput::default(), FRAME), Ok(0));
    }

    #[test]
    fn test_steps_after_win_are_not_counted() {
        let settings = Settings {
            win_score: 10,
            ..Default::default()
        };
        let mut world = world(settings, "\n\n\n   $");
        world.place_player(grid_to_world(3, 3, 60.0));
        // Enough time for four steps, but the first one ends the run
        assert_eq!(tick(&mut world, &TickInput::default(), 0.1), Ok(1));
        assert_eq!(world.phase(), GamePhase::Won);
        assert!(world.clock().accumulator() < STEP_TIME);
    }

    #[test]
    fn test_trap_kills_fragile_player() {
        let settings = Settings {
            player_max_health: 10,
            ..Default::default()
        };
        let mut world = world(settings, "\n\n\n   ^");
        world.place_player(grid_to_world(3, 3, 60.0));
        tick(&mut world, &TickInput::default(), FRAME).unwrap();

        assert_eq!(world.player().health, 0);
        assert_eq!(world.phase(), GamePhase::Lost);
        let events = world.drain_events();
        assert!(events.contains(&GameEvent::TrapTriggered { damage: 10 }));
        assert_eq!(events.last(), Some(&GameEvent::Lost));

        // Reset brings the run back
        let reset = TickInput {
            reset: true,
            ..Default::default()
        };
        assert_eq!(tick(&mut world, &reset, FRAME), Ok(1));
        assert_eq!(world.phase(), GamePhase::InProgress);
        assert_eq!(world.player().health, 10);
    }

    #[test]
    fn test_pause_freezes_clock() {
        let mut world = world(Settings::default(), "#");
        let pause = TickInput {
            pause: true,
            movement: Vec2::X,
            ..Default::default()
        };
        let before = world.player_position();

        assert_eq!(tick(&mut world, &pause, FRAME), Ok(0));
        assert_eq!(world.phase(), GamePhase::Paused);
        assert_eq!(tick(&mut world, &TickInput::default(), 0.2), Ok(0));
        assert_eq!(world.clock().accumulator(), 0.0);
        assert_eq!(world.player_position(), before);

        assert_eq!(tick(&mut world, &pause, STEP_TIME * 1.5), Ok(1));
        assert_eq!(world.phase(), GamePhase::InProgress);
    }

    #[test]
    fn test_monsters_chase_nearby_player() {
        let mut world = world(Settings::default(), "\n\n\n\n\n    M");
        let start = world.level().monsters[0].spawn;
        for _ in 0..10 {
            tick(&mut world, &TickInput::default(), FRAME).unwrap();
        }
        let monster = &world.level().monsters[0];
        let position = world.physics().position(monster.body).unwrap();
        let player = world.player_position();
        assert!(position.distance(player) < start.distance(player));
    }
}
