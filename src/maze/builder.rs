//! World population
//!
//! Turns a parsed map into physics bodies tagged with their gameplay role.
//! Monster spawns are two-phase: `build` records them, `materialize_spawns`
//! creates them once a live player body exists.

use glam::Vec2;
use rapier2d::prelude::RigidBodyHandle;

use super::level::{Level, Monster, MonsterMode, PendingSpawn, Trap, Treasure, Wall};
use super::map::{CellKind, ParsedMap};
use crate::consts::*;
use crate::error::LifecycleError;
use crate::grid_to_world;
use crate::settings::Settings;
use crate::sim::physics::{BodyDesc, BodyKind, BodyTag, PhysicsWorld, Role};
use crate::sim::portal::PortalNetwork;

/// Linear damping for monsters so they stop when no longer steered
const MONSTER_DAMPING: f32 = 4.0;

/// Creates level bodies from parsed maps
#[derive(Debug, Clone)]
pub struct WorldBuilder {
    world_width: f32,
    world_height: f32,
    trap_damage: u32,
    treasure_value: u32,
    monster_health: u32,
}

impl Default for WorldBuilder {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl WorldBuilder {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            world_width: settings.world_width,
            world_height: settings.world_height,
            trap_damage: settings.trap_damage,
            treasure_value: settings.treasure_value,
            monster_health: settings.monster_health,
        }
    }

    /// World position of a grid cell
    pub fn cell_position(&self, row: u32, column: u32) -> Vec2 {
        grid_to_world(row, column, self.world_height)
    }

    /// Walls are circles, which lets movers cut diagonally past corners
    pub fn wall_radius(&self) -> f32 {
        self.world_width / WALL_RADIUS_DIVISOR
    }

    /// Populate the physics world with one level.
    ///
    /// Every link record is turned into a portal pair in `network`, but only
    /// endpoints owned by `number` receive a body and join the level.
    pub fn build(
        &self,
        physics: &mut PhysicsWorld,
        parsed: &ParsedMap,
        number: u32,
        network: &mut PortalNetwork,
    ) -> Level {
        let mut level = Level {
            number,
            ..Level::default()
        };

        for cell in &parsed.cells {
            let position = self.cell_position(cell.row, cell.column);
            match cell.kind {
                CellKind::Wall => self.add_wall(physics, &mut level, position),
                CellKind::Trap => self.add_trap(physics, &mut level, position),
                CellKind::Treasure => self.add_treasure(physics, &mut level, position),
                CellKind::MonsterSpawn => level.pending_spawns.push(PendingSpawn {
                    row: cell.row,
                    column: cell.column,
                }),
                CellKind::Empty => {}
            }
        }

        for record in &parsed.links {
            let (a, b) = network.link(record, self.world_height);
            for id in [a, b] {
                let Some(portal) = network.get(id) else {
                    continue;
                };
                if portal.level != number {
                    continue;
                }
                let desc = BodyDesc::circle(
                    BodyKind::Static,
                    BodyTag::new(Role::Portal, id.0),
                    portal.position,
                    PORTAL_RADIUS,
                )
                .density(0.0)
                .sensor();
                let body = physics.create_body(&desc);
                network.set_body(id, body);
                level.portals.push(id);
            }
        }

        log::debug!(
            "Built level {}: {} walls, {} traps, {} treasures, {} portals, {} pending spawns",
            number,
            level.walls.len(),
            level.traps.len(),
            level.treasures.len(),
            level.portals.len(),
            level.pending_spawns.len()
        );

        level
    }

    fn add_wall(&self, physics: &mut PhysicsWorld, level: &mut Level, position: Vec2) {
        let radius = self.wall_radius();
        let desc = BodyDesc::circle(
            BodyKind::Static,
            BodyTag::new(Role::Wall, level.walls.len()),
            position,
            radius,
        )
        .density(0.0)
        .friction(1.0)
        .restitution(0.0);
        let body = physics.create_body(&desc);
        level.walls.push(Wall {
            body,
            position,
            radius,
        });
    }

    fn add_trap(&self, physics: &mut PhysicsWorld, level: &mut Level, position: Vec2) {
        let desc = BodyDesc::circle(
            BodyKind::Static,
            BodyTag::new(Role::Trap, level.traps.len()),
            position,
            TRAP_RADIUS,
        )
        .density(0.0)
        .sensor();
        let body = physics.create_body(&desc);
        level.traps.push(Trap {
            body,
            position,
            damage: self.trap_damage,
        });
    }

    fn add_treasure(&self, physics: &mut PhysicsWorld, level: &mut Level, position: Vec2) {
        let desc = BodyDesc::circle(
            BodyKind::Static,
            BodyTag::new(Role::Treasure, level.treasures.len()),
            position,
            TREASURE_RADIUS,
        )
        .density(0.0)
        .sensor();
        let body = physics.create_body(&desc);
        level.treasures.push(Treasure {
            body,
            position,
            value: self.treasure_value,
            collected: false,
        });
    }

    /// Create monsters for every pending spawn, targeting `player`.
    ///
    /// Consumes the pending list; with nothing pending this is a no-op.
    pub fn materialize_spawns(
        &self,
        physics: &mut PhysicsWorld,
        level: &mut Level,
        player: RigidBodyHandle,
    ) -> Result<usize, LifecycleError> {
        if level.pending_spawns.is_empty() {
            return Ok(0);
        }
        if !physics.contains(player) {
            return Err(LifecycleError::PlayerBodyMissing);
        }

        let spawns = std::mem::take(&mut level.pending_spawns);
        for spawn in &spawns {
            let position = self.cell_position(spawn.row, spawn.column);
            let desc = BodyDesc::circle(
                BodyKind::Dynamic,
                BodyTag::new(Role::Monster, level.monsters.len()),
                position,
                MONSTER_RADIUS,
            )
            .density(1.0)
            .friction(0.3)
            .linear_damping(MONSTER_DAMPING);
            let body = physics.create_body(&desc);
            level.monsters.push(Monster {
                body,
                spawn: position,
                health: self.monster_health,
                mode: MonsterMode::Wander {
                    heading: 0.0,
                    timer: 0.0,
                },
                target: player,
            });
        }

        log::debug!("Materialized {} monsters in level {}", spawns.len(), level.number);
        Ok(spawns.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::map::parse_map;

    fn player_body(physics: &mut PhysicsWorld) -> RigidBodyHandle {
        physics.create_body(&BodyDesc::circle(
            BodyKind::Dynamic,
            BodyTag::new(Role::Player, 0),
            Vec2::new(2.0, 58.0),
            PLAYER_RADIUS,
        ))
    }

    #[test]
    fn test_one_body_per_occupied_cell() {
        let parsed = parse_map("#####\n#^ $#\n#M ?#\n#####");
        let mut physics = PhysicsWorld::new();
        let mut network = PortalNetwork::new();
        let builder = WorldBuilder::default();

        let mut level = builder.build(&mut physics, &parsed, 1, &mut network);
        assert_eq!(level.walls.len(), 14);
        assert_eq!(level.traps.len(), 1);
        assert_eq!(level.treasures.len(), 1);
        assert_eq!(level.pending_spawns.len(), 1);
        assert!(level.monsters.is_empty());
        // Monsters are deferred until a player exists
        assert_eq!(physics.body_count(), 16);
        assert_eq!(physics.count_role(Role::Wall), 14);
        assert_eq!(physics.count_role(Role::Trap), 1);
        assert_eq!(physics.count_role(Role::Treasure), 1);

        let player = player_body(&mut physics);
        let spawned = builder
            .materialize_spawns(&mut physics, &mut level, player)
            .unwrap();
        assert_eq!(spawned, 1);
        assert_eq!(physics.count_role(Role::Monster), 1);
        assert_eq!(
            physics.body_count() - 1,
            parsed.occupied().count(),
            "exactly one body per non-blank cell"
        );
    }

    #[test]
    fn test_tags_match_records() {
        let parsed = parse_map("#^$");
        let mut physics = PhysicsWorld::new();
        let mut network = PortalNetwork::new();
        let level = WorldBuilder::default().build(&mut physics, &parsed, 1, &mut network);

        assert_eq!(physics.tag(level.walls[0].body), Some(BodyTag::new(Role::Wall, 0)));
        assert_eq!(physics.tag(level.traps[0].body), Some(BodyTag::new(Role::Trap, 0)));
        assert_eq!(
            physics.tag(level.treasures[0].body),
            Some(BodyTag::new(Role::Treasure, 0))
        );
        assert_eq!(physics.position(level.traps[0].body), Some(Vec2::new(2.0, 59.0)));
    }

    #[test]
    fn test_wall_radius_is_world_fraction() {
        let parsed = parse_map("#");
        let mut physics = PhysicsWorld::new();
        let mut network = PortalNetwork::new();
        let level = WorldBuilder::default().build(&mut physics, &parsed, 1, &mut network);
        let radius = physics.radius(level.walls[0].body).unwrap();
        assert!((radius - WORLD_WIDTH / 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_only_owned_portals_join_level() {
        let parsed = parse_map("Portals Links:\nup|1,1,1|5,5,2\nloop|2,2,1|3,3,1\nFIN");
        let mut physics = PhysicsWorld::new();
        let mut network = PortalNetwork::new();
        let level = WorldBuilder::default().build(&mut physics, &parsed, 1, &mut network);

        assert_eq!(network.len(), 4);
        assert_eq!(level.portals.len(), 3);
        assert_eq!(physics.count_role(Role::Portal), 3);
        for id in &level.portals {
            let portal = network.get(*id).unwrap();
            assert_eq!(portal.level, 1);
            assert!(portal.body.is_some());
        }
        let remote = network.find(2, "up").unwrap();
        assert!(network.get(remote).unwrap().body.is_none());
        assert!(!level.portals.contains(&remote));
    }

    #[test]
    fn test_materialize_requires_player() {
        let parsed = parse_map("M");
        let mut physics = PhysicsWorld::new();
        let mut network = PortalNetwork::new();
        let builder = WorldBuilder::default();
        let mut level = builder.build(&mut physics, &parsed, 1, &mut network);

        let ghost = player_body(&mut physics);
        physics.destroy_body(ghost);
        assert_eq!(
            builder.materialize_spawns(&mut physics, &mut level, ghost),
            Err(LifecycleError::PlayerBodyMissing)
        );
        assert_eq!(level.pending_spawns.len(), 1);
    }

    #[test]
    fn test_materialize_is_idempotent() {
        let parsed = parse_map("M M");
        let mut physics = PhysicsWorld::new();
        let mut network = PortalNetwork::new();
        let builder = WorldBuilder::default();
        let mut level = builder.build(&mut physics, &parsed, 1, &mut network);
        let player = player_body(&mut physics);

        assert_eq!(builder.materialize_spawns(&mut physics, &mut level, player), Ok(2));
        assert_eq!(builder.materialize_spawns(&mut physics, &mut level, player), Ok(0));
        assert_eq!(level.monsters.len(), 2);
        assert!(level.pending_spawns.is_empty());
        assert!(level.monsters.iter().all(|m| m.target == player));
    }
}
