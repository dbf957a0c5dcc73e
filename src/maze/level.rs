//! Per-level entity records
//!
//! Each record mirrors exactly one physics body. Records are never removed
//! from their collection while the level is loaded, so a body tag's index
//! stays valid; consumed or killed entities are flagged instead.

use glam::Vec2;
use rapier2d::prelude::RigidBodyHandle;

use crate::sim::portal::PortalId;

#[derive(Debug, Clone)]
pub struct Wall {
    pub body: RigidBodyHandle,
    pub position: Vec2,
    pub radius: f32,
}

#[derive(Debug, Clone)]
pub struct Trap {
    pub body: RigidBodyHandle,
    pub position: Vec2,
    pub damage: u32,
}

#[derive(Debug, Clone)]
pub struct Treasure {
    pub body: RigidBodyHandle,
    pub position: Vec2,
    pub value: u32,
    /// Set on pickup; the body is removed before the next step
    pub collected: bool,
}

/// Behaviour state of a monster
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonsterMode {
    /// Drifting on a heading (radians) until the timer runs out
    Wander { heading: f32, timer: f32 },
    /// Steering toward the player
    Chase,
}

#[derive(Debug, Clone)]
pub struct Monster {
    pub body: RigidBodyHandle,
    /// Where the monster was spawned
    pub spawn: Vec2,
    pub health: u32,
    pub mode: MonsterMode,
    /// Body the monster hunts
    pub target: RigidBodyHandle,
}

impl Monster {
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Apply damage, returns true when this blow killed it
    pub fn hit(&mut self, damage: u32) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.health = self.health.saturating_sub(damage);
        !self.is_alive()
    }
}

/// A monster spawn recorded at parse time, materialized later
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSpawn {
    pub row: u32,
    pub column: u32,
}

/// State of the loaded maze
#[derive(Debug, Clone, Default)]
pub struct Level {
    /// Level number, 0 when nothing is loaded
    pub number: u32,
    pub walls: Vec<Wall>,
    pub traps: Vec<Trap>,
    pub treasures: Vec<Treasure>,
    pub monsters: Vec<Monster>,
    /// Portals owned by this level (visible and collidable)
    pub portals: Vec<PortalId>,
    pub pending_spawns: Vec<PendingSpawn>,
}

impl Level {
    /// The unloaded level
    pub fn unloaded() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.number != 0
    }

    pub fn live_monsters(&self) -> impl Iterator<Item = &Monster> {
        self.monsters.iter().filter(|m| m.is_alive())
    }

    pub fn remaining_treasures(&self) -> impl Iterator<Item = &Treasure> {
        self.treasures.iter().filter(|t| !t.collected)
    }
}
