//! Player, game phase and gameplay events

use glam::Vec2;
use rapier2d::prelude::RigidBodyHandle;
use serde::{Deserialize, Serialize};

use crate::sim::portal::PortalId;

/// Current phase of play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    InProgress,
    /// Simulation frozen by the player
    Paused,
    /// Score target reached
    Won,
    /// Player health ran out
    Lost,
}

impl GamePhase {
    /// Whether the world should be stepped this frame
    pub fn is_running(&self) -> bool {
        matches!(self, GamePhase::InProgress)
    }
}

/// Something that happened during a frame, for audio/UI collaborators
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    LevelLoaded { level: u32 },
    Teleported { from: Vec2, to: Vec2, level: u32 },
    TrapTriggered { damage: u32 },
    TreasureCollected { value: u32, score: u32 },
    PlayerHit { damage: u32, health: u32 },
    MonsterHit { index: usize },
    MonsterSlain { index: usize },
    Won { score: u32 },
    Lost,
}

/// The player character
#[derive(Debug, Clone)]
pub struct Player {
    pub body: RigidBodyHandle,
    pub health: u32,
    pub max_health: u32,
    pub score: u32,
    /// Aim angle in radians
    pub facing: f32,
    /// Seconds until the next attack is allowed
    pub attack_cooldown: f32,
}

impl Player {
    pub fn new(body: RigidBodyHandle, max_health: u32) -> Self {
        Self {
            body,
            health: max_health,
            max_health,
            score: 0,
            facing: 0.0,
            attack_cooldown: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Apply damage, returning the remaining health
    pub fn take_damage(&mut self, damage: u32) -> u32 {
        self.health = self.health.saturating_sub(damage);
        self.health
    }

    /// Restore health and score for a fresh run
    pub fn revive(&mut self) {
        self.health = self.max_health;
        self.score = 0;
        self.facing = 0.0;
        self.attack_cooldown = 0.0;
    }

    /// Tick the attack cooldown down
    pub fn cool_down(&mut self, dt: f32) {
        self.attack_cooldown = (self.attack_cooldown - dt).max(0.0);
    }
}

/// Teleport request recorded during collision routing, consumed before the
/// next step. Holds a single slot: a newer request replaces an older one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTeleport {
    pub player: RigidBodyHandle,
    pub portal: PortalId,
}
