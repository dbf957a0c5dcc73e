//! Level lifecycle
//!
//! [`GameWorld`] owns the physics world, the player and the loaded level. It
//! loads, unloads and resets levels, and it is the only place where deferred
//! work (teleports, body removal) is carried out, always between steps.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use rapier2d::prelude::RigidBodyHandle;

use super::clock::SimulationClock;
use super::physics::{BodyDesc, BodyKind, BodyTag, PhysicsWorld, Role};
use super::portal::{Portal, PortalId, PortalNetwork, TeleportOutcome};
use super::router::{CollisionRouter, Reaction};
use super::state::{GameEvent, GamePhase, PendingTeleport, Player};
use crate::consts::MONSTER_WANDER_INTERVAL;
use crate::error::{LifecycleError, MapError};
use crate::grid_to_world;
use crate::maze::{Level, MapLoader, MapSource, MonsterMode, WorldBuilder};
use crate::settings::Settings;

/// Monsters drift slower than they chase
const WANDER_SPEED_FACTOR: f32 = 0.5;

pub struct GameWorld {
    settings: Settings,
    physics: PhysicsWorld,
    loader: MapLoader,
    builder: WorldBuilder,
    router: CollisionRouter,
    portals: PortalNetwork,
    level: Level,
    player: Player,
    clock: SimulationClock,
    phase: GamePhase,
    /// Written by collision routing, consumed before the next step
    pending_teleport: Option<PendingTeleport>,
    /// Bodies to destroy before the next step
    pending_removals: Vec<RigidBodyHandle>,
    events: Vec<GameEvent>,
    rng: Pcg32,
}

impl GameWorld {
    /// Create the world, spawn the player and load the first level.
    ///
    /// An unreadable first map leaves the world unloaded (level 0).
    pub fn new(
        settings: Settings,
        source: impl MapSource + 'static,
    ) -> Result<Self, LifecycleError> {
        let mut physics = PhysicsWorld::new();
        let start = Self::start_position(&settings);
        let player_body = physics.create_body(
            &BodyDesc::circle(
                BodyKind::Dynamic,
                BodyTag::new(Role::Player, 0),
                start,
                settings.player_radius,
            )
            .density(1.0),
        );

        let mut world = Self {
            physics,
            loader: MapLoader::new(source),
            builder: WorldBuilder::from_settings(&settings),
            router: CollisionRouter::new(player_body),
            portals: PortalNetwork::new(),
            level: Level::unloaded(),
            player: Player::new(player_body, settings.player_max_health),
            clock: SimulationClock::new(settings.step_time, settings.max_frame_time),
            phase: GamePhase::InProgress,
            pending_teleport: None,
            pending_removals: Vec::new(),
            events: Vec::new(),
            rng: Pcg32::seed_from_u64(settings.seed),
            settings,
        };
        world.ensure_player()?;

        let first = world.settings.first_level;
        if let Err(e) = world.load_level(first) {
            log::error!("Could not load level {first}: {e}");
        }
        world.materialize_spawns()?;
        Ok(world)
    }

    fn start_position(settings: &Settings) -> Vec2 {
        let (row, column) = settings.player_start;
        grid_to_world(row, column, settings.world_height)
    }

    fn ensure_player(&self) -> Result<(), LifecycleError> {
        if self.physics.contains(self.player.body) {
            Ok(())
        } else {
            Err(LifecycleError::PlayerBodyMissing)
        }
    }

    // === Lifecycle ===

    /// Replace the current level with level `number`.
    ///
    /// The map is read before anything is torn down, so a failed read keeps
    /// the previous level intact. Monster spawns stay pending until
    /// [`GameWorld::materialize_spawns`].
    pub fn load_level(&mut self, number: u32) -> Result<(), MapError> {
        let parsed = self.loader.try_load(number)?;
        self.unload();
        self.level = self
            .builder
            .build(&mut self.physics, &parsed, number, &mut self.portals);
        self.events.push(GameEvent::LevelLoaded { level: number });
        log::info!(
            "Loaded level {}: {} walls, {} traps, {} treasures, {} portals",
            number,
            self.level.walls.len(),
            self.level.traps.len(),
            self.level.treasures.len(),
            self.level.portals.len()
        );
        Ok(())
    }

    /// Create the monsters recorded while loading the level
    pub fn materialize_spawns(&mut self) -> Result<usize, LifecycleError> {
        self.builder
            .materialize_spawns(&mut self.physics, &mut self.level, self.player.body)
    }

    /// Destroy every body except the player's and forget the level
    pub fn unload(&mut self) {
        let removed = self.physics.retain_bodies(|tag| tag.role == Role::Player);
        if self.level.is_loaded() {
            log::info!("Unloaded level {} ({} bodies)", self.level.number, removed);
        }
        self.portals.clear();
        self.level = Level::unloaded();
        self.pending_teleport = None;
        self.pending_removals.clear();
    }

    /// Start a fresh run on the first level
    pub fn reset(&mut self) -> Result<(), LifecycleError> {
        self.ensure_player()?;
        self.unload();
        self.player.revive();
        let start = Self::start_position(&self.settings);
        self.place_player(start);
        self.physics.set_velocity(self.player.body, Vec2::ZERO);
        self.clock.reset();
        self.phase = GamePhase::InProgress;

        let first = self.settings.first_level;
        if let Err(e) = self.load_level(first) {
            log::error!("Could not reload level {first}: {e}");
        }
        self.materialize_spawns()?;
        log::info!("Game reset");
        Ok(())
    }

    // === Commands ===

    /// Move the player instantly. Only valid between steps.
    pub fn place_player(&mut self, position: Vec2) {
        self.physics.set_transform(self.player.body, position);
    }

    /// Set the player's velocity from a movement direction
    pub fn set_movement(&mut self, direction: Vec2) {
        let velocity = direction.clamp_length_max(1.0) * self.settings.player_speed;
        self.physics.set_velocity(self.player.body, velocity);
    }

    pub fn aim(&mut self, angle: f32) {
        self.player.facing = angle;
    }

    pub fn toggle_pause(&mut self) {
        self.phase = match self.phase {
            GamePhase::InProgress => GamePhase::Paused,
            GamePhase::Paused => GamePhase::InProgress,
            other => other,
        };
        log::info!("Phase: {:?}", self.phase);
    }

    /// Strike every live monster in reach. Returns the number hit.
    pub fn attack(&mut self) -> usize {
        if self.player.attack_cooldown > 0.0 {
            return 0;
        }
        self.player.attack_cooldown = self.settings.attack_cooldown;
        let Some(origin) = self.physics.position(self.player.body) else {
            return 0;
        };

        let mut hits = 0;
        for (index, monster) in self.level.monsters.iter_mut().enumerate() {
            if !monster.is_alive() {
                continue;
            }
            let Some(position) = self.physics.position(monster.body) else {
                continue;
            };
            if position.distance(origin) > self.settings.attack_range {
                continue;
            }
            hits += 1;
            self.events.push(GameEvent::MonsterHit { index });
            if monster.hit(self.settings.attack_damage) {
                self.events.push(GameEvent::MonsterSlain { index });
                self.pending_removals.push(monster.body);
            }
        }
        hits
    }

    /// Record a teleport request. A newer request replaces an older one.
    pub fn request_teleport(&mut self, portal: PortalId) {
        self.pending_teleport = Some(PendingTeleport {
            player: self.player.body,
            portal,
        });
    }

    /// Teleport the player through `portal` now.
    ///
    /// Returns whether the player moved. Inactive portals and unloadable
    /// destination levels are silently suppressed.
    pub fn teleport(&mut self, portal: PortalId) -> Result<bool, LifecycleError> {
        self.ensure_player()?;
        let from = self.player_position();
        let source = self.portals.get(portal).map(|p| (p.level, p.position));

        let to = match self.portals.resolve(portal) {
            TeleportOutcome::Suppressed => return Ok(false),
            TeleportOutcome::SameLevel { destination, .. } => destination,
            TeleportOutcome::CrossLevel {
                level,
                label,
                destination,
            } => {
                if let Err(e) = self.load_level(level) {
                    log::warn!("Teleport to level {level} suppressed: {e}");
                    return Ok(false);
                }
                let found = match source {
                    Some((from_level, entry)) => {
                        self.portals.find_arrival(level, &label, from_level, entry)
                    }
                    None => self.portals.find(level, &label),
                };
                let arrival = match found {
                    Some(id) => {
                        self.portals.disarm(id);
                        self.portals.get(id).map_or(destination, |p| p.position)
                    }
                    None => destination,
                };
                self.materialize_spawns()?;
                arrival
            }
        };

        self.place_player(to);
        self.events.push(GameEvent::Teleported {
            from,
            to,
            level: self.level.number,
        });
        log::debug!("Teleported player {:?} -> {:?}", from, to);
        Ok(true)
    }

    // === Frame phases ===

    /// Take the pending teleport, if any, and carry it out
    pub(crate) fn consume_teleport(&mut self) -> Result<bool, LifecycleError> {
        match self.pending_teleport.take() {
            Some(request) if request.player == self.player.body => self.teleport(request.portal),
            _ => Ok(false),
        }
    }

    /// Destroy bodies scheduled for removal
    pub(crate) fn flush_removals(&mut self) {
        for body in self.pending_removals.drain(..) {
            self.physics.destroy_body(body);
        }
    }

    /// Steer live monsters toward the player or along a wander heading
    pub(crate) fn steer_monsters(&mut self, dt: f32) {
        let speed = self.settings.monster_speed;
        let aggro = self.settings.monster_aggro_radius;

        for monster in self.level.monsters.iter_mut().filter(|m| m.is_alive()) {
            let (Some(position), Some(target)) = (
                self.physics.position(monster.body),
                self.physics.position(monster.target),
            ) else {
                continue;
            };

            let to_target = target - position;
            let velocity = if to_target.length() <= aggro {
                monster.mode = MonsterMode::Chase;
                to_target.normalize_or_zero() * speed
            } else {
                let angle = match monster.mode {
                    MonsterMode::Wander { heading, timer } if timer > dt => {
                        monster.mode = MonsterMode::Wander {
                            heading,
                            timer: timer - dt,
                        };
                        heading
                    }
                    _ => {
                        let heading = self.rng.random_range(0.0..TAU);
                        monster.mode = MonsterMode::Wander {
                            heading,
                            timer: MONSTER_WANDER_INTERVAL,
                        };
                        heading
                    }
                };
                crate::heading(angle) * speed * WANDER_SPEED_FACTOR
            };
            self.physics.set_velocity(monster.body, velocity);
        }
    }

    /// Feed elapsed frame time to the clock, stepping the world per whole step
    ///
    /// Returns the steps that advanced the world; once the run is won or lost
    /// the rest of the frame's steps are drained without effect.
    pub(crate) fn advance_clock(&mut self, elapsed: f32) -> u32 {
        let mut clock = self.clock.clone();
        let mut advanced = 0;
        clock.advance(elapsed, |dt| {
            if self.step_physics(dt) {
                advanced += 1;
            }
        });
        self.clock = clock;
        advanced
    }

    /// Advance physics by one fixed step and route the resulting contacts.
    /// Returns false without stepping when the world is frozen.
    ///
    /// Nothing here moves or destroys bodies; that waits for the next frame.
    pub(crate) fn step_physics(&mut self, dt: f32) -> bool {
        if !self.phase.is_running() {
            return false;
        }
        let events = self.physics.step(
            dt,
            self.settings.velocity_iterations,
            self.settings.position_iterations,
        );
        for reaction in self.router.route_all(&events) {
            self.apply_reaction(reaction);
        }
        self.check_outcome();
        true
    }

    pub(crate) fn cool_down(&mut self, dt: f32) {
        self.player.cool_down(dt);
    }

    fn apply_reaction(&mut self, reaction: Reaction) {
        match reaction {
            Reaction::Teleport(portal) => self.request_teleport(portal),
            Reaction::Rearm(portal) => self.portals.rearm(portal),
            Reaction::Damage { trap } => {
                let Some(damage) = self.level.traps.get(trap).map(|t| t.damage) else {
                    return;
                };
                self.events.push(GameEvent::TrapTriggered { damage });
                self.hurt_player(damage);
            }
            Reaction::Pickup { treasure } => {
                let Some(treasure) = self.level.treasures.get_mut(treasure) else {
                    return;
                };
                if treasure.collected {
                    return;
                }
                treasure.collected = true;
                self.pending_removals.push(treasure.body);
                self.player.score += treasure.value;
                self.events.push(GameEvent::TreasureCollected {
                    value: treasure.value,
                    score: self.player.score,
                });
            }
            Reaction::MonsterContact { monster } => {
                let alive = self
                    .level
                    .monsters
                    .get(monster)
                    .is_some_and(|m| m.is_alive());
                if alive {
                    self.hurt_player(self.settings.monster_contact_damage);
                }
            }
        }
    }

    fn hurt_player(&mut self, damage: u32) {
        let health = self.player.take_damage(damage);
        self.events.push(GameEvent::PlayerHit { damage, health });
    }

    fn check_outcome(&mut self) {
        if self.phase != GamePhase::InProgress {
            return;
        }
        if !self.player.is_alive() {
            self.phase = GamePhase::Lost;
            self.events.push(GameEvent::Lost);
            log::info!("Player died on level {}", self.level.number);
        } else if self.player.score >= self.settings.win_score {
            self.phase = GamePhase::Won;
            self.events.push(GameEvent::Won {
                score: self.player.score,
            });
            log::info!("Won with score {}", self.player.score);
        }
    }

    // === Queries ===

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current level number, 0 when unloaded
    pub fn level_number(&self) -> u32 {
        self.level.number
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn portal_network(&self) -> &PortalNetwork {
        &self.portals
    }

    /// Portals that are visible and collidable in the current level
    pub fn level_portals(&self) -> impl Iterator<Item = &Portal> {
        self.level.portals.iter().filter_map(|id| self.portals.get(*id))
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_position(&self) -> Vec2 {
        self.physics
            .position(self.player.body)
            .unwrap_or(Vec2::ZERO)
    }

    pub fn score(&self) -> u32 {
        self.player.score
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn pending_teleport(&self) -> Option<PendingTeleport> {
        self.pending_teleport
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
