//! Deterministic simulation module
//!
//! Everything that runs once the maps are parsed lives here:
//! - Fixed timestep only, driven by [`SimulationClock`]
//! - Seeded RNG only
//! - Bodies are never moved or destroyed while a physics step is in flight
//! - No rendering or platform dependencies

pub mod clock;
pub mod physics;
pub mod portal;
pub mod router;
pub mod state;
pub mod tick;
pub mod world;

pub use clock::SimulationClock;
pub use physics::{BodyDesc, BodyKind, BodyTag, ContactBody, ContactEvent, PhysicsWorld, Role};
pub use portal::{Portal, PortalId, PortalNetwork, TeleportOutcome};
pub use router::{CollisionRouter, Reaction};
pub use state::{GameEvent, GamePhase, PendingTeleport, Player};
pub use tick::{TickInput, tick};
pub use world::GameWorld;
