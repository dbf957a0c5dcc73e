//! Collision routing
//!
//! Classifies contact events by the role tag of whatever touched the player
//! and turns them into gameplay reactions. Routing never mutates the physics
//! world; reactions that move or destroy bodies are deferred by the caller.

use rapier2d::prelude::RigidBodyHandle;

use super::physics::{ContactBody, ContactEvent, Role};
use super::portal::PortalId;

/// Gameplay consequence of a player contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Player entered a portal; teleport at the next safe point
    Teleport(PortalId),
    /// Player left a portal; it may be used again
    Rearm(PortalId),
    /// Player stepped on a trap
    Damage { trap: usize },
    /// Player touched a treasure
    Pickup { treasure: usize },
    /// A monster bumped into the player
    MonsterContact { monster: usize },
}

/// Routes contacts involving the player body
#[derive(Debug, Clone, Copy)]
pub struct CollisionRouter {
    player: RigidBodyHandle,
}

impl CollisionRouter {
    pub fn new(player: RigidBodyHandle) -> Self {
        Self { player }
    }

    pub fn player(&self) -> RigidBodyHandle {
        self.player
    }

    /// The non-player side of a contact, if the player is involved
    fn other_side(&self, a: ContactBody, b: ContactBody) -> Option<ContactBody> {
        if a.body == self.player {
            Some(b)
        } else if b.body == self.player {
            Some(a)
        } else {
            None
        }
    }

    pub fn route(&self, event: &ContactEvent) -> Option<Reaction> {
        let (a, b) = event.bodies();
        let object = self.other_side(a, b)?;
        let index = object.tag.index as usize;

        let reaction = match (event, object.tag.role) {
            (ContactEvent::Began(..), Role::Portal) => Reaction::Teleport(PortalId(index)),
            (ContactEvent::Ended(..), Role::Portal) => Reaction::Rearm(PortalId(index)),
            (ContactEvent::Began(..), Role::Trap) => Reaction::Damage { trap: index },
            (ContactEvent::Began(..), Role::Treasure) => Reaction::Pickup { treasure: index },
            (ContactEvent::Began(..), Role::Monster) => {
                Reaction::MonsterContact { monster: index }
            }
            (_, Role::Wall | Role::Player)
            | (ContactEvent::Ended(..), Role::Trap | Role::Treasure | Role::Monster) => {
                return None;
            }
        };

        log::debug!("Routed {:?} -> {:?}", object.tag, reaction);
        Some(reaction)
    }

    /// Route a step's worth of events, preserving their order
    pub fn route_all(&self, events: &[ContactEvent]) -> Vec<Reaction> {
        events.iter().filter_map(|e| self.route(e)).collect()
    }
}
