//! Portal network and teleport resolution
//!
//! Portals are stored in an arena and always created in linked pairs, so an
//! exit reference is a plain index that stays valid and reciprocal until the
//! network is cleared.

use glam::Vec2;
use rapier2d::prelude::RigidBodyHandle;

use crate::grid_to_world;
use crate::maze::map::{PortalEndpoint, PortalLinkRecord};

/// Index of a portal in the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortalId(pub usize);

/// A teleport endpoint
#[derive(Debug, Clone)]
pub struct Portal {
    pub id: PortalId,
    /// Level the portal lives in
    pub level: u32,
    /// Link label, shared with the exit
    pub label: String,
    pub position: Vec2,
    /// Only active portals can be traversed
    pub active: bool,
    exit: PortalId,
    /// Collider, present only while the portal's level is loaded
    pub body: Option<RigidBodyHandle>,
}

impl Portal {
    pub fn exit(&self) -> PortalId {
        self.exit
    }
}

/// What a teleport request resolved to
#[derive(Debug, Clone, PartialEq)]
pub enum TeleportOutcome {
    /// Requested portal is inactive or unknown
    Suppressed,
    /// Exit is in the same level; the player jumps to `destination`
    SameLevel {
        exit: PortalId,
        destination: Vec2,
    },
    /// Exit is in another level, which must be loaded first
    CrossLevel {
        level: u32,
        label: String,
        destination: Vec2,
    },
}

/// All portals known for the loaded level, including off-level exits
#[derive(Debug, Default)]
pub struct PortalNetwork {
    portals: Vec<Portal>,
}

impl PortalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build both endpoints of a link record as mutual exits
    pub fn link(&mut self, record: &PortalLinkRecord, world_height: f32) -> (PortalId, PortalId) {
        let first = PortalId(self.portals.len());
        let second = PortalId(first.0 + 1);
        let [a, b] = &record.endpoints;
        self.portals
            .push(Self::endpoint(first, second, a, &record.label, world_height));
        self.portals
            .push(Self::endpoint(second, first, b, &record.label, world_height));
        (first, second)
    }

    fn endpoint(
        id: PortalId,
        exit: PortalId,
        endpoint: &PortalEndpoint,
        label: &str,
        world_height: f32,
    ) -> Portal {
        Portal {
            id,
            level: endpoint.level,
            label: label.to_string(),
            position: grid_to_world(endpoint.y, endpoint.x, world_height),
            active: true,
            exit,
            body: None,
        }
    }

    pub fn get(&self, id: PortalId) -> Option<&Portal> {
        self.portals.get(id.0)
    }

    pub fn get_mut(&mut self, id: PortalId) -> Option<&mut Portal> {
        self.portals.get_mut(id.0)
    }

    pub fn exit_of(&self, id: PortalId) -> Option<&Portal> {
        self.get(id).and_then(|p| self.get(p.exit))
    }

    pub fn len(&self) -> usize {
        self.portals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.portals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Portal> {
        self.portals.iter()
    }

    /// Portals owned by a level
    pub fn in_level(&self, level: u32) -> impl Iterator<Item = &Portal> {
        self.portals.iter().filter(move |p| p.level == level)
    }

    /// Find a portal by owning level and link label
    pub fn find(&self, level: u32, label: &str) -> Option<PortalId> {
        self.portals
            .iter()
            .find(|p| p.level == level && p.label == label)
            .map(|p| p.id)
    }

    /// Find the landing portal of a cross-level teleport: the `label`
    /// endpoint owned by `level` whose exit is the entry portal at `entry` in
    /// `from_level`. Labels may repeat within a map, so the exit decides.
    pub fn find_arrival(
        &self,
        level: u32,
        label: &str,
        from_level: u32,
        entry: Vec2,
    ) -> Option<PortalId> {
        let linked_back: Vec<(&Portal, &Portal)> = self
            .portals
            .iter()
            .filter(|p| p.level == level && p.label == label)
            .filter_map(|p| self.get(p.exit).map(|exit| (p, exit)))
            .filter(|(_, exit)| exit.level == from_level)
            .collect();

        linked_back
            .iter()
            .find(|(_, exit)| exit.position == entry)
            .or_else(|| linked_back.first())
            .map(|(p, _)| p.id)
    }

    pub fn set_body(&mut self, id: PortalId, body: RigidBodyHandle) {
        if let Some(portal) = self.get_mut(id) {
            portal.body = Some(body);
        }
    }

    /// Re-arm a portal once the player has left it
    pub fn rearm(&mut self, id: PortalId) {
        if let Some(portal) = self.get_mut(id) {
            if !portal.active {
                log::debug!("Portal {:?} ({}) re-armed", id, portal.label);
            }
            portal.active = true;
        }
    }

    /// Mark a portal as the destination of a completed teleport
    pub fn disarm(&mut self, id: PortalId) {
        if let Some(portal) = self.get_mut(id) {
            portal.active = false;
        }
    }

    /// Resolve a teleport request through `id`.
    ///
    /// Same-level exits are disarmed here so the player does not bounce
    /// straight back; cross-level exits are only described, the caller loads
    /// the level and disarms the freshly built destination portal.
    pub fn resolve(&mut self, id: PortalId) -> TeleportOutcome {
        let Some(portal) = self.get(id) else {
            return TeleportOutcome::Suppressed;
        };
        if !portal.active {
            return TeleportOutcome::Suppressed;
        }
        let Some(exit) = self.get(portal.exit) else {
            return TeleportOutcome::Suppressed;
        };

        if exit.level == portal.level {
            let (exit_id, destination) = (exit.id, exit.position);
            self.disarm(exit_id);
            TeleportOutcome::SameLevel {
                exit: exit_id,
                destination,
            }
        } else {
            TeleportOutcome::CrossLevel {
                level: exit.level,
                label: exit.label.clone(),
                destination: exit.position,
            }
        }
    }

    pub fn clear(&mut self) {
        self.portals.clear();
    }
}
