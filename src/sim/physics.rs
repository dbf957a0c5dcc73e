//! rapier2d physics substrate
//!
//! Every body carries a [`BodyTag`] packed into rapier's `user_data`, so
//! contact events can be classified without the physics layer knowing about
//! gameplay types. Contact begin/end events are collected during a step and
//! handed back to the caller once the step has finished.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use glam::Vec2;
use rapier2d::prelude::*;

/// Gameplay role of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Player,
    Wall,
    Trap,
    Treasure,
    Portal,
    Monster,
}

impl Role {
    fn code(self) -> u8 {
        match self {
            Role::Player => 1,
            Role::Wall => 2,
            Role::Trap => 3,
            Role::Treasure => 4,
            Role::Portal => 5,
            Role::Monster => 6,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Role::Player,
            2 => Role::Wall,
            3 => Role::Trap,
            4 => Role::Treasure,
            5 => Role::Portal,
            6 => Role::Monster,
            _ => return None,
        })
    }
}

/// Role plus the index of the owning record in its collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyTag {
    pub role: Role,
    pub index: u32,
}

impl BodyTag {
    pub fn new(role: Role, index: usize) -> Self {
        Self {
            role,
            index: index as u32,
        }
    }

    /// Pack into rapier user data: role code in the low byte, index above it
    pub fn to_user_data(self) -> u128 {
        (self.index as u128) << 8 | self.role.code() as u128
    }

    pub fn from_user_data(data: u128) -> Option<Self> {
        let role = Role::from_code((data & 0xff) as u8)?;
        Some(Self {
            role,
            index: (data >> 8) as u32,
        })
    }
}

/// How the solver treats a body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Immovable (walls, traps)
    Static,
    /// Fully simulated (player, monsters)
    Dynamic,
}

/// Everything needed to create one circular body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub position: Vec2,
    pub radius: f32,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    /// Sensors report contacts but produce no collision response
    pub sensor: bool,
    pub tag: BodyTag,
}

impl BodyDesc {
    pub fn circle(kind: BodyKind, tag: BodyTag, position: Vec2, radius: f32) -> Self {
        Self {
            kind,
            position,
            radius,
            density: 1.0,
            friction: 0.0,
            restitution: 0.0,
            linear_damping: 0.0,
            sensor: false,
            tag,
        }
    }

    pub fn density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping;
        self
    }

    pub fn sensor(mut self) -> Self {
        self.sensor = true;
        self
    }
}

/// One side of a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactBody {
    pub body: RigidBodyHandle,
    pub tag: BodyTag,
}

/// A contact that began or ended during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactEvent {
    Began(ContactBody, ContactBody),
    Ended(ContactBody, ContactBody),
}

impl ContactEvent {
    pub fn bodies(&self) -> (ContactBody, ContactBody) {
        match *self {
            ContactEvent::Began(a, b) | ContactEvent::Ended(a, b) => (a, b),
        }
    }
}

/// Owns the rapier simulation state
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    /// Collider -> owning body and its tag, for event lookup
    collider_owner: HashMap<ColliderHandle, ContactBody>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Create a world with no gravity (top-down)
    pub fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, 0.0],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            collider_owner: HashMap::new(),
        }
    }

    /// Create a rigid body with a single circular collider
    pub fn create_body(&mut self, desc: &BodyDesc) -> RigidBodyHandle {
        let builder = match desc.kind {
            BodyKind::Static => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic().lock_rotations(),
        };
        let body = builder
            .translation(vector![desc.position.x, desc.position.y])
            .linear_damping(desc.linear_damping)
            .user_data(desc.tag.to_user_data())
            .build();
        let handle = self.bodies.insert(body);

        let collider = ColliderBuilder::ball(desc.radius)
            .density(desc.density)
            .friction(desc.friction)
            .restitution(desc.restitution)
            .sensor(desc.sensor)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(desc.tag.to_user_data())
            .build();
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, handle, &mut self.bodies);
        self.collider_owner.insert(
            collider_handle,
            ContactBody {
                body: handle,
                tag: desc.tag,
            },
        );

        handle
    }

    /// Remove a body and its colliders. Unknown handles are ignored.
    pub fn destroy_body(&mut self, handle: RigidBodyHandle) {
        let Some(body) = self.bodies.get(handle) else {
            return;
        };
        for collider in body.colliders() {
            self.collider_owner.remove(collider);
        }
        let _ = self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Remove every body whose tag fails the predicate; returns how many went
    pub fn retain_bodies(&mut self, mut keep: impl FnMut(BodyTag) -> bool) -> usize {
        let doomed: Vec<RigidBodyHandle> = self
            .bodies
            .iter()
            .filter(|(_, body)| match BodyTag::from_user_data(body.user_data) {
                Some(tag) => !keep(tag),
                None => true,
            })
            .map(|(handle, _)| handle)
            .collect();
        for handle in &doomed {
            self.destroy_body(*handle);
        }
        doomed.len()
    }

    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    pub fn tag(&self, handle: RigidBodyHandle) -> Option<BodyTag> {
        self.bodies
            .get(handle)
            .and_then(|b| BodyTag::from_user_data(b.user_data))
    }

    pub fn position(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|b| {
            let t = b.translation();
            Vec2::new(t.x, t.y)
        })
    }

    pub fn velocity(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|b| {
            let v = b.linvel();
            Vec2::new(v.x, v.y)
        })
    }

    /// Collider radius of a body's first collider
    pub fn radius(&self, handle: RigidBodyHandle) -> Option<f32> {
        let body = self.bodies.get(handle)?;
        let collider = self.colliders.get(*body.colliders().first()?)?;
        collider.shape().as_ball().map(|ball| ball.radius)
    }

    /// Instantly move a body (no interpolation), resetting its rotation.
    /// Must not be called while a step is in progress.
    pub fn set_transform(&mut self, handle: RigidBodyHandle, position: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_position(Isometry::translation(position.x, position.y), true);
        }
    }

    pub fn set_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(vector![velocity.x, velocity.y], true);
        }
    }

    /// Number of bodies in the world
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Tags of every body in the world
    pub fn tags(&self) -> Vec<BodyTag> {
        self.bodies
            .iter()
            .filter_map(|(_, b)| BodyTag::from_user_data(b.user_data))
            .collect()
    }

    /// Number of bodies with the given role
    pub fn count_role(&self, role: Role) -> usize {
        self.tags().iter().filter(|t| t.role == role).count()
    }

    /// Advance the simulation by exactly `dt` and return the contacts that
    /// began or ended during the step, in a stable order.
    pub fn step(
        &mut self,
        dt: f32,
        velocity_iterations: usize,
        position_iterations: usize,
    ) -> Vec<ContactEvent> {
        self.integration_params.dt = dt;
        self.integration_params.num_solver_iterations =
            NonZeroUsize::new(velocity_iterations).unwrap_or(NonZeroUsize::MIN);
        self.integration_params.num_internal_stabilization_iterations = position_iterations;

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );

        let mut events = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            // Contacts lost because a body was destroyed carry no gameplay meaning
            if event.removed() {
                continue;
            }
            let (h1, h2) = (event.collider1(), event.collider2());
            let (Some(&a), Some(&b)) = (self.collider_owner.get(&h1), self.collider_owner.get(&h2))
            else {
                continue;
            };
            events.push(if event.started() {
                ContactEvent::Began(a, b)
            } else {
                ContactEvent::Ended(a, b)
            });
        }

        // Channel delivery order is not guaranteed
        events.sort_by_key(|e| {
            let (a, b) = e.bodies();
            let (ka, kb) = (a.body.into_raw_parts(), b.body.into_raw_parts());
            (matches!(e, ContactEvent::Began(..)), ka.min(kb), ka.max(kb))
        });

        events
    }
}
