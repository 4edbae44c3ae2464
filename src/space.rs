//! rapier2d-backed collision space.
//!
//! Shapes are split into an active partition (each shape owns a rigid body, kinematic unless
//! physics is enabled and the shape has finite mass) and a static partition (parentless fixed
//! colliders). The space keeps a `ColliderHandle -> ShapeId` reverse index so contact pairs
//! resolve back to shapes without scanning either partition.

mod hooks;
mod pending;
mod proxy;

pub use pending::{PendingChange, PendingChanges};
pub use proxy::ProxyChanges;

use crate::config::CollisionConfig;
use crate::error::{CollisionError, CollisionResult};
use crate::shape::{Pose, Shape, ShapeId};
use glam::Vec2;
use hooks::{ordered, ContactFilter, DetectionOnly};
use proxy::{apply_body_properties, isometry, touch, Proxy, ProxyParts};
use rapier2d::prelude::{
    CCDSolver, ColliderHandle, ColliderSet, DefaultBroadPhase, ImpulseJointSet, IntegrationParameters,
    IslandManager, MultibodyJointSet, NarrowPhase, PhysicsHooks, PhysicsPipeline, Point, QueryFilter, QueryPipeline,
    Ray, Real, RigidBodySet, Vector,
};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Active,
    Static,
}

impl Partition {
    pub fn from_static(is_static: bool) -> Self {
        if is_static {
            Partition::Static
        } else {
            Partition::Active
        }
    }
}

/// Invoked once per overlapping pair per step. Returning `false` disables the physics response
/// for the pair, starting with the step that reported it; notifications keep coming either way.
pub type CollisionCallback = Box<dyn FnMut(&Shape, &Shape, &mut PendingChanges) -> bool + Send + Sync>;

#[derive(Debug, Default)]
pub struct StepReport {
    /// Overlapping pairs, ordered by id within each pair and sorted.
    pub contacts: Vec<(ShapeId, ShapeId)>,
    pub applied: usize,
    pub rejected: Vec<CollisionError>,
    pub added: Vec<ShapeId>,
    pub removed: Vec<ShapeId>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpaceStats {
    pub steps: u64,
    pub last_contacts: usize,
    pub static_rehashes: u64,
}

struct ShapeEntry {
    shape: Shape,
    proxy: Proxy,
}

pub struct CollisionSpace {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    contact_filter: ContactFilter,
    active: HashMap<ShapeId, ShapeEntry>,
    statics: HashMap<ShapeId, ShapeEntry>,
    collider_shapes: HashMap<ColliderHandle, ShapeId>,
    callback: Option<CollisionCallback>,
    physics_enabled: bool,
    detection_dt: f32,
    last_contacts: Vec<(ShapeId, ShapeId)>,
    stats: SpaceStats,
}

impl CollisionSpace {
    pub fn new(config: &CollisionConfig) -> Self {
        let gravity = config.gravity();
        let mut detection_dt = config.detection_dt;
        if !detection_dt.is_finite() || detection_dt <= 0.0 {
            log::warn!("detection step {detection_dt} is not positive; using {}", f32::EPSILON);
            detection_dt = f32::EPSILON;
        }
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: Vector::new(gravity.x, gravity.y),
            integration_parameters: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            contact_filter: ContactFilter::default(),
            active: HashMap::new(),
            statics: HashMap::new(),
            collider_shapes: HashMap::new(),
            callback: None,
            physics_enabled: config.physics_enabled,
            detection_dt,
            last_contacts: Vec::new(),
            stats: SpaceStats::default(),
        }
    }

    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&Shape, &Shape, &mut PendingChanges) -> bool + Send + Sync + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    pub fn physics_enabled(&self) -> bool {
        self.physics_enabled
    }

    /// Switches every active body between kinematic and dynamic to match the new mode.
    pub fn set_physics_enabled(&mut self, enabled: bool) {
        if self.physics_enabled == enabled {
            return;
        }
        self.physics_enabled = enabled;
        for entry in self.active.values() {
            if let Some(body) = entry.proxy.body.and_then(|handle| self.bodies.get_mut(handle)) {
                apply_body_properties(body, &entry.proxy.body_properties(), enabled);
            }
        }
    }

    pub fn detection_dt(&self) -> f32 {
        self.detection_dt
    }

    pub fn add(&mut self, shape: Shape, partition: Partition) -> CollisionResult<ShapeId> {
        let id = shape.id();
        if self.contains(id) {
            return Err(CollisionError::DuplicateShape(id));
        }
        let proxy = ProxyParts::build(&shape, partition, self.physics_enabled)?
            .insert(&mut self.bodies, &mut self.colliders);
        self.collider_shapes.insert(proxy.collider, id);
        log::debug!("added {} shape {id} to the {partition:?} partition", shape.kind().label());
        self.partition_mut(partition).insert(id, ShapeEntry { shape, proxy });
        self.update(id)?;
        // settle the broad phase so queries see the new proxy; no callbacks fire here
        self.advance(self.detection_dt, false);
        Ok(id)
    }

    pub fn remove(&mut self, id: ShapeId) -> CollisionResult<Shape> {
        let (partition, entry) = if let Some(entry) = self.active.remove(&id) {
            (Partition::Active, entry)
        } else if let Some(entry) = self.statics.remove(&id) {
            (Partition::Static, entry)
        } else {
            return Err(CollisionError::UnknownShape(id));
        };
        self.collider_shapes.remove(&entry.proxy.collider);
        self.contact_filter.forget(id);
        match entry.proxy.body {
            Some(body) => {
                let _ = self.bodies.remove(
                    body,
                    &mut self.island_manager,
                    &mut self.colliders,
                    &mut self.impulse_joints,
                    &mut self.multibody_joints,
                    true,
                );
            }
            None => {
                let _ = self.colliders.remove(entry.proxy.collider, &mut self.island_manager, &mut self.bodies, false);
            }
        }
        self.last_contacts.retain(|(a, b)| *a != id && *b != id);
        log::debug!("removed shape {id} from the {partition:?} partition");
        let mut shape = entry.shape;
        shape.set_collided(false);
        Ok(shape)
    }

    /// Pushes the registered shape's current state into its proxy. Moving a static shape also
    /// re-indexes it, since the broad phase otherwise assumes static geometry never moves.
    pub fn update(&mut self, id: ShapeId) -> CollisionResult<ProxyChanges> {
        let (entry, partition) = if let Some(entry) = self.active.get_mut(&id) {
            (entry, Partition::Active)
        } else if let Some(entry) = self.statics.get_mut(&id) {
            (entry, Partition::Static)
        } else {
            return Err(CollisionError::UnknownShape(id));
        };
        let collider = self
            .colliders
            .get_mut(entry.proxy.collider)
            .ok_or_else(|| corruption(format!("shape {id} lost its collider")))?;
        let body = match entry.proxy.body {
            Some(handle) => {
                Some(self.bodies.get_mut(handle).ok_or_else(|| corruption(format!("shape {id} lost its body")))?)
            }
            None => None,
        };
        let changes = entry.proxy.sync(&entry.shape, collider, body, self.physics_enabled)?;
        if partition == Partition::Static
            && changes.intersects(ProxyChanges::POSITION | ProxyChanges::ROTATION | ProxyChanges::GEOMETRY)
        {
            self.rehash_static_shape(id)?;
        }
        Ok(changes)
    }

    /// Mutate a registered shape and push the result into its proxy in one call.
    pub fn modify<F>(&mut self, id: ShapeId, mutate: F) -> CollisionResult<ProxyChanges>
    where
        F: FnOnce(&mut Shape) -> CollisionResult<()>,
    {
        let shape = self.shape_mut(id).ok_or(CollisionError::UnknownShape(id))?;
        mutate(shape)?;
        self.update(id)
    }

    /// Overwrite a registered shape (matched by id) and update its proxy.
    pub fn replace(&mut self, shape: Shape) -> CollisionResult<ProxyChanges> {
        let id = shape.id();
        let slot = self.shape_mut(id).ok_or(CollisionError::UnknownShape(id))?;
        let collided = slot.collided();
        *slot = shape;
        slot.set_collided(collided);
        self.update(id)
    }

    /// Marks one static collider as moved so the broad phase re-buckets it on the next step.
    pub fn rehash_static_shape(&mut self, id: ShapeId) -> CollisionResult<()> {
        let entry = self.statics.get(&id).ok_or(CollisionError::UnknownShape(id))?;
        let collider = self
            .colliders
            .get_mut(entry.proxy.collider)
            .ok_or_else(|| corruption(format!("static shape {id} lost its collider")))?;
        collider.set_position(isometry(entry.proxy.pose()));
        self.stats.static_rehashes += 1;
        log::debug!("rehashed static shape {id}");
        Ok(())
    }

    pub fn rehash_static(&mut self) -> CollisionResult<()> {
        let ids: Vec<ShapeId> = self.statics.keys().copied().collect();
        for id in ids {
            self.rehash_static_shape(id)?;
        }
        Ok(())
    }

    /// Detects overlapping pairs, dispatches one callback per pair, then integrates.
    ///
    /// Contacts are gathered by a detection pass that applies no impulses, so a pair refused by
    /// the callback is never resolved in the step that reported it. With physics disabled `dt`
    /// is ignored and accumulated forces are cleared; only the detection pass runs. Changes
    /// queued by callbacks are applied before this returns; a corrupted shape/proxy mapping
    /// aborts the step with `SpaceCorruption`.
    pub fn step(&mut self, dt: f32) -> CollisionResult<StepReport> {
        for entry in self.active.values_mut().chain(self.statics.values_mut()) {
            entry.shape.set_collided(false);
        }
        let solve_dt = if !self.physics_enabled {
            self.reset_forces();
            None
        } else if dt.is_finite() && dt > 0.0 {
            Some(dt)
        } else {
            log::warn!("physics step received dt={dt}; skipping integration");
            None
        };
        self.advance(self.detection_dt, false);

        let contacts = self.collect_contacts()?;
        for &(a, b) in &contacts {
            for id in [a, b] {
                if let Some(shape) = self.shape_mut(id) {
                    shape.set_collided(true);
                }
            }
        }

        let mut pending = PendingChanges::default();
        let mut refiltered = Vec::new();
        if let Some(mut callback) = self.callback.take() {
            for &(a, b) in &contacts {
                let (Some(shape_a), Some(shape_b)) = (self.shape(a), self.shape(b)) else {
                    self.callback = Some(callback);
                    return Err(corruption(format!("contact pair ({a}, {b}) lost its shapes")));
                };
                let keep_going = callback(shape_a, shape_b, &mut pending);
                if self.contact_filter.set_suppressed(a, b, !keep_going) {
                    refiltered.extend([a, b]);
                }
            }
            self.callback = Some(callback);
        }
        for id in refiltered {
            let handle = self.entry(id).map(|entry| entry.proxy.collider);
            if let Some(collider) = handle.and_then(|handle| self.colliders.get_mut(handle)) {
                touch(collider);
            }
        }
        if let Some(dt) = solve_dt {
            self.refresh_contacting_colliders();
            self.advance(dt, true);
        }

        self.stats.steps += 1;
        self.stats.last_contacts = contacts.len();
        self.last_contacts = contacts.clone();
        let mut report = StepReport { contacts, ..StepReport::default() };
        self.apply_pending(&mut pending, &mut report)?;
        Ok(report)
    }

    fn apply_pending(&mut self, pending: &mut PendingChanges, report: &mut StepReport) -> CollisionResult<()> {
        for change in pending.drain() {
            let outcome = match change {
                PendingChange::Add { shape, partition } => self.add(shape, partition).map(|id| report.added.push(id)),
                PendingChange::Remove(id) => self.remove(id).map(|_| report.removed.push(id)),
                PendingChange::Replace(shape) => self.replace(shape).map(|_| ()),
            };
            match outcome {
                Ok(()) => report.applied += 1,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    log::warn!("deferred collision change rejected: {err}");
                    report.rejected.push(err);
                }
            }
        }
        Ok(())
    }

    /// Runs one pipeline step. Without `solve` contacts are still computed but no pair gets a
    /// solver response.
    fn advance(&mut self, dt: f32, solve: bool) {
        self.integration_parameters.dt = dt;
        let events = ();
        let detection = DetectionOnly(&self.contact_filter);
        let hooks: &dyn PhysicsHooks = if solve { &self.contact_filter } else { &detection };
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            hooks,
            &events,
        );
    }

    /// Flags every collider with contact points so the solving pass recomputes those pairs
    /// through the contact filter instead of reusing the detection pass's solver flags.
    fn refresh_contacting_colliders(&mut self) {
        let handles: Vec<ColliderHandle> = self
            .narrow_phase
            .contact_pairs()
            .filter(|pair| pair.manifolds.iter().any(|manifold| !manifold.points.is_empty()))
            .flat_map(|pair| [pair.collider1, pair.collider2])
            .collect();
        for handle in handles {
            if let Some(collider) = self.colliders.get_mut(handle) {
                touch(collider);
            }
        }
    }

    fn reset_forces(&mut self) {
        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(false);
            body.reset_torques(false);
        }
    }

    fn collect_contacts(&self) -> CollisionResult<Vec<(ShapeId, ShapeId)>> {
        let mut contacts = Vec::new();
        for pair in self.narrow_phase.contact_pairs() {
            let touching = pair.manifolds.iter().any(|manifold| manifold.points.iter().any(|point| point.dist <= 0.0));
            if !touching {
                continue;
            }
            let a = self.resolve(pair.collider1)?;
            let b = self.resolve(pair.collider2)?;
            contacts.push(ordered(a, b));
        }
        contacts.sort_unstable();
        contacts.dedup();
        Ok(contacts)
    }

    fn resolve(&self, collider: ColliderHandle) -> CollisionResult<ShapeId> {
        match self.collider_shapes.get(&collider) {
            Some(id) if self.contains(*id) => Ok(*id),
            Some(id) => Err(corruption(format!("collider {collider:?} maps to unregistered shape {id}"))),
            None => Err(corruption(format!("collider {collider:?} has no shape"))),
        }
    }

    /// First shape hit travelling from `origin` to `target`, with the distance along the way.
    /// Active proxies are seen at their pose as of the last step.
    pub fn query_segment(
        &mut self,
        origin: Vec2,
        target: Vec2,
        exclude: Option<ShapeId>,
    ) -> CollisionResult<Option<(ShapeId, f32)>> {
        let delta = target - origin;
        let length = delta.length();
        if length <= f32::EPSILON {
            return Ok(None);
        }
        let direction = delta / length;
        let ray = Ray::new(Point::new(origin.x, origin.y), Vector::new(direction.x, direction.y));
        self.query_pipeline.update(&self.colliders);
        let mut filter = QueryFilter::default();
        if let Some(collider) = exclude.and_then(|id| self.entry(id)).map(|entry| entry.proxy.collider) {
            filter = filter.exclude_collider(collider);
        }
        match self.query_pipeline.cast_ray(&self.bodies, &self.colliders, &ray, length, true, filter) {
            Some((collider, toi)) => Ok(Some((self.resolve(collider)?, toi))),
            None => Ok(None),
        }
    }

    /// Pose the engine currently holds for a shape; differs from the shape only when physics
    /// integration moved the body.
    pub fn body_pose(&self, id: ShapeId) -> Option<(Vec2, f32)> {
        let entry = self.entry(id)?;
        match entry.proxy.body {
            Some(handle) => {
                let body = self.bodies.get(handle)?;
                let translation = body.translation();
                Some((Vec2::new(translation.x, translation.y), body.rotation().angle()))
            }
            None => {
                let collider = self.colliders.get(entry.proxy.collider)?;
                let iso = collider.position();
                Some((Vec2::new(iso.translation.x, iso.translation.y), iso.rotation.angle()))
            }
        }
    }

    /// Pose last pushed into the proxy by `update`.
    pub fn synced_pose(&self, id: ShapeId) -> Option<Pose> {
        self.entry(id).map(|entry| entry.proxy.pose())
    }

    fn entry(&self, id: ShapeId) -> Option<&ShapeEntry> {
        self.active.get(&id).or_else(|| self.statics.get(&id))
    }

    fn partition_mut(&mut self, partition: Partition) -> &mut HashMap<ShapeId, ShapeEntry> {
        match partition {
            Partition::Active => &mut self.active,
            Partition::Static => &mut self.statics,
        }
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.active.contains_key(&id) || self.statics.contains_key(&id)
    }

    pub fn partition_of(&self, id: ShapeId) -> Option<Partition> {
        if self.active.contains_key(&id) {
            Some(Partition::Active)
        } else if self.statics.contains_key(&id) {
            Some(Partition::Static)
        } else {
            None
        }
    }

    pub fn is_static(&self, id: ShapeId) -> bool {
        self.statics.contains_key(&id)
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.entry(id).map(|entry| &entry.shape)
    }

    /// Mutations through this reference reach the engine only after `update(id)`.
    pub fn shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        match self.active.get_mut(&id) {
            Some(entry) => Some(&mut entry.shape),
            None => self.statics.get_mut(&id).map(|entry| &mut entry.shape),
        }
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.active.values().chain(self.statics.values()).map(|entry| &entry.shape)
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn static_len(&self) -> usize {
        self.statics.len()
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.statics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_contacts(&self) -> &[(ShapeId, ShapeId)] {
        &self.last_contacts
    }

    pub fn is_response_suppressed(&self, a: ShapeId, b: ShapeId) -> bool {
        self.contact_filter.is_suppressed(a, b)
    }

    pub fn stats(&self) -> SpaceStats {
        self.stats
    }

    pub fn engine_counts(&self) -> (usize, usize) {
        (self.bodies.len(), self.colliders.len())
    }
}

fn corruption(message: String) -> CollisionError {
    log::error!("collision space corrupted: {message}");
    CollisionError::SpaceCorruption(message)
}
