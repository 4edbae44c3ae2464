//! Scene-level binding between game entities and collision shapes.

use crate::config::CollisionConfig;
use crate::error::{CollisionError, CollisionResult};
use crate::events::GameEvent;
use crate::shape::{Pose, Shape, ShapeId};
use crate::space::{CollisionSpace, Partition, PendingChanges, ProxyChanges, StepReport};
use bevy_ecs::prelude::{Entity, Resource};
use glam::Vec2;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// One transform field that changed on an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformChange {
    Position(Vec2),
    Rotation(f32),
    Scale(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    pub shape: ShapeId,
    /// `None` when the shape was added from a collision callback and has no owner.
    pub entity: Option<Entity>,
    pub distance: f32,
}

/// Owns the collision space plus the entity <-> shape mapping for one scene.
///
/// Unless the game installs its own callback, every overlapping pair flashes both entities.
/// Flashes and collision started/ended events are collected during `step` and drained by the
/// scene afterwards.
#[derive(Resource)]
pub struct CollisionLayer {
    space: CollisionSpace,
    shapes: HashMap<Entity, ShapeId>,
    owners: HashMap<ShapeId, Entity>,
    flash_queue: Arc<Mutex<Vec<ShapeId>>>,
    flashed: Vec<Entity>,
    touching: HashSet<(Entity, Entity)>,
    events: Vec<GameEvent>,
}

impl CollisionLayer {
    pub fn new(config: &CollisionConfig) -> Self {
        let mut layer = Self {
            space: CollisionSpace::new(config),
            shapes: HashMap::new(),
            owners: HashMap::new(),
            flash_queue: Arc::new(Mutex::new(Vec::new())),
            flashed: Vec::new(),
            touching: HashSet::new(),
            events: Vec::new(),
        };
        layer.use_flash_callback();
        layer
    }

    /// Restores the default callback: flash both shapes, keep the physics response.
    pub fn use_flash_callback(&mut self) {
        let queue = Arc::clone(&self.flash_queue);
        self.space.set_callback(move |a, b, _pending| {
            if let Ok(mut queue) = queue.lock() {
                queue.extend([a.id(), b.id()]);
            }
            true
        });
    }

    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&Shape, &Shape, &mut PendingChanges) -> bool + Send + Sync + 'static,
    {
        self.space.set_callback(callback);
    }

    pub fn add(&mut self, entity: Entity, shape: Shape, partition: Partition) -> CollisionResult<ShapeId> {
        if self.shapes.contains_key(&entity) {
            return Err(CollisionError::DuplicateEntity(entity));
        }
        let id = self.space.add(shape, partition)?;
        self.shapes.insert(entity, id);
        self.owners.insert(id, entity);
        self.events.push(GameEvent::ShapeAdded { entity, shape: id });
        Ok(id)
    }

    pub fn remove(&mut self, entity: Entity) -> CollisionResult<Shape> {
        let id = *self.shapes.get(&entity).ok_or(CollisionError::UnknownEntity(entity))?;
        let shape = self.space.remove(id)?;
        self.forget(entity, id);
        Ok(shape)
    }

    /// Copies one changed transform field onto the entity's shape and updates its proxy.
    pub fn on_entity_changed(&mut self, entity: Entity, change: TransformChange) -> CollisionResult<ProxyChanges> {
        let id = self.shape_id(entity)?;
        self.space.modify(id, |shape| {
            match change {
                TransformChange::Position(position) => shape.set_position(position),
                TransformChange::Rotation(rotation) => shape.set_rotation(rotation),
                TransformChange::Scale(scale) => shape.set_scale(scale)?,
            }
            Ok(())
        })
    }

    /// Diffs a whole pose against the entity's shape, applying only the fields that moved.
    pub fn sync_pose(&mut self, entity: Entity, pose: Pose) -> CollisionResult<ProxyChanges> {
        let id = self.shape_id(entity)?;
        self.space.modify(id, |shape| {
            if shape.scale() != pose.scale {
                shape.set_scale(pose.scale)?;
            }
            if shape.rotation() != pose.rotation {
                shape.set_rotation(pose.rotation);
            }
            if shape.position() != pose.position {
                shape.set_position(pose.position);
            }
            Ok(())
        })
    }

    pub fn step(&mut self, dt: f32) -> CollisionResult<StepReport> {
        let report = self.space.step(dt)?;
        for id in &report.removed {
            if let Some(entity) = self.owners.get(id).copied() {
                self.forget(entity, *id);
            }
        }

        let current: HashSet<(Entity, Entity)> = report
            .contacts
            .iter()
            .filter_map(|(a, b)| Some(entity_pair(*self.owners.get(a)?, *self.owners.get(b)?)))
            .collect();
        let mut started: Vec<_> = current.difference(&self.touching).copied().collect();
        let mut ended: Vec<_> = self.touching.difference(&current).copied().collect();
        started.sort_unstable();
        ended.sort_unstable();
        self.events.extend(started.into_iter().map(|(a, b)| GameEvent::collision_started(a, b)));
        self.events.extend(ended.into_iter().map(|(a, b)| GameEvent::collision_ended(a, b)));
        self.touching = current;

        let flashed_ids = match self.flash_queue.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => Vec::new(),
        };
        let mut flashed: Vec<Entity> = flashed_ids.iter().filter_map(|id| self.owners.get(id).copied()).collect();
        flashed.sort_unstable();
        flashed.dedup();
        self.events.extend(flashed.iter().map(|&entity| GameEvent::ShapeFlashed { entity }));
        self.flashed.extend(flashed);
        Ok(report)
    }

    /// Line-of-sight query from `origin` to `target`, ignoring the `exclude` entity's shape.
    pub fn query_segment(
        &mut self,
        origin: Vec2,
        target: Vec2,
        exclude: Option<Entity>,
    ) -> CollisionResult<Option<SegmentHit>> {
        let exclude = exclude.and_then(|entity| self.shapes.get(&entity).copied());
        let hit = self.space.query_segment(origin, target, exclude)?;
        Ok(hit.map(|(shape, distance)| SegmentHit { shape, entity: self.owners.get(&shape).copied(), distance }))
    }

    pub fn drain_flashes(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.flashed)
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_touching(&self, a: Entity, b: Entity) -> bool {
        self.touching.contains(&entity_pair(a, b))
    }

    pub fn shape_for(&self, entity: Entity) -> Option<ShapeId> {
        self.shapes.get(&entity).copied()
    }

    pub fn entity_for(&self, id: ShapeId) -> Option<Entity> {
        self.owners.get(&id).copied()
    }

    pub fn shape(&self, entity: Entity) -> Option<&Shape> {
        self.space.shape(self.shape_for(entity)?)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.shapes.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn space(&self) -> &CollisionSpace {
        &self.space
    }

    pub fn space_mut(&mut self) -> &mut CollisionSpace {
        &mut self.space
    }

    fn shape_id(&self, entity: Entity) -> CollisionResult<ShapeId> {
        self.shape_for(entity).ok_or(CollisionError::UnknownEntity(entity))
    }

    fn forget(&mut self, entity: Entity, id: ShapeId) {
        self.shapes.remove(&entity);
        self.owners.remove(&id);
        let mut ended: Vec<_> = self.touching.iter().filter(|(a, b)| *a == entity || *b == entity).copied().collect();
        ended.sort_unstable();
        for pair in &ended {
            self.touching.remove(pair);
        }
        self.events.extend(ended.into_iter().map(|(a, b)| GameEvent::collision_ended(a, b)));
        self.events.push(GameEvent::ShapeRemoved { entity, shape: id });
    }
}

fn entity_pair(a: Entity, b: Entity) -> (Entity, Entity) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
