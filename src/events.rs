use crate::shape::ShapeId;
use bevy_ecs::prelude::{Entity, Resource};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    ShapeAdded { entity: Entity, shape: ShapeId },
    ShapeRemoved { entity: Entity, shape: ShapeId },
    CollisionStarted { a: Entity, b: Entity },
    CollisionEnded { a: Entity, b: Entity },
    ShapeFlashed { entity: Entity },
    EnemyHit { enemy: Entity, by: Entity },
}

impl GameEvent {
    fn ordered_pair(a: Entity, b: Entity) -> (Entity, Entity) {
        let (first, second) = if a.index() <= b.index() { (a, b) } else { (b, a) };
        (first, second)
    }

    pub fn collision_started(a: Entity, b: Entity) -> Self {
        let (a, b) = Self::ordered_pair(a, b);
        GameEvent::CollisionStarted { a, b }
    }

    pub fn collision_ended(a: Entity, b: Entity) -> Self {
        let (a, b) = Self::ordered_pair(a, b);
        GameEvent::CollisionEnded { a, b }
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::ShapeAdded { entity, shape } => {
                write!(f, "ShapeAdded entity={} shape={shape}", entity.index())
            }
            GameEvent::ShapeRemoved { entity, shape } => {
                write!(f, "ShapeRemoved entity={} shape={shape}", entity.index())
            }
            GameEvent::CollisionStarted { a, b } => {
                write!(f, "CollisionStarted a={} b={}", a.index(), b.index())
            }
            GameEvent::CollisionEnded { a, b } => {
                write!(f, "CollisionEnded a={} b={}", a.index(), b.index())
            }
            GameEvent::ShapeFlashed { entity } => write!(f, "ShapeFlashed entity={}", entity.index()),
            GameEvent::EnemyHit { enemy, by } => {
                write!(f, "EnemyHit enemy={} by={}", enemy.index(), by.index())
            }
        }
    }
}

#[derive(Default, Resource)]
pub struct EventBus {
    events: Vec<GameEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = GameEvent>) {
        self.events.extend(events);
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::world::World;

    #[test]
    fn collision_pairs_are_ordered_by_index() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        assert_eq!(GameEvent::collision_started(b, a), GameEvent::CollisionStarted { a, b });
        assert_eq!(GameEvent::collision_ended(b, a), GameEvent::CollisionEnded { a, b });
    }

    #[test]
    fn drain_empties_the_bus() {
        let mut world = World::new();
        let entity = world.spawn_empty().id();
        let mut bus = EventBus::default();
        bus.push(GameEvent::ShapeFlashed { entity });
        assert_eq!(bus.len(), 1);
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert!(bus.is_empty());
        assert!(drained[0].to_string().starts_with("ShapeFlashed"));
    }
}
