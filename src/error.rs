use crate::shape::ShapeId;
use bevy_ecs::prelude::Entity;
use thiserror::Error;

pub type CollisionResult<T> = Result<T, CollisionError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollisionError {
    #[error("shape {0} is already registered in the collision space")]
    DuplicateShape(ShapeId),
    #[error("shape {0} is not registered in the collision space")]
    UnknownShape(ShapeId),
    #[error("entity {0:?} already owns a collision shape")]
    DuplicateEntity(Entity),
    #[error("entity {0:?} has no collision shape")]
    UnknownEntity(Entity),
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("collision space corrupted: {0}")]
    SpaceCorruption(String),
}

impl CollisionError {
    pub(crate) fn geometry(reason: impl Into<String>) -> Self {
        CollisionError::InvalidGeometry(reason.into())
    }

    /// Corruption means the shape/proxy bookkeeping is broken; callers must not retry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CollisionError::SpaceCorruption(_))
    }
}
