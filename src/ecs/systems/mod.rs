use crate::error::CollisionError;
use bevy_ecs::prelude::Resource;

mod collision;
mod enemy;

pub use collision::*;
pub use enemy::*;

#[derive(Resource, Clone, Copy)]
pub struct TimeDelta(pub f32);

#[derive(Resource, Clone, Copy)]
pub struct FlashSettings {
    /// Rise time; the whole pulse lasts twice as long.
    pub duration: f32,
    pub peak: f32,
}

/// Outcome of the last collision tick. Systems cannot return errors, so a fatal step failure is
/// parked here for the world driver to surface.
#[derive(Resource, Default, Debug)]
pub struct CollisionStatus {
    pub contacts: usize,
    pub rejected: usize,
    pub fault: Option<CollisionError>,
}
