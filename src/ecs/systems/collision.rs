use super::{CollisionStatus, FlashSettings, TimeDelta};
use crate::ecs::types::*;
use crate::events::EventBus;
use crate::layer::CollisionLayer;
use bevy_ecs::prelude::*;
use bevy_ecs::system::{Res, ResMut};

pub fn sys_sync_collision_shapes(
    mut layer: ResMut<CollisionLayer>,
    mut status: ResMut<CollisionStatus>,
    query: Query<(Entity, &Transform), (With<CollisionBody>, Changed<Transform>)>,
) {
    for (entity, transform) in &query {
        match layer.sync_pose(entity, transform.pose()) {
            Ok(_) => {}
            Err(err) if err.is_fatal() => {
                log::error!("collision sync failed for entity {}: {err}", entity.index());
                status.fault.get_or_insert(err);
            }
            Err(err) => log::warn!("entity {} left out of collision sync: {err}", entity.index()),
        }
    }
}

pub fn sys_step_collisions(
    mut layer: ResMut<CollisionLayer>,
    mut status: ResMut<CollisionStatus>,
    mut events: ResMut<EventBus>,
    dt: Res<TimeDelta>,
) {
    if status.fault.is_some() {
        return;
    }
    match layer.step(dt.0) {
        Ok(report) => {
            status.contacts = report.contacts.len();
            status.rejected = report.rejected.len();
        }
        Err(err) => {
            log::error!("collision step failed: {err}");
            status.fault = Some(err);
        }
    }
    events.extend(layer.drain_events());
}

/// Writes engine-integrated poses back onto transforms. Only dynamic bodies drift from their
/// shape, so this is a no-op while physics is disabled.
pub fn sys_sync_from_bodies(
    layer: Res<CollisionLayer>,
    mut query: Query<(Entity, &CollisionBody, &mut Transform)>,
) {
    let space = layer.space();
    if !space.physics_enabled() {
        return;
    }
    for (entity, _, mut transform) in &mut query {
        let Some((position, rotation)) = layer.shape_for(entity).and_then(|id| space.body_pose(id)) else {
            continue;
        };
        if !position.abs_diff_eq(transform.translation, 1e-5) || (rotation - transform.rotation).abs() > 1e-5 {
            transform.translation = position;
            transform.rotation = rotation;
        }
    }
}

pub fn sys_start_collision_flash(
    mut commands: Commands,
    mut layer: ResMut<CollisionLayer>,
    settings: Res<FlashSettings>,
    flashing: Query<(), With<CollisionFlash>>,
) {
    for entity in layer.drain_flashes() {
        if flashing.contains(entity) {
            continue;
        }
        if let Some(mut entity_commands) = commands.get_entity(entity) {
            entity_commands.insert(CollisionFlash::new(settings.duration, settings.peak));
        }
    }
}

pub fn sys_animate_flash(
    mut commands: Commands,
    mut query: Query<(Entity, &mut CollisionFlash, &mut VisualScale)>,
    dt: Res<TimeDelta>,
) {
    for (entity, mut flash, mut visual) in &mut query {
        flash.elapsed += dt.0;
        visual.0 = flash.multiplier();
        if flash.finished() {
            visual.0 = 1.0;
            commands.entity(entity).remove::<CollisionFlash>();
        }
    }
}
