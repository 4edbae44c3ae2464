use super::TimeDelta;
use crate::config::EnemyBehavior;
use crate::ecs::types::*;
use crate::events::{EventBus, GameEvent};
use crate::layer::CollisionLayer;
use crate::wrap_angle;
use bevy_ecs::prelude::*;
use bevy_ecs::system::{Res, ResMut};
use glam::Vec2;

/// Boids turn at most this fast (270 degrees per second).
pub const MAX_TURN_RATE: f32 = 3.0 * std::f32::consts::FRAC_PI_2;
/// Distance at which a patrolling enemy switches to its next waypoint.
pub const WAYPOINT_RADIUS: f32 = 8.0;

pub fn sys_steer_boids(
    player: Query<&Transform, (With<Player>, Without<Enemy>)>,
    mut enemies: Query<(&mut Transform, &mut Velocity, &Enemy)>,
    dt: Res<TimeDelta>,
) {
    let Some(target) = player.iter().next().map(|t| t.translation) else {
        return;
    };
    for (mut transform, mut velocity, enemy) in &mut enemies {
        if enemy.behavior != EnemyBehavior::Boid {
            continue;
        }
        let to_target = target - transform.translation;
        if to_target.length_squared() <= f32::EPSILON {
            velocity.0 = Vec2::ZERO;
            continue;
        }
        let desired = to_target.y.atan2(to_target.x);
        let max_turn = MAX_TURN_RATE * dt.0;
        let turn = wrap_angle(desired - transform.rotation).clamp(-max_turn, max_turn);
        transform.rotation = wrap_angle(transform.rotation + turn);
        velocity.0 = transform.forward() * enemy.speed;
    }
}

pub fn sys_follow_waypoints(mut enemies: Query<(&mut Transform, &mut Velocity, &mut Enemy)>) {
    for (mut transform, mut velocity, mut enemy) in &mut enemies {
        if enemy.behavior != EnemyBehavior::Waypoint || enemy.waypoints.is_empty() {
            continue;
        }
        let mut index = enemy.next_waypoint % enemy.waypoints.len();
        if transform.translation.distance(enemy.waypoints[index]) <= WAYPOINT_RADIUS {
            index = (index + 1) % enemy.waypoints.len();
            enemy.next_waypoint = index;
        }
        let heading = (enemy.waypoints[index] - transform.translation).normalize_or_zero();
        if heading != Vec2::ZERO {
            transform.rotation = heading.y.atan2(heading.x);
        }
        velocity.0 = heading * enemy.speed;
    }
}

pub fn sys_integrate_velocities(mut query: Query<(&mut Transform, &Velocity)>, dt: Res<TimeDelta>) {
    for (mut transform, velocity) in &mut query {
        if velocity.0 != Vec2::ZERO {
            transform.translation += velocity.0 * dt.0;
        }
    }
}

/// Any enemy touching a bullet is removed from the layer and despawned.
pub fn sys_resolve_hits(
    mut commands: Commands,
    mut layer: ResMut<CollisionLayer>,
    mut events: ResMut<EventBus>,
    bullets: Query<Entity, With<Bullet>>,
    enemies: Query<Entity, With<Enemy>>,
) {
    for enemy in &enemies {
        let Some(bullet) = bullets.iter().find(|&bullet| layer.is_touching(bullet, enemy)) else {
            continue;
        };
        if let Err(err) = layer.remove(enemy) {
            log::warn!("could not remove hit enemy {}: {err}", enemy.index());
            continue;
        }
        events.push(GameEvent::EnemyHit { enemy, by: bullet });
        commands.entity(enemy).despawn();
    }
    events.extend(layer.drain_events());
}

pub fn sys_expire_bullets(
    mut commands: Commands,
    mut layer: ResMut<CollisionLayer>,
    mut events: ResMut<EventBus>,
    mut bullets: Query<(Entity, &mut Bullet)>,
    dt: Res<TimeDelta>,
) {
    for (entity, mut bullet) in &mut bullets {
        bullet.ttl -= dt.0;
        if bullet.ttl > 0.0 {
            continue;
        }
        if let Err(err) = layer.remove(entity) {
            log::warn!("expired bullet {} had no shape: {err}", entity.index());
        }
        commands.entity(entity).despawn();
    }
    events.extend(layer.drain_events());
}
