use super::systems::*;
use super::types::*;
use crate::config::{EnemyBehavior, EnemyConfig, GameConfig};
use crate::error::{CollisionError, CollisionResult};
use crate::events::{EventBus, GameEvent};
use crate::layer::CollisionLayer;
use crate::shape::Shape;
use crate::space::Partition;
use bevy_ecs::prelude::{Bundle, Entity, IntoSystemConfigs, Schedule, World};
use glam::Vec2;

pub const PLAYER_GROUP: u32 = 1;
pub const PLAYER_RADIUS: f32 = 12.0;
pub const ENEMY_RADIUS: f32 = 10.0;
pub const WEAPON_RANGE: f32 = 200.0;
pub const BULLET_TTL: f32 = 0.1;
const ARENA_HALF_EXTENT: f32 = 400.0;
const WALL_THICKNESS: f32 = 20.0;

/// ECS world driving a collision layer at a fixed tick.
pub struct CollisionWorld {
    pub world: World,
    schedule_fixed: Schedule,
}

impl CollisionWorld {
    pub fn new(config: &GameConfig) -> Self {
        let mut world = World::new();
        world.insert_resource(TimeDelta(0.0));
        world.insert_resource(CollisionLayer::new(&config.collision));
        world.insert_resource(FlashSettings {
            duration: config.collision.flash_duration,
            peak: config.collision.flash_scale,
        });
        world.insert_resource(CollisionStatus::default());
        world.insert_resource(EventBus::default());

        let mut schedule_fixed = Schedule::default();
        schedule_fixed.add_systems(
            (
                sys_steer_boids,
                sys_follow_waypoints,
                sys_integrate_velocities,
                sys_sync_collision_shapes,
                sys_step_collisions,
                sys_sync_from_bodies,
                sys_resolve_hits,
                sys_expire_bullets,
                sys_start_collision_flash,
                sys_animate_flash,
            )
                .chain(),
        );

        Self { world, schedule_fixed }
    }

    /// Runs one collision tick. A fatal collision failure stops the world: it is returned here
    /// and every later tick skips the step.
    pub fn fixed_step(&mut self, dt: f32) -> CollisionResult<()> {
        self.world.resource_mut::<TimeDelta>().0 = dt;
        self.schedule_fixed.run(&mut self.world);
        match &self.world.resource::<CollisionStatus>().fault {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    pub fn spawn_demo_scene(&mut self, enemies: &EnemyConfig) -> CollisionResult<Entity> {
        let player = self.spawn_player(Vec2::ZERO)?;
        let walls = [
            (Vec2::new(0.0, ARENA_HALF_EXTENT), Vec2::new(2.0 * ARENA_HALF_EXTENT, WALL_THICKNESS)),
            (Vec2::new(0.0, -ARENA_HALF_EXTENT), Vec2::new(2.0 * ARENA_HALF_EXTENT, WALL_THICKNESS)),
            (Vec2::new(ARENA_HALF_EXTENT, 0.0), Vec2::new(WALL_THICKNESS, 2.0 * ARENA_HALF_EXTENT)),
            (Vec2::new(-ARENA_HALF_EXTENT, 0.0), Vec2::new(WALL_THICKNESS, 2.0 * ARENA_HALF_EXTENT)),
        ];
        for (center, size) in walls {
            self.spawn_wall(center, size, 0.0)?;
        }
        let ring = 0.6 * ARENA_HALF_EXTENT;
        for i in 0..enemies.count {
            let angle = std::f32::consts::TAU * i as f32 / enemies.count.max(1) as f32;
            self.spawn_enemy(Vec2::from_angle(angle) * ring, enemies.behavior, enemies.speed)?;
        }
        Ok(player)
    }

    pub fn spawn_player(&mut self, position: Vec2) -> CollisionResult<Entity> {
        let shape = Shape::circle(PLAYER_RADIUS, position)?.with_mass(1.0)?.with_group(PLAYER_GROUP);
        let bundle = (Player, Transform::from_translation(position), Velocity::default());
        self.spawn_with_shape(bundle, shape, Partition::Active)
    }

    /// Boids chase the player; waypoint enemies patrol a square around their spawn point.
    pub fn spawn_enemy(&mut self, position: Vec2, behavior: EnemyBehavior, speed: f32) -> CollisionResult<Entity> {
        let enemy = match behavior {
            EnemyBehavior::Boid => Enemy::boid(speed),
            EnemyBehavior::Waypoint => {
                let half = 4.0 * ENEMY_RADIUS;
                let corners =
                    [Vec2::new(half, half), Vec2::new(-half, half), Vec2::new(-half, -half), Vec2::new(half, -half)];
                Enemy::patrol(speed, corners.iter().map(|corner| position + *corner).collect())
            }
        };
        let shape = Shape::circle(ENEMY_RADIUS, position)?.with_mass(1.0)?;
        let bundle = (enemy, Transform::from_translation(position), Velocity::default());
        self.spawn_with_shape(bundle, shape, Partition::Active)
    }

    pub fn spawn_wall(&mut self, center: Vec2, size: Vec2, rotation: f32) -> CollisionResult<Entity> {
        let shape = Shape::square(size.x, size.y, center)?.with_rotation(rotation);
        let transform = Transform { translation: center, rotation, scale: 1.0 };
        self.spawn_with_shape((Wall, transform), shape, Partition::Static)
    }

    /// Fires a segment along the shooter's heading. Bullets share the shooter's group, so they
    /// never hit whoever fired them.
    pub fn fire_bullet(&mut self, shooter: Entity) -> CollisionResult<Entity> {
        let transform = *self.world.get::<Transform>(shooter).ok_or(CollisionError::UnknownEntity(shooter))?;
        let group = self.layer().shape(shooter).and_then(Shape::group);
        let target = transform.translation + transform.forward() * WEAPON_RANGE;
        let mut shape = Shape::segment(1.0, transform.translation, target)?;
        shape.set_group(group);
        let bundle = (Bullet { shooter, ttl: BULLET_TTL }, Transform::from_translation(transform.translation));
        self.spawn_with_shape(bundle, shape, Partition::Active)
    }

    fn spawn_with_shape<B: Bundle>(
        &mut self,
        bundle: B,
        shape: Shape,
        partition: Partition,
    ) -> CollisionResult<Entity> {
        let entity = self.world.spawn((bundle, CollisionBody { partition }, VisualScale::default())).id();
        let added = self.world.resource_mut::<CollisionLayer>().add(entity, shape, partition);
        if let Err(err) = added {
            self.world.despawn(entity);
            return Err(err);
        }
        let events = self.world.resource_mut::<CollisionLayer>().drain_events();
        self.world.resource_mut::<EventBus>().extend(events);
        Ok(entity)
    }

    pub fn despawn(&mut self, entity: Entity) -> CollisionResult<()> {
        let removed = self.world.resource_mut::<CollisionLayer>().remove(entity).map(|_| ());
        self.world.despawn(entity);
        let events = self.world.resource_mut::<CollisionLayer>().drain_events();
        self.world.resource_mut::<EventBus>().extend(events);
        removed
    }

    pub fn set_translation(&mut self, entity: Entity, translation: Vec2) -> bool {
        if let Some(mut transform) = self.world.get_mut::<Transform>(entity) {
            transform.translation = translation;
            true
        } else {
            false
        }
    }

    pub fn set_rotation(&mut self, entity: Entity, rotation: f32) -> bool {
        if let Some(mut transform) = self.world.get_mut::<Transform>(entity) {
            transform.rotation = rotation;
            true
        } else {
            false
        }
    }

    pub fn transform(&self, entity: Entity) -> Option<Transform> {
        self.world.get::<Transform>(entity).copied()
    }

    pub fn layer(&self) -> &CollisionLayer {
        self.world.resource::<CollisionLayer>()
    }

    pub fn layer_mut(&mut self) -> bevy_ecs::world::Mut<'_, CollisionLayer> {
        self.world.resource_mut::<CollisionLayer>()
    }

    pub fn status(&self) -> &CollisionStatus {
        self.world.resource::<CollisionStatus>()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.world.resource_mut::<EventBus>().drain()
    }

    pub fn enemy_count(&mut self) -> usize {
        let mut query = self.world.query::<&Enemy>();
        query.iter(&self.world).count()
    }

    pub fn entity_exists(&self, entity: Entity) -> bool {
        self.world.get_entity(entity).is_ok()
    }
}
