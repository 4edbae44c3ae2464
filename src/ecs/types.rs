use crate::config::EnemyBehavior;
use crate::shape::Pose;
use crate::space::Partition;
use bevy_ecs::prelude::*;
use glam::Vec2;

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec2,
    pub rotation: f32,
    /// Uniform; collision shapes only scale uniformly.
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self { translation: Vec2::ZERO, rotation: 0.0, scale: 1.0 }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec2) -> Self {
        Self { translation, ..Self::default() }
    }

    pub fn pose(&self) -> Pose {
        Pose { position: self.translation, scale: self.scale, rotation: self.rotation }
    }

    pub fn forward(&self) -> Vec2 {
        Vec2::from_angle(self.rotation)
    }
}

#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Velocity(pub Vec2);

/// Marks an entity whose `Transform` is mirrored into the collision layer.
#[derive(Component, Clone, Copy, Debug)]
pub struct CollisionBody {
    pub partition: Partition,
}

/// Presentation-only scale; flashes pulse this instead of `Transform::scale` so the collision
/// geometry stays put.
#[derive(Component, Clone, Copy, Debug)]
pub struct VisualScale(pub f32);

impl Default for VisualScale {
    fn default() -> Self {
        Self(1.0)
    }
}

/// Scale pulse played when an entity's shape touches another.
#[derive(Component, Clone, Copy, Debug)]
pub struct CollisionFlash {
    pub elapsed: f32,
    /// Seconds to reach `peak`; the pulse then reverses over the same time.
    pub duration: f32,
    pub peak: f32,
}

impl CollisionFlash {
    pub fn new(duration: f32, peak: f32) -> Self {
        Self { elapsed: 0.0, duration, peak }
    }

    /// Rises linearly to `peak` after `duration`, then back to 1.
    pub fn multiplier(&self) -> f32 {
        if self.duration <= 0.0 || self.finished() {
            return 1.0;
        }
        let t = self.elapsed / self.duration;
        let ramp = 1.0 - (t - 1.0).abs();
        1.0 + (self.peak - 1.0) * ramp
    }

    pub fn finished(&self) -> bool {
        self.elapsed >= 2.0 * self.duration
    }
}

#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Player;

#[derive(Component, Clone, Debug)]
pub struct Enemy {
    pub behavior: EnemyBehavior,
    pub speed: f32,
    /// Patrol loop; only read by waypoint enemies.
    pub waypoints: Vec<Vec2>,
    pub next_waypoint: usize,
}

impl Enemy {
    pub fn boid(speed: f32) -> Self {
        Self { behavior: EnemyBehavior::Boid, speed, waypoints: Vec::new(), next_waypoint: 0 }
    }

    pub fn patrol(speed: f32, waypoints: Vec<Vec2>) -> Self {
        Self { behavior: EnemyBehavior::Waypoint, speed, waypoints, next_waypoint: 0 }
    }
}

#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Wall;

#[derive(Component, Clone, Copy, Debug)]
pub struct Bullet {
    pub shooter: Entity,
    pub ttl: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn flash_peaks_after_rise_then_reverses() {
        let mut flash = CollisionFlash::new(1.5, 2.0);
        assert_relative_eq!(flash.multiplier(), 1.0);
        flash.elapsed = 0.75;
        assert_relative_eq!(flash.multiplier(), 1.5);
        flash.elapsed = 1.5;
        assert_relative_eq!(flash.multiplier(), 2.0);
        flash.elapsed = 2.25;
        assert!(!flash.finished());
        assert_relative_eq!(flash.multiplier(), 1.5);
        flash.elapsed = 3.0;
        assert!(flash.finished());
        assert_relative_eq!(flash.multiplier(), 1.0);
    }

    #[test]
    fn transform_pose_carries_every_field() {
        let transform = Transform { translation: Vec2::new(3.0, 4.0), rotation: 0.5, scale: 2.0 };
        let pose = transform.pose();
        assert_eq!(pose.position, Vec2::new(3.0, 4.0));
        assert_eq!(pose.rotation, 0.5);
        assert_eq!(pose.scale, 2.0);
    }
}
