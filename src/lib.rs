pub mod cli;
pub mod config;
pub mod ecs;
pub mod error;
pub mod events;
pub mod layer;
pub mod shape;
pub mod space;
pub mod time;

pub use error::{CollisionError, CollisionResult};
pub use layer::{CollisionLayer, SegmentHit, TransformChange};
pub use shape::{BodyProperties, Pose, Shape, ShapeId, ShapeKind};
pub use space::{
    CollisionCallback, CollisionSpace, Partition, PendingChange, PendingChanges, ProxyChanges, SpaceStats,
    StepReport,
};

pub(crate) fn wrap_angle(radians: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    if !radians.is_finite() {
        return 0.0;
    }
    (radians + PI).rem_euclid(TAU) - PI
}

#[cfg(test)]
mod tests {
    use super::wrap_angle;
    use std::f32::consts::PI;

    #[test]
    fn wraps_into_half_turn_range() {
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-5 || (wrap_angle(3.0 * PI) + PI).abs() < 1e-5);
        assert!((wrap_angle(-0.5) + 0.5).abs() < 1e-6);
        assert_eq!(wrap_angle(f32::NAN), 0.0);
    }

    #[test]
    fn huge_angles_terminate_in_range() {
        for angle in [1.0e10_f32, -1.0e10, f32::MAX, f32::MIN] {
            let wrapped = wrap_angle(angle);
            assert!((-PI..=PI).contains(&wrapped), "{angle} wrapped to {wrapped}");
        }
    }
}
