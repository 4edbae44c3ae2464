use crate::error::{CollisionError, CollisionResult};
use glam::Vec2;

/// Thick line whose endpoints live in the owning shape's local frame: `a` sits on the shape
/// position and `b` points at the target the segment was built towards.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    a: Vec2,
    b: Vec2,
    radius: f32,
}

impl Segment {
    pub fn new(radius: f32, origin: Vec2, target: Vec2) -> CollisionResult<Self> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(CollisionError::geometry(format!("segment radius must be non-negative, got {radius}")));
        }
        if !origin.is_finite() || !target.is_finite() {
            return Err(CollisionError::geometry("segment endpoints must be finite"));
        }
        let b = target - origin;
        if b.length_squared() <= f32::EPSILON && radius == 0.0 {
            return Err(CollisionError::geometry("segment has zero length and zero radius"));
        }
        Ok(Self { a: Vec2::ZERO, b, radius })
    }

    pub fn a(&self) -> Vec2 {
        self.a
    }

    pub fn b(&self) -> Vec2 {
        self.b
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn length(&self) -> f32 {
        (self.b - self.a).length()
    }

    pub(crate) fn scale_changed(&mut self, factor: f32) {
        self.a *= factor;
        self.b *= factor;
        self.radius *= factor;
    }

    /// Rounded rod about the local origin, matching how the proxy body is centered.
    pub(crate) fn moment(&self, mass: f32) -> f32 {
        let length = self.length() + 2.0 * self.radius;
        let offset = (self.a + self.b) * 0.5;
        mass * ((length * length + 4.0 * self.radius * self.radius) / 12.0 + offset.length_squared())
    }

    pub(crate) fn world_endpoints(&self, position: Vec2, rotation: f32) -> (Vec2, Vec2) {
        let rot = Vec2::from_angle(rotation);
        (position + rot.rotate(self.a), position + rot.rotate(self.b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_relative_to_origin() {
        let segment = Segment::new(1.0, Vec2::new(10.0, 5.0), Vec2::new(14.0, 8.0)).expect("valid segment");
        assert_eq!(segment.a(), Vec2::ZERO);
        assert_eq!(segment.b(), Vec2::new(4.0, 3.0));
        assert!((segment.length() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_segment_is_rejected() {
        assert!(Segment::new(0.0, Vec2::ONE, Vec2::ONE).is_err());
        assert!(Segment::new(-1.0, Vec2::ZERO, Vec2::X).is_err());
        // a zero-length segment with thickness is a valid ball
        assert!(Segment::new(0.5, Vec2::ONE, Vec2::ONE).is_ok());
    }

    #[test]
    fn scale_moves_endpoints_and_radius() {
        let mut segment = Segment::new(0.5, Vec2::ZERO, Vec2::new(2.0, 0.0)).expect("valid segment");
        segment.scale_changed(3.0);
        assert_eq!(segment.b(), Vec2::new(6.0, 0.0));
        assert!((segment.radius() - 1.5).abs() < 1e-6);
    }
}
