use crate::error::{CollisionError, CollisionResult};
use glam::Vec2;

#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    radius: f32,
}

impl Circle {
    pub fn new(radius: f32) -> CollisionResult<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(CollisionError::geometry(format!("circle radius must be positive, got {radius}")));
        }
        Ok(Self { radius })
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub(crate) fn scale_changed(&mut self, factor: f32) {
        self.radius *= factor;
    }

    /// Solid disk about its center.
    pub(crate) fn moment(&self, mass: f32) -> f32 {
        0.5 * mass * self.radius * self.radius
    }

    pub(crate) fn outline(&self, center: Vec2, segments: usize, out: &mut Vec<Vec2>) {
        let segments = segments.max(3);
        let step = std::f32::consts::TAU / segments as f32;
        for i in 0..segments {
            out.push(center + Vec2::from_angle(step * i as f32) * self.radius);
        }
    }
}
