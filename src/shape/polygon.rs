use crate::error::{CollisionError, CollisionResult};
use crate::shape::Pose;
use glam::Vec2;
use smallvec::SmallVec;

const AREA_EPSILON: f32 = 1e-6;
const TURN_EPSILON: f32 = 1e-3;

pub(crate) type Vertices = SmallVec<[Vec2; 8]>;

/// Convex polygon stored as world-space vertices in counter-clockwise order.
///
/// Transform changes are applied incrementally to the existing vertices, pivoting on the
/// owning shape's position.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vertices,
}

impl Polygon {
    /// `local` is relative to `position`; clockwise input is reversed.
    pub(crate) fn new(local: &[Vec2], position: Vec2) -> CollisionResult<Self> {
        let mut vertices: Vertices = local.iter().map(|v| *v + position).collect();
        normalize_winding(&mut vertices)?;
        Ok(Self { vertices })
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub(crate) fn position_changed(&mut self, offset: Vec2) {
        for vertex in &mut self.vertices {
            *vertex += offset;
        }
    }

    pub(crate) fn scale_changed(&mut self, factor: f32, pivot: Vec2) {
        for vertex in &mut self.vertices {
            *vertex = pivot + (*vertex - pivot) * factor;
        }
    }

    pub(crate) fn rotation_changed(&mut self, angle: f32, pivot: Vec2) {
        let rot = Vec2::from_angle(angle);
        for vertex in &mut self.vertices {
            *vertex = pivot + rot.rotate(*vertex - pivot);
        }
    }
}

/// Axis-aligned box before rotation. Vertices are rebuilt from the stored dimensions on every
/// transform change rather than patched in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Square {
    width: f32,
    height: f32,
    vertices: Vertices,
}

impl Square {
    pub(crate) fn new(width: f32, height: f32, pose: Pose) -> CollisionResult<Self> {
        for (label, value) in [("width", width), ("height", height)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CollisionError::geometry(format!("square {label} must be positive, got {value}")));
            }
        }
        let mut square = Self { width, height, vertices: Vertices::new() };
        square.rebuild(pose);
        Ok(square)
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub(crate) fn rebuild(&mut self, pose: Pose) {
        let half_w = 0.5 * self.width * pose.scale;
        let half_h = 0.5 * self.height * pose.scale;
        let rot = Vec2::from_angle(pose.rotation);
        // counter-clockwise starting bottom-left
        let corners = [
            Vec2::new(-half_w, -half_h),
            Vec2::new(half_w, -half_h),
            Vec2::new(half_w, half_h),
            Vec2::new(-half_w, half_h),
        ];
        self.vertices.clear();
        self.vertices.extend(corners.into_iter().map(|corner| pose.position + rot.rotate(corner)));
    }
}

/// Vertices expressed in the body frame of a shape at `pose`.
pub(crate) fn to_local(vertices: &[Vec2], pose: Pose) -> Vertices {
    let inverse = Vec2::from_angle(-pose.rotation);
    vertices.iter().map(|v| inverse.rotate(*v - pose.position)).collect()
}

/// Moment of inertia about the local origin for a polygon of uniform density.
pub(crate) fn moment_for_polygon(mass: f32, local: &[Vec2]) -> f32 {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, v1) in local.iter().enumerate() {
        let v2 = local[(i + 1) % local.len()];
        let cross = v2.perp_dot(*v1);
        numerator += cross * (v1.dot(*v1) + v1.dot(v2) + v2.dot(v2));
        denominator += cross;
    }
    if denominator.abs() <= AREA_EPSILON {
        return 0.0;
    }
    mass * numerator / (6.0 * denominator)
}

pub(crate) fn signed_area(vertices: &[Vec2]) -> f32 {
    let mut twice_area = 0.0;
    for (i, v1) in vertices.iter().enumerate() {
        let v2 = vertices[(i + 1) % vertices.len()];
        twice_area += v1.perp_dot(v2);
    }
    0.5 * twice_area
}

fn normalize_winding(vertices: &mut Vertices) -> CollisionResult<()> {
    if vertices.len() < 3 {
        return Err(CollisionError::geometry(format!("polygon needs at least 3 vertices, got {}", vertices.len())));
    }
    if vertices.iter().any(|v| !v.is_finite()) {
        return Err(CollisionError::geometry("polygon vertices must be finite"));
    }
    let area = signed_area(vertices);
    if area.abs() <= AREA_EPSILON {
        return Err(CollisionError::geometry("polygon has zero area"));
    }
    if area < 0.0 {
        vertices.reverse();
    }
    let count = vertices.len();
    let mut turning = 0.0;
    for i in 0..count {
        let p0 = vertices[i];
        let p1 = vertices[(i + 1) % count];
        let p2 = vertices[(i + 2) % count];
        let edge_in = p1 - p0;
        let edge_out = p2 - p1;
        if edge_in.length_squared() <= AREA_EPSILON {
            return Err(CollisionError::geometry(format!("polygon repeats vertex {}", (i + 1) % count)));
        }
        let cross = edge_in.perp_dot(edge_out);
        if cross < -AREA_EPSILON {
            return Err(CollisionError::geometry(format!("polygon is not convex at vertex {}", (i + 1) % count)));
        }
        turning += cross.atan2(edge_in.dot(edge_out));
    }
    // a convex outline turns exactly once; pentagrams and friends turn more
    if (turning - std::f32::consts::TAU).abs() > TURN_EPSILON {
        return Err(CollisionError::geometry("polygon outline intersects itself"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Vec<Vec2> {
        vec![Vec2::new(-1.0, -1.0), Vec2::new(1.0, -1.0), Vec2::new(1.0, 1.0), Vec2::new(-1.0, 1.0)]
    }

    #[test]
    fn clockwise_input_is_reversed() {
        let mut clockwise = unit_box();
        clockwise.reverse();
        let polygon = Polygon::new(&clockwise, Vec2::ZERO).expect("valid polygon");
        assert!(signed_area(polygon.vertices()) > 0.0);
    }

    #[test]
    fn rejects_concave_and_self_intersecting_outlines() {
        let concave = [Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 4.0)];
        assert!(Polygon::new(&concave, Vec2::ZERO).is_err());

        let star: Vec<Vec2> =
            (0..5).map(|i| Vec2::from_angle(i as f32 * 2.0 * std::f32::consts::TAU / 5.0) * 3.0).collect();
        assert!(Polygon::new(&star, Vec2::ZERO).is_err());

        let collinear = [Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)];
        assert!(Polygon::new(&collinear, Vec2::ZERO).is_err());
    }

    #[test]
    fn box_moment_matches_closed_form() {
        // w = h = 2: m * (w^2 + h^2) / 12
        let moment = moment_for_polygon(3.0, &unit_box());
        assert!((moment - 2.0).abs() < 1e-5);
    }

    #[test]
    fn square_rebuild_tracks_pose() {
        let pose = Pose { position: Vec2::new(5.0, 5.0), scale: 2.0, rotation: 0.0 };
        let square = Square::new(2.0, 4.0, pose).expect("valid square");
        assert_eq!(square.vertices()[0], Vec2::new(3.0, 1.0));
        assert_eq!(square.vertices()[2], Vec2::new(7.0, 9.0));
    }
}
