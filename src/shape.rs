//! Engine-agnostic collision geometry.
//!
//! A [`Shape`] carries a transform (position, uniform scale, rotation in radians) plus one of the
//! concrete variants in [`ShapeKind`]. Transform setters are explicit: they store the new value,
//! derive the delta (offset, factor, angle) and hand it to the variant so derived geometry is
//! recomputed before the call returns. Nothing here knows about the physics back end; the
//! collision space mirrors shapes into rapier on `update`.

mod circle;
mod polygon;
mod segment;

pub use circle::Circle;
pub use polygon::{Polygon, Square};
pub use segment::Segment;

pub(crate) use polygon::{moment_for_polygon, to_local, Vertices};

use crate::error::{CollisionError, CollisionResult};
use glam::Vec2;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SHAPE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a shape. Clones of a shape share the id, so registering a clone of an already
/// registered shape is reported as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(u64);

impl ShapeId {
    fn next() -> Self {
        Self(NEXT_SHAPE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mass properties pushed onto the proxy body. Infinite values mean the body never reacts to
/// contacts, even when it lives in the active partition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyProperties {
    pub mass: f32,
    pub inertia: f32,
}

impl BodyProperties {
    pub const IMMOVABLE: Self = Self { mass: f32::INFINITY, inertia: f32::INFINITY };

    pub fn new(mass: f32, inertia: f32) -> CollisionResult<Self> {
        for (label, value) in [("mass", mass), ("inertia", inertia)] {
            if value.is_nan() || value <= 0.0 {
                return Err(CollisionError::geometry(format!("body {label} must be positive, got {value}")));
            }
        }
        Ok(Self { mass, inertia })
    }

    pub fn is_dynamic(&self) -> bool {
        self.mass.is_finite()
    }
}

impl Default for BodyProperties {
    fn default() -> Self {
        Self::IMMOVABLE
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec2,
    pub scale: f32,
    pub rotation: f32,
}

impl Default for Pose {
    fn default() -> Self {
        Self { position: Vec2::ZERO, scale: 1.0, rotation: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Circle(Circle),
    Segment(Segment),
    Polygon(Polygon),
    Square(Square),
}

impl ShapeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Circle(_) => "circle",
            ShapeKind::Segment(_) => "segment",
            ShapeKind::Polygon(_) => "polygon",
            ShapeKind::Square(_) => "square",
        }
    }

    fn position_changed(&mut self, offset: Vec2, pose: Pose) {
        match self {
            ShapeKind::Polygon(polygon) => polygon.position_changed(offset),
            ShapeKind::Square(square) => square.rebuild(pose),
            // circle centers and segment endpoints are expressed relative to the position
            ShapeKind::Circle(_) | ShapeKind::Segment(_) => {}
        }
    }

    fn scale_changed(&mut self, factor: f32, pose: Pose) {
        match self {
            ShapeKind::Circle(circle) => circle.scale_changed(factor),
            ShapeKind::Segment(segment) => segment.scale_changed(factor),
            ShapeKind::Polygon(polygon) => polygon.scale_changed(factor, pose.position),
            ShapeKind::Square(square) => square.rebuild(pose),
        }
    }

    fn rotation_changed(&mut self, angle: f32, pose: Pose) {
        match self {
            ShapeKind::Polygon(polygon) => polygon.rotation_changed(angle, pose.position),
            ShapeKind::Square(square) => square.rebuild(pose),
            ShapeKind::Circle(_) | ShapeKind::Segment(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    id: ShapeId,
    pose: Pose,
    body: BodyProperties,
    // set by `with_mass`; the inertia then follows the geometry through rescales
    derived_inertia: bool,
    group: Option<u32>,
    collided: bool,
    kind: ShapeKind,
}

impl Shape {
    fn from_kind(kind: ShapeKind, position: Vec2) -> Self {
        Self {
            id: ShapeId::next(),
            pose: Pose { position, ..Pose::default() },
            body: BodyProperties::default(),
            derived_inertia: false,
            group: None,
            collided: false,
            kind,
        }
    }

    pub fn circle(radius: f32, position: Vec2) -> CollisionResult<Self> {
        Ok(Self::from_kind(ShapeKind::Circle(Circle::new(radius)?), position))
    }

    /// Segment anchored at `origin` and pointing at `target`.
    pub fn segment(radius: f32, origin: Vec2, target: Vec2) -> CollisionResult<Self> {
        Ok(Self::from_kind(ShapeKind::Segment(Segment::new(radius, origin, target)?), origin))
    }

    /// Convex polygon from vertices given relative to `position`.
    pub fn polygon(vertices: &[Vec2], position: Vec2) -> CollisionResult<Self> {
        Ok(Self::from_kind(ShapeKind::Polygon(Polygon::new(vertices, position)?), position))
    }

    pub fn square(width: f32, height: f32, position: Vec2) -> CollisionResult<Self> {
        let pose = Pose { position, ..Pose::default() };
        Ok(Self::from_kind(ShapeKind::Square(Square::new(width, height, pose)?), position))
    }

    pub fn with_scale(mut self, scale: f32) -> CollisionResult<Self> {
        self.set_scale(scale)?;
        Ok(self)
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.set_rotation(rotation);
        self
    }

    pub fn with_body(mut self, body: BodyProperties) -> Self {
        self.set_body(body);
        self
    }

    /// Dynamic body whose inertia is derived from the geometry.
    pub fn with_mass(mut self, mass: f32) -> CollisionResult<Self> {
        let inertia = self.moment_for_mass(mass);
        self.body = BodyProperties::new(mass, inertia)?;
        self.derived_inertia = true;
        Ok(self)
    }

    pub fn with_group(mut self, group: u32) -> Self {
        self.group = Some(group);
        self
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn position(&self) -> Vec2 {
        self.pose.position
    }

    pub fn scale(&self) -> f32 {
        self.pose.scale
    }

    pub fn rotation(&self) -> f32 {
        self.pose.rotation
    }

    pub fn body(&self) -> BodyProperties {
        self.body
    }

    pub fn group(&self) -> Option<u32> {
        self.group
    }

    pub fn collided(&self) -> bool {
        self.collided
    }

    pub(crate) fn set_collided(&mut self, collided: bool) {
        self.collided = collided;
    }

    /// Explicit mass properties stay fixed when the shape is rescaled.
    pub fn set_body(&mut self, body: BodyProperties) {
        self.body = body;
        self.derived_inertia = false;
    }

    pub fn set_group(&mut self, group: Option<u32>) {
        self.group = group;
    }

    pub fn set_position(&mut self, position: Vec2) {
        let offset = position - self.pose.position;
        self.pose.position = position;
        self.kind.position_changed(offset, self.pose);
    }

    /// Rejects non-positive or non-finite scales, leaving the shape untouched.
    pub fn set_scale(&mut self, scale: f32) -> CollisionResult<()> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(CollisionError::geometry(format!("shape {} scale must be positive, got {scale}", self.id)));
        }
        let factor = scale / self.pose.scale;
        self.pose.scale = scale;
        self.kind.scale_changed(factor, self.pose);
        if self.derived_inertia && self.body.is_dynamic() {
            self.body.inertia = self.moment_for_mass(self.body.mass);
        }
        Ok(())
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        let angle = rotation - self.pose.rotation;
        self.pose.rotation = rotation;
        self.kind.rotation_changed(angle, self.pose);
    }

    pub fn radius(&self) -> Option<f32> {
        match &self.kind {
            ShapeKind::Circle(circle) => Some(circle.radius()),
            ShapeKind::Segment(segment) => Some(segment.radius()),
            ShapeKind::Polygon(_) | ShapeKind::Square(_) => None,
        }
    }

    /// World-space vertices for polygon-based shapes.
    pub fn vertices(&self) -> Option<&[Vec2]> {
        match &self.kind {
            ShapeKind::Polygon(polygon) => Some(polygon.vertices()),
            ShapeKind::Square(square) => Some(square.vertices()),
            ShapeKind::Circle(_) | ShapeKind::Segment(_) => None,
        }
    }

    /// Segment endpoints in the shape's local frame.
    pub fn endpoints(&self) -> Option<(Vec2, Vec2)> {
        match &self.kind {
            ShapeKind::Segment(segment) => Some((segment.a(), segment.b())),
            _ => None,
        }
    }

    pub(crate) fn local_vertices(&self) -> Option<Vertices> {
        self.vertices().map(|vertices| to_local(vertices, self.pose))
    }

    pub fn moment_for_mass(&self, mass: f32) -> f32 {
        match &self.kind {
            ShapeKind::Circle(circle) => circle.moment(mass),
            ShapeKind::Segment(segment) => segment.moment(mass),
            ShapeKind::Polygon(_) | ShapeKind::Square(_) => {
                let local = self.local_vertices().unwrap_or_default();
                moment_for_polygon(mass, &local)
            }
        }
    }

    /// World-space outline for debug drawing. Circles are approximated with `segments` points.
    pub fn outline(&self, segments: usize) -> Vec<Vec2> {
        let mut out = Vec::new();
        match &self.kind {
            ShapeKind::Circle(circle) => circle.outline(self.pose.position, segments, &mut out),
            ShapeKind::Segment(segment) => {
                let (a, b) = segment.world_endpoints(self.pose.position, self.pose.rotation);
                out.extend([a, b]);
            }
            ShapeKind::Polygon(polygon) => out.extend_from_slice(polygon.vertices()),
            ShapeKind::Square(square) => out.extend_from_slice(square.vertices()),
        }
        out
    }
}
