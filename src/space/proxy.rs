use super::hooks::encode_user_data;
use super::Partition;
use crate::error::{CollisionError, CollisionResult};
use crate::shape::{BodyProperties, Pose, Shape, ShapeKind, Vertices};
use bitflags::bitflags;
use rapier2d::prelude::{
    ActiveCollisionTypes, ActiveHooks, Collider, ColliderBuilder, ColliderHandle, ColliderSet, Isometry,
    MassProperties, Point, Real, RigidBody, RigidBodyBuilder, RigidBodyHandle, RigidBodySet, RigidBodyType,
    SharedShape, Vector,
};

bitflags! {
    /// Fields pushed into a proxy by one `update`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProxyChanges: u8 {
        const POSITION = 1 << 0;
        const ROTATION = 1 << 1;
        const GEOMETRY = 1 << 2;
        const MASS = 1 << 3;
        const GROUP = 1 << 4;
    }
}

/// Geometry in the body frame; what rapier actually stores on the collider.
#[derive(Debug, Clone, PartialEq)]
enum LocalGeometry {
    Ball { radius: f32 },
    Capsule { a: [f32; 2], b: [f32; 2], radius: f32 },
    Convex { vertices: Vertices },
}

impl LocalGeometry {
    fn of(shape: &Shape) -> Self {
        match shape.kind() {
            ShapeKind::Circle(circle) => LocalGeometry::Ball { radius: circle.radius() },
            ShapeKind::Segment(segment) => LocalGeometry::Capsule {
                a: segment.a().to_array(),
                b: segment.b().to_array(),
                radius: segment.radius(),
            },
            ShapeKind::Polygon(_) | ShapeKind::Square(_) => {
                LocalGeometry::Convex { vertices: shape.local_vertices().unwrap_or_default() }
            }
        }
    }

    fn to_shared(&self) -> CollisionResult<SharedShape> {
        match self {
            LocalGeometry::Ball { radius } => Ok(SharedShape::ball(*radius)),
            LocalGeometry::Capsule { a, b, radius } => {
                let a = Point::new(a[0], a[1]);
                let b = Point::new(b[0], b[1]);
                if *radius > 0.0 {
                    Ok(SharedShape::capsule(a, b, *radius))
                } else {
                    Ok(SharedShape::segment(a, b))
                }
            }
            LocalGeometry::Convex { vertices } => {
                let points: Vec<Point<Real>> = vertices.iter().map(|v| Point::new(v.x, v.y)).collect();
                SharedShape::convex_polyline(points)
                    .ok_or_else(|| CollisionError::geometry("rapier rejected the polygon as degenerate"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ProxyState {
    pose: Pose,
    geometry: LocalGeometry,
    body: BodyProperties,
    group: Option<u32>,
}

impl ProxyState {
    fn of(shape: &Shape) -> Self {
        Self { pose: shape.pose(), geometry: LocalGeometry::of(shape), body: shape.body(), group: shape.group() }
    }

    fn diff(&self, next: &ProxyState) -> ProxyChanges {
        let mut changes = ProxyChanges::empty();
        if self.pose.position != next.pose.position {
            changes |= ProxyChanges::POSITION;
        }
        if self.pose.rotation != next.pose.rotation {
            changes |= ProxyChanges::ROTATION;
        }
        if self.geometry != next.geometry {
            changes |= ProxyChanges::GEOMETRY;
        }
        if self.body != next.body {
            changes |= ProxyChanges::MASS;
        }
        if self.group != next.group {
            changes |= ProxyChanges::GROUP;
        }
        changes
    }
}

/// rapier objects mirroring one shape. Static shapes are parentless colliders; active shapes
/// own a rigid body carrying the collider at its origin.
#[derive(Debug, Clone)]
pub(crate) struct Proxy {
    pub collider: ColliderHandle,
    pub body: Option<RigidBodyHandle>,
    synced: ProxyState,
}

pub(crate) struct ProxyParts {
    collider: Collider,
    body: Option<RigidBody>,
    pending: ProxyState,
}

impl ProxyParts {
    pub fn build(shape: &Shape, partition: Partition, physics_enabled: bool) -> CollisionResult<Self> {
        let state = ProxyState::of(shape);
        let iso = isometry(state.pose);
        let builder = ColliderBuilder::new(state.geometry.to_shared()?)
            .density(0.0)
            .active_collision_types(collision_types())
            .active_hooks(ActiveHooks::FILTER_CONTACT_PAIRS)
            .user_data(encode_user_data(shape.id(), state.group));
        let (collider, body) = match partition {
            Partition::Static => (builder.position(iso).build(), None),
            Partition::Active => {
                let mut body = RigidBodyBuilder::new(body_type(&state.body, physics_enabled)).position(iso);
                if let Some(props) = mass_properties(&state.body) {
                    body = body.additional_mass_properties(props);
                }
                (builder.build(), Some(body.build()))
            }
        };
        Ok(Self { collider, body, pending: state })
    }

    /// Moves the built objects into the engine sets; the collider rides on the body when there is one.
    pub fn insert(self, bodies: &mut RigidBodySet, colliders: &mut ColliderSet) -> Proxy {
        let (collider, body) = match self.body {
            Some(body) => {
                let body = bodies.insert(body);
                (colliders.insert_with_parent(self.collider, body, bodies), Some(body))
            }
            None => (colliders.insert(self.collider), None),
        };
        Proxy { collider, body, synced: self.pending }
    }
}

impl Proxy {
    /// Pushes every field that differs from the last synced state. Geometry is rebuilt before
    /// anything is written so an invalid shape leaves the proxy untouched.
    pub fn sync(
        &mut self,
        shape: &Shape,
        collider: &mut Collider,
        body: Option<&mut RigidBody>,
        physics_enabled: bool,
    ) -> CollisionResult<ProxyChanges> {
        let next = ProxyState::of(shape);
        let changes = self.synced.diff(&next);
        if changes.is_empty() {
            return Ok(changes);
        }
        let geometry = if changes.contains(ProxyChanges::GEOMETRY) { Some(next.geometry.to_shared()?) } else { None };

        let moved = changes.intersects(ProxyChanges::POSITION | ProxyChanges::ROTATION);
        match body {
            Some(body) => {
                if moved {
                    body.set_position(isometry(next.pose), true);
                }
                if changes.contains(ProxyChanges::MASS) {
                    apply_body_properties(body, &next.body, physics_enabled);
                }
            }
            None => {
                if moved {
                    collider.set_position(isometry(next.pose));
                }
            }
        }
        if let Some(geometry) = geometry {
            collider.set_shape(geometry);
        }
        if changes.contains(ProxyChanges::GROUP) {
            collider.user_data = encode_user_data(shape.id(), next.group);
            touch(collider);
        }
        self.synced = next;
        Ok(changes)
    }

    pub fn pose(&self) -> Pose {
        self.synced.pose
    }

    pub fn body_properties(&self) -> BodyProperties {
        self.synced.body
    }
}

/// Flags a collider as modified so the narrow phase re-runs the contact filter for its pairs.
pub(crate) fn touch(collider: &mut Collider) {
    let position = *collider.position();
    collider.set_position(position);
}

pub(crate) fn apply_body_properties(body: &mut RigidBody, props: &BodyProperties, physics_enabled: bool) {
    body.set_body_type(body_type(props, physics_enabled), true);
    match mass_properties(props) {
        Some(mass) => body.set_additional_mass_properties(mass, true),
        None => body.set_additional_mass_properties(MassProperties::default(), true),
    }
}

pub(crate) fn body_type(props: &BodyProperties, physics_enabled: bool) -> RigidBodyType {
    if physics_enabled && props.is_dynamic() {
        RigidBodyType::Dynamic
    } else {
        RigidBodyType::KinematicPositionBased
    }
}

pub(crate) fn isometry(pose: Pose) -> Isometry<Real> {
    Isometry::new(Vector::new(pose.position.x, pose.position.y), pose.rotation)
}

fn mass_properties(props: &BodyProperties) -> Option<MassProperties> {
    props.is_dynamic().then(|| MassProperties::new(Point::origin(), props.mass, props.inertia))
}

/// Detection runs between kinematic and fixed proxies too; fixed-fixed pairs stay excluded
/// because static geometry never reports against itself.
fn collision_types() -> ActiveCollisionTypes {
    ActiveCollisionTypes::default()
        | ActiveCollisionTypes::KINEMATIC_KINEMATIC
        | ActiveCollisionTypes::KINEMATIC_FIXED
}
