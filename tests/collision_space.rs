use glam::Vec2;
use kestrel_collision::config::CollisionConfig;
use kestrel_collision::{CollisionError, CollisionSpace, Partition, Shape, ShapeId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn detection_space() -> CollisionSpace {
    CollisionSpace::new(&CollisionConfig::default())
}

fn physics_space(gravity: [f32; 2]) -> CollisionSpace {
    CollisionSpace::new(&CollisionConfig { physics_enabled: true, gravity, ..CollisionConfig::default() })
}

fn count_callbacks(space: &mut CollisionSpace) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    space.set_callback(move |_, _, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        true
    });
    count
}

fn circle(radius: f32, x: f32, y: f32) -> Shape {
    Shape::circle(radius, Vec2::new(x, y)).expect("valid circle")
}

fn move_to(space: &mut CollisionSpace, id: ShapeId, position: Vec2) {
    space
        .modify(id, |shape| {
            shape.set_position(position);
            Ok(())
        })
        .expect("shape is registered");
}

#[test]
fn separated_circles_never_report() {
    let mut space = detection_space();
    let calls = count_callbacks(&mut space);
    space.add(circle(5.0, 0.0, 0.0), Partition::Active).expect("add a");
    space.add(circle(2.0, 9.0, 0.0), Partition::Active).expect("add b");
    for _ in 0..5 {
        let report = space.step(1.0 / 60.0).expect("step");
        assert!(report.contacts.is_empty());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn overlapping_circles_report_once_per_step() {
    let mut space = detection_space();
    let calls = count_callbacks(&mut space);
    let a = space.add(circle(5.0, 0.0, 0.0), Partition::Active).expect("add a");
    let b = space.add(circle(2.0, 9.0, 0.0), Partition::Active).expect("add b");
    space.step(1.0 / 60.0).expect("step");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    move_to(&mut space, b, Vec2::new(6.0, 0.0));
    for step in 1..=4 {
        let report = space.step(1.0 / 60.0).expect("step");
        assert_eq!(report.contacts.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), step);
    }
    assert!(space.shape(a).expect("a").collided());
    assert!(space.shape(b).expect("b").collided());
}

#[test]
fn callback_receives_both_shapes() {
    let mut space = detection_space();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    space.set_callback(move |a, b, _| {
        if let Ok(mut pairs) = sink.lock() {
            pairs.push((a.id(), b.id(), a.collided() && b.collided()));
        }
        true
    });
    let a = space.add(circle(5.0, 0.0, 0.0), Partition::Active).expect("add a");
    let b = space.add(circle(2.0, 6.0, 0.0), Partition::Static).expect("add b");
    space.step(0.0).expect("step");
    let pairs = seen.lock().expect("lock").clone();
    assert_eq!(pairs.len(), 1);
    let (first, second, both_flagged) = pairs[0];
    assert!(both_flagged);
    let mut ids = [first, second];
    ids.sort();
    let mut expected = [a, b];
    expected.sort();
    assert_eq!(ids, expected);
}

#[test]
fn detection_steps_do_not_move_shapes() {
    let mut space = CollisionSpace::new(&CollisionConfig { gravity: [0.0, -100.0], ..CollisionConfig::default() });
    let shape = circle(1.0, 3.0, 4.0).with_mass(2.0).expect("mass");
    let id = space.add(shape, Partition::Active).expect("add");
    for _ in 0..10 {
        space.step(1.0).expect("step");
    }
    let (position, rotation) = space.body_pose(id).expect("pose");
    assert!(position.abs_diff_eq(Vec2::new(3.0, 4.0), 1e-5), "detection moved the body to {position}");
    assert_eq!(rotation, 0.0);
}

#[test]
fn moved_static_shape_is_detected_after_update() {
    let mut space = detection_space();
    let calls = count_callbacks(&mut space);
    space.add(circle(1.0, 0.0, 0.0), Partition::Active).expect("add circle");
    let wall = space
        .add(Shape::square(4.0, 4.0, Vec2::new(20.0, 0.0)).expect("square"), Partition::Static)
        .expect("add wall");
    space.step(0.0).expect("step");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let before = space.stats().static_rehashes;
    move_to(&mut space, wall, Vec2::new(2.0, 0.0));
    assert!(space.stats().static_rehashes > before);
    space.step(0.0).expect("step");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn rehash_static_touches_every_static_shape() {
    let mut space = detection_space();
    for x in [0.0, 10.0, 20.0] {
        space.add(circle(1.0, x, 50.0), Partition::Static).expect("add static");
    }
    let before = space.stats().static_rehashes;
    space.rehash_static().expect("rehash");
    assert_eq!(space.stats().static_rehashes - before, 3);
}

#[test]
fn remove_then_add_behaves_like_a_fresh_add() {
    let mut space = detection_space();
    let calls = count_callbacks(&mut space);
    space.add(circle(5.0, 0.0, 0.0), Partition::Active).expect("add a");
    let b = space.add(circle(2.0, 6.0, 0.0), Partition::Active).expect("add b");
    space.step(0.0).expect("step");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let shape = space.remove(b).expect("remove b");
    assert!(!shape.collided());
    assert!(!space.contains(b));
    space.step(0.0).expect("step");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(space.add(shape, Partition::Active).expect("re-add b"), b);
    space.step(0.0).expect("step");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(space.engine_counts(), (2, 2));
}

#[test]
fn duplicate_and_unknown_shapes_are_errors() {
    let mut space = detection_space();
    let shape = circle(1.0, 0.0, 0.0);
    let id = space.add(shape.clone(), Partition::Active).expect("add");
    assert_eq!(space.add(shape.clone(), Partition::Active), Err(CollisionError::DuplicateShape(id)));
    assert_eq!(space.add(shape, Partition::Static), Err(CollisionError::DuplicateShape(id)));

    let stranger = circle(1.0, 0.0, 0.0).id();
    assert_eq!(space.remove(stranger).map(|_| ()), Err(CollisionError::UnknownShape(stranger)));
    assert_eq!(space.update(stranger).map(|_| ()), Err(CollisionError::UnknownShape(stranger)));
    assert_eq!(space.len(), 1);
}

#[test]
fn update_reports_changed_fields() {
    let mut space = detection_space();
    let id = space.add(Shape::square(2.0, 2.0, Vec2::ZERO).expect("square"), Partition::Active).expect("add");
    assert!(space.update(id).expect("update").is_empty());
    let changes = space
        .modify(id, |shape| {
            shape.set_rotation(0.3);
            shape.set_scale(2.0)
        })
        .expect("modify");
    assert!(changes.contains(kestrel_collision::ProxyChanges::ROTATION));
    assert!(changes.contains(kestrel_collision::ProxyChanges::GEOMETRY));
    assert!(!changes.contains(kestrel_collision::ProxyChanges::POSITION));
}

#[test]
fn invalid_scale_leaves_the_proxy_untouched() {
    let mut space = detection_space();
    let id = space.add(circle(2.0, 0.0, 0.0), Partition::Active).expect("add");
    let err = space.modify(id, |shape| shape.set_scale(-1.0)).expect_err("negative scale");
    assert!(matches!(err, CollisionError::InvalidGeometry(_)));
    assert_eq!(space.shape(id).and_then(Shape::radius), Some(2.0));
}

#[test]
fn removal_requested_in_callback_is_applied_after_step() {
    let mut space = detection_space();
    let a = space.add(circle(5.0, 0.0, 0.0), Partition::Active).expect("add a");
    let b = space.add(circle(2.0, 6.0, 0.0), Partition::Active).expect("add b");
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    space.set_callback(move |first, second, pending| {
        seen.fetch_add(1, Ordering::SeqCst);
        let victim = if first.id() == b { first.id() } else { second.id() };
        pending.remove(victim);
        true
    });
    let report = space.step(0.0).expect("step");
    assert_eq!(report.contacts.len(), 1);
    assert_eq!(report.applied, 1);
    assert_eq!(report.removed, vec![b]);
    assert!(space.contains(a));
    assert!(!space.contains(b));

    let report = space.step(0.0).expect("step");
    assert!(report.contacts.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn rejected_deferred_changes_are_reported() {
    let mut space = detection_space();
    space.add(circle(5.0, 0.0, 0.0), Partition::Active).expect("add a");
    space.add(circle(2.0, 6.0, 0.0), Partition::Active).expect("add b");
    let stranger = circle(1.0, 0.0, 0.0).id();
    let spawned = circle(1.0, 100.0, 100.0);
    let spawned_id = spawned.id();
    let mut once = Some(spawned);
    space.set_callback(move |_, _, pending| {
        pending.remove(stranger);
        if let Some(shape) = once.take() {
            pending.add(shape, Partition::Active);
        }
        true
    });
    let report = space.step(0.0).expect("step");
    assert_eq!(report.rejected, vec![CollisionError::UnknownShape(stranger)]);
    assert_eq!(report.added, vec![spawned_id]);
    assert!(space.contains(spawned_id));
}

#[test]
fn refusing_a_pair_keeps_notifications_coming() {
    let mut space = detection_space();
    let a = space.add(circle(5.0, 0.0, 0.0), Partition::Active).expect("add a");
    let b = space.add(circle(2.0, 6.0, 0.0), Partition::Active).expect("add b");
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    space.set_callback(move |_, _, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        false
    });
    for _ in 0..3 {
        space.step(0.0).expect("step");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(space.is_response_suppressed(a, b));
    space.remove(b).expect("remove");
    assert!(!space.is_response_suppressed(a, b));
}

#[test]
fn shapes_in_the_same_group_never_collide() {
    let mut space = detection_space();
    let calls = count_callbacks(&mut space);
    space.add(circle(5.0, 0.0, 0.0).with_group(3), Partition::Active).expect("add a");
    let b = space.add(circle(2.0, 6.0, 0.0).with_group(3), Partition::Active).expect("add b");
    space.step(0.0).expect("step");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    space
        .modify(b, |shape| {
            shape.set_group(Some(4));
            Ok(())
        })
        .expect("regroup");
    space.step(0.0).expect("step");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn segment_query_finds_the_first_shape() {
    let mut space = detection_space();
    let shooter = space.add(circle(5.0, 0.0, 0.0), Partition::Active).expect("add shooter");
    let wall = space
        .add(Shape::square(10.0, 10.0, Vec2::new(50.0, 0.0)).expect("square"), Partition::Static)
        .expect("add wall");

    let (hit, distance) = space
        .query_segment(Vec2::ZERO, Vec2::new(100.0, 0.0), Some(shooter))
        .expect("query")
        .expect("wall is in range");
    assert_eq!(hit, wall);
    assert!((distance - 45.0).abs() < 1e-3, "unexpected distance {distance}");

    let (hit, _) = space.query_segment(Vec2::ZERO, Vec2::new(100.0, 0.0), None).expect("query").expect("hit");
    assert_eq!(hit, shooter);

    assert!(space.query_segment(Vec2::ZERO, Vec2::new(0.0, 100.0), Some(shooter)).expect("query").is_none());
    assert!(space.query_segment(Vec2::ZERO, Vec2::new(30.0, 0.0), Some(shooter)).expect("query").is_none());
}

#[test]
fn physics_mode_integrates_dynamic_bodies() {
    let mut space = physics_space([0.0, -9.81]);
    let id = space.add(circle(1.0, 0.0, 10.0).with_mass(1.0).expect("mass"), Partition::Active).expect("add");
    let still = space.add(circle(1.0, 20.0, 10.0), Partition::Active).expect("add immovable");
    for _ in 0..30 {
        space.step(1.0 / 60.0).expect("step");
    }
    let (falling, _) = space.body_pose(id).expect("pose");
    assert!(falling.y < 10.0, "dynamic body did not fall: {falling}");
    let (fixed, _) = space.body_pose(still).expect("pose");
    assert!(fixed.abs_diff_eq(Vec2::new(20.0, 10.0), 1e-5));
    assert_eq!(space.shape(id).map(Shape::position), Some(Vec2::new(0.0, 10.0)));
}

#[test]
fn toggling_physics_freezes_bodies() {
    let mut space = physics_space([0.0, -9.81]);
    let id = space.add(circle(1.0, 0.0, 0.0).with_mass(1.0).expect("mass"), Partition::Active).expect("add");
    space.set_physics_enabled(false);
    assert!(!space.physics_enabled());
    for _ in 0..10 {
        space.step(1.0 / 60.0).expect("step");
    }
    let (position, _) = space.body_pose(id).expect("pose");
    assert!(position.abs_diff_eq(Vec2::ZERO, 1e-5));
}

#[test]
fn refused_pair_gets_no_response_in_the_reporting_step() {
    let mut space = physics_space([0.0, 0.0]);
    let a = space.add(circle(5.0, 0.0, 0.0).with_mass(1.0).expect("mass"), Partition::Active).expect("add a");
    let b = space.add(circle(2.0, 6.0, 0.0).with_mass(1.0).expect("mass"), Partition::Active).expect("add b");
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    space.set_callback(move |_, _, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        false
    });
    for _ in 0..3 {
        let report = space.step(1.0 / 60.0).expect("step");
        assert_eq!(report.contacts, vec![(a.min(b), a.max(b))]);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let (pa, _) = space.body_pose(a).expect("pose a");
    let (pb, _) = space.body_pose(b).expect("pose b");
    assert!(pa.abs_diff_eq(Vec2::ZERO, 1e-4), "a was pushed to {pa}");
    assert!(pb.abs_diff_eq(Vec2::new(6.0, 0.0), 1e-4), "b was pushed to {pb}");
}

#[test]
fn accepted_pair_is_resolved_in_the_reporting_step() {
    let mut space = physics_space([0.0, 0.0]);
    let a = space.add(circle(5.0, 0.0, 0.0).with_mass(1.0).expect("mass"), Partition::Active).expect("add a");
    let b = space.add(circle(2.0, 6.0, 0.0).with_mass(1.0).expect("mass"), Partition::Active).expect("add b");
    let calls = count_callbacks(&mut space);
    space.step(1.0 / 60.0).expect("step");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let (pa, _) = space.body_pose(a).expect("pose a");
    let (pb, _) = space.body_pose(b).expect("pose b");
    assert!(pa.distance(pb) > 6.0, "bodies stayed at {pa} and {pb}");
}

#[test]
fn replacement_requested_in_callback_moves_the_proxy() {
    let mut space = detection_space();
    space.add(circle(5.0, 0.0, 0.0), Partition::Active).expect("add a");
    let b = space.add(circle(2.0, 6.0, 0.0), Partition::Active).expect("add b");
    let target = Vec2::new(40.0, 0.0);
    let mut once = true;
    space.set_callback(move |first, second, pending| {
        let shape = if first.id() == b { first } else { second };
        if once {
            once = false;
            let mut moved = shape.clone();
            moved.set_position(target);
            pending.replace(moved);
        }
        true
    });
    let report = space.step(0.0).expect("step");
    assert_eq!(report.applied, 1);
    assert!(report.rejected.is_empty());
    assert_eq!(space.synced_pose(b).map(|pose| pose.position), Some(target));
    assert_eq!(space.shape(b).map(Shape::position), Some(target));
    assert!(space.shape(b).is_some_and(Shape::collided));

    let report = space.step(0.0).expect("step");
    assert!(report.contacts.is_empty());
    let (position, _) = space.body_pose(b).expect("pose");
    assert!(position.abs_diff_eq(target, 1e-5), "body still at {position}");
    assert!(!space.shape(b).is_some_and(Shape::collided));
}
