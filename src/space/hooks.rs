use crate::shape::ShapeId;
use rapier2d::prelude::{PairFilterContext, PhysicsHooks, SolverFlags};
use std::collections::HashSet;

const GROUP_SHIFT: u32 = 64;

/// Packs the shape id and collision group into a collider's `user_data` so the contact filter
/// can run without touching the space's maps.
pub(crate) fn encode_user_data(id: ShapeId, group: Option<u32>) -> u128 {
    let group_bits = group.map_or(0u128, |group| u128::from(group) + 1);
    (group_bits << GROUP_SHIFT) | u128::from(id.raw())
}

pub(crate) fn decode_group(user_data: u128) -> Option<u32> {
    let bits = (user_data >> GROUP_SHIFT) as u64;
    if bits == 0 {
        None
    } else {
        Some((bits - 1) as u32)
    }
}

fn decode_raw_id(user_data: u128) -> u64 {
    user_data as u64
}

pub(crate) fn ordered(a: ShapeId, b: ShapeId) -> (ShapeId, ShapeId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Contact filter installed on every proxy collider.
///
/// Shapes sharing a group never produce contacts. Pairs whose callback asked to stop the
/// simulation keep producing contacts (and therefore notifications) but no solver response.
#[derive(Default)]
pub(crate) struct ContactFilter {
    suppressed: HashSet<(u64, u64)>,
}

impl ContactFilter {
    /// Returns whether the pair's state changed.
    pub fn set_suppressed(&mut self, a: ShapeId, b: ShapeId, suppressed: bool) -> bool {
        let (a, b) = ordered(a, b);
        let key = (a.raw(), b.raw());
        if suppressed {
            self.suppressed.insert(key)
        } else {
            self.suppressed.remove(&key)
        }
    }

    pub fn is_suppressed(&self, a: ShapeId, b: ShapeId) -> bool {
        let (a, b) = ordered(a, b);
        self.suppressed.contains(&(a.raw(), b.raw()))
    }

    pub fn forget(&mut self, id: ShapeId) {
        let raw = id.raw();
        self.suppressed.retain(|(a, b)| *a != raw && *b != raw);
    }
}

impl PhysicsHooks for ContactFilter {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        let data1 = context.colliders.get(context.collider1).map(|c| c.user_data)?;
        let data2 = context.colliders.get(context.collider2).map(|c| c.user_data)?;
        if let (Some(group1), Some(group2)) = (decode_group(data1), decode_group(data2)) {
            if group1 == group2 {
                return None;
            }
        }
        let (a, b) = (decode_raw_id(data1), decode_raw_id(data2));
        let key = if a <= b { (a, b) } else { (b, a) };
        if self.suppressed.contains(&key) {
            Some(SolverFlags::empty())
        } else {
            Some(SolverFlags::COMPUTE_IMPULSES)
        }
    }
}

/// Detection-pass view of a [`ContactFilter`]: groups still filter pairs, but every surviving
/// pair is computed without a solver response.
pub(crate) struct DetectionOnly<'a>(pub &'a ContactFilter);

impl PhysicsHooks for DetectionOnly<'_> {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        self.0.filter_contact_pair(context).map(|_| SolverFlags::empty())
    }
}
