use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::RangeInclusive;

use crate::config::LayoutConfig;

use super::happy_path::HappyPath;
use super::merge::{MergePoints, arrival};
use super::orientation::Orientation;
use super::sizing::intrinsic_size;
use super::tree::{EdgeRole, LayoutTree, NodeIdx};
use super::types::NodeKind;

/// Cross coordinate every spine node is centered on.
const SPINE_CROSS: f32 = 0.0;

/// Portal-sized slot reserved for an edge: `(primary start, cross center)`.
pub(super) type PortalSlots = HashMap<(NodeIdx, EdgeRole), (f32, f32)>;

/// Placed rectangle in `(primary, cross)` space.
#[derive(Debug, Clone, Copy)]
struct Footprint {
    p0: f32,
    p1: f32,
    c0: f32,
    c1: f32,
}

/// Rectangles already claimed by nodes and portal slots, bucketed by primary
/// coordinate so lookups only scan nearby ranks.
struct Occupancy {
    bucket: f32,
    buckets: BTreeMap<i64, Vec<Footprint>>,
}

impl Occupancy {
    fn new(bucket: f32) -> Self {
        Self {
            bucket: bucket.max(1.0),
            buckets: BTreeMap::new(),
        }
    }

    fn keys(&self, p0: f32, p1: f32) -> RangeInclusive<i64> {
        (p0 / self.bucket).floor() as i64..=(p1 / self.bucket).floor() as i64
    }

    fn insert(&mut self, footprint: Footprint) {
        for key in self.keys(footprint.p0, footprint.p1) {
            self.buckets.entry(key).or_default().push(footprint);
        }
    }

    /// Smallest cross start at or after `c0` where a box spanning `p0..p1`
    /// and `size` along the cross axis keeps `gap` from every claimed box.
    fn free_cross(&self, p0: f32, p1: f32, c0: f32, size: f32, gap: f32) -> f32 {
        let mut c0 = c0;
        loop {
            let blocker = self
                .buckets
                .range(self.keys(p0, p1))
                .flat_map(|(_, claimed)| claimed)
                .filter(|r| r.p0 < p1 && p0 < r.p1 && r.c0 - gap < c0 + size && c0 < r.c1 + gap)
                .map(|r| r.c1)
                .reduce(f32::max);
            match blocker {
                Some(c1) => c0 = c1 + gap,
                None => return c0,
            }
        }
    }
}

/// A positioned node whose successors are still being placed.
struct Frame {
    idx: NodeIdx,
    primary: f32,
    center: f32,
    own_p: f32,
    own_c: f32,
    successors: Vec<(EdgeRole, NodeIdx)>,
    next: usize,
    /// Cross coordinate where the next row sibling may start.
    cursor: f32,
}

struct Placer<'a> {
    orient: Orientation,
    config: &'a LayoutConfig,
    happy: &'a HappyPath,
    merges: &'a MergePoints,
    positioned: HashSet<NodeIdx>,
    occupancy: Occupancy,
    slots: PortalSlots,
    portal: (f32, f32),
}

pub(super) fn position_tree(
    tree: &mut LayoutTree,
    orient: Orientation,
    happy: &HappyPath,
    merges: &MergePoints,
    config: &LayoutConfig,
) -> PortalSlots {
    let (step_p, _) = orient.split_size(intrinsic_size(NodeKind::Step, config));
    let mut placer = Placer {
        orient,
        config,
        happy,
        merges,
        positioned: HashSet::new(),
        occupancy: Occupancy::new(step_p + config.rank_spacing),
        slots: HashMap::new(),
        portal: orient.split_size(intrinsic_size(NodeKind::Portal, config)),
    };
    let root = tree.root;
    placer.place(tree, root, 0.0, SPINE_CROSS);

    for orphan in tree.orphans.clone() {
        if placer.positioned.contains(&orphan) {
            continue;
        }
        let far_edge = placer.cross_extent(tree);
        let own_c = orient.cross_size(&tree.node(orphan).geometry);
        placer.place(tree, orphan, 0.0, far_edge + config.node_spacing + own_c / 2.0);
    }
    placer.slots
}

impl Placer<'_> {
    /// Positions `root` with its leading primary edge at `primary` and its
    /// cross center at `center`, then everything first reached below it in
    /// depth-first order. Only the first placement of a node has an effect.
    fn place(&mut self, tree: &mut LayoutTree, root: NodeIdx, primary: f32, center: f32) {
        let Some(frame) = self.position(tree, root, primary, center) else {
            return;
        };
        let mut stack = vec![frame];
        while let Some(frame) = stack.last_mut() {
            let Some(&(role, next)) = frame.successors.get(frame.next) else {
                stack.pop();
                continue;
            };
            frame.next += 1;
            if let Some(child) = self.follow(tree, frame, role, next) {
                stack.push(child);
            }
        }
    }

    /// Fixes the geometry of a single node. Spine nodes keep the spine's
    /// cross coordinate; anything else slides along the cross axis until it
    /// clears what is already placed.
    fn position(
        &mut self,
        tree: &mut LayoutTree,
        idx: NodeIdx,
        primary: f32,
        center: f32,
    ) -> Option<Frame> {
        if !self.positioned.insert(idx) {
            return None;
        }
        let orient = self.orient;
        let primary = match self.merges.required(idx) {
            Some(required) => primary.max(required),
            None => primary,
        };
        let geometry = tree.node(idx).geometry;
        let own_p = orient.primary_size(&geometry);
        let own_c = orient.cross_size(&geometry);
        let start = if self.happy.contains(idx) {
            SPINE_CROSS - own_c / 2.0
        } else {
            self.occupancy.free_cross(
                primary,
                primary + own_p,
                center - own_c / 2.0,
                own_c,
                self.config.node_spacing,
            )
        };
        orient.set_position(&mut tree.nodes[idx].geometry, primary, start);
        self.occupancy.insert(Footprint {
            p0: primary,
            p1: primary + own_p,
            c0: start,
            c1: start + own_c,
        });

        Some(Frame {
            idx,
            primary,
            center: start + own_c / 2.0,
            own_p,
            own_c,
            successors: self.happy.ordered_successors(tree, idx),
            next: 0,
            cursor: start,
        })
    }

    /// Claims a portal-sized slot with its primary start at `primary`, at or
    /// after cross coordinate `c0`. Returns the slot's cross start.
    fn reserve(&mut self, primary: f32, c0: f32) -> f32 {
        let (portal_p, portal_c) = self.portal;
        let gap = self.config.node_spacing;
        let start = self
            .occupancy
            .free_cross(primary, primary + portal_p, c0, portal_c, gap);
        self.occupancy.insert(Footprint {
            p0: primary,
            p1: primary + portal_p,
            c0: start,
            c1: start + portal_c,
        });
        start
    }

    /// Handles one outgoing edge of `frame`: records the edge's portal slot
    /// and positions the target if this is the first edge to reach it.
    fn follow(
        &mut self,
        tree: &mut LayoutTree,
        frame: &mut Frame,
        role: EdgeRole,
        next: NodeIdx,
    ) -> Option<Frame> {
        let orient = self.orient;
        let (portal_p, portal_c) = self.portal;
        let gap = self.config.node_spacing;
        let next_c = orient.cross_size(&tree.node(next).geometry);

        if role.is_failure() {
            let beside = frame.center + frame.own_c / 2.0 + gap;
            let slot_p = frame.primary + (frame.own_p - portal_p) / 2.0;
            if self.positioned.contains(&next) {
                let slot_c = self.reserve(slot_p, beside);
                self.slots
                    .insert((frame.idx, role), (slot_p, slot_c + portal_c / 2.0));
                return None;
            }
            let proposed = arrival(tree, orient, self.config, frame.idx, role, next, frame.primary);
            let child = self.position(tree, next, proposed, beside + next_c / 2.0)?;
            let slot_c = if child.primary > proposed {
                self.reserve(slot_p, beside) + portal_c / 2.0
            } else {
                beside + portal_c / 2.0
            };
            self.slots.insert((frame.idx, role), (slot_p, slot_c));
            return Some(child);
        }

        let next_primary = frame.primary + frame.own_p + self.config.rank_spacing;
        if self.positioned.contains(&next) {
            let slot_c = self.reserve(next_primary, frame.cursor);
            self.slots
                .insert((frame.idx, role), (next_primary, slot_c + portal_c / 2.0));
            frame.cursor = slot_c + portal_c + gap;
            return None;
        }

        let child = self.position(tree, next, next_primary, frame.cursor + next_c / 2.0)?;
        let placed = tree.node(next).geometry;
        let mut far = orient.cross(&placed) + orient.subtree_cross(&placed);
        let slot_c = if child.primary > next_primary && !self.happy.contains(next) {
            // Raised past its natural rank; keep the rank free for a portal.
            let start = self.reserve(next_primary, frame.cursor);
            far = far.max(start + portal_c);
            start + portal_c / 2.0
        } else {
            frame.cursor + portal_c / 2.0
        };
        self.slots.insert((frame.idx, role), (next_primary, slot_c));
        frame.cursor = frame.cursor.max(far) + gap;
        Some(child)
    }

    fn cross_extent(&self, tree: &LayoutTree) -> f32 {
        self.positioned
            .iter()
            .map(|&idx| {
                let g = &tree.node(idx).geometry;
                self.orient.cross(g) + self.orient.cross_size(g)
            })
            .fold(SPINE_CROSS, f32::max)
    }
}
