use std::collections::HashSet;

use crate::config::LayoutConfig;

use super::happy_path::HappyPath;
use super::orientation::Orientation;
use super::tree::{EdgeRole, LayoutTree, NodeIdx};
use super::types::NodeKind;

/// Intrinsic `(width, height)` of a node, fixed per kind.
pub(super) fn intrinsic_size(kind: NodeKind, config: &LayoutConfig) -> (f32, f32) {
    let sizes = &config.sizes;
    match kind {
        NodeKind::Start | NodeKind::End => (sizes.terminal_diameter, sizes.terminal_diameter),
        NodeKind::Retry => (sizes.retry_diameter, sizes.retry_diameter),
        NodeKind::Condition => (sizes.condition_size, sizes.condition_size),
        NodeKind::Step => (sizes.step_width, sizes.step_height),
        NodeKind::Portal => (sizes.portal_width, sizes.portal_height),
    }
}

pub(super) fn measure_tree(
    tree: &mut LayoutTree,
    orient: Orientation,
    happy: &HappyPath,
    config: &LayoutConfig,
) {
    for node in &mut tree.nodes {
        let (width, height) = intrinsic_size(node.kind, config);
        node.geometry.width = width;
        node.geometry.height = height;
    }
    let mut visited = HashSet::new();
    for root in tree.roots() {
        if visited.insert(root) {
            measure_subtree(tree, root, orient, happy, config, &mut visited);
        }
    }
}

/// Footprint accumulated for one node while its successors are measured.
struct Pending {
    idx: NodeIdx,
    /// Role of the edge this node was first reached through.
    via: Option<EdgeRole>,
    successors: Vec<(EdgeRole, NodeIdx)>,
    next: usize,
    row_p: f32,
    row_c: f32,
    row_count: usize,
    failure_c: Option<f32>,
}

impl Pending {
    fn new(tree: &LayoutTree, happy: &HappyPath, idx: NodeIdx, via: Option<EdgeRole>) -> Self {
        Self {
            idx,
            via,
            successors: happy.ordered_successors(tree, idx),
            next: 0,
            row_p: 0.0,
            row_c: 0.0,
            row_count: 0,
            failure_c: None,
        }
    }

    fn absorb(&mut self, role: EdgeRole, (sub_p, sub_c): (f32, f32)) {
        match role {
            EdgeRole::Failure => self.failure_c = Some(sub_c),
            EdgeRole::Child(_) | EdgeRole::Branch(_) => {
                self.row_p = self.row_p.max(sub_p);
                self.row_c += sub_c;
                self.row_count += 1;
            }
        }
    }

    fn footprint(&self, own_p: f32, own_c: f32, config: &LayoutConfig) -> (f32, f32) {
        let mut row_c = self.row_c;
        if self.row_count > 1 {
            row_c += config.node_spacing * (self.row_count - 1) as f32;
        }
        let mut subtree_p = own_p;
        if self.row_count > 0 {
            subtree_p += config.rank_spacing + self.row_p;
        }
        let beside = match self.failure_c {
            Some(fail_c) => own_c + config.node_spacing + fail_c,
            None => own_c,
        };
        (subtree_p, beside.max(row_c))
    }
}

/// Post-order pass storing the `(primary, cross)` footprint of every subtree
/// below `root`. A successor reached a second time only costs a portal slot.
fn measure_subtree(
    tree: &mut LayoutTree,
    root: NodeIdx,
    orient: Orientation,
    happy: &HappyPath,
    config: &LayoutConfig,
    visited: &mut HashSet<NodeIdx>,
) {
    let portal = orient.split_size(intrinsic_size(NodeKind::Portal, config));
    let mut stack = vec![Pending::new(tree, happy, root, None)];

    while let Some(pending) = stack.last_mut() {
        if let Some(&(role, next)) = pending.successors.get(pending.next) {
            pending.next += 1;
            if visited.insert(next) {
                let child = Pending::new(tree, happy, next, Some(role));
                stack.push(child);
            } else {
                pending.absorb(role, portal);
            }
            continue;
        }

        let Some(done) = stack.pop() else { break };
        let geometry = &mut tree.nodes[done.idx].geometry;
        let own_p = orient.primary_size(geometry);
        let own_c = orient.cross_size(geometry);
        let (subtree_p, subtree_c) = done.footprint(own_p, own_c, config);
        orient.set_subtree(geometry, subtree_p, subtree_c);
        if let (Some(parent), Some(role)) = (stack.last_mut(), done.via) {
            parent.absorb(role, (subtree_p, subtree_c));
        }
    }
}
