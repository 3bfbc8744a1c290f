use std::collections::{HashMap, HashSet};

use crate::config::LayoutConfig;

use super::happy_path::HappyPath;
use super::orientation::Orientation;
use super::tree::{EdgeRole, LayoutTree, NodeIdx};

#[derive(Debug, Clone, Default)]
pub(super) struct MergePoints {
    /// Minimum primary coordinate per merge point.
    required: HashMap<NodeIdx, f32>,
    /// Merge points in discovery order.
    order: Vec<NodeIdx>,
}

impl MergePoints {
    pub(super) fn required(&self, idx: NodeIdx) -> Option<f32> {
        self.required.get(&idx).copied()
    }

    pub(super) fn is_merge_point(&self, idx: NodeIdx) -> bool {
        self.required.contains_key(&idx)
    }

    pub(super) fn nodes(&self) -> &[NodeIdx] {
        &self.order
    }
}

/// Primary coordinate at which `target` is proposed when reached from `src`
/// placed at `src_primary`. Success continuations start one rank after the
/// source; a failure child is centered beside it.
pub(super) fn arrival(
    tree: &LayoutTree,
    orient: Orientation,
    config: &LayoutConfig,
    src: NodeIdx,
    role: EdgeRole,
    target: NodeIdx,
    src_primary: f32,
) -> f32 {
    let src_p = orient.primary_size(&tree.node(src).geometry);
    if role.is_failure() {
        let target_p = orient.primary_size(&tree.node(target).geometry);
        src_primary + (src_p - target_p) / 2.0
    } else {
        src_primary + src_p + config.rank_spacing
    }
}

struct Walk {
    on_stack: HashSet<NodeIdx>,
    visited: HashSet<NodeIdx>,
    predecessors: HashMap<NodeIdx, Vec<NodeIdx>>,
    forward_incoming: HashMap<NodeIdx, Vec<(NodeIdx, EdgeRole)>>,
    finish_order: Vec<NodeIdx>,
    discovery: Vec<NodeIdx>,
}

pub(super) fn analyze_merge_points(
    tree: &LayoutTree,
    orient: Orientation,
    happy: &HappyPath,
    config: &LayoutConfig,
) -> MergePoints {
    let mut walk = Walk {
        on_stack: HashSet::new(),
        visited: HashSet::new(),
        predecessors: HashMap::new(),
        forward_incoming: HashMap::new(),
        finish_order: Vec::new(),
        discovery: Vec::new(),
    };
    for root in tree.roots() {
        if !walk.visited.contains(&root) {
            visit(tree, happy, root, &mut walk);
        }
    }

    // Edges that do not close a cycle form a DAG; reverse finish order is a
    // topological order of it.
    let mut estimate: HashMap<NodeIdx, f32> = HashMap::new();
    for &idx in walk.finish_order.iter().rev() {
        let value = walk
            .forward_incoming
            .get(&idx)
            .map(|incoming| {
                incoming
                    .iter()
                    .map(|&(src, role)| {
                        let src_primary = estimate.get(&src).copied().unwrap_or(0.0);
                        arrival(tree, orient, config, src, role, idx, src_primary)
                    })
                    .fold(f32::NEG_INFINITY, f32::max)
            })
            .unwrap_or(0.0);
        estimate.insert(idx, value);
    }

    let mut merges = MergePoints::default();
    for &idx in &walk.discovery {
        let distinct = walk.predecessors.get(&idx).map_or(0, Vec::len);
        if distinct > 1 {
            merges
                .required
                .insert(idx, estimate.get(&idx).copied().unwrap_or(0.0));
            merges.order.push(idx);
        }
    }
    tracing::debug!(merge_points = merges.order.len(), "merge points analyzed");
    merges
}

impl Walk {
    fn enter(&mut self, idx: NodeIdx) {
        self.visited.insert(idx);
        self.on_stack.insert(idx);
        self.discovery.push(idx);
    }
}

/// Depth-first walk from `root` recording predecessors, the edges that do
/// not close a cycle, and finish order.
fn visit(tree: &LayoutTree, happy: &HappyPath, root: NodeIdx, walk: &mut Walk) {
    walk.enter(root);
    let mut stack = vec![(root, happy.ordered_successors(tree, root), 0usize)];
    while let Some((idx, successors, cursor)) = stack.last_mut() {
        let idx = *idx;
        let Some(&(role, next)) = successors.get(*cursor) else {
            walk.on_stack.remove(&idx);
            walk.finish_order.push(idx);
            stack.pop();
            continue;
        };
        *cursor += 1;

        let preds = walk.predecessors.entry(next).or_default();
        if !preds.contains(&idx) {
            preds.push(idx);
        }
        if walk.on_stack.contains(&next) {
            continue;
        }
        walk.forward_incoming
            .entry(next)
            .or_default()
            .push((idx, role));
        if !walk.visited.contains(&next) {
            walk.enter(next);
            stack.push((next, happy.ordered_successors(tree, next), 0));
        }
    }
}
