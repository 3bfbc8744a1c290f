use std::collections::HashSet;

use crate::config::LayoutConfig;

use super::happy_path::HappyPath;
use super::orientation::Orientation;
use super::position::PortalSlots;
use super::sizing::intrinsic_size;
use super::tree::{EdgeRole, Geometry, LayoutTree, NodeIdx, TreeNode};
use super::types::{EdgeClass, EdgeStyle, NodeKind, NodePayload, PortalTarget};

/// An edge that survived portal synthesis, ready for routing.
#[derive(Debug, Clone)]
pub(super) struct PlannedEdge {
    pub(super) from: NodeIdx,
    pub(super) to: NodeIdx,
    pub(super) role: EdgeRole,
    pub(super) class: EdgeClass,
    pub(super) style: EdgeStyle,
    pub(super) label: Option<String>,
}

/// Whether an edge is replaced by a portal. `failure_context` is true when the
/// edge leaves a failure-path node; the edge's own role does not count.
pub(super) fn classify_edge(
    source_primary: f32,
    target_primary: f32,
    failure_context: bool,
    target_on_spine: bool,
    far_threshold: f32,
) -> bool {
    let backward = target_primary < source_primary;
    if failure_context {
        return backward || target_primary - source_primary > far_threshold;
    }
    backward && target_on_spine
}

pub(super) fn far_jump_threshold(orient: Orientation, config: &LayoutConfig) -> f32 {
    let (step_p, _) = orient.split_size(intrinsic_size(NodeKind::Step, config));
    config.portal.far_jump_ranks * (step_p + config.rank_spacing)
}

/// Nodes reachable only through at least one failure edge.
pub(super) fn failure_path_nodes(tree: &LayoutTree) -> HashSet<NodeIdx> {
    let mut success_reachable = HashSet::new();
    let mut stack = tree.roots();
    while let Some(idx) = stack.pop() {
        if success_reachable.insert(idx) {
            stack.extend(tree.success_successors(idx));
        }
    }
    let mut all = HashSet::new();
    let mut stack = tree.roots();
    while let Some(idx) = stack.pop() {
        if all.insert(idx) {
            stack.extend(tree.successors(idx).into_iter().map(|(_, next)| next));
        }
    }
    all.difference(&success_reachable).copied().collect()
}

pub(super) fn synthesize_portals(
    tree: &mut LayoutTree,
    orient: Orientation,
    happy: &HappyPath,
    slots: &PortalSlots,
    config: &LayoutConfig,
) -> Vec<PlannedEdge> {
    let failure_path = failure_path_nodes(tree);
    let threshold = far_jump_threshold(orient, config);

    let mut raw_edges = Vec::new();
    let mut visited = HashSet::new();
    for root in tree.roots() {
        collect_edges(tree, happy, root, &mut visited, &mut raw_edges);
    }

    let (portal_w, portal_h) = intrinsic_size(NodeKind::Portal, config);
    let mut planned = Vec::with_capacity(raw_edges.len());
    let mut portals = 0usize;
    for (from, role, to) in raw_edges {
        let failure_context = failure_path.contains(&from);
        let class = if failure_context || role.is_failure() {
            EdgeClass::Failure
        } else {
            EdgeClass::Success
        };
        let label = tree.edge_label(from, role).map(str::to_string);
        let source_primary = orient.primary(&tree.node(from).geometry);
        let target_primary = orient.primary(&tree.node(to).geometry);

        if !classify_edge(
            source_primary,
            target_primary,
            failure_context,
            happy.contains(to),
            threshold,
        ) {
            let style = match class {
                EdgeClass::Success => EdgeStyle::Solid,
                EdgeClass::Failure => EdgeStyle::Dashed,
            };
            planned.push(PlannedEdge {
                from,
                to,
                role,
                class,
                style,
                label,
            });
            continue;
        }

        let target = tree.node(to);
        let target_center = (
            target.geometry.x + target.geometry.width / 2.0,
            target.geometry.y + target.geometry.height / 2.0,
        );
        let target_label = target.label.clone();
        let id = format!("$portal:{}:{}:{}", tree.node(from).id, target.id, portals);
        let payload = NodePayload::Portal(PortalTarget {
            target_id: target.id.clone(),
            target_label: target_label.clone(),
            target_center,
            class,
        });

        let mut geometry = Geometry {
            width: portal_w,
            height: portal_h,
            ..Default::default()
        };
        let (slot_p, slot_c) = match slots.get(&(from, role)) {
            Some(&slot) => slot,
            None => {
                let src = &tree.node(from).geometry;
                (
                    orient.primary(src) + orient.primary_size(src) + config.rank_spacing,
                    orient.cross_center(src),
                )
            }
        };
        let portal_c = orient.cross_size(&geometry);
        orient.set_position(&mut geometry, slot_p, slot_c - portal_c / 2.0);

        tree.nodes.push(TreeNode {
            id,
            kind: NodeKind::Portal,
            label: format!("Go to {target_label}"),
            payload,
            children: Vec::new(),
            branches: Vec::new(),
            failure_child: None,
            geometry,
        });
        let portal = tree.nodes.len() - 1;
        tracing::debug!(
            from = %tree.node(from).id,
            to = %tree.node(to).id,
            class = class.as_str(),
            "edge replaced by portal"
        );
        portals += 1;
        planned.push(PlannedEdge {
            from,
            to: portal,
            role,
            class,
            style: EdgeStyle::Dotted,
            label,
        });
    }

    fill_retry_targets(tree);
    tracing::debug!(portals, edges = planned.len(), "portals synthesized");
    planned
}

fn collect_edges(
    tree: &LayoutTree,
    happy: &HappyPath,
    root: NodeIdx,
    visited: &mut HashSet<NodeIdx>,
    out: &mut Vec<(NodeIdx, EdgeRole, NodeIdx)>,
) {
    if !visited.insert(root) {
        return;
    }
    // Pre-order walk; each frame remembers how far through its successors it got.
    let mut stack = vec![(root, happy.ordered_successors(tree, root), 0usize)];
    while let Some((idx, successors, cursor)) = stack.last_mut() {
        let Some(&(role, next)) = successors.get(*cursor) else {
            stack.pop();
            continue;
        };
        *cursor += 1;
        out.push((*idx, role, next));
        if visited.insert(next) {
            stack.push((next, happy.ordered_successors(tree, next), 0));
        }
    }
}

fn fill_retry_targets(tree: &mut LayoutTree) {
    for i in 0..tree.nodes.len() {
        let NodePayload::Retry { target_step_id, .. } = &tree.nodes[i].payload else {
            continue;
        };
        let Some(&target) = tree.index.get(target_step_id) else {
            continue;
        };
        let g = tree.nodes[target].geometry;
        let center = (g.x + g.width / 2.0, g.y + g.height / 2.0);
        if let NodePayload::Retry { target_center, .. } = &mut tree.nodes[i].payload {
            *target_center = Some(center);
        }
    }
}
