pub mod bridge;
mod happy_path;
mod merge;
mod orientation;
mod portal;
mod position;
mod routing;
mod sizing;
mod tree;
pub(crate) mod types;
pub use types::*;
use happy_path::*;
use merge::*;
use orientation::*;
use portal::*;
use position::*;
use routing::*;
use sizing::*;
use tree::*;

use std::collections::HashSet;

use crate::config::LayoutConfig;
use crate::ir::{Direction, Workflow};

/// Lays out one workflow. Every input shape produces a layout: unknown
/// targets become placeholder END nodes and cycles become portals.
pub fn compute_layout(workflow: &Workflow, direction: Direction, config: &LayoutConfig) -> Layout {
    let orient = Orientation::new(direction);

    let mut tree = build_tree(workflow);
    tracing::debug!(
        workflow = %workflow.workflow_id,
        nodes = tree.nodes.len(),
        orphans = tree.orphans.len(),
        "tree built"
    );

    let happy = find_happy_path(&tree);
    tracing::debug!(spine = happy.path.len(), "happy path found");

    measure_tree(&mut tree, orient, &happy, config);
    let merges = analyze_merge_points(&tree, orient, &happy, config);
    let slots = position_tree(&mut tree, orient, &happy, &merges, config);
    let planned = synthesize_portals(&mut tree, orient, &happy, &slots, config);
    let edges = route_edges(&tree, orient, &happy, &planned, config);
    let failure_path = failure_path_nodes(&tree);

    finalize(&tree, direction, &happy, &merges, &failure_path, edges, config)
}

fn finalize(
    tree: &LayoutTree,
    direction: Direction,
    happy: &HappyPath,
    merges: &MergePoints,
    failure_path: &HashSet<NodeIdx>,
    mut edges: Vec<EdgeLayout>,
    config: &LayoutConfig,
) -> Layout {
    let mut nodes: Vec<NodeLayout> = tree
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| NodeLayout {
            id: node.id.clone(),
            kind: node.kind,
            label: node.label.clone(),
            payload: node.payload.clone(),
            x: node.geometry.x,
            y: node.geometry.y,
            width: node.geometry.width,
            height: node.geometry.height,
            on_spine: happy.contains(idx),
            on_failure_path: failure_path.contains(&idx),
        })
        .collect();

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for node in &nodes {
        min_x = min_x.min(node.x);
        min_y = min_y.min(node.y);
        max_x = max_x.max(node.x + node.width);
        max_y = max_y.max(node.y + node.height);
    }
    for edge in &edges {
        for (x, y) in edge.points() {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if !min_x.is_finite() {
        min_x = 0.0;
        min_y = 0.0;
        max_x = 0.0;
        max_y = 0.0;
    }

    let dx = config.margin - min_x;
    let dy = config.margin - min_y;
    let shift = |p: &mut (f32, f32)| {
        p.0 += dx;
        p.1 += dy;
    };
    for node in &mut nodes {
        node.x += dx;
        node.y += dy;
        match &mut node.payload {
            NodePayload::Portal(target) => shift(&mut target.target_center),
            NodePayload::Retry {
                target_center: Some(center),
                ..
            } => shift(center),
            _ => {}
        }
    }
    for edge in &mut edges {
        shift(&mut edge.source_point);
        shift(&mut edge.target_point);
        edge.waypoints.iter_mut().for_each(shift);
    }

    Layout {
        direction,
        nodes,
        edges,
        spine: happy
            .path
            .iter()
            .map(|&idx| tree.node(idx).id.clone())
            .collect(),
        merge_points: merges
            .nodes()
            .iter()
            .map(|&idx| tree.node(idx).id.clone())
            .collect(),
        width: max_x - min_x + config.margin * 2.0,
        height: max_y - min_y + config.margin * 2.0,
    }
}
