use std::collections::HashSet;

use crate::config::LayoutConfig;

use super::happy_path::HappyPath;
use super::orientation::{AxisSide, Orientation};
use super::portal::PlannedEdge;
use super::sizing::intrinsic_size;
use super::tree::{EdgeRole, Geometry, LayoutTree, NodeIdx};
use super::types::{EdgeLayout, NodeKind};

// ── Geometry tolerances ─────────────────────────────────────────────
const EPS: f32 = 1e-3;

/// Axis-aligned rectangle in `(primary, cross)` space.
#[derive(Debug, Clone, Copy)]
pub(super) struct Obstacle {
    pub(super) idx: NodeIdx,
    pub(super) x: f32,
    pub(super) y: f32,
    pub(super) width: f32,
    pub(super) height: f32,
}

/// Obstacles sorted by primary start so a route only tests the ones within
/// its primary reach.
struct ObstacleIndex {
    sorted: Vec<Obstacle>,
    max_extent: f32,
}

impl ObstacleIndex {
    fn new(mut obstacles: Vec<Obstacle>) -> Self {
        obstacles.sort_by(|a, b| a.x.total_cmp(&b.x));
        let max_extent = obstacles.iter().map(|o| o.width).fold(0.0, f32::max);
        Self {
            sorted: obstacles,
            max_extent,
        }
    }

    /// Obstacles overlapping `lo..=hi` along the primary axis.
    fn within(&self, lo: f32, hi: f32) -> &[Obstacle] {
        let first = self.sorted.partition_point(|o| o.x + self.max_extent < lo);
        let last = self.sorted.partition_point(|o| o.x <= hi);
        &self.sorted[first..last.max(first)]
    }
}

/// A node rectangle seen through the orientation: `p0..p1` along the flow,
/// `c0..c1` across it.
#[derive(Debug, Clone, Copy)]
struct Span {
    p0: f32,
    p1: f32,
    c0: f32,
    c1: f32,
}

impl Span {
    fn of(orient: Orientation, g: &Geometry) -> Self {
        let p0 = orient.primary(g);
        let c0 = orient.cross(g);
        Self {
            p0,
            p1: p0 + orient.primary_size(g),
            c0,
            c1: c0 + orient.cross_size(g),
        }
    }

    fn mid_p(&self) -> f32 {
        (self.p0 + self.p1) / 2.0
    }

    fn mid_c(&self) -> f32 {
        (self.c0 + self.c1) / 2.0
    }

    fn anchor(&self, side: AxisSide) -> (f32, f32) {
        match side {
            AxisSide::PrimaryStart => (self.p0, self.mid_c()),
            AxisSide::PrimaryEnd => (self.p1, self.mid_c()),
            AxisSide::CrossStart => (self.mid_p(), self.c0),
            AxisSide::CrossEnd => (self.mid_p(), self.c1),
        }
    }
}

/// Picks attachment sides from the relative position of the two nodes.
pub(super) fn choose_sides(
    orient: Orientation,
    source: &Geometry,
    target: &Geometry,
    target_on_spine: bool,
) -> (AxisSide, AxisSide) {
    let src = Span::of(orient, source);
    let tgt = Span::of(orient, target);
    if tgt.p0 >= src.p1 - EPS {
        return (AxisSide::PrimaryEnd, AxisSide::PrimaryStart);
    }
    if tgt.p1 <= src.p0 + EPS && !target_on_spine {
        return (AxisSide::CrossEnd, AxisSide::CrossEnd);
    }
    if tgt.mid_c() >= src.mid_c() {
        (AxisSide::CrossEnd, AxisSide::CrossStart)
    } else {
        (AxisSide::CrossStart, AxisSide::CrossEnd)
    }
}

pub(super) fn route_edges(
    tree: &LayoutTree,
    orient: Orientation,
    happy: &HappyPath,
    planned: &[PlannedEdge],
    config: &LayoutConfig,
) -> Vec<EdgeLayout> {
    let pad = config.routing.obstacle_padding;
    let obstacles: Vec<Obstacle> = tree
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| {
            let span = Span::of(orient, &node.geometry);
            Obstacle {
                idx,
                x: span.p0 - pad,
                y: span.c0 - pad,
                width: span.p1 - span.p0 + pad * 2.0,
                height: span.c1 - span.c0 + pad * 2.0,
            }
        })
        .collect();
    let index = ObstacleIndex::new(obstacles);
    let (primary_step, lane_step) = orient.split_size(intrinsic_size(NodeKind::Step, config));

    let mut seen = HashSet::new();
    let mut edges = Vec::with_capacity(planned.len());
    for edge in planned {
        let source = &tree.node(edge.from).geometry;
        let target = &tree.node(edge.to).geometry;
        let (source_side, target_side) = choose_sides(orient, source, target, happy.contains(edge.to));
        let source_handle = orient.handle(source_side);
        let target_handle = orient.handle(target_side);
        if !seen.insert((edge.from, edge.to, source_handle, target_handle)) {
            continue;
        }

        let src = Span::of(orient, source);
        let tgt = Span::of(orient, target);
        let start = src.anchor(source_side);
        let end = tgt.anchor(target_side);
        let is_branch = matches!(edge.role, EdgeRole::Branch(_))
            && tree.node(edge.from).kind == NodeKind::Condition;
        let path = if is_branch && source_side == AxisSide::PrimaryEnd {
            branch_path(start, end, config.routing.branch_elbow)
        } else {
            let route = RouteRequest {
                start,
                end,
                source_side,
                target_side,
                elbow: config.routing.branch_elbow,
                lane_step,
                primary_step,
                max_lane_shifts: config.routing.max_lane_shifts,
            };
            let (lo, hi) = route.primary_reach();
            let blockers: Vec<Obstacle> = index
                .within(lo, hi)
                .iter()
                .filter(|o| o.idx != edge.from && o.idx != edge.to)
                .copied()
                .collect();
            route.resolve(&blockers)
        };

        let from_id = &tree.node(edge.from).id;
        let to_id = &tree.node(edge.to).id;
        let to_xy = |(p, c): (f32, f32)| orient.point(p, c);
        let path = compress_path(&path);
        let waypoints = if path.len() > 2 {
            path[1..path.len() - 1].iter().copied().map(to_xy).collect()
        } else {
            Vec::new()
        };
        edges.push(EdgeLayout {
            id: format!("e{}:{}->{}", edges.len(), from_id, to_id),
            from: from_id.clone(),
            to: to_id.clone(),
            source_handle,
            target_handle,
            class: edge.class,
            label: edge.label.clone(),
            source_point: to_xy(start),
            target_point: to_xy(end),
            waypoints,
            style: edge.style,
        });
    }
    tracing::debug!(edges = edges.len(), "edges routed");
    edges
}

/// Condition branches get one fixed bend below the condition.
fn branch_path(start: (f32, f32), end: (f32, f32), elbow: f32) -> Vec<(f32, f32)> {
    if (start.1 - end.1).abs() <= EPS {
        return vec![start, end];
    }
    let bend = start.0 + elbow.min((end.0 - start.0).max(0.0) / 2.0);
    vec![start, (bend, start.1), (bend, end.1), end]
}

struct RouteRequest {
    start: (f32, f32),
    end: (f32, f32),
    source_side: AxisSide,
    target_side: AxisSide,
    elbow: f32,
    lane_step: f32,
    /// Lane spacing for detours that travel across the flow.
    primary_step: f32,
    max_lane_shifts: usize,
}

impl RouteRequest {
    fn is_loop(&self) -> bool {
        self.source_side == AxisSide::CrossEnd && self.target_side == AxisSide::CrossEnd
    }

    /// Edges between nodes side by side leave and enter through cross sides;
    /// their detour lane runs across the flow past both nodes.
    fn is_side(&self) -> bool {
        !self.is_loop()
            && matches!(self.source_side, AxisSide::CrossStart | AxisSide::CrossEnd)
    }

    /// Primary range any candidate path of this request can touch.
    fn primary_reach(&self) -> (f32, f32) {
        let lo = self.start.0.min(self.end.0) - self.elbow;
        let mut hi = self.start.0.max(self.end.0) + self.elbow;
        if self.is_side() {
            hi = self.lane(self.max_lane_shifts);
        }
        (lo, hi)
    }

    /// Straight or single-elbow orthogonal path between the anchors.
    fn direct(&self) -> Vec<(f32, f32)> {
        let (start, end) = (self.start, self.end);
        match self.source_side {
            AxisSide::PrimaryEnd | AxisSide::PrimaryStart => {
                if (start.1 - end.1).abs() <= EPS {
                    vec![start, end]
                } else {
                    let mid = (start.0 + end.0) / 2.0;
                    vec![start, (mid, start.1), (mid, end.1), end]
                }
            }
            AxisSide::CrossStart | AxisSide::CrossEnd => {
                if (start.0 - end.0).abs() <= EPS {
                    vec![start, end]
                } else {
                    let mid = (start.1 + end.1) / 2.0;
                    vec![start, (start.0, mid), (end.0, mid), end]
                }
            }
        }
    }

    /// Leaves the source, runs along `lane`, then enters the target. Side
    /// edges use a primary coordinate as their lane, all others a cross one.
    fn detour(&self, lane: f32) -> Vec<(f32, f32)> {
        let stub_start = stub(self.start, self.source_side, self.elbow);
        let stub_end = stub(self.end, self.target_side, self.elbow);
        if self.is_side() {
            return vec![
                self.start,
                stub_start,
                (lane, stub_start.1),
                (lane, stub_end.1),
                stub_end,
                self.end,
            ];
        }
        vec![
            self.start,
            stub_start,
            (stub_start.0, lane),
            (stub_end.0, lane),
            stub_end,
            self.end,
        ]
    }

    fn lane(&self, shift: usize) -> f32 {
        if self.is_side() {
            let base = self.start.0.max(self.end.0) + self.primary_step / 2.0 + self.elbow;
            return base + shift as f32 * self.primary_step;
        }
        let base = self.start.1.max(self.end.1);
        if self.is_loop() {
            base + self.elbow + shift as f32 * self.lane_step
        } else {
            base + shift as f32 * self.lane_step
        }
    }

    fn resolve(&self, obstacles: &[Obstacle]) -> Vec<(f32, f32)> {
        if !self.is_loop() {
            let straight = [self.start, self.end];
            let direct = self.direct();
            if path_obstacle_intersections(&straight, obstacles) == 0
                && path_obstacle_intersections(&direct, obstacles) == 0
            {
                return direct;
            }
        }
        let first = if self.is_loop() || self.is_side() { 0 } else { 1 };
        let mut candidate = self.detour(self.lane(first));
        for shift in first..=self.max_lane_shifts {
            candidate = self.detour(self.lane(shift));
            if path_obstacle_intersections(&candidate, obstacles) == 0 {
                return candidate;
            }
        }
        tracing::debug!(
            shifts = self.max_lane_shifts,
            "lane shift bound reached; keeping last detour"
        );
        candidate
    }
}

fn stub(point: (f32, f32), side: AxisSide, length: f32) -> (f32, f32) {
    match side {
        AxisSide::PrimaryStart => (point.0 - length, point.1),
        AxisSide::PrimaryEnd => (point.0 + length, point.1),
        AxisSide::CrossStart => (point.0, point.1 - length),
        AxisSide::CrossEnd => (point.0, point.1 + length),
    }
}

pub(super) fn path_obstacle_intersections(points: &[(f32, f32)], obstacles: &[Obstacle]) -> usize {
    obstacles
        .iter()
        .filter(|obstacle| {
            points
                .windows(2)
                .any(|seg| segment_intersects_rect(seg[0], seg[1], obstacle))
        })
        .count()
}

pub(super) fn compress_path(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let mut out: Vec<(f32, f32)> = Vec::with_capacity(points.len());
    out.push(points[0]);
    for idx in 1..points.len() - 1 {
        let prev = out[out.len() - 1];
        let curr = points[idx];
        if (curr.0 - prev.0).abs() <= 1e-4 && (curr.1 - prev.1).abs() <= 1e-4 {
            continue;
        }
        let next = points[idx + 1];
        let dx1 = curr.0 - prev.0;
        let dy1 = curr.1 - prev.1;
        let dx2 = next.0 - curr.0;
        let dy2 = next.1 - curr.1;
        if (dx1.abs() <= 1e-4 && dx2.abs() <= 1e-4) || (dy1.abs() <= 1e-4 && dy2.abs() <= 1e-4) {
            continue;
        }
        out.push(curr);
    }
    let last = points[points.len() - 1];
    if (last.0 - out[out.len() - 1].0).abs() > 1e-4 || (last.1 - out[out.len() - 1].1).abs() > 1e-4
    {
        out.push(last);
    }
    out
}

pub(super) fn segment_intersects_rect(a: (f32, f32), b: (f32, f32), rect: &Obstacle) -> bool {
    let (x1, y1) = a;
    let (x2, y2) = b;
    let min_x = x1.min(x2);
    let max_x = x1.max(x2);
    let min_y = y1.min(y2);
    let max_y = y1.max(y2);
    if max_x < rect.x
        || min_x > rect.x + rect.width
        || max_y < rect.y
        || min_y > rect.y + rect.height
    {
        return false;
    }
    let inside = |(x, y): (f32, f32)| {
        x >= rect.x && x <= rect.x + rect.width && y >= rect.y && y <= rect.y + rect.height
    };
    if inside(a) || inside(b) {
        return true;
    }
    let corners = [
        (rect.x, rect.y),
        (rect.x + rect.width, rect.y),
        (rect.x + rect.width, rect.y + rect.height),
        (rect.x, rect.y + rect.height),
    ];
    (0..4).any(|i| segments_intersect(a, b, corners[i], corners[(i + 1) % 4]))
}

pub(super) fn segments_intersect(a: (f32, f32), b: (f32, f32), c: (f32, f32), d: (f32, f32)) -> bool {
    fn orient(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
        (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
    }
    fn on_segment(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> bool {
        let min_x = a.0.min(b.0);
        let max_x = a.0.max(b.0);
        let min_y = a.1.min(b.1);
        let max_y = a.1.max(b.1);
        c.0 >= min_x - 1e-6 && c.0 <= max_x + 1e-6 && c.1 >= min_y - 1e-6 && c.1 <= max_y + 1e-6
    }
    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);
    if (o1 > 0.0 && o2 < 0.0 || o1 < 0.0 && o2 > 0.0)
        && (o3 > 0.0 && o4 < 0.0 || o3 < 0.0 && o4 > 0.0)
    {
        return true;
    }
    (o1.abs() <= 1e-6 && on_segment(a, b, c))
        || (o2.abs() <= 1e-6 && on_segment(a, b, d))
        || (o3.abs() <= 1e-6 && on_segment(c, d, a))
        || (o4.abs() <= 1e-6 && on_segment(c, d, b))
}
