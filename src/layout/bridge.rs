//! Render-time crossing treatment: where a horizontal edge segment crosses a
//! vertical segment of another edge, the horizontal one hops over it with a
//! small semicircle.

use crate::config::BridgeConfig;

pub type Point = (f32, f32);
pub type Segment = (Point, Point);

const EPS: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BridgeArc {
    pub start: Point,
    pub end: Point,
    pub radius: f32,
    /// SVG sweep flag; chosen so the arc always bulges upward.
    pub sweep: bool,
}

pub fn edge_segments(points: &[Point]) -> Vec<Segment> {
    points.windows(2).map(|pair| (pair[0], pair[1])).collect()
}

/// Crossing points of a horizontal `segment` with vertical segments in
/// `others`, ordered along the direction of travel. Crossings within
/// `clearance` of either endpoint are dropped. Non-horizontal segments have
/// no crossings.
pub fn segment_crossings(segment: Segment, others: &[Segment], clearance: f32) -> Vec<Point> {
    let ((x1, y1), (x2, y2)) = segment;
    if (y1 - y2).abs() > EPS || (x1 - x2).abs() <= EPS {
        return Vec::new();
    }
    let (min_x, max_x) = (x1.min(x2), x1.max(x2));

    let mut crossings: Vec<Point> = others
        .iter()
        .filter_map(|&((ox1, oy1), (ox2, oy2))| {
            if (ox1 - ox2).abs() > EPS {
                return None;
            }
            let (min_y, max_y) = (oy1.min(oy2), oy1.max(oy2));
            if !(y1 > min_y + EPS && y1 < max_y - EPS) {
                return None;
            }
            if !(ox1 > min_x && ox1 < max_x) {
                return None;
            }
            if (ox1 - x1).abs() < clearance || (ox1 - x2).abs() < clearance {
                return None;
            }
            Some((ox1, y1))
        })
        .collect();
    crossings.sort_by(|a, b| (a.0 - x1).abs().total_cmp(&(b.0 - x1).abs()));
    crossings.dedup_by(|a, b| (a.0 - b.0).abs() <= EPS);
    crossings
}

/// One arc per crossing. A crossing closer than one arc diameter to the
/// previous arc is skipped so arcs never overlap.
pub fn bridge_arcs(segment: Segment, crossings: &[Point], radius: f32) -> Vec<BridgeArc> {
    let ((x1, y), (x2, _)) = segment;
    let dir = if x2 >= x1 { 1.0 } else { -1.0 };
    let mut arcs = Vec::with_capacity(crossings.len());
    let mut last: Option<f32> = None;
    for &(x, _) in crossings {
        if let Some(prev) = last
            && (x - prev).abs() < radius * 2.0
        {
            continue;
        }
        arcs.push(BridgeArc {
            start: (x - dir * radius, y),
            end: (x + dir * radius, y),
            radius,
            sweep: dir > 0.0,
        });
        last = Some(x);
    }
    arcs
}

/// SVG path data for a polyline with bridge arcs over the crossed segments.
pub fn bridged_path_data(points: &[Point], others: &[Segment], config: &BridgeConfig) -> String {
    let Some(&(x0, y0)) = points.first() else {
        return String::new();
    };
    let mut d = format!("M {x0:.2} {y0:.2}");
    for segment in edge_segments(points) {
        let crossings = segment_crossings(segment, others, config.endpoint_clearance);
        for arc in bridge_arcs(segment, &crossings, config.radius) {
            d.push_str(&format!(
                " L {:.2} {:.2} A {r:.2} {r:.2} 0 0 {} {:.2} {:.2}",
                arc.start.0,
                arc.start.1,
                u8::from(arc.sweep),
                arc.end.0,
                arc.end.1,
                r = arc.radius,
            ));
        }
        let (x, y) = segment.1;
        d.push_str(&format!(" L {x:.2} {y:.2}"));
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical(x: f32, y0: f32, y1: f32) -> Segment {
        ((x, y0), (x, y1))
    }

    #[test]
    fn finds_crossings_in_travel_order() {
        let others = [vertical(70.0, 0.0, 100.0), vertical(30.0, 0.0, 100.0)];
        let right = ((0.0, 50.0), (100.0, 50.0));
        assert_eq!(
            segment_crossings(right, &others, 8.0),
            vec![(30.0, 50.0), (70.0, 50.0)]
        );
        let left = ((100.0, 50.0), (0.0, 50.0));
        assert_eq!(
            segment_crossings(left, &others, 8.0),
            vec![(70.0, 50.0), (30.0, 50.0)]
        );
    }

    #[test]
    fn ignores_touching_and_near_endpoint_crossings() {
        let segment = ((0.0, 50.0), (100.0, 50.0));
        let others = [
            vertical(5.0, 0.0, 100.0),   // too close to the start
            vertical(50.0, 50.0, 100.0), // ends on the segment
            vertical(60.0, 60.0, 100.0), // misses
            ((40.0, 0.0), (45.0, 100.0)), // not vertical
        ];
        assert!(segment_crossings(segment, &others, 8.0).is_empty());
    }

    #[test]
    fn vertical_segments_never_bridge() {
        let segment = vertical(50.0, 0.0, 100.0);
        let others = [((0.0, 50.0), (100.0, 50.0))];
        assert!(segment_crossings(segment, &others, 0.0).is_empty());
    }

    #[test]
    fn arcs_follow_direction_and_skip_crowded_crossings() {
        let segment = ((100.0, 10.0), (0.0, 10.0));
        let arcs = bridge_arcs(segment, &[(60.0, 10.0), (55.0, 10.0), (30.0, 10.0)], 5.0);
        assert_eq!(arcs.len(), 2);
        assert_eq!(arcs[0].start, (65.0, 10.0));
        assert_eq!(arcs[0].end, (55.0, 10.0));
        assert!(!arcs[0].sweep);
        assert_eq!(arcs[1].start, (35.0, 10.0));
    }

    #[test]
    fn path_data_includes_arc_commands() {
        let config = BridgeConfig::default();
        let points = [(0.0, 50.0), (100.0, 50.0), (100.0, 120.0)];
        let d = bridged_path_data(&points, &[vertical(50.0, 0.0, 100.0)], &config);
        assert_eq!(
            d,
            "M 0.00 50.00 L 45.00 50.00 A 5.00 5.00 0 0 1 55.00 50.00 L 100.00 50.00 L 100.00 120.00"
        );
        assert_eq!(bridged_path_data(&[], &[], &config), "");
    }
}
