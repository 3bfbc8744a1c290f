use crate::ir::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Start,
    Step,
    Condition,
    End,
    Retry,
    Portal,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Step => "step",
            Self::Condition => "condition",
            Self::End => "end",
            Self::Retry => "retry",
            Self::Portal => "portal",
        }
    }
}

/// Why an END node exists.
#[derive(Debug, Clone, PartialEq)]
pub enum EndReason {
    Explicit,
    FallThrough,
    Missing { step_id: String },
    Reference { target: String },
    EmptyWorkflow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortalTarget {
    pub target_id: String,
    pub target_label: String,
    pub target_center: (f32, f32),
    pub class: EdgeClass,
}

/// Data the renderer needs to link a node back to its source.
#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    None,
    Step {
        index: usize,
        step_id: String,
        operation: Option<String>,
        description: Option<String>,
    },
    End(EndReason),
    Retry {
        target_step_id: String,
        retry_after: Option<f32>,
        retry_limit: Option<u32>,
        target_center: Option<(f32, f32)>,
    },
    Portal(PortalTarget),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    Top,
    Bottom,
    Left,
    Right,
}

impl Handle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeClass {
    Success,
    Failure,
}

impl EdgeClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeStyle {
    Solid,
    Dashed,
    Dotted,
}

impl EdgeStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Dashed => "dashed",
            Self::Dotted => "dotted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeLayout {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub payload: NodePayload,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub on_spine: bool,
    /// Reachable from START only by taking at least one failure edge.
    pub on_failure_path: bool,
}

impl NodeLayout {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone)]
pub struct EdgeLayout {
    pub id: String,
    pub from: String,
    pub to: String,
    pub source_handle: Handle,
    pub target_handle: Handle,
    pub class: EdgeClass,
    pub label: Option<String>,
    pub source_point: (f32, f32),
    pub target_point: (f32, f32),
    /// Bends between the two attachment points, possibly empty.
    pub waypoints: Vec<(f32, f32)>,
    pub style: EdgeStyle,
}

impl EdgeLayout {
    /// Full polyline including both attachment points.
    pub fn points(&self) -> Vec<(f32, f32)> {
        let mut points = Vec::with_capacity(self.waypoints.len() + 2);
        points.push(self.source_point);
        points.extend(self.waypoints.iter().copied());
        points.push(self.target_point);
        points
    }
}

#[derive(Debug, Clone)]
pub struct Layout {
    pub direction: Direction,
    pub nodes: Vec<NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    /// Node ids of the longest success-only path, root first.
    pub spine: Vec<String>,
    pub merge_points: Vec<String>,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    pub fn node(&self, id: &str) -> Option<&NodeLayout> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &NodeLayout> {
        self.nodes.iter().filter(move |node| node.kind == kind)
    }

    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a EdgeLayout> {
        self.edges.iter().filter(move |edge| edge.from == id)
    }
}
