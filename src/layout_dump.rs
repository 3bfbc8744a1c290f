use crate::layout::{EdgeLayout, EndReason, Layout, NodeLayout, NodePayload};
use serde::Serialize;
use serde_json::{Value, json};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Serialized form of a finished layout, in the shape consumed by renderers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub direction: String,
    pub width: f32,
    pub height: f32,
    pub spine: Vec<String>,
    pub merge_points: Vec<String>,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label: String,
    pub on_spine: bool,
    pub on_failure_path: bool,
    pub payload: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub source_handle: String,
    pub target_handle: String,
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub source_point: [f32; 2],
    pub target_point: [f32; 2],
    pub waypoints: Vec<[f32; 2]>,
    pub style: String,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout) -> Self {
        LayoutDump {
            direction: if layout.direction.is_horizontal() {
                "LR".to_string()
            } else {
                "TD".to_string()
            },
            width: layout.width,
            height: layout.height,
            spine: layout.spine.clone(),
            merge_points: layout.merge_points.clone(),
            nodes: layout.nodes.iter().map(node_dump).collect(),
            edges: layout.edges.iter().map(edge_dump).collect(),
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn node_dump(node: &NodeLayout) -> NodeDump {
    NodeDump {
        id: node.id.clone(),
        kind: node.kind.as_str().to_string(),
        x: node.x,
        y: node.y,
        width: node.width,
        height: node.height,
        label: node.label.clone(),
        on_spine: node.on_spine,
        on_failure_path: node.on_failure_path,
        payload: payload_json(&node.payload),
    }
}

fn payload_json(payload: &NodePayload) -> Value {
    match payload {
        NodePayload::None => Value::Null,
        NodePayload::Step {
            index,
            step_id,
            operation,
            description,
        } => json!({
            "stepIndex": index,
            "stepId": step_id,
            "operation": operation,
            "description": description,
        }),
        NodePayload::End(reason) => match reason {
            EndReason::Explicit => json!({ "reason": "explicit" }),
            EndReason::FallThrough => json!({ "reason": "fallThrough" }),
            EndReason::EmptyWorkflow => json!({ "reason": "emptyWorkflow" }),
            EndReason::Missing { step_id } => json!({ "reason": "missing", "stepId": step_id }),
            EndReason::Reference { target } => json!({ "reason": "reference", "target": target }),
        },
        NodePayload::Retry {
            target_step_id,
            retry_after,
            retry_limit,
            target_center,
        } => json!({
            "targetStepId": target_step_id,
            "retryAfter": retry_after,
            "retryLimit": retry_limit,
            "targetCenter": target_center.map(|(x, y)| [x, y]),
        }),
        NodePayload::Portal(target) => json!({
            "targetId": target.target_id,
            "targetLabel": target.target_label,
            "targetCenter": [target.target_center.0, target.target_center.1],
            "class": target.class.as_str(),
        }),
    }
}

fn edge_dump(edge: &EdgeLayout) -> EdgeDump {
    EdgeDump {
        id: edge.id.clone(),
        source_id: edge.from.clone(),
        target_id: edge.to.clone(),
        source_handle: edge.source_handle.as_str().to_string(),
        target_handle: edge.target_handle.as_str().to_string(),
        class: edge.class.as_str().to_string(),
        label: edge.label.clone(),
        source_point: [edge.source_point.0, edge.source_point.1],
        target_point: [edge.target_point.0, edge.target_point.1],
        waypoints: edge.waypoints.iter().map(|(x, y)| [*x, *y]).collect(),
        style: edge.style.as_str().to_string(),
    }
}

/// Writes the dump as pretty JSON to `path`, or to stdout when `path` is `None`.
pub fn write_layout_dump(path: Option<&Path>, layout: &Layout) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout);
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
