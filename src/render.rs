use crate::config::LayoutConfig;
#[cfg(feature = "png")]
use crate::config::RenderConfig;
use crate::layout::bridge::{Segment, bridged_path_data, edge_segments};
use crate::layout::{EdgeClass, EdgeLayout, EdgeStyle, EndReason, Layout, NodeKind, NodeLayout, NodePayload};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

// Rough glyph advance used to size edge label backgrounds.
const CHAR_WIDTH_RATIO: f32 = 0.6;
const LABEL_PAD_X: f32 = 6.0;
const LABEL_PAD_Y: f32 = 4.0;

pub fn render_svg(layout: &Layout, theme: &Theme, config: &LayoutConfig) -> String {
    let mut svg = String::new();
    let width = layout.width.max(200.0);
    let height = layout.height.max(200.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<defs>");
    for (id, color) in [
        ("arrow", &theme.line_color),
        ("arrow-failure", &theme.failure_line_color),
    ] {
        svg.push_str(&format!(
            "<marker id=\"{id}\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{color}\"/></marker>",
        ));
    }
    svg.push_str("</defs>");

    let segments: Vec<Vec<Segment>> = layout
        .edges
        .iter()
        .map(|edge| edge_segments(&edge.points()))
        .collect();

    for (idx, edge) in layout.edges.iter().enumerate() {
        let others: Vec<Segment> = segments
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != idx)
            .flat_map(|(_, segs)| segs.iter().copied())
            .collect();
        let d = bridged_path_data(&edge.points(), &others, &config.bridge);
        let (color, marker) = match edge.class {
            EdgeClass::Success => (&theme.line_color, "arrow"),
            EdgeClass::Failure => (&theme.failure_line_color, "arrow-failure"),
        };
        let dash = match edge.style {
            EdgeStyle::Solid => "",
            EdgeStyle::Dashed => " stroke-dasharray=\"6 4\"",
            EdgeStyle::Dotted => " stroke-dasharray=\"2 4\"",
        };
        svg.push_str(&format!(
            "<path d=\"{d}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"1.4\"{dash} marker-end=\"url(#{marker})\"/>",
        ));
    }

    for edge in &layout.edges {
        if let Some(label) = edge.label.as_deref() {
            svg.push_str(&edge_label_svg(edge, label, theme));
        }
    }

    for node in &layout.nodes {
        svg.push_str(&node_svg(node, theme, config));
    }

    svg.push_str("</svg>");
    svg
}

fn node_svg(node: &NodeLayout, theme: &Theme, config: &LayoutConfig) -> String {
    let (cx, cy) = node.center();
    let mut out = String::new();
    match node.kind {
        NodeKind::Start | NodeKind::End | NodeKind::Retry => {
            let fill = match (&node.kind, &node.payload) {
                (NodeKind::Retry, _) => &theme.retry_fill,
                (_, NodePayload::End(EndReason::Missing { .. } | EndReason::Reference { .. })) => {
                    &theme.missing_fill
                }
                _ => &theme.terminal_fill,
            };
            let r = node.width.min(node.height) / 2.0;
            out.push_str(&format!(
                "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{r:.2}\" fill=\"{fill}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
                theme.step_border
            ));
            if node.kind == NodeKind::End {
                out.push_str(&format!(
                    "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.4\"/>",
                    (r - 4.0).max(1.0),
                    theme.step_border
                ));
            }
        }
        NodeKind::Condition => {
            let points = [
                (cx, node.y),
                (node.x + node.width, cy),
                (cx, node.y + node.height),
                (node.x, cy),
            ]
            .iter()
            .map(|(x, y)| format!("{x:.2},{y:.2}"))
            .collect::<Vec<_>>()
            .join(" ");
            out.push_str(&format!(
                "<polygon points=\"{points}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
                theme.condition_fill, theme.step_border
            ));
        }
        NodeKind::Step | NodeKind::Portal => {
            let (fill, stroke, dash) = if node.kind == NodeKind::Portal {
                (&theme.portal_fill, &theme.portal_border, " stroke-dasharray=\"4 3\"")
            } else {
                (&theme.step_fill, &theme.step_border, "")
            };
            out.push_str(&format!(
                "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"10\" ry=\"10\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"1.4\"{dash}/>",
                node.x, node.y, node.width, node.height
            ));
        }
    }

    let lines = node_lines(node);
    if !lines.is_empty() {
        out.push_str(&text_block_svg(cx, cy, &lines, theme, config));
    }
    out
}

fn node_lines(node: &NodeLayout) -> Vec<String> {
    match (&node.kind, &node.payload) {
        (NodeKind::Condition, _) => Vec::new(),
        (NodeKind::Step, NodePayload::Step { operation: Some(op), .. }) => {
            vec![node.label.clone(), op.clone()]
        }
        (NodeKind::Start | NodeKind::End, NodePayload::End(EndReason::Missing { .. } | EndReason::Reference { .. })) => {
            vec![node.label.clone()]
        }
        (NodeKind::Start | NodeKind::End, _) => Vec::new(),
        _ => vec![node.label.clone()],
    }
}

fn text_block_svg(x: f32, y: f32, lines: &[String], theme: &Theme, config: &LayoutConfig) -> String {
    let line_height = theme.font_size * config.label_line_height;
    let total_height = lines.len() as f32 * line_height;
    let start_y = y - total_height / 2.0 + theme.font_size;
    let mut text = String::new();
    text.push_str(&format!(
        "<text x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">",
        escape_xml(&theme.font_family),
        theme.font_size,
        theme.text_color
    ));
    for (idx, line) in lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        text.push_str(&format!(
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }
    text.push_str("</text>");
    text
}

fn edge_label_svg(edge: &EdgeLayout, label: &str, theme: &Theme) -> String {
    let (x, y) = edge_midpoint(edge);
    let width = label.chars().count() as f32 * theme.font_size * CHAR_WIDTH_RATIO;
    let height = theme.font_size;
    format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\"/><text x=\"{x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
        x - width / 2.0 - LABEL_PAD_X,
        y - height / 2.0 - LABEL_PAD_Y,
        width + LABEL_PAD_X * 2.0,
        height + LABEL_PAD_Y * 2.0,
        theme.edge_label_background,
        y + height / 2.0 - 2.0,
        escape_xml(&theme.font_family),
        theme.font_size,
        theme.text_color,
        escape_xml(label)
    )
}

fn edge_midpoint(edge: &EdgeLayout) -> (f32, f32) {
    let points = edge.points();
    if points.len() >= 4 {
        let p1 = points[1];
        let p2 = points[2];
        ((p1.0 + p2.0) / 2.0, (p1.1 + p2.1) / 2.0)
    } else {
        let p1 = points[0];
        let p2 = points[points.len() - 1];
        ((p1.0 + p2.0) / 2.0, (p1.1 + p2.1) / 2.0)
    }
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(|family| family.trim().trim_matches('"').to_string())
        .unwrap_or_else(|| "Inter".to_string());
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("invalid render size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;
    if let Some(color) = parse_hex_color(&render_cfg.background) {
        pixmap.fill(color);
    }

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(feature = "png")]
fn parse_hex_color(value: &str) -> Option<resvg::tiny_skia::Color> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(resvg::tiny_skia::Color::from_rgba8(r, g, b, 255))
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
