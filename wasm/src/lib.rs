use arazzo_layout::config::Config;
use arazzo_layout::layout_dump::LayoutDump;
use arazzo_layout::theme::Theme;
use arazzo_layout::{Direction, Layout, compute_layout, parse_workflow, render_svg};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowLayoutOptions {
    workflow_id: Option<String>,
    /// "TD" (default) or "LR".
    direction: Option<String>,
    horizontal: Option<bool>,
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    rank_spacing: Option<f32>,
    node_spacing: Option<f32>,
}

struct Prepared {
    config: Config,
    layout: Layout,
}

fn parse_options(options_json: Option<String>) -> Result<WorkflowLayoutOptions, String> {
    match options_json {
        Some(raw) => serde_json::from_str(&raw).map_err(|error| error.to_string()),
        None => Ok(WorkflowLayoutOptions::default()),
    }
}

fn prepare(document: &str, options: WorkflowLayoutOptions) -> Result<Prepared, String> {
    let mut config = Config::default();
    if let Some(name) = options.theme.as_deref() {
        config.theme = Theme::named(name).ok_or_else(|| format!("unknown theme `{name}`"))?;
    }
    if let Some(font_family) = options.font_family {
        config.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        config.theme.font_size = font_size;
    }
    if let Some(v) = options.rank_spacing {
        config.layout.rank_spacing = v;
    }
    if let Some(v) = options.node_spacing {
        config.layout.node_spacing = v;
    }

    let direction = match (options.horizontal, options.direction.as_deref()) {
        (Some(true), _) => Direction::LeftRight,
        (_, Some(token)) => {
            Direction::from_token(token).ok_or_else(|| format!("unknown direction `{token}`"))?
        }
        _ => Direction::TopDown,
    };

    let workflow = parse_workflow(document, options.workflow_id.as_deref())
        .map_err(|error| error.to_string())?;
    let layout = compute_layout(&workflow, direction, &config.layout);
    Ok(Prepared { config, layout })
}

/// Returns the layout dump JSON for one workflow of an Arazzo document.
#[wasm_bindgen]
pub fn layout_workflow(document: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = parse_options(options_json).map_err(|error| JsValue::from_str(&error))?;
    let prepared = prepare(document, options).map_err(|error| JsValue::from_str(&error))?;
    LayoutDump::from_layout(&prepared.layout)
        .to_json()
        .map_err(|error| JsValue::from_str(&error.to_string()))
}

#[wasm_bindgen]
pub fn render_workflow_svg(document: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = parse_options(options_json).map_err(|error| JsValue::from_str(&error))?;
    let prepared = prepare(document, options).map_err(|error| JsValue::from_str(&error))?;
    Ok(render_svg(
        &prepared.layout,
        &prepared.config.theme,
        &prepared.config.layout,
    ))
}
