use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSizeConfig {
    pub step_width: f32,
    pub step_height: f32,
    pub portal_width: f32,
    pub portal_height: f32,
    pub terminal_diameter: f32,
    pub condition_size: f32,
    pub retry_diameter: f32,
}

impl Default for NodeSizeConfig {
    fn default() -> Self {
        Self {
            step_width: 180.0,
            step_height: 56.0,
            portal_width: 140.0,
            portal_height: 32.0,
            terminal_diameter: 40.0,
            condition_size: 36.0,
            retry_diameter: 36.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Upper bound on lane shifts while searching for an unobstructed detour.
    pub max_lane_shifts: usize,
    /// Distance of the bend on condition-branch edges, and of detour stubs.
    pub branch_elbow: f32,
    pub obstacle_padding: f32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_lane_shifts: 20,
            branch_elbow: 20.0,
            obstacle_padding: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Forward distance, in step ranks, past which a jump from a failure context becomes a portal.
    pub far_jump_ranks: f32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self { far_jump_ranks: 2.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub radius: f32,
    /// Crossings closer than this to either end of a segment get no arc.
    pub endpoint_clearance: f32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            radius: 5.0,
            endpoint_clearance: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Gap between consecutive ranks along the flow direction.
    pub rank_spacing: f32,
    /// Gap between neighbouring columns across the flow direction.
    pub node_spacing: f32,
    pub margin: f32,
    pub label_line_height: f32,
    pub sizes: NodeSizeConfig,
    pub routing: RoutingConfig,
    pub portal: PortalConfig,
    pub bridge: BridgeConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            rank_spacing: 50.0,
            node_spacing: 40.0,
            margin: 24.0,
            label_line_height: 1.4,
            sizes: NodeSizeConfig::default(),
            routing: RoutingConfig::default(),
            portal: PortalConfig::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::modern();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    step_fill: Option<String>,
    step_border: Option<String>,
    text_color: Option<String>,
    line_color: Option<String>,
    failure_line_color: Option<String>,
    condition_fill: Option<String>,
    terminal_fill: Option<String>,
    missing_fill: Option<String>,
    retry_fill: Option<String>,
    portal_fill: Option<String>,
    portal_border: Option<String>,
    edge_label_background: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    rank_spacing: Option<f32>,
    node_spacing: Option<f32>,
    margin: Option<f32>,
    step_width: Option<f32>,
    step_height: Option<f32>,
    portal_width: Option<f32>,
    portal_height: Option<f32>,
    terminal_diameter: Option<f32>,
    condition_size: Option<f32>,
    retry_diameter: Option<f32>,
    max_lane_shifts: Option<usize>,
    branch_elbow: Option<f32>,
    obstacle_padding: Option<f32>,
    far_jump_ranks: Option<f32>,
    bridge_radius: Option<f32>,
    bridge_endpoint_clearance: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme) = parsed.theme.as_deref().and_then(Theme::named) {
        config.theme = theme;
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.step_fill {
            config.theme.step_fill = v;
        }
        if let Some(v) = vars.step_border {
            config.theme.step_border = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.failure_line_color {
            config.theme.failure_line_color = v;
        }
        if let Some(v) = vars.condition_fill {
            config.theme.condition_fill = v;
        }
        if let Some(v) = vars.terminal_fill {
            config.theme.terminal_fill = v;
        }
        if let Some(v) = vars.missing_fill {
            config.theme.missing_fill = v;
        }
        if let Some(v) = vars.retry_fill {
            config.theme.retry_fill = v;
        }
        if let Some(v) = vars.portal_fill {
            config.theme.portal_fill = v;
        }
        if let Some(v) = vars.portal_border {
            config.theme.portal_border = v;
        }
        if let Some(v) = vars.edge_label_background {
            config.theme.edge_label_background = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
    }
    config.render.background = config.theme.background.clone();

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.rank_spacing {
            config.layout.rank_spacing = v;
        }
        if let Some(v) = layout.node_spacing {
            config.layout.node_spacing = v;
        }
        if let Some(v) = layout.margin {
            config.layout.margin = v;
        }
        if let Some(v) = layout.step_width {
            config.layout.sizes.step_width = v;
        }
        if let Some(v) = layout.step_height {
            config.layout.sizes.step_height = v;
        }
        if let Some(v) = layout.portal_width {
            config.layout.sizes.portal_width = v;
        }
        if let Some(v) = layout.portal_height {
            config.layout.sizes.portal_height = v;
        }
        if let Some(v) = layout.terminal_diameter {
            config.layout.sizes.terminal_diameter = v;
        }
        if let Some(v) = layout.condition_size {
            config.layout.sizes.condition_size = v;
        }
        if let Some(v) = layout.retry_diameter {
            config.layout.sizes.retry_diameter = v;
        }
        if let Some(v) = layout.max_lane_shifts {
            config.layout.routing.max_lane_shifts = v;
        }
        if let Some(v) = layout.branch_elbow {
            config.layout.routing.branch_elbow = v;
        }
        if let Some(v) = layout.obstacle_padding {
            config.layout.routing.obstacle_padding = v;
        }
        if let Some(v) = layout.far_jump_ranks {
            config.layout.portal.far_jump_ranks = v;
        }
        if let Some(v) = layout.bridge_radius {
            config.layout.bridge.radius = v;
        }
        if let Some(v) = layout.bridge_endpoint_clearance {
            config.layout.bridge.endpoint_clearance = v;
        }
    }

    Ok(config)
}
