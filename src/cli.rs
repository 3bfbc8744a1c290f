use crate::config::load_config;
use crate::ir::Direction;
use crate::layout::compute_layout;
use crate::layout_dump::write_layout_dump;
use crate::parser::parse_workflow;
#[cfg(feature = "png")]
use crate::render::write_output_png;
use crate::render::{render_svg, write_output_svg};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "arazzo-layout",
    version,
    about = "Lay out Arazzo workflows as spine-aligned step diagrams"
)]
pub struct Args {
    /// Workflow document (JSON, JSON5 or YAML) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for json and svg.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Config JSON file (layout overrides and themeVariables)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Flow direction: TD, TB or LR
    #[arg(short = 'd', long = "direction", default_value = "TD")]
    pub direction: String,

    /// Workflow to lay out when the document defines several
    #[arg(long = "workflow")]
    pub workflow: Option<String>,

    /// Width used when rasterizing
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f32,

    /// Height used when rasterizing
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f32,

    /// Log pipeline stages to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    config.render.width = args.width;
    config.render.height = args.height;

    let direction = parse_direction(&args.direction)?;
    let input = read_input(args.input.as_deref())?;
    let workflow = parse_workflow(&input, args.workflow.as_deref())?;
    let layout = compute_layout(&workflow, direction, &config.layout);

    match args.output_format {
        OutputFormat::Json => write_layout_dump(args.output.as_deref(), &layout)?,
        OutputFormat::Svg => {
            let svg = render_svg(&layout, &config.theme, &config.layout);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_png(&layout, &config, &output)?;
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
fn write_png(layout: &crate::layout::Layout, config: &crate::config::Config, output: &Path) -> Result<()> {
    let svg = render_svg(layout, &config.theme, &config.layout);
    write_output_png(&svg, output, &config.render, &config.theme)
}

#[cfg(not(feature = "png"))]
fn write_png(_layout: &crate::layout::Layout, _config: &crate::config::Config, _output: &Path) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "arazzo_layout=debug"
    } else {
        "arazzo_layout=warn"
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .try_init();
}

fn parse_direction(token: &str) -> Result<Direction> {
    Direction::from_token(token)
        .ok_or_else(|| anyhow::anyhow!("unknown direction `{token}` (expected TD, TB or LR)"))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
