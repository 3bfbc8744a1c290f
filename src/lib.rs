#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, load_config};
pub use ir::{Action, Direction, Step, Transition, Workflow, WorkflowDocument};
pub use layout::{Layout, bridge, compute_layout};
pub use parser::{ParseError, parse_workflow, parse_workflow_document};
pub use render::render_svg;
