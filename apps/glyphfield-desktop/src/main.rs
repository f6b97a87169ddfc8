mod app;
mod config;
mod loading;
mod ui;

use anyhow::Result;
use clap::Parser;
use config::DemoConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use winit::event_loop::{ControlFlow, EventLoop};

#[derive(Parser)]
#[command(name = "glyphfield-desktop", about = "Extruded text among scattered tori")]
pub(crate) struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Typeface JSON font
    #[arg(long)]
    font: Option<PathBuf>,

    /// Matcap texture image
    #[arg(long)]
    texture: Option<PathBuf>,

    /// Text to extrude
    #[arg(long)]
    text: Option<String>,

    /// Scatter seed
    #[arg(long)]
    seed: Option<u64>,

    /// Number of tori
    #[arg(long)]
    count: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = DemoConfig::load(&cli)?;
    tracing::info!(font = %config.font.display(), texture = %config.texture.display(), "glyphfield-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = app::GpuApp::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
