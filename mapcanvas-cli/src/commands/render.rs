//! Render a viewport to a PNG file.
//!
//! The first pass draws whatever is cached and queues downloads for the
//! rest. The command then re-renders each time tiles arrive, until the image
//! is complete, downloads go quiet, or the wait runs out.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use image::ImageFormat;
use mapcanvas::app::{LayerConfig, TileLayer};
use mapcanvas::config::ConfigFile;
use mapcanvas::coord::Viewport;
use mapcanvas::render::{RenderMode, RenderReport};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::error::CliError;

/// Arguments of `mapcanvas render`.
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Zoom level
    #[arg(long)]
    pub zoom: u8,

    /// Left edge in layer pixels at the given zoom
    #[arg(long, default_value = "0")]
    pub x: u64,

    /// Top edge in layer pixels at the given zoom
    #[arg(long, default_value = "0")]
    pub y: u64,

    /// Image width in pixels
    #[arg(long, default_value = "800")]
    pub width: u32,

    /// Image height in pixels
    #[arg(long, default_value = "600")]
    pub height: u32,

    /// Output PNG path
    #[arg(long, short)]
    pub output: PathBuf,

    /// Seconds to wait for missing tiles before writing the image
    #[arg(long, default_value = "30")]
    pub wait: u64,
}

impl RenderArgs {
    fn viewport(&self) -> Result<Viewport, CliError> {
        if self.width == 0 || self.height == 0 {
            return Err(CliError::InvalidArgs(
                "width and height must be at least 1".to_string(),
            ));
        }
        Ok(Viewport::new(self.x, self.y, self.zoom, self.width, self.height))
    }
}

/// What ended a wait for downloads.
enum Wake {
    Tile,
    Idle,
    Closed,
}

/// Run the render command.
pub fn run(args: RenderArgs, config: &ConfigFile) -> Result<(), CliError> {
    let viewport = args.viewport()?;
    let layer_config = LayerConfig::from_config_file(config)?;

    let runtime = Runtime::new().map_err(CliError::Runtime)?;
    let (mut layer, mut events) = TileLayer::open(layer_config, runtime.handle().clone())?;

    println!("Rendering {} from {}", viewport, layer.name());

    let deadline = Instant::now() + Duration::from_secs(args.wait);
    let mut report = layer.render(viewport);
    print_report(&report);

    while report.dirty && report.mode != RenderMode::OutOfRange {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            info!("Wait elapsed with tiles still missing");
            break;
        }

        let wake = runtime.block_on(async {
            let wait = async {
                tokio::select! {
                    event = events.recv() => match event {
                        Some(_) => Wake::Tile,
                        None => Wake::Closed,
                    },
                    _ = layer.wait_idle() => Wake::Idle,
                }
            };
            tokio::time::timeout(remaining, wait).await.unwrap_or(Wake::Idle)
        });

        let mut arrived = matches!(wake, Wake::Tile);
        while events.try_recv().is_ok() {
            arrived = true;
        }
        if !arrived {
            debug!("No more tiles arriving");
            break;
        }

        report = layer.render(viewport);
        print_report(&report);
    }

    layer.stop();

    layer
        .image()
        .save_with_format(&args.output, ImageFormat::Png)
        .map_err(|error| CliError::ImageWrite {
            path: args.output.clone(),
            error,
        })?;

    let stats = layer.stats();
    println!("Downloads: {}", stats);
    println!("Wrote {}", args.output.display());
    if report.dirty {
        println!("Some tiles are missing or stale; run again to fill them in.");
    }

    Ok(())
}

fn print_report(report: &RenderReport) {
    match report.mode {
        RenderMode::OutOfRange => {
            println!("  zoom {} is not served by this tile server", report.viewport.z)
        }
        _ => println!(
            "  {} tiles drawn, {} placeholders, {} requested",
            report.tiles_drawn, report.placeholders, report.requested
        ),
    }
}
