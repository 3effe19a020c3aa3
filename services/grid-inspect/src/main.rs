//! Grid inspection CLI.
//!
//! Operators use it to check a grid definition before wiring it into a
//! catalog:
//! - `covers`: list the cell URIs covering a GeoJSON AOI
//! - `cells`: dump cell boundaries as a GeoJSON FeatureCollection

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use grid_engine::{cells_to_geojson, CancellationToken, Grid, GridFactory, Shape};
use projection::WGS84_SRID;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "grid-inspect")]
#[command(about = "Inspect grid coverings and cell boundaries")]
struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the URIs of the cells covering an AOI, one per line
    Covers {
        #[command(flatten)]
        grid: GridArgs,

        /// GeoJSON file holding the AOI in lon/lat ("-" for stdin)
        #[arg(long)]
        aoi: PathBuf,
    },

    /// Print the cells named by URIs as a GeoJSON FeatureCollection
    Cells {
        #[command(flatten)]
        grid: GridArgs,

        /// Cell URIs
        #[arg(required = true)]
        uris: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct GridArgs {
    /// Grid flags, e.g. "+grid=regular +crs=EPSG:3857 +resolution=10 +cell_size=256"
    #[arg(long, required = true)]
    flags: Vec<String>,

    /// Placeholder values as key=value
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

impl GridArgs {
    fn build(&self, factory: &GridFactory) -> Result<Grid> {
        let parameters: HashMap<String, String> = self.params.iter().cloned().collect();
        factory
            .new_grid(&self.flags, &parameters)
            .with_context(|| format!("Failed to create grid from {:?}", self.flags))
    }
}

fn parse_param(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {:?}", s)),
    }
}

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli);

    let factory = GridFactory::from_env();

    match &cli.command {
        Command::Covers { grid, aoi } => {
            let grid = grid.build(&factory)?;
            covers(&grid, aoi).await
        }
        Command::Cells { grid, uris } => {
            let grid = grid.build(&factory)?;
            let json = cells_to_geojson(&grid, uris).context("Failed to build cells")?;
            println!("{}", json);
            Ok(())
        }
    }
}

async fn covers(grid: &Grid, aoi_path: &Path) -> Result<()> {
    let text = if aoi_path.as_os_str() == "-" {
        tokio::task::spawn_blocking(|| std::io::read_to_string(std::io::stdin()))
            .await?
            .context("Failed to read AOI from stdin")?
    } else {
        tokio::fs::read_to_string(aoi_path)
            .await
            .with_context(|| format!("Failed to read AOI from {}", aoi_path.display()))?
    };
    let aoi = Shape::from_geojson(&text, WGS84_SRID)
        .context("AOI must be a Polygon or MultiPolygon")?
        .into_polygons();

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling covering");
            ctrl_c.cancel();
        }
    });

    info!(grid = grid.name(), crs = %grid.crs(), "Computing covering");

    let mut stream = grid.covers(token, &aoi);
    let mut count = 0usize;
    while let Some(item) = stream.next().await {
        match item {
            Ok(uri) => {
                println!("{}", uri);
                count += 1;
            }
            Err(e) => bail!("Covering failed after {} cells: {}", count, e),
        }
    }

    info!(cells = count, "Covering complete");
    Ok(())
}
