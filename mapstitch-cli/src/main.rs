//! MapStitch CLI - Command-line interface
//!
//! Downloads the tiles covering a rectangle and writes them out as one image,
//! optionally with a link file for georeferencing.

mod error;
mod progress;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use mapstitch::config::{default_config_path, ConfigFile, StitchConfig};
use mapstitch::coord::GeoPoint;
use mapstitch::logging::init_logging;
use mapstitch::output::{self, OutputFormat};
use mapstitch::provider::{AsyncReqwestClient, LayerStyle, Provider};
use mapstitch::tile::{Datum, GeoFrame};
use mapstitch::{Canvas, MapRequest, Stitcher};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::CliError;
use crate::progress::BarProgress;

/// Tile provider selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
enum ProviderType {
    /// Google Maps tiles
    Google,
    /// AutoNavi (Amap) tiles
    Amap,
    /// Tencent tiles
    Tencent,
}

impl From<ProviderType> for Provider {
    fn from(provider: ProviderType) -> Self {
        match provider {
            ProviderType::Google => Provider::Google,
            ProviderType::Amap => Provider::Amap,
            ProviderType::Tencent => Provider::Tencent,
        }
    }
}

/// Layer selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
enum StyleType {
    /// Aerial imagery
    Satellite,
    /// Rendered street map
    Map,
}

impl From<StyleType> for LayerStyle {
    fn from(style: StyleType) -> Self {
        match style {
            StyleType::Satellite => LayerStyle::Satellite,
            StyleType::Map => LayerStyle::Map,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "mapstitch", version)]
#[command(about = "Stitch web map tiles covering a region into one image", long_about = None)]
struct Args {
    /// North-west corner as "lon,lat"
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    from: GeoPoint,

    /// South-east corner as "lon,lat"
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    to: GeoPoint,

    /// Zoom level (0-19)
    #[arg(short, long)]
    zoom: u8,

    /// Tile provider [default: from config, else google]
    #[arg(long, value_enum)]
    provider: Option<ProviderType>,

    /// Imagery layer [default: from config, else satellite]
    #[arg(long, value_enum)]
    style: Option<StyleType>,

    /// Number of parallel downloads
    #[arg(short, long)]
    workers: Option<usize>,

    /// Output image (.jpg, .jpeg or .png)
    #[arg(short, long, default_value = "map.jpg")]
    output: PathBuf,

    /// Also write a georeferencing link file
    #[arg(long)]
    link_file: Option<PathBuf>,

    /// Datum shift applied to link file coordinates (keep, gcj, wgs)
    #[arg(long, default_value = "keep", value_parser = clap::value_parser!(Datum))]
    datum: Datum,

    /// Configuration file [default: ~/.config/mapstitch/config.ini]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Give up after this many seconds (0 for no deadline)
    #[arg(long)]
    timeout: Option<u64>,

    /// Copy log output to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    /// Applies command-line overrides on top of the configuration file.
    fn stitch_config(&self, file: &ConfigFile) -> StitchConfig {
        let mut config = file.stitch.clone();
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        // Zero disables the deadline, as in the config file
        if let Some(secs) = self.timeout {
            config.run_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        config
    }

    fn map_request(&self, file: &ConfigFile) -> MapRequest {
        let provider = self
            .provider
            .map(Provider::from)
            .or(file.provider)
            .unwrap_or(Provider::Google);
        let style = self
            .style
            .map(LayerStyle::from)
            .or(file.style)
            .unwrap_or(LayerStyle::Satellite);
        MapRequest::new(provider, style, self.from, self.to, self.zoom)
    }
}

/// Parses a "lon,lat" pair.
fn parse_point(s: &str) -> Result<GeoPoint, String> {
    let (lon, lat) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"lon,lat\", got '{}'", s))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    Ok(GeoPoint::new(lon, lat))
}

/// Loads the configuration file named on the command line, or the per-user
/// one when it exists.
fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => Ok(ConfigFile::load(path)?),
        None => match default_config_path() {
            Some(path) => Ok(ConfigFile::load_or_default(&path)?),
            None => Ok(ConfigFile::default()),
        },
    }
}

fn write_link_file(path: &Path, frame: &GeoFrame) -> Result<(), CliError> {
    let link_error = |error| CliError::LinkFile {
        path: path.to_path_buf(),
        error,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(link_error)?);
    frame.write_link_file(&mut writer).map_err(link_error)?;
    info!(path = %path.display(), datum = ?frame.datum(), "Link file written");
    Ok(())
}

/// Runs the stitcher, cancelling it on Ctrl-C.
async fn stitch(
    stitcher: &Stitcher<AsyncReqwestClient>,
    request: &MapRequest,
    quiet: bool,
) -> Result<Canvas, CliError> {
    let cancel = CancellationToken::new();

    let interrupt = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping downloads");
            interrupt.cancel();
        }
    });

    let result = stitcher
        .run(request, Box::new(BarProgress::new(quiet)), cancel)
        .await;
    signal_task.abort();

    result.map_err(CliError::from)
}

fn run(args: Args) -> Result<(), CliError> {
    let _logging_guard = init_logging(args.log_file.as_deref(), args.log_level())
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    // Reject an unusable output path before downloading anything
    OutputFormat::from_path(&args.output)?;

    let file = load_config(args.config.as_deref())?;
    let config = args.stitch_config(&file);
    let jpeg_quality = config.jpeg_quality;
    let request = args.map_request(&file);

    info!("MapStitch v{}", env!("CARGO_PKG_VERSION"));
    info!(
        provider = %request.provider,
        style = %request.style,
        from = %request.corner0,
        to = %request.corner1,
        zoom = request.zoom,
        "Building map"
    );

    let stitcher = Stitcher::from_config(config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let canvas = runtime.block_on(stitch(&stitcher, &request, args.quiet))?;

    output::save(&canvas, &args.output, jpeg_quality)?;

    if let Some(path) = &args.link_file {
        let plan = stitcher.plan(&request)?;
        write_link_file(path, &GeoFrame::from_grid(&plan.grid, args.datum))?;
    }

    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        e.exit();
    }
}
