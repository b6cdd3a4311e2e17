//! TileJIT CLI - query a GeoJSON tile service for one bounding box.
//!
//! Points the library at a `{z}/{x}/{y}` URL template or a TileJSON
//! endpoint, runs a single query, and prints the resulting features.

use clap::Parser;
use std::process::ExitCode;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tilejit::coord::{BoundingBox, CoordError};
use tilejit::datasource::{ConfigError, DatasourceConfig, TileDatasource};
use tilejit::featureset::Featureset;
use tilejit::geojson::{Geometry, Value};
use tilejit::pool::CancelToken;
use tilejit::provider::ReqwestClient;
use tilejit::tilejson;

#[derive(Debug, Error)]
enum CliError {
    #[error("invalid --bbox: {0}")]
    Bbox(String),
    #[error(transparent)]
    Coord(#[from] CoordError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to install the interrupt handler: {0}")]
    Interrupt(#[from] ctrlc::Error),
}

/// Query a remote GeoJSON tile service for the features in a bounding box.
#[derive(Debug, Parser)]
#[command(name = "tilejit", version = tilejit::VERSION)]
struct Cli {
    /// Tile URL template containing {z}/{x}/{y}, or a TileJSON endpoint
    url: String,

    /// Query extent as minlon,minlat,maxlon,maxlat (degrees)
    #[arg(long, value_name = "BBOX")]
    bbox: String,

    /// Query at this zoom level instead of deriving one from the extent
    #[arg(long)]
    zoom: Option<u8>,

    /// Lowest zoom level the service covers
    #[arg(long, default_value_t = 0)]
    minzoom: u8,

    /// Highest zoom level the service covers
    #[arg(long, default_value_t = 10)]
    maxzoom: u8,

    /// Character encoding of property strings in the payloads
    #[arg(long, default_value = "utf-8")]
    encoding: String,

    /// Number of concurrent tile downloads
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Print only the feature count
    #[arg(long)]
    count: bool,
}

fn parse_bbox(spec: &str) -> Result<BoundingBox, CliError> {
    let parts: Vec<f64> = spec
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| CliError::Bbox(format!("{spec:?}: {e}")))?;
    let [minx, miny, maxx, maxy] = parts[..] else {
        return Err(CliError::Bbox(format!(
            "expected 4 comma-separated numbers, got {}",
            parts.len()
        )));
    };
    Ok(BoundingBox::new(minx, miny, maxx, maxy)?)
}

fn geometry_summary(geometry: Option<&Geometry>) -> String {
    match geometry {
        None => "(no geometry)".to_string(),
        Some(Geometry::Point { x, y }) => format!("Point({x}, {y})"),
        Some(Geometry::LineString(ring)) => format!("LineString[{} points]", ring.len()),
        Some(Geometry::Polygon(ring)) => format!("Polygon[{} points]", ring.len()),
        Some(Geometry::MultiLineString(rings)) => {
            format!("MultiLineString[{} lines]", rings.len())
        }
    }
}

fn value_summary(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("{s:?}"),
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let bbox = parse_bbox(&cli.bbox)?;

    let config = if tilejson::is_tile_template(&cli.url) {
        DatasourceConfig::new(&cli.url).with_zoom_range(cli.minzoom, cli.maxzoom)
    } else {
        info!(url = %cli.url, "fetching TileJSON descriptor");
        let client = ReqwestClient::new().map_err(ConfigError::from)?;
        tilejson::fetch(&client, &cli.url)?.into_config()?
    };
    let config = config
        .with_encoding(&cli.encoding)
        .with_workers(cli.workers);

    let datasource = TileDatasource::new(config)?;

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("interrupted, finishing in-flight tiles...");
        handler_token.cancel();
    })?;

    let mut cursor = match cli.zoom {
        Some(zoom) => datasource.query_at_zoom_with_cancel(&bbox, zoom, &cancel),
        None => datasource.query_with_cancel(&bbox, &cancel),
    };

    let mut count: u64 = 0;
    while let Some(feature) = cursor.next() {
        count += 1;
        if cli.count {
            continue;
        }
        let properties: Vec<String> = feature
            .properties()
            .iter()
            .map(|(name, value)| format!("{}={}", name, value_summary(value)))
            .collect();
        println!(
            "{}\t{}\t{}",
            feature.id(),
            geometry_summary(feature.geometry()),
            properties.join(" ")
        );
    }

    if cli.count {
        println!("{count}");
    } else {
        info!(features = count, "query complete");
    }
    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
