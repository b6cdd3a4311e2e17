//! TileJIT - Just-in-time GeoJSON vector tile datasource
//!
//! This library fetches map-tile-shaped chunks of vector data from a remote
//! tile server addressed by a `{z}/{x}/{y}` URL template and incrementally
//! parses each chunk's GeoJSON payload into typed geometric features.
//!
//! # High-Level API
//!
//! Most callers only need the [`datasource`] module:
//!
//! ```ignore
//! use tilejit::datasource::{DatasourceConfig, TileDatasource};
//! use tilejit::coord::BoundingBox;
//! use tilejit::featureset::Featureset;
//!
//! let config = DatasourceConfig::new("https://tiles.example.com/{z}/{x}/{y}.json");
//! let datasource = TileDatasource::new(config)?;
//!
//! let bbox = BoundingBox::new(-74.1, 40.6, -73.9, 40.8)?;
//! let mut features = datasource.query(&bbox);
//! while let Some(feature) = features.next() {
//!     println!("{:?}", feature.geometry());
//! }
//! ```

pub mod coord;
pub mod datasource;
pub mod featureset;
pub mod geojson;
pub mod pool;
pub mod provider;
pub mod tilejson;

/// Version of the TileJIT library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
