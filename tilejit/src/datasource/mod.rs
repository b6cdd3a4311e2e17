//! The datasource facade
//!
//! [`TileDatasource`] ties the grid resolver, the download pool, and the
//! streaming parser together behind a query interface. Configuration is
//! validated eagerly at construction; a constructed datasource answers
//! queries without further setup errors.

use encoding_rs::Encoding;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::coord::{self, BoundingBox, MAX_ZOOM};
use crate::featureset::TileFeatureset;
use crate::pool::{CancelToken, DownloadPool, DEFAULT_WORKERS};
use crate::provider::{
    FetchError, HttpClient, ReqwestClient, TemplateError, TileFetcher, TileUrlTemplate,
};

/// Errors raised while constructing a datasource.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("tile URL template: {0}")]
    Template(#[from] TemplateError),
    #[error("unknown character encoding label {0:?}")]
    UnknownEncoding(String),
    #[error("minzoom {minzoom} exceeds maxzoom {maxzoom}")]
    ZoomRange { minzoom: u8, maxzoom: u8 },
    #[error("maxzoom {0} exceeds the supported maximum of {MAX_ZOOM}")]
    MaxZoomTooLarge(u8),
    #[error(transparent)]
    Http(#[from] FetchError),
    #[error("malformed TileJSON: {0}")]
    TileJson(#[from] serde_json::Error),
    #[error("TileJSON is missing field {0:?}")]
    MissingTileJsonField(&'static str),
}

/// Datasource configuration.
///
/// Built with defaults matching a typical point-feature tile service and
/// refined through the `with_*` setters. Validation happens when the
/// configuration is turned into a [`TileDatasource`].
#[derive(Debug, Clone)]
pub struct DatasourceConfig {
    url: String,
    minzoom: u8,
    maxzoom: u8,
    encoding: String,
    workers: usize,
}

impl DatasourceConfig {
    /// Configuration for the given `{z}/{x}/{y}` URL template with default
    /// zoom range 0..=10, UTF-8 payloads, and the default worker count.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            minzoom: 0,
            maxzoom: 10,
            encoding: "utf-8".to_string(),
            workers: DEFAULT_WORKERS,
        }
    }

    /// Restrict the zoom levels this datasource will serve.
    pub fn with_zoom_range(mut self, minzoom: u8, maxzoom: u8) -> Self {
        self.minzoom = minzoom;
        self.maxzoom = maxzoom;
        self
    }

    /// Declare the character encoding of property strings in the payloads.
    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = label.into();
        self
    }

    /// Number of concurrent download workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn minzoom(&self) -> u8 {
        self.minzoom
    }

    pub fn maxzoom(&self) -> u8 {
        self.maxzoom
    }
}

/// A GeoJSON tile service queried just in time, per bounding box.
///
/// Holds no tile state between queries: every query resolves its grid,
/// downloads the tiles, and parses them from scratch.
pub struct TileDatasource {
    pool: DownloadPool,
    minzoom: u8,
    maxzoom: u8,
    encoding: &'static Encoding,
}

impl TileDatasource {
    /// Builds a datasource backed by a real HTTP client with default
    /// timeouts.
    pub fn new(config: DatasourceConfig) -> Result<Self, ConfigError> {
        let client = Arc::new(ReqwestClient::new()?);
        Self::with_client(config, client)
    }

    /// Builds a datasource on a caller-supplied HTTP client.
    pub fn with_client(
        config: DatasourceConfig,
        client: Arc<dyn HttpClient>,
    ) -> Result<Self, ConfigError> {
        if config.minzoom > config.maxzoom {
            return Err(ConfigError::ZoomRange {
                minzoom: config.minzoom,
                maxzoom: config.maxzoom,
            });
        }
        if config.maxzoom > MAX_ZOOM {
            return Err(ConfigError::MaxZoomTooLarge(config.maxzoom));
        }
        let encoding = Encoding::for_label(config.encoding.as_bytes())
            .ok_or_else(|| ConfigError::UnknownEncoding(config.encoding.clone()))?;
        let template = TileUrlTemplate::new(&config.url)?;
        let fetcher = TileFetcher::new(client, template);

        Ok(Self {
            pool: DownloadPool::with_workers(fetcher, config.workers),
            minzoom: config.minzoom,
            maxzoom: config.maxzoom,
            encoding,
        })
    }

    /// Queries the extent at the zoom level implied by its mercator width.
    pub fn query(&self, bbox: &BoundingBox) -> TileFeatureset {
        self.query_with_cancel(bbox, &CancelToken::new())
    }

    /// Like [`query`](Self::query), with cooperative cancellation.
    pub fn query_with_cancel(&self, bbox: &BoundingBox, cancel: &CancelToken) -> TileFeatureset {
        let zoom = coord::zoom_for_extent(bbox);
        self.query_at_zoom_with_cancel(bbox, zoom, cancel)
    }

    /// Queries the extent at an explicit zoom level.
    pub fn query_at_zoom(&self, bbox: &BoundingBox, zoom: u8) -> TileFeatureset {
        self.query_at_zoom_with_cancel(bbox, zoom, &CancelToken::new())
    }

    /// Queries the extent at an explicit zoom level with cooperative
    /// cancellation.
    ///
    /// A zoom outside the configured range or a degenerate extent yields an
    /// empty featureset without any network traffic.
    pub fn query_at_zoom_with_cancel(
        &self,
        bbox: &BoundingBox,
        zoom: u8,
        cancel: &CancelToken,
    ) -> TileFeatureset {
        if zoom < self.minzoom || zoom > self.maxzoom {
            debug!(
                zoom,
                minzoom = self.minzoom,
                maxzoom = self.maxzoom,
                "zoom outside configured range, returning empty featureset"
            );
            return TileFeatureset::empty();
        }

        let coords = match coord::tiles_for_bbox(bbox, zoom) {
            Ok(coords) => coords,
            Err(err) => {
                warn!(error = %err, "extent did not resolve to a tile grid");
                return TileFeatureset::empty();
            }
        };
        if coords.is_empty() {
            return TileFeatureset::empty();
        }

        debug!(zoom, tiles = coords.len(), "resolved query grid");
        let payloads = self.pool.fetch_all(&coords, cancel);
        TileFeatureset::from_payloads(payloads, self.encoding)
    }
}
