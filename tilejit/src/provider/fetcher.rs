//! Per-tile fetch operation.

use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

use super::http::HttpClient;
use super::template::TileUrlTemplate;
use crate::coord::TileCoord;

/// The raw bytes downloaded for one tile, plus the originating coordinate
/// and a success flag.
///
/// A payload is consumed exactly once by the streaming parser and then
/// discarded; it is never retained across queries.
#[derive(Debug, Clone)]
pub struct RawPayload {
    coord: TileCoord,
    data: Bytes,
    success: bool,
}

impl RawPayload {
    /// A successfully fetched payload.
    pub fn ok(coord: TileCoord, data: Bytes) -> Self {
        Self {
            coord,
            data,
            success: true,
        }
    }

    /// A failed fetch: empty bytes, `success` false.
    pub fn failed(coord: TileCoord) -> Self {
        Self {
            coord,
            data: Bytes::new(),
            success: false,
        }
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// Fetches the raw payload for single tile coordinates via HTTP GET.
///
/// Remote failures (connection errors, timeouts, non-success statuses) are
/// recovered locally: `fetch` returns a failed payload and never propagates
/// them. Template validity is established at construction time.
#[derive(Clone)]
pub struct TileFetcher {
    client: Arc<dyn HttpClient>,
    template: TileUrlTemplate,
}

impl TileFetcher {
    pub fn new(client: Arc<dyn HttpClient>, template: TileUrlTemplate) -> Self {
        Self { client, template }
    }

    /// Downloads one tile, marking the payload failed on any network error.
    pub fn fetch(&self, coord: TileCoord) -> RawPayload {
        let url = self.template.url_for(&coord);
        match self.client.get(&url) {
            Ok(data) => RawPayload::ok(coord, data),
            Err(e) => {
                debug!(tile = %coord, error = %e, "tile fetch failed, skipping");
                RawPayload::failed(coord)
            }
        }
    }
}
