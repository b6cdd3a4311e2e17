//! Query result cursors
//!
//! A featureset is the forward-only cursor a query hands back. The concrete
//! [`TileFeatureset`] aggregates the parsed features of every successfully
//! downloaded tile in completion order; payloads that failed to download or
//! failed to parse are skipped with a log line rather than aborting the
//! whole result.

use encoding_rs::Encoding;
use tracing::{debug, warn};

use crate::geojson::{self, Feature};
use crate::provider::RawPayload;

/// Forward-only cursor over query results.
///
/// Each feature is yielded exactly once; there is no rewind.
pub trait Featureset {
    fn next(&mut self) -> Option<Feature>;
}

/// Featureset backed by a batch of downloaded tile payloads.
pub struct TileFeatureset {
    features: std::vec::IntoIter<Feature>,
}

impl TileFeatureset {
    /// Parses every successful payload and aggregates the features in
    /// payload order.
    ///
    /// Failed payloads were already logged at fetch time and are skipped
    /// here; a payload that downloaded but is not well-formed GeoJSON is
    /// skipped with a warning.
    pub fn from_payloads(payloads: Vec<RawPayload>, encoding: &'static Encoding) -> Self {
        let mut features = Vec::new();
        for payload in &payloads {
            if !payload.is_success() {
                continue;
            }
            match geojson::parse(payload.data(), encoding) {
                Ok(parsed) => features.extend(parsed),
                Err(err) => {
                    warn!(
                        tile = %payload.coord(),
                        error = %err,
                        "skipping unparseable tile payload"
                    );
                }
            }
        }
        debug!(
            tiles = payloads.len(),
            features = features.len(),
            "aggregated tile payloads"
        );
        Self {
            features: features.into_iter(),
        }
    }

    /// A cursor that yields nothing.
    pub fn empty() -> Self {
        Self {
            features: Vec::new().into_iter(),
        }
    }
}

impl Featureset for TileFeatureset {
    fn next(&mut self) -> Option<Feature> {
        self.features.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;
    use bytes::Bytes;
    use encoding_rs::UTF_8;

    fn payload(x: u32, body: &str) -> RawPayload {
        RawPayload::ok(TileCoord::new(x, 0, 3), Bytes::from(body.to_string()))
    }

    const ONE_POINT: &str =
        r#"{"features":[{"geometry":{"type":"Point","coordinates":[1,2]},"properties":{}}]}"#;

    #[test]
    fn test_aggregates_across_payloads() {
        let mut cursor = TileFeatureset::from_payloads(
            vec![payload(0, ONE_POINT), payload(1, ONE_POINT)],
            UTF_8,
        );

        assert!(cursor.next().is_some());
        assert!(cursor.next().is_some());
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_exhausted_cursor_stays_exhausted() {
        let mut cursor = TileFeatureset::from_payloads(vec![payload(0, ONE_POINT)], UTF_8);
        assert!(cursor.next().is_some());
        assert!(cursor.next().is_none());
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_failed_payloads_are_skipped() {
        let mut cursor = TileFeatureset::from_payloads(
            vec![
                payload(0, ONE_POINT),
                RawPayload::failed(TileCoord::new(1, 0, 3)),
                payload(2, ONE_POINT),
            ],
            UTF_8,
        );

        let mut count = 0;
        while cursor.next().is_some() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn test_unparseable_payload_is_skipped() {
        let mut cursor = TileFeatureset::from_payloads(
            vec![payload(0, "{not json"), payload(1, ONE_POINT)],
            UTF_8,
        );

        assert!(cursor.next().is_some());
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_empty_cursor() {
        let mut cursor = TileFeatureset::empty();
        assert!(cursor.next().is_none());
    }
}
