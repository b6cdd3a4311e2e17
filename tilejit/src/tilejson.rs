//! TileJSON service descriptors
//!
//! A datasource can be pointed either directly at a `{z}/{x}/{y}` URL
//! template or at a TileJSON document describing the service. The descriptor
//! contributes the tile template (`vectors`), the served zoom range, the
//! coverage bounds, and the advertised property fields.

use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::coord::BoundingBox;
use crate::datasource::{ConfigError, DatasourceConfig};
use crate::provider::HttpClient;

/// Returns true when the URL is itself a tile template rather than a
/// TileJSON endpoint.
pub fn is_tile_template(url: &str) -> bool {
    url.contains("{z}")
}

/// The subset of a TileJSON document this datasource consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct TileJson {
    pub minzoom: Option<u8>,
    pub maxzoom: Option<u8>,
    /// `{z}/{x}/{y}` template for the vector tiles themselves.
    pub vectors: Option<String>,
    /// Coverage as `[minlon, minlat, maxlon, maxlat]`.
    pub bounds: Option<[f64; 4]>,
    /// Advertised property names and their declared types.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl TileJson {
    /// The coverage bounds as a bounding box.
    ///
    /// A descriptor without `bounds` covers the whole world: absence falls
    /// back to the full web-Mercator extent. Malformed bounds are ignored
    /// with a warning.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let Some([minx, miny, maxx, maxy]) = self.bounds else {
            return Some(BoundingBox::world());
        };
        match BoundingBox::new(minx, miny, maxx, maxy) {
            Ok(bbox) => Some(bbox),
            Err(err) => {
                warn!(error = %err, "ignoring malformed TileJSON bounds");
                None
            }
        }
    }

    /// Turns the descriptor into a datasource configuration.
    ///
    /// The `vectors` template is required; zoom limits fall back to the
    /// datasource defaults when the descriptor omits them.
    pub fn into_config(self) -> Result<DatasourceConfig, ConfigError> {
        let vectors = self
            .vectors
            .ok_or(ConfigError::MissingTileJsonField("vectors"))?;
        let config = DatasourceConfig::new(vectors);
        let minzoom = self.minzoom.unwrap_or(config.minzoom());
        let maxzoom = self.maxzoom.unwrap_or(config.maxzoom());
        Ok(config.with_zoom_range(minzoom, maxzoom))
    }
}

/// Downloads and deserializes the TileJSON document at `url`.
pub fn fetch(client: &dyn HttpClient, url: &str) -> Result<TileJson, ConfigError> {
    let body = client.get(url)?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{FetchError, MockHttpClient};
    use bytes::Bytes;

    const DESCRIPTOR: &str = r#"{
        "minzoom": 2,
        "maxzoom": 14,
        "vectors": "http://tiles.test/{z}/{x}/{y}.geojson",
        "bounds": [-10.0, -5.0, 10.0, 5.0],
        "fields": {"name": "String", "rank": "Number"}
    }"#;

    #[test]
    fn test_template_detection() {
        assert!(is_tile_template("http://tiles.test/{z}/{x}/{y}"));
        assert!(!is_tile_template("http://tiles.test/index.json"));
    }

    #[test]
    fn test_descriptor_into_config() {
        let tilejson: TileJson = serde_json::from_str(DESCRIPTOR).unwrap();
        assert_eq!(tilejson.fields.get("name"), Some(&"String".to_string()));

        let config = tilejson.into_config().unwrap();
        assert_eq!(config.url(), "http://tiles.test/{z}/{x}/{y}.geojson");
        assert_eq!(config.minzoom(), 2);
        assert_eq!(config.maxzoom(), 14);
    }

    #[test]
    fn test_zoom_defaults_when_absent() {
        let tilejson: TileJson =
            serde_json::from_str(r#"{"vectors": "http://t/{z}/{x}/{y}"}"#).unwrap();
        let config = tilejson.into_config().unwrap();
        assert_eq!(config.minzoom(), 0);
        assert_eq!(config.maxzoom(), 10);
    }

    #[test]
    fn test_missing_vectors_rejected() {
        let tilejson: TileJson = serde_json::from_str(r#"{"minzoom": 0}"#).unwrap();
        assert!(matches!(
            tilejson.into_config(),
            Err(ConfigError::MissingTileJsonField("vectors"))
        ));
    }

    #[test]
    fn test_bounding_box_conversion() {
        let tilejson: TileJson = serde_json::from_str(DESCRIPTOR).unwrap();
        let bbox = tilejson.bounding_box().unwrap();
        assert_eq!(bbox.width(), 20.0);
        assert_eq!(bbox.height(), 10.0);
    }

    #[test]
    fn test_absent_bounds_covers_the_world() {
        let tilejson: TileJson =
            serde_json::from_str(r#"{"vectors": "http://t/{z}/{x}/{y}"}"#).unwrap();
        let bbox = tilejson.bounding_box().unwrap();
        assert_eq!(bbox.minx, -180.0);
        assert_eq!(bbox.maxx, 180.0);
        assert!((bbox.maxy - 85.0511).abs() < 1e-4);
        assert_eq!(bbox.miny, -bbox.maxy);
    }

    #[test]
    fn test_malformed_bounds_ignored() {
        let tilejson: TileJson = serde_json::from_str(
            r#"{"vectors": "http://t/{z}/{x}/{y}", "bounds": [10.0, 0.0, -10.0, 5.0]}"#,
        )
        .unwrap();
        assert!(tilejson.bounding_box().is_none());
    }

    #[test]
    fn test_fetch_descriptor() {
        let client = MockHttpClient {
            response: Ok(Bytes::from_static(DESCRIPTOR.as_bytes())),
        };
        let tilejson = fetch(&client, "http://tiles.test/index.json").unwrap();
        assert_eq!(tilejson.maxzoom, Some(14));
    }

    #[test]
    fn test_fetch_failure_propagates() {
        let client = MockHttpClient {
            response: Err(FetchError::Request("unreachable".to_string())),
        };
        assert!(matches!(
            fetch(&client, "http://tiles.test/index.json"),
            Err(ConfigError::Http(_))
        ));
    }

    #[test]
    fn test_malformed_descriptor_rejected() {
        let client = MockHttpClient {
            response: Ok(Bytes::from_static(b"not json at all")),
        };
        assert!(matches!(
            fetch(&client, "http://tiles.test/index.json"),
            Err(ConfigError::TileJson(_))
        ));
    }
}
