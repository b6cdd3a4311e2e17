//! Streaming feature parser.
//!
//! Reconstructs features from the flat token-event stream of one tile
//! payload. Parse context is tracked by an explicit mode plus a coordinate
//! nesting counter rather than recursive descent, so memory use stays
//! proportional to one feature's geometry, not the whole document. All
//! state lives in a [`FeatureParser`] created fresh per payload; nothing is
//! shared across payloads or threads.

use encoding_rs::Encoding;
use tracing::{debug, warn};

use super::feature::{Feature, Geometry, Ring, Value};
use super::scanner::{JsonEvent, JsonScanner, ParseError};

/// Where in the `FeatureCollection → features[] → Feature` nesting the
/// parser currently is.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Outside,
    InFeatures,
    InFeature,
    InGeometry,
    InType,
    InCoordinates,
    InProperties,
}

/// Parses one payload into its feature list.
///
/// Fails with [`ParseError`] when the byte stream is not well-formed JSON or
/// a property value has an unsupported shape; features accumulated before
/// the error are discarded.
pub fn parse(data: &[u8], encoding: &'static Encoding) -> Result<Vec<Feature>, ParseError> {
    FeatureParser::new(data, encoding).run()
}

struct FeatureParser<'a> {
    scanner: JsonScanner<'a>,
    encoding: &'static Encoding,
    mode: Mode,
    property_name: String,
    geometry_tag: String,
    coordinate_depth: u32,
    /// Numbers seen since the innermost coordinate array opened; components
    /// past the second (elevation) are skipped.
    numbers_in_array: u32,
    /// Flat coordinate components grouped into rings as arrays open.
    rings: Vec<Vec<f64>>,
    properties: Vec<(String, Value)>,
    /// Whether the properties object itself is open; a second object start
    /// while in properties is a nested value, which is unsupported.
    in_properties_object: bool,
    next_id: i64,
    features: Vec<Feature>,
}

impl<'a> FeatureParser<'a> {
    fn new(data: &'a [u8], encoding: &'static Encoding) -> Self {
        Self {
            scanner: JsonScanner::new(data),
            encoding,
            mode: Mode::Outside,
            property_name: String::new(),
            geometry_tag: String::new(),
            coordinate_depth: 0,
            numbers_in_array: 0,
            rings: Vec::new(),
            properties: Vec::new(),
            in_properties_object: false,
            next_id: 1,
            features: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Feature>, ParseError> {
        loop {
            match self.scanner.next_event()? {
                JsonEvent::End => return Ok(self.features),
                event => self.handle(event)?,
            }
        }
    }

    fn unsupported_property(&self, shape: &str) -> ParseError {
        ParseError::new(
            format!(
                "unsupported {} value for property {:?}",
                shape, self.property_name
            ),
            self.scanner.offset(),
        )
    }

    fn handle(&mut self, event: JsonEvent) -> Result<(), ParseError> {
        match event {
            JsonEvent::Key(key) => self.on_key(key),
            JsonEvent::End => {}
            JsonEvent::StartObject => {
                match self.mode {
                    Mode::InProperties => {
                        if self.in_properties_object {
                            return Err(self.unsupported_property("object"));
                        }
                        self.in_properties_object = true;
                    }
                    // Feature, geometry, and collection objects carry no
                    // state of their own; keys drive the transitions.
                    _ => {}
                }
            }
            JsonEvent::EndObject => self.on_end_object(),
            JsonEvent::StartArray => {
                match self.mode {
                    Mode::InCoordinates => {
                        // A ring opens on the depth 1 -> 2 transition; the
                        // outermost coordinates array is just a wrapper.
                        if self.coordinate_depth == 1 {
                            self.rings.push(Vec::new());
                        }
                        self.coordinate_depth += 1;
                        self.numbers_in_array = 0;
                    }
                    Mode::InProperties => return Err(self.unsupported_property("array")),
                    _ => {}
                }
            }
            JsonEvent::EndArray => match self.mode {
                Mode::InCoordinates => {
                    self.coordinate_depth = self.coordinate_depth.saturating_sub(1);
                    self.numbers_in_array = 0;
                    if self.coordinate_depth == 0 {
                        self.mode = Mode::InGeometry;
                    }
                }
                Mode::InFeatures => self.mode = Mode::Outside,
                _ => {}
            },
            JsonEvent::String(bytes) => match self.mode {
                Mode::InType => {
                    self.geometry_tag = String::from_utf8_lossy(&bytes).into_owned();
                    self.mode = Mode::InGeometry;
                }
                Mode::InProperties => {
                    // Property strings are re-encoded from the declared
                    // source encoding immediately, not lazily.
                    let (decoded, _, _) = self.encoding.decode(&bytes);
                    self.store_property(Value::String(decoded.into_owned()));
                }
                _ => {}
            },
            JsonEvent::Number(n) => match self.mode {
                Mode::InCoordinates => self.on_coordinate(n),
                Mode::InProperties => self.store_property(Value::Number(n)),
                _ => {}
            },
            JsonEvent::Bool(b) => {
                if self.mode == Mode::InProperties {
                    self.store_property(Value::Bool(b));
                }
            }
            JsonEvent::Null => match self.mode {
                Mode::InProperties if self.in_properties_object => {
                    self.store_property(Value::Null)
                }
                // "geometry": null / "properties": null close the member
                // without an object ever opening.
                Mode::InProperties | Mode::InGeometry => self.mode = Mode::InFeature,
                _ => {}
            },
        }
        Ok(())
    }

    fn on_key(&mut self, key: String) {
        if self.mode == Mode::InProperties {
            self.property_name = key;
            return;
        }
        match key.as_str() {
            "features" => self.mode = Mode::InFeatures,
            "geometry" => self.mode = Mode::InGeometry,
            "type" if self.mode == Mode::InGeometry => self.mode = Mode::InType,
            "properties" => self.mode = Mode::InProperties,
            "coordinates" if self.mode == Mode::InGeometry => {
                self.mode = Mode::InCoordinates;
                self.coordinate_depth = 0;
                self.numbers_in_array = 0;
            }
            _ => {}
        }
    }

    fn on_end_object(&mut self) {
        match self.mode {
            Mode::InProperties | Mode::InGeometry => {
                self.in_properties_object = false;
                self.mode = Mode::InFeature;
            }
            Mode::InFeature => {
                // The feature object itself closed: materialize and emit.
                let geometry = materialize(&self.geometry_tag, std::mem::take(&mut self.rings));
                let properties = std::mem::take(&mut self.properties);
                self.features
                    .push(Feature::new(self.next_id, geometry, properties));
                self.next_id += 1;

                self.geometry_tag.clear();
                self.coordinate_depth = 0;
                self.mode = Mode::InFeatures;
            }
            _ => {}
        }
    }

    fn on_coordinate(&mut self, n: f64) {
        if self.numbers_in_array >= 2 {
            // Third (elevation) component: no supported geometry uses it.
            return;
        }
        self.numbers_in_array += 1;
        match self.coordinate_depth {
            // Bare pair, e.g. a Point's [x, y]: open ring 0 lazily.
            0 | 1 => {
                if self.rings.is_empty() {
                    self.rings.push(Vec::new());
                }
                self.rings[0].push(n);
            }
            // Pairs one level down (LineString) accumulate flat in ring 0.
            2 => {
                if self.rings.is_empty() {
                    self.rings.push(Vec::new());
                }
                self.rings[0].push(n);
            }
            // Deeper nesting (Polygon/MultiLineString rings): the ring most
            // recently opened.
            _ => {
                if let Some(ring) = self.rings.last_mut() {
                    ring.push(n);
                } else {
                    self.rings.push(vec![n]);
                }
            }
        }
    }

    fn store_property(&mut self, value: Value) {
        self.properties.push((self.property_name.clone(), value));
    }
}

/// Groups a flat component list into coordinate pairs, dropping a dangling
/// component if the count is odd.
fn pair_up(components: &[f64]) -> Ring {
    if components.len() % 2 != 0 {
        warn!(
            count = components.len(),
            "odd coordinate component count, dropping the last component"
        );
    }
    components
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}

/// Materializes the accumulated rings into a concrete geometry according to
/// the declared type tag.
///
/// Unknown tags leave the geometry absent; the feature is still emitted with
/// its properties intact. Polygons keep only ring 0: holes are collapsed
/// into the boundary, a known limitation of this format handling.
fn materialize(tag: &str, rings: Vec<Vec<f64>>) -> Option<Geometry> {
    match tag {
        "Point" => {
            let pairs = pair_up(rings.first()?);
            let (x, y) = pairs.first().copied().or_else(|| {
                warn!("Point geometry without a coordinate pair");
                None
            })?;
            Some(Geometry::Point { x, y })
        }
        "LineString" => {
            let pairs = pair_up(rings.first()?);
            if pairs.len() < 2 {
                warn!(points = pairs.len(), "LineString with fewer than 2 points");
                return None;
            }
            Some(Geometry::LineString(pairs))
        }
        "Polygon" => {
            let pairs = pair_up(rings.first()?);
            if pairs.len() < 2 {
                warn!(points = pairs.len(), "Polygon ring with fewer than 2 points");
                return None;
            }
            Some(Geometry::Polygon(pairs))
        }
        "MultiLineString" => {
            let lines: Vec<Ring> = rings
                .iter()
                .map(|ring| pair_up(ring))
                .filter(|pairs| !pairs.is_empty())
                .collect();
            if lines.is_empty() {
                warn!("MultiLineString without any points");
                return None;
            }
            Some(Geometry::MultiLineString(lines))
        }
        "" => None,
        other => {
            debug!(tag = other, "unsupported geometry type, emitting feature without geometry");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;

    fn parse_utf8(input: &str) -> Result<Vec<Feature>, ParseError> {
        parse(input.as_bytes(), UTF_8)
    }

    #[test]
    fn test_single_point_feature() {
        let features = parse_utf8(
            r#"{"features":[{"geometry":{"type":"Point","coordinates":[1.5,2.5]},"properties":{"name":"a"}}]}"#,
        )
        .unwrap();

        assert_eq!(features.len(), 1);
        let feature = &features[0];
        assert_eq!(feature.id(), 1);
        assert_eq!(feature.geometry(), Some(&Geometry::Point { x: 1.5, y: 2.5 }));
        assert_eq!(
            feature.property("name"),
            Some(&Value::String("a".to_string()))
        );
    }

    #[test]
    fn test_linestring() {
        let features = parse_utf8(
            r#"{"features":[{"geometry":{"type":"LineString","coordinates":[[0,0],[1,1],[2,0]]},"properties":{}}]}"#,
        )
        .unwrap();

        assert_eq!(
            features[0].geometry(),
            Some(&Geometry::LineString(vec![
                (0.0, 0.0),
                (1.0, 1.0),
                (2.0, 0.0)
            ]))
        );
    }

    #[test]
    fn test_polygon_keeps_only_boundary_ring() {
        // Holes are collapsed: only ring 0 survives materialization.
        let features = parse_utf8(
            r#"{"features":[{"geometry":{"type":"Polygon","coordinates":[[[0,0],[4,0],[4,4],[0,0]],[[1,1],[2,1],[2,2],[1,1]]]},"properties":{}}]}"#,
        )
        .unwrap();

        assert_eq!(
            features[0].geometry(),
            Some(&Geometry::Polygon(vec![
                (0.0, 0.0),
                (4.0, 0.0),
                (4.0, 4.0),
                (0.0, 0.0)
            ]))
        );
    }

    #[test]
    fn test_multilinestring_two_rings() {
        let features = parse_utf8(
            r#"{"features":[{"geometry":{"type":"MultiLineString","coordinates":[[[0,0],[1,1]],[[2,2],[3,3],[4,4]]]},"properties":{}}]}"#,
        )
        .unwrap();

        let Some(Geometry::MultiLineString(lines)) = features[0].geometry() else {
            panic!("expected MultiLineString");
        };
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 2);
        assert_eq!(lines[1].len(), 3);
    }

    #[test]
    fn test_multiple_features_ids_count_from_one() {
        let features = parse_utf8(
            r#"{"features":[
                {"geometry":{"type":"Point","coordinates":[0,0]},"properties":{}},
                {"geometry":{"type":"Point","coordinates":[1,1]},"properties":{}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(features.len(), 2);
        assert_eq!(features[0].id(), 1);
        assert_eq!(features[1].id(), 2);
    }

    #[test]
    fn test_property_value_types() {
        let features = parse_utf8(
            r#"{"features":[{"geometry":{"type":"Point","coordinates":[0,0]},"properties":{"s":"x","n":2.5,"b":false,"z":null}}]}"#,
        )
        .unwrap();

        let feature = &features[0];
        assert_eq!(feature.property("s"), Some(&Value::String("x".to_string())));
        assert_eq!(feature.property("n"), Some(&Value::Number(2.5)));
        assert_eq!(feature.property("b"), Some(&Value::Bool(false)));
        assert_eq!(feature.property("z"), Some(&Value::Null));
    }

    #[test]
    fn test_elevation_component_is_ignored() {
        let features = parse_utf8(
            r#"{"features":[{"geometry":{"type":"LineString","coordinates":[[0,0,99],[1,1,98]]},"properties":{}}]}"#,
        )
        .unwrap();

        assert_eq!(
            features[0].geometry(),
            Some(&Geometry::LineString(vec![(0.0, 0.0), (1.0, 1.0)]))
        );
    }

    #[test]
    fn test_unknown_geometry_type_keeps_properties() {
        let features = parse_utf8(
            r#"{"features":[{"geometry":{"type":"MultiPolygon","coordinates":[[[[0,0],[1,1]]]]},"properties":{"name":"kept"}}]}"#,
        )
        .unwrap();

        assert_eq!(features.len(), 1);
        assert_eq!(features[0].geometry(), None);
        assert_eq!(
            features[0].property("name"),
            Some(&Value::String("kept".to_string()))
        );
    }

    #[test]
    fn test_malformed_payload_yields_no_features() {
        let result = parse_utf8(r#"{"features":[{"geometry":"#);
        let err = result.unwrap_err();
        assert!(err.offset > 0);
    }

    #[test]
    fn test_nested_object_property_rejected() {
        let result = parse_utf8(
            r#"{"features":[{"geometry":{"type":"Point","coordinates":[0,0]},"properties":{"meta":{"a":1}}}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_nested_array_property_rejected() {
        let result = parse_utf8(
            r#"{"features":[{"geometry":{"type":"Point","coordinates":[0,0]},"properties":{"tags":[1,2]}}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_extra_top_level_keys_ignored() {
        let features = parse_utf8(
            r#"{"type":"FeatureCollection","generator":"test","features":[{"geometry":{"type":"Point","coordinates":[3,4]},"properties":{}}],"extra":123}"#,
        )
        .unwrap();
        assert_eq!(features.len(), 1);
    }

    #[test]
    fn test_trailing_garbage_tolerated() {
        let features = parse_utf8(
            "{\"features\":[{\"geometry\":{\"type\":\"Point\",\"coordinates\":[0,0]},\"properties\":{}}]} <!-- junk",
        )
        .unwrap();
        assert_eq!(features.len(), 1);
    }

    #[test]
    fn test_parsing_twice_is_structurally_equal() {
        let payload = r#"{"features":[
            {"geometry":{"type":"LineString","coordinates":[[0,0],[5,5]]},"properties":{"name":"road"}},
            {"geometry":{"type":"Point","coordinates":[9,9]},"properties":{"n":1}}
        ]}"#;

        let first = parse_utf8(payload).unwrap();
        let second = parse_utf8(payload).unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.geometry(), b.geometry());
            assert_eq!(a.properties(), b.properties());
        }
    }

    #[test]
    fn test_latin1_property_string_is_transcoded() {
        let encoding = Encoding::for_label(b"latin1").unwrap();
        let payload: Vec<u8> = [
            br#"{"features":[{"geometry":{"type":"Point","coordinates":[0,0]},"properties":{"name":"caf"#.as_ref(),
            &[0xe9],
            br#""}}]}"#.as_ref(),
        ]
        .concat();

        let features = parse(&payload, encoding).unwrap();
        assert_eq!(
            features[0].property("name"),
            Some(&Value::String("café".to_string()))
        );
    }

    #[test]
    fn test_geometry_type_after_coordinates() {
        // Key order inside the geometry object must not matter.
        let features = parse_utf8(
            r#"{"features":[{"geometry":{"coordinates":[1,2],"type":"Point"},"properties":{}}]}"#,
        )
        .unwrap();
        assert_eq!(features[0].geometry(), Some(&Geometry::Point { x: 1.0, y: 2.0 }));
    }

    #[test]
    fn test_empty_features_array() {
        let features = parse_utf8(r#"{"features":[]}"#).unwrap();
        assert!(features.is_empty());
    }

    #[test]
    fn test_null_geometry_keeps_properties() {
        let features = parse_utf8(
            r#"{"features":[{"properties":{"name":"bare"},"geometry":null}]}"#,
        )
        .unwrap();

        assert_eq!(features.len(), 1);
        assert_eq!(features[0].geometry(), None);
        assert_eq!(
            features[0].property("name"),
            Some(&Value::String("bare".to_string()))
        );
    }

    #[test]
    fn test_null_properties_does_not_merge_features() {
        // The first feature's closing brace must close the feature, not a
        // never-opened properties object.
        let features = parse_utf8(
            r#"{"features":[
                {"geometry":{"type":"Point","coordinates":[1,1]},"properties":null},
                {"geometry":{"type":"Point","coordinates":[2,2]},"properties":{"name":"b"}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(features.len(), 2);
        assert_eq!(features[0].geometry(), Some(&Geometry::Point { x: 1.0, y: 1.0 }));
        assert!(features[0].properties().is_empty());
        assert_eq!(features[1].geometry(), Some(&Geometry::Point { x: 2.0, y: 2.0 }));
        assert_eq!(
            features[1].property("name"),
            Some(&Value::String("b".to_string()))
        );
    }

    #[test]
    fn test_feature_without_geometry_or_properties_not_emitted() {
        let features = parse_utf8(r#"{"features":[{}]}"#).unwrap();
        assert!(features.is_empty());
    }
}
