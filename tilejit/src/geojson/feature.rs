//! Typed features produced by the streaming parser.

/// An ordered sequence of (x, y) coordinate pairs forming one contiguous
/// line or boundary.
pub type Ring = Vec<(f64, f64)>;

/// A typed property value.
///
/// Property strings are re-encoded from the payload's declared source
/// encoding at ingestion time; by the time a `Value::String` exists it is
/// plain UTF-8.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

/// Geometry variants supported by the datasource.
///
/// A `Polygon` carries a single boundary ring: multi-ring polygons with
/// holes are collapsed to their outer ring and are not distinguished from a
/// plain line. This is a known limitation of the format handling, kept
/// rather than silently changed.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point { x: f64, y: f64 },
    LineString(Ring),
    Polygon(Ring),
    MultiLineString(Vec<Ring>),
}

/// One geometry plus its named attribute values.
///
/// `id` is a per-parse-run counter starting at 1; ids are only unique within
/// the payload that produced the feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    id: i64,
    geometry: Option<Geometry>,
    properties: Vec<(String, Value)>,
}

impl Feature {
    pub(crate) fn new(
        id: i64,
        geometry: Option<Geometry>,
        properties: Vec<(String, Value)>,
    ) -> Self {
        Self {
            id,
            geometry,
            properties,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// The feature's geometry, absent when the payload declared a geometry
    /// type this datasource does not support.
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// Properties in payload order.
    pub fn properties(&self) -> &[(String, Value)] {
        &self.properties
    }

    /// Looks up a property value by name.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}
