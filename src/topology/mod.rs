//! Topological encoding of GeoJSON.
//!
//! A [`Topology`] stores every boundary once as an *arc* (a polyline between
//! two junctions). Geometries refer to arcs by index, with `!i` meaning arc
//! `i` walked backwards. Shared boundaries between neighbouring regions are
//! therefore the same arc, which keeps them consistent when points are
//! removed by [`simplify`].
//!
//! The serialized form follows the TopoJSON format.

mod build;
mod feature;
mod simplify;

pub use build::topology;
pub use feature::feature;
pub use simplify::{presimplify, simplify, DEFAULT_MIN_WEIGHT};

use geojson::feature::Id;
use geojson::JsonObject;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// A TopoJSON position: `[x, y]`, or `[x, y, weight]` after presimplify.
pub type Position = Vec<f64>;

/// Reference to an arc; negative values (`!i`) walk arc `i` in reverse.
pub type ArcIndex = i32;

/// Errors that can occur while building or reading a topology.
#[derive(Debug, Clone)]
pub enum TopologyError {
    /// A position had fewer than two coordinates.
    InvalidPosition(usize),
    /// A coordinate was NaN or infinite.
    NonFiniteCoordinate,
    /// The named object does not exist in the topology.
    MissingObject(String),
}

impl std::fmt::Display for TopologyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyError::InvalidPosition(len) => {
                write!(f, "Position has {} coordinates, expected at least 2", len)
            }
            TopologyError::NonFiniteCoordinate => write!(f, "Coordinate is not finite"),
            TopologyError::MissingObject(name) => write!(f, "No topology object named {}", name),
        }
    }
}

impl std::error::Error for TopologyError {}

/// A set of named geometry objects sharing one pool of arcs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub struct Topology {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    pub objects: BTreeMap<String, TopoObject>,
    pub arcs: Vec<Vec<Position>>,
}

impl Topology {
    /// Looks up a top-level object by name.
    pub fn object(&self, name: &str) -> Result<&TopoObject, TopologyError> {
        self.objects
            .get(name)
            .ok_or_else(|| TopologyError::MissingObject(name.to_string()))
    }

    /// Total number of positions across all arcs.
    pub fn arc_position_count(&self) -> usize {
        self.arcs.iter().map(Vec::len).sum()
    }
}

/// A geometry together with the feature data it was built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopoObject {
    #[serde(flatten)]
    pub geometry: TopoGeometry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<JsonObject>,
}

impl TopoObject {
    pub(crate) fn bare(geometry: TopoGeometry) -> Self {
        Self {
            geometry,
            id: None,
            properties: None,
        }
    }
}

/// Geometry expressed in terms of arc references.
#[derive(Debug, Clone, PartialEq)]
pub enum TopoGeometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { arcs: Vec<ArcIndex> },
    MultiLineString { arcs: Vec<Vec<ArcIndex>> },
    Polygon { arcs: Vec<Vec<ArcIndex>> },
    MultiPolygon { arcs: Vec<Vec<Vec<ArcIndex>>> },
    GeometryCollection { geometries: Vec<TopoObject> },
    /// A feature without geometry, written as `"type": null`.
    Null,
}

impl TopoGeometry {
    fn type_name(&self) -> Option<&'static str> {
        Some(match self {
            TopoGeometry::Point { .. } => "Point",
            TopoGeometry::MultiPoint { .. } => "MultiPoint",
            TopoGeometry::LineString { .. } => "LineString",
            TopoGeometry::MultiLineString { .. } => "MultiLineString",
            TopoGeometry::Polygon { .. } => "Polygon",
            TopoGeometry::MultiPolygon { .. } => "MultiPolygon",
            TopoGeometry::GeometryCollection { .. } => "GeometryCollection",
            TopoGeometry::Null => return None,
        })
    }
}

impl Serialize for TopoGeometry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", &self.type_name())?;
        match self {
            TopoGeometry::Point { coordinates } => map.serialize_entry("coordinates", coordinates)?,
            TopoGeometry::MultiPoint { coordinates } => {
                map.serialize_entry("coordinates", coordinates)?
            }
            TopoGeometry::LineString { arcs } => map.serialize_entry("arcs", arcs)?,
            TopoGeometry::MultiLineString { arcs } | TopoGeometry::Polygon { arcs } => {
                map.serialize_entry("arcs", arcs)?
            }
            TopoGeometry::MultiPolygon { arcs } => map.serialize_entry("arcs", arcs)?,
            TopoGeometry::GeometryCollection { geometries } => {
                map.serialize_entry("geometries", geometries)?
            }
            TopoGeometry::Null => {}
        }
        map.end()
    }
}
