//! GeoJSON simplification through a topology.

use crate::topology::{self, TopologyError, DEFAULT_MIN_WEIGHT};
use geojson::{FeatureCollection, GeoJson, Value};

/// Simplifies `datasource` while keeping shared boundaries shared.
///
/// The data is wrapped in a topology under `keyname`, presimplified,
/// simplified with the default threshold and extracted again. A single
/// feature or geometry comes back as a one-element collection.
pub fn convert_geo_json(
    keyname: &str,
    datasource: &GeoJson,
) -> Result<FeatureCollection, TopologyError> {
    let topo = topology::topology([(keyname, datasource)])?;
    let topo = topology::simplify(topology::presimplify(topo), DEFAULT_MIN_WEIGHT);
    let object = topo.object(keyname)?;

    let collection = match topology::feature(&topo, object) {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(f) => FeatureCollection {
            bbox: None,
            features: vec![f],
            foreign_members: None,
        },
        GeoJson::Geometry(g) => FeatureCollection {
            bbox: None,
            features: vec![geojson::Feature::from(g)],
            foreign_members: None,
        },
    };

    log::debug!(
        "Converted {}: {} features, {} -> {} positions",
        keyname,
        collection.features.len(),
        geojson_position_count(datasource),
        position_count(&collection)
    );

    Ok(collection)
}

/// Number of positions in a feature collection.
pub fn position_count(collection: &FeatureCollection) -> usize {
    collection
        .features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .map(|g| value_position_count(&g.value))
        .sum()
}

fn geojson_position_count(geojson: &GeoJson) -> usize {
    match geojson {
        GeoJson::FeatureCollection(fc) => position_count(fc),
        GeoJson::Feature(f) => f
            .geometry
            .as_ref()
            .map_or(0, |g| value_position_count(&g.value)),
        GeoJson::Geometry(g) => value_position_count(&g.value),
    }
}

fn value_position_count(value: &Value) -> usize {
    match value {
        Value::Point(_) => 1,
        Value::MultiPoint(ps) | Value::LineString(ps) => ps.len(),
        Value::MultiLineString(lines) | Value::Polygon(lines) => lines.iter().map(Vec::len).sum(),
        Value::MultiPolygon(polygons) => polygons.iter().flatten().map(Vec::len).sum(),
        Value::GeometryCollection(geometries) => geometries
            .iter()
            .map(|g| value_position_count(&g.value))
            .sum(),
    }
}
