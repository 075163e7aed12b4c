use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};

use super::{ArcIndex, Position, TopoGeometry, TopoObject, Topology};

/// Converts a topology object back to GeoJSON.
///
/// A geometry collection becomes a feature collection with one feature per
/// member; anything else becomes a single feature.
pub fn feature(topology: &Topology, object: &TopoObject) -> GeoJson {
    match &object.geometry {
        TopoGeometry::GeometryCollection { geometries } => {
            GeoJson::FeatureCollection(FeatureCollection {
                bbox: None,
                features: geometries
                    .iter()
                    .map(|member| to_feature(topology, member))
                    .collect(),
                foreign_members: None,
            })
        }
        _ => GeoJson::Feature(to_feature(topology, object)),
    }
}

fn to_feature(topology: &Topology, object: &TopoObject) -> Feature {
    Feature {
        bbox: None,
        geometry: to_geometry(topology, &object.geometry),
        id: object.id.clone(),
        properties: object.properties.clone(),
        foreign_members: None,
    }
}

fn to_geometry(topology: &Topology, geometry: &TopoGeometry) -> Option<Geometry> {
    let value = match geometry {
        TopoGeometry::Point { coordinates } => Value::Point(coordinates.clone()),
        TopoGeometry::MultiPoint { coordinates } => Value::MultiPoint(coordinates.clone()),
        TopoGeometry::LineString { arcs } => Value::LineString(line(topology, arcs)),
        TopoGeometry::MultiLineString { arcs } => {
            Value::MultiLineString(arcs.iter().map(|a| line(topology, a)).collect())
        }
        TopoGeometry::Polygon { arcs } => Value::Polygon(polygon(topology, arcs)),
        TopoGeometry::MultiPolygon { arcs } => {
            Value::MultiPolygon(arcs.iter().map(|p| polygon(topology, p)).collect())
        }
        TopoGeometry::GeometryCollection { geometries } => Value::GeometryCollection(
            geometries
                .iter()
                .filter_map(|member| to_geometry(topology, &member.geometry))
                .collect(),
        ),
        TopoGeometry::Null => return None,
    };
    Some(Geometry::new(value))
}

/// Appends an arc to `points`, sharing the join point with the previous arc.
fn stitch(topology: &Topology, index: ArcIndex, points: &mut Vec<Position>) {
    let (id, reversed) = if index < 0 {
        (!index as usize, true)
    } else {
        (index as usize, false)
    };

    let Some(arc) = topology.arcs.get(id) else {
        log::warn!("Topology references missing arc {}", id);
        return;
    };

    points.pop();
    let xy = |p: &Position| p.iter().take(2).copied().collect::<Position>();
    if reversed {
        points.extend(arc.iter().rev().map(xy));
    } else {
        points.extend(arc.iter().map(xy));
    }
}

fn line(topology: &Topology, arcs: &[ArcIndex]) -> Vec<Position> {
    let mut points = Vec::new();
    for &index in arcs {
        stitch(topology, index, &mut points);
    }
    if let Some(first) = points.first().cloned() {
        while points.len() < 2 {
            points.push(first.clone());
        }
    }
    points
}

fn ring(topology: &Topology, arcs: &[ArcIndex]) -> Vec<Position> {
    let mut points = line(topology, arcs);
    if let Some(first) = points.first().cloned() {
        while points.len() < 4 {
            points.push(first.clone());
        }
    }
    points
}

fn polygon(topology: &Topology, rings: &[Vec<ArcIndex>]) -> Vec<Vec<Position>> {
    rings.iter().map(|arcs| ring(topology, arcs)).collect()
}
