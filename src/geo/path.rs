//! SVG path generation for GeoJSON.
//!
//! Every coordinate goes through the shared [`MapProjection`]. Lines become
//! `M…L…` commands, polygon rings additionally close with `Z`, and points
//! are drawn as small circles.

use super::MapProjection;
use geo_types::Coord;
use geojson::{Feature, FeatureCollection, Value};
use std::fmt::Write;

/// Radius of the circle drawn for point geometries, in pixels.
pub const DEFAULT_POINT_RADIUS: f64 = 4.5;

/// Path data generator bound to a projection.
#[derive(Debug, Clone, Copy)]
pub struct GeoPath<'a> {
    projection: &'a MapProjection,
    point_radius: f64,
}

impl<'a> GeoPath<'a> {
    pub fn new(projection: &'a MapProjection) -> Self {
        Self {
            projection,
            point_radius: DEFAULT_POINT_RADIUS,
        }
    }

    /// Sets the radius used for point geometries.
    pub fn with_point_radius(mut self, radius: f64) -> Self {
        self.point_radius = radius;
        self
    }

    /// Returns the SVG path data for a feature collection.
    pub fn render(&self, collection: &FeatureCollection) -> String {
        let mut out = String::new();
        for feature in &collection.features {
            self.write_feature(&mut out, feature);
        }
        out
    }

    /// Returns the projected bounding box `[[x0, y0], [x1, y1]]`, or None
    /// when the collection has no coordinates.
    pub fn bounds(&self, collection: &FeatureCollection) -> Option<[[f64; 2]; 2]> {
        let mut bounds: Option<[[f64; 2]; 2]> = None;
        let mut extend = |c: Coord<f64>| {
            bounds = Some(match bounds {
                None => [[c.x, c.y], [c.x, c.y]],
                Some([[x0, y0], [x1, y1]]) => {
                    [[x0.min(c.x), y0.min(c.y)], [x1.max(c.x), y1.max(c.y)]]
                }
            });
        };
        for feature in &collection.features {
            if let Some(geometry) = &feature.geometry {
                for_each_position(&geometry.value, &mut |p| {
                    if let Some(c) = self.projection.project_position(p) {
                        extend(c);
                    }
                });
            }
        }
        bounds
    }

    fn write_feature(&self, out: &mut String, feature: &Feature) {
        if let Some(geometry) = &feature.geometry {
            self.write_value(out, &geometry.value);
        }
    }

    fn write_value(&self, out: &mut String, value: &Value) {
        match value {
            Value::Point(p) => self.write_point(out, p),
            Value::MultiPoint(ps) => {
                for p in ps {
                    self.write_point(out, p);
                }
            }
            Value::LineString(line) => self.write_line(out, line, false),
            Value::MultiLineString(lines) => {
                for line in lines {
                    self.write_line(out, line, false);
                }
            }
            Value::Polygon(rings) => {
                for ring in rings {
                    self.write_line(out, ring, true);
                }
            }
            Value::MultiPolygon(polygons) => {
                for ring in polygons.iter().flatten() {
                    self.write_line(out, ring, true);
                }
            }
            Value::GeometryCollection(geometries) => {
                for g in geometries {
                    self.write_value(out, &g.value);
                }
            }
        }
    }

    fn write_point(&self, out: &mut String, position: &[f64]) {
        let Some(c) = self.projection.project_position(position) else {
            return;
        };
        let r = self.point_radius;
        // Writing to a String cannot fail.
        let _ = write!(
            out,
            "M{},{}m0,{}a{},{} 0 1,1 0,{}a{},{} 0 1,1 0,{}z",
            c.x,
            c.y,
            r,
            r,
            r,
            -2.0 * r,
            r,
            r,
            2.0 * r
        );
    }

    fn write_line(&self, out: &mut String, positions: &[Vec<f64>], ring: bool) {
        let mut positions = positions;
        // The closing position of a ring is implied by Z.
        if ring && positions.len() > 1 && positions.first() == positions.last() {
            positions = &positions[..positions.len() - 1];
        }

        let mut first = true;
        for p in positions {
            let Some(c) = self.projection.project_position(p) else {
                continue;
            };
            let command = if first { 'M' } else { 'L' };
            let _ = write!(out, "{}{},{}", command, c.x, c.y);
            first = false;
        }
        if ring && !first {
            out.push('Z');
        }
    }
}

/// Returns the SVG path data for `geo_json` under `projection`.
pub fn get_geo_path(geo_json: &FeatureCollection, projection: &MapProjection) -> String {
    GeoPath::new(projection).render(geo_json)
}

fn for_each_position(value: &Value, f: &mut impl FnMut(&[f64])) {
    match value {
        Value::Point(p) => f(p),
        Value::MultiPoint(ps) | Value::LineString(ps) => ps.iter().for_each(|p| f(p)),
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            lines.iter().flatten().for_each(|p| f(p))
        }
        Value::MultiPolygon(polygons) => polygons.iter().flatten().flatten().for_each(|p| f(p)),
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                for_each_position(&g.value, f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::GeoJson;

    fn collection(json: &str) -> FeatureCollection {
        match json.parse::<GeoJson>().unwrap() {
            GeoJson::FeatureCollection(fc) => fc,
            other => panic!("expected a feature collection, got {:?}", other),
        }
    }

    #[test]
    fn test_line_and_ring_commands() {
        let projection = MapProjection::default();
        let fc = collection(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{},"geometry":{"type":"LineString",
                 "coordinates":[[-122.42,37.77],[-122.41,37.78]]}},
                {"type":"Feature","properties":{},"geometry":{"type":"Polygon",
                 "coordinates":[[[-122.42,37.77],[-122.41,37.77],[-122.41,37.78],[-122.42,37.77]]]}}
            ]}"#,
        );
        let d = get_geo_path(&fc, &projection);

        assert_eq!(d.matches('M').count(), 2);
        // The ring drops its closing position: three vertices, two L's.
        assert_eq!(d.matches('L').count(), 3);
        assert!(d.ends_with('Z'));
        assert_eq!(d.matches('Z').count(), 1);
    }

    #[test]
    fn test_point_is_a_circle() {
        let projection = MapProjection::default();
        let fc = collection(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[-122.4194,37.7749]}}
            ]}"#,
        );
        let p = projection.project(Coord {
            x: -122.4194,
            y: 37.7749,
        });
        let d = GeoPath::new(&projection).with_point_radius(2.0).render(&fc);
        assert_eq!(
            d,
            format!("M{},{}m0,2a2,2 0 1,1 0,-4a2,2 0 1,1 0,4z", p.x, p.y)
        );
    }

    #[test]
    fn test_empty_collection_renders_nothing() {
        let projection = MapProjection::default();
        let fc = collection(r#"{"type":"FeatureCollection","features":[]}"#);
        assert_eq!(get_geo_path(&fc, &projection), "");
        assert!(GeoPath::new(&projection).bounds(&fc).is_none());
    }

    #[test]
    fn test_bounds_contain_projected_center() {
        let projection = MapProjection::default();
        let fc = collection(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{},"geometry":{"type":"LineString",
                 "coordinates":[[-122.43,37.76],[-122.41,37.79]]}}
            ]}"#,
        );
        let [[x0, y0], [x1, y1]] = GeoPath::new(&projection).bounds(&fc).unwrap();
        assert!(x0 < 480.0 && 480.0 < x1);
        assert!(y0 < 250.0 && 250.0 < y1);
    }
}
