use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};

use geojson::{Feature, GeoJson, Geometry, Value};

use super::{ArcIndex, Position, TopoGeometry, TopoObject, Topology, TopologyError};

type Point = [f64; 2];

/// Bit pattern of a point, usable as a hash key.
type PointKey = (u64, u64);

fn key(p: &Point) -> PointKey {
    // -0.0 and 0.0 are the same place
    ((p[0] + 0.0).to_bits(), (p[1] + 0.0).to_bits())
}

type LineId = usize;
type RingId = usize;

/// Geometry with its lines and rings moved out into the builder.
enum Extracted {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(LineId),
    MultiLineString(Vec<LineId>),
    Polygon(Vec<RingId>),
    MultiPolygon(Vec<Vec<RingId>>),
    Collection(Vec<ExtractedObject>),
    Null,
}

struct ExtractedObject {
    geometry: Extracted,
    id: Option<geojson::feature::Id>,
    properties: Option<geojson::JsonObject>,
}

/// Builds a topology from named GeoJSON objects.
///
/// Feature collections become geometry collections whose members keep the
/// feature's id and properties.
pub fn topology<'a, I>(objects: I) -> Result<Topology, TopologyError>
where
    I: IntoIterator<Item = (&'a str, &'a GeoJson)>,
{
    let mut builder = TopologyBuilder::default();

    let extracted: Vec<(String, ExtractedObject)> = objects
        .into_iter()
        .map(|(name, geojson)| -> Result<_, TopologyError> {
            Ok((name.to_string(), builder.extract_geojson(geojson)?))
        })
        .collect::<Result<_, TopologyError>>()?;

    builder.find_junctions();
    builder.cut_and_dedup();

    let objects: BTreeMap<String, TopoObject> = extracted
        .into_iter()
        .map(|(name, object)| (name, builder.resolve(object)))
        .collect();

    log::debug!(
        "Built topology: {} objects, {} lines, {} rings, {} arcs, {} junctions",
        objects.len(),
        builder.lines.len(),
        builder.rings.len(),
        builder.arcs.len(),
        builder.junctions.len()
    );

    Ok(Topology {
        bbox: builder.bbox(),
        objects,
        arcs: builder
            .arcs
            .into_iter()
            .map(|arc| arc.into_iter().map(|p| p.to_vec()).collect())
            .collect(),
    })
}

#[derive(Default)]
struct TopologyBuilder {
    lines: Vec<Vec<Point>>,
    /// Rings without the closing point.
    rings: Vec<Vec<Point>>,
    /// Loose points, only needed for the bounding box.
    points: Vec<Point>,

    junctions: HashSet<PointKey>,

    arcs: Vec<Vec<Point>>,
    // Entry API lets us insert-or-get the canonical arc
    arc_ids: HashMap<Vec<PointKey>, usize>,
    line_arcs: Vec<Vec<ArcIndex>>,
    ring_arcs: Vec<Vec<ArcIndex>>,
}

impl TopologyBuilder {
    fn extract_geojson(&mut self, geojson: &GeoJson) -> Result<ExtractedObject, TopologyError> {
        match geojson {
            GeoJson::FeatureCollection(fc) => {
                let geometries = fc
                    .features
                    .iter()
                    .map(|f| self.extract_feature(f))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ExtractedObject {
                    geometry: Extracted::Collection(geometries),
                    id: None,
                    properties: None,
                })
            }
            GeoJson::Feature(f) => self.extract_feature(f),
            GeoJson::Geometry(g) => Ok(ExtractedObject {
                geometry: self.extract_geometry(g)?,
                id: None,
                properties: None,
            }),
        }
    }

    fn extract_feature(&mut self, feature: &Feature) -> Result<ExtractedObject, TopologyError> {
        let geometry = match &feature.geometry {
            Some(g) => self.extract_geometry(g)?,
            None => Extracted::Null,
        };
        Ok(ExtractedObject {
            geometry,
            id: feature.id.clone(),
            properties: feature.properties.clone(),
        })
    }

    fn extract_geometry(&mut self, geometry: &Geometry) -> Result<Extracted, TopologyError> {
        Ok(match &geometry.value {
            Value::Point(p) => {
                let point = to_point(p)?;
                self.points.push(point);
                Extracted::Point(point.to_vec())
            }
            Value::MultiPoint(ps) => {
                let mut coordinates = Vec::with_capacity(ps.len());
                for p in ps {
                    let point = to_point(p)?;
                    self.points.push(point);
                    coordinates.push(point.to_vec());
                }
                Extracted::MultiPoint(coordinates)
            }
            Value::LineString(line) => match self.extract_line(line)? {
                Some(id) => Extracted::LineString(id),
                None => Extracted::Null,
            },
            Value::MultiLineString(lines) => {
                let mut ids = Vec::with_capacity(lines.len());
                for line in lines {
                    if let Some(id) = self.extract_line(line)? {
                        ids.push(id);
                    }
                }
                Extracted::MultiLineString(ids)
            }
            Value::Polygon(rings) => Extracted::Polygon(self.extract_polygon(rings)?),
            Value::MultiPolygon(polygons) => {
                let mut extracted = Vec::with_capacity(polygons.len());
                for rings in polygons {
                    let ids = self.extract_polygon(rings)?;
                    if !ids.is_empty() {
                        extracted.push(ids);
                    }
                }
                Extracted::MultiPolygon(extracted)
            }
            Value::GeometryCollection(geometries) => {
                let mut members = Vec::with_capacity(geometries.len());
                for g in geometries {
                    members.push(ExtractedObject {
                        geometry: self.extract_geometry(g)?,
                        id: None,
                        properties: None,
                    });
                }
                Extracted::Collection(members)
            }
        })
    }

    fn extract_line(&mut self, line: &[Vec<f64>]) -> Result<Option<LineId>, TopologyError> {
        if line.is_empty() {
            return Ok(None);
        }
        let points = line.iter().map(|p| to_point(p)).collect::<Result<Vec<_>, _>>()?;
        self.lines.push(points);
        Ok(Some(self.lines.len() - 1))
    }

    fn extract_polygon(&mut self, rings: &[Vec<Vec<f64>>]) -> Result<Vec<RingId>, TopologyError> {
        let mut ids = Vec::with_capacity(rings.len());
        for ring in rings {
            let mut points = ring.iter().map(|p| to_point(p)).collect::<Result<Vec<_>, _>>()?;
            if points.len() > 1 && key(&points[0]) == key(&points[points.len() - 1]) {
                points.pop();
            }
            if points.is_empty() {
                continue;
            }
            self.rings.push(points);
            ids.push(self.rings.len() - 1);
        }
        Ok(ids)
    }

    /// Marks every point where lines or rings meet or part ways.
    ///
    /// Line endpoints are always junctions. Any other point is a junction
    /// when it is reached from different neighbours on different visits.
    fn find_junctions(&mut self) {
        let mut neighbours: HashMap<PointKey, (PointKey, PointKey)> = HashMap::new();
        let mut junctions = HashSet::new();

        let mut visit = |point: &Point, previous: &Point, next: &Point| {
            let (a, b) = (key(previous), key(next));
            let pair = if a <= b { (a, b) } else { (b, a) };
            match neighbours.entry(key(point)) {
                Entry::Occupied(entry) => {
                    if *entry.get() != pair {
                        junctions.insert(*entry.key());
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(pair);
                }
            }
        };

        for line in &self.lines {
            let n = line.len();
            for i in 1..n.saturating_sub(1) {
                visit(&line[i], &line[i - 1], &line[i + 1]);
            }
        }

        for ring in &self.rings {
            let n = ring.len();
            for i in 0..n {
                visit(&ring[i], &ring[(i + n - 1) % n], &ring[(i + 1) % n]);
            }
        }

        for line in &self.lines {
            junctions.insert(key(&line[0]));
            junctions.insert(key(&line[line.len() - 1]));
        }

        self.junctions = junctions;
    }

    fn cut_and_dedup(&mut self) {
        let lines = std::mem::take(&mut self.lines);
        for line in &lines {
            let mut arcs = Vec::new();
            let mut start = 0;
            for i in 1..line.len() {
                if i == line.len() - 1 || self.junctions.contains(&key(&line[i])) {
                    arcs.push(self.add_arc(line[start..=i].to_vec()));
                    start = i;
                }
            }
            if line.len() == 1 {
                arcs.push(self.add_arc(line.clone()));
            }
            self.line_arcs.push(arcs);
        }
        self.lines = lines;

        let rings = std::mem::take(&mut self.rings);
        for ring in &rings {
            let first_junction = ring.iter().position(|p| self.junctions.contains(&key(p)));

            let mut closed = match first_junction {
                Some(j) => rotated(ring, j),
                None => {
                    // Start at the smallest point so equal rings line up.
                    let min = (0..ring.len())
                        .min_by_key(|&i| key(&ring[i]))
                        .unwrap_or(0);
                    rotated(ring, min)
                }
            };
            closed.push(closed[0]);

            let mut arcs = Vec::new();
            let mut start = 0;
            for i in 1..closed.len() {
                if i == closed.len() - 1 || self.junctions.contains(&key(&closed[i])) {
                    arcs.push(self.add_arc(closed[start..=i].to_vec()));
                    start = i;
                }
            }
            self.ring_arcs.push(arcs);
        }
        self.rings = rings;
    }

    /// Returns the index of an equal arc in either direction, adding the arc
    /// if it is new.
    fn add_arc(&mut self, points: Vec<Point>) -> ArcIndex {
        let forward: Vec<PointKey> = points.iter().map(key).collect();
        let backward: Vec<PointKey> = forward.iter().rev().copied().collect();

        let (canonical, reversed) = if forward <= backward {
            (forward, false)
        } else {
            (backward, true)
        };

        let next_id = self.arcs.len();
        let id = match self.arc_ids.entry(canonical) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let mut points = points;
                if reversed {
                    points.reverse();
                }
                self.arcs.push(points);
                entry.insert(next_id);
                next_id
            }
        };

        let id = id as ArcIndex;
        if reversed {
            !id
        } else {
            id
        }
    }

    fn resolve(&self, object: ExtractedObject) -> TopoObject {
        let geometry = match object.geometry {
            Extracted::Point(coordinates) => TopoGeometry::Point { coordinates },
            Extracted::MultiPoint(coordinates) => TopoGeometry::MultiPoint { coordinates },
            Extracted::LineString(id) => TopoGeometry::LineString {
                arcs: self.line_arcs[id].clone(),
            },
            Extracted::MultiLineString(ids) => TopoGeometry::MultiLineString {
                arcs: ids.iter().map(|&id| self.line_arcs[id].clone()).collect(),
            },
            Extracted::Polygon(ids) => TopoGeometry::Polygon {
                arcs: ids.iter().map(|&id| self.ring_arcs[id].clone()).collect(),
            },
            Extracted::MultiPolygon(polygons) => TopoGeometry::MultiPolygon {
                arcs: polygons
                    .iter()
                    .map(|ids| ids.iter().map(|&id| self.ring_arcs[id].clone()).collect())
                    .collect(),
            },
            Extracted::Collection(members) => TopoGeometry::GeometryCollection {
                geometries: members.into_iter().map(|m| self.resolve(m)).collect(),
            },
            Extracted::Null => TopoGeometry::Null,
        };

        TopoObject {
            geometry,
            id: object.id,
            properties: object.properties,
        }
    }

    fn bbox(&self) -> Option<[f64; 4]> {
        let all = self
            .lines
            .iter()
            .chain(self.rings.iter())
            .flatten()
            .chain(self.points.iter());

        all.fold(None, |bbox, p| {
            Some(match bbox {
                None => [p[0], p[1], p[0], p[1]],
                Some([x0, y0, x1, y1]) => [x0.min(p[0]), y0.min(p[1]), x1.max(p[0]), y1.max(p[1])],
            })
        })
    }
}

fn to_point(position: &[f64]) -> Result<Point, TopologyError> {
    match position {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok([*x, *y]),
        [_, _, ..] => Err(TopologyError::NonFiniteCoordinate),
        _ => Err(TopologyError::InvalidPosition(position.len())),
    }
}

fn rotated(ring: &[Point], start: usize) -> Vec<Point> {
    ring[start..].iter().chain(ring[..start].iter()).copied().collect()
}
