//! Map layer catalog.
//!
//! The catalog holds the four layers the map draws. Each layer's GeoJSON is
//! simplified once when the catalog is built; its SVG path is produced on
//! first use and cached.

use super::convert::{convert_geo_json, position_count};
use super::path::GeoPath;
use crate::topology::TopologyError;
use geojson::{FeatureCollection, GeoJson};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

static NEIGHBORHOODS_JSON: &str = include_str!("../../assets/sfmaps/neighborhoods.json");
static STREETS_JSON: &str = include_str!("../../assets/sfmaps/streets.json");
static FREEWAYS_JSON: &str = include_str!("../../assets/sfmaps/freeways.json");
static ARTERIES_JSON: &str = include_str!("../../assets/sfmaps/arteries.json");

/// Name of a map layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerName {
    Neighborhoods,
    Streets,
    Freeways,
    Arteries,
}

impl LayerName {
    /// All layers, in drawing order (back to front).
    pub const ALL: [LayerName; 4] = [
        LayerName::Neighborhoods,
        LayerName::Streets,
        LayerName::Freeways,
        LayerName::Arteries,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerName::Neighborhoods => "neighborhoods",
            LayerName::Streets => "streets",
            LayerName::Freeways => "freeways",
            LayerName::Arteries => "arteries",
        }
    }

    /// Raw GeoJSON compiled into the crate for this layer.
    pub fn embedded_json(&self) -> &'static str {
        match self {
            LayerName::Neighborhoods => NEIGHBORHOODS_JSON,
            LayerName::Streets => STREETS_JSON,
            LayerName::Freeways => FREEWAYS_JSON,
            LayerName::Arteries => ARTERIES_JSON,
        }
    }

    /// Returns the default stroke color for this layer.
    pub fn default_color(&self) -> &'static str {
        match self {
            LayerName::Neighborhoods => "#b8b8c8",
            LayerName::Streets => "#d8d2c4",
            LayerName::Freeways => "#e08a3c",
            LayerName::Arteries => "#c9a86a",
        }
    }

    /// Returns the default fill for this layer; only regions are filled.
    pub fn default_fill(&self) -> &'static str {
        match self {
            LayerName::Neighborhoods => "#f2f0ea",
            _ => "none",
        }
    }
}

impl std::fmt::Display for LayerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LayerName {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayerName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| CatalogError::UnknownLayer(s.to_string()))
    }
}

/// Errors that can occur while building the catalog.
#[derive(Debug, Clone)]
pub enum CatalogError {
    /// The raw data for a layer is not valid GeoJSON.
    Parse { layer: LayerName, message: String },
    /// The layer's geometry could not be converted.
    Convert {
        layer: LayerName,
        source: TopologyError,
    },
    /// No data was supplied for a layer.
    MissingLayer(LayerName),
    /// Data was supplied twice for a layer.
    DuplicateLayer(LayerName),
    /// A layer name that is not part of the map.
    UnknownLayer(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Parse { layer, message } => {
                write!(f, "Failed to parse {} GeoJSON: {}", layer, message)
            }
            CatalogError::Convert { layer, source } => {
                write!(f, "Failed to convert {}: {}", layer, source)
            }
            CatalogError::MissingLayer(layer) => write!(f, "No data for layer {}", layer),
            CatalogError::DuplicateLayer(layer) => write!(f, "Duplicate data for layer {}", layer),
            CatalogError::UnknownLayer(name) => write!(f, "Unknown layer: {}", name),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Convert { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Rendering state of a layer's SVG path.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LayerPath {
    /// Not rendered yet.
    #[default]
    Pending,
    /// SVG path data.
    Rendered(String),
}

/// A simplified layer and its cached SVG path.
#[derive(Debug, Clone)]
pub struct FeatureLayer {
    pub name: LayerName,
    pub geo_json: FeatureCollection,
    pub path: LayerPath,
}

impl FeatureLayer {
    /// Creates a layer with an unrendered path.
    pub fn new(name: LayerName, geo_json: FeatureCollection) -> Self {
        Self {
            name,
            geo_json,
            path: LayerPath::Pending,
        }
    }

    /// Returns the SVG path data, rendering it on first use.
    pub fn render_path(&mut self, geo_path: &GeoPath<'_>) -> &str {
        if self.path == LayerPath::Pending {
            let d = geo_path.render(&self.geo_json);
            log::debug!("Rendered {} path ({} bytes)", self.name, d.len());
            self.path = LayerPath::Rendered(d);
        }
        match &self.path {
            LayerPath::Rendered(d) => d,
            LayerPath::Pending => "",
        }
    }

    /// Returns the cached SVG path data, if rendered.
    pub fn path(&self) -> Option<&str> {
        match &self.path {
            LayerPath::Rendered(d) => Some(d),
            LayerPath::Pending => None,
        }
    }

    /// Drops the cached path, e.g. after the projection changed.
    pub fn invalidate_path(&mut self) {
        self.path = LayerPath::Pending;
    }
}

/// The map's layers, keyed by name. Every [`LayerName`] is present.
#[derive(Debug, Clone)]
pub struct FeatureCatalog {
    layers: HashMap<LayerName, FeatureLayer>,
}

impl FeatureCatalog {
    /// Builds the catalog from the GeoJSON compiled into the crate.
    pub fn embedded() -> Result<Self, CatalogError> {
        let sources = LayerName::ALL.map(|name| (name, name.embedded_json()));
        Self::from_sources(&sources)
    }

    /// Builds the catalog from raw GeoJSON text, one entry per layer.
    pub fn from_sources(sources: &[(LayerName, &str)]) -> Result<Self, CatalogError> {
        let parsed = sources
            .iter()
            .map(|(layer, json)| {
                json.parse::<GeoJson>()
                    .map(|geojson| (*layer, geojson))
                    .map_err(|e| CatalogError::Parse {
                        layer: *layer,
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_geojson(parsed)
    }

    /// Builds the catalog from parsed GeoJSON, one entry per layer.
    pub fn from_geojson<I>(sources: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (LayerName, GeoJson)>,
    {
        let mut layers = HashMap::with_capacity(LayerName::ALL.len());

        for (name, datasource) in sources {
            if layers.contains_key(&name) {
                return Err(CatalogError::DuplicateLayer(name));
            }
            let geo_json = convert_geo_json(name.as_str(), &datasource).map_err(|source| {
                CatalogError::Convert {
                    layer: name,
                    source,
                }
            })?;
            log::info!(
                "Loaded layer {}: {} features, {} positions",
                name,
                geo_json.features.len(),
                position_count(&geo_json)
            );
            layers.insert(name, FeatureLayer::new(name, geo_json));
        }

        if let Some(missing) = LayerName::ALL.into_iter().find(|n| !layers.contains_key(n)) {
            return Err(CatalogError::MissingLayer(missing));
        }

        Ok(Self { layers })
    }

    pub fn get(&self, name: LayerName) -> Option<&FeatureLayer> {
        self.layers.get(&name)
    }

    pub fn get_mut(&mut self, name: LayerName) -> Option<&mut FeatureLayer> {
        self.layers.get_mut(&name)
    }

    /// Returns the layers in drawing order.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureLayer> {
        LayerName::ALL
            .into_iter()
            .filter_map(move |name| self.layers.get(&name))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Renders every layer's path that is not cached yet.
    pub fn render_paths(&mut self, geo_path: &GeoPath<'_>) {
        for layer in self.layers.values_mut() {
            layer.render_path(geo_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::MapProjection;

    const EMPTY: &str = r#"{"type":"FeatureCollection","features":[]}"#;

    #[test]
    fn test_embedded_catalog_has_every_layer() {
        let catalog = FeatureCatalog::embedded().unwrap();
        assert_eq!(catalog.len(), 4);
        for name in LayerName::ALL {
            let layer = catalog.get(name).unwrap();
            assert_eq!(layer.name, name);
            assert!(!layer.geo_json.features.is_empty());
            assert_eq!(layer.path, LayerPath::Pending);
        }
    }

    #[test]
    fn test_missing_layer_is_an_error() {
        let result = FeatureCatalog::from_sources(&[
            (LayerName::Neighborhoods, EMPTY),
            (LayerName::Streets, EMPTY),
            (LayerName::Freeways, EMPTY),
        ]);
        assert!(matches!(
            result,
            Err(CatalogError::MissingLayer(LayerName::Arteries))
        ));
    }

    #[test]
    fn test_duplicate_and_malformed_sources() {
        let duplicate = FeatureCatalog::from_sources(&[
            (LayerName::Streets, EMPTY),
            (LayerName::Streets, EMPTY),
        ]);
        assert!(matches!(
            duplicate,
            Err(CatalogError::DuplicateLayer(LayerName::Streets))
        ));

        let malformed = FeatureCatalog::from_sources(&[(LayerName::Freeways, "{")]);
        assert!(matches!(
            malformed,
            Err(CatalogError::Parse {
                layer: LayerName::Freeways,
                ..
            })
        ));
    }

    #[test]
    fn test_path_is_rendered_once_and_cached() {
        let mut catalog = FeatureCatalog::embedded().unwrap();
        let projection = MapProjection::default();
        let geo_path = GeoPath::new(&projection);

        let layer = catalog.get_mut(LayerName::Freeways).unwrap();
        assert!(layer.path().is_none());
        let d = layer.render_path(&geo_path).to_string();
        assert!(d.starts_with('M'));
        assert_eq!(layer.path(), Some(d.as_str()));

        layer.invalidate_path();
        assert!(layer.path().is_none());

        catalog.render_paths(&geo_path);
        assert!(catalog.iter().all(|layer| layer.path().is_some()));
    }

    #[test]
    fn test_layer_names_round_trip() {
        for name in LayerName::ALL {
            assert_eq!(name.as_str().parse::<LayerName>().unwrap(), name);
        }
        assert!("parks".parse::<LayerName>().is_err());
        assert_eq!(
            serde_json::to_string(&LayerName::Arteries).unwrap(),
            "\"arteries\""
        );
    }
}
