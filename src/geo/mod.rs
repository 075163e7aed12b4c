//! Geographic layers, projection and path generation.
//!
//! This module loads the map's GeoJSON layers, simplifies them, and turns
//! them into SVG path data under the shared projection.

mod convert;
mod layer;
mod path;
mod projection;

pub use convert::{convert_geo_json, position_count};
pub use layer::{CatalogError, FeatureCatalog, FeatureLayer, LayerName, LayerPath};
pub use path::{get_geo_path, GeoPath, DEFAULT_POINT_RADIUS};
pub use projection::{MapProjection, ALBERS_PARALLELS};
