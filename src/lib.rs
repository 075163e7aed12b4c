#![warn(clippy::all)]

//! SF Street Map - projection, layer simplification and pan/zoom for a
//! browser street map of San Francisco.
//!
//! The map draws four layers (neighborhoods, streets, freeways, arteries)
//! through one shared Albers projection. Each layer's GeoJSON is simplified
//! through a TopoJSON-style topology so shared boundaries stay shared, then
//! rendered to SVG path data. In the browser the rendered layers pan and
//! zoom with CSS transforms.

pub mod config;
pub mod geo;
pub mod net;
pub mod topology;
pub mod zoom;

#[cfg(target_arch = "wasm32")]
mod web;

pub use config::{ConfigError, MapConfig, ZoomConfig};
pub use geo::{
    convert_geo_json, get_geo_path, CatalogError, FeatureCatalog, FeatureLayer, GeoPath,
    LayerName, MapProjection,
};
pub use net::{fetch_json, FetchError, HttpClient};
pub use zoom::{enable_zoom, zoom_transform_fn, ZoomTransform};
