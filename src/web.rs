//! Browser entry point and JavaScript exports.

use crate::config::MapConfig;
use crate::geo::{FeatureCatalog, GeoPath, LayerName, MapProjection};
use crate::net::{self, BrowserClient};
use crate::zoom::{dom, ElementRef, ZoomTargets};
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element};

/// Id of the `<svg>` element the map is drawn into.
const MAP_ELEMENT_ID: &str = "sfmap";
const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Forwards `log` records to the browser console.
struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!(
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        ));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&line),
            log::Level::Warn => web_sys::console::warn_1(&line),
            log::Level::Info => web_sys::console::info_1(&line),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

fn init_logging() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Debug);
    }
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    init_logging();

    let config = MapConfig::load();
    let projection = MapProjection::new(&config);
    let mut catalog =
        FeatureCatalog::embedded().map_err(|e| JsValue::from_str(&e.to_string()))?;

    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        log::warn!("No document, map not mounted");
        return Ok(());
    };
    let Some(root) = document.get_element_by_id(MAP_ELEMENT_ID) else {
        log::info!("No #{} element, map not mounted", MAP_ELEMENT_ID);
        return Ok(());
    };

    let geo_path = GeoPath::new(&projection);
    let mut targets = ZoomTargets::new(root.clone());
    for name in LayerName::ALL {
        let Some(layer) = catalog.get_mut(name) else {
            targets.insert(name.as_str(), None);
            continue;
        };
        let element = create_layer_element(&document, name, layer.render_path(&geo_path))?;
        root.append_child(&element)?;
        targets.insert(name.as_str(), Some(ElementRef::Single(element)));
    }

    dom::enable_zoom(targets, &config.zoom)?;
    log::info!("Map mounted with {} layers", catalog.len());
    Ok(())
}

fn create_layer_element(
    document: &Document,
    name: LayerName,
    d: &str,
) -> Result<Element, JsValue> {
    let path = document.create_element_ns(Some(SVG_NS), "path")?;
    path.set_attribute("class", name.as_str())?;
    path.set_attribute("d", d)?;
    path.set_attribute("fill", name.default_fill())?;
    path.set_attribute("stroke", name.default_color())?;
    Ok(path)
}

/// Fetches `url` and resolves to its `property` value.
#[wasm_bindgen(js_name = fetchJson)]
pub async fn fetch_json(url: String, property: String) -> Result<JsValue, JsValue> {
    let value = net::fetch_json(&BrowserClient, &url, &property)
        .await
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    js_sys::JSON::parse(&value.to_string())
}

/// Stores a JSON map configuration for the next page load.
///
/// Fields left out keep their defaults. Invalid documents are rejected
/// without touching the stored value.
#[wasm_bindgen(js_name = saveConfig)]
pub fn save_config(json: &str) -> Result<(), JsValue> {
    MapConfig::from_json_str(json)
        .and_then(|config| config.save())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
