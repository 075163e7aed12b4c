#![warn(clippy::all)]

//! sfmap - command line tools for the SF street map.
//!
//! Renders the embedded layers to an SVG document, exports a layer's
//! simplified TopoJSON, or fetches a property from a remote JSON document.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use clap::{crate_authors, crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
    use sfmap::geo::{FeatureCatalog, GeoPath, LayerName, MapProjection};
    use sfmap::net::{fetch_json, UreqClient};
    use sfmap::topology;
    use sfmap::MapConfig;
    use std::error::Error;
    use std::fmt::Write as _;
    use std::fs;
    use std::path::PathBuf;

    type CliResult = Result<(), Box<dyn Error>>;

    fn command() -> Command {
        Command::new("sfmap")
            .version(crate_version!())
            .author(crate_authors!())
            .about("San Francisco street map tools")
            .subcommand_required(true)
            .subcommand(
                Command::new("render")
                    .about("renders all layers to an SVG document")
                    .arg(
                        Arg::new("config")
                            .short('c')
                            .long("config")
                            .value_name("FILE")
                            .value_parser(value_parser!(PathBuf))
                            .help("JSON file overriding the map configuration")
                            .action(ArgAction::Set),
                    )
                    .arg(
                        Arg::new("output")
                            .short('o')
                            .long("output")
                            .value_name("FILE")
                            .value_parser(value_parser!(PathBuf))
                            .help("where to write the SVG (default: stdout)")
                            .action(ArgAction::Set),
                    ),
            )
            .subcommand(
                Command::new("topojson")
                    .about("prints a layer's simplified TopoJSON")
                    .arg(
                        Arg::new("layer")
                            .short('l')
                            .long("layer")
                            .value_name("NAME")
                            .value_parser(value_parser!(LayerName))
                            .help("neighborhoods, streets, freeways or arteries")
                            .required(true)
                            .action(ArgAction::Set),
                    ),
            )
            .subcommand(
                Command::new("fetch")
                    .about("prints a top-level property of a remote JSON document")
                    .arg(Arg::new("url").value_name("URL").required(true))
                    .arg(Arg::new("property").value_name("PROPERTY").required(true)),
            )
    }

    pub fn run() -> CliResult {
        match command().get_matches().subcommand() {
            Some(("render", matches)) => render(matches),
            Some(("topojson", matches)) => topojson(matches),
            Some(("fetch", matches)) => fetch(matches),
            _ => Ok(()),
        }
    }

    fn load_config(matches: &ArgMatches) -> Result<MapConfig, Box<dyn Error>> {
        match matches.get_one::<PathBuf>("config") {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
                let config = MapConfig::from_json_str(&content)?;
                log::info!("Loaded map config from {}", path.display());
                Ok(config)
            }
            None => Ok(MapConfig::load()),
        }
    }

    fn render(matches: &ArgMatches) -> CliResult {
        let config = load_config(matches)?;
        let projection = MapProjection::new(&config);
        let mut catalog = FeatureCatalog::embedded()?;
        let geo_path = GeoPath::new(&projection);
        catalog.render_paths(&geo_path);

        let svg = svg_document(&catalog, &config);
        match matches.get_one::<PathBuf>("output") {
            Some(path) => {
                fs::write(path, svg)
                    .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
                log::info!("Wrote {}", path.display());
            }
            None => println!("{}", svg),
        }
        Ok(())
    }

    /// Builds a standalone SVG document sized so the translate point is its
    /// center.
    fn svg_document(catalog: &FeatureCatalog, config: &MapConfig) -> String {
        let [cx, cy] = config.translate;
        let (width, height) = (cx * 2.0, cy * 2.0);
        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = width,
            h = height
        );
        for layer in catalog.iter() {
            let _ = writeln!(
                out,
                r#"  <path class="{}" fill="{}" stroke="{}" stroke-width="{}" d="{}"/>"#,
                layer.name,
                layer.name.default_fill(),
                layer.name.default_color(),
                config.zoom.stroke_width,
                layer.path().unwrap_or_default()
            );
        }
        out.push_str("</svg>");
        out
    }

    fn topojson(matches: &ArgMatches) -> CliResult {
        let name = matches
            .get_one::<LayerName>("layer")
            .copied()
            .ok_or("missing --layer")?;
        let geojson: geojson::GeoJson = name.embedded_json().parse()?;

        let topo = topology::topology([(name.as_str(), &geojson)])?;
        let topo = topology::simplify(
            topology::presimplify(topo),
            topology::DEFAULT_MIN_WEIGHT,
        );
        log::info!(
            "{}: {} arcs, {} positions",
            name,
            topo.arcs.len(),
            topo.arc_position_count()
        );
        println!("{}", serde_json::to_string(&topo)?);
        Ok(())
    }

    fn fetch(matches: &ArgMatches) -> CliResult {
        let (Some(url), Some(property)) = (
            matches.get_one::<String>("url"),
            matches.get_one::<String>("property"),
        ) else {
            return Err("URL and PROPERTY are required".into());
        };
        let client = UreqClient::default();
        let value = pollster::block_on(fetch_json(&client, url, property))?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();

    if let Err(e) = cli::run() {
        eprintln!("sfmap: {}", e);
        std::process::exit(1);
    }
}

// The browser entry point lives in the library.
#[cfg(target_arch = "wasm32")]
fn main() {}
