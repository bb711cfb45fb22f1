use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use roadnet::store::{self, FileFormat};
use roadnet::{Algorithm, Point, RoutingConfig};

#[derive(Parser)]
struct Cli {
    /// The path to the binary network file
    network_file: PathBuf,

    /// X coordinate of the start point
    start_x: f64,

    /// Y coordinate of the start point
    start_y: f64,

    /// X coordinate of the end point
    end_x: f64,

    /// Y coordinate of the end point
    end_y: f64,

    /// Container format of the network file: plain, gz or bz2
    #[arg(long, default_value = "plain")]
    format: String,

    /// Directory with per-link geometry files, required for skeleton
    /// network files
    #[arg(long)]
    geometry_dir: Option<PathBuf>,

    /// Search algorithm: dijkstra or astar
    #[arg(long, default_value = "astar")]
    algorithm: String,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    colog::init();
    let cli = Cli::parse();

    let format = match cli.format.as_str() {
        "plain" => FileFormat::Plain,
        "gz" => FileFormat::Gz,
        "bz2" => FileFormat::Bz2,
        other => return Err(format!("unknown file format: {other}").into()),
    };

    let network = match &cli.geometry_dir {
        Some(dir) => store::load_skeleton_from_file(&cli.network_file, format, dir)?,
        None => store::load_from_file(&cli.network_file, format)?,
    };

    let mut config = RoutingConfig::default();
    config.algorithm = cli.algorithm.parse::<Algorithm>()?;

    let result = network.search(
        Point::new(cli.start_x, cli.start_y, 0.0),
        Point::new(cli.end_x, cli.end_y, 0.0),
        &config,
    )?;
    log::info!(
        "route found: {:.1} m over {} links ({})",
        result.route_distance,
        result.links.len(),
        result.stats
    );

    println!("{{");
    println!("  \"type\": \"FeatureCollection\",");
    println!("  \"features\": [");

    let mut links = result.links.iter().peekable();
    while let Some(link) = links.next() {
        println!("    {{");
        println!("      \"type\": \"Feature\",");
        println!(
            "      \"properties\": {{\"link\": {}, \"reference\": \"{}\"}},",
            link.id,
            link.reference()
        );
        println!("      \"geometry\": {{");
        println!("        \"type\": \"LineString\",");
        println!("        \"coordinates\": [");

        let mut points = link
            .geometry()
            .expect("route links always carry geometry")
            .iter()
            .peekable();
        while let Some(p) = points.next() {
            let suffix = if points.peek().is_some() { "," } else { "" };
            println!("          [{}, {}]{}", p.x, p.y, suffix);
        }

        println!("        ]");
        println!("      }}");
        let suffix = if links.peek().is_some() { "," } else { "" };
        println!("    }}{suffix}");
    }

    println!("  ]");
    println!("}}");

    Ok(())
}
