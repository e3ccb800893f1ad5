use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use multistop::profile::{Profile, Weight, DEFAULT_PROFILE};
use multistop::reader::{self, FileFormat};
use multistop::{topology, Metric, PlanOptions, SnapPolicy};

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct LoadError(PathBuf, #[source] reader::Error);

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1} line ends don't meet any other line")]
struct TopologyError(PathBuf, usize);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MetricArg {
    Planar,
    Geographic,
}

impl From<MetricArg> for Metric {
    fn from(value: MetricArg) -> Self {
        match value {
            MetricArg::Planar => Metric::Planar,
            MetricArg::Geographic => Metric::Geographic,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SnapArg {
    LowestId,
    Strict,
}

impl From<SnapArg> for SnapPolicy {
    fn from(value: SnapArg) -> Self {
        match value {
            SnapArg::LowestId => SnapPolicy::LowestId,
            SnapArg::Strict => SnapPolicy::Strict,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Auto,
    Geojson,
    GeojsonGz,
    GeojsonBz2,
}

impl From<FormatArg> for FileFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Auto => FileFormat::Unknown,
            FormatArg::Geojson => FileFormat::GeoJson,
            FormatArg::GeojsonGz => FileFormat::GeoJsonGz,
            FormatArg::GeojsonBz2 => FileFormat::GeoJsonBz2,
        }
    }
}

#[derive(Parser)]
struct Cli {
    /// The path to the GeoJSON file with road lines
    network: PathBuf,

    /// The path to the GeoJSON file with stop points
    stops: PathBuf,

    /// Attribute of stops defining the visiting order
    #[arg(long, default_value = "order_id")]
    order_field: String,

    /// Attribute of lines holding the road type
    #[arg(long, default_value = "road_type")]
    category_field: String,

    /// Attribute of lines holding a precomputed weight, used instead of the road type
    #[arg(long)]
    weight_field: Option<String>,

    /// Attribute of lines restricting the direction of travel
    #[arg(long)]
    direction_field: Option<String>,

    /// Weight of a road type, as CATEGORY=WEIGHT; replaces the built-in table
    #[arg(long = "weight", value_parser = parse_weight)]
    weights: Vec<(String, f32)>,

    /// Weight of lines with an unknown or missing road type
    #[arg(long)]
    default_weight: Option<f32>,

    /// Distance under which line vertices are merged into a single node
    #[arg(long, default_value_t = 0.0)]
    tolerance: f64,

    #[arg(long, value_enum, default_value_t = MetricArg::Planar)]
    metric: MetricArg,

    /// What to do with stops equally close to multiple nodes
    #[arg(long, value_enum, default_value_t = SnapArg::LowestId)]
    snap: SnapArg,

    /// Maximum number of search steps per leg
    #[arg(long, default_value_t = multistop::DEFAULT_STEP_LIMIT)]
    step_limit: usize,

    /// Fail if the network has line ends which don't meet any other line
    #[arg(long)]
    strict_topology: bool,

    /// Format (compression) of both input files
    #[arg(long, value_enum, default_value_t = FormatArg::Auto)]
    format: FormatArg,

    /// Where to write the route (defaults to standard output)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn parse_weight(s: &str) -> Result<(String, f32), String> {
    let (category, weight) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=WEIGHT, got {:?}", s))?;
    let weight: f32 = weight.parse().map_err(|e| format!("{}: {}", weight, e))?;
    Ok((category.to_string(), weight))
}

pub fn main() -> Result<(), Box<dyn Error>> {
    colog::init();
    let cli = Cli::parse();

    let weights: Vec<Weight<'_>> = cli
        .weights
        .iter()
        .map(|(category, weight)| Weight {
            category: category.as_str(),
            weight: *weight,
        })
        .collect();

    let profile = Profile {
        name: "cli",
        category_field: &cli.category_field,
        weight_field: cli.weight_field.as_deref(),
        direction_field: cli.direction_field.as_deref(),
        weights: if weights.is_empty() { DEFAULT_PROFILE.weights } else { &weights[..] },
        default_weight: cli.default_weight.unwrap_or(DEFAULT_PROFILE.default_weight),
    };

    let options = reader::Options {
        profile: &profile,
        file_format: cli.format.into(),
        metric: cli.metric.into(),
        tolerance: cli.tolerance,
    };

    let g = load_graph(&options, &cli.network)?;

    let dangles = topology::find_dangles(&g);
    for d in &dangles {
        log::warn!(
            "line feature {}: end at ({}, {}) doesn't meet any other line",
            d.feature_id,
            d.node.x,
            d.node.y,
        );
    }
    if cli.strict_topology && !dangles.is_empty() {
        return Err(TopologyError(cli.network.clone(), dangles.len()).into());
    }

    let stops = reader::read_stops_from_file(options.file_format, Some(cli.order_field.as_str()), &cli.stops)
        .map_err(|e| LoadError(cli.stops.clone(), e))?;

    let plan_options = PlanOptions {
        step_limit: cli.step_limit,
        snap_policy: cli.snap.into(),
    };
    let route = multistop::plan(&multistop::IndexedGraph::new(&g), &stops, &plan_options)?;

    let out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut out = BufWriter::new(out);
    serde_json::to_writer_pretty(&mut out, &route.to_geojson())?;
    writeln!(out)?;
    out.flush()?;

    Ok(())
}

fn load_graph<P: AsRef<Path>>(options: &reader::Options<'_>, path: P) -> Result<multistop::Graph, LoadError> {
    let mut g = multistop::Graph::new(options.metric);
    match reader::add_features_from_file(&mut g, options, path.as_ref()) {
        Ok(()) => Ok(g),
        Err(e) => Err(LoadError(PathBuf::from(path.as_ref()), e)),
    }
}
