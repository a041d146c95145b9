mod app;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use eframe::egui::vec2;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use orbit_layout::graph::{Graph, NodePosition};
use orbit_layout::source::{GraphInput, RandomContent, generate_hierarchy, read_graph_file};
use orbit_layout::{LayoutConfig, LayoutSession};

const DEFAULT_SEED: u64 = 7;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// JSON file overriding layout parameters; missing keys keep their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the interactive viewer.
    View(GraphArgs),
    /// Run the layout headlessly and print node positions as JSON.
    Layout {
        #[command(flatten)]
        graph: GraphArgs,
        #[arg(long, default_value_t = 10_000)]
        max_ticks: u64,
        /// Also report the transform that fits the result into a WIDTH x HEIGHT viewport.
        #[arg(long, num_args = 2, value_names = ["WIDTH", "HEIGHT"])]
        viewport: Option<Vec<f32>>,
        #[arg(long)]
        pretty: bool,
    },
    /// Write a random hierarchy as JSON.
    Generate {
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Debug, Args)]
struct GraphArgs {
    /// Flat or hierarchical JSON graph; a random hierarchy is generated when omitted.
    #[arg(long, conflicts_with = "seed")]
    input: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Serialize)]
struct TransformReport {
    scale: f32,
    x: f32,
    y: f32,
}

#[derive(Serialize)]
struct LayoutReport {
    ticks: u64,
    converged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    transform: Option<TransformReport>,
    nodes: Vec<NodePosition>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<LayoutConfig> {
    let config = match path {
        Some(path) => LayoutConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => LayoutConfig::default(),
    };
    config.validate().context("invalid layout configuration")?;
    Ok(config)
}

fn load_graph(args: &GraphArgs) -> Result<Graph> {
    if let Some(path) = &args.input {
        return read_graph_file(path)
            .with_context(|| format!("failed to load graph from {}", path.display()));
    }
    let seed = args.seed.unwrap_or(DEFAULT_SEED);
    Graph::from_input(generate_hierarchy(seed)).context("generated hierarchy is malformed")
}

fn content_for(args: &GraphArgs) -> RandomContent {
    match args.seed {
        Some(seed) => RandomContent::seeded(seed),
        None => RandomContent::from_entropy(),
    }
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("failed to serialize output")?;

    match output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

fn run_layout(
    config: LayoutConfig,
    args: &GraphArgs,
    max_ticks: u64,
    viewport: Option<&[f32]>,
    pretty: bool,
) -> Result<()> {
    let graph = load_graph(args)?;
    let size = match viewport {
        Some(&[width, height]) => vec2(width, height),
        Some(_) => return Err(anyhow!("--viewport expects WIDTH and HEIGHT")),
        None => vec2(960.0, 640.0),
    };
    let mut session = LayoutSession::new(config, graph, Box::new(content_for(args)), size)?;
    let summary = session.run_until_converged(max_ticks);
    info!(ticks = summary.ticks, converged = summary.converged, "layout finished");

    let transform = viewport.map(|_| {
        session.fit_to_graph(20.0);
        let transform = session.transform();
        TransformReport {
            scale: transform.scale,
            x: transform.translate.x,
            y: transform.translate.y,
        }
    });
    let report = LayoutReport {
        ticks: summary.ticks,
        converged: summary.converged,
        transform,
        nodes: session.graph().positions(),
    };
    write_json(&report, None, pretty)
}

fn run_generate(seed: u64, output: Option<&Path>, pretty: bool) -> Result<()> {
    let input: GraphInput = generate_hierarchy(seed);
    info!(seed, nodes = input.nodes.len(), "generated hierarchy");
    write_json(&input, output, pretty)
}

fn run_viewer(config: LayoutConfig, args: &GraphArgs) -> Result<()> {
    let graph = load_graph(args)?;
    let size = [1440.0, 920.0];
    let session = LayoutSession::new(
        config,
        graph,
        Box::new(content_for(args)),
        vec2(size[0], size[1]),
    )?;
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size(size),
        ..Default::default()
    };

    eframe::run_native(
        "orbit-layout",
        options,
        Box::new(move |cc| Ok(Box::new(app::OrbitApp::new(cc, session)))),
    )
    .map_err(|error| anyhow!("viewer failed: {error}"))
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::View(args) => run_viewer(config, &args),
        Command::Layout {
            graph,
            max_ticks,
            viewport,
            pretty,
        } => run_layout(config, &graph, max_ticks, viewport.as_deref(), pretty),
        Command::Generate {
            seed,
            output,
            pretty,
        } => run_generate(seed, output.as_deref(), pretty),
    }
}
