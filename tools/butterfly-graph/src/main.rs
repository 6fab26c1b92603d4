use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use butterfly_graph::{BaseGraph, CarEncoder, GraphStorage, OsmReader, ReaderConfig};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "butterfly-graph", version)]
#[command(
    about = "Build a routable street graph with turn restrictions from OpenStreetMap data",
    long_about = None
)]
struct Cli {
    /// Log verbosity (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a PBF file and build the graph in memory
    Build {
        /// Input PBF file
        input: PathBuf,

        /// Reader configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Threads decoding PBF blobs
        #[arg(long)]
        workers: Option<usize>,

        /// Decoded blocks buffered between decoder and reader
        #[arg(long)]
        queue_capacity: Option<usize>,

        /// Geometry simplification tolerance in metres (0 disables)
        #[arg(long)]
        max_way_point_distance: Option<f64>,

        /// Elevation tolerance in metres for simplification
        #[arg(long)]
        elevation_max_way_point_distance: Option<f64>,

        /// Write the read report as JSON to this file instead of stdout
        #[arg(short, long)]
        report: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Reader configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<ReaderConfig> {
    match path {
        Some(path) => ReaderConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(ReaderConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match cli.command {
        Commands::Build {
            input,
            config,
            workers,
            queue_capacity,
            max_way_point_distance,
            elevation_max_way_point_distance,
            report,
        } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(workers) = workers {
                config.worker_threads = workers;
            }
            if let Some(capacity) = queue_capacity {
                config.queue_capacity = capacity;
            }
            if let Some(max) = max_way_point_distance {
                config.max_way_point_distance = max;
            }
            if elevation_max_way_point_distance.is_some() {
                config.elevation_max_way_point_distance = elevation_max_way_point_distance;
            }
            config.validate().context("Invalid configuration")?;

            info!(input = %input.display(), "building graph");
            let mut reader = OsmReader::new(BaseGraph::new(), config)
                .with_encoder(CarEncoder)
                .with_pbf_file(&input);
            let read_report = reader
                .read_graph()
                .with_context(|| format!("Failed to read {}", input.display()))?;
            info!(
                turn_costs = reader.graph().turn_costs().len(),
                "graph built"
            );

            let json = serde_json::to_string_pretty(&read_report)?;
            match report {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("Failed to write report {}", path.display()))?;
                    info!(report = %path.display(), "report written");
                }
                None => println!("{json}"),
            }
        }
        Commands::Config { config } => {
            let config = load_config(config.as_ref())?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
