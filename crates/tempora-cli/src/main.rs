//! Tempora CLI - streaming temporal centrality from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Stream statistics
//! tempora inspect --edges edges.txt
//!
//! # One simulation pass, scores under out/original/{label}/{prefix}_{i}.csv
//! tempora run --edges edges.txt --config run.json --output out
//!
//! # Same, stopping after 5 snapshots, stats as JSON
//! tempora run --edges edges.txt --config run.json --output out --max-snapshots 5 --json
//! ```
//!
//! Edge files hold `time src trg` rows separated by spaces. Set `RUST_LOG`
//! (default `tempora=info`) to change log verbosity.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::RunConfig;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempora_core::formats::stream::read_stream;
use tempora_core::EdgeStream;
use tempora_sim::{FileExporter, GraphSimulator, SnapshotStats};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tempora")]
#[command(about = "Streaming temporal centrality", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulation pass and export score snapshots
    Run {
        /// Edge stream (`time src trg` per line)
        #[arg(short, long)]
        edges: PathBuf,

        /// JSON run configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Override the configured snapshot limit
        #[arg(long)]
        max_snapshots: Option<usize>,

        /// Override the configured edge limit
        #[arg(long)]
        max_edges: Option<usize>,

        /// Print snapshot statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show statistics about an edge stream
    Inspect {
        /// Edge stream (`time src trg` per line)
        #[arg(short, long)]
        edges: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tempora=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            edges,
            config,
            output,
            max_snapshots,
            max_edges,
            json,
        } => cmd_run(&edges, &config, &output, max_snapshots, max_edges, json),
        Commands::Inspect { edges } => cmd_inspect(&edges),
    }
}

fn load_stream(path: &Path) -> Result<EdgeStream> {
    let start = Instant::now();
    let stream = read_stream(path).with_context(|| format!("Failed to load {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        edges = stream.edge_count(),
        elapsed = ?start.elapsed(),
        "stream loaded"
    );
    Ok(stream)
}

fn cmd_run(
    edges: &Path,
    config: &Path,
    output: &Path,
    max_snapshots: Option<usize>,
    max_edges: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = RunConfig::from_path(config)?;
    let stream = config.filter_stream(load_stream(edges)?);
    let boundaries = config.boundaries.resolve()?;

    let replays = config.load_replays()?;
    let extra_nodes: Vec<_> = replays.iter().flat_map(|(_, nodes)| nodes.iter().copied()).collect();
    let computers = config.build_computers(&stream, &extra_nodes)?;

    let mut sim = GraphSimulator::new(stream, config.time_type);
    for computer in computers {
        sim.register(computer)?;
    }
    for (replay, _) in replays {
        sim.add_replay(replay)?;
    }

    let mut options = config.options();
    if max_snapshots.is_some() {
        options.max_snapshots = max_snapshots;
    }
    if max_edges.is_some() {
        options.max_edges = max_edges;
    }

    let start = Instant::now();
    let mut sink = FileExporter::new(output);
    let stats = sim.run_with_boundaries(&boundaries, options, &mut sink)?;
    let elapsed = start.elapsed();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
        println!("Exported {} snapshots to {} in {:.2?}", stats.len(), output.display(), elapsed);
    }
    Ok(())
}

fn print_stats(stats: &[SnapshotStats]) {
    println!(
        "{:>6} {:>14} {:>10} {:>10} {:>10} {:>10}",
        "index", "boundary", "nodes", "edges", "new nodes", "new edges"
    );
    for s in stats {
        println!(
            "{:>6} {:>14} {:>10} {:>10} {:>10} {:>10}",
            s.index, s.boundary, s.total_nodes, s.total_edges, s.snapshot_nodes, s.snapshot_edges
        );
    }
}

fn cmd_inspect(edges: &Path) -> Result<()> {
    let stream = load_stream(edges)?;

    println!("Edge Stream Statistics");
    println!("======================");
    println!("Edges:          {}", stream.edge_count());
    println!("Distinct edges: {}", stream.distinct_edges().len());
    println!("Timestamps:     {}", stream.timestamps().len());
    println!("Nodes:          {}", stream.nodes().len());
    match stream.time_range() {
        Some((first, last)) => println!("Time range:     {first} .. {last}"),
        None => println!("Time range:     -"),
    }
    Ok(())
}
