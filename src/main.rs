use clap::Parser;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use netplan::config_loader;
use netplan::orchestrator::{generate_plan, OutputFormat};

/// IP addressing and static routing planner for multi-router topologies
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the topology configuration YAML file
    #[arg(short, long)]
    config: PathBuf,

    /// Write the plan to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Plan serialization format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,

    /// Seed for randomized allocation, overrides the config file
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Starting netplan");
    info!("Configuration file: {:?}", args.config);

    let mut config = config_loader::load_config(&args.config)?;
    config_loader::apply_seed_override(&mut config, args.seed);

    let report = generate_plan(&config, args.output.as_deref(), args.format)?;

    info!(
        "Planning completed: {} nodes, {} routes",
        report.nodes.len(),
        report.routing.route_count()
    );
    Ok(())
}
