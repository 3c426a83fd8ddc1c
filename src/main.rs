// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Aquanet CLI - manage and analyse a water distribution network

use anyhow::Result;
use aquanet::commands::{self, Workspace};
use aquanet::config::{self, Config};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aquanet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "AQUANET_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Network snapshot file override
    #[arg(long, env = "AQUANET_DATA_FILE", global = true)]
    data_file: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", global = true)]
    no_color: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage houses
    House {
        /// Action: add, remove, list
        action: String,

        /// House name
        name: Option<String>,

        /// Demand in L/s (for add)
        demand: Option<f64>,
    },

    /// Manage tanks
    Tank {
        /// Action: add, remove, level, list
        action: String,

        /// Tank name
        name: Option<String>,

        /// Capacity in L (for add)
        capacity: Option<f64>,

        /// Nodes to connect with empty pipes (repeatable)
        #[arg(long = "connect")]
        connect: Vec<String>,
    },

    /// Manage pipes
    Pipe {
        /// Action: add, remove, obstruct, reverse, list
        action: String,

        /// Upstream node
        from: Option<String>,

        /// Downstream node
        to: Option<String>,

        /// Capacity in L/s (for add) or obstruction percent, -1 blocks (for obstruct)
        #[arg(allow_negative_numbers = true)]
        value: Option<String>,
    },

    /// Check whether houses receive their demand
    Supply {
        /// Single house to check
        house: Option<String>,
    },

    /// Show the flow propagation result
    Flow,

    /// Find alternative supply routes
    Route {
        /// House to reroute (all under-served houses when omitted)
        house: Option<String>,
    },

    /// Maximum flow between two nodes
    MaxFlow {
        /// Source node
        source: String,

        /// Sink node
        sink: String,
    },

    /// Report duplicates, cycles, dangling references and shortfalls
    Diagnose,

    /// Suggest new tanks and tank connections
    Advise,

    /// Replace the network with a snapshot file
    Import {
        /// Snapshot to read
        file: PathBuf,
    },

    /// Export the network snapshot
    Export {
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show configuration
    Config {
        /// Configuration key
        key: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

fn init_logging(cli: &Cli, config: &Config) {
    let level = match cli.verbose {
        _ if cli.quiet => "error",
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref())?;
    init_logging(&cli, &config);

    let ws = Workspace::new(&config, cli.data_file.clone(), cli.json, cli.no_color);

    // Execute command
    match cli.command {
        Commands::House { action, name, demand } => commands::house::run(&ws, &action, name, demand),
        Commands::Tank { action, name, capacity, connect } => {
            commands::tank::run(&ws, &action, name, capacity, &connect)
        }
        Commands::Pipe { action, from, to, value } => commands::pipe::run(&ws, &action, from, to, value),
        Commands::Supply { house } => commands::supply::run(&ws, house),
        Commands::Flow => commands::flow::run(&ws),
        Commands::Route { house } => commands::route::run(&ws, house),
        Commands::MaxFlow { source, sink } => commands::max_flow::run(&ws, &source, &sink),
        Commands::Diagnose => commands::diagnose::run(&ws),
        Commands::Advise => commands::advise::run(&ws),
        Commands::Import { file } => commands::import::run(&ws, &file),
        Commands::Export { output } => commands::export::run(&ws, output),
        Commands::Config { key } => commands::config::run(&ws, &config, key.as_deref()),
        Commands::Completions { shell } => commands::completions::run(shell, &mut Cli::command()),
    }
}
