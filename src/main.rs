//! pycpg CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "pycpg")]
#[command(about = "Build code property graphs from Python sources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Parser configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Keep functions and variables with double-underscore names
    #[arg(long, global = true)]
    include_magic: bool,

    /// Glob of root-relative paths to skip (repeatable)
    #[arg(short, long, global = true)]
    exclude: Vec<String>,

    /// Number of parser worker threads
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Drop imports that do not resolve to a project module
    #[arg(long, global = true)]
    drop_unresolved: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file or project and write the graph as JSON
    Parse {
        /// Python file or project root
        path: PathBuf,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Parse a file or project and print graph statistics
    Summary {
        /// Python file or project root
        path: PathBuf,
    },
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON on stdout stays clean
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("pycpg={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let overrides = commands::Overrides {
        config: cli.config,
        include_magic: cli.include_magic,
        exclude: cli.exclude,
        workers: cli.workers,
        drop_unresolved: cli.drop_unresolved,
    };

    match cli.command {
        Commands::Parse { path, output } => commands::parse(&path, output.as_deref(), overrides),
        Commands::Summary { path } => commands::summary(&path, overrides),
        Commands::Version => {
            println!("pycpg v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
