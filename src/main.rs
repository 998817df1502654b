//! EDM CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "edm")]
#[command(about = "Entity data model description toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Project root holding the .edm cache (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Load model definitions and report what they contain
    Check {
        /// Model definition files (TOML)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print an outline of every loaded model
    Describe {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Resolve an entity set by name from a container, walking parent containers
    Resolve {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Full name of the container to start from, e.g. Sales.Main
        #[arg(short, long)]
        container: String,

        /// Entity set name
        #[arg(short, long)]
        set: String,
    },
    /// Write the property cache of every loaded model and verify it binds
    Cache {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Clear the cache
    Clear,
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "edm={log_level},edm_core={log_level},edm_loader={log_level}"
        )))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("EDM v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Check { files } => commands::check(&files),
        Commands::Describe { files } => commands::describe(&files),
        Commands::Resolve {
            files,
            container,
            set,
        } => commands::resolve(&files, &container, &set),
        Commands::Cache { files } => commands::cache(&cli.root, &files),
        Commands::Clear => commands::clear(&cli.root),
        Commands::Version => {
            println!("EDM v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
