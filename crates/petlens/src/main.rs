//! PetLens CLI - Identifies cats and dogs in uploaded images.
//!
//! PetLens consumes "image uploaded" events from a message broker, classifies
//! the referenced image with an ONNX model, and publishes an "animal
//! identified" (or "pet identified") event when it recognizes a cat or a dog.
//!
//! # Usage
//!
//! ```bash
//! # Run the worker against the configured broker
//! petlens run
//!
//! # Publish breed-bearing pet.identified events instead
//! petlens run --variant pet
//!
//! # Classify a single image without a broker
//! petlens classify https://example.com/cat.jpg
//!
//! # View configuration
//! petlens config show
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// PetLens - Cat and dog identification worker for image upload events.
#[derive(Parser, Debug)]
#[command(name = "petlens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "PETLENS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Consume image upload events and publish identifications
    Run(cli::run::RunArgs),

    /// Classify a single image URL and print the result
    Classify(cli::classify::ClassifyArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(petlens_core::Config::default_path);

    // Logging isn't initialized yet, so a bad config is reported with eprintln.
    let config = match petlens_core::Config::load_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Error: Failed to load config from {}: {e}",
                config_path.display()
            );
            std::process::exit(1);
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("PetLens v{}", petlens_core::VERSION);

    match cli.command {
        Commands::Run(args) => cli::run::execute(args, config).await,
        Commands::Classify(args) => cli::classify::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, config, &config_path).await,
    }
}
