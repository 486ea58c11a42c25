//! The `petlens classify` command: one image, no broker.
//!
//! Runs the same fetch → classify → resolve stages the worker uses and
//! prints the result as JSON on stdout.

use clap::Args;
use petlens_core::worker::identify;
use petlens_core::{Config, HttpFetcher};

/// Arguments for the `classify` command.
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Image URL to fetch and classify
    pub url: String,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Execute the classify command.
pub async fn execute(args: ClassifyArgs, config: Config) -> anyhow::Result<()> {
    let classifier = super::load_classifier(&config)?;
    let fetcher = HttpFetcher::new(&config.fetch)?;

    let identification = identify(&fetcher, &classifier, &args.url).await?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&identification)?
    } else {
        serde_json::to_string(&identification)?
    };
    println!("{json}");
    Ok(())
}
