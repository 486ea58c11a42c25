//! The `petlens run` command: consume, classify, publish.

use std::sync::Arc;

use clap::Args;
use petlens_core::{AmqpBroker, Config, HttpFetcher, StopReason, VariantConfig, Worker};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Output variant preset: `animal` (animal.identified) or `pet` (pet.identified, with breed)
    #[arg(long, value_parser = parse_variant)]
    pub variant: Option<VariantConfig>,

    /// Broker URI (overrides config and PETLENS_BROKER_URI)
    #[arg(long)]
    pub broker_uri: Option<String>,
}

fn parse_variant(s: &str) -> Result<VariantConfig, String> {
    VariantConfig::preset(s).ok_or_else(|| format!("unknown variant '{s}' (expected animal or pet)"))
}

/// Apply command-line overrides and re-check the result.
fn apply_overrides(args: RunArgs, mut config: Config) -> anyhow::Result<Config> {
    if let Some(variant) = args.variant {
        config.variant = variant;
    }
    if let Some(uri) = args.broker_uri {
        config.broker.uri = uri;
    }
    config.validate()?;
    Ok(config)
}

/// Execute the run command.
pub async fn execute(args: RunArgs, config: Config) -> anyhow::Result<()> {
    let config = apply_overrides(args, config)?;

    // Load the model before connecting so a missing file fails fast.
    let classifier = super::load_classifier(&config)?;
    let fetcher = HttpFetcher::new(&config.fetch)?;
    let broker = Arc::new(
        AmqpBroker::connect(&config.broker, &config.variant.output_queue).await?,
    );

    let mut worker = Worker::new(broker, Box::new(fetcher), classifier, config.variant.clone());
    let summary = worker.run_until(shutdown_signal()).await?;

    match summary.reason {
        StopReason::Shutdown => Ok(()),
        StopReason::ConsumerClosed => anyhow::bail!(
            "Broker closed the consumer after {} messages",
            summary.stats.received
        ),
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
