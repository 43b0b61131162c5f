//! JobScout - remote software job discovery daemon.
//!
//! Watches job boards for fresh remote software-engineering listings,
//! classifies them with a local language model, and persists the survivors.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobscout::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if cli::is_verbose() {
        "jobscout=info"
    } else {
        "jobscout=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Run CLI
    cli::run().await
}
