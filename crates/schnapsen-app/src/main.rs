use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use schnapsen_agent::decision::{DecisionEngine, HttpPredictor};
use schnapsen_agent::dispatcher::{Dispatcher, Roster};

mod broker;
mod config;
mod logging;
mod net;

/// Broker-driven agent that plays Schnapsen for registered AI identities.
#[derive(Debug, Parser)]
#[command(
    name = "schnapsen-app",
    author,
    version,
    about = "Broker-driven Schnapsen playing agent"
)]
struct Cli {
    /// Path to the YAML roster of playable identities.
    #[arg(short, long, value_name = "FILE", default_value = "roster.yaml")]
    roster: PathBuf,

    /// Exit after validating the configuration and roster.
    #[arg(long)]
    validate_only: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::AppConfig::from_env()?;
    logging::init_logging(config.debug);

    let roster_file = config::RosterFile::from_path(&cli.roster)?;
    roster_file.validate()?;

    if cli.validate_only {
        println!(
            "Configuration and roster are valid ({} identities).",
            roster_file.identities.len()
        );
        return Ok(());
    }

    info!(identities = roster_file.identities.len(), "starting Schnapsen agent");
    debug!(
        host = config.host_addr.as_deref(),
        public = config.public_addr.as_deref(),
        private = config.private_addr.as_deref(),
        "match-serving passthrough addresses"
    );

    let predictor = HttpPredictor::new(
        &config.predictor_url,
        &config.predictor_token,
        config.predictor_timeout,
    )
    .context("building the predictor client")?;
    let engine = Arc::new(DecisionEngine::new(predictor));

    let dispatcher = Dispatcher::new(
        Roster::new(roster_file.identities),
        net::SocketConnector::new(),
        engine,
    );

    let broker = broker::Broker::connect(&config.amqp_url).await?;
    if let Some(queue) = config.registration_queue.as_deref() {
        broker.publish_profiles(queue, &dispatcher.profiles()).await?;
    }

    broker.consume_tasks(&config.task_queue, &dispatcher).await
}
