//! Firehose binary: load config, run the pipeline, exit.
//!
//! Exits 0 after a clean shutdown (signal or historical-replay
//! completion); exits non-zero on a fatal setup error before any worker
//! starts.

use clap::Parser;
use firehose::{Firehose, FirehoseConfig, KafkaSink, KafkaSource};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "firehose", about = "Mirror a Kafka topic between clusters")]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
}

fn load_config(path: &PathBuf) -> firehose::Result<FirehoseConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        firehose::FirehoseError::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    let config: FirehoseConfig = serde_json::from_str(&raw).map_err(|e| {
        firehose::FirehoseError::Config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

async fn run(args: Args) -> firehose::Result<()> {
    let config = load_config(&args.config)?;

    info!(
        topic = %config.topic,
        historical = config.is_historical(),
        "Loaded configuration"
    );

    let source = Arc::new(KafkaSource::new(&config));
    let sink = Arc::new(KafkaSink::new(&config)?);

    let mut engine = Firehose::new(config, source, sink)?;
    engine.start().await?;
    engine.wait().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!(error = %e, "Firehose failed");
        std::process::exit(1);
    }
}
