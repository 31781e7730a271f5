mod config;
mod control;
mod difflog;
mod graphite;

use crate::config::Config;
use crate::control::{Controller, CycleOutcome, Measured};
use crate::difflog::DifferenceLog;
use crate::graphite::GraphiteClient;
use aircon_protocol::waveform::{DirStore, WaveformDictionary};
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .context("initialising logging")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(&config.log_level)?;

    let dictionary = WaveformDictionary::new(DirStore::new(&config.waveforms));
    for (set_point, name) in dictionary.check() {
        warn!(%set_point, "waveform {} missing in {}", name, config.waveforms.display());
    }

    let measured = match config.measured_value {
        Some(value) => Measured::Fixed(value),
        None => Measured::Url(config.measured_url.clone()),
    };
    let client = GraphiteClient::new(
        Duration::from_secs(config.http_timeout_secs),
        config.max_response_bytes,
    )?;
    let sink = config.sink.sink();
    info!(?sink, "transmitting frames");

    let mut controller = Controller::new(
        client,
        config.reference_url.clone(),
        measured,
        DifferenceLog::new(&config.difference_log),
        dictionary,
        sink.open(),
    );

    if config.once {
        return match controller.run_cycle().await? {
            CycleOutcome::Sent { set_point, bytes } => {
                info!(%set_point, bytes, "command sent");
                Ok(())
            }
            CycleOutcome::NoCommand => bail!("no command generated"),
        };
    }

    info!(period_secs = config.period_secs, "starting control loop");
    controller.run(Duration::from_secs(config.period_secs)).await
}
