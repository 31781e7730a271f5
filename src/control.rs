use crate::difflog::DifferenceLog;
use crate::graphite::GraphiteClient;
use aircon_protocol::command::create_command;
use aircon_protocol::quantizer::SetPoint;
use aircon_protocol::transmit::Transmitter;
use aircon_protocol::waveform::{WaveformDictionary, WaveformStore};
use anyhow::{anyhow, Context, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

pub enum Measured {
    Url(String),
    Fixed(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Sent { set_point: SetPoint, bytes: usize },
    NoCommand,
}

/// The set-point command follows the reference minus the measured temperature.
pub fn control_value(reference: f64, measured: f64) -> f64 {
    reference - measured
}

pub struct Controller<S> {
    client: GraphiteClient,
    reference_url: String,
    measured: Measured,
    log: DifferenceLog,
    dictionary: WaveformDictionary<S>,
    transmitter: Arc<Mutex<Box<dyn Transmitter + Send>>>,
}

impl<S: WaveformStore> Controller<S> {
    pub fn new(
        client: GraphiteClient,
        reference_url: String,
        measured: Measured,
        log: DifferenceLog,
        dictionary: WaveformDictionary<S>,
        transmitter: Box<dyn Transmitter + Send>,
    ) -> Controller<S> {
        Controller {
            client,
            reference_url,
            measured,
            log,
            dictionary,
            transmitter: Arc::new(Mutex::new(transmitter)),
        }
    }

    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let reference = self
            .client
            .fetch_latest(&self.reference_url)
            .await
            .context("reading reference temperature")?;
        let measured = match &self.measured {
            Measured::Fixed(value) => *value,
            Measured::Url(url) => {
                self.client
                    .fetch_latest(url)
                    .await
                    .context("reading measured temperature")?
                    .temperature
            }
        };

        let difference = control_value(reference.temperature, measured);
        info!(reference = reference.temperature, measured, difference, "control value");

        if let Err(e) = self.log.append(difference) {
            warn!("difference not logged: {e:#}");
        }

        let Some(command) = create_command(difference, &self.dictionary) else {
            return Ok(CycleOutcome::NoCommand);
        };
        let set_point = command.set_point;
        let bytes = command.frame.len();

        // UDP and SPI writes block.
        let transmitter = Arc::clone(&self.transmitter);
        tokio::task::spawn_blocking(move || {
            let mut transmitter = transmitter
                .lock()
                .map_err(|_| anyhow!("transmitter lock poisoned"))?;
            transmitter.transmit(&command.frame)
        })
        .await
        .context("transmit task failed")?
        .context("transmitting frame")?;

        Ok(CycleOutcome::Sent { set_point, bytes })
    }

    pub async fn run(&mut self, period: Duration) -> Result<()> {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.run_cycle().await {
                Ok(CycleOutcome::Sent { set_point, bytes }) => {
                    info!(%set_point, bytes, "cycle done")
                }
                Ok(CycleOutcome::NoCommand) => warn!("cycle skipped, no command generated"),
                Err(e) => error!("cycle skipped: {e:#}"),
            }
        }
    }
}
