use aircon_protocol::transmit::{Sink, DEFAULT_SPI_DEVICE, IR_BLASTER_PORT};
use clap::{Args, Parser};
use std::path::PathBuf;

const DEFAULT_URL: &str = "http://visualizee.die.upm.es:8000/render?format=json&target=visualizee.greencpd.b039.rack.r0001.server.host2.temperature.ambient.1.1000&from=-1min";

/// Reads ambient temperatures from Graphite and drives the air conditioner's
/// set-point over infrared.
#[derive(Debug, Clone, Parser)]
#[command(name = "aircon-control", version)]
pub struct Config {
    /// Graphite render URL of the reference temperature
    #[arg(long, default_value = DEFAULT_URL)]
    pub reference_url: String,

    /// Graphite render URL of the measured temperature
    #[arg(long, default_value = DEFAULT_URL)]
    pub measured_url: String,

    /// Use a fixed measured temperature instead of fetching it
    #[arg(long)]
    pub measured_value: Option<f64>,

    /// Seconds between control cycles
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub period_secs: u64,

    #[arg(long, default_value_t = 5)]
    pub http_timeout_secs: u64,

    /// Largest accepted Graphite response
    #[arg(long, default_value_t = 256 * 1024)]
    pub max_response_bytes: usize,

    /// File every computed temperature difference is appended to
    #[arg(long, default_value = "temp_dif.txt")]
    pub difference_log: PathBuf,

    /// Directory holding trama16.txt ... trama32.txt
    #[arg(long, default_value = "waveforms")]
    pub waveforms: PathBuf,

    #[command(flatten)]
    pub sink: SinkArgs,

    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, Args)]
pub struct SinkArgs {
    /// Network IR blaster receiving frames over UDP
    #[arg(long, conflicts_with_all = ["spi_device", "dry_run"])]
    pub ir_host: Option<String>,

    #[arg(long, default_value_t = IR_BLASTER_PORT)]
    pub ir_port: u16,

    /// Extra repetitions requested from the IR blaster
    #[arg(long, default_value_t = 0)]
    pub repeat: u32,

    /// SPI device the IR module is wired to [default: /dev/spidev0.0]
    #[arg(long, conflicts_with = "dry_run")]
    pub spi_device: Option<PathBuf>,

    /// Log frames instead of sending them
    #[arg(long)]
    pub dry_run: bool,
}

impl SinkArgs {
    pub fn sink(&self) -> Sink {
        if self.dry_run {
            Sink::Log
        } else if let Some(host) = &self.ir_host {
            Sink::Udp {
                host: host.clone(),
                port: self.ir_port,
                repeat: self.repeat,
            }
        } else {
            Sink::Spi(
                self.spi_device
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SPI_DEVICE)),
            )
        }
    }
}
