use aircon_protocol::command::{try_create_command, Command};
use aircon_protocol::frame::encode;
use aircon_protocol::quantizer::SetPoint;
use aircon_protocol::transmit::{Sink, IR_BLASTER_PORT};
use aircon_protocol::waveform::{DirStore, WaveformDictionary, WaveformStore};
use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Encodes one set-point and sends it to the IR transmitter.
#[derive(Debug, Parser)]
#[command(name = "aircon-send", version)]
#[command(group(ArgGroup::new("input").required(true).args(["set_point", "value"])))]
#[command(group(ArgGroup::new("output").args(["host", "spi", "dump"])))]
struct Args {
    /// Set-point in degrees, 16 to 32
    #[arg(long, allow_negative_numbers = true)]
    set_point: Option<i32>,

    /// Control value, quantized to a set-point
    #[arg(long, allow_negative_numbers = true)]
    value: Option<f64>,

    /// Network IR blaster
    #[arg(long)]
    host: Option<String>,

    #[arg(long, default_value_t = IR_BLASTER_PORT)]
    port: u16,

    #[arg(long, default_value_t = 0)]
    repeat: u32,

    /// SPI device the IR module is wired to
    #[arg(long)]
    spi: Option<PathBuf>,

    /// Print the frame instead of sending it
    #[arg(long)]
    dump: bool,

    #[arg(long, default_value = "waveforms")]
    waveforms: PathBuf,
}

fn command_for<S: WaveformStore>(args: &Args, dictionary: &WaveformDictionary<S>) -> Result<Command> {
    if let Some(degrees) = args.set_point {
        let set_point = SetPoint::new(degrees).context("set-point must be within 16..=32")?;
        let source = dictionary
            .resolve(degrees)
            .with_context(|| format!("no waveform for set-point {degrees}"))?;
        let frame = encode(&source)?;
        return Ok(Command { set_point, frame });
    }
    let value = args.value.context("either --set-point or --value is required")?;
    Ok(try_create_command(value, dictionary)?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let dictionary = WaveformDictionary::new(DirStore::new(&args.waveforms));
    let command = command_for(&args, &dictionary)?;

    if args.dump {
        println!("set-point {}: {}", command.set_point, command.frame.to_hex());
        return Ok(());
    }

    let sink = match (&args.host, &args.spi) {
        (Some(host), _) => Sink::Udp {
            host: host.clone(),
            port: args.port,
            repeat: args.repeat,
        },
        (None, Some(device)) => Sink::Spi(device.clone()),
        (None, None) => Sink::Spi(PathBuf::from(aircon_protocol::transmit::DEFAULT_SPI_DEVICE)),
    };
    sink.clone().open().transmit(&command.frame)?;
    println!(
        "Set {} ({} bytes) -> {:?}",
        command.set_point,
        command.frame.len(),
        sink
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aircon_protocol::frame::TERMINATOR;
    use aircon_protocol::waveform::MemoryStore;
    use clap::CommandFactory;

    fn dictionary() -> WaveformDictionary<MemoryStore> {
        let mut store = MemoryStore::new();
        store.insert("trama18.txt", "0101 0101");
        store.insert("trama25.txt", "1");
        WaveformDictionary::new(store)
    }

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn explicit_set_point() -> Result<()> {
        let args = Args::try_parse_from(["aircon-send", "--set-point", "18", "--dump"])?;
        let command = command_for(&args, &dictionary())?;
        assert_eq!(command.set_point.degrees(), 18);
        assert_eq!(command.frame.as_bytes(), &[0x55, TERMINATOR]);
        Ok(())
    }

    #[test]
    fn quantized_value() -> Result<()> {
        let args = Args::try_parse_from(["aircon-send", "--value", "24.6", "--dump"])?;
        let command = command_for(&args, &dictionary())?;
        assert_eq!(command.set_point.degrees(), 25);
        Ok(())
    }

    #[test]
    fn rejects_bad_input() -> Result<()> {
        let args = Args::try_parse_from(["aircon-send", "--set-point", "40"])?;
        assert!(command_for(&args, &dictionary()).is_err());

        let args = Args::try_parse_from(["aircon-send", "--set-point", "20"])?;
        assert!(command_for(&args, &dictionary()).is_err());

        assert!(Args::try_parse_from(["aircon-send"]).is_err());
        assert!(Args::try_parse_from(["aircon-send", "--value", "20", "--set-point", "20"]).is_err());
        assert!(Args::try_parse_from(["aircon-send", "--value", "20", "--dump", "--host", "x"]).is_err());
        Ok(())
    }
}
