use crate::frame::Frame;
use crate::protos::generated::ir::IrCommand;
use anyhow::{Context, Result};
use protobuf::Message;
use std::fs::OpenOptions;
use std::io::Write;
use std::net::UdpSocket;
use std::path::PathBuf;
use tracing::info;

pub const IR_BLASTER_PORT: u16 = 4220;
pub const DEFAULT_SPI_DEVICE: &str = "/dev/spidev0.0";

pub trait Transmitter {
    fn transmit(&mut self, frame: &Frame) -> Result<()>;
}

pub fn ir_command(frame: &Frame, repeat: u32) -> IrCommand {
    let mut msg = IrCommand::new();
    msg.set_frame(frame.as_bytes().to_vec());
    msg.set_repeat(repeat);
    msg
}

/// Network IR blaster (ESP8266) receiving protobuf `IrCommand`s over UDP.
pub struct UdpTransmitter {
    target: String,
    repeat: u32,
}

impl UdpTransmitter {
    pub fn new(host: &str, port: u16, repeat: u32) -> UdpTransmitter {
        UdpTransmitter {
            target: format!("{host}:{port}"),
            repeat,
        }
    }
}

impl Transmitter for UdpTransmitter {
    fn transmit(&mut self, frame: &Frame) -> Result<()> {
        let udp = UdpSocket::bind("0.0.0.0:0")?;
        let out_bytes: Vec<u8> = ir_command(frame, self.repeat).write_to_bytes()?;
        udp.send_to(&out_bytes, &self.target)
            .with_context(|| format!("sending frame to {}", self.target))?;
        info!(addr = %self.target, bytes = frame.len(), "frame sent");
        Ok(())
    }
}

/// IR module wired to a SPI character device; the frame goes out in one write.
pub struct SpiTransmitter {
    device: PathBuf,
}

impl SpiTransmitter {
    pub fn new(device: impl Into<PathBuf>) -> SpiTransmitter {
        SpiTransmitter {
            device: device.into(),
        }
    }
}

impl Transmitter for SpiTransmitter {
    fn transmit(&mut self, frame: &Frame) -> Result<()> {
        let mut dev = OpenOptions::new()
            .write(true)
            .open(&self.device)
            .with_context(|| format!("opening {}", self.device.display()))?;
        dev.write_all(frame.as_bytes())
            .with_context(|| format!("writing to {}", self.device.display()))?;
        dev.flush()?;
        info!(device = %self.device.display(), bytes = frame.len(), "frame written");
        Ok(())
    }
}

/// Dry run, only logs what would be sent.
pub struct LogTransmitter;

impl Transmitter for LogTransmitter {
    fn transmit(&mut self, frame: &Frame) -> Result<()> {
        info!(bytes = frame.len(), "dry run, frame: {}", frame.to_hex());
        Ok(())
    }
}

/// Where frames go.
#[derive(Debug, Clone, PartialEq)]
pub enum Sink {
    Udp { host: String, port: u16, repeat: u32 },
    Spi(PathBuf),
    Log,
}

impl Sink {
    pub fn open(self) -> Box<dyn Transmitter + Send> {
        match self {
            Sink::Udp { host, port, repeat } => Box::new(UdpTransmitter::new(&host, port, repeat)),
            Sink::Spi(device) => Box::new(SpiTransmitter::new(device)),
            Sink::Log => Box::new(LogTransmitter),
        }
    }
}
