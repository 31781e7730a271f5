use crate::waveform::{Symbol, WaveformSource, MAX_SYMBOLS};
use thiserror::Error;
use tracing::debug;

pub const FRAME_CAPACITY: usize = 100;
pub const TERMINATOR: u8 = b'\n';

const FIRST_BIT: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("waveform does not fit into a {capacity} byte frame")]
    BufferExhausted { capacity: usize },
}

/// Packed bytes ready for the IR transmitter, ending with [`TERMINATOR`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    length: usize,
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.length]
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn to_hex(&self) -> String {
        self.as_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Packs the bit symbols of `source` MSB first into a [`FRAME_CAPACITY`]
/// byte frame and appends the terminator.
///
/// Only the first [`MAX_SYMBOLS`] symbols are considered. Ignored symbols
/// leave the bit position untouched, and a trailing partial byte keeps its
/// unused low bits at zero.
pub fn encode(source: &WaveformSource) -> Result<Frame, FrameError> {
    pack(source, FRAME_CAPACITY)
}

fn pack(source: &WaveformSource, capacity: usize) -> Result<Frame, FrameError> {
    let exhausted = FrameError::BufferExhausted { capacity };
    let symbols = source.symbols();
    let symbols = &symbols[..symbols.len().min(MAX_SYMBOLS)];
    debug!(symbols = symbols.len(), "packing waveform");

    let mut data = vec![0u8; capacity];
    let mut mask = FIRST_BIT;
    let mut cursor = 0;

    for symbol in symbols {
        let set = match symbol {
            Symbol::One => true,
            Symbol::Zero => false,
            Symbol::Ignored => continue,
        };

        let byte = data.get_mut(cursor).ok_or(exhausted)?;
        if set {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }

        mask >>= 1;
        if mask == 0 {
            mask = FIRST_BIT;
            cursor += 1;
        }
    }

    // A partly filled byte is data; the terminator goes after it.
    if mask != FIRST_BIT {
        cursor += 1;
    }
    *data.get_mut(cursor).ok_or(exhausted)? = TERMINATOR;
    let length = cursor + 1;

    for (i, byte) in data[..length].iter().enumerate() {
        debug!("byte {i}: {byte:#04x}");
    }

    Ok(Frame { data, length })
}
