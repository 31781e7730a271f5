use crate::frame::{encode, Frame, FrameError};
use crate::quantizer::{quantize, SetPoint};
use crate::waveform::{WaveformDictionary, WaveformSource, WaveformStore};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("no waveform available for set-point {0}")]
    UnsupportedSetPoint(i32),
    #[error("cannot encode waveform: {0}")]
    Encoding(#[from] FrameError),
}

/// Frame for one set-point, ready to hand to a transmitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub set_point: SetPoint,
    pub frame: Frame,
}

/// Quantizes `value`, resolves its waveform and packs it into a frame.
pub fn try_create_command<S: WaveformStore>(
    value: f64,
    dictionary: &WaveformDictionary<S>,
) -> Result<Command, CommandError> {
    build(value, dictionary, encode)
}

/// Like [`try_create_command`], but reports the failing stage in the log and
/// returns `None` instead of an error.
pub fn create_command<S: WaveformStore>(
    value: f64,
    dictionary: &WaveformDictionary<S>,
) -> Option<Command> {
    match try_create_command(value, dictionary) {
        Ok(command) => Some(command),
        Err(e @ CommandError::UnsupportedSetPoint(_)) => {
            error!(stage = "resolve", "{e}");
            None
        }
        Err(e @ CommandError::Encoding(_)) => {
            error!(stage = "encode", "{e}");
            None
        }
    }
}

fn build<S, E>(
    value: f64,
    dictionary: &WaveformDictionary<S>,
    encoder: E,
) -> Result<Command, CommandError>
where
    S: WaveformStore,
    E: FnOnce(&WaveformSource) -> Result<Frame, FrameError>,
{
    let set_point = quantize(value);
    info!(value, %set_point, "control value quantized");

    let source = dictionary
        .resolve(set_point.degrees())
        .ok_or(CommandError::UnsupportedSetPoint(set_point.degrees()))?;
    let frame = encoder(&source)?;
    info!(%set_point, bytes = frame.len(), "command frame ready");

    Ok(Command { set_point, frame })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::TERMINATOR;
    use crate::waveform::{waveform_name, MemoryStore};
    use std::cell::Cell;

    fn dictionary_with(entries: &[(i32, &str)]) -> WaveformDictionary<MemoryStore> {
        let mut store = MemoryStore::new();
        for (set_point, text) in entries {
            if let Some(name) = waveform_name(*set_point) {
                store.insert(name, *text);
            }
        }
        WaveformDictionary::new(store)
    }

    #[test]
    fn value_to_frame() -> anyhow::Result<()> {
        let dictionary = dictionary_with(&[(21, "1101 0000\n"), (22, "1111")]);

        let command = try_create_command(20.5, &dictionary)?;
        assert_eq!(command.set_point.degrees(), 21);
        assert_eq!(command.frame.as_bytes(), &[0xd0, TERMINATOR]);

        let command = try_create_command(21.74, &dictionary)?;
        assert_eq!(command.set_point.degrees(), 22);
        assert_eq!(command.frame.as_bytes(), &[0xf0, TERMINATOR]);
        Ok(())
    }

    #[test]
    fn clamped_values_use_range_ends() -> anyhow::Result<()> {
        let dictionary = dictionary_with(&[(16, "0000 0001"), (32, "1000 0000")]);
        assert_eq!(try_create_command(-5.0, &dictionary)?.frame.as_bytes(), &[0x01, TERMINATOR]);
        assert_eq!(try_create_command(80.0, &dictionary)?.frame.as_bytes(), &[0x80, TERMINATOR]);
        Ok(())
    }

    #[test]
    fn missing_waveform_skips_encoder() {
        let dictionary = dictionary_with(&[(21, "1")]);
        let called = Cell::new(false);
        let result = build(25.0, &dictionary, |source| {
            called.set(true);
            encode(source)
        });
        assert_eq!(result, Err(CommandError::UnsupportedSetPoint(25)));
        assert!(!called.get());
        assert_eq!(create_command(25.0, &dictionary), None);
    }

    #[test]
    fn oversized_waveform_is_no_result() {
        let bits = "1".repeat(800);
        let dictionary = dictionary_with(&[(20, bits.as_str())]);
        assert_eq!(
            try_create_command(20.0, &dictionary),
            Err(CommandError::Encoding(FrameError::BufferExhausted {
                capacity: crate::frame::FRAME_CAPACITY,
            }))
        );
        assert_eq!(create_command(20.0, &dictionary), None);
    }
}
