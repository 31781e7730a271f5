use crate::quantizer::{SetPoint, MAX_SET_POINT, MIN_SET_POINT};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Upper bound on bytes read from a waveform resource.
pub const MAX_SYMBOLS: usize = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    One,
    Zero,
    /// Any byte other than `'0'` or `'1'`; carries no bit.
    Ignored,
}

impl Symbol {
    pub fn from_byte(byte: u8) -> Symbol {
        match byte {
            b'1' => Symbol::One,
            b'0' => Symbol::Zero,
            _ => Symbol::Ignored,
        }
    }
}

/// Bit symbols describing the IR transmission for one set-point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveformSource {
    symbols: Vec<Symbol>,
}

impl WaveformSource {
    pub fn from_bytes(bytes: &[u8]) -> WaveformSource {
        WaveformSource {
            symbols: bytes.iter().copied().map(Symbol::from_byte).collect(),
        }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn bit_count(&self) -> usize {
        self.symbols
            .iter()
            .filter(|s| **s != Symbol::Ignored)
            .count()
    }
}

impl From<&str> for WaveformSource {
    fn from(text: &str) -> Self {
        WaveformSource::from_bytes(text.as_bytes())
    }
}

const WAVEFORM_NAMES: [&str; 17] = [
    "trama16.txt",
    "trama17.txt",
    "trama18.txt",
    "trama19.txt",
    "trama20.txt",
    "trama21.txt",
    "trama22.txt",
    "trama23.txt",
    "trama24.txt",
    "trama25.txt",
    "trama26.txt",
    "trama27.txt",
    "trama28.txt",
    "trama29.txt",
    "trama30.txt",
    "trama31.txt",
    "trama32.txt",
];

const _: () = assert!(WAVEFORM_NAMES.len() == (MAX_SET_POINT - MIN_SET_POINT + 1) as usize);

/// Resource name holding the waveform for `set_point`, `None` outside the
/// supported range.
pub fn waveform_name(set_point: i32) -> Option<&'static str> {
    let index = usize::try_from(set_point.checked_sub(MIN_SET_POINT)?).ok()?;
    WAVEFORM_NAMES.get(index).copied()
}

pub trait WaveformStore {
    /// Reads at most `limit` bytes of the named resource.
    fn load(&self, name: &str, limit: usize) -> io::Result<Vec<u8>>;
}

/// One file per set-point inside a directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl AsRef<Path>) -> DirStore {
        DirStore {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl WaveformStore for DirStore {
    fn load(&self, name: &str, limit: usize) -> io::Result<Vec<u8>> {
        let file = File::open(self.root.join(name))?;
        let mut bytes = Vec::with_capacity(limit);
        file.take(limit as u64).read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    waveforms: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.waveforms.insert(name.into(), bytes.into());
    }
}

impl WaveformStore for MemoryStore {
    fn load(&self, name: &str, limit: usize) -> io::Result<Vec<u8>> {
        match self.waveforms.get(name) {
            Some(bytes) => Ok(bytes[..bytes.len().min(limit)].to_vec()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no waveform named {name}"),
            )),
        }
    }
}

/// Looks up the waveform for a set-point. Sources are read from the store on
/// every call.
#[derive(Debug, Clone)]
pub struct WaveformDictionary<S> {
    store: S,
}

impl<S: WaveformStore> WaveformDictionary<S> {
    pub fn new(store: S) -> WaveformDictionary<S> {
        WaveformDictionary { store }
    }

    pub fn resolve(&self, set_point: i32) -> Option<WaveformSource> {
        let Some(name) = waveform_name(set_point) else {
            warn!(set_point, "no waveform defined for set-point");
            return None;
        };

        match self.store.load(name, MAX_SYMBOLS) {
            Ok(bytes) => {
                debug!(set_point, name, bytes = bytes.len(), "waveform loaded");
                Some(WaveformSource::from_bytes(&bytes))
            }
            Err(e) => {
                warn!(set_point, name, error = %e, "waveform unreadable");
                None
            }
        }
    }

    /// Set-points whose resource cannot be opened.
    pub fn check(&self) -> Vec<(SetPoint, &'static str)> {
        SetPoint::all()
            .filter_map(|set_point| {
                let name = waveform_name(set_point.degrees())?;
                self.store.load(name, 0).err().map(|_| (set_point, name))
            })
            .collect()
    }
}
