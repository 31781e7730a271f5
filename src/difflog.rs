use anyhow::{Context, Result};
use chrono::{DateTime, Local, SecondsFormat};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only record of every computed temperature difference.
pub struct DifferenceLog {
    path: PathBuf,
}

impl DifferenceLog {
    pub fn new(path: impl AsRef<Path>) -> DifferenceLog {
        DifferenceLog {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn append(&self, difference: f64) -> Result<()> {
        self.append_at(Local::now(), difference)
    }

    fn append_at(&self, time: DateTime<Local>, difference: f64) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("cannot open {}", self.path.display()))?;
        writeln!(
            file,
            "{} temperature difference: {:.2}",
            time.to_rfc3339_opts(SecondsFormat::Secs, false),
            difference
        )
        .with_context(|| format!("cannot write {}", self.path.display()))?;
        Ok(())
    }
}
