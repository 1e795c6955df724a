// Interfaces for the out-of-scope fetch collaborator.
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::error::Result;

/// Raw artifacts produced for one video id.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub audio: PathBuf,
    pub caption: Option<PathBuf>,
}

/// Fetches audio and caption files for a video id.
///
/// Implementations are expected to consult the [`Ledger`] before doing any
/// work and to append the id once the audio is safely on disk.
pub trait MediaFetcher {
    fn fetch(&self, video_id: &str) -> Result<FetchedMedia>;
}

/// Append-only store of already-processed ids.
pub trait Ledger {
    fn read_all(&self) -> Result<HashSet<String>>;
    fn append(&self, id: &str) -> Result<()>;
}

/// Ledger backed by a one-id-per-line text file (`downloaded.txt` style).
///
/// A missing file reads as empty rather than erroring, so the first run
/// needs no setup.
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Ledger for FileLedger {
    fn read_all(&self) -> Result<HashSet<String>> {
        if !self.path.exists() {
            return Ok(HashSet::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    fn append(&self, id: &str) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{id}")?;
        Ok(())
    }
}
