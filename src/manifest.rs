use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{GranaryError, Result};

/// One record of a filtered split manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitRecord {
    pub audio_filepath: PathBuf,
    pub audio_start_sec: f64,
    pub duration: f64,
    pub text: String,
}

/// Deterministic utterance identifier: basename plus start/end seconds at
/// 3 decimal places.
pub fn utterance_id(basename: &str, start_sec: f64, end_sec: f64) -> String {
    format!("{basename}-{start_sec:.3}-{end_sec:.3}")
}

/// Appends transcript lines to per-basename manifest files.
///
/// Writes are append-only across runs; re-running over identical inputs
/// duplicates lines rather than deduping or truncating.
#[derive(Debug, Clone)]
pub struct ManifestWriter {
    out_root: PathBuf,
}

impl ManifestWriter {
    pub fn new(out_root: impl Into<PathBuf>) -> Self {
        Self {
            out_root: out_root.into(),
        }
    }

    /// Compile every `output_filter/filtered_*_manifest.jsonl` under the
    /// work root into per-basename transcript files, mirroring the
    /// mode/channel path segment after the `work` component.
    pub fn compile(&self, work_root: &Path) -> Result<usize> {
        if !work_root.exists() {
            return Err(GranaryError::FileNotFound(work_root.display().to_string()));
        }

        let mut written = 0;
        for entry in WalkDir::new(work_root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() || !is_filtered_manifest(entry.path()) {
                continue;
            }
            written += self.compile_manifest(entry.path())?;
        }

        info!("Compiled {written} utterances under {}", self.out_root.display());
        Ok(written)
    }

    /// Compile one manifest file. Returns the number of lines appended.
    pub fn compile_manifest(&self, manifest: &Path) -> Result<usize> {
        let (mode, channel) = mode_and_channel(manifest)?;
        let out_dir = self.out_root.join(&mode).join(&channel);
        fs::create_dir_all(&out_dir)?;

        let mut written = 0;
        let reader = BufReader::new(fs::File::open(manifest)?);
        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let record: SplitRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(e) => {
                    warn!(
                        "Skipping line {} of {}: {e}",
                        line_num + 1,
                        manifest.display()
                    );
                    continue;
                }
            };

            self.append_record(&out_dir, &record)?;
            written += 1;
        }

        Ok(written)
    }

    fn append_record(&self, out_dir: &Path, record: &SplitRecord) -> Result<()> {
        let basename = record
            .audio_filepath
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| {
                GranaryError::Format(format!(
                    "audio_filepath has no stem: {}",
                    record.audio_filepath.display()
                ))
            })?;

        let start = record.audio_start_sec;
        let end = start + record.duration;
        let id = utterance_id(&basename, start, end);

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(out_dir.join(format!("{basename}.txt")))?;
        writeln!(file, "{id}\t{}", record.text.trim())?;
        Ok(())
    }
}

fn is_filtered_manifest(path: &Path) -> bool {
    let in_output_filter = path
        .parent()
        .and_then(|p| p.file_name())
        .is_some_and(|n| n == "output_filter");
    let name_matches = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("filtered_") && n.ends_with("_manifest.jsonl"));
    in_output_filter && name_matches
}

/// The two path components following `work` name the mode and channel.
/// A manifest outside a `work` tree is a hard error.
fn mode_and_channel(manifest: &Path) -> Result<(String, String)> {
    let components: Vec<&str> = manifest
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();

    let idx = components
        .iter()
        .position(|&c| c == "work")
        .ok_or_else(|| {
            GranaryError::Format(format!(
                "'work' not found in manifest path: {}",
                manifest.display()
            ))
        })?;

    match (components.get(idx + 1), components.get(idx + 2)) {
        (Some(mode), Some(channel)) => Ok((mode.to_string(), channel.to_string())),
        _ => Err(GranaryError::Format(format!(
            "No mode/channel after 'work' in: {}",
            manifest.display()
        ))),
    }
}
