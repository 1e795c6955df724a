use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::audio::{check_ffmpeg, cut_segment};
use crate::caption::secs_to_millis;
use crate::config::ErrorPolicy;
use crate::error::{GranaryError, Result};

/// One JSONL manifest record driving a clip cut.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub audio_filepath: PathBuf,
    /// Start offset into the source, in seconds.
    pub offset: f64,
    /// Clip length, in seconds.
    pub duration: f64,
    #[serde(default)]
    pub segment_id: u64,
    #[serde(default)]
    pub text: Option<String>,
}

impl ManifestEntry {
    /// Deterministic output filename for this entry.
    ///
    /// Millisecond values are truncated so re-runs derive the same name.
    pub fn output_name(&self) -> Result<String> {
        let stem = self
            .audio_filepath
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| {
                GranaryError::Format(format!(
                    "audio_filepath has no stem: {}",
                    self.audio_filepath.display()
                ))
            })?;

        Ok(format!(
            "{}_seg{}_o{}ms_d{}ms.wav",
            stem,
            self.segment_id,
            secs_to_millis(self.offset),
            secs_to_millis(self.duration)
        ))
    }
}

/// Summary of one cutting run.
#[derive(Debug, Default)]
pub struct CutStats {
    pub cut: usize,
    pub skipped_existing: usize,
    pub failed: Vec<String>,
}

/// Cuts clips from a JSONL manifest, resumable by existence check.
#[derive(Debug, Clone)]
pub struct ClipCutter {
    policy: ErrorPolicy,
}

impl ClipCutter {
    pub fn new(policy: ErrorPolicy) -> Self {
        Self { policy }
    }

    /// Process every entry in the manifest.
    ///
    /// Outputs that already exist are skipped without invoking the
    /// extractor, so a killed run can be restarted over the same manifest.
    /// Unparseable lines are logged and dropped; extraction failures follow
    /// the configured policy.
    pub fn run(&self, manifest: &Path, out_dir: &Path) -> Result<CutStats> {
        if !manifest.exists() {
            return Err(GranaryError::FileNotFound(manifest.display().to_string()));
        }
        fs::create_dir_all(out_dir)?;

        let mut stats = CutStats::default();
        let mut ffmpeg_checked = false;

        let reader = BufReader::new(fs::File::open(manifest)?);
        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let entry: ManifestEntry = match serde_json::from_str(&line) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping manifest line {}: {e}", line_num + 1);
                    continue;
                }
            };

            self.cut_entry(&entry, out_dir, &mut stats, &mut ffmpeg_checked)?;
        }

        info!(
            "Cut {} clips, {} already present, {} failed",
            stats.cut,
            stats.skipped_existing,
            stats.failed.len()
        );
        Ok(stats)
    }

    fn cut_entry(
        &self,
        entry: &ManifestEntry,
        out_dir: &Path,
        stats: &mut CutStats,
        ffmpeg_checked: &mut bool,
    ) -> Result<()> {
        let name = match entry.output_name() {
            Ok(name) => name,
            Err(e) => {
                warn!("Skipping manifest entry: {e}");
                return Ok(());
            }
        };
        let out = out_dir.join(&name);

        if out.exists() {
            stats.skipped_existing += 1;
            return Ok(());
        }

        // Checked once, only when a cut is actually needed. A missing source
        // surfaces through cut_segment and follows the policy; a missing
        // ffmpeg is an environment problem and aborts regardless.
        if entry.audio_filepath.exists() && !*ffmpeg_checked {
            check_ffmpeg()?;
            *ffmpeg_checked = true;
        }

        if let Err(e) = cut_segment(&entry.audio_filepath, &out, entry.offset, entry.duration) {
            match self.policy {
                ErrorPolicy::FailFast => return Err(e),
                ErrorPolicy::Skip => {
                    warn!("Extraction failed for {name}: {e}");
                    stats.failed.push(name);
                    return Ok(());
                }
            }
        }

        // Sidecar transcript alongside the clip.
        if let Some(text) = entry.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            fs::write(out.with_extension("txt"), format!("{text}\n"))?;
        }

        stats.cut += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_output_name_truncates_millis() {
        let entry: ManifestEntry = serde_json::from_str(
            r#"{"audio_filepath":"/a/b.wav","offset":1.5,"duration":2.0,"segment_id":1,"text":"hi"}"#,
        )
        .unwrap();

        assert_eq!(entry.output_name().unwrap(), "b_seg1_o1500ms_d2000ms.wav");
    }

    #[test]
    fn test_segment_id_defaults_to_zero() {
        let entry: ManifestEntry =
            serde_json::from_str(r#"{"audio_filepath":"/a/talk.wav","offset":0.0,"duration":3.25}"#)
                .unwrap();

        assert_eq!(entry.segment_id, 0);
        assert!(entry.text.is_none());
        assert_eq!(entry.output_name().unwrap(), "talk_seg0_o0ms_d3250ms.wav");
    }

    #[test]
    fn test_run_skips_existing_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("clips");
        fs::create_dir_all(&out_dir).unwrap();

        // Pre-create the expected output so no extraction is attempted;
        // the source file does not even exist.
        fs::write(out_dir.join("b_seg1_o1500ms_d2000ms.wav"), b"RIFF").unwrap();

        let manifest = dir.path().join("manifest.jsonl");
        let mut f = fs::File::create(&manifest).unwrap();
        writeln!(
            f,
            r#"{{"audio_filepath":"/nonexistent/b.wav","offset":1.5,"duration":2.0,"segment_id":1,"text":"hi"}}"#
        )
        .unwrap();

        let cutter = ClipCutter::new(ErrorPolicy::FailFast);
        let stats = cutter.run(&manifest, &out_dir).unwrap();

        assert_eq!(stats.skipped_existing, 1);
        assert_eq!(stats.cut, 0);
        assert!(stats.failed.is_empty());
        // Pre-existing file untouched
        assert_eq!(fs::read(out_dir.join("b_seg1_o1500ms_d2000ms.wav")).unwrap(), b"RIFF");
    }

    #[test]
    fn test_run_drops_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("manifest.jsonl");
        fs::write(&manifest, "not json\n\n{\"also\": \"wrong shape\"}\n").unwrap();

        let cutter = ClipCutter::new(ErrorPolicy::FailFast);
        let stats = cutter.run(&manifest, dir.path()).unwrap();

        assert_eq!(stats.cut, 0);
        assert_eq!(stats.skipped_existing, 0);
    }

    #[test]
    fn test_run_missing_manifest_is_fatal() {
        let cutter = ClipCutter::new(ErrorPolicy::FailFast);
        let result = cutter.run(Path::new("/nonexistent/m.jsonl"), Path::new("/tmp"));
        assert!(matches!(result, Err(GranaryError::FileNotFound(_))));
    }

    #[test]
    fn test_skip_policy_collects_failures() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("manifest.jsonl");
        fs::write(
            &manifest,
            r#"{"audio_filepath":"/nonexistent/a.wav","offset":0.0,"duration":1.0}"#,
        )
        .unwrap();

        let cutter = ClipCutter::new(ErrorPolicy::Skip);
        let stats = cutter.run(&manifest, dir.path()).unwrap();

        assert_eq!(stats.failed, vec!["a_seg0_o0ms_d1000ms.wav".to_string()]);
        assert_eq!(stats.cut, 0);
    }

    #[test]
    fn test_fail_fast_policy_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("manifest.jsonl");
        fs::write(
            &manifest,
            r#"{"audio_filepath":"/nonexistent/a.wav","offset":0.0,"duration":1.0}"#,
        )
        .unwrap();

        let cutter = ClipCutter::new(ErrorPolicy::FailFast);
        assert!(cutter.run(&manifest, dir.path()).is_err());
    }
}
