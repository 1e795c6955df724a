use std::fs;
use std::path::Path;

use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::audio::{check_ffmpeg, check_ffprobe, decode_to_wav, probe_audio};
use crate::caption::Cue;
use crate::error::{GranaryError, Result};

/// One sliced (or would-be) segment, in cue order.
#[derive(Debug, Clone)]
pub struct SegmentDescriptor {
    /// 1-based position within the video.
    pub index: usize,
    /// Source filename stem (video id).
    pub stem: String,
    /// Clip path: real when materialized, the bare `NNNN.wav` name otherwise.
    pub segment: String,
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub sample_rate: u32,
}

/// Record shape of one `segments.json` element.
#[derive(Debug, Serialize)]
struct SegmentRecord<'a> {
    segment: &'a str,
    text: &'a str,
    start_ms: u64,
    end_ms: u64,
}

/// Slices source audio into per-cue clips.
#[derive(Debug, Clone)]
pub struct SegmentExtractor {
    sample_rate: u32,
    materialize: bool,
}

impl SegmentExtractor {
    pub fn new(sample_rate: u32, materialize: bool) -> Self {
        Self {
            sample_rate,
            materialize,
        }
    }

    /// Produce one descriptor per cue, in input order.
    ///
    /// With materialization on, the source is decoded and resampled once,
    /// then each cue's half-open `[start_ms, end_ms)` interval is written to
    /// `<out_dir>/wav/NNNN.wav`. With it off, no audio is touched and the
    /// descriptor carries the hypothetical clip name.
    pub fn run(&self, source: &Path, cues: &[Cue], out_dir: &Path) -> Result<Vec<SegmentDescriptor>> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| {
                GranaryError::Format(format!("Audio path has no stem: {}", source.display()))
            })?;

        // Same validity policy on both paths, so the flag never changes
        // segment counts or boundaries. The parser already drops inverted
        // cues; this guards direct callers.
        let cues: Vec<&Cue> = cues
            .iter()
            .filter(|cue| {
                if cue.end_ms <= cue.start_ms {
                    warn!(
                        "Skipping cue of {}: inverted range {}..{}",
                        stem, cue.start_ms, cue.end_ms
                    );
                    return false;
                }
                true
            })
            .collect();

        if !self.materialize {
            return Ok(cues
                .iter()
                .copied()
                .enumerate()
                .map(|(i, cue)| self.descriptor(i, &stem, clip_name(i), cue))
                .collect());
        }

        check_ffmpeg()?;
        check_ffprobe()?;

        let handle = probe_audio(source)?;
        if handle.sample_rate != self.sample_rate {
            debug!(
                "Resampling {} from {} Hz to {} Hz",
                stem, handle.sample_rate, self.sample_rate
            );
        }

        let wav_dir = out_dir.join("wav");
        fs::create_dir_all(&wav_dir)?;

        // Decode once; slicing then happens on the in-memory sample buffer.
        let temp = TempDir::new()?;
        let decoded = temp.path().join("decoded.wav");
        decode_to_wav(source, &decoded, self.sample_rate)?;

        let reader = hound::WavReader::open(&decoded)?;
        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<_, _>>()?;

        let mut descriptors = Vec::with_capacity(cues.len());
        for (i, cue) in cues.iter().copied().enumerate() {
            let name = clip_name(i);
            let clip_path = wav_dir.join(&name);
            write_clip(&clip_path, &samples, spec, cue.start_ms, cue.end_ms)?;

            descriptors.push(self.descriptor(i, &stem, clip_path.display().to_string(), cue));
        }

        info!("Sliced {} segments from {}", descriptors.len(), stem);
        Ok(descriptors)
    }

    fn descriptor(&self, i: usize, stem: &str, segment: String, cue: &Cue) -> SegmentDescriptor {
        SegmentDescriptor {
            index: i + 1,
            stem: stem.to_string(),
            segment,
            text: cue.text.clone(),
            start_ms: cue.start_ms,
            end_ms: cue.end_ms,
            sample_rate: self.sample_rate,
        }
    }
}

/// 4-digit zero-padded, 1-based clip filename.
fn clip_name(index: usize) -> String {
    format!("{:04}.wav", index + 1)
}

fn write_clip(
    path: &Path,
    samples: &[i16],
    spec: hound::WavSpec,
    start_ms: u64,
    end_ms: u64,
) -> Result<()> {
    let start = ((start_ms * spec.sample_rate as u64) / 1000) as usize;
    let end = ((end_ms * spec.sample_rate as u64) / 1000) as usize;

    // Clamp to the buffer; captions can run past the audio tail.
    let start = start.min(samples.len());
    let end = end.min(samples.len());

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in &samples[start..end] {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Overwrite `segments.json` with the authoritative per-video record.
pub fn write_segments_json(out_dir: &Path, descriptors: &[SegmentDescriptor]) -> Result<()> {
    let records: Vec<SegmentRecord> = descriptors
        .iter()
        .map(|d| SegmentRecord {
            segment: &d.segment,
            text: &d.text,
            start_ms: d.start_ms,
            end_ms: d.end_ms,
        })
        .collect();

    let json = serde_json::to_string_pretty(&records)?;
    fs::write(out_dir.join("segments.json"), json)?;
    Ok(())
}
