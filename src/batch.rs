use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::caption::parse_captions;
use crate::config::{Config, ErrorPolicy};
use crate::error::{GranaryError, Result};
use crate::segment::{write_segments_json, SegmentExtractor};

/// Statistics from one channel slicing run.
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    pub videos_processed: usize,
    pub videos_skipped: usize,
    pub videos_failed: usize,
    pub segments_written: usize,
    pub elapsed: Duration,
}

/// Drives CaptionParser and SegmentExtractor over a channel directory.
///
/// Expects `<output_dir>/<channel>/audio` and `.../subs`, matched by
/// filename stem; writes `.../segments/<video_id>/segments.json` (and
/// `wav/` clips when materializing). `segments.json` is fully overwritten
/// on every run; there is no resume guard for slicing.
pub struct BatchOrchestrator {
    channel_dir: PathBuf,
    extractor: SegmentExtractor,
    policy: ErrorPolicy,
    show_progress: bool,
}

impl BatchOrchestrator {
    pub fn new(config: &Config, channel: &str) -> Self {
        Self {
            channel_dir: config.output_dir.join(channel),
            extractor: SegmentExtractor::new(config.slice_sample_rate, config.slice_save_audio),
            policy: config.error_policy,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn run(&self) -> Result<BatchStats> {
        let start = Instant::now();

        let audio_dir = self.channel_dir.join("audio");
        let subs_dir = self.channel_dir.join("subs");
        let segments_dir = self.channel_dir.join("segments");
        fs::create_dir_all(&segments_dir)?;

        let audio_files = list_sorted_files(&audio_dir)?;
        info!(
            "Slicing {} audio files from {}",
            audio_files.len(),
            audio_dir.display()
        );

        let pb = if self.show_progress {
            let pb = ProgressBar::new(audio_files.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{bar:40.green} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            Some(pb)
        } else {
            None
        };

        let mut stats = BatchStats::default();

        for audio_file in &audio_files {
            let Some(video_id) = audio_file.file_stem().map(|s| s.to_string_lossy().to_string())
            else {
                continue;
            };

            if let Some(pb) = &pb {
                pb.set_message(video_id.clone());
            }

            let caption = match find_caption(&subs_dir, &video_id) {
                Ok(caption) => caption,
                Err(e @ GranaryError::MissingCaption(_)) => {
                    warn!("{e}, skipping");
                    stats.videos_skipped += 1;
                    if let Some(pb) = &pb {
                        pb.inc(1);
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };

            let content = fs::read_to_string(&caption)?;
            let cues = parse_captions(&content);

            let out_dir = segments_dir.join(&video_id);
            fs::create_dir_all(&out_dir)?;

            // Extraction failures follow the configured policy; IO and JSON
            // errors stay fatal either way.
            let descriptors = match self.extractor.run(audio_file, &cues, &out_dir) {
                Ok(descriptors) => descriptors,
                Err(e @ (GranaryError::Extraction(_) | GranaryError::Wav(_)))
                    if self.policy == ErrorPolicy::Skip =>
                {
                    warn!("Slicing failed for {video_id}: {e}");
                    stats.videos_failed += 1;
                    if let Some(pb) = &pb {
                        pb.inc(1);
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };
            write_segments_json(&out_dir, &descriptors)?;

            info!(
                "{video_id}: {} segments -> {}",
                descriptors.len(),
                out_dir.join("segments.json").display()
            );
            stats.videos_processed += 1;
            stats.segments_written += descriptors.len();
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        stats.elapsed = start.elapsed();
        Ok(stats)
    }
}

/// Sorted audio file listing; sorting keeps run order deterministic
/// instead of relying on directory iteration order.
fn list_sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Pick the caption for a video id: candidates are `subs/` files named
/// `<stem>.vtt` or `<stem>.<lang>.vtt`; the lexicographically first wins.
fn find_caption(subs_dir: &Path, stem: &str) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(subs_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            let name = match p.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => return false,
            };
            name.ends_with(".vtt") && name.starts_with(&format!("{stem}."))
        })
        .collect();

    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| GranaryError::MissingCaption(stem.to_string()))
}

/// Print a summary of the batch results.
pub fn print_summary(stats: &BatchStats) {
    println!();
    println!("  Videos processed:  {}", stats.videos_processed);
    println!("  Videos skipped:    {}", stats.videos_skipped);
    println!("  Videos failed:     {}", stats.videos_failed);
    println!("  Segments written:  {}", stats.segments_written);
    println!("  Elapsed:           {:.2}s", stats.elapsed.as_secs_f64());
    println!();
}
