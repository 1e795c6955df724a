use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{GranaryError, Result};

use super::AudioHandle;

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg").arg("-version").output().map_err(|e| {
        GranaryError::Extraction(format!(
            "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(GranaryError::Extraction("FFmpeg check failed".to_string()));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Check if FFprobe is installed and accessible.
pub fn check_ffprobe() -> Result<()> {
    let output = Command::new("ffprobe").arg("-version").output().map_err(|e| {
        GranaryError::Extraction(format!(
            "FFprobe not found. Please install FFmpeg (includes FFprobe). Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(GranaryError::Extraction("FFprobe check failed".to_string()));
    }

    debug!("FFprobe is available");
    Ok(())
}

/// Probe sample rate and channel count of the first audio stream.
pub fn probe_audio(input: &Path) -> Result<AudioHandle> {
    if !input.exists() {
        return Err(GranaryError::FileNotFound(input.display().to_string()));
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=sample_rate,channels",
            "-of",
            "csv=s=,:p=0",
        ])
        .arg(input)
        .output()
        .map_err(|e| GranaryError::Extraction(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GranaryError::Extraction(format!("FFprobe failed: {stderr}")));
    }

    let info_str = String::from_utf8_lossy(&output.stdout);
    let parts: Vec<&str> = info_str.trim().split(',').collect();

    if parts.len() < 2 {
        return Err(GranaryError::Extraction(format!(
            "Failed to parse audio info: {}",
            info_str.trim()
        )));
    }

    let sample_rate: u32 = parts[0]
        .parse()
        .map_err(|e| GranaryError::Extraction(format!("Failed to parse sample rate: {e}")))?;

    let channels: u16 = parts[1]
        .parse()
        .map_err(|e| GranaryError::Extraction(format!("Failed to parse channels: {e}")))?;

    Ok(AudioHandle {
        path: input.to_path_buf(),
        sample_rate,
        channels,
    })
}

/// Decode (and resample if needed) a whole source file into 16-bit PCM
/// mono WAV at the target rate.
pub fn decode_to_wav(input: &Path, output: &Path, sample_rate: u32) -> Result<()> {
    if !input.exists() {
        return Err(GranaryError::FileNotFound(input.display().to_string()));
    }

    debug!(
        "Decoding {} to {} Hz mono WAV",
        input.display(),
        sample_rate
    );

    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
        .arg(input)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar"])
        .arg(sample_rate.to_string())
        .args(["-ac", "1"])
        .arg(output)
        .status()
        .map_err(|e| GranaryError::Extraction(format!("Failed to run FFmpeg: {e}")))?;

    if !status.success() {
        return Err(GranaryError::Extraction(format!(
            "FFmpeg decode failed for {}",
            input.display()
        )));
    }

    if !output.exists() {
        return Err(GranaryError::Extraction(
            "Output file was not created".to_string(),
        ));
    }

    Ok(())
}

/// Cut one clip at an explicit offset and duration, forcing 16 kHz mono.
///
/// Offset and duration are passed with microsecond precision.
pub fn cut_segment(input: &Path, output: &Path, offset_sec: f64, duration_sec: f64) -> Result<()> {
    if !input.exists() {
        return Err(GranaryError::FileNotFound(input.display().to_string()));
    }

    let offset = format!("{offset_sec:.6}");
    let duration = format!("{duration_sec:.6}");

    debug!("Cutting segment: offset={offset}, duration={duration}");

    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y", "-ss"])
        .arg(&offset)
        .arg("-t")
        .arg(&duration)
        .arg("-i")
        .arg(input)
        .args(["-ar", "16000", "-ac", "1"])
        .arg(output)
        .status()
        .map_err(|e| GranaryError::Extraction(format!("Failed to run FFmpeg: {e}")))?;

    if !status.success() {
        return Err(GranaryError::Extraction(format!(
            "FFmpeg segment extraction failed for {}",
            input.display()
        )));
    }

    Ok(())
}
