pub mod extract;

pub use extract::{check_ffmpeg, check_ffprobe, cut_segment, decode_to_wav, probe_audio};

use std::path::PathBuf;

/// A decodable source audio file, probed once and then only read.
#[derive(Debug, Clone)]
pub struct AudioHandle {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
}
