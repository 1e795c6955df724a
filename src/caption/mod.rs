pub mod parse;
pub mod time;

pub use parse::parse_captions;
pub use time::{decode_timestamp, encode_timestamp, secs_to_millis};

/// One timestamped caption unit.
///
/// Cues are kept in file appearance order and are never re-sorted by time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}
