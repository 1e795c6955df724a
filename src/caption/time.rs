// Caption timestamp codec
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{GranaryError, Result};

static TIMESTAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2}):(\d{2}):(\d{2})\.(\d{3})$").unwrap());

/// Decode a caption timestamp of the exact shape `HH:MM:SS.mmm` into
/// milliseconds.
///
/// Anything else (wrong digit counts, missing separators) is rejected.
pub fn decode_timestamp(s: &str) -> Result<u64> {
    let caps = TIMESTAMP_RE
        .captures(s)
        .ok_or_else(|| GranaryError::Format(format!("Invalid timestamp: {s:?}")))?;

    // Digit counts are enforced by the regex, so these cannot fail.
    let hours: u64 = caps[1].parse().unwrap_or(0);
    let minutes: u64 = caps[2].parse().unwrap_or(0);
    let seconds: u64 = caps[3].parse().unwrap_or(0);
    let millis: u64 = caps[4].parse().unwrap_or(0);

    Ok((hours * 3600 + minutes * 60 + seconds) * 1000 + millis)
}

/// Encode milliseconds as `HH:MM:SS.mmm`.
pub fn encode_timestamp(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

/// Convert fractional seconds to whole milliseconds, truncating.
///
/// Truncation keeps filename tokens stable across repeated runs; rounding
/// would let tiny float differences flip a name.
pub fn secs_to_millis(secs: f64) -> u64 {
    (secs * 1000.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_timestamp() {
        assert_eq!(decode_timestamp("00:00:00.000").unwrap(), 0);
        assert_eq!(decode_timestamp("00:01:02.345").unwrap(), 62345);
        assert_eq!(decode_timestamp("01:00:00.001").unwrap(), 3_600_001);
    }

    #[test]
    fn test_decode_rejects_loose_shapes() {
        assert!(decode_timestamp("1:2:3.4").is_err());
        assert!(decode_timestamp("00:00:00,000").is_err());
        assert!(decode_timestamp("00:00:00.00").is_err());
        assert!(decode_timestamp("000:00:00.000").is_err());
        assert!(decode_timestamp("").is_err());
        assert!(decode_timestamp(" 00:00:01.000").is_err());
    }

    #[test]
    fn test_round_trip() {
        for t in ["00:00:01.500", "00:01:02.345", "12:34:56.789"] {
            assert_eq!(encode_timestamp(decode_timestamp(t).unwrap()), t);
        }
    }

    #[test]
    fn test_secs_to_millis_truncates() {
        assert_eq!(secs_to_millis(1.5), 1500);
        assert_eq!(secs_to_millis(2.0), 2000);
        assert_eq!(secs_to_millis(0.9999), 999);
        assert_eq!(secs_to_millis(0.0), 0);
    }
}
