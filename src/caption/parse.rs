use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::time::decode_timestamp;
use super::Cue;

static TIMING_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2}:\d{2}:\d{2}\.\d{3}) --> (\d{2}:\d{2}:\d{2}\.\d{3})").unwrap()
});

/// Parse caption file contents into an ordered cue sequence.
///
/// Recognizes `HH:MM:SS.mmm --> HH:MM:SS.mmm` timing lines; the non-blank
/// lines that follow, up to a blank line or end of input, become the cue
/// text (joined with single spaces). Header and style lines before the
/// first timing line are skipped. Malformed fragments are dropped with a
/// warning; the parser never fails on a whole file.
pub fn parse_captions(content: &str) -> Vec<Cue> {
    let mut cues = Vec::new();
    let mut current: Option<(u64, u64)> = None;
    let mut text_buffer: Vec<&str> = Vec::new();

    for (line_num, raw) in content.lines().enumerate() {
        let line = raw.trim();

        if line.is_empty() {
            flush(&mut cues, &mut current, &mut text_buffer);
            continue;
        }

        if let Some(caps) = TIMING_LINE_RE.captures(line) {
            // A new timing line closes any still-open cue.
            flush(&mut cues, &mut current, &mut text_buffer);

            match (decode_timestamp(&caps[1]), decode_timestamp(&caps[2])) {
                (Ok(start_ms), Ok(end_ms)) => {
                    current = Some((start_ms, end_ms));
                }
                _ => {
                    warn!("Skipping unparseable timing line {}: {line}", line_num + 1);
                }
            }
        } else if current.is_some() {
            text_buffer.push(line);
        }
        // Lines before the first timing line (WEBVTT header, Kind:, Language:,
        // style blocks) fall through and are ignored.
    }

    // Unterminated final cue
    flush(&mut cues, &mut current, &mut text_buffer);

    cues
}

fn flush(cues: &mut Vec<Cue>, current: &mut Option<(u64, u64)>, text_buffer: &mut Vec<&str>) {
    let Some((start_ms, end_ms)) = current.take() else {
        text_buffer.clear();
        return;
    };

    let text = text_buffer.join(" ").trim().to_string();
    text_buffer.clear();

    if text.is_empty() {
        warn!(start_ms, end_ms, "Dropping cue with no text");
        return;
    }
    if end_ms <= start_ms {
        warn!(start_ms, end_ms, "Dropping cue with inverted or zero-length range");
        return;
    }

    cues.push(Cue {
        start_ms,
        end_ms,
        text,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_cues() {
        let content = "00:00:01.000 --> 00:00:02.500\nHello world\n\n00:00:03.000 --> 00:00:04.000\nBye\n";
        let cues = parse_captions(content);

        assert_eq!(
            cues,
            vec![
                Cue {
                    start_ms: 1000,
                    end_ms: 2500,
                    text: "Hello world".to_string(),
                },
                Cue {
                    start_ms: 3000,
                    end_ms: 4000,
                    text: "Bye".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_skips_header() {
        let content = "WEBVTT\nKind: captions\nLanguage: en\n\n00:00:00.500 --> 00:00:01.000\nhi\n";
        let cues = parse_captions(content);

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "hi");
        assert_eq!(cues[0].start_ms, 500);
    }

    #[test]
    fn test_parse_joins_multiline_text() {
        let content = "00:00:01.000 --> 00:00:02.000\nfirst line\nsecond line\n\n";
        let cues = parse_captions(content);

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "first line second line");
    }

    #[test]
    fn test_parse_flushes_unterminated_final_cue() {
        let content = "00:00:01.000 --> 00:00:02.000\nno trailing blank";
        let cues = parse_captions(content);

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "no trailing blank");
    }

    #[test]
    fn test_parse_drops_textless_cue() {
        let content = "00:00:01.000 --> 00:00:02.000\n\n00:00:03.000 --> 00:00:04.000\nok\n";
        let cues = parse_captions(content);

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start_ms, 3000);
    }

    #[test]
    fn test_parse_drops_inverted_cue() {
        let content = "00:00:05.000 --> 00:00:04.000\nbackwards\n\n00:00:05.000 --> 00:00:05.000\nempty span\n";
        let cues = parse_captions(content);

        assert!(cues.is_empty());
    }

    #[test]
    fn test_parse_keeps_file_order() {
        // Out-of-order timings stay in appearance order.
        let content = "00:00:10.000 --> 00:00:11.000\nlater\n\n00:00:01.000 --> 00:00:02.000\nearlier\n";
        let cues = parse_captions(content);

        assert_eq!(cues[0].text, "later");
        assert_eq!(cues[1].text, "earlier");
    }

    #[test]
    fn test_parse_timing_line_flushes_open_cue() {
        let content = "00:00:01.000 --> 00:00:02.000\none\n00:00:03.000 --> 00:00:04.000\ntwo\n";
        let cues = parse_captions(content);

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "one");
        assert_eq!(cues[1].text, "two");
    }

    #[test]
    fn test_parse_empty_and_garbage_inputs() {
        assert!(parse_captions("").is_empty());
        assert!(parse_captions("not a caption file\nat all\n").is_empty());
    }
}
