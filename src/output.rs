use eyre::{Result, eyre};
use serde::Serialize;

use crate::transcript::TranscriptOutcome;
use crate::{TranscriptEntry, Video, VideoMetadata};

/// Encoding for the timestamped transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    Csv,
    Json,
}

/// The single thing a run prints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Duration,
    Transcript,
    TranscriptTimestamps(TimestampFormat),
    Comments,
    Metadata,
    Combined,
}

impl Selection {
    /// Pick one branch: duration > transcript > transcript-ts > comments > metadata > combined
    pub fn from_flags(
        duration: bool,
        transcript: bool,
        transcript_ts: Option<TimestampFormat>,
        comments: bool,
        metadata: bool,
    ) -> Self {
        if duration {
            Selection::Duration
        } else if transcript {
            Selection::Transcript
        } else if let Some(format) = transcript_ts {
            Selection::TranscriptTimestamps(format)
        } else if comments {
            Selection::Comments
        } else if metadata {
            Selection::Metadata
        } else {
            Selection::Combined
        }
    }

    pub fn needs_transcript(self) -> bool {
        matches!(
            self,
            Selection::Transcript | Selection::TranscriptTimestamps(_) | Selection::Combined
        )
    }

    /// Combined output carries an empty comment list
    pub fn needs_comments(self) -> bool {
        matches!(self, Selection::Comments)
    }
}

/// Everything at once, keys in this order
#[derive(Debug, Serialize)]
pub struct Combined<'a> {
    pub transcript: String,
    pub duration: i64,
    pub comments: &'a [String],
    pub metadata: &'a VideoMetadata,
}

pub fn render_duration(video: &Video) -> String {
    video.duration_minutes().to_string()
}

pub fn render_transcript_text(transcript: &TranscriptOutcome) -> String {
    unescape(&transcript.text())
}

/// Transcript as CSV with a `start,duration,text` header.
///
/// Text fields are always quoted and numbers never are, the way Python's
/// `csv.QUOTE_NONNUMERIC` decides by type rather than content.
pub fn render_transcript_csv(entries: &[TranscriptEntry]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(["start", "duration", "text"].map(quote_text))?;
    for entry in entries {
        writer.write_record([
            float_repr(entry.start),
            float_repr(entry.duration),
            quote_text(&entry.text),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| eyre!("failed to flush CSV output: {}", e.error()))?;
    Ok(unescape(&String::from_utf8(bytes)?))
}

fn quote_text(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// Shortest round-trip float text in Python's `repr` layout (`5.0`, `1e-05`, `1e+16`)
fn float_repr(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let sci = format!("{x:e}");
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(m) => ("-", m),
        None => ("", mantissa),
    };

    if !(-4..16).contains(&exp) {
        let exp_sign = if exp < 0 { '-' } else { '+' };
        return format!("{sign}{mantissa}e{exp_sign}{:02}", exp.abs());
    }

    let digits = mantissa.replace('.', "");
    if exp < 0 {
        let zeros = "0".repeat((-exp - 1) as usize);
        return format!("{sign}0.{zeros}{digits}");
    }

    let int_len = exp as usize + 1;
    if digits.len() > int_len {
        format!("{sign}{}.{}", &digits[..int_len], &digits[int_len..])
    } else {
        format!("{sign}{digits}{}.0", "0".repeat(int_len - digits.len()))
    }
}

pub fn render_transcript_json(entries: &[TranscriptEntry]) -> Result<String> {
    Ok(serde_json::to_string_pretty(entries)?)
}

pub fn render_comments(comments: &[String]) -> Result<String> {
    Ok(serde_json::to_string_pretty(comments)?)
}

pub fn render_metadata(metadata: &VideoMetadata) -> Result<String> {
    Ok(serde_json::to_string_pretty(metadata)?)
}

pub fn render_combined(combined: &Combined<'_>) -> Result<String> {
    Ok(serde_json::to_string_pretty(combined)?)
}

enum Escape {
    Char(char, usize),
    Skip(usize),
    Literal,
}

/// Replace literal backslash escapes (`\n`, `\t`, `\\`, `\xHH`, `\uHHHH`,
/// `\UHHHHHHHH`, octal) with the characters they stand for.
///
/// Unknown or malformed escapes are kept verbatim; non-ASCII text is untouched.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        rest = match decode_escape(after) {
            Escape::Char(ch, consumed) => {
                out.push(ch);
                &after[consumed..]
            }
            Escape::Skip(consumed) => &after[consumed..],
            Escape::Literal => {
                out.push('\\');
                after
            }
        };
    }

    out.push_str(rest);
    out
}

fn decode_escape(after: &str) -> Escape {
    let Some(c) = after.chars().next() else {
        return Escape::Literal;
    };

    let simple = match c {
        '\\' => Some('\\'),
        '\'' => Some('\''),
        '"' => Some('"'),
        'a' => Some('\x07'),
        'b' => Some('\x08'),
        'f' => Some('\x0c'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'v' => Some('\x0b'),
        _ => None,
    };
    if let Some(ch) = simple {
        return Escape::Char(ch, 1);
    }

    match c {
        // line continuation
        '\n' => Escape::Skip(1),
        'x' => hex_escape(after, 2),
        'u' => hex_escape(after, 4),
        'U' => hex_escape(after, 8),
        '0'..='7' => {
            let digits = after.bytes().take(3).take_while(|b| (b'0'..=b'7').contains(b)).count();
            u32::from_str_radix(&after[..digits], 8)
                .ok()
                .and_then(char::from_u32)
                .map_or(Escape::Literal, |ch| Escape::Char(ch, digits))
        }
        _ => Escape::Literal,
    }
}

fn hex_escape(after: &str, len: usize) -> Escape {
    match after.get(1..1 + len) {
        Some(digits) if digits.bytes().all(|b| b.is_ascii_hexdigit()) => u32::from_str_radix(digits, 16)
            .ok()
            .and_then(char::from_u32)
            .map_or(Escape::Literal, |ch| Escape::Char(ch, 1 + len)),
        _ => Escape::Literal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entries() -> Vec<TranscriptEntry> {
        vec![
            TranscriptEntry {
                text: "Hello world".to_string(),
                start: 0.0,
                duration: 1.5,
            },
            TranscriptEntry {
                text: "it's \"quoted\"".to_string(),
                start: 1.5,
                duration: 2.25,
            },
        ]
    }

    fn sample_metadata() -> VideoMetadata {
        VideoMetadata {
            id: "dQw4w9WgXcQ".to_string(),
            title: "Test Video".to_string(),
            channel: "Test Channel".to_string(),
            published_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_selection_precedence() {
        use TimestampFormat::*;
        assert_eq!(
            Selection::from_flags(true, true, Some(Csv), true, true),
            Selection::Duration
        );
        assert_eq!(
            Selection::from_flags(false, true, Some(Csv), true, true),
            Selection::Transcript
        );
        assert_eq!(
            Selection::from_flags(false, false, Some(Json), true, true),
            Selection::TranscriptTimestamps(Json)
        );
        assert_eq!(Selection::from_flags(false, false, None, true, true), Selection::Comments);
        assert_eq!(Selection::from_flags(false, false, None, false, true), Selection::Metadata);
        assert_eq!(Selection::from_flags(false, false, None, false, false), Selection::Combined);
    }

    #[test]
    fn test_selection_needs() {
        assert!(!Selection::Duration.needs_transcript());
        assert!(!Selection::Duration.needs_comments());
        assert!(Selection::Transcript.needs_transcript());
        assert!(!Selection::Metadata.needs_transcript());
        assert!(Selection::Comments.needs_comments());
        assert!(Selection::Combined.needs_transcript());
        assert!(!Selection::Combined.needs_comments());
    }

    #[test]
    fn test_render_transcript_csv() {
        let csv = render_transcript_csv(&sample_entries()).unwrap();
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(lines[0], r#""start","duration","text""#);
        assert_eq!(lines[1], r#"0.0,1.5,"Hello world""#);
        assert_eq!(lines[2], r#"1.5,2.25,"it's ""quoted"""#);
        assert_eq!(lines[3], "");
    }

    #[test]
    fn test_render_transcript_csv_empty() {
        let csv = render_transcript_csv(&[]).unwrap();
        assert_eq!(csv, "\"start\",\"duration\",\"text\"\r\n");
    }

    #[test]
    fn test_render_transcript_csv_unescapes() {
        let entries = vec![TranscriptEntry {
            text: r"caf\u00e9".to_string(),
            start: 2.0,
            duration: 1.0,
        }];
        let csv = render_transcript_csv(&entries).unwrap();
        assert!(csv.contains("2.0,1.0,\"café\""));
    }

    #[test]
    fn test_render_transcript_csv_quotes_by_type() {
        let entries = vec![TranscriptEntry {
            text: "42".to_string(),
            start: 0.00001,
            duration: 1e16,
        }];
        let csv = render_transcript_csv(&entries).unwrap();
        assert_eq!(csv.split("\r\n").nth(1), Some(r#"1e-05,1e+16,"42""#));
    }

    #[test]
    fn test_float_repr() {
        assert_eq!(float_repr(0.0), "0.0");
        assert_eq!(float_repr(5.0), "5.0");
        assert_eq!(float_repr(0.21), "0.21");
        assert_eq!(float_repr(123.456), "123.456");
        assert_eq!(float_repr(1500.0), "1500.0");
        assert_eq!(float_repr(0.0001), "0.0001");
        assert_eq!(float_repr(0.00001), "1e-05");
        assert_eq!(float_repr(1.5e-7), "1.5e-07");
        assert_eq!(float_repr(1e16), "1e+16");
        assert_eq!(float_repr(-2.5), "-2.5");
        assert_eq!(float_repr(f64::INFINITY), "inf");
    }

    #[test]
    fn test_render_transcript_json() {
        let json = render_transcript_json(&sample_entries()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["text"], "Hello world");
        assert_eq!(value[1]["start"], 1.5);
        assert_eq!(value[1]["duration"], 2.25);
        assert!(json.starts_with("[\n  {\n    \"text\""));
    }

    #[test]
    fn test_render_transcript_text_unescapes() {
        let outcome = TranscriptOutcome::Available(vec![TranscriptEntry {
            text: r"line\tone".to_string(),
            start: 0.0,
            duration: 1.0,
        }]);
        assert_eq!(render_transcript_text(&outcome), "line\tone");
    }

    #[test]
    fn test_render_combined_keys() {
        let metadata = sample_metadata();
        let comments = vec!["nice".to_string(), "    - thanks".to_string()];
        let combined = Combined {
            transcript: "Hello world".to_string(),
            duration: 4,
            comments: &comments,
            metadata: &metadata,
        };
        let json = render_combined(&combined).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 4);
        for key in ["transcript", "duration", "comments", "metadata"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["duration"], 4);
        assert_eq!(value["metadata"]["published_at"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_render_metadata() {
        let json = render_metadata(&sample_metadata()).unwrap();
        assert!(json.starts_with("{\n  \"id\": \"dQw4w9WgXcQ\""));
    }

    #[test]
    fn test_unescape_simple() {
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r"back\\slash"), "back\\slash");
        assert_eq!(unescape(r#"say \"hi\""#), "say \"hi\"");
    }

    #[test]
    fn test_unescape_numeric() {
        assert_eq!(unescape(r"\x41BC"), "ABC");
        assert_eq!(unescape(r"caf\u00e9"), "café");
        assert_eq!(unescape(r"\U0001F600"), "😀");
        assert_eq!(unescape(r"\101"), "A");
    }

    #[test]
    fn test_unescape_keeps_unknown_and_malformed() {
        assert_eq!(unescape(r"\q"), r"\q");
        assert_eq!(unescape(r"\xZZ"), r"\xZZ");
        assert_eq!(unescape(r"\u12"), r"\u12");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }

    #[test]
    fn test_unescape_leaves_unicode_alone() {
        assert_eq!(unescape("naïve ☕ text"), "naïve ☕ text");
    }
}
