pub mod channel;
pub mod comments;
pub mod config;
pub mod output;
pub mod report;
pub mod transcript;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Flat metadata record, values taken verbatim from the Data API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub published_at: String,
}

/// A video as returned by `videos.list`
#[derive(Debug, Clone, PartialEq)]
pub struct Video {
    pub metadata: VideoMetadata,
    pub duration_seconds: f64,
}

impl Video {
    /// Duration in whole minutes, halves rounded to even
    pub fn duration_minutes(&self) -> i64 {
        (self.duration_seconds / 60.0).round_ties_even() as i64
    }
}

/// A single timed caption unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

static VIDEO_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:https?://)?(?:www\.)?(?:youtube\.com/(?:[^/\n\s]+/\S+/|(?:v|e(?:mbed)?)/|\S*?[?&]v=)|youtu\.be/)([a-zA-Z0-9_-]{11})",
    )
    .expect("video URL pattern compiles")
});

/// Extract the 11-character video ID from a YouTube URL.
///
/// Recognized shapes are watch URLs (any `v=` query parameter), `youtu.be/ID`,
/// `/embed/ID`, `/e/ID`, `/v/ID` and `youtube.com/<section>/<path>/ID`. A bare ID
/// or a channel URL does not match.
pub fn extract_video_id(input: &str) -> Option<String> {
    VIDEO_URL_RE
        .captures(input.trim())
        .map(|caps| caps[1].to_string())
}

/// Canonical watch URL for a video ID
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}
