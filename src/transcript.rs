use std::future::Future;

use eyre::{Result, bail};
use log::{debug, warn};
use regex::Regex;
use serde::Deserialize;

use crate::{TranscriptEntry, watch_url};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Source of timed transcripts
pub trait TranscriptFetcher {
    /// Fetch the transcript of `video_id` in exactly the language `lang`
    fn fetch_transcript(&self, video_id: &str, lang: &str) -> impl Future<Output = Result<Vec<TranscriptEntry>>>;
}

/// Result of a transcript lookup, failures kept as a displayable reason
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptOutcome {
    Available(Vec<TranscriptEntry>),
    Unavailable { lang: String, reason: String },
}

impl TranscriptOutcome {
    /// Fetch a transcript, turning any failure into [`TranscriptOutcome::Unavailable`]
    pub async fn resolve<F: TranscriptFetcher>(fetcher: &F, video_id: &str, lang: &str) -> Self {
        match fetcher.fetch_transcript(video_id, lang).await {
            Ok(entries) => {
                debug!("Transcript for {video_id} ({lang}): {} entries", entries.len());
                TranscriptOutcome::Available(entries)
            }
            Err(e) => {
                warn!("Transcript for {video_id} ({lang}) unavailable: {e:#}");
                TranscriptOutcome::Unavailable {
                    lang: lang.to_string(),
                    reason: format!("{e:#}"),
                }
            }
        }
    }

    /// Entries joined into one line of text, or the unavailability sentinel
    pub fn text(&self) -> String {
        match self {
            TranscriptOutcome::Available(entries) => entries
                .iter()
                .map(|e| e.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
                .replace('\n', " "),
            TranscriptOutcome::Unavailable { lang, reason } => {
                format!("Transcript not available in the selected language ({lang}). ({reason})")
            }
        }
    }

    pub fn entries(&self) -> Option<&[TranscriptEntry]> {
        match self {
            TranscriptOutcome::Available(entries) => Some(entries),
            TranscriptOutcome::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    captions: Option<CaptionsData>,
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
}

/// Reads YouTube's own caption tracks through the InnerTube player endpoint
#[derive(Debug, Clone)]
pub struct CaptionClient {
    http: reqwest::Client,
}

impl CaptionClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl TranscriptFetcher for CaptionClient {
    async fn fetch_transcript(&self, video_id: &str, lang: &str) -> Result<Vec<TranscriptEntry>> {
        // Step 1: Fetch the watch page to get the InnerTube API key
        let watch_url = watch_url(video_id);
        debug!("Fetching watch page: {watch_url}");

        let page_html = self
            .http
            .get(&watch_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let api_key = extract_api_key(&page_html)?;
        debug!("Extracted InnerTube API key");

        // Step 2: Call InnerTube player endpoint
        let player_url = format!("https://www.youtube.com/youtubei/v1/player?key={api_key}&prettyPrint=false");

        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": lang,
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": "2.20241126.01.00"
                }
            },
            "videoId": video_id
        });

        let resp: InnerTubePlayerResponse = self
            .http
            .post(&player_url)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(status) = &resp.playability_status
            && status.status.as_deref().is_some_and(|s| s != "OK")
        {
            bail!(
                "video {video_id} is unplayable: {}",
                status.reason.as_deref().unwrap_or("no reason given")
            );
        }

        let tracks = resp
            .captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .and_then(|r| r.caption_tracks)
            .unwrap_or_default();

        let track = select_track(&tracks, video_id, lang)?;
        debug!("Using caption track: lang={}", track.language_code);

        // Step 3: Fetch the caption XML
        let caption_xml = self
            .http
            .get(&track.base_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_caption_xml(&caption_xml)
    }
}

/// Pick the track in exactly `lang`; no fallback to other languages
fn select_track<'a>(tracks: &'a [CaptionTrack], video_id: &str, lang: &str) -> Result<&'a CaptionTrack> {
    if tracks.is_empty() {
        bail!("transcripts are disabled or missing for video {video_id}");
    }

    match tracks.iter().find(|t| t.language_code == lang) {
        Some(track) => Ok(track),
        None => {
            let available = tracks
                .iter()
                .map(|t| t.language_code.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            bail!("no transcript found for language code {lang:?}; available: {available}")
        }
    }
}

fn extract_api_key(html: &str) -> Result<String> {
    let re = Regex::new(r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#)?;
    if let Some(caps) = re.captures(html) {
        return Ok(caps[1].to_string());
    }

    // Fallback: try the newer pattern
    let re2 = Regex::new(r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#)?;
    if let Some(caps) = re2.captures(html) {
        return Ok(caps[1].to_string());
    }

    bail!("could not extract InnerTube API key from watch page");
}

fn parse_caption_xml(xml: &str) -> Result<Vec<TranscriptEntry>> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    let mut current_start: Option<f64> = None;
    let mut current_dur: Option<f64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut start = None;
                let mut dur = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"start" => {
                            start = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        b"dur" => {
                            dur = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        _ => {}
                    }
                }
                current_start = start;
                // Some tracks omit dur on the last cue
                current_dur = dur.or(Some(0.0));
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => {
                // Empty cue: its timing does not carry over
                current_start = None;
                current_dur = None;
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(start), Some(duration)) = (current_start.take(), current_dur.take()) {
                    let raw_text = e.unescape().unwrap_or_default().to_string();
                    let text = html_escape::decode_html_entities(&raw_text).to_string();
                    if !text.trim().is_empty() {
                        entries.push(TranscriptEntry { text, start, duration });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("error parsing caption XML: {e}"),
            _ => {}
        }
    }

    Ok(entries)
}
