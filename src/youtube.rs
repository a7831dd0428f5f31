use std::future::Future;
use std::sync::LazyLock;

use eyre::{Result, bail, eyre};
use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::comments::{CommentPage, CommentPageSource, CommentThread};
use crate::config::Config;
use crate::{Video, VideoMetadata};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Comment threads requested per page (the API maximum)
const COMMENT_PAGE_SIZE: &str = "100";

/// Source of video metadata
pub trait VideoSource {
    fn fetch_video(&self, video_id: &str) -> impl Future<Output = Result<Video>>;
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    #[serde(rename = "contentDetails")]
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    title: String,
    #[serde(rename = "channelTitle")]
    channel_title: String,
    #[serde(rename = "publishedAt")]
    published_at: String,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

#[derive(Debug, Deserialize)]
struct CommentThreadListResponse {
    #[serde(default)]
    items: Vec<CommentThreadItem>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThreadItem {
    snippet: CommentThreadSnippet,
    replies: Option<Replies>,
}

#[derive(Debug, Deserialize)]
struct CommentThreadSnippet {
    #[serde(rename = "topLevelComment")]
    top_level_comment: Comment,
}

#[derive(Debug, Deserialize)]
struct Replies {
    #[serde(default)]
    comments: Vec<Comment>,
}

#[derive(Debug, Deserialize)]
struct Comment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
struct CommentSnippet {
    #[serde(rename = "textDisplay", default)]
    text_display: String,
}

/// Thin client for the YouTube Data API v3, authenticated with an API key
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Point the client at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, resource: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{resource}", self.base_url);
        debug!("GET {url} {params:?}");

        let resp = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("YouTube API {resource} returned {status}: {}", api_error_message(&body));
        }

        Ok(resp.json().await?)
    }
}

impl VideoSource for YouTubeClient {
    async fn fetch_video(&self, video_id: &str) -> Result<Video> {
        let resp: VideoListResponse = self
            .get_json("videos", &[("id", video_id), ("part", "contentDetails,snippet")])
            .await?;
        video_from_response(resp, video_id)
    }
}

impl CommentPageSource for YouTubeClient {
    async fn fetch_comment_page(&self, video_id: &str, page_token: Option<&str>) -> Result<CommentPage> {
        let mut params = vec![
            ("part", "snippet,replies"),
            ("videoId", video_id),
            ("textFormat", "plainText"),
            ("maxResults", COMMENT_PAGE_SIZE),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let resp: CommentThreadListResponse = self.get_json("commentThreads", &params).await?;
        Ok(comment_page_from_response(resp))
    }
}

fn video_from_response(resp: VideoListResponse, video_id: &str) -> Result<Video> {
    let item = resp
        .items
        .into_iter()
        .next()
        .ok_or_else(|| eyre!("video {video_id} not found"))?;

    let duration_seconds = parse_iso8601_duration(&item.content_details.duration)?;

    Ok(Video {
        metadata: VideoMetadata {
            id: item.id,
            title: item.snippet.title,
            channel: item.snippet.channel_title,
            published_at: item.snippet.published_at,
        },
        duration_seconds,
    })
}

fn comment_page_from_response(resp: CommentThreadListResponse) -> CommentPage {
    let threads = resp
        .items
        .into_iter()
        .map(|item| CommentThread {
            text: item.snippet.top_level_comment.snippet.text_display,
            replies: item
                .replies
                .map(|r| r.comments.into_iter().map(|c| c.snippet.text_display).collect())
                .unwrap_or_default(),
        })
        .collect();

    CommentPage {
        threads,
        next_page_token: resp.next_page_token,
    }
}

/// Pull `error.message` out of a Data API error body, falling back to the raw body
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$")
        .expect("duration pattern compiles")
});

/// Parse an ISO-8601 duration such as `PT1H2M3S` or `P1DT30S` into seconds
pub fn parse_iso8601_duration(duration: &str) -> Result<f64> {
    let caps = DURATION_RE
        .captures(duration.trim())
        .ok_or_else(|| eyre!("invalid ISO-8601 duration: {duration:?}"))?;

    let field = |i: usize| -> Result<f64> {
        match caps.get(i) {
            Some(m) => Ok(m.as_str().parse::<f64>()?),
            None => Ok(0.0),
        }
    };

    Ok(field(1)? * 604_800.0 + field(2)? * 86_400.0 + field(3)? * 3_600.0 + field(4)? * 60.0 + field(5)?)
}
