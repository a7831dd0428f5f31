use eyre::{Result, WrapErr, eyre};
use log::{debug, warn};

use crate::Video;
use crate::comments::{CommentPageSource, collect_comments};
use crate::output::{self, Combined, Selection, TimestampFormat};
use crate::transcript::{TranscriptFetcher, TranscriptOutcome};
use crate::youtube::VideoSource;

pub const API_ERROR: &str = "Failed to access YouTube API. Please check your YOUTUBE_API_KEY and ensure it is valid";

/// What was gathered for one video; only the parts the selection needs are fetched
#[derive(Debug, Clone)]
pub struct Report {
    pub video: Video,
    pub transcript: Option<TranscriptOutcome>,
    pub comments: Vec<String>,
}

impl Report {
    /// Fetch metadata, then the transcript and comments if `selection` uses them.
    ///
    /// Only the metadata call can fail the report; transcript and comment
    /// failures are folded into the result.
    pub async fn gather<V, T, C>(
        videos: &V,
        transcripts: &T,
        comments: &C,
        video_id: &str,
        lang: &str,
        selection: Selection,
    ) -> Result<Self>
    where
        V: VideoSource,
        T: TranscriptFetcher,
        C: CommentPageSource,
    {
        let video = videos.fetch_video(video_id).await.wrap_err(API_ERROR)?;
        debug!("Fetched metadata for {video_id}: {:?}", video.metadata.title);

        let transcript = if selection.needs_transcript() {
            Some(TranscriptOutcome::resolve(transcripts, video_id, lang).await)
        } else {
            None
        };

        let comments = if selection.needs_comments() {
            collect_comments(comments, video_id).await
        } else {
            Vec::new()
        };

        Ok(Report {
            video,
            transcript,
            comments,
        })
    }

    /// Render the selected branch
    pub fn render(&self, selection: Selection) -> Result<String> {
        match selection {
            Selection::Duration => Ok(output::render_duration(&self.video)),
            Selection::Transcript => Ok(output::render_transcript_text(self.transcript()?)),
            Selection::TranscriptTimestamps(format) => {
                let transcript = self.transcript()?;
                match (format, transcript.entries()) {
                    (TimestampFormat::Csv, Some(entries)) => output::render_transcript_csv(entries),
                    (TimestampFormat::Csv, None) => Ok(output::render_transcript_text(transcript)),
                    (TimestampFormat::Json, Some(entries)) => output::render_transcript_json(entries),
                    (TimestampFormat::Json, None) => {
                        warn!("{}", transcript.text());
                        output::render_transcript_json(&[])
                    }
                }
            }
            Selection::Comments => output::render_comments(&self.comments),
            Selection::Metadata => output::render_metadata(&self.video.metadata),
            Selection::Combined => output::render_combined(&Combined {
                transcript: self.transcript()?.text(),
                duration: self.video.duration_minutes(),
                comments: &self.comments,
                metadata: &self.video.metadata,
            }),
        }
    }

    fn transcript(&self) -> Result<&TranscriptOutcome> {
        self.transcript
            .as_ref()
            .ok_or_else(|| eyre!("transcript was not fetched for this output"))
    }
}
