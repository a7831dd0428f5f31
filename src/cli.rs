use clap::Parser;

use yt_tools::output::{Selection, TimestampFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TimestampArg {
    Csv,
    Json,
}

impl From<TimestampArg> for TimestampFormat {
    fn from(arg: TimestampArg) -> Self {
        match arg {
            TimestampArg::Csv => TimestampFormat::Csv,
            TimestampArg::Json => TimestampFormat::Json,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "yt-tools",
    about = "yt-tools extracts metadata about a video, such as the transcript, the video's duration, and comments",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// YouTube video URL (or channel/playlist URL with --channel-list)
    pub url: String,

    /// Output only the duration in minutes
    #[arg(long)]
    pub duration: bool,

    /// Output only the transcript
    #[arg(long)]
    pub transcript: bool,

    /// Output only the transcript with timestamps
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub transcript_ts: Option<TimestampArg>,

    /// Output the comments on the video
    #[arg(long)]
    pub comments: bool,

    /// Output the video metadata
    #[arg(long)]
    pub metadata: bool,

    /// Language for the transcript [default: en, or default_lang from config.toml]
    #[arg(long)]
    pub lang: Option<String>,

    /// Output the list of videos from a channel/playlist
    #[arg(long)]
    pub channel_list: bool,

    /// Show diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn selection(&self) -> Selection {
        Selection::from_flags(
            self.duration,
            self.transcript,
            self.transcript_ts.map(Into::into),
            self.comments,
            self.metadata,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("yt-tools").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_url_required() {
        assert!(Cli::try_parse_from(["yt-tools"]).is_err());
    }

    #[test]
    fn test_default_selection_is_combined() {
        let cli = parse(&["https://youtu.be/dQw4w9WgXcQ"]);
        assert_eq!(cli.selection(), Selection::Combined);
        assert!(cli.lang.is_none());
        assert!(!cli.channel_list);
    }

    #[test]
    fn test_duration_wins() {
        let cli = parse(&["--metadata", "--duration", "--transcript-ts", "csv", "u"]);
        assert_eq!(cli.selection(), Selection::Duration);
    }

    #[test]
    fn test_transcript_ts_values() {
        let cli = parse(&["--transcript-ts", "json", "u"]);
        assert_eq!(cli.selection(), Selection::TranscriptTimestamps(TimestampFormat::Json));
        assert!(Cli::try_parse_from(["yt-tools", "--transcript-ts", "xml", "u"]).is_err());
    }

    #[test]
    fn test_lang_and_channel_list() {
        let cli = parse(&["--lang", "de", "--channel-list", "https://www.youtube.com/@x"]);
        assert_eq!(cli.lang.as_deref(), Some("de"));
        assert!(cli.channel_list);
    }
}
