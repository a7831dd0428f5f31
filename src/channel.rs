use std::future::Future;
use std::process::Stdio;
use std::sync::LazyLock;

use eyre::{Result, bail};
use log::debug;
use regex::Regex;
use tokio::process::Command;

/// Lists the child items of a container such as a channel or playlist
pub trait ContainerLister {
    /// Video IDs contained in `url`, in listing order
    fn list_children(&self, url: &str) -> impl Future<Output = Result<Vec<String>>>;
}

/// Flat extraction through the `yt-dlp` binary
#[derive(Debug, Clone)]
pub struct YtDlpLister {
    program: String,
}

impl Default for YtDlpLister {
    fn default() -> Self {
        Self {
            program: "yt-dlp".to_string(),
        }
    }
}

impl YtDlpLister {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl ContainerLister for YtDlpLister {
    async fn list_children(&self, url: &str) -> Result<Vec<String>> {
        let url = channel_videos_url(url);
        let url = url.as_str();
        debug!("Listing {url} via {}", self.program);

        let output = Command::new(&self.program)
            .args([
                "--flat-playlist",
                "--ignore-errors",
                "--quiet",
                "--no-warnings",
                "--print",
                "%(id)s",
                url,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match output {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                bail!(
                    "{} not found. Install it to list channel videos:\n  \
                     pip install yt-dlp\n  \
                     or: brew install yt-dlp",
                    self.program
                );
            }
            Err(e) => bail!("failed to run {}: {e}", self.program),
        };

        let ids = parse_ids(&String::from_utf8_lossy(&output.stdout));

        // --ignore-errors still exits non-zero when some entries were skipped
        if !output.status.success() && ids.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with status {}: {}", self.program, output.status, stderr.trim());
        }

        debug!("{url}: {} videos", ids.len());
        Ok(ids)
    }
}

static CHANNEL_HOME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.|m\.)?youtube\.com/(?:@[^/?#]+|(?:channel|c|user)/[^/?#]+)/?$")
        .expect("channel URL pattern compiles")
});

/// Point a bare channel URL at its Videos tab.
///
/// Flat extraction of a channel home page yields its tabs rather than videos.
/// Playlists and URLs that already name a tab are returned unchanged.
pub fn channel_videos_url(url: &str) -> String {
    let url = url.trim();
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let (base, query) = match without_fragment.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (without_fragment, None),
    };

    if !CHANNEL_HOME_RE.is_match(base) {
        return url.to_string();
    }

    let mut result = format!("{}/videos", base.trim_end_matches('/'));
    if let Some(query) = query {
        result.push('?');
        result.push_str(query);
    }
    if let Some(fragment) = fragment {
        result.push('#');
        result.push_str(fragment);
    }
    result
}

fn parse_ids(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let is_video = is_video_id(line);
            if !is_video {
                debug!("Skipping non-video entry: {line}");
            }
            is_video
        })
        .map(str::to_string)
        .collect()
}

fn is_video_id(s: &str) -> bool {
    s.len() == 11 && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
