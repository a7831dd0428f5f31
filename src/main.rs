use std::path::PathBuf;
use std::process::Command;

use eyre::{Result, bail};
use log::{debug, info};

use yt_tools::channel::{ContainerLister, YtDlpLister};
use yt_tools::config::{self, Config};
use yt_tools::report::Report;
use yt_tools::transcript::CaptionClient;
use yt_tools::youtube::YouTubeClient;

mod cli;

use cli::Cli;

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("yt-tools.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("yt-tools")
        .join("logs")
}

fn tool_version(name: &str) -> Option<String> {
    Command::new(name)
        .arg("--version")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| {
            String::from_utf8_lossy(&o.stdout)
                .trim()
                .lines()
                .next()
                .unwrap_or("")
                .to_string()
        })
}

fn build_after_help() -> String {
    let yt_dlp = tool_version("yt-dlp");

    let yt_dlp_line = match &yt_dlp {
        Some(v) => format!("  \x1b[32m✅\x1b[0m yt-dlp     {v}"),
        None => "  \x1b[31m❌\x1b[0m yt-dlp     (not found, needed for --channel-list)".to_string(),
    };

    format!(
        "\nREQUIRED TOOLS:\n{yt_dlp_line}\n\nCredentials: {}={}\nLogs are written to: {}",
        config::API_KEY_VAR,
        config::env_path().display(),
        log_dir().join("yt-tools.log").display()
    )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup_logging()?;

    let cmd = <Cli as clap::CommandFactory>::command().after_help(build_after_help());
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    let config = Config::load()?;

    if cli.verbose {
        let config_path = config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
    }

    if cli.channel_list {
        let url = cli.url.trim();
        debug!("Channel mode: {url}");
        let ids = YtDlpLister::default().list_children(url).await?;
        if cli.verbose {
            eprintln!("Videos: {}", ids.len());
        }
        for id in ids {
            println!("{}", yt_tools::watch_url(&id));
        }
        return Ok(());
    }

    let Some(video_id) = yt_tools::extract_video_id(&cli.url) else {
        bail!(
            "Invalid YouTube URL: {}\n\nSupported formats:\n  \
             https://www.youtube.com/watch?v=ID\n  \
             https://youtu.be/ID\n  \
             https://www.youtube.com/embed/ID\n  \
             https://www.youtube.com/v/ID",
            cli.url
        );
    };

    let lang = config.lang(cli.lang.as_deref());
    let selection = cli.selection();
    debug!("video={video_id} lang={lang} selection={selection:?}");

    if cli.verbose {
        eprintln!("Video: {video_id}\nLanguage: {lang}\nOutput: {selection:?}");
    }

    let http = reqwest::Client::new();
    let youtube = YouTubeClient::new(http.clone(), &config);
    let captions = CaptionClient::new(http);

    let report = Report::gather(&youtube, &captions, &youtube, &video_id, &lang, selection).await?;
    println!("{}", report.render(selection)?);

    Ok(())
}
