use std::path::{Path, PathBuf};

use eyre::{Result, bail};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub const API_KEY_VAR: &str = "YOUTUBE_API_KEY";

const DEFAULT_LANG: &str = "en";

/// Optional user defaults from ~/.config/yt-tools/config.toml
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Defaults {
    pub default_lang: Option<String>,
}

impl Defaults {
    /// Load defaults from `path` if it exists
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading defaults from {}", path.display());
            let content = std::fs::read_to_string(path)?;
            let defaults: Defaults = toml::from_str(&content)?;
            Ok(defaults)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Defaults::default())
        }
    }
}

/// Everything the clients need, resolved once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub default_lang: String,
}

impl Config {
    /// Load the credential and defaults from the per-user config directory
    pub fn load() -> Result<Self> {
        let env_path = env_path();
        let api_key = read_api_key(&env_path)?
            .or_else(|| std::env::var(API_KEY_VAR).ok().filter(|k| !k.trim().is_empty()));

        let Some(api_key) = api_key else {
            bail!("{API_KEY_VAR} not found in {}", env_path.display());
        };

        // A broken config.toml only costs the defaults
        let defaults = Defaults::load_from(&config_path()).unwrap_or_else(|e| {
            warn!("Ignoring invalid {}: {e}", config_path().display());
            Defaults::default()
        });

        Ok(Config {
            api_key,
            default_lang: defaults.default_lang.unwrap_or_else(|| DEFAULT_LANG.to_string()),
        })
    }

    /// Language for transcripts: CLI flag first, then config default
    pub fn lang(&self, cli_lang: Option<&str>) -> String {
        cli_lang.map(str::to_string).unwrap_or_else(|| self.default_lang.clone())
    }
}

/// Read `YOUTUBE_API_KEY` from a dotenv-style file without touching the process environment
pub fn read_api_key(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        debug!("No credential file at {}", path.display());
        return Ok(None);
    }
    for item in dotenvy::from_path_iter(path)? {
        let (key, value) = item?;
        if key == API_KEY_VAR && !value.trim().is_empty() {
            debug!("Loaded {API_KEY_VAR} from {}", path.display());
            return Ok(Some(value));
        }
    }
    Ok(None)
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("yt-tools")
}

pub fn env_path() -> PathBuf {
    config_dir().join(".env")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}
