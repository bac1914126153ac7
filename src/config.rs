//! Configuration management for spotgrab.
//!
//! Values come from three places, highest priority first:
//! 1. Command-line flags
//! 2. Environment variables (clap reads most flags from the environment too)
//! 3. `.env` files, in the working directory and then in the local data
//!    directory under `spotgrab/.env`
//!
//! Spotify credentials are only read from the environment; they never appear
//! as flags so they do not end up in shell history.

use std::{env, path::PathBuf, time::Duration};

use crate::{
    error::{Error, Result},
    media::MatchPolicy,
    types::{AudioFormat, AudioQuality, AudioSource},
};

pub const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Loads environment variables from `.env` files.
///
/// The working directory is tried first, then the platform-specific local
/// data directory:
/// - Linux: `~/.local/share/spotgrab/.env`
/// - macOS: `~/Library/Application Support/spotgrab/.env`
/// - Windows: `%LOCALAPPDATA%/spotgrab/.env`
///
/// Already-set variables are never overwritten, and a missing file is not an
/// error. A file that exists but cannot be parsed is.
pub async fn load_env() -> Result<()> {
    if let Err(e) = dotenv::dotenv() {
        if !e.not_found() {
            return Err(Error::Config(format!("cannot parse ./.env: {}", e)));
        }
    }

    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    match dotenv::from_path(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(Error::Config(format!(
            "cannot parse {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Root of spotgrab's local data (token cache, `.env`).
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("spotgrab");
    path
}

/// Spotify Web API access parameters.
#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub api_url: String,
    pub token_url: String,
}

/// Reads the Spotify client-credentials configuration.
///
/// `SPOTIFY_CLIENT_ID` and `SPOTIFY_CLIENT_SECRET` are required and come
/// from the Spotify developer dashboard. `SPOTIFY_API_URL` and
/// `SPOTIFY_API_TOKEN_URL` default to the public endpoints.
pub fn spotify_credentials() -> Result<SpotifyCredentials> {
    Ok(SpotifyCredentials {
        client_id: required("SPOTIFY_CLIENT_ID")?,
        client_secret: required("SPOTIFY_CLIENT_SECRET")?,
        api_url: optional("SPOTIFY_API_URL")
            .unwrap_or_else(|| DEFAULT_SPOTIFY_API_URL.to_string()),
        token_url: optional("SPOTIFY_API_TOKEN_URL")
            .unwrap_or_else(|| DEFAULT_SPOTIFY_TOKEN_URL.to_string()),
    })
}

fn required(key: &str) -> Result<String> {
    optional(key).ok_or_else(|| {
        Error::Config(format!(
            "{} must be set (environment or {})",
            key,
            data_dir().join(".env").display()
        ))
    })
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub format: AudioFormat,
    pub quality: AudioQuality,
    pub source: AudioSource,
    pub ytdlp_path: String,
    pub max_results: usize,
    pub match_policy: MatchPolicy,
    /// Pause between consecutive processed tracks.
    pub track_delay: Duration,
    /// Package playlists into a zip archive.
    pub create_archive: bool,
    pub show_progress: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./downloads"),
            format: AudioFormat::Flac,
            quality: AudioQuality::Best,
            source: AudioSource::Youtube,
            ytdlp_path: "yt-dlp".to_string(),
            max_results: 5,
            match_policy: MatchPolicy::default(),
            track_delay: Duration::from_secs(1),
            create_archive: true,
            show_progress: true,
        }
    }
}
