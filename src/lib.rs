//! Spotify Track & Playlist Downloader Library
//!
//! Resolves Spotify track and playlist links to metadata, finds matching
//! audio through an external media backend (yt-dlp), encodes it to the
//! configured format, tags it and packages playlists into a zip archive.
//!
//! # Modules
//!
//! - `archive` - Playlist archive with generated cover and summary document
//! - `cli` - Command implementations for the binary
//! - `config` - Environment loading and run settings
//! - `error` - Error taxonomy and `Result` alias
//! - `logging` - Tracing subscriber setup
//! - `management` - Token cache and the in-memory run report
//! - `media` - Media backend, candidate matcher and download orchestration
//! - `runner` - Run controller sequencing a whole invocation
//! - `spotify` - Spotify Web API client and link parsing
//! - `tagging` - Audio tag writer
//! - `types` - Data structures and type definitions
//! - `utils` - Filename, text and value helpers
//!
//! # Example
//!
//! ```no_run
//! use spotgrab::{config, media::YtDlpBackend, runner::Runner, spotify::SpotifyClient};
//!
//! #[tokio::main]
//! async fn main() -> spotgrab::error::Result<()> {
//!     config::load_env().await?;
//!     let settings = config::Settings::default();
//!     let client = SpotifyClient::new(config::spotify_credentials()?).await;
//!     let backend = YtDlpBackend::new(&settings.ytdlp_path, settings.source);
//!     let summary = Runner::new(&client, &backend, &settings)
//!         .run("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC")
//!         .await?;
//!     println!("{} track(s) downloaded", summary.report.succeeded());
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod management;
pub mod media;
pub mod runner;
pub mod spotify;
pub mod tagging;
pub mod types;
pub mod utils;

/// Prints an informational message with a blue bullet point.
///
/// Accepts the same arguments as `println!`.
///
/// # Example
///
/// ```ignore
/// info!("Resolving {}", url);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```ignore
/// success!("Archive written to {}", path.display());
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits with
/// code 1. Only for failures the program cannot continue from.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
