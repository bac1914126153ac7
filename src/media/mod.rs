//! Media side of a run: finding audio for a track and turning it into a file.
//!
//! - [`MediaBackend`] is the seam to the external media tool (search, fetch
//!   and transcode). [`YtDlpBackend`] drives the `yt-dlp` executable.
//! - [`matcher`] scores search candidates against Spotify metadata.
//! - [`download`] owns the staging path and the cleanup-on-failure contract.

pub mod download;
pub mod matcher;
pub mod ytdlp;

use std::path::Path;

use async_trait::async_trait;

use crate::{
    error::Result,
    types::{AudioFormat, AudioQuality, Candidate},
};

pub use matcher::MatchPolicy;
pub use ytdlp::YtDlpBackend;

/// What the backend should produce for a selected candidate.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub candidate: &'a Candidate,
    /// Final path of the encoded file, extension included.
    pub output: &'a Path,
    pub format: AudioFormat,
    pub quality: AudioQuality,
}

#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Returns at most `limit` candidates, most relevant first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>>;

    /// Fetches the candidate's audio and encodes it to `request.output`.
    /// May leave partial files next to the output on failure.
    async fn fetch(&self, request: FetchRequest<'_>) -> Result<()>;
}
