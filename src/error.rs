//! Error taxonomy for a download run.
//!
//! Variants fall in two groups. Run-level errors (`InvalidInput`, `Config`,
//! `MetadataFetch`, `Archive`) surface with a non-zero exit code; the first
//! three abort the invocation, an `Archive` error is kept on the run summary
//! so the report is still printed. Track-level errors (`NoMatchFound`, `Download`,
//! `Transcode`) are recorded as a failed outcome for that track only, and
//! `TagWrite` is downgraded to a warning by the run controller.

use std::path::PathBuf;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input is not a recognizable Spotify track or playlist link.
    #[error("Invalid Spotify link '{0}'. Expected https://open.spotify.com/(track|playlist)/<id> or spotify:(track|playlist):<id>")]
    InvalidInput(String),

    /// Missing or malformed configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The Spotify API could not deliver metadata (auth, network, not found).
    #[error("Failed to fetch metadata: {0}")]
    MetadataFetch(String),

    /// The media backend returned no acceptable candidate.
    #[error("No match found for '{0}'")]
    NoMatchFound(String),

    /// Fetching audio or running a backend search failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// The backend finished but the expected encoded file is missing or broken.
    #[error("Transcode failed: {0}")]
    Transcode(String),

    /// Tags could not be written to the produced file.
    #[error("Tag write failed for {path}: {message}")]
    TagWrite { path: PathBuf, message: String },

    /// The playlist archive could not be assembled.
    #[error("Archive error: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Short label used in reports and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "InvalidInput",
            Error::Config(_) => "Config",
            Error::MetadataFetch(_) => "MetadataFetchError",
            Error::NoMatchFound(_) => "NoMatchFound",
            Error::Download(_) => "DownloadError",
            Error::Transcode(_) => "TranscodeError",
            Error::TagWrite { .. } => "TagWriteError",
            Error::Archive(_) => "ArchiveError",
            Error::Io(_) => "IoError",
            Error::Http(_) => "HttpError",
            Error::Json(_) => "JsonError",
        }
    }

    /// Whether this error ends the whole run rather than a single track.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::Config(_) | Error::MetadataFetch(_) | Error::Archive(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_level_errors_are_fatal() {
        assert!(Error::InvalidInput("x".into()).is_fatal());
        assert!(Error::MetadataFetch("x".into()).is_fatal());
        assert!(Error::Archive("disk full".into()).is_fatal());
        assert!(Error::Config("missing".into()).is_fatal());
    }

    #[test]
    fn track_level_errors_are_not_fatal() {
        assert!(!Error::NoMatchFound("x".into()).is_fatal());
        assert!(!Error::Download("x".into()).is_fatal());
        assert!(!Error::Transcode("x".into()).is_fatal());
        let tag = Error::TagWrite {
            path: PathBuf::from("a.flac"),
            message: "unknown container".into(),
        };
        assert!(!tag.is_fatal());
        assert_eq!(tag.kind(), "TagWriteError");
    }
}
