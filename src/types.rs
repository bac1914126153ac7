use std::{fmt, path::PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::utils;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub expires_in: u64,
    #[serde(default)]
    pub obtained_at: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Image {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtistObject {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbumObject {
    pub name: String,
    pub release_date: Option<String>,
    pub images: Vec<Image>,
}

/// Track object as returned by `/tracks/{id}` and inside playlist items.
///
/// Playlist items may also carry podcast episodes, so every field defaults
/// and `kind` decides whether the object is usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackObject {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub artists: Vec<ArtistObject>,
    pub album: AlbumObject,
    pub track_number: u32,
    pub duration_ms: u64,
    pub is_local: bool,
}

impl TrackObject {
    /// Converts the wire object into domain metadata. Episodes, local files
    /// and tracks without an id yield `None`.
    pub fn into_metadata(self) -> Option<TrackMetadata> {
        if self.kind != "track" || self.is_local {
            return None;
        }
        let id = self.id.filter(|id| !id.is_empty())?;

        let release_year = self
            .album
            .release_date
            .as_deref()
            .and_then(utils::year_from_release_date);

        let artwork_url = self
            .album
            .images
            .iter()
            .max_by_key(|i| i.width.unwrap_or(0))
            .map(|i| i.url.clone());

        Some(TrackMetadata {
            id,
            title: self.name,
            artists: self.artists.into_iter().map(|a| a.name).collect(),
            album: self.album.name,
            track_number: self.track_number,
            duration_secs: ((self.duration_ms + 500) / 1000) as u32,
            release_year,
            artwork_url,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistItem {
    pub track: Option<TrackObject>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistTracksPage {
    pub items: Vec<PlaylistItem>,
    pub next: Option<String>,
    pub total: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistObject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub tracks: PlaylistTracksPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Track,
    Playlist,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Track => write!(f, "track"),
            ContentKind::Playlist => write!(f, "playlist"),
        }
    }
}

/// A parsed Spotify link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyRef {
    pub kind: ContentKind,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    pub track_number: u32,
    pub duration_secs: u32,
    pub release_year: Option<i32>,
    pub artwork_url: Option<String>,
}

impl TrackMetadata {
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }

    /// `"<artists> - <title>"`, used both as search query and display name.
    pub fn display_name(&self) -> String {
        if self.artists.is_empty() {
            return self.title.clone();
        }
        format!("{} - {}", self.artist_line(), self.title)
    }

    /// Filesystem-safe stem shared by the staging file and the resume check.
    pub fn file_stem(&self) -> String {
        utils::sanitize_filename(&self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistMetadata {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub tracks: Vec<TrackMetadata>,
    /// Items dropped at fetch time (episodes, local or removed tracks).
    pub unavailable: usize,
}

/// A search result from the media backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub title: String,
    pub duration_secs: Option<u32>,
    /// Opaque handle the backend can fetch audio from.
    pub source: String,
    /// Position in the backend's own result list, 0 is most relevant.
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Matched { candidate: Candidate, score: f64 },
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Success(PathBuf),
    Skipped(String),
    Failed { kind: String, detail: String },
}

impl DownloadOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DownloadOutcome::Success(_) => "Success",
            DownloadOutcome::Skipped(_) => "Skipped",
            DownloadOutcome::Failed { .. } => "Failed",
        }
    }

    pub fn detail(&self) -> String {
        match self {
            DownloadOutcome::Success(path) => path.display().to_string(),
            DownloadOutcome::Skipped(reason) => reason.clone(),
            DownloadOutcome::Failed { kind, detail } => format!("{}: {}", kind, detail),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AudioFormat {
    Flac,
    Mp3,
    M4a,
    Opus,
    Wav,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Flac => "flac",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Opus => "opus",
            AudioFormat::Wav => "wav",
        }
    }

    pub fn is_lossless(&self) -> bool {
        matches!(self, AudioFormat::Flac | AudioFormat::Wav)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioQuality {
    Best,
    Kbps(u32),
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioQuality::Best => write!(f, "best"),
            AudioQuality::Kbps(k) => write!(f, "{}k", k),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AudioSource {
    Youtube,
    YoutubeMusic,
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSource::Youtube => write!(f, "YouTube"),
            AudioSource::YoutubeMusic => write!(f, "YouTube Music"),
        }
    }
}

#[derive(Tabled)]
pub struct OutcomeTableRow {
    #[tabled(rename = "#")]
    pub index: usize,
    pub track: String,
    pub outcome: String,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_json(kind: &str) -> String {
        format!(
            r#"{{
                "id": "4iV5W9uYEdYUVa79Axb7Rh",
                "name": "Around the World",
                "type": "{kind}",
                "artists": [{{"id": "a1", "name": "Daft Punk"}}],
                "album": {{
                    "name": "Homework",
                    "release_date": "1997-01-20",
                    "images": [
                        {{"url": "small", "width": 64, "height": 64}},
                        {{"url": "large", "width": 640, "height": 640}}
                    ]
                }},
                "track_number": 7,
                "duration_ms": 429533,
                "is_local": false
            }}"#
        )
    }

    #[test]
    fn track_object_converts_to_metadata() {
        let obj: TrackObject = serde_json::from_str(&track_json("track")).unwrap();
        let meta = obj.into_metadata().unwrap();

        assert_eq!(meta.id, "4iV5W9uYEdYUVa79Axb7Rh");
        assert_eq!(meta.artists, vec!["Daft Punk".to_string()]);
        assert_eq!(meta.album, "Homework");
        assert_eq!(meta.track_number, 7);
        assert_eq!(meta.duration_secs, 430);
        assert_eq!(meta.release_year, Some(1997));
        assert_eq!(meta.artwork_url.as_deref(), Some("large"));
        assert_eq!(meta.display_name(), "Daft Punk - Around the World");
    }

    #[test]
    fn episodes_are_not_tracks() {
        let obj: TrackObject = serde_json::from_str(&track_json("episode")).unwrap();
        assert!(obj.into_metadata().is_none());
    }

    #[test]
    fn episode_without_album_still_deserializes() {
        let item: PlaylistItem =
            serde_json::from_str(r#"{"track": {"id": "e1", "name": "Pod", "type": "episode"}}"#)
                .unwrap();
        assert!(item.track.unwrap().into_metadata().is_none());
    }

    #[test]
    fn outcome_detail_includes_failure_kind() {
        let failed = DownloadOutcome::Failed {
            kind: "NoMatchFound".into(),
            detail: "nothing".into(),
        };
        assert_eq!(failed.label(), "Failed");
        assert_eq!(failed.detail(), "NoMatchFound: nothing");
    }
}
