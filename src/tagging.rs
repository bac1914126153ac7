//! Tag Writer.
//!
//! Writes track metadata into the tag container lofty considers primary for
//! the file's format: Vorbis comments for FLAC and Opus, ID3v2 for MP3 and
//! WAV, MP4 ilst atoms for M4A.

use std::path::Path;

use lofty::{
    config::WriteOptions,
    file::TaggedFileExt,
    picture::{MimeType, Picture, PictureType},
    probe::Probe,
    tag::{Accessor, Tag, TagExt},
};
use tracing::debug;

use crate::{
    error::{Error, Result},
    types::TrackMetadata,
};

const PNG_SIGNATURE: &[u8] = b"\x89PNG";

/// Writes title, artists, album, track number, release year and, when given,
/// the front cover image into the file at `path`.
pub fn write_tags(path: &Path, track: &TrackMetadata, cover: Option<&[u8]>) -> Result<()> {
    let tag_error = |message: String| Error::TagWrite {
        path: path.to_path_buf(),
        message,
    };

    let mut tagged_file = Probe::open(path)
        .map_err(|e| tag_error(e.to_string()))?
        .guess_file_type()
        .map_err(|e| tag_error(e.to_string()))?
        .read()
        .map_err(|e| tag_error(e.to_string()))?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| tag_error(format!("no {:?} tag available", tag_type)))?;

    tag.set_title(track.title.clone());
    if !track.artists.is_empty() {
        tag.set_artist(track.artist_line());
    }
    if !track.album.is_empty() {
        tag.set_album(track.album.clone());
    }
    if track.track_number > 0 {
        tag.set_track(track.track_number);
    }
    if let Some(year) = track.release_year.and_then(|y| u32::try_from(y).ok()) {
        tag.set_year(year);
    }

    if let Some(data) = cover.filter(|d| !d.is_empty()) {
        let mime = if data.starts_with(PNG_SIGNATURE) {
            MimeType::Png
        } else {
            MimeType::Jpeg
        };
        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(mime),
            None,
            data.to_vec(),
        ));
    }

    tag.save_to_path(path, WriteOptions::default())
        .map_err(|e| tag_error(e.to_string()))?;

    debug!(path = %path.display(), tag = ?tag_type, "tags written");
    Ok(())
}
