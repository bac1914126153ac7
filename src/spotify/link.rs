use crate::{
    error::{Error, Result},
    types::{ContentKind, SpotifyRef},
};

/// Classifies a Spotify link and extracts its id.
///
/// Accepts web URLs (`https://open.spotify.com/track/<id>?si=...`, including
/// locale segments such as `/intl-de/`) and URIs (`spotify:playlist:<id>`).
/// The id must be non-empty ASCII alphanumeric.
pub fn parse(input: &str) -> Result<SpotifyRef> {
    let trimmed = input.trim();

    let found = if let Some(rest) = trimmed.strip_prefix("spotify:") {
        parse_uri(rest)
    } else {
        parse_web_url(trimmed)
    };

    match found {
        Some((kind, id)) if is_valid_id(id) => Ok(SpotifyRef {
            kind,
            id: id.to_string(),
        }),
        _ => Err(Error::InvalidInput(trimmed.to_string())),
    }
}

fn parse_uri(rest: &str) -> Option<(ContentKind, &str)> {
    let (kind, id) = rest.split_once(':')?;
    Some((kind_from_segment(kind)?, id))
}

fn parse_web_url(url: &str) -> Option<(ContentKind, &str)> {
    let without_fragment = url.split('#').next().unwrap_or_default();
    let path = without_fragment.split('?').next().unwrap_or_default();

    let mut segments = path.split('/');
    while let Some(segment) = segments.next() {
        if let Some(kind) = kind_from_segment(segment) {
            return Some((kind, segments.next().unwrap_or_default()));
        }
    }
    None
}

fn kind_from_segment(segment: &str) -> Option<ContentKind> {
    match segment {
        "track" => Some(ContentKind::Track),
        "playlist" => Some(ContentKind::Playlist),
        _ => None,
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}
