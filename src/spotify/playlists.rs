use tracing::{debug, warn};

use crate::{
    error::Result,
    types::{PlaylistItem, PlaylistMetadata, PlaylistObject, PlaylistTracksPage},
};

use super::SpotifyClient;

/// Retrieves a playlist and every track in it, preserving playlist order.
///
/// The first page of items arrives with `GET /playlists/{id}`; further pages
/// are fetched by following the `next` links. Items that are not downloadable
/// tracks (episodes, local files, tracks removed from the catalogue) are
/// dropped and counted in [`PlaylistMetadata::unavailable`].
pub async fn get_playlist(client: &SpotifyClient, id: &str) -> Result<PlaylistMetadata> {
    let url = format!(
        "{}/playlists/{}?additional_types=track",
        client.api_url(),
        id
    );
    let playlist: PlaylistObject = client.get_json(&url).await?;

    let mut items = playlist.tracks.items;
    let mut next = playlist.tracks.next;
    while let Some(next_url) = next {
        let page: PlaylistTracksPage = client.get_json(&next_url).await?;
        debug!(playlist_id = id, page_items = page.items.len(), "fetched playlist page");
        items.extend(page.items);
        next = page.next;
    }

    let mut metadata = collect_tracks(items);
    metadata.id = playlist.id;
    metadata.name = playlist.name;
    metadata.description = playlist.description.filter(|d| !d.is_empty());

    debug!(
        playlist_id = id,
        tracks = metadata.tracks.len(),
        unavailable = metadata.unavailable,
        "fetched playlist"
    );
    Ok(metadata)
}

fn collect_tracks(items: Vec<PlaylistItem>) -> PlaylistMetadata {
    let mut tracks = Vec::with_capacity(items.len());
    let mut unavailable = 0;

    for (position, item) in items.into_iter().enumerate() {
        match item.track.and_then(|t| t.into_metadata()) {
            Some(track) => tracks.push(track),
            None => {
                warn!(position = position + 1, "skipping playlist item that is not a downloadable track");
                unavailable += 1;
            }
        }
    }

    PlaylistMetadata {
        id: String::new(),
        name: String::new(),
        description: None,
        tracks,
        unavailable,
    }
}
