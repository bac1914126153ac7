use tracing::debug;

use crate::{
    error::{Error, Result},
    types::{TrackMetadata, TrackObject},
};

use super::SpotifyClient;

/// Retrieves a single track from the Spotify Web API.
///
/// Uses `GET /tracks/{id}` and converts the response into
/// [`TrackMetadata`]. Local files and non-track objects are rejected because
/// there is nothing to search for.
///
/// # Errors
///
/// Returns [`Error::MetadataFetch`] for unknown ids, authentication or
/// network problems, and for objects that are not playable tracks.
pub async fn get_track(client: &SpotifyClient, id: &str) -> Result<TrackMetadata> {
    let url = format!("{}/tracks/{}", client.api_url(), id);
    let track: TrackObject = client.get_json(&url).await?;

    debug!(track_id = id, name = %track.name, "fetched track");

    track
        .into_metadata()
        .ok_or_else(|| Error::MetadataFetch(format!("{} is not a downloadable track", id)))
}
