use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::{
    config::SpotifyCredentials,
    error::{Error, Result},
    types::Token,
};

/// Obtains an app access token with the OAuth 2.0 client-credentials grant.
///
/// Public track and playlist metadata does not need a user login, so the
/// client id and secret are exchanged directly for a bearer token. The
/// response carries no refresh token; a new token is requested once the
/// cached one expires.
///
/// # Errors
///
/// Returns [`Error::MetadataFetch`] when the token endpoint rejects the
/// credentials or responds without an `access_token`.
pub async fn client_credentials(http: &Client, creds: &SpotifyCredentials) -> Result<Token> {
    debug!(token_url = %creds.token_url, "requesting client-credentials token");

    let response = http
        .post(&creds.token_url)
        .basic_auth(&creds.client_id, Some(&creds.client_secret))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await
        .map_err(|e| Error::MetadataFetch(format!("token request failed: {}", e)))?;

    let status = response.status();
    let json: Value = response
        .json()
        .await
        .map_err(|e| Error::MetadataFetch(format!("invalid token response: {}", e)))?;

    if !status.is_success() {
        let reason = json["error_description"]
            .as_str()
            .or_else(|| json["error"].as_str())
            .unwrap_or("unknown error");
        return Err(Error::MetadataFetch(format!(
            "Spotify authentication failed ({}): {}. Check SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET",
            status, reason
        )));
    }

    token_from_json(&json)
}

fn token_from_json(json: &Value) -> Result<Token> {
    let access_token = json["access_token"]
        .as_str()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::MetadataFetch("token response without access_token".to_string()))?;

    Ok(Token {
        access_token: access_token.to_string(),
        token_type: json["token_type"]
            .as_str()
            .unwrap_or("Bearer")
            .to_string(),
        expires_in: json["expires_in"].as_u64().unwrap_or(3600),
        obtained_at: Utc::now().timestamp() as u64,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn token_from_complete_response() {
        let token = token_from_json(&json!({
            "access_token": "BQC123",
            "token_type": "Bearer",
            "expires_in": 1800
        }))
        .unwrap();

        assert_eq!(token.access_token, "BQC123");
        assert_eq!(token.expires_in, 1800);
        assert!(token.obtained_at > 0);
    }

    #[test]
    fn token_defaults_expiry() {
        let token = token_from_json(&json!({ "access_token": "BQC123" })).unwrap();
        assert_eq!(token.expires_in, 3600);
        assert_eq!(token.token_type, "Bearer");
    }

    #[test]
    fn token_requires_access_token() {
        let err = token_from_json(&json!({ "token_type": "Bearer" })).unwrap_err();
        assert!(matches!(err, Error::MetadataFetch(_)));
    }
}
