use std::path::PathBuf;

use chrono::Utc;
use reqwest::Client;
use tracing::{debug, warn};

use crate::{
    config::{self, SpotifyCredentials},
    error::Result,
    spotify,
    types::Token,
};

/// Seconds before expiry at which a cached token is treated as stale.
const EXPIRY_MARGIN_SECS: u64 = 240;

pub struct TokenManager {
    token: Option<Token>,
    path: PathBuf,
}

impl TokenManager {
    /// Manager around `token`, cached at the default location.
    pub fn new(token: Option<Token>) -> Self {
        Self {
            token,
            path: Self::token_path(),
        }
    }

    /// Loads the cached token, starting empty when there is none.
    pub async fn load() -> Self {
        let path = Self::token_path();
        let token = match async_fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<Token>(&content) {
                Ok(token) => Some(token),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring unreadable token cache");
                    None
                }
            },
            Err(_) => None,
        };
        Self::new(token)
    }

    pub async fn persist(&self) -> Result<()> {
        let Some(token) = &self.token else {
            return Ok(());
        };
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(token)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Returns a usable access token, requesting a new one when the cached
    /// token is missing or about to expire.
    pub async fn get_valid_token(
        &mut self,
        http: &Client,
        creds: &SpotifyCredentials,
    ) -> Result<String> {
        if let Some(token) = self.token.as_ref().filter(|t| !Self::is_expired(t)) {
            return Ok(token.access_token.clone());
        }

        debug!("cached token missing or expired");
        let token = spotify::auth::client_credentials(http, creds).await?;
        let access_token = token.access_token.clone();
        self.token = Some(token);

        if let Err(e) = self.persist().await {
            warn!(error = %e, "failed to cache access token");
        }

        Ok(access_token)
    }

    /// Drops the current token so the next call fetches a fresh one.
    pub fn invalidate(&mut self) {
        self.token = None;
    }

    fn is_expired(token: &Token) -> bool {
        let now = Utc::now().timestamp() as u64;
        now + EXPIRY_MARGIN_SECS >= token.obtained_at + token.expires_in
    }

    fn token_path() -> PathBuf {
        config::data_dir().join("cache/token.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(obtained_at: u64, expires_in: u64) -> Token {
        Token {
            access_token: "abc".into(),
            token_type: "Bearer".into(),
            expires_in,
            obtained_at,
        }
    }

    #[test]
    fn fresh_token_is_not_expired() {
        let now = Utc::now().timestamp() as u64;
        assert!(!TokenManager::is_expired(&token(now, 3600)));
    }

    #[test]
    fn token_inside_margin_is_expired() {
        let now = Utc::now().timestamp() as u64;
        assert!(TokenManager::is_expired(&token(now, EXPIRY_MARGIN_SECS - 10)));
        assert!(TokenManager::is_expired(&token(now - 7200, 3600)));
    }

    #[test]
    fn invalidate_clears_token() {
        let now = Utc::now().timestamp() as u64;
        let mut mgr = TokenManager::new(Some(token(now, 3600)));
        assert!(mgr.token.is_some());
        mgr.invalidate();
        assert!(mgr.token.is_none());
    }
}
