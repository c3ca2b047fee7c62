//! API-key exchange and bearer-token lifecycle.
//!
//! The long-lived API key is exchanged for a short-lived bearer token via
//! the organization's sign-in endpoint. The current token is cached
//! in-memory and replaced once it is within five minutes of expiry, or
//! immediately after [`TokenAuthenticator::invalidate`] (used when a
//! downstream call observes a 401).

use chrono::{Duration, Utc};
use secrecy::ExposeSecret;
use tokio::sync::Mutex;

use crate::config::AmigoConfig;
use crate::error::AmigoError;
use crate::types::SignInWithApiKeyResponse;

/// Refresh this long before the token actually expires.
const EXPIRY_SKEW_MINUTES: i64 = 5;

/// Perform the API-key → bearer-token exchange. One attempt; every failure
/// mode (transport, non-2xx, malformed body) maps to `Authentication`.
pub async fn sign_in_with_api_key(
    http: &reqwest::Client,
    config: &AmigoConfig,
) -> Result<SignInWithApiKeyResponse, AmigoError> {
    let url = format!(
        "{}/v1/{}/user/signin_with_api_key",
        config.base_url, config.organization_id
    );
    let response = http
        .post(&url)
        .header("x-api-key", config.api_key.expose_secret())
        .header("x-api-key-id", &config.api_key_id)
        .header("x-user-id", &config.user_id)
        .send()
        .await
        .map_err(|e| AmigoError::Authentication {
            status: None,
            message: format!("sign in with API key failed: {e}"),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AmigoError::Authentication {
            status: Some(status.as_u16()),
            message: format!("sign in with API key failed: HTTP {}", status.as_u16()),
        });
    }

    response
        .json::<SignInWithApiKeyResponse>()
        .await
        .map_err(|e| AmigoError::Authentication {
            status: None,
            message: format!("invalid sign-in response format: {e}"),
        })
}

/// Whether a held token is due for replacement.
fn needs_refresh(token: &SignInWithApiKeyResponse) -> bool {
    Utc::now() > token.expires_at - Duration::minutes(EXPIRY_SKEW_MINUTES)
}

/// Owns the current bearer token and refreshes it on demand.
///
/// The token slot is guarded by an async mutex held across the exchange, so
/// concurrent [`ensure_token`](Self::ensure_token) calls are single-flight:
/// one caller performs the exchange while the rest wait and reuse its result.
pub struct TokenAuthenticator {
    http: reqwest::Client,
    config: AmigoConfig,
    token: Mutex<Option<SignInWithApiKeyResponse>>,
}

impl TokenAuthenticator {
    pub fn new(http: reqwest::Client, config: AmigoConfig) -> Self {
        Self {
            http,
            config,
            token: Mutex::new(None),
        }
    }

    /// Return the current bearer string, refreshing first if the token is
    /// absent or within the expiry skew window.
    pub async fn ensure_token(&self) -> Result<String, AmigoError> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref()
            && !needs_refresh(token)
        {
            return Ok(token.id_token.clone());
        }

        tracing::debug!("bearer token missing or near expiry, exchanging API key");
        let fresh = sign_in_with_api_key(&self.http, &self.config).await?;
        let id_token = fresh.id_token.clone();
        *slot = Some(fresh);
        Ok(id_token)
    }

    /// Drop the held token so the next [`ensure_token`](Self::ensure_token)
    /// is forced to refresh.
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_expiring_in(minutes: i64) -> SignInWithApiKeyResponse {
        SignInWithApiKeyResponse {
            id_token: "tok".to_string(),
            expires_at: Utc::now() + Duration::minutes(minutes),
        }
    }

    #[test]
    fn fresh_token_is_not_refreshed() {
        assert!(!needs_refresh(&token_expiring_in(60)));
    }

    #[test]
    fn token_inside_skew_window_is_refreshed() {
        assert!(needs_refresh(&token_expiring_in(4)));
    }

    #[test]
    fn expired_token_is_refreshed() {
        assert!(needs_refresh(&token_expiring_in(-10)));
    }
}
