//! Credentials used to authorize provider calls for the lifetime of one job.

use crate::utils::errors::{EngineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::info;

/// Refresh this long before the reported expiry.
const EXPIRY_SKEW_SECS: i64 = 30;

#[async_trait]
pub trait Credential: Send + Sync {
    fn access_token(&self) -> &str;

    fn is_expired(&self) -> bool;

    /// Whether `refresh` has any chance of succeeding.
    fn can_refresh(&self) -> bool {
        false
    }

    async fn refresh(&mut self) -> Result<()>;

    /// A credential is usable when it has a token now or can obtain one.
    fn is_usable(&self) -> bool {
        !self.access_token().is_empty() || self.can_refresh()
    }
}

/// Fixed token with no expiry and no refresh path.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl Credential for BearerToken {
    fn access_token(&self) -> &str {
        &self.0
    }

    fn is_expired(&self) -> bool {
        false
    }

    async fn refresh(&mut self) -> Result<()> {
        Err(EngineError::Auth("bearer token cannot be refreshed".into()))
    }
}

/// OAuth client registration used for the refresh grant.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
}

/// Access token with an optional refresh token, refreshed over HTTP.
#[derive(Debug, Clone)]
pub struct OAuthCredential {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    client: OAuthClient,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl OAuthCredential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        client: OAuthClient,
        http: reqwest::Client,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
            expires_at,
            client,
            http,
        }
    }
}

#[async_trait]
impl Credential for OAuthCredential {
    fn access_token(&self) -> &str {
        &self.access_token
    }

    fn is_expired(&self) -> bool {
        if self.access_token.is_empty() {
            return true;
        }
        match self.expires_at {
            Some(at) => at - Duration::seconds(EXPIRY_SKEW_SECS) <= Utc::now(),
            None => false,
        }
    }

    fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && !self.client.client_id.is_empty()
    }

    async fn refresh(&mut self) -> Result<()> {
        let refresh_token = self
            .refresh_token
            .clone()
            .ok_or_else(|| EngineError::Auth("credential has no refresh token".into()))?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.client.client_id.as_str()),
            ("client_secret", self.client.client_secret.as_str()),
        ];

        let resp = self
            .http
            .post(&self.client.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| EngineError::Auth(format!("token refresh request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::Auth(format!(
                "token refresh rejected with status {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::Auth(format!("invalid token response: {}", e)))?;

        self.access_token = token.access_token;
        self.expires_at = token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs));
        if let Some(rotated) = token.refresh_token {
            self.refresh_token = Some(rotated);
        }

        info!(expires_at = ?self.expires_at, "Refreshed access token");
        Ok(())
    }
}
