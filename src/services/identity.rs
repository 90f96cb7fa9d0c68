//! Bearer-token verification against the external identity service.
//!
//! Token issuance lives entirely in that service; this side only asks
//! "which user does this token belong to?" and caches the answer.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;

#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    #[error("authentication token is not valid: {0}")]
    Rejected(String),

    #[error("{0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Resolve a bearer token to a stable user identifier.
    async fn verify(&self, token: &str) -> Result<String, IdentityError>;
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    access_token: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    valid: bool,
    user_id: Option<String>,
}

pub struct HttpIdentityVerifier {
    http_client: Client,
    verify_url: String,
    // token -> user id, only successful verifications are cached
    verified: Cache<String, String>,
}

impl HttpIdentityVerifier {
    /// # Errors
    ///
    /// Returns `IdentityError::Unavailable` if the HTTP client cannot be built.
    pub fn new(verify_url: impl Into<String>, config: &Config) -> Result<Self, IdentityError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| IdentityError::Unavailable(format!("Failed to create HTTP client: {e}")))?;

        let verified = Cache::builder()
            .max_capacity(config.auth_cache_max_entries)
            .time_to_live(Duration::from_secs(config.auth_cache_ttl_seconds))
            .build();

        Ok(Self {
            http_client,
            verify_url: verify_url.into(),
            verified,
        })
    }

    async fn verify_remote(&self, token: &str) -> Result<String, IdentityError> {
        let response = self
            .http_client
            .post(&self.verify_url)
            .json(&VerifyRequest {
                access_token: token,
            })
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IdentityError::Rejected(format!(
                "identity service returned HTTP {}",
                response.status()
            )));
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("Failed to parse response: {e}")))?;

        match (body.valid, body.user_id) {
            (true, Some(user_id)) if !user_id.is_empty() => Ok(user_id),
            (true, _) => Err(IdentityError::Rejected("no user bound to token".to_string())),
            (false, _) => Err(IdentityError::Rejected("token rejected".to_string())),
        }
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<String, IdentityError> {
        if let Some(user_id) = self.verified.get(token).await {
            return Ok(user_id);
        }

        let user_id = self.verify_remote(token).await?;
        self.verified
            .insert(token.to_string(), user_id.clone())
            .await;
        Ok(user_id)
    }
}
