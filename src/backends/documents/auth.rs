//! OAuth access tokens for the Firestore REST API.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::DocumentError;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Supplies bearer tokens for outgoing requests. `None` means send the
/// request unauthenticated (emulator).
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Option<String>, DocumentError>;
}

/// Fixed token, or no token at all.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<Option<String>, DocumentError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: i64,
}

/// Default service account token from the GCE metadata server, cached
/// until shortly before expiry.
pub struct MetadataServerToken {
    http: reqwest::Client,
    url: String,
    cache: RwLock<Option<CachedToken>>,
}

impl MetadataServerToken {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_url(http, METADATA_TOKEN_URL)
    }

    pub fn with_url(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            cache: RwLock::new(None),
        }
    }

    fn fresh(cached: &Option<CachedToken>) -> Option<String> {
        cached
            .as_ref()
            .filter(|t| t.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > Utc::now())
            .map(|t| t.value.clone())
    }

    async fn fetch(&self) -> Result<CachedToken, DocumentError> {
        let response = self
            .http
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| DocumentError::Auth(format!("metadata server unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(DocumentError::Auth(format!(
                "metadata server returned {}",
                response.status()
            )));
        }

        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| DocumentError::Auth(format!("invalid metadata token response: {e}")))?;

        Ok(CachedToken {
            value: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }
}

#[async_trait]
impl TokenSource for MetadataServerToken {
    async fn token(&self) -> Result<Option<String>, DocumentError> {
        if let Some(token) = Self::fresh(&*self.cache.read().await) {
            return Ok(Some(token));
        }

        let mut cache = self.cache.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(token) = Self::fresh(&cache) {
            return Ok(Some(token));
        }

        let token = self.fetch().await?;
        tracing::debug!(expires_at = %token.expires_at, "Fetched Firestore access token");
        let value = token.value.clone();
        *cache = Some(token);
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        assert_eq!(
            StaticToken::new("abc").token().await.unwrap(),
            Some("abc".to_string())
        );
        assert_eq!(StaticToken::anonymous().token().await.unwrap(), None);
    }

    #[test]
    fn test_cached_token_freshness() {
        let valid = Some(CachedToken {
            value: "t".into(),
            expires_at: Utc::now() + Duration::seconds(3600),
        });
        assert_eq!(MetadataServerToken::fresh(&valid), Some("t".to_string()));

        let expiring = Some(CachedToken {
            value: "t".into(),
            expires_at: Utc::now() + Duration::seconds(REFRESH_MARGIN_SECS / 2),
        });
        assert_eq!(MetadataServerToken::fresh(&expiring), None);
        assert_eq!(MetadataServerToken::fresh(&None), None);
    }
}
