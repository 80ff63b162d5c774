//! IAM token-exchange authentication.
//!
//! Exchanges a long-lived API key for a short-lived bearer token at an IAM
//! token endpoint, caches it, and refreshes it shortly before expiry.
//!
//! # Token Response Format
//!
//! ```json
//! {
//!   "access_token": "eyJraWQiOi...",
//!   "refresh_token": "OKBc2...",
//!   "token_type": "Bearer",
//!   "expires_in": 3600,
//!   "expiration": 1735000000
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use restkit_core::auth::credential_value;
use restkit_core::{AuthError, Authenticator, Request};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument, trace, warn};

// ============================================================================
// Constants
// ============================================================================

/// Public IAM token endpoint.
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com/identity/token";

/// Grant type for exchanging an API key.
pub const API_KEY_GRANT: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Grant type for refreshing a token.
pub const REFRESH_TOKEN_GRANT: &str = "refresh_token";

/// Client credentials the token endpoint expects (`bx:bx`).
const IAM_CLIENT_AUTH: &str = "Basic Yng6Yng=";

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_BUFFER_MINUTES: i64 = 5;

// ============================================================================
// Token
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expiration: Option<i64>,
}

/// A cached IAM access token.
#[derive(Debug, Clone)]
pub struct IamToken {
    /// Bearer token.
    pub access_token: String,
    /// Token for the refresh grant.
    pub refresh_token: Option<String>,
    /// Expiration time.
    pub expires_at: Option<DateTime<Utc>>,
}

impl IamToken {
    fn from_response(response: TokenResponse) -> Self {
        let expires_at = response
            .expiration
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .or_else(|| {
                // out-of-range lifetimes are treated as non-expiring
                response
                    .expires_in
                    .and_then(Duration::try_seconds)
                    .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            });

        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at,
        }
    }

    /// Check if the token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= Utc::now() + Duration::minutes(EXPIRY_BUFFER_MINUTES),
            // No expiration = assume valid
            None => false,
        }
    }
}

// ============================================================================
// IAM Authenticator
// ============================================================================

/// Bearer authentication with tokens obtained from an IAM endpoint.
///
/// The token cache is shared by every request using this authenticator; a
/// refresh holds the cache lock so concurrent requests wait for one exchange
/// instead of each starting their own.
pub struct IamAuthenticator {
    api_key: String,
    url: String,
    http: Client,
    token: Mutex<Option<IamToken>>,
}

impl IamAuthenticator {
    /// Creates an authenticator against the public IAM endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_url(api_key, DEFAULT_IAM_URL)
    }

    /// Creates an authenticator against a custom token endpoint.
    pub fn with_url(api_key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: url.into(),
            http: Client::new(),
            token: Mutex::new(None),
        }
    }

    /// Uses `client` for token requests.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Returns a valid access token, exchanging or refreshing as needed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredential`] for an empty API key and
    /// [`AuthError::TokenExchange`] if the endpoint rejects the exchange.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn access_token(&self) -> Result<String, AuthError> {
        if self.api_key.trim().is_empty() {
            return Err(AuthError::MissingCredential("IAM API key".to_string()));
        }

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|token| !token.is_expired()) {
            trace!(hit = true, "IAM token cache lookup");
            return Ok(token.access_token.clone());
        }

        let refresh_token = cached.as_ref().and_then(|token| token.refresh_token.clone());
        let token = match refresh_token {
            Some(refresh_token) => match self.refresh(&refresh_token).await {
                Ok(token) => token,
                Err(e) => {
                    warn!(error = %e, "IAM token refresh failed, requesting a new token");
                    self.exchange().await?
                }
            },
            None => self.exchange().await?,
        };

        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Drops the cached token so the next request performs a fresh exchange.
    pub async fn invalidate(&self) {
        self.token.lock().await.take();
        debug!("Invalidated IAM token cache");
    }

    async fn exchange(&self) -> Result<IamToken, AuthError> {
        debug!("Requesting IAM token");
        self.request_token(&[("grant_type", API_KEY_GRANT), ("apikey", self.api_key.as_str())])
            .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<IamToken, AuthError> {
        debug!("Refreshing IAM token");
        self.request_token(&[("grant_type", REFRESH_TOKEN_GRANT), ("refresh_token", refresh_token)])
            .await
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<IamToken, AuthError> {
        let response = self
            .http
            .post(&self.url)
            .header(AUTHORIZATION, IAM_CLIENT_AUTH)
            .header(ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenExchange(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;
        Ok(IamToken::from_response(parsed))
    }
}

impl std::fmt::Debug for IamAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IamAuthenticator")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Authenticator for IamAuthenticator {
    fn name(&self) -> &str {
        "iam"
    }

    async fn authenticate(&self, request: Request) -> Result<Request, AuthError> {
        let token = self.access_token().await?;
        let value = credential_value(&format!("Bearer {token}"))?;
        Ok(request.with_header(AUTHORIZATION, value))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_at: Option<DateTime<Utc>>) -> IamToken {
        IamToken {
            access_token: "t".to_string(),
            refresh_token: None,
            expires_at,
        }
    }

    #[test]
    fn test_expiry_buffer() {
        assert!(!token(None).is_expired());
        assert!(!token(Some(Utc::now() + Duration::hours(1))).is_expired());
        assert!(token(Some(Utc::now() + Duration::minutes(2))).is_expired());
        assert!(token(Some(Utc::now() - Duration::minutes(1))).is_expired());
    }

    #[test]
    fn test_expiration_prefers_absolute_timestamp() {
        let parsed = IamToken::from_response(TokenResponse {
            access_token: "a".into(),
            refresh_token: Some("r".into()),
            expires_in: Some(3600),
            expiration: Some(1_735_000_000),
        });
        assert_eq!(parsed.expires_at.unwrap().timestamp(), 1_735_000_000);

        let parsed = IamToken::from_response(TokenResponse {
            access_token: "a".into(),
            refresh_token: None,
            expires_in: Some(3600),
            expiration: None,
        });
        assert!(!parsed.is_expired());
    }

    #[test]
    fn test_huge_lifetime_does_not_overflow() {
        for expires_in in [i64::MAX, i64::MIN, i64::MAX / 1000] {
            let parsed = IamToken::from_response(TokenResponse {
                access_token: "a".into(),
                refresh_token: None,
                expires_in: Some(expires_in),
                expiration: None,
            });
            assert!(parsed.expires_at.is_none(), "expires_in = {expires_in}");
        }

        let parsed = IamToken::from_response(TokenResponse {
            access_token: "a".into(),
            refresh_token: None,
            expires_in: Some(i64::MAX),
            expiration: Some(i64::MAX),
        });
        assert!(parsed.expires_at.is_none());
        assert!(!parsed.is_expired());
    }

    #[tokio::test]
    async fn test_bearer_header_is_sensitive() {
        let auth = IamAuthenticator::with_url("my-key", "http://127.0.0.1:1/token");
        *auth.token.lock().await = Some(IamToken {
            access_token: "tok-1".to_string(),
            refresh_token: None,
            expires_at: None,
        });

        let request = Request::builder(
            "GET",
            "https://api.example.com/",
            std::sync::Arc::new(restkit_core::NoAuth),
        )
        .build();
        let request = auth.authenticate(request).await.unwrap();
        let value = &request.headers()[AUTHORIZATION];
        assert_eq!(value, "Bearer tok-1");
        assert!(value.is_sensitive());
    }

    #[tokio::test]
    async fn test_empty_api_key() {
        let auth = IamAuthenticator::with_url("", "http://127.0.0.1:1/token");
        let err = auth.access_token().await.unwrap_err();
        assert!(matches!(err, AuthError::MissingCredential(_)));
    }
}
