//! Vendor access-token acquisition and caching.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use salescast_core::config::{CredentialMode, LlmConfig};

/// A cached token is refreshed once it is this close to expiry.
pub const REFRESH_MARGIN_SECS: i64 = 60;
const DEFAULT_EXPIRES_IN_SECS: i64 = 3_600;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token endpoint rate limited the request")]
    RateLimited,
    #[error("token endpoint returned HTTP {status}")]
    Status { status: u16 },
    #[error("token request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("token response was malformed: {0}")]
    Malformed(String),
}

impl TokenError {
    /// Rate limiting, server errors and transport failures are retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited | Self::Transport(_) => true,
            Self::Status { status } => *status >= 500,
            Self::Malformed(_) => false,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Credentials {
    /// Pre-issued token sent as-is.
    Legacy(SecretString),
    /// Encoded `client_id:client_secret` for the Basic header.
    Basic(SecretString),
}

impl Credentials {
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        match config.credential_mode() {
            CredentialMode::Legacy => config.credentials.clone().map(Self::Legacy),
            CredentialMode::AuthKey => config.auth_key.clone().map(Self::Basic),
            CredentialMode::ClientPair => {
                let client_id = config.client_id.as_deref()?;
                let client_secret = config.client_secret.as_ref()?;
                let encoded =
                    STANDARD.encode(format!("{client_id}:{}", client_secret.expose_secret()));
                Some(Self::Basic(encoded.into()))
            }
            CredentialMode::None => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AccessToken {
    value: SecretString,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: SecretString, expires_at: DateTime<Utc>) -> Self {
        Self { value, expires_at }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Epoch milliseconds.
    #[serde(default)]
    expires_at: Option<i64>,
}

impl TokenResponse {
    fn into_token(self, now: DateTime<Utc>) -> Result<AccessToken, TokenError> {
        if self.access_token.trim().is_empty() {
            return Err(TokenError::Malformed("empty access_token".to_string()));
        }
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(millis), _) => DateTime::<Utc>::from_timestamp_millis(millis)
                .ok_or_else(|| TokenError::Malformed(format!("invalid expires_at: {millis}")))?,
            (None, expires_in) => {
                now + chrono::Duration::seconds(expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS))
            }
        };
        Ok(AccessToken::new(self.access_token.into(), expires_at))
    }
}

/// Hands out bearer tokens, calling the vendor only when the cached token is
/// missing or about to expire.
///
/// The cache lock is never held across the token request, so concurrent
/// callers may refresh redundantly; the last successful refresh wins.
pub struct TokenProvider {
    http: reqwest::Client,
    auth_url: String,
    scope: String,
    credentials: Credentials,
    max_attempts: u32,
    retry_base_delay: Duration,
    timeout: Duration,
    cache: RwLock<Option<AccessToken>>,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, config: &LlmConfig, credentials: Credentials) -> Self {
        Self {
            http,
            auth_url: config.auth_url.clone(),
            scope: config.scope.clone(),
            credentials,
            max_attempts: config.max_attempts.max(1),
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            timeout: Duration::from_secs(config.token_timeout_secs),
            cache: RwLock::new(None),
        }
    }

    pub async fn bearer(&self) -> Result<SecretString, TokenError> {
        let basic = match &self.credentials {
            Credentials::Legacy(token) => return Ok(token.clone()),
            Credentials::Basic(key) => key,
        };

        if let Some(token) = self.cache.read().await.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.value.clone());
            }
        }

        let token = self.fetch_with_retry(basic).await?;
        info!(
            event_name = "llm.token.refreshed",
            expires_at = %token.expires_at(),
            "vendor access token refreshed"
        );
        let value = token.value.clone();
        *self.cache.write().await = Some(token);
        Ok(value)
    }

    async fn fetch_with_retry(&self, basic: &SecretString) -> Result<AccessToken, TokenError> {
        let mut attempt = 1;
        let mut delay = self.retry_base_delay;

        loop {
            match self.request_token(basic).await {
                Ok(token) => return Ok(token),
                Err(error) if error.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        event_name = "llm.token.retry",
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "token request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn request_token(&self, basic: &SecretString) -> Result<AccessToken, TokenError> {
        let response = self
            .http
            .post(&self.auth_url)
            .header(AUTHORIZATION, format!("Basic {}", basic.expose_secret()))
            .header(ACCEPT, "application/json")
            .header("RqUID", Uuid::new_v4().to_string())
            .form(&[("scope", self.scope.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(TokenError::Transport)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TokenError::RateLimited);
        }
        if !status.is_success() {
            return Err(TokenError::Status { status: status.as_u16() });
        }

        let body: TokenResponse =
            response.json().await.map_err(|e| TokenError::Malformed(e.to_string()))?;
        body.into_token(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use secrecy::ExposeSecret;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use salescast_core::config::AppConfig;

    use super::{AccessToken, Credentials, TokenError, TokenProvider, TokenResponse};

    fn provider(server: &MockServer, max_attempts: u32) -> TokenProvider {
        let mut config = AppConfig::default().llm;
        config.auth_url = format!("{}/oauth", server.uri());
        config.max_attempts = max_attempts;
        config.retry_base_delay_ms = 5;
        TokenProvider::new(
            reqwest::Client::new(),
            &config,
            Credentials::Basic("ZW5jb2RlZA==".to_string().into()),
        )
    }

    #[test]
    fn client_pair_is_base64_encoded() {
        let mut config = AppConfig::default().llm;
        config.client_id = Some("id".to_string());
        config.client_secret = Some("secret".to_string().into());

        match Credentials::from_config(&config) {
            Some(Credentials::Basic(key)) => assert_eq!(key.expose_secret(), "aWQ6c2VjcmV0"),
            other => panic!("unexpected credentials: {other:?}"),
        }
        assert!(Credentials::from_config(&AppConfig::default().llm).is_none());
    }

    #[test]
    fn token_freshness_respects_refresh_margin() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).single().expect("valid time");
        let token = AccessToken::new("t".to_string().into(), now + Duration::seconds(90));
        assert!(token.is_fresh(now));
        assert!(!token.is_fresh(now + Duration::seconds(30)));
    }

    #[test]
    fn expiry_accepts_seconds_or_epoch_millis() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).single().expect("valid time");

        let relative: TokenResponse =
            serde_json::from_value(json!({"access_token": "a", "expires_in": 1800}))
                .expect("token json");
        assert_eq!(relative.into_token(now).expect("token").expires_at(), now + Duration::minutes(30));

        let absolute: TokenResponse = serde_json::from_value(
            json!({"access_token": "a", "expires_at": now.timestamp_millis() + 5_000}),
        )
        .expect("token json");
        assert_eq!(absolute.into_token(now).expect("token").expires_at(), now + Duration::seconds(5));

        let defaulted: TokenResponse =
            serde_json::from_value(json!({"access_token": "a"})).expect("token json");
        assert_eq!(defaulted.into_token(now).expect("token").expires_at(), now + Duration::hours(1));
    }

    #[tokio::test]
    async fn cached_token_is_reused_within_validity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth"))
            .and(header("authorization", "Basic ZW5jb2RlZA=="))
            .and(header_exists("RqUID"))
            .and(body_string_contains("scope=GIGACHAT_API_PERS"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "tok-1", "expires_in": 1800})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tokens = provider(&server, 3);
        let first = tokens.bearer().await.expect("first token");
        let second = tokens.bearer().await.expect("second token");

        assert_eq!(first.expose_secret(), "tok-1");
        assert_eq!(second.expose_secret(), "tok-1");
    }

    #[tokio::test]
    async fn token_inside_refresh_margin_is_fetched_again() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "short-lived", "expires_in": 30})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let tokens = provider(&server, 3);
        tokens.bearer().await.expect("first token");
        let second = tokens.bearer().await.expect("refreshed token");

        assert_eq!(second.expose_secret(), "short-lived");
    }

    #[tokio::test]
    async fn rate_limited_token_call_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "late"})))
            .expect(1)
            .mount(&server)
            .await;

        let token = provider(&server, 3).bearer().await.expect("third attempt succeeds");
        assert_eq!(token.expose_secret(), "late");
    }

    #[tokio::test]
    async fn retries_stop_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let error = provider(&server, 3).bearer().await.expect_err("all attempts fail");
        assert!(matches!(error, TokenError::Status { status: 503 }));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let error = provider(&server, 3).bearer().await.expect_err("unauthorized");
        assert!(matches!(error, TokenError::Status { status: 401 }));
        assert!(!error.is_retryable());
    }

    #[tokio::test]
    async fn legacy_credentials_skip_the_token_call() {
        let config = AppConfig::default().llm;
        let tokens = TokenProvider::new(
            reqwest::Client::new(),
            &config,
            Credentials::Legacy("pre-issued".to_string().into()),
        );
        assert_eq!(tokens.bearer().await.expect("legacy token").expose_secret(), "pre-issued");
    }
}
