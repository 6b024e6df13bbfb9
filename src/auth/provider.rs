//! Issues and caches OAuth2 client-credentials tokens.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::token::{AccessToken, Clock, SystemClock};
use crate::config::{API_KEY_VAR, API_SECRET_VAR};
use crate::error::CredentialError;

/// Client id / secret pair sent to the token endpoint.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

/// Where client credentials come from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Read from the process environment on every token request.
    Env { key_var: String, secret_var: String },
    /// Fixed credentials supplied by the embedder.
    Static(ClientCredentials),
}

impl Default for CredentialSource {
    fn default() -> Self {
        Self::Env {
            key_var: API_KEY_VAR.to_string(),
            secret_var: API_SECRET_VAR.to_string(),
        }
    }
}

impl CredentialSource {
    /// Resolve the credentials now. Absent or empty values are a configuration error.
    pub fn resolve(&self) -> Result<ClientCredentials, CredentialError> {
        match self {
            Self::Env {
                key_var,
                secret_var,
            } => {
                let client_id = std::env::var(key_var).unwrap_or_default();
                let client_secret = std::env::var(secret_var).unwrap_or_default();
                if client_id.is_empty() || client_secret.is_empty() {
                    return Err(CredentialError::MissingCredentials);
                }
                Ok(ClientCredentials {
                    client_id,
                    client_secret: SecretString::from(client_secret),
                })
            }
            Self::Static(creds) => {
                if creds.client_id.is_empty() || creds.client_secret.expose_secret().is_empty() {
                    return Err(CredentialError::MissingCredentials);
                }
                Ok(creds.clone())
            }
        }
    }
}

/// Exchanges client credentials for a bearer token.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue_token(&self, creds: &ClientCredentials) -> Result<SecretString, CredentialError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Token issuer backed by the upstream OAuth2 endpoint.
pub struct OAuthTokenIssuer {
    client: reqwest::Client,
    token_url: String,
}

impl OAuthTokenIssuer {
    pub fn new(client: reqwest::Client, token_url: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into(),
        }
    }
}

#[async_trait]
impl TokenIssuer for OAuthTokenIssuer {
    async fn issue_token(&self, creds: &ClientCredentials) -> Result<SecretString, CredentialError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.expose_secret()),
        ];

        let resp = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Token request failed");
                CredentialError::AuthFailed {
                    reason: e.to_string(),
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Token endpoint rejected credentials");
            return Err(CredentialError::AuthFailed {
                reason: format!("token endpoint returned {status}"),
            });
        }

        let parsed: TokenResponse = resp.json().await.map_err(|e| {
            warn!(error = %e, "Token response was not valid JSON");
            CredentialError::AuthFailed {
                reason: e.to_string(),
            }
        })?;

        match parsed.access_token {
            Some(token) if !token.is_empty() => Ok(SecretString::from(token)),
            _ => Err(CredentialError::MissingToken),
        }
    }
}

/// Holds the current access token and refreshes it when it lapses.
///
/// The lock guards only the cached value; it is released before the token
/// endpoint is called, so two callers racing on an expired token may both
/// authenticate. Both results are valid tokens and the later write wins.
pub struct CredentialProvider {
    source: CredentialSource,
    issuer: Arc<dyn TokenIssuer>,
    clock: Arc<dyn Clock>,
    cached: RwLock<Option<AccessToken>>,
}

impl CredentialProvider {
    pub fn new(source: CredentialSource, issuer: Arc<dyn TokenIssuer>) -> Self {
        Self::with_clock(source, issuer, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: CredentialSource,
        issuer: Arc<dyn TokenIssuer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            issuer,
            clock,
            cached: RwLock::new(None),
        }
    }

    /// Return a usable bearer token, authenticating only when none is cached
    /// or the cached one has passed its expiry.
    pub async fn get_access_token(&self) -> Result<SecretString, CredentialError> {
        let now = self.clock.now();
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_valid_at(now)) {
                debug!(expires_at = %token.expires_at, "Reusing cached access token");
                return Ok(token.value.clone());
            }
        }

        let creds = self.source.resolve()?;
        let value = self.issuer.issue_token(&creds).await?;

        let token = AccessToken::issued_at(value, self.clock.now());
        info!(expires_at = %token.expires_at, "Obtained new access token");
        let value = token.value.clone();
        *self.cached.write().await = Some(token);
        Ok(value)
    }

    /// Expiry of the cached token, if any.
    pub async fn cached_expiry(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.cached.read().await.as_ref().map(|t| t.expires_at)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::auth::token::ManualClock;

    /// Issues `token-1`, `token-2`, ... and counts calls.
    struct CountingIssuer {
        calls: AtomicUsize,
        respond_empty: bool,
    }

    impl CountingIssuer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                respond_empty: false,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenIssuer for CountingIssuer {
        async fn issue_token(
            &self,
            _creds: &ClientCredentials,
        ) -> Result<SecretString, CredentialError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.respond_empty {
                return Err(CredentialError::MissingToken);
            }
            Ok(SecretString::from(format!("token-{n}")))
        }
    }

    fn static_source() -> CredentialSource {
        CredentialSource::Static(ClientCredentials {
            client_id: "id".into(),
            client_secret: SecretString::from("secret"),
        })
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn reuses_token_within_lifetime() {
        let issuer = CountingIssuer::new();
        let clock = clock();
        let provider = CredentialProvider::with_clock(static_source(), issuer.clone(), clock.clone());

        let first = provider.get_access_token().await.unwrap();
        clock.advance(Duration::minutes(24));
        let second = provider.get_access_token().await.unwrap();

        assert_eq!(first.expose_secret(), second.expose_secret());
        assert_eq!(issuer.calls(), 1);
    }

    #[tokio::test]
    async fn refreshes_after_safety_margin() {
        let issuer = CountingIssuer::new();
        let clock = clock();
        let provider = CredentialProvider::with_clock(static_source(), issuer.clone(), clock.clone());

        provider.get_access_token().await.unwrap();
        clock.advance(Duration::minutes(25));
        let refreshed = provider.get_access_token().await.unwrap();

        assert_eq!(refreshed.expose_secret(), "token-2");
        assert_eq!(issuer.calls(), 2);
    }

    #[tokio::test]
    async fn missing_credentials_is_configuration_error() {
        let issuer = CountingIssuer::new();
        let source = CredentialSource::Env {
            key_var: "FLIGHT_DESTINATIONS_TEST_UNSET_KEY".into(),
            secret_var: "FLIGHT_DESTINATIONS_TEST_UNSET_SECRET".into(),
        };
        let provider = CredentialProvider::with_clock(source, issuer.clone(), clock());

        let err = provider.get_access_token().await.unwrap_err();
        assert_eq!(err, CredentialError::MissingCredentials);
        assert_eq!(issuer.calls(), 0);
    }

    #[test]
    fn env_source_reads_at_call_time() {
        let source = CredentialSource::Env {
            key_var: "FLIGHT_DESTINATIONS_TEST_LATE_KEY".into(),
            secret_var: "FLIGHT_DESTINATIONS_TEST_LATE_SECRET".into(),
        };
        assert!(source.resolve().is_err());

        // SAFETY: these variable names are unique to this test.
        unsafe {
            std::env::set_var("FLIGHT_DESTINATIONS_TEST_LATE_KEY", "id");
            std::env::set_var("FLIGHT_DESTINATIONS_TEST_LATE_SECRET", "secret");
        }
        let creds = source.resolve().unwrap();
        assert_eq!(creds.client_id, "id");
        assert_eq!(creds.client_secret.expose_secret(), "secret");
    }

    #[test]
    fn empty_static_secret_is_rejected() {
        let source = CredentialSource::Static(ClientCredentials {
            client_id: "id".into(),
            client_secret: SecretString::from(""),
        });
        assert_eq!(
            source.resolve().unwrap_err(),
            CredentialError::MissingCredentials
        );
    }

    #[tokio::test]
    async fn issuer_failure_is_not_cached() {
        let issuer = Arc::new(CountingIssuer {
            calls: AtomicUsize::new(0),
            respond_empty: true,
        });
        let provider = CredentialProvider::with_clock(static_source(), issuer.clone(), clock());

        assert_eq!(
            provider.get_access_token().await.unwrap_err(),
            CredentialError::MissingToken
        );
        assert!(provider.cached_expiry().await.is_none());
        assert!(provider.get_access_token().await.is_err());
        assert_eq!(issuer.calls(), 2);
    }
}
