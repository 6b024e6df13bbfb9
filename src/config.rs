//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Base URL of the Amadeus self-service test environment.
pub const DEFAULT_API_BASE_URL: &str = "https://test.api.amadeus.com/v1";

/// Environment variable holding the API client id.
pub const API_KEY_VAR: &str = "AMADEUS_API_KEY";

/// Environment variable holding the API client secret.
pub const API_SECRET_VAR: &str = "AMADEUS_API_SECRET";

/// Delay used to coalesce keystrokes before a search is triggered.
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(300);

/// Upstream API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL for API calls (no trailing slash).
    pub base_url: String,
    /// OAuth2 token endpoint.
    pub token_url: String,
    /// Per-request transport timeout.
    pub request_timeout: Duration,
    /// Total search attempts, including the first.
    pub max_attempts: u32,
    /// Wait between search attempts.
    pub retry_delay: Duration,
    /// Debounce window for search field edits.
    pub debounce_delay: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::with_base_url(DEFAULT_API_BASE_URL)
    }
}

impl ApiConfig {
    /// Build a config pointed at `base_url`, deriving the token endpoint from it.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            token_url: format!("{base_url}/security/oauth2/token"),
            base_url,
            request_timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            debounce_delay: DEFAULT_DEBOUNCE_DELAY,
        }
    }

    /// URL of the flight-destinations search endpoint.
    pub fn search_url(&self) -> String {
        format!("{}/shopping/flight-destinations", self.base_url)
    }

    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("AMADEUS_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let mut config = Self::with_base_url(base_url);

        if let Ok(token_url) = std::env::var("AMADEUS_TOKEN_URL") {
            config.token_url = token_url;
        }

        if let Ok(raw) = std::env::var("FLIGHT_SEARCH_TIMEOUT_SECS") {
            let secs = parse_whole("FLIGHT_SEARCH_TIMEOUT_SECS", &raw, "seconds")?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Ok(raw) = std::env::var("FLIGHT_SEARCH_DEBOUNCE_MS") {
            let millis = parse_whole("FLIGHT_SEARCH_DEBOUNCE_MS", &raw, "milliseconds")?;
            config.debounce_delay = Duration::from_millis(millis);
        }

        Ok(config)
    }
}

fn parse_whole(key: &str, raw: &str, unit: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.into(),
        message: format!("expected whole {unit}, got {raw:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upstream_contract() {
        let config = ApiConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert_eq!(config.debounce_delay, Duration::from_millis(300));
        assert_eq!(
            config.token_url,
            "https://test.api.amadeus.com/v1/security/oauth2/token"
        );
        assert_eq!(
            config.search_url(),
            "https://test.api.amadeus.com/v1/shopping/flight-destinations"
        );
    }

    #[test]
    fn unparsable_durations_are_rejected() {
        assert_eq!(
            parse_whole("FLIGHT_SEARCH_DEBOUNCE_MS", " 250 ", "milliseconds").unwrap(),
            250
        );
        for key in ["FLIGHT_SEARCH_DEBOUNCE_MS", "FLIGHT_SEARCH_TIMEOUT_SECS"] {
            let err = parse_whole(key, "fast", "units").unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidValue { key: k, .. } if k == key),
                "{err}"
            );
        }
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = ApiConfig::with_base_url("http://127.0.0.1:9000/v1/");
        assert_eq!(config.base_url, "http://127.0.0.1:9000/v1");
        assert_eq!(
            config.search_url(),
            "http://127.0.0.1:9000/v1/shopping/flight-destinations"
        );
    }
}
