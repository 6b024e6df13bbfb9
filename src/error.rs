//! Error types for flight destination search.

use reqwest::StatusCode;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors raised while obtaining an access token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("Flight search API credentials not found in environment variables")]
    MissingCredentials,

    #[error("Failed to authenticate with the flight search API: {reason}")]
    AuthFailed { reason: String },

    #[error("No access token received from the flight search API")]
    MissingToken,
}

/// Errors surfaced to search callers.
///
/// Each variant carries only its user-facing message; raw HTTP details are
/// logged where the failure is classified and go no further.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("Flight search API credentials are not configured")]
    Configuration,

    #[error("Authentication failed. Please try again.")]
    Auth,

    #[error("Invalid origin airport code. Please use a valid 3-letter IATA code.")]
    InvalidOrigin,

    #[error("Please enter a valid date")]
    InvalidDepartureDate,

    #[error("Invalid search parameters. Please check your input.")]
    InvalidParameters,

    #[error("Too many requests. Please try again later.")]
    RateLimited,

    #[error("Flight search API is temporarily unavailable. Please try again in a few minutes.")]
    UpstreamUnavailable,

    #[error("Failed to fetch flight data. Please try again later.")]
    Fetch,
}

impl SearchError {
    /// Classify a non-success HTTP status from the search endpoint.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => Self::InvalidParameters,
            StatusCode::UNAUTHORIZED => Self::Auth,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            StatusCode::INTERNAL_SERVER_ERROR => Self::UpstreamUnavailable,
            _ => Self::Fetch,
        }
    }
}

impl From<CredentialError> for SearchError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::MissingCredentials => Self::Configuration,
            CredentialError::AuthFailed { .. } | CredentialError::MissingToken => Self::Auth,
        }
    }
}

/// Onboarding persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_taxonomy() {
        assert_eq!(
            SearchError::from_status(StatusCode::BAD_REQUEST),
            SearchError::InvalidParameters
        );
        assert_eq!(SearchError::from_status(StatusCode::UNAUTHORIZED), SearchError::Auth);
        assert_eq!(
            SearchError::from_status(StatusCode::TOO_MANY_REQUESTS),
            SearchError::RateLimited
        );
        assert_eq!(
            SearchError::from_status(StatusCode::INTERNAL_SERVER_ERROR),
            SearchError::UpstreamUnavailable
        );
        assert_eq!(SearchError::from_status(StatusCode::BAD_GATEWAY), SearchError::Fetch);
        assert_eq!(SearchError::from_status(StatusCode::NOT_FOUND), SearchError::Fetch);
    }

    #[test]
    fn credential_errors_map_to_search_kinds() {
        assert_eq!(
            SearchError::from(CredentialError::MissingCredentials),
            SearchError::Configuration
        );
        assert_eq!(SearchError::from(CredentialError::MissingToken), SearchError::Auth);
        assert_eq!(
            SearchError::from(CredentialError::AuthFailed {
                reason: "401".into()
            }),
            SearchError::Auth
        );
    }

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(
            SearchError::RateLimited.to_string(),
            "Too many requests. Please try again later."
        );
        assert!(!SearchError::Fetch.to_string().contains("HTTP"));
    }
}
