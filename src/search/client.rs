//! Flight destination search client.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::model::{FlightOffer, SearchParams, SearchResponse};
use super::retry::{AttemptFailure, RetryPolicy, Sleeper, TokioSleeper};
use crate::auth::{Clock, CredentialProvider, SystemClock};
use crate::config::ApiConfig;
use crate::error::{ConfigError, SearchError};
use crate::validation::is_valid_origin;

/// Origin used for the popular-destinations listing.
pub const POPULAR_ORIGIN: &str = "MAD";

/// Client for the upstream flight-destinations endpoint.
///
/// Every call validates its input, obtains a bearer token from the shared
/// [`CredentialProvider`], and runs the GET under the [`RetryPolicy`].
/// Failures reach the caller only as a [`SearchError`].
pub struct FlightSearchClient {
    http: reqwest::Client,
    search_url: String,
    credentials: Arc<CredentialProvider>,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
}

impl FlightSearchClient {
    /// Build a client with its own HTTP connection pool.
    pub fn new(config: &ApiConfig, credentials: Arc<CredentialProvider>) -> Result<Self, ConfigError> {
        let http = build_http_client(config)?;
        Ok(Self::with_http_client(http, config, credentials))
    }

    /// Build a client sharing an existing `reqwest::Client`.
    pub fn with_http_client(
        http: reqwest::Client,
        config: &ApiConfig,
        credentials: Arc<CredentialProvider>,
    ) -> Self {
        Self {
            http,
            search_url: config.search_url(),
            credentials,
            retry: RetryPolicy::new(config.max_attempts, config.retry_delay),
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace how the client waits between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the clock used to pick today's date.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Today's date in UTC, per the client's clock.
    pub fn today(&self) -> chrono::NaiveDate {
        self.clock.now().date_naive()
    }

    /// Search with explicit parameters and return the full envelope,
    /// dictionaries included. An empty `data` list is a successful result.
    pub async fn search_flights(&self, params: &SearchParams) -> Result<SearchResponse, SearchError> {
        if let Some(origin) = &params.origin {
            if !is_valid_origin(origin) {
                debug!(origin = %origin, "Rejected malformed origin");
                return Err(SearchError::InvalidOrigin);
            }
        }

        let search_id = Uuid::new_v4();
        let token = self.credentials.get_access_token().await.map_err(|e| {
            warn!(search_id = %search_id, error = %e, "Could not obtain access token");
            SearchError::from(e)
        })?;

        let result = self.fetch_with_retry(search_id, params, &token).await;
        match &result {
            Ok(resp) if resp.is_empty() => {
                warn!(search_id = %search_id, "No flight data in response");
            }
            Ok(resp) => {
                info!(search_id = %search_id, offers = resp.data.len(), "Search completed");
            }
            Err(err) => {
                warn!(search_id = %search_id, error = %err, "Search failed");
            }
        }
        result
    }

    /// Cheapest destinations from Madrid departing today. Returns only the
    /// offer list, empty when upstream has nothing.
    pub async fn popular_destinations(&self) -> Result<Vec<FlightOffer>, SearchError> {
        let params = SearchParams::new()
            .origin(POPULAR_ORIGIN)
            .departure_date(self.today());
        let resp = self.search_flights(&params).await?;
        Ok(resp.data)
    }

    async fn fetch_with_retry(
        &self,
        search_id: Uuid,
        params: &SearchParams,
        token: &SecretString,
    ) -> Result<SearchResponse, SearchError> {
        let pairs = params.query_pairs();
        let query = pairs.as_slice();
        self.retry
            .run(self.sleeper.as_ref(), move |attempt| {
                debug!(search_id = %search_id, attempt, "Requesting flight destinations");
                self.fetch_once(query, token)
            })
            .await
            .map_err(|failure| {
                debug!(search_id = %search_id, failure = ?failure, "Classifying search failure");
                SearchError::from(failure)
            })
    }

    async fn fetch_once(
        &self,
        query: &[(&'static str, String)],
        token: &SecretString,
    ) -> Result<SearchResponse, AttemptFailure> {
        let resp = self
            .http
            .get(&self.search_url)
            .bearer_auth(token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|e| AttemptFailure::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Flight search API error");
            return Err(AttemptFailure::Status(status));
        }

        resp.json::<SearchResponse>()
            .await
            .map_err(|e| AttemptFailure::Decode(e.to_string()))
    }
}

/// Build the shared HTTP client used for both token and search calls.
pub fn build_http_client(config: &ApiConfig) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .user_agent(concat!("flight-destinations/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}
