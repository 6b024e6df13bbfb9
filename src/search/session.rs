//! Search session: the two search fields, their debouncers, and the query
//! they settle into.
//!
//! Every edit updates the field immediately (so the UI can echo the
//! formatted text and any date error) and schedules that field's debouncer.
//! When a field's debouncer fires, the settled query is published on a
//! watch channel; a search against the settled query is what a live results
//! list would run.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

use super::model::{SearchParams, SearchResponse};
use super::query::QueryCoalescer;
use crate::debounce::Debouncer;
use crate::error::SearchError;
use crate::validation::{ValidationState, format_departure_date, normalize_origin};

/// Origin used on explicit submit when the field is left empty.
pub const DEFAULT_SUBMIT_ORIGIN: &str = "LON";

/// Field values after their debounce windows elapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettledQuery {
    pub origin: String,
    pub departure_date: ValidationState,
}

impl SettledQuery {
    /// A live search only runs once either field has content.
    pub fn is_enabled(&self) -> bool {
        !self.origin.is_empty() || !self.departure_date.is_empty()
    }
}

#[derive(Debug, Default)]
struct Fields {
    origin: String,
    departure_date: ValidationState,
}

pub struct SearchSession {
    queries: Arc<QueryCoalescer>,
    fields: Mutex<Fields>,
    settled: Arc<watch::Sender<SettledQuery>>,
    origin_debounce: Debouncer<String>,
    date_debounce: Debouncer<ValidationState>,
}

impl SearchSession {
    pub fn new(queries: Arc<QueryCoalescer>, debounce_delay: std::time::Duration) -> Self {
        let (tx, _rx) = watch::channel(SettledQuery::default());
        let settled = Arc::new(tx);

        let origin_tx = Arc::clone(&settled);
        let origin_debounce = Debouncer::new(debounce_delay, move |origin: String| {
            debug!(origin = %origin, "Origin settled");
            origin_tx.send_modify(|q| q.origin = origin);
        });

        let date_tx = Arc::clone(&settled);
        let date_debounce = Debouncer::new(debounce_delay, move |date: ValidationState| {
            debug!(date = %date.formatted_text, "Departure date settled");
            date_tx.send_modify(|q| q.departure_date = date);
        });

        Self {
            queries,
            fields: Mutex::new(Fields::default()),
            settled,
            origin_debounce,
            date_debounce,
        }
    }

    /// Apply an origin edit. Returns the normalized text to display.
    pub fn set_origin(&self, raw: &str) -> String {
        let origin = normalize_origin(raw);
        self.lock_fields().origin = origin.clone();
        self.origin_debounce.schedule(origin.clone());
        origin
    }

    /// Apply a departure-date edit. Returns the formatted text and any error.
    pub fn set_departure_date(&self, raw: &str) -> ValidationState {
        let state = format_departure_date(raw);
        self.lock_fields().departure_date = state.clone();
        self.date_debounce.schedule(state.clone());
        state
    }

    /// Empty both fields immediately, dropping pending debounced edits.
    pub fn clear(&self) {
        self.origin_debounce.cancel();
        self.date_debounce.cancel();
        *self.lock_fields() = Fields::default();
        self.settled.send_replace(SettledQuery::default());
    }

    pub fn origin(&self) -> String {
        self.lock_fields().origin.clone()
    }

    pub fn departure_date(&self) -> ValidationState {
        self.lock_fields().departure_date.clone()
    }

    /// The query as of the last elapsed debounce windows.
    pub fn settled(&self) -> SettledQuery {
        self.settled.borrow().clone()
    }

    /// Observe settled-query changes.
    pub fn subscribe(&self) -> watch::Receiver<SettledQuery> {
        self.settled.subscribe()
    }

    /// Search on the settled query. `None` while both settled fields are empty.
    /// A partial or impossible settled date is rejected without a network call.
    pub async fn search_settled(&self) -> Option<Result<SearchResponse, SearchError>> {
        let query = self.settled();
        if !query.is_enabled() {
            return None;
        }

        let mut params = SearchParams::new();
        if !query.origin.is_empty() {
            params = params.origin(query.origin);
        }
        if !query.departure_date.is_empty() {
            match query.departure_date.parsed_date() {
                Some(date) => params = params.departure_date(date),
                None => return Some(Err(SearchError::InvalidDepartureDate)),
            }
        }
        Some(self.queries.search(params).await)
    }

    /// Explicit submission using the current field values. An empty origin
    /// falls back to [`DEFAULT_SUBMIT_ORIGIN`] and an empty date to today; a
    /// partial or impossible date is rejected without a network call.
    pub async fn submit(&self) -> Result<SearchResponse, SearchError> {
        let (origin, date) = {
            let fields = self.lock_fields();
            (fields.origin.clone(), fields.departure_date.clone())
        };

        let departure_date = if date.is_empty() {
            self.queries.client().today()
        } else {
            date.parsed_date().ok_or(SearchError::InvalidDepartureDate)?
        };
        let origin = if origin.is_empty() {
            DEFAULT_SUBMIT_ORIGIN.to_string()
        } else {
            origin
        };

        let params = SearchParams::new()
            .origin(origin)
            .departure_date(departure_date);
        self.queries.search(params).await
    }

    fn lock_fields(&self) -> std::sync::MutexGuard<'_, Fields> {
        self.fields.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::auth::{ClientCredentials, CredentialProvider, CredentialSource, OAuthTokenIssuer};
    use crate::config::ApiConfig;
    use crate::search::client::FlightSearchClient;

    fn session() -> SearchSession {
        let config = ApiConfig::with_base_url("http://127.0.0.1:9/v1");
        let issuer = Arc::new(OAuthTokenIssuer::new(
            reqwest::Client::new(),
            config.token_url.clone(),
        ));
        let provider = Arc::new(CredentialProvider::new(
            CredentialSource::Static(ClientCredentials {
                client_id: "id".into(),
                client_secret: SecretString::from("secret"),
            }),
            issuer,
        ));
        let client = Arc::new(FlightSearchClient::new(&config, provider).unwrap());
        SearchSession::new(
            Arc::new(QueryCoalescer::new(client)),
            Duration::from_millis(300),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn edits_settle_after_debounce() {
        let session = session();

        for raw in ["m", "ma", "mad"] {
            session.set_origin(raw);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(session.origin(), "MAD");
        assert_eq!(session.settled().origin, "");

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(session.settled().origin, "MAD");
    }

    #[tokio::test(start_paused = true)]
    async fn date_field_reports_errors_immediately() {
        let session = session();
        let state = session.set_departure_date("20230229");
        assert_eq!(state.formatted_text, "2023-02-29");
        assert!(state.has_error());

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(session.settled().departure_date.has_error());
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_settled_changes() {
        let session = session();
        let mut rx = session.subscribe();

        session.set_origin("bcn");
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().origin, "BCN");
    }

    #[tokio::test]
    async fn settled_search_is_disabled_when_empty() {
        let session = session();
        assert!(session.search_settled().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn settled_search_rejects_unusable_date() {
        let session = session();
        session.set_origin("mad");

        for raw in ["20230229", "202406"] {
            session.set_departure_date(raw);
            tokio::time::sleep(Duration::from_millis(350)).await;
            assert_eq!(
                session.search_settled().await,
                Some(Err(SearchError::InvalidDepartureDate)),
                "date {raw}"
            );
        }
        assert_eq!(session.queries.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_drops_pending_edits() {
        let session = session();
        session.set_origin("lis");
        session.clear();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(session.settled(), SettledQuery::default());
        assert_eq!(session.origin(), "");
    }

    #[tokio::test]
    async fn submit_rejects_incomplete_date_before_network() {
        let session = session();
        session.set_origin("MAD");
        session.set_departure_date("202406");
        assert_eq!(
            session.submit().await.unwrap_err(),
            SearchError::InvalidDepartureDate
        );
        session.set_departure_date("20240230");
        assert_eq!(
            session.submit().await.unwrap_err(),
            SearchError::InvalidDepartureDate
        );
    }
}
