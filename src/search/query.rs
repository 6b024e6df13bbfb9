//! In-flight deduplication of identical searches.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use super::client::FlightSearchClient;
use super::model::{SearchParams, SearchResponse};
use crate::error::SearchError;

type SharedSearch = Shared<BoxFuture<'static, Result<SearchResponse, SearchError>>>;

/// Joins concurrent searches for the same parameter tuple onto one upstream
/// call. A different tuple always starts its own call. Nothing is cached once
/// the call resolves, or once a waiter gives up on it; later callers then
/// start a fresh call.
pub struct QueryCoalescer {
    client: Arc<FlightSearchClient>,
    inflight: Mutex<HashMap<SearchParams, SharedSearch>>,
}

impl QueryCoalescer {
    pub fn new(client: Arc<FlightSearchClient>) -> Self {
        Self {
            client,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn client(&self) -> &Arc<FlightSearchClient> {
        &self.client
    }

    /// Number of distinct searches currently running.
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub async fn search(&self, params: SearchParams) -> Result<SearchResponse, SearchError> {
        let shared = {
            let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            match inflight.get(&params) {
                Some(existing) => {
                    debug!(origin = ?params.origin, "Joining in-flight search");
                    existing.clone()
                }
                None => {
                    let client = Arc::clone(&self.client);
                    let key = params.clone();
                    let fut = async move { client.search_flights(&key).await }
                        .boxed()
                        .shared();
                    inflight.insert(params.clone(), fut.clone());
                    fut
                }
            }
        };

        let entry = InflightEntry {
            inflight: &self.inflight,
            params,
            shared,
        };
        entry.shared.clone().await
    }
}

/// Removes its map entry when the waiting caller finishes or is dropped,
/// unless the entry has since been replaced by a newer call.
struct InflightEntry<'a> {
    inflight: &'a Mutex<HashMap<SearchParams, SharedSearch>>,
    params: SearchParams,
    shared: SharedSearch,
}

impl Drop for InflightEntry<'_> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        if inflight
            .get(&self.params)
            .is_some_and(|current| current.ptr_eq(&self.shared))
        {
            inflight.remove(&self.params);
        }
    }
}
