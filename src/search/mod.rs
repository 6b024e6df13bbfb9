//! Flight destination search.
//!
//! - `model`: request parameters and the response envelope
//! - `retry`: the 500-only bounded retry policy
//! - `client`: the authenticated search pipeline
//! - `query`: in-flight deduplication of identical searches
//! - `session`: debounced search fields feeding the pipeline

pub mod client;
pub mod model;
pub mod query;
pub mod retry;
pub mod session;

pub use client::{FlightSearchClient, POPULAR_ORIGIN, build_http_client};
pub use model::{
    Dictionaries, FlightOffer, Location, Meta, SearchParams, SearchResponse, ViewBy,
};
pub use query::QueryCoalescer;
pub use retry::{AttemptFailure, RetryPolicy, RetryState, Sleeper, TokioSleeper};
pub use session::{SearchSession, SettledQuery};
