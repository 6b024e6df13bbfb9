//! Bounded retry for the search call.
//!
//! The policy is a small state machine: `Attempting → (Succeeded | Waiting |
//! Failed)`, `Waiting → Attempting`. Only an HTTP 500 leads to `Waiting`, and
//! only while attempts remain. [`RetryPolicy::transition`] is pure so the
//! policy can be checked without sleeping; [`RetryPolicy::run`] drives it with
//! an injected [`Sleeper`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::SearchError;

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Upstream answered with a non-success status.
    Status(StatusCode),
    /// The request never produced a response.
    Transport(String),
    /// A success response whose body could not be decoded.
    Decode(String),
}

impl AttemptFailure {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Status(StatusCode::INTERNAL_SERVER_ERROR))
    }
}

impl From<AttemptFailure> for SearchError {
    fn from(failure: AttemptFailure) -> Self {
        match failure {
            AttemptFailure::Status(status) => SearchError::from_status(status),
            AttemptFailure::Transport(_) | AttemptFailure::Decode(_) => SearchError::Fetch,
        }
    }
}

/// Where the retry loop stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState<T> {
    Attempting { attempt: u32 },
    Waiting { next_attempt: u32 },
    Succeeded(T),
    Failed(AttemptFailure),
}

/// Pauses between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait before each retry.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Next state after attempt number `attempt` (1-based) produced `result`.
    pub fn transition<T>(&self, attempt: u32, result: Result<T, AttemptFailure>) -> RetryState<T> {
        match result {
            Ok(value) => RetryState::Succeeded(value),
            Err(failure) if failure.is_retryable() && attempt < self.max_attempts => {
                RetryState::Waiting {
                    next_attempt: attempt + 1,
                }
            }
            Err(failure) => RetryState::Failed(failure),
        }
    }

    /// Run `attempt_fn` until it succeeds, fails terminally, or attempts run out.
    pub async fn run<T, F, Fut>(
        &self,
        sleeper: &dyn Sleeper,
        mut attempt_fn: F,
    ) -> Result<T, AttemptFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptFailure>>,
    {
        let mut state = RetryState::Attempting { attempt: 1 };
        loop {
            state = match state {
                RetryState::Attempting { attempt } => {
                    let result = attempt_fn(attempt).await;
                    if let Err(failure) = &result {
                        debug!(attempt, failure = ?failure, "Search attempt failed");
                    }
                    self.transition(attempt, result)
                }
                RetryState::Waiting { next_attempt } => {
                    warn!(
                        attempts_left = self.max_attempts + 1 - next_attempt,
                        "Retrying after upstream 500"
                    );
                    sleeper.sleep(self.delay).await;
                    RetryState::Attempting {
                        attempt: next_attempt,
                    }
                }
                RetryState::Succeeded(value) => return Ok(value),
                RetryState::Failed(failure) => return Err(failure),
            };
        }
    }
}
