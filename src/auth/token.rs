//! Cached bearer token and the clock it is checked against.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;

/// Real lifetime of an upstream access token, in minutes.
pub const TOKEN_LIFETIME_MINUTES: i64 = 30;

/// Subtracted from the real lifetime so a token never expires mid-request.
pub const TOKEN_SAFETY_MARGIN_MINUTES: i64 = 5;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A bearer token together with the instant it stops being handed out.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Wrap a freshly issued token; usable for the real lifetime minus the margin.
    pub fn issued_at(value: SecretString, issued_at: DateTime<Utc>) -> Self {
        Self {
            value,
            expires_at: issued_at
                + Duration::minutes(TOKEN_LIFETIME_MINUTES - TOKEN_SAFETY_MARGIN_MINUTES),
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
