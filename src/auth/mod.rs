//! Access-token acquisition and caching for the flight search API.
//!
//! The [`CredentialProvider`] owns the bearer token and its expiry. Callers
//! ask it for a token before every search; it only talks to the token
//! endpoint when no unexpired token is cached.

pub mod provider;
pub mod token;

pub use provider::{
    ClientCredentials, CredentialProvider, CredentialSource, OAuthTokenIssuer, TokenIssuer,
};
pub use token::{AccessToken, Clock, ManualClock, SystemClock};
