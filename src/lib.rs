//! Cheapest-destination flight search against the Amadeus API.

pub mod auth;
pub mod config;
pub mod debounce;
pub mod error;
pub mod onboarding;
pub mod search;
pub mod validation;
