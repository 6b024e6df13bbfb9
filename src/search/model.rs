//! Search parameters and the upstream response envelope.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency assumed when the response does not name one.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// How the upstream groups its cheapest destinations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ViewBy {
    #[default]
    Country,
    Destination,
    Date,
}

impl ViewBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Country => "COUNTRY",
            Self::Destination => "DESTINATION",
            Self::Date => "DATE",
        }
    }
}

impl std::fmt::Display for ViewBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one destination search.
///
/// Built fresh per request; unset options take the upstream defaults
/// (round trip, 10 days, connections allowed, grouped by country).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchParams {
    pub origin: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub one_way: bool,
    pub duration: u32,
    pub non_stop: bool,
    pub max_price: Option<u32>,
    pub view_by: ViewBy,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            origin: None,
            departure_date: None,
            one_way: false,
            duration: 10,
            non_stop: false,
            max_price: None,
            view_by: ViewBy::Country,
        }
    }
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn departure_date(mut self, date: NaiveDate) -> Self {
        self.departure_date = Some(date);
        self
    }

    pub fn one_way(mut self, one_way: bool) -> Self {
        self.one_way = one_way;
        self
    }

    pub fn duration(mut self, days: u32) -> Self {
        self.duration = days;
        self
    }

    pub fn non_stop(mut self, non_stop: bool) -> Self {
        self.non_stop = non_stop;
        self
    }

    pub fn max_price(mut self, max_price: u32) -> Self {
        self.max_price = Some(max_price);
        self
    }

    pub fn view_by(mut self, view_by: ViewBy) -> Self {
        self.view_by = view_by;
        self
    }

    /// Query-string pairs in upstream naming. Unset options are omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(7);
        if let Some(origin) = &self.origin {
            pairs.push(("origin", origin.clone()));
        }
        if let Some(date) = self.departure_date {
            pairs.push(("departureDate", date.format("%Y-%m-%d").to_string()));
        }
        pairs.push(("oneWay", self.one_way.to_string()));
        pairs.push(("duration", self.duration.to_string()));
        pairs.push(("nonStop", self.non_stop.to_string()));
        if let Some(max_price) = self.max_price {
            pairs.push(("maxPrice", max_price.to_string()));
        }
        pairs.push(("viewBy", self.view_by.to_string()));
        pairs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub total: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferLinks {
    #[serde(default)]
    pub flight_dates: Option<String>,
    #[serde(default)]
    pub flight_offers: Option<String>,
}

/// One cheapest-destination entry as returned upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOffer {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    #[serde(default)]
    pub return_date: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub links: OfferLinks,
}

impl FlightOffer {
    /// `"MAD → CDG"`
    pub fn route_label(&self) -> String {
        format!("{} → {}", self.origin, self.destination)
    }

    /// `"EUR 123.45"`
    pub fn price_label(&self, currency: &str) -> String {
        format!("{currency} {}", self.price.total)
    }

    /// Total price as a decimal, when the upstream string parses.
    pub fn price_amount(&self) -> Option<Decimal> {
        Decimal::from_str(self.price.total.trim()).ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub sub_type: String,
    #[serde(default)]
    pub detailed_name: String,
}

/// Lookup tables for codes used in the offers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dictionaries {
    #[serde(default)]
    pub currencies: HashMap<String, String>,
    #[serde(default)]
    pub locations: HashMap<String, Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaLinks {
    #[serde(rename = "self", default)]
    pub self_link: Option<String>,
}

/// Defaults the upstream applied to the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaDefaults {
    #[serde(default)]
    pub departure_date: Option<String>,
    #[serde(default)]
    pub one_way: Option<bool>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub non_stop: Option<bool>,
    #[serde(default)]
    pub view_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub links: Option<MetaLinks>,
    #[serde(default)]
    pub defaults: Option<MetaDefaults>,
}

/// Full response envelope of a destination search.
///
/// A missing `data` field reads as an empty list, so an empty result is an
/// ordinary value rather than a failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<FlightOffer>,
    #[serde(default)]
    pub dictionaries: Dictionaries,
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub warnings: Vec<serde_json::Value>,
}

impl SearchResponse {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Currency of the prices, defaulting to EUR.
    pub fn currency(&self) -> &str {
        self.meta.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }

    /// Human-readable name for a location code, if the dictionaries carry one.
    pub fn location_name(&self, code: &str) -> Option<&str> {
        self.dictionaries
            .locations
            .get(code)
            .map(|l| l.detailed_name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Offers ordered cheapest first; unparseable prices sort last.
    pub fn cheapest_first(&self) -> Vec<&FlightOffer> {
        let mut offers: Vec<&FlightOffer> = self.data.iter().collect();
        offers.sort_by_key(|o| o.price_amount().unwrap_or(Decimal::MAX));
        offers
    }
}
