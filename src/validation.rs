//! Input normalization for the search fields.
//!
//! Both helpers run on every edit and never fail: the origin is coerced into
//! shape, and the date is reformatted with an optional message for the UI.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

/// Maximum length of an origin airport code.
pub const ORIGIN_CODE_LEN: usize = 3;

/// Message shown under the date field for an impossible calendar date.
pub const INVALID_DATE_MESSAGE: &str = "Please enter a valid date";

static ORIGIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").expect("origin pattern compiles"));

/// Upper-case and truncate raw origin input.
pub fn normalize_origin(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_uppercase)
        .take(ORIGIN_CODE_LEN)
        .collect()
}

/// Whether `code` is exactly three upper-case ASCII letters.
pub fn is_valid_origin(code: &str) -> bool {
    ORIGIN_PATTERN.is_match(code)
}

/// State of one text field after an edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationState {
    pub raw_text: String,
    pub formatted_text: String,
    pub error_message: Option<String>,
}

impl ValidationState {
    pub fn is_empty(&self) -> bool {
        self.formatted_text.is_empty()
    }

    pub fn has_error(&self) -> bool {
        self.error_message.is_some()
    }

    /// The calendar date, once all eight digits form a real one.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        if self.has_error() || self.formatted_text.len() != 10 {
            return None;
        }
        NaiveDate::parse_from_str(&self.formatted_text, "%Y-%m-%d").ok()
    }
}

/// Reformat raw date input into `YYYY-MM-DD` as it is typed.
///
/// Partial input is never flagged. With exactly eight digits the date must
/// round-trip through a calendar date or an error message is set.
pub fn format_departure_date(raw: &str) -> ValidationState {
    let digits: String = raw.chars().filter(char::is_ascii_digit).take(8).collect();

    let mut formatted = digits.chars().take(4).collect::<String>();
    if digits.len() > 4 {
        formatted.push('-');
        formatted.extend(digits.chars().skip(4).take(2));
    }
    if digits.len() > 6 {
        formatted.push('-');
        formatted.extend(digits.chars().skip(6).take(2));
    }

    let error_message = if digits.len() == 8 && !is_calendar_date(&digits) {
        Some(INVALID_DATE_MESSAGE.to_string())
    } else {
        None
    };

    ValidationState {
        raw_text: raw.to_string(),
        formatted_text: formatted,
        error_message,
    }
}

fn is_calendar_date(digits: &str) -> bool {
    let (Ok(year), Ok(month), Ok(day)) = (
        digits[0..4].parse::<i32>(),
        digits[4..6].parse::<u32>(),
        digits[6..8].parse::<u32>(),
    ) else {
        return false;
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .is_some_and(|d| d.year() == year && d.month() == month && d.day() == day)
}
