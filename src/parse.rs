//! Normalization of raw exchange payload fragments.
//!
//! Bithumb returns every numeric field as a string, sometimes with
//! thousands separators, and signals "nothing to list" through a status
//! code instead of an empty array. This module turns both quirks into
//! typed values before anything else looks at them.

use crate::constants::{API_STATUS_EMPTY, API_STATUS_OK, NO_OPEN_ORDERS_MESSAGE};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("non-numeric value: {0:?}")]
    NonNumeric(String),
}

/// Classification of a Bithumb response envelope by its status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Status `0000`: the payload is valid.
    Success,
    /// Status `5600` with the known "no open orders" message: a valid,
    /// empty result rather than an error.
    EmptyList,
    /// Any other status: an API error with the raw status and message.
    Error { status: String, message: String },
}

/// Classifies a response status code and its accompanying message.
///
/// * `status` - The `status` field of the response envelope.
/// * `message` - The `message` field, if present.
pub fn classify_status(status: &str, message: Option<&str>) -> ResponseStatus {
    if status == API_STATUS_OK {
        return ResponseStatus::Success;
    }
    if status == API_STATUS_EMPTY {
        if let Some(msg) = message {
            if msg.contains(NO_OPEN_ORDERS_MESSAGE) {
                return ResponseStatus::EmptyList;
            }
        }
    }
    ResponseStatus::Error {
        status: status.to_string(),
        message: message.unwrap_or_default().to_string(),
    }
}

/// Parses a KRW amount that may carry thousands separators, e.g.
/// `"51,500,000"`. Fractional digits are truncated; KRW prices are
/// quoted as integers.
///
/// Returns a `ParseError` if the cleaned string is not a non-negative
/// number or is too large for an integer KRW amount.
pub fn parse_krw(raw: &str) -> Result<u64, ParseError> {
    let value = parse_decimal(raw)?;
    if value >= u64::MAX as f64 {
        return Err(ParseError::NonNumeric(raw.to_string()));
    }
    Ok(value.trunc() as u64)
}

/// Parses a coin quantity such as `"0.00011808"`, tolerating thousands
/// separators in the integer part.
///
/// Returns a `ParseError` if the cleaned string is not a non-negative
/// number.
pub fn parse_units(raw: &str) -> Result<f64, ParseError> {
    parse_decimal(raw)
}

/// Only digits and the decimal point survive cleaning; `f64::from_str`
/// alone would also accept signs, exponents, `"inf"` and `"NaN"`, none
/// of which the exchange emits.
fn parse_decimal(raw: &str) -> Result<f64, ParseError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(ParseError::NonNumeric(raw.to_string()));
    }
    let value = cleaned
        .parse::<f64>()
        .map_err(|_| ParseError::NonNumeric(raw.to_string()))?;
    // A long enough digit run still overflows to infinity
    if !value.is_finite() {
        return Err(ParseError::NonNumeric(raw.to_string()));
    }
    Ok(value)
}
