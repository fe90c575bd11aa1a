//! Central configuration constants for bithumb-grid-bot.
//!
//! This module contains all tunable parameters and magic numbers used throughout
//! the trading bot. Modify values here to adjust bot behavior without changing
//! business logic.

use std::time::Duration;

// =============================================================================
// EXCHANGE API
// =============================================================================

/// Default Bithumb REST endpoint; override with `BITHUMB_API_URL`.
pub const BITHUMB_API_URL: &str = "https://api.bithumb.com";

/// Quote currency for every traded pair.
pub const PAYMENT_CURRENCY: &str = "KRW";

/// Success status in every Bithumb response envelope.
pub const API_STATUS_OK: &str = "0000";

/// Status returned when a private list endpoint has nothing to return.
pub const API_STATUS_EMPTY: &str = "5600";

/// Message accompanying [`API_STATUS_EMPTY`] when there are no open orders
/// ("there are no transactions in progress"). Together with the status code
/// this is normalized to an empty result, not an error.
pub const NO_OPEN_ORDERS_MESSAGE: &str = "거래 진행중인 내역이 존재하지 않습니다";

/// Timeout applied to every HTTP request.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Number of open orders requested per cycle.
pub const OPEN_ORDER_FETCH_COUNT: u32 = 50;

/// Number of recently settled transactions requested per cycle.
pub const PROCESSED_ORDER_FETCH_COUNT: u32 = 20;

// =============================================================================
// GRID / ORDER SIZING
// =============================================================================

/// How many slot boundaries below the current price the rebuy logic inspects
/// before giving up on the cycle.
pub const MAX_SLOT_LOOKAHEAD: usize = 5;

/// Order quantities are truncated to this many decimal places before placement.
pub const UNITS_DECIMALS: u32 = 4;

/// Smallest order quantity the exchange accepts.
pub const DEFAULT_MIN_TRADABLE_UNIT: f64 = 0.0001;

/// Tolerance for comparing coin quantities parsed from the API.
pub const UNITS_EPSILON: f64 = 1e-8;

/// Relative tolerance when matching an open SELL against the expected paired
/// resale price of an open BUY. Grid pairs sit at least one slot apart, so
/// 0.1% cannot match a neighboring pair.
pub const PAIR_PRICE_TOLERANCE: f64 = 0.001;

/// Flooring granularity cap for [`crate::grid::profit_price`].
pub const PROFIT_ROUNDING_CAP_KRW: u64 = 100_000;
