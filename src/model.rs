use chrono::{DateTime, TimeZone, Utc};
use std::fmt;

/// Order direction, mapped onto Bithumb's `bid`/`ask` wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The `type` parameter value the exchange expects.
    pub fn api_value(&self) -> &'static str {
        match self {
            OrderSide::Buy => "bid",
            OrderSide::Sell => "ask",
        }
    }

    /// Maps a wire value (`bid`/`ask`, or the transaction-history
    /// `buy`/`sell` spelling) back onto a side.
    pub fn from_api_value(raw: &str) -> Option<OrderSide> {
        match raw {
            "bid" | "buy" => Some(OrderSide::Buy),
            "ask" | "sell" => Some(OrderSide::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// An order still resting on the book, as reported by the open-order list.
#[derive(Debug, Clone)]
pub struct OpenOrder {
    pub order_id: String,
    pub side: OrderSide,
    /// Limit price in integer KRW.
    pub price: u64,
    /// Quantity not yet matched.
    pub units_remaining: f64,
    pub order_date: DateTime<Utc>,
}

/// A settled fill from the recent transaction history.
#[derive(Debug, Clone)]
pub struct ProcessedOrder {
    pub order_id: String,
    pub side: OrderSide,
    /// Fill price in integer KRW.
    pub price: u64,
    /// Matched quantity.
    pub units: f64,
    /// Fee charged by the exchange; coin-denominated for buys,
    /// KRW-denominated for sells.
    pub fee: f64,
    pub processed_date: DateTime<Utc>,
}

/// Total / in-use / available amounts for a single currency.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrencyBalance {
    pub total: f64,
    pub in_use: f64,
    pub available: f64,
}

/// Balance snapshot for the quote currency and the traded coin,
/// read fresh every cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountBalance {
    pub krw: CurrencyBalance,
    pub coin: CurrencyBalance,
}

/// Truncates a quantity to `decimals` places. The exchange rejects
/// quantities finer than its precision, and rounding up could commit
/// more than the account holds, so this always floors.
pub fn floor_to_decimals(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).floor() / factor
}

/// Converts a Bithumb microsecond timestamp into a UTC datetime.
/// Out-of-range values fall back to the epoch instead of failing the
/// whole response.
pub fn datetime_from_micros(micros: i64) -> DateTime<Utc> {
    match Utc.timestamp_micros(micros) {
        chrono::LocalResult::Single(dt) => dt,
        _ => Utc.timestamp_micros(0).single().unwrap_or_default(),
    }
}
