//! Automated grid trading bot for the Bithumb KRW market.
//!
//! The bot keeps no state of its own. On every cycle it rebuilds its
//! view of the world from the exchange (price, balances, open orders,
//! recent fills), derives the orders that should exist from that view
//! alone, and places whatever is missing.

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod grid;
pub mod logging;
pub mod model;
pub mod parse;
pub mod scheduler;
