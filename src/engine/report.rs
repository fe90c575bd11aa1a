//! Outcome types for a single reconciliation cycle.

use crate::model::OrderSide;
use std::fmt;

/// Why the planner wants an order on the book.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderReason {
    /// Coin was sitting in the account with no SELL covering it.
    CarriedForward,
    /// A SELL settled and its slot capital is being re-deployed lower.
    FillRebuy { filled_order_id: String },
    /// An open BUY had no SELL waiting at its paired profit price.
    PairRepair { buy_order_id: String },
}

impl fmt::Display for OrderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderReason::CarriedForward => write!(f, "carried-forward"),
            OrderReason::FillRebuy { filled_order_id } => {
                write!(f, "fill-rebuy after {}", filled_order_id)
            }
            OrderReason::PairRepair { buy_order_id } => {
                write!(f, "pair-repair for {}", buy_order_id)
            }
        }
    }
}

/// An order the planner decided to place, before it touches the exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedOrder {
    pub side: OrderSide,
    pub price: u64,
    pub units: f64,
    pub reason: OrderReason,
}

impl fmt::Display for PlannedOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.4} @ {} KRW ({})",
            self.side, self.units, self.price, self.reason
        )
    }
}

/// A rule fired but produced no order. Skips are normal operation, not
/// errors, and each cycle reports them so the log explains inactivity.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The chosen slot already has an order resting on it.
    SlotOccupied { price: u64 },
    /// Not enough free KRW for one slot purchase.
    InsufficientKrw { needed: u64, available: u64 },
    /// Not enough free coin to cover a SELL.
    InsufficientCoin { needed: f64, available: f64 },
    /// Floored quantity fell under the exchange minimum.
    BelowMinimumUnit { units: f64 },
    /// No slot under the current price clears every resting SELL.
    NoEligibleSlot { filled_order_id: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SlotOccupied { price } => {
                write!(f, "slot {} KRW already has a resting order", price)
            }
            SkipReason::InsufficientKrw { needed, available } => {
                write!(f, "need {} KRW but only {} is free", needed, available)
            }
            SkipReason::InsufficientCoin { needed, available } => {
                write!(f, "need {:.4} coin but only {:.4} is free", needed, available)
            }
            SkipReason::BelowMinimumUnit { units } => {
                write!(f, "quantity {:.8} is under the tradable minimum", units)
            }
            SkipReason::NoEligibleSlot { filled_order_id } => {
                write!(f, "no slot clears resting sells after fill {}", filled_order_id)
            }
        }
    }
}

/// An order the exchange accepted this cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub order_id: String,
    pub planned: PlannedOrder,
}

/// Everything one cycle did, for the scheduler log and `--once` output.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub current_price: u64,
    pub placed: Vec<PlacedOrder>,
    pub failed: Vec<(PlannedOrder, String)>,
    pub skips: Vec<SkipReason>,
}

impl CycleReport {
    pub fn is_no_op(&self) -> bool {
        self.placed.is_empty() && self.failed.is_empty()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "price {} KRW, placed {}, failed {}, skipped {}",
            self.current_price,
            self.placed.len(),
            self.failed.len(),
            self.skips.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display_summarizes_counts() {
        let report = CycleReport {
            current_price: 49_390_000,
            placed: vec![PlacedOrder {
                order_id: "C0101".to_string(),
                planned: PlannedOrder {
                    side: OrderSide::Buy,
                    price: 49_000_000,
                    units: 0.0020,
                    reason: OrderReason::FillRebuy {
                        filled_order_id: "161632".to_string(),
                    },
                },
            }],
            failed: Vec::new(),
            skips: vec![SkipReason::SlotOccupied { price: 49_200_000 }],
        };
        assert!(!report.is_no_op());
        assert_eq!(
            report.to_string(),
            "price 49390000 KRW, placed 1, failed 0, skipped 1"
        );
    }

    #[test]
    fn test_empty_report_is_no_op() {
        let report = CycleReport {
            current_price: 50_000_000,
            ..Default::default()
        };
        assert!(report.is_no_op());
    }
}
