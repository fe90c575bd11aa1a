//! Pure planning step of the reconciliation cycle.
//!
//! [`plan_cycle`] is a synchronous function of the trading settings and
//! one account snapshot. It owns every trading rule but performs no
//! I/O, so the whole decision surface is testable with hand-built
//! snapshots. The engine fetches the snapshot and executes the plan.

use crate::config::settings::TradingSettings;
use crate::constants::{MAX_SLOT_LOOKAHEAD, PAIR_PRICE_TOLERANCE, UNITS_DECIMALS, UNITS_EPSILON};
use crate::engine::report::{OrderReason, PlannedOrder, SkipReason};
use crate::grid;
use crate::model::{floor_to_decimals, AccountBalance, OpenOrder, OrderSide, ProcessedOrder};

/// One consistent view of the account, fetched at the top of a cycle.
#[derive(Debug, Clone)]
pub struct CycleSnapshot {
    /// Best bid of the order book, in KRW.
    pub current_price: u64,
    pub balance: AccountBalance,
    pub open_orders: Vec<OpenOrder>,
    /// Recently settled fills, most recent first.
    pub processed_orders: Vec<ProcessedOrder>,
}

/// The orders one cycle wants on the book, plus the rules that fired
/// without producing one.
#[derive(Debug, Clone, Default)]
pub struct CyclePlan {
    pub orders: Vec<PlannedOrder>,
    pub skips: Vec<SkipReason>,
}

/// Derives the full set of actions for one cycle from a snapshot.
///
/// Rules run in a fixed order: carried-forward coin first, then one
/// re-buy attempt per settled SELL, then pair repair for uncovered
/// BUYs. KRW and coin committed by an earlier rule are not available
/// to a later one, so a plan never overspends the snapshot balance.
///
/// * `settings` - validated trading parameters
/// * `snapshot` - account state fetched this cycle
///
/// Returns the planned orders and the skips explaining inaction.
pub fn plan_cycle(settings: &TradingSettings, snapshot: &CycleSnapshot) -> CyclePlan {
    let mut plan = CyclePlan::default();
    let mut committed_krw = 0.0_f64;
    let mut committed_coin = 0.0_f64;

    // 1. Carried-forward coin check
    plan_carried_forward(settings, snapshot, &mut plan, &mut committed_coin);

    // 2. Fill-driven re-buy, one attempt per settled SELL
    plan_rebuys(settings, snapshot, &mut plan, &mut committed_krw);

    // 3. Pair repair for BUYs with no SELL at their profit price
    plan_pair_repairs(settings, snapshot, &mut plan, &mut committed_coin);

    plan
}

/// Coin sitting in the account with no SELL covering it gets listed at
/// the current price plus the rounded profit step, never less than
/// 1 KRW above the market. Dust at or under the tradable minimum is
/// left alone.
fn plan_carried_forward(
    settings: &TradingSettings,
    snapshot: &CycleSnapshot,
    plan: &mut CyclePlan,
    committed_coin: &mut f64,
) {
    let available = snapshot.balance.coin.available;
    if available <= settings.minimum_tradable_unit {
        return;
    }
    let covered = snapshot.open_orders.iter().any(|order| {
        order.side == OrderSide::Sell && order.units_remaining + UNITS_EPSILON >= available
    });
    if covered {
        return;
    }

    let units = floor_to_decimals(available, UNITS_DECIMALS);
    if units < settings.minimum_tradable_unit {
        plan.skips.push(SkipReason::BelowMinimumUnit { units });
        return;
    }

    let step = grid::profit_price(snapshot.current_price).max(1);
    let price = snapshot.current_price.saturating_add(step);
    *committed_coin += units;
    plan.orders.push(PlannedOrder {
        side: OrderSide::Sell,
        price,
        units,
        reason: OrderReason::CarriedForward,
    });
}

/// For each settled SELL, walks the slots under the current price and
/// re-deploys one unit of KRW at the first slot whose own profit price
/// stays under every resting SELL. A slot that already carries an
/// order, from the book or from earlier in this plan, is skipped
/// outright rather than walked past, so a stable price cannot stack
/// BUYs downward.
fn plan_rebuys(
    settings: &TradingSettings,
    snapshot: &CycleSnapshot,
    plan: &mut CyclePlan,
    committed_krw: &mut f64,
) {
    let rate = settings.slot_interval_rate_percent;
    for fill in snapshot
        .processed_orders
        .iter()
        .filter(|order| order.side == OrderSide::Sell)
    {
        let Some(slot) = eligible_rebuy_slot(settings, snapshot, fill.price) else {
            plan.skips.push(SkipReason::NoEligibleSlot {
                filled_order_id: fill.order_id.clone(),
            });
            continue;
        };

        if slot_is_occupied(slot, rate, snapshot, plan) {
            plan.skips.push(SkipReason::SlotOccupied { price: slot });
            continue;
        }

        let units = floor_to_decimals(settings.unit_price_krw as f64 / slot as f64, UNITS_DECIMALS);
        if units < settings.minimum_tradable_unit {
            plan.skips.push(SkipReason::BelowMinimumUnit { units });
            continue;
        }

        let cost = (units * slot as f64).round() as u64;
        let free_krw = snapshot.balance.krw.available - *committed_krw;
        if (cost as f64) > free_krw {
            plan.skips.push(SkipReason::InsufficientKrw {
                needed: cost,
                available: free_krw.max(0.0) as u64,
            });
            continue;
        }

        *committed_krw += cost as f64;
        plan.orders.push(PlannedOrder {
            side: OrderSide::Buy,
            price: slot,
            units,
            reason: OrderReason::FillRebuy {
                filled_order_id: fill.order_id.clone(),
            },
        });
    }
}

/// Finds the highest slot under the current price whose paired sell
/// price undercuts every resting SELL and the settled SELL that is
/// being replaced. Returns `None` when no slot within the lookahead
/// qualifies, which happens when the price has run far above an old
/// fill.
fn eligible_rebuy_slot(
    settings: &TradingSettings,
    snapshot: &CycleSnapshot,
    filled_price: u64,
) -> Option<u64> {
    let mut ceilings: Vec<u64> = snapshot
        .open_orders
        .iter()
        .filter(|order| order.side == OrderSide::Sell)
        .map(|order| order.price)
        .collect();
    ceilings.push(filled_price);

    grid::slots_below(
        snapshot.current_price,
        MAX_SLOT_LOOKAHEAD,
        settings.slot_interval_rate_percent,
    )
    .into_iter()
    .find(|&slot| {
        let paired = grid::paired_sell_price(slot, settings.earning_rate_percent);
        ceilings.iter().all(|&ceiling| paired < ceiling)
    })
}

/// An order occupies a slot when its price floors to that slot, so a
/// SELL resting just above a boundary blocks the same slot its BUY
/// came from.
fn slot_is_occupied(slot: u64, rate: f64, snapshot: &CycleSnapshot, plan: &CyclePlan) -> bool {
    snapshot
        .open_orders
        .iter()
        .map(|order| order.price)
        .chain(plan.orders.iter().map(|order| order.price))
        .any(|price| grid::floor_price(price, rate) == slot)
}

/// Every open BUY should have a SELL waiting at its paired profit
/// price; when one is missing, list the BUY's remaining units there.
/// Selling needs standing inventory, so a repair without free coin is
/// recorded as a skip and retried once the BUY fills.
fn plan_pair_repairs(
    settings: &TradingSettings,
    snapshot: &CycleSnapshot,
    plan: &mut CyclePlan,
    committed_coin: &mut f64,
) {
    for buy in snapshot
        .open_orders
        .iter()
        .filter(|order| order.side == OrderSide::Buy)
    {
        let target = grid::paired_sell_price(buy.price, settings.earning_rate_percent);
        let has_pair = snapshot
            .open_orders
            .iter()
            .filter(|order| order.side == OrderSide::Sell)
            .map(|order| order.price)
            .chain(
                plan.orders
                    .iter()
                    .filter(|order| order.side == OrderSide::Sell)
                    .map(|order| order.price),
            )
            .any(|price| price_near(price, target));
        if has_pair {
            continue;
        }

        let units = floor_to_decimals(buy.units_remaining, UNITS_DECIMALS);
        if units < settings.minimum_tradable_unit {
            plan.skips.push(SkipReason::BelowMinimumUnit { units });
            continue;
        }

        let free_coin = snapshot.balance.coin.available - *committed_coin;
        if units > free_coin + UNITS_EPSILON {
            plan.skips.push(SkipReason::InsufficientCoin {
                needed: units,
                available: free_coin.max(0.0),
            });
            continue;
        }

        *committed_coin += units;
        plan.orders.push(PlannedOrder {
            side: OrderSide::Sell,
            price: target,
            units,
            reason: OrderReason::PairRepair {
                buy_order_id: buy.order_id.clone(),
            },
        });
    }
}

fn price_near(price: u64, target: u64) -> bool {
    (price as f64 - target as f64).abs() <= target as f64 * PAIR_PRICE_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{datetime_from_micros, CurrencyBalance};

    fn settings() -> TradingSettings {
        TradingSettings {
            coin_type: "BTC".to_string(),
            unit_price_krw: 100_000,
            trade_interval_secs: 60,
            earning_rate_percent: 1.0,
            slot_interval_rate_percent: 0.5,
            minimum_tradable_unit: 0.0001,
        }
    }

    fn balance(krw: f64, coin: f64) -> AccountBalance {
        AccountBalance {
            krw: CurrencyBalance {
                total: krw,
                in_use: 0.0,
                available: krw,
            },
            coin: CurrencyBalance {
                total: coin,
                in_use: 0.0,
                available: coin,
            },
        }
    }

    fn snapshot(price: u64, krw: f64, coin: f64) -> CycleSnapshot {
        CycleSnapshot {
            current_price: price,
            balance: balance(krw, coin),
            open_orders: Vec::new(),
            processed_orders: Vec::new(),
        }
    }

    fn open_order(id: &str, side: OrderSide, price: u64, units: f64) -> OpenOrder {
        OpenOrder {
            order_id: id.to_string(),
            side,
            price,
            units_remaining: units,
            order_date: datetime_from_micros(1_616_320_536_000_000),
        }
    }

    fn settled_sell(id: &str, price: u64, units: f64) -> ProcessedOrder {
        ProcessedOrder {
            order_id: id.to_string(),
            side: OrderSide::Sell,
            price,
            units,
            fee: 0.0,
            processed_date: datetime_from_micros(1_616_330_536_000_000),
        }
    }

    #[test]
    fn test_carried_forward_places_single_sell() {
        // Coin in the account, no KRW, nothing on the book
        let snap = snapshot(47_654_321, 0.0, 0.00011808);
        let plan = plan_cycle(&settings(), &snap);

        assert_eq!(plan.orders.len(), 1);
        let order = &plan.orders[0];
        assert_eq!(order.side, OrderSide::Sell);
        // profit step for 47,654,321 KRW is 400,000
        assert_eq!(order.price, 48_054_321);
        assert!((order.units - 0.0001).abs() < 1e-12);
        assert_eq!(order.reason, OrderReason::CarriedForward);
        assert!(plan.skips.is_empty());
    }

    #[test]
    fn test_carried_forward_skipped_when_sell_covers_balance() {
        let mut snap = snapshot(50_000_000, 0.0, 0.0021);
        snap.open_orders
            .push(open_order("s-1", OrderSide::Sell, 51_000_000, 0.0021));
        let plan = plan_cycle(&settings(), &snap);

        assert!(plan.orders.is_empty());
        assert!(plan.skips.is_empty());
    }

    #[test]
    fn test_carried_forward_ignores_dust() {
        let snap = snapshot(50_000_000, 0.0, 0.00009);
        let plan = plan_cycle(&settings(), &snap);

        assert!(plan.orders.is_empty());
        assert!(plan.skips.is_empty());
    }

    #[test]
    fn test_carried_forward_respects_custom_minimum() {
        let mut config = settings();
        config.minimum_tradable_unit = 0.00015;
        // Above the minimum before flooring, under it after
        let snap = snapshot(50_000_000, 0.0, 0.00016);
        let plan = plan_cycle(&config, &snap);

        assert!(plan.orders.is_empty());
        assert!(matches!(
            plan.skips[..],
            [SkipReason::BelowMinimumUnit { .. }]
        ));
    }

    #[test]
    fn test_carried_forward_sub_100_price_keeps_a_margin() {
        // 1% of 90 KRW rounds to zero; the profit step floors at 1 KRW
        let snap = snapshot(90, 0.0, 1.5);
        let plan = plan_cycle(&settings(), &snap);

        assert_eq!(plan.orders.len(), 1);
        assert_eq!(plan.orders[0].side, OrderSide::Sell);
        assert_eq!(plan.orders[0].price, 91);
    }

    #[test]
    fn test_carried_forward_survives_absurd_price_magnitudes() {
        // A corrupt feed can report a price near the integer ceiling;
        // the listing saturates instead of overflowing
        let snap = snapshot(u64::MAX - 10, 0.0, 1.5);
        let plan = plan_cycle(&settings(), &snap);

        assert_eq!(plan.orders.len(), 1);
        assert_eq!(plan.orders[0].price, u64::MAX);
    }

    #[test]
    fn test_rebuy_walks_past_slots_that_crowd_the_open_sell() {
        // Settled SELL at 49,600,000; the first slot under 49,390,000 is
        // 49,200,000 but its paired sell lands above the resting SELL
        let mut snap = snapshot(49_390_000, 1_000_000.0, 0.0);
        snap.open_orders
            .push(open_order("s-1", OrderSide::Sell, 49_600_000, 0.0020));
        snap.processed_orders
            .push(settled_sell("fill-1", 49_600_000, 0.0020));
        let plan = plan_cycle(&settings(), &snap);

        assert_eq!(plan.orders.len(), 1);
        let order = &plan.orders[0];
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.price, 49_000_000);
        assert!((order.units - 0.0020).abs() < 1e-12);
        assert_eq!(
            order.reason,
            OrderReason::FillRebuy {
                filled_order_id: "fill-1".to_string()
            }
        );
    }

    #[test]
    fn test_rebuy_finer_grid_stops_one_slot_higher() {
        let mut config = settings();
        config.slot_interval_rate_percent = 0.25;
        let mut snap = snapshot(49_390_000, 1_000_000.0, 0.0);
        snap.open_orders
            .push(open_order("s-1", OrderSide::Sell, 49_600_000, 0.0020));
        snap.processed_orders
            .push(settled_sell("fill-1", 49_600_000, 0.0020));
        let plan = plan_cycle(&config, &snap);

        assert_eq!(plan.orders.len(), 1);
        assert_eq!(plan.orders[0].price, 49_100_000);
    }

    #[test]
    fn test_stable_price_does_not_stack_buys() {
        let mut snap = snapshot(51_234_567, 1_000_000.0, 0.0);
        snap.open_orders
            .push(open_order("s-1", OrderSide::Sell, 51_500_000, 0.0020));
        snap.processed_orders
            .push(settled_sell("fill-a", 51_500_000, 0.0020));

        // First cycle re-deploys one unit of KRW
        let first = plan_cycle(&settings(), &snap);
        assert_eq!(first.orders.len(), 1);
        let buy = &first.orders[0];
        assert_eq!(buy.side, OrderSide::Buy);
        assert_eq!(buy.price, 50_800_000);

        // Second cycle sees the same fill plus the BUY it produced
        snap.open_orders
            .push(open_order("buy-1", OrderSide::Buy, buy.price, buy.units));
        let second = plan_cycle(&settings(), &snap);
        assert!(second.orders.is_empty());
        assert!(second
            .skips
            .contains(&SkipReason::SlotOccupied { price: 50_800_000 }));
        // The fresh BUY has no inventory to pair yet
        assert!(second
            .skips
            .iter()
            .any(|skip| matches!(skip, SkipReason::InsufficientCoin { .. })));
    }

    #[test]
    fn test_rebuy_abandoned_when_price_ran_away_from_fill() {
        let mut snap = snapshot(50_000_000, 1_000_000.0, 0.0);
        snap.processed_orders
            .push(settled_sell("old-1", 40_000_000, 0.0020));
        let plan = plan_cycle(&settings(), &snap);

        assert!(plan.orders.is_empty());
        assert_eq!(
            plan.skips,
            vec![SkipReason::NoEligibleSlot {
                filled_order_id: "old-1".to_string()
            }]
        );
    }

    #[test]
    fn test_rebuy_skipped_without_funds() {
        let mut snap = snapshot(49_390_000, 50_000.0, 0.0);
        snap.open_orders
            .push(open_order("s-1", OrderSide::Sell, 49_600_000, 0.0020));
        snap.processed_orders
            .push(settled_sell("fill-1", 49_600_000, 0.0020));
        let plan = plan_cycle(&settings(), &snap);

        assert!(plan.orders.is_empty());
        assert_eq!(
            plan.skips,
            vec![SkipReason::InsufficientKrw {
                needed: 98_000,
                available: 50_000
            }]
        );
    }

    #[test]
    fn test_committed_krw_limits_later_rebuys() {
        // Two settled SELLs at different prices target different slots;
        // the KRW left after the first purchase cannot fund the second
        let mut snap = snapshot(49_390_000, 150_000.0, 0.0);
        snap.open_orders
            .push(open_order("s-1", OrderSide::Sell, 49_600_000, 0.0040));
        snap.processed_orders
            .push(settled_sell("fill-1", 49_600_000, 0.0020));
        snap.processed_orders
            .push(settled_sell("fill-2", 49_100_000, 0.0020));
        let plan = plan_cycle(&settings(), &snap);

        assert_eq!(plan.orders.len(), 1);
        assert_eq!(plan.orders[0].price, 49_000_000);
        assert_eq!(
            plan.skips,
            vec![SkipReason::InsufficientKrw {
                needed: 97_200,
                available: 52_000
            }]
        );
    }

    #[test]
    fn test_second_fill_lands_on_occupied_slot() {
        let mut snap = snapshot(49_390_000, 1_000_000.0, 0.0);
        snap.open_orders
            .push(open_order("s-1", OrderSide::Sell, 49_600_000, 0.0040));
        snap.processed_orders
            .push(settled_sell("fill-1", 49_600_000, 0.0020));
        snap.processed_orders
            .push(settled_sell("fill-2", 49_600_000, 0.0020));
        let plan = plan_cycle(&settings(), &snap);

        assert_eq!(plan.orders.len(), 1);
        assert_eq!(plan.orders[0].price, 49_000_000);
        assert_eq!(
            plan.skips,
            vec![SkipReason::SlotOccupied { price: 49_000_000 }]
        );
    }

    #[test]
    fn test_pair_repair_lists_missing_sell() {
        let mut snap = snapshot(49_390_000, 0.0, 0.0021);
        snap.open_orders
            .push(open_order("buy-9", OrderSide::Buy, 49_000_000, 0.0020));
        // Unrelated SELL large enough to cover the carried balance
        snap.open_orders
            .push(open_order("s-1", OrderSide::Sell, 51_000_000, 0.0021));
        let plan = plan_cycle(&settings(), &snap);

        assert_eq!(plan.orders.len(), 1);
        let order = &plan.orders[0];
        assert_eq!(order.side, OrderSide::Sell);
        // 49,000,000 * 1.01
        assert_eq!(order.price, 49_490_000);
        assert!((order.units - 0.0020).abs() < 1e-12);
        assert_eq!(
            order.reason,
            OrderReason::PairRepair {
                buy_order_id: "buy-9".to_string()
            }
        );
    }

    #[test]
    fn test_pair_repair_skipped_without_inventory() {
        let mut snap = snapshot(49_390_000, 0.0, 0.0);
        snap.open_orders
            .push(open_order("buy-10", OrderSide::Buy, 49_000_000, 0.0020));
        let plan = plan_cycle(&settings(), &snap);

        assert!(plan.orders.is_empty());
        assert!(matches!(
            plan.skips[..],
            [SkipReason::InsufficientCoin { .. }]
        ));
    }

    #[test]
    fn test_pair_repair_satisfied_by_existing_sell() {
        let mut snap = snapshot(49_390_000, 0.0, 0.0);
        snap.open_orders
            .push(open_order("buy-11", OrderSide::Buy, 49_000_000, 0.0020));
        // Within 0.1% of the paired price 49,490,000
        snap.open_orders
            .push(open_order("s-1", OrderSide::Sell, 49_490_000, 0.0020));
        let plan = plan_cycle(&settings(), &snap);

        assert!(plan.orders.is_empty());
        assert!(plan.skips.is_empty());
    }

    #[test]
    fn test_empty_snapshot_is_a_no_op() {
        let plan = plan_cycle(&settings(), &snapshot(50_000_000, 0.0, 0.0));
        assert!(plan.orders.is_empty());
        assert!(plan.skips.is_empty());
    }
}
