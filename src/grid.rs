//! Price-grid arithmetic.
//!
//! All functions here are pure. Prices are integer KRW; the grid is
//! derived from a price and a slot-interval percentage, never stored.

use crate::constants::PROFIT_ROUNDING_CAP_KRW;

/// The stabilized grid step at `price`.
///
/// The raw step is `price * slot_interval_rate_percent / 100`,
/// truncated to its leading decimal digit so that every price inside a
/// bucket derives the same step (a raw step of 246,950 becomes
/// 200,000). Never returns 0.
pub fn slot_unit(price: u64, slot_interval_rate_percent: f64) -> u64 {
    let raw = ((price as f64) * slot_interval_rate_percent / 100.0).floor() as u64;
    floor_to_leading_digit(raw).max(1)
}

/// The largest grid boundary at or below `price`.
///
/// The step is re-derived at the candidate boundary until it is
/// self-consistent, which keeps the function idempotent even when
/// flooring crosses into a smaller step magnitude. A price already on
/// a boundary is returned unchanged.
pub fn floor_price(price: u64, slot_interval_rate_percent: f64) -> u64 {
    let mut boundary = price;
    let mut unit = slot_unit(price, slot_interval_rate_percent);
    loop {
        boundary -= boundary % unit;
        let refined = slot_unit(boundary, slot_interval_rate_percent);
        if refined == unit {
            return boundary;
        }
        unit = refined;
    }
}

/// The `n` grid boundaries strictly below `reference_price`, nearest
/// first.
///
/// * `reference_price` - Price the walk starts from; never included.
/// * `n` - Number of boundaries to return.
pub fn slots_below(reference_price: u64, n: usize, slot_interval_rate_percent: f64) -> Vec<u64> {
    let mut boundaries = Vec::with_capacity(n);
    let mut cursor = floor_price(reference_price, slot_interval_rate_percent);
    if cursor == reference_price {
        cursor = next_boundary_below(cursor, slot_interval_rate_percent);
    }
    while boundaries.len() < n && cursor > 0 {
        boundaries.push(cursor);
        cursor = next_boundary_below(cursor, slot_interval_rate_percent);
    }
    boundaries
}

fn next_boundary_below(boundary: u64, slot_interval_rate_percent: f64) -> u64 {
    let unit = slot_unit(boundary, slot_interval_rate_percent);
    floor_price(boundary.saturating_sub(unit), slot_interval_rate_percent)
}

/// The resale price paired with a BUY at `buy_price`:
/// `buy_price * (1 + earning_rate_percent / 100)`, rounded to integer
/// KRW.
pub fn paired_sell_price(buy_price: u64, earning_rate_percent: f64) -> u64 {
    ((buy_price as f64) * (1.0 + earning_rate_percent / 100.0)).round() as u64
}

/// Profit target in KRW for a reference KRW amount.
///
/// Takes 1% of the input and floors it to its leading decimal digit,
/// with the flooring granularity capped at
/// [`PROFIT_ROUNDING_CAP_KRW`]. The cap is what keeps nine-digit
/// inputs rounding to a 100,000-KRW grain instead of a full million.
pub fn profit_price(reference_krw: u64) -> u64 {
    let base = reference_krw / 100;
    if base == 0 {
        return 0;
    }
    let granularity = magnitude(base).min(PROFIT_ROUNDING_CAP_KRW);
    base - base % granularity
}

/// Largest power of ten not exceeding `value` (assumes `value >= 1`).
fn magnitude(value: u64) -> u64 {
    let mut scale = 1u64;
    let mut head = value;
    while head >= 10 {
        head /= 10;
        scale *= 10;
    }
    scale
}

fn floor_to_leading_digit(value: u64) -> u64 {
    if value < 10 {
        return value;
    }
    let scale = magnitude(value);
    value / scale * scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_unit_truncates_to_leading_digit() {
        // 49,390,000 * 0.5% = 246,950 -> 200,000
        assert_eq!(slot_unit(49_390_000, 0.5), 200_000);
        // 49,390,000 * 0.25% = 123,475 -> 100,000
        assert_eq!(slot_unit(49_390_000, 0.25), 100_000);
        assert_eq!(slot_unit(50_000_000, 0.5), 200_000);
    }

    #[test]
    fn test_floor_price_boundary_fixed_point() {
        // A price already on a grid line floors to itself
        assert_eq!(floor_price(50_000_000, 0.5), 50_000_000);
    }

    #[test]
    fn test_floor_price_inside_bucket() {
        assert_eq!(floor_price(49_390_000, 0.5), 49_200_000);
        assert_eq!(floor_price(49_390_000, 0.25), 49_300_000);
        assert_eq!(floor_price(51_234_567, 0.5), 51_200_000);
    }

    #[test]
    fn test_floor_price_idempotent_across_rates() {
        // Sweep a wide, unaligned price range; the awkward rates force
        // the step magnitude to shift mid-floor.
        for rate in [0.1, 0.25, 0.3, 0.5, 1.0] {
            let mut price = 1_000_000u64;
            while price < 200_000_000 {
                let once = floor_price(price, rate);
                assert_eq!(
                    floor_price(once, rate),
                    once,
                    "not idempotent for price {} rate {}",
                    price,
                    rate
                );
                assert!(once <= price);
                price += 97_531;
            }
        }
    }

    #[test]
    fn test_floor_price_stable_within_bucket() {
        let boundary = floor_price(49_390_000, 0.5);
        assert_eq!(floor_price(49_210_000, 0.5), boundary);
        assert_eq!(floor_price(49_399_999, 0.5), boundary);
    }

    #[test]
    fn test_slots_below_walk() {
        assert_eq!(
            slots_below(49_390_000, 2, 0.5),
            vec![49_200_000, 49_000_000]
        );
        assert_eq!(
            slots_below(49_390_000, 3, 0.25),
            vec![49_300_000, 49_200_000, 49_100_000]
        );
    }

    #[test]
    fn test_slots_below_excludes_reference_on_boundary() {
        // Reference sits exactly on a grid line; "below" is strict
        assert_eq!(slots_below(50_000_000, 1, 0.5), vec![49_800_000]);
    }

    #[test]
    fn test_slots_below_strictly_decreasing() {
        let slots = slots_below(87_654_321, 6, 0.5);
        assert_eq!(slots.len(), 6);
        for pair in slots.windows(2) {
            assert!(pair[0] > pair[1]);
        }
        assert!(slots[0] < 87_654_321);
    }

    #[test]
    fn test_paired_sell_price() {
        assert_eq!(paired_sell_price(49_000_000, 1.0), 49_490_000);
        assert_eq!(paired_sell_price(50_000_000, 0.5), 50_250_000);
    }

    #[test]
    fn test_profit_price_fixtures() {
        assert_eq!(profit_price(4_765_432), 40_000);
        assert_eq!(profit_price(47_654_321), 400_000);
        assert_eq!(profit_price(157_654_321), 1_500_000);
    }

    #[test]
    fn test_profit_price_small_values() {
        // 1% of 4,500 is 45; floors to its leading digit
        assert_eq!(profit_price(4_500), 40);
        assert_eq!(profit_price(99), 0);
        assert_eq!(profit_price(0), 0);
    }
}
