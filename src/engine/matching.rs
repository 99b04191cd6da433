//! Pure matching algorithm: price-time priority walk over an already
//! locked, already-sorted slice of resting orders. Knows nothing about
//! Postgres or the ledger — `gateway.rs` applies the plan it produces.

use uuid::Uuid;

use crate::models::order::{Order, OrderSide};

/// One resting order being fully or partially consumed by the aggressor.
#[derive(Debug, Clone, Copy)]
pub struct FillPlan {
    pub resting_index: usize,
    pub resting_order_id: Uuid,
    pub qty: i64,
    pub price: i64,
}

/// Walks `resting` (assumed already sorted in priority order for the
/// aggressor's opposite side) and greedily fills `remaining_qty`.
///
/// `limit_price` is `None` for a MARKET aggressor (no price guard — walk
/// until quantity is satisfied or the book is exhausted) and `Some(p)` for
/// a LIMIT aggressor (stop as soon as the next level would not cross).
pub fn plan_fills(
    side: OrderSide,
    remaining_qty: i64,
    limit_price: Option<i64>,
    resting: &[Order],
) -> Vec<FillPlan> {
    let mut fills = Vec::new();
    let mut remaining = remaining_qty;

    for (idx, r) in resting.iter().enumerate() {
        if remaining == 0 {
            break;
        }
        let r_remaining = r.remaining();
        if r_remaining <= 0 {
            continue;
        }
        let r_price = match r.price {
            Some(p) => p,
            None => continue, // resting orders are always LIMIT; defensive
        };

        if let Some(limit) = limit_price {
            let crosses = match side {
                OrderSide::Buy => limit >= r_price,
                OrderSide::Sell => limit <= r_price,
            };
            if !crosses {
                break;
            }
        }

        let qty = remaining.min(r_remaining);
        fills.push(FillPlan {
            resting_index: idx,
            resting_order_id: r.id,
            qty,
            price: r_price,
        });
        remaining -= qty;
    }

    fills
}

/// Total remaining quantity across resting orders a walk could reach —
/// used by the MARKET full-fill-or-reject pre-check. Unlike `plan_fills`,
/// this never applies a price guard: MARKET orders cross at any price.
pub fn total_available(resting: &[Order]) -> i64 {
    resting.iter().map(|o| o.remaining().max(0)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::models::order::{OrderStatus, OrderType};

    fn resting(id: u128, price: i64, qty: i64, filled: i64, ts_secs: i64) -> Order {
        Order {
            id: Uuid::from_u128(id),
            user_id: Uuid::from_u128(1000 + id),
            ticker: "X".to_string(),
            order_type: OrderType::Limit,
            side: OrderSide::Sell,
            qty,
            price: Some(price),
            filled,
            status: OrderStatus::New,
            created_at: Utc.timestamp_opt(ts_secs, 0).unwrap(),
        }
    }

    #[test]
    fn limit_aggressor_stops_at_non_crossing_level() {
        let book = vec![resting(1, 100, 5, 0, 1), resting(2, 101, 5, 0, 2)];
        let fills = plan_fills(OrderSide::Buy, 10, Some(100), &book);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].qty, 5);
        assert_eq!(fills[0].price, 100);
    }

    #[test]
    fn price_time_priority_splits_across_two_equal_price_levels() {
        let book = vec![resting(1, 100, 5, 0, 1), resting(2, 100, 5, 0, 2)];
        let fills = plan_fills(OrderSide::Buy, 7, Some(100), &book);
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].qty, 5);
        assert_eq!(fills[0].resting_order_id, Uuid::from_u128(1));
        assert_eq!(fills[1].qty, 2);
        assert_eq!(fills[1].resting_order_id, Uuid::from_u128(2));
    }

    #[test]
    fn market_aggressor_ignores_price_and_exhausts_book() {
        let book = vec![resting(1, 50, 5, 0, 1)];
        let fills = plan_fills(OrderSide::Buy, 10, None, &book);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].qty, 5);
        assert_eq!(total_available(&book), 5);
    }

    #[test]
    fn partially_filled_resting_order_contributes_only_its_remainder() {
        let book = vec![resting(1, 100, 10, 6, 1)];
        let fills = plan_fills(OrderSide::Sell, 4, Some(100), &book);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].qty, 4);
    }
}
