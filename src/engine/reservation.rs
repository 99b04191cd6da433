//! Converts order admission, fills, and cancellation into balance holds.
//! A pure function over the ledger: it never reads or writes an order row.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::models::instrument::RUB;
use crate::models::order::OrderSide;

use super::error::EngineResult;
use super::ledger;

/// Reserves collateral for a newly-admitted LIMIT order. BUY holds
/// `qty * price` of RUB; SELL holds `qty` of the instrument.
pub async fn reserve_for_new_limit_order(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    ticker: &str,
    side: OrderSide,
    qty: i64,
    price: i64,
) -> EngineResult<()> {
    match side {
        OrderSide::Buy => ledger::reserve(tx, user_id, RUB, qty * price).await,
        OrderSide::Sell => ledger::reserve(tx, user_id, ticker, qty).await,
    }
}

/// Releases the reservation on the unfilled remainder of a LIMIT order,
/// e.g. on cancellation.
pub async fn release_remaining(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    ticker: &str,
    side: OrderSide,
    remaining_qty: i64,
    price: i64,
) -> EngineResult<()> {
    match side {
        OrderSide::Buy => ledger::release(tx, user_id, RUB, remaining_qty * price).await,
        OrderSide::Sell => ledger::release(tx, user_id, ticker, remaining_qty).await,
    }
}

/// Decrements the matching reservation leg by the amount that just filled.
/// Called once per fill, for the side of the fill that came from a LIMIT
/// order (MARKET orders hold no reservation to release).
pub async fn release_on_fill(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    ticker: &str,
    side: OrderSide,
    filled_qty: i64,
    price: i64,
) -> EngineResult<()> {
    match side {
        OrderSide::Buy => ledger::release(tx, user_id, RUB, filled_qty * price).await,
        OrderSide::Sell => ledger::release(tx, user_id, ticker, filled_qty).await,
    }
}

/// A BUY LIMIT order reserves `qty * order_price` up front, but a fill
/// always settles at the resting order's price (`fill_price`), which for
/// an aggressor crossing a better-priced resting SELL can be lower than
/// `order_price`. `release_on_fill` only releases `filled_qty * fill_price`,
/// so the gap between that and what was reserved for this increment would
/// otherwise stay locked in `reserved` forever. Only the BUY leg can drift
/// this way: a SELL's reservation is in instrument units, not RUB, so it
/// never depends on price.
pub async fn release_price_improvement(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    order_price: i64,
    fill_price: i64,
    fill_qty: i64,
) -> EngineResult<()> {
    let improvement = (order_price - fill_price) * fill_qty;
    if improvement > 0 {
        ledger::release(tx, user_id, RUB, improvement).await?;
    }
    Ok(())
}
