//! Order gateway: validates, admits, matches, and settles one order as a
//! single atomic transaction, retrying on lock contention with bounded
//! backoff.

use chrono::Utc;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use crate::models::instrument::{is_valid_ticker, RUB};
use crate::models::order::{CreateOrderRequest, Order, OrderSide, OrderType};

use super::error::{EngineError, EngineResult};
use super::matching::plan_fills;
use super::settlement::{settle_fill, FillSide};
use super::{book, ledger, reservation};

/// 4 attempts, waiting 10ms, then 40ms, then 160ms between them.
const RETRY_BACKOFF_MS: [u64; 3] = [10, 40, 160];
const MAX_ATTEMPTS: u32 = 4;

fn backoff_with_jitter(attempt: usize) -> Duration {
    let base = RETRY_BACKOFF_MS[attempt];
    let jitter = rand::random::<u64>() % (base / 4 + 1);
    Duration::from_millis(base + jitter)
}

pub async fn create_order(pool: &PgPool, user_id: Uuid, req: CreateOrderRequest) -> EngineResult<Order> {
    validate_request(&req)?;

    let mut last_err = EngineError::Contention;
    for attempt in 0..MAX_ATTEMPTS {
        match try_create_order(pool, user_id, &req).await {
            Ok(order) => return Ok(order),
            Err(e) if e.is_contention() && attempt + 1 < MAX_ATTEMPTS => {
                last_err = e;
                crate::metrics::record_contention_retry();
                tokio::time::sleep(backoff_with_jitter(attempt as usize)).await;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err)
}

fn validate_request(req: &CreateOrderRequest) -> EngineResult<()> {
    if !is_valid_ticker(&req.ticker) {
        return Err(EngineError::Validation("ticker must be 2-10 uppercase letters/digits".to_string()));
    }
    if req.qty < 1 {
        return Err(EngineError::Validation("qty must be at least 1".to_string()));
    }
    match req.price {
        Some(p) if p <= 0 => Err(EngineError::Validation("limit price must be positive".to_string())),
        _ => Ok(()),
    }
}

async fn try_create_order(pool: &PgPool, user_id: Uuid, req: &CreateOrderRequest) -> EngineResult<Order> {
    let mut tx = pool.begin().await?;

    let instrument_exists: Option<(String,)> =
        sqlx::query_as("SELECT ticker FROM instruments WHERE ticker = $1")
            .bind(&req.ticker)
            .fetch_optional(&mut *tx)
            .await?;
    if instrument_exists.is_none() {
        return Err(EngineError::NotFound(format!("unknown instrument {}", req.ticker)));
    }

    let order_id = Uuid::new_v4();
    let now = Utc::now();

    let order = match req.price {
        Some(price) => {
            admit_limit_order(&mut tx, order_id, user_id, req, price, now).await?
        }
        None => admit_market_order(pool, &mut tx, order_id, user_id, req, now).await?,
    };

    tx.commit().await?;
    Ok(order)
}

async fn admit_limit_order(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    order_id: Uuid,
    user_id: Uuid,
    req: &CreateOrderRequest,
    price: i64,
    now: chrono::DateTime<Utc>,
) -> EngineResult<Order> {
    // Admissibility: lock the collateral-side balance row and check free headroom.
    match req.direction {
        OrderSide::Buy => {
            let balance = ledger::get(tx, user_id, RUB).await?;
            if balance.free() < req.qty * price {
                return Err(EngineError::InsufficientFunds("insufficient free RUB for limit buy".to_string()));
            }
        }
        OrderSide::Sell => {
            let balance = ledger::get(tx, user_id, &req.ticker).await?;
            if balance.free() < req.qty {
                return Err(EngineError::InsufficientFunds(format!(
                    "insufficient free {} for limit sell",
                    req.ticker
                )));
            }
        }
    }

    reservation::reserve_for_new_limit_order(tx, user_id, &req.ticker, req.direction, req.qty, price).await?;
    book::insert_order(
        tx,
        order_id,
        user_id,
        &req.ticker,
        OrderType::Limit,
        req.direction,
        req.qty,
        Some(price),
        0,
        crate::models::order::OrderStatus::New,
        now,
    )
    .await?;

    let opposite = req.direction.opposite();
    let resting = book::locked_resting_orders(tx, &req.ticker, opposite).await?;
    let fills = plan_fills(req.direction, req.qty, Some(price), &resting);

    let mut filled_total = 0i64;
    for fill in &fills {
        let resting_order = &resting[fill.resting_index];
        let (buyer, seller, buy_id, sell_id) = match req.direction {
            OrderSide::Buy => (
                FillSide { user_id, order_type: OrderType::Limit },
                FillSide { user_id: resting_order.user_id, order_type: OrderType::Limit },
                order_id,
                resting_order.id,
            ),
            OrderSide::Sell => (
                FillSide { user_id: resting_order.user_id, order_type: OrderType::Limit },
                FillSide { user_id, order_type: OrderType::Limit },
                resting_order.id,
                order_id,
            ),
        };

        settle_fill(tx, &req.ticker, buyer, seller, buy_id, sell_id, fill.qty, fill.price).await?;

        // A BUY aggressor reserved at its own price but settles at the
        // (better) resting price; top up the release with the difference
        // so nothing is left stranded in `reserved` once this qty is done.
        if req.direction == OrderSide::Buy {
            reservation::release_price_improvement(tx, user_id, price, fill.price, fill.qty).await?;
        }

        let new_resting_filled = resting_order.filled + fill.qty;
        let resting_status = if new_resting_filled >= resting_order.qty {
            crate::models::order::OrderStatus::Executed
        } else {
            crate::models::order::OrderStatus::PartiallyExecuted
        };
        book::update_fill(tx, resting_order.id, new_resting_filled, resting_status).await?;

        filled_total += fill.qty;
    }

    let final_status = if filled_total >= req.qty {
        crate::models::order::OrderStatus::Executed
    } else if filled_total > 0 {
        crate::models::order::OrderStatus::PartiallyExecuted
    } else {
        crate::models::order::OrderStatus::New
    };
    book::update_fill(tx, order_id, filled_total, final_status).await?;

    book::fetch_order(tx, order_id).await
}

/// Inserts a CANCELLED market order row in its own transaction, committed
/// independently of the caller's in-flight `tx`. A rejected market order
/// (unfillable or under-collateralized) still must persist as a durable
/// CANCELLED record (orders are never deleted) even though the caller's
/// transaction is about to be dropped/rolled back on the `Err` we return.
async fn reject_market_order(
    pool: &PgPool,
    order_id: Uuid,
    user_id: Uuid,
    req: &CreateOrderRequest,
    now: chrono::DateTime<Utc>,
    reason: EngineError,
) -> EngineResult<Order> {
    let mut reject_tx = pool.begin().await?;
    book::insert_order(
        &mut reject_tx,
        order_id,
        user_id,
        &req.ticker,
        OrderType::Market,
        req.direction,
        req.qty,
        None,
        0,
        crate::models::order::OrderStatus::Cancelled,
        now,
    )
    .await?;
    reject_tx.commit().await?;
    Err(reason)
}

async fn admit_market_order(
    pool: &PgPool,
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    order_id: Uuid,
    user_id: Uuid,
    req: &CreateOrderRequest,
    now: chrono::DateTime<Utc>,
) -> EngineResult<Order> {
    let opposite = req.direction.opposite();
    let resting = book::locked_resting_orders(tx, &req.ticker, opposite).await?;
    let available = super::matching::total_available(&resting);

    if available < req.qty {
        let reason = EngineError::UnfillableMarket(format!(
            "market order for {} {} cannot be fully filled by current liquidity",
            req.qty, req.ticker
        ));
        return reject_market_order(pool, order_id, user_id, req, now, reason).await;
    }

    if req.direction == OrderSide::Buy {
        let fills = plan_fills(req.direction, req.qty, None, &resting);
        let cost: i64 = fills.iter().map(|f| f.qty * f.price).sum();
        let balance = ledger::get(tx, user_id, RUB).await?;
        if balance.free() < cost {
            let reason = EngineError::InsufficientFunds("insufficient free RUB for market buy".to_string());
            return reject_market_order(pool, order_id, user_id, req, now, reason).await;
        }
    } else {
        let balance = ledger::get(tx, user_id, &req.ticker).await?;
        if balance.free() < req.qty {
            let reason =
                EngineError::InsufficientFunds(format!("insufficient free {} for market sell", req.ticker));
            return reject_market_order(pool, order_id, user_id, req, now, reason).await;
        }
    }

    book::insert_order(
        tx,
        order_id,
        user_id,
        &req.ticker,
        OrderType::Market,
        req.direction,
        req.qty,
        None,
        0,
        crate::models::order::OrderStatus::New,
        now,
    )
    .await?;

    let fills = plan_fills(req.direction, req.qty, None, &resting);
    let mut filled_total = 0i64;
    for fill in &fills {
        let resting_order = &resting[fill.resting_index];
        let (buyer, seller, buy_id, sell_id) = match req.direction {
            OrderSide::Buy => (
                FillSide { user_id, order_type: OrderType::Market },
                FillSide { user_id: resting_order.user_id, order_type: OrderType::Limit },
                order_id,
                resting_order.id,
            ),
            OrderSide::Sell => (
                FillSide { user_id: resting_order.user_id, order_type: OrderType::Limit },
                FillSide { user_id, order_type: OrderType::Market },
                resting_order.id,
                order_id,
            ),
        };

        settle_fill(tx, &req.ticker, buyer, seller, buy_id, sell_id, fill.qty, fill.price).await?;

        let new_resting_filled = resting_order.filled + fill.qty;
        let resting_status = if new_resting_filled >= resting_order.qty {
            crate::models::order::OrderStatus::Executed
        } else {
            crate::models::order::OrderStatus::PartiallyExecuted
        };
        book::update_fill(tx, resting_order.id, new_resting_filled, resting_status).await?;

        filled_total += fill.qty;
    }

    if filled_total != req.qty {
        return Err(EngineError::Consistency(
            "market order did not fill exactly qty after passing the availability pre-check".to_string(),
        ));
    }

    book::update_fill(tx, order_id, filled_total, crate::models::order::OrderStatus::Executed).await?;
    book::fetch_order(tx, order_id).await
}

pub async fn cancel_order(pool: &PgPool, user_id: Uuid, order_id: Uuid) -> EngineResult<Order> {
    let mut last_err = EngineError::Contention;
    for attempt in 0..MAX_ATTEMPTS {
        match try_cancel_order(pool, user_id, order_id).await {
            Ok(order) => return Ok(order),
            Err(e) if e.is_contention() && attempt + 1 < MAX_ATTEMPTS => {
                last_err = e;
                crate::metrics::record_contention_retry();
                tokio::time::sleep(backoff_with_jitter(attempt as usize)).await;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err)
}

async fn try_cancel_order(pool: &PgPool, user_id: Uuid, order_id: Uuid) -> EngineResult<Order> {
    let mut tx = pool.begin().await?;

    let order = book::locked_order(&mut tx, order_id).await?;
    if order.user_id != user_id {
        return Err(EngineError::Forbidden("order belongs to another user".to_string()));
    }
    if order.status.is_terminal() {
        return Err(EngineError::TerminalState(format!("order {order_id} is already terminal")));
    }

    let remaining = order.remaining();
    if order.order_type == OrderType::Limit {
        let price = order.price.ok_or_else(|| {
            EngineError::Consistency("limit order missing price".to_string())
        })?;
        reservation::release_remaining(&mut tx, user_id, &order.ticker, order.side, remaining, price).await?;
    }

    book::update_fill(&mut tx, order_id, order.filled, crate::models::order::OrderStatus::Cancelled).await?;

    let updated = book::fetch_order(&mut tx, order_id).await?;
    tx.commit().await?;
    Ok(updated)
}
