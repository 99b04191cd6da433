//! Read-only queries that sit outside the transactional hot path: a
//! user's order history, their balance mapping, and the public
//! price-aggregated orderbook.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::order::Order;

use super::error::EngineResult;

#[derive(Debug, Serialize)]
pub struct OrderbookLevel {
    pub price: i64,
    pub qty: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderbookSnapshot {
    pub bid_levels: Vec<OrderbookLevel>,
    pub ask_levels: Vec<OrderbookLevel>,
}

pub async fn orders_for_user(pool: &PgPool, user_id: Uuid) -> EngineResult<Vec<Order>> {
    let orders: Vec<Order> = sqlx::query_as(
        r#"
        SELECT id, user_id, ticker, order_type, side, qty, price, filled, status, created_at
        FROM orders
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(orders)
}

pub async fn order_for_user(pool: &PgPool, user_id: Uuid, order_id: Uuid) -> EngineResult<Order> {
    let order: Option<Order> = sqlx::query_as(
        r#"
        SELECT id, user_id, ticker, order_type, side, qty, price, filled, status, created_at
        FROM orders WHERE id = $1
        "#,
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await?;

    let order = order.ok_or_else(|| super::error::EngineError::NotFound(format!("order {order_id} not found")))?;
    if order.user_id != user_id {
        return Err(super::error::EngineError::Forbidden("order belongs to another user".to_string()));
    }
    Ok(order)
}

pub async fn balances_for_user(pool: &PgPool, user_id: Uuid) -> EngineResult<Vec<(String, i64)>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT ticker, amount FROM balances WHERE user_id = $1 ORDER BY ticker")
            .bind(user_id)
            .fetch_all(pool)
            .await?;
    Ok(rows)
}

/// Aggregated L2 view of the open book: remaining quantity summed per
/// price level, bids sorted best-first (desc), asks sorted best-first (asc).
pub async fn public_orderbook(pool: &PgPool, ticker: &str, limit: i64) -> EngineResult<OrderbookSnapshot> {
    let bid_levels: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        SELECT price, SUM(qty - filled)::bigint as remaining
        FROM orders
        WHERE ticker = $1 AND side = 'buy' AND order_type = 'limit'
          AND status IN ('new', 'partially_executed')
        GROUP BY price
        ORDER BY price DESC
        LIMIT $2
        "#,
    )
    .bind(ticker)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let ask_levels: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        SELECT price, SUM(qty - filled)::bigint as remaining
        FROM orders
        WHERE ticker = $1 AND side = 'sell' AND order_type = 'limit'
          AND status IN ('new', 'partially_executed')
        GROUP BY price
        ORDER BY price ASC
        LIMIT $2
        "#,
    )
    .bind(ticker)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(OrderbookSnapshot {
        bid_levels: bid_levels.into_iter().map(|(price, qty)| OrderbookLevel { price, qty }).collect(),
        ask_levels: ask_levels.into_iter().map(|(price, qty)| OrderbookLevel { price, qty }).collect(),
    })
}
