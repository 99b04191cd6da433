//! Persistent orderbook index: the set of open LIMIT orders for an
//! instrument, queried and locked directly against the `orders` table.
//! There is no in-memory structure — every read that feeds the matching
//! walk holds a `FOR UPDATE` lock for the duration of the transaction.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::models::order::{Order, OrderSide, OrderStatus, OrderType};

use super::error::{EngineError, EngineResult};

/// Open resting LIMIT orders on `ticker`'s opposite side to `aggressor_side`,
/// locked `FOR UPDATE` and returned in priority order:
/// BUY book: `price DESC, created_at ASC`; SELL book: `price ASC, created_at ASC`.
pub async fn locked_resting_orders(
    tx: &mut Transaction<'_, Postgres>,
    ticker: &str,
    opposite_side: OrderSide,
) -> EngineResult<Vec<Order>> {
    let order_by = match opposite_side {
        OrderSide::Buy => "price DESC, created_at ASC, id ASC",
        OrderSide::Sell => "price ASC, created_at ASC, id ASC",
    };

    let query = format!(
        r#"
        SELECT id, user_id, ticker, order_type, side, qty, price, filled, status, created_at
        FROM orders
        WHERE ticker = $1
          AND side = $2
          AND order_type = 'limit'
          AND status IN ('new', 'partially_executed')
          AND filled < qty
        ORDER BY {order_by}
        FOR UPDATE
        "#
    );

    let orders: Vec<Order> = sqlx::query_as(&query)
        .bind(ticker)
        .bind(opposite_side)
        .fetch_all(&mut **tx)
        .await?;

    Ok(orders)
}

pub async fn insert_order(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    user_id: Uuid,
    ticker: &str,
    order_type: OrderType,
    side: OrderSide,
    qty: i64,
    price: Option<i64>,
    filled: i64,
    status: OrderStatus,
    created_at: DateTime<Utc>,
) -> EngineResult<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (id, user_id, ticker, order_type, side, qty, price, filled, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(ticker)
    .bind(order_type)
    .bind(side)
    .bind(qty)
    .bind(price)
    .bind(filled)
    .bind(status)
    .bind(created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn update_fill(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    filled: i64,
    status: OrderStatus,
) -> EngineResult<()> {
    sqlx::query("UPDATE orders SET filled = $2, status = $3 WHERE id = $1")
        .bind(id)
        .bind(filled)
        .bind(status)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn locked_order(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> EngineResult<Order> {
    let order: Option<Order> = sqlx::query_as(
        r#"
        SELECT id, user_id, ticker, order_type, side, qty, price, filled, status, created_at
        FROM orders WHERE id = $1
        FOR UPDATE NOWAIT
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| {
        if matches!(&e, sqlx::Error::Database(d) if d.code().as_deref() == Some("55P03")) {
            EngineError::Contention
        } else {
            EngineError::Database(e)
        }
    })?;

    order.ok_or_else(|| EngineError::NotFound(format!("order {id} not found")))
}

pub async fn fetch_order(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> EngineResult<Order> {
    let order: Option<Order> = sqlx::query_as(
        r#"
        SELECT id, user_id, ticker, order_type, side, qty, price, filled, status, created_at
        FROM orders WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    order.ok_or_else(|| EngineError::NotFound(format!("order {id} not found")))
}
