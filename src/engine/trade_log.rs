//! Append-only trade log reads. Inserts happen inline in `settlement.rs` as
//! part of the settling transaction; this module only serves queries.

use sqlx::PgPool;

use crate::models::trade::{Trade, TradeHistoryQuery};

use super::error::EngineResult;

pub async fn trades_for_ticker(pool: &PgPool, query: &TradeHistoryQuery) -> EngineResult<Vec<Trade>> {
    let trades: Vec<Trade> = sqlx::query_as(
        r#"
        SELECT id, ticker, buy_order_id, sell_order_id, amount, price, created_at
        FROM trades
        WHERE ticker = $1
        ORDER BY created_at ASC
        LIMIT $2
        "#,
    )
    .bind(&query.ticker)
    .bind(query.get_limit())
    .fetch_all(pool)
    .await?;

    Ok(trades)
}
