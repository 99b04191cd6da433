//! Trade settler: turns one fill into the four-legged balance mutation
//! plus a trade record, all inside the caller's open transaction.

use chrono::Utc;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::models::instrument::RUB;
use crate::models::order::OrderType;

use super::error::{EngineError, EngineResult};
use super::{ledger, reservation};

/// One side of a fill, enough to know whose reservation (if any) to
/// release against it.
#[derive(Debug, Clone, Copy)]
pub struct FillSide {
    pub user_id: Uuid,
    pub order_type: OrderType,
}

/// Settles a single fill: locks the four balance rows in canonical order,
/// checks the pre-conditions the reservation system should already
/// guarantee, mutates all four legs, releases reservations on the filled
/// increment, and appends a trade record.
///
/// A precondition failure here (buyer lacks RUB, seller lacks the asset)
/// is a `Consistency` error — under correct admission and reservation
/// logic it can never happen.
pub async fn settle_fill(
    tx: &mut Transaction<'_, Postgres>,
    ticker: &str,
    buyer: FillSide,
    seller: FillSide,
    buy_order_id: Uuid,
    sell_order_id: Uuid,
    qty: i64,
    price: i64,
) -> EngineResult<Uuid> {
    let rub = qty
        .checked_mul(price)
        .ok_or_else(|| EngineError::Consistency("fill notional overflowed i64".to_string()))?;

    let specs = vec![
        (buyer.user_id, RUB.to_string()),
        (seller.user_id, RUB.to_string()),
        (buyer.user_id, ticker.to_string()),
        (seller.user_id, ticker.to_string()),
    ];
    let locked = ledger::lock_many(tx, &specs).await?;

    let row_of = |uid: Uuid, tkr: &str| -> EngineResult<ledger::BalanceRow> {
        locked
            .iter()
            .find(|(u, t, _)| *u == uid && t == tkr)
            .map(|(_, _, b)| *b)
            .ok_or_else(|| EngineError::Consistency("locked row missing from lock_many result".to_string()))
    };

    let buyer_rub = row_of(buyer.user_id, RUB)?;
    let seller_asset = row_of(seller.user_id, ticker)?;

    if seller_asset.amount < qty {
        return Err(EngineError::Consistency(format!(
            "seller {} has insufficient {} to settle fill",
            seller.user_id, ticker
        )));
    }
    if buyer_rub.amount < rub {
        return Err(EngineError::Consistency(format!(
            "buyer {} has insufficient RUB to settle fill",
            buyer.user_id
        )));
    }

    ledger::debit(tx, seller.user_id, ticker, qty).await?;
    ledger::credit(tx, buyer.user_id, ticker, qty).await?;
    ledger::debit(tx, buyer.user_id, RUB, rub).await?;
    ledger::credit(tx, seller.user_id, RUB, rub).await?;

    if buyer.order_type == OrderType::Limit {
        reservation::release_on_fill(tx, buyer.user_id, ticker, crate::models::order::OrderSide::Buy, qty, price)
            .await?;
    }
    if seller.order_type == OrderType::Limit {
        reservation::release_on_fill(tx, seller.user_id, ticker, crate::models::order::OrderSide::Sell, qty, price)
            .await?;
    }

    let trade_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO trades (id, ticker, buy_order_id, sell_order_id, amount, price, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(trade_id)
    .bind(ticker)
    .bind(buy_order_id)
    .bind(sell_order_id)
    .bind(qty)
    .bind(price)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(trade_id)
}
