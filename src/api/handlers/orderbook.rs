//! Public, unauthenticated read endpoints: aggregated orderbook depth and
//! the trade tape.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::engine::read::{self, OrderbookSnapshot};
use crate::engine::trade_log;
use crate::models::trade::{Trade, TradeHistoryQuery};
use crate::utils::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderbookQuery {
    pub limit: Option<i64>,
}

pub async fn get_orderbook(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(query): Query<OrderbookQuery>,
) -> Result<Json<OrderbookSnapshot>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let snapshot = read::public_orderbook(&state.db, &ticker, limit).await?;
    Ok(Json(snapshot))
}

pub async fn get_trades(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(params): Query<TradesQueryParams>,
) -> Result<Json<Vec<Trade>>, AppError> {
    let trades = trade_log::trades_for_ticker(&state.db, &TradeHistoryQuery { ticker, limit: params.limit }).await?;
    Ok(Json(trades))
}

#[derive(Debug, Deserialize)]
pub struct TradesQueryParams {
    pub limit: Option<i64>,
}
