//! Admin balance deposit/withdraw. Thin over the ledger's `credit`/`debit`
//! primitives — each runs in its own single-statement transaction since
//! there is no matching or settlement involved.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::engine::ledger;
use crate::models::balance::AdminBalanceRequest;
use crate::utils::AppError;
use crate::AppState;

#[derive(serde::Serialize)]
pub struct AdminBalanceResponse {
    pub success: bool,
}

pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminBalanceRequest>,
) -> Result<Json<AdminBalanceResponse>, AppError> {
    if req.amount <= 0 {
        return Err(AppError::validation("amount must be positive"));
    }
    let mut tx = state.db.pool().begin().await.map_err(|e| AppError::internal(&e.to_string()))?;
    ledger::credit(&mut tx, req.user_id, &req.ticker, req.amount).await?;
    tx.commit().await.map_err(|e| AppError::internal(&e.to_string()))?;
    Ok(Json(AdminBalanceResponse { success: true }))
}

pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminBalanceRequest>,
) -> Result<Json<AdminBalanceResponse>, AppError> {
    if req.amount <= 0 {
        return Err(AppError::validation("amount must be positive"));
    }
    let mut tx = state.db.pool().begin().await.map_err(|e| AppError::internal(&e.to_string()))?;
    ledger::debit(&mut tx, req.user_id, &req.ticker, req.amount).await?;
    tx.commit().await.map_err(|e| AppError::internal(&e.to_string()))?;
    Ok(Json(AdminBalanceResponse { success: true }))
}
