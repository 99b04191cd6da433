//! Instrument admin CRUD and the public instrument listing. Routine
//! ambient surface around the core engine — ticker registration is a
//! precondition the gateway checks, not part of the matching/settlement
//! hot path.

use axum::{extract::Path, extract::State, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::models::instrument::{is_valid_ticker, CreateInstrumentRequest, Instrument};
use crate::utils::AppError;
use crate::AppState;

pub async fn list_instruments(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Instrument>>, AppError> {
    let instruments: Vec<Instrument> = sqlx::query_as("SELECT ticker, name, created_at FROM instruments ORDER BY ticker")
        .fetch_all(&*state.db)
        .await
        .map_err(|e| AppError::internal(&e.to_string()))?;
    Ok(Json(instruments))
}

#[derive(serde::Serialize)]
pub struct CreateInstrumentApiResponse {
    pub success: bool,
}

pub async fn create_instrument(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateInstrumentRequest>,
) -> Result<Json<Instrument>, AppError> {
    let ticker = req.ticker.to_uppercase();
    if !is_valid_ticker(&ticker) {
        return Err(AppError::validation("ticker must be 2-10 uppercase letters/digits"));
    }

    let instrument = Instrument {
        ticker: ticker.clone(),
        name: req.name,
        created_at: Utc::now(),
    };

    sqlx::query("INSERT INTO instruments (ticker, name, created_at) VALUES ($1, $2, $3)")
        .bind(&instrument.ticker)
        .bind(&instrument.name)
        .bind(instrument.created_at)
        .execute(&*state.db)
        .await
        .map_err(|e| {
            if matches!(&e, sqlx::Error::Database(d) if d.is_unique_violation()) {
                AppError::validation(&format!("instrument {ticker} already exists"))
            } else {
                AppError::internal(&e.to_string())
            }
        })?;

    Ok(Json(instrument))
}

pub async fn delete_instrument(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> Result<Json<CreateInstrumentApiResponse>, AppError> {
    let result = sqlx::query("DELETE FROM instruments WHERE ticker = $1")
        .bind(&ticker)
        .execute(&*state.db)
        .await
        .map_err(|e| AppError::internal(&e.to_string()))?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(&format!("unknown instrument {ticker}")));
    }

    Ok(Json(CreateInstrumentApiResponse { success: true }))
}
