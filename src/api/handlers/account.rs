//! Balance read handler: `GET /api/v1/balance` returns the caller's
//! non-zero ticker -> amount mapping.

use axum::{Extension, Json};
use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::engine::read;
use crate::utils::AppError;
use crate::AppState;

pub async fn get_balances(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<HashMap<String, i64>>, AppError> {
    let rows = read::balances_for_user(&state.db, auth_user.user_id).await?;
    Ok(Json(rows.into_iter().collect()))
}
