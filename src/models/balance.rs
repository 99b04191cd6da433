#![allow(dead_code)]
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single `(user, ticker)` balance row. `amount` and `reserved` are whole
/// units; `reserved` never exceeds `amount`. Created lazily on first credit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Balance {
    pub user_id: Uuid,
    pub ticker: String,
    pub amount: i64,
    pub reserved: i64,
}

impl Balance {
    pub fn free(&self) -> i64 {
        self.amount - self.reserved
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BalanceResponse {
    pub amount: i64,
}

#[derive(Debug, Deserialize, validator::Validate)]
pub struct AdminBalanceRequest {
    pub user_id: Uuid,
    #[validate(length(min = 2, max = 10))]
    pub ticker: String,
    #[validate(range(min = 1))]
    pub amount: i64,
}
