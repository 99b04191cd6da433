#![allow(dead_code)]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const RUB: &str = "RUB";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Instrument {
    pub ticker: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, validator::Validate)]
pub struct CreateInstrumentRequest {
    #[validate(length(min = 2, max = 10))]
    pub ticker: String,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
}

/// `ticker` is required to be uppercase ASCII letters/digits, 2-10 characters long.
pub fn is_valid_ticker(ticker: &str) -> bool {
    let len = ticker.len();
    (2..=10).contains(&len) && ticker.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}
