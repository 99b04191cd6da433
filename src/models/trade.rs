use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

mod datetime_as_millis {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(dt.timestamp_millis())
    }
}

/// A single executed fill. Append-only; never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trade {
    pub id: Uuid,
    pub ticker: String,
    pub buy_order_id: Uuid,
    pub sell_order_id: Uuid,
    pub amount: i64,
    pub price: i64,
    #[serde(serialize_with = "datetime_as_millis::serialize")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct TradeHistoryQuery {
    pub ticker: String,
    pub limit: Option<i64>,
}

impl TradeHistoryQuery {
    pub fn get_limit(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(1, 1000)
    }
}
