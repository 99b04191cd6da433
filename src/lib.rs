//! Order and balance transaction engine for a single-currency stock
//! exchange. The binary in `main.rs` wires this library's modules into
//! an `axum` server; `tests/` exercises the engine directly against a
//! real Postgres instance via `sqlx::test`.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod engine;
pub mod metrics;
pub mod models;
pub mod utils;

use crate::config::AppConfig;
use crate::db::Database;

pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
}
