//! Prometheus-compatible metrics for the order/balance engine:
//! - API request metrics (latency, count)
//! - Engine metrics (orders submitted/matched/cancelled, trades, contention retries)
//! - Database metrics (query latency)

#![allow(dead_code)]

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Metric names as constants for consistency
pub mod names {
    // API Metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "http_requests_in_flight";

    // Engine Metrics
    pub const ORDERS_SUBMITTED_TOTAL: &str = "orders_submitted_total";
    pub const ORDERS_REJECTED_TOTAL: &str = "orders_rejected_total";
    pub const ORDERS_CANCELLED_TOTAL: &str = "orders_cancelled_total";
    pub const TRADES_EXECUTED_TOTAL: &str = "trades_executed_total";
    pub const TRADE_VOLUME_RUB: &str = "trade_volume_rub";
    pub const CONTENTION_RETRIES_TOTAL: &str = "contention_retries_total";
    pub const ORDER_COMMIT_DURATION_SECONDS: &str = "order_commit_duration_seconds";
    pub const ORDERBOOK_DEPTH: &str = "orderbook_depth";

    // Database Metrics
    pub const DB_QUERY_DURATION_SECONDS: &str = "db_query_duration_seconds";
    pub const DB_CONNECTIONS_ACTIVE: &str = "db_connections_active";
    pub const DB_CONNECTIONS_IDLE: &str = "db_connections_idle";
}

/// Label keys
pub mod labels {
    pub const METHOD: &str = "method";
    pub const ENDPOINT: &str = "endpoint";
    pub const STATUS: &str = "status";
    pub const ORDER_SIDE: &str = "side";
    pub const ORDER_TYPE: &str = "order_type";
    pub const TICKER: &str = "ticker";
}

/// Initializes the Prometheus metrics exporter. Returns a handle that can
/// be rendered behind a `/metrics` endpoint.
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(names::HTTP_REQUEST_DURATION_SECONDS.to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        )
        .unwrap()
        .set_buckets_for_metric(
            Matcher::Full(names::ORDER_COMMIT_DURATION_SECONDS.to_string()),
            &[0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5],
        )
        .unwrap()
        .set_buckets_for_metric(
            Matcher::Full(names::DB_QUERY_DURATION_SECONDS.to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0],
        )
        .unwrap();

    builder.install_recorder().expect("failed to install Prometheus recorder")
}

// ============================================================================
// HTTP Metrics
// ============================================================================

pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    counter!(
        names::HTTP_REQUESTS_TOTAL,
        labels::METHOD => method.to_string(),
        labels::ENDPOINT => endpoint.to_string(),
        labels::STATUS => status_str.clone()
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        labels::METHOD => method.to_string(),
        labels::ENDPOINT => endpoint.to_string(),
        labels::STATUS => status_str
    )
    .record(duration_secs);
}

pub fn set_http_requests_in_flight(count: i64) {
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).set(count as f64);
}

// ============================================================================
// Engine Metrics
// ============================================================================

pub fn record_order_submitted(side: &str, order_type: &str) {
    counter!(
        names::ORDERS_SUBMITTED_TOTAL,
        labels::ORDER_SIDE => side.to_string(),
        labels::ORDER_TYPE => order_type.to_string()
    )
    .increment(1);
}

pub fn record_order_rejected(reason: &str) {
    counter!(names::ORDERS_REJECTED_TOTAL, "reason" => reason.to_string()).increment(1);
}

pub fn record_order_cancelled() {
    counter!(names::ORDERS_CANCELLED_TOTAL).increment(1);
}

pub fn record_trade_executed(ticker: &str, qty: i64, price: i64) {
    counter!(names::TRADES_EXECUTED_TOTAL, labels::TICKER => ticker.to_string()).increment(1);
    counter!(names::TRADE_VOLUME_RUB).increment((qty * price) as u64);
}

pub fn record_contention_retry() {
    counter!(names::CONTENTION_RETRIES_TOTAL).increment(1);
}

pub fn record_order_commit_duration(duration_secs: f64) {
    histogram!(names::ORDER_COMMIT_DURATION_SECONDS).record(duration_secs);
}

pub fn set_orderbook_depth(ticker: &str, side: &str, depth: i64) {
    gauge!(
        names::ORDERBOOK_DEPTH,
        labels::TICKER => ticker.to_string(),
        labels::ORDER_SIDE => side.to_string()
    )
    .set(depth as f64);
}

// ============================================================================
// Database Metrics
// ============================================================================

pub fn record_db_query(query_type: &str, duration_secs: f64) {
    histogram!(names::DB_QUERY_DURATION_SECONDS, "query_type" => query_type.to_string()).record(duration_secs);
}

pub fn set_db_connections(active: i64, idle: i64) {
    gauge!(names::DB_CONNECTIONS_ACTIVE).set(active as f64);
    gauge!(names::DB_CONNECTIONS_IDLE).set(idle as f64);
}
