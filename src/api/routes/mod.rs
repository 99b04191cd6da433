use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::auth::middleware::{auth_middleware, require_admin};
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes: read-only orderbook/trade tape and the instrument list.
    let public_routes = Router::new()
        .route("/public/orderbook/:ticker", get(handlers::orderbook::get_orderbook))
        .route("/public/trades/:ticker", get(handlers::orderbook::get_trades))
        .route("/public/instrument", get(handlers::instrument::list_instruments));

    // User routes: orders and balance, gated by API-key auth.
    let user_routes = Router::new()
        .route("/order", post(handlers::order::create_order))
        .route("/order", get(handlers::order::list_orders))
        .route("/order/:id", get(handlers::order::get_order))
        .route("/order/:id", delete(handlers::order::cancel_order))
        .route("/balance", get(handlers::account::get_balances))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin routes: instrument CRUD and balance deposit/withdraw. Layered
    // with both the auth middleware (resolves the caller) and the admin
    // gate (rejects non-admin callers) in that order.
    let admin_routes = Router::new()
        .route("/admin/balance/deposit", post(handlers::admin_balance::deposit))
        .route("/admin/balance/withdraw", post(handlers::admin_balance::withdraw))
        .route("/admin/instrument", post(handlers::instrument::create_instrument))
        .route("/admin/instrument/:ticker", delete(handlers::instrument::delete_instrument))
        .layer(axum_middleware::from_fn(require_admin))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(public_routes).merge(user_routes).merge(admin_routes)
}
