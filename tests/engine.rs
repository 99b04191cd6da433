//! End-to-end tests against a real Postgres instance, covering the core
//! order/balance engine scenarios. Each test gets its own freshly
//! migrated database via `sqlx::test`.

use rub_exchange_engine::engine::{gateway, ledger, read};
use rub_exchange_engine::models::order::{OrderSide, OrderStatus};
use sqlx::PgPool;
use uuid::Uuid;

async fn make_user(pool: &PgPool, label: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, username, api_key_hash, is_admin) VALUES ($1, $2, $3, false)")
        .bind(id)
        .bind(format!("{label}-{id}"))
        .bind(format!("hash-{id}"))
        .execute(pool)
        .await
        .unwrap();
    id
}

async fn make_instrument(pool: &PgPool, ticker: &str) {
    sqlx::query("INSERT INTO instruments (ticker, name) VALUES ($1, $2)")
        .bind(ticker)
        .bind(format!("{ticker} Inc"))
        .execute(pool)
        .await
        .unwrap();
}

async fn credit(pool: &PgPool, user_id: Uuid, ticker: &str, amount: i64) {
    let mut tx = pool.begin().await.unwrap();
    ledger::credit(&mut tx, user_id, ticker, amount).await.unwrap();
    tx.commit().await.unwrap();
}

fn order_req(
    direction: OrderSide,
    ticker: &str,
    qty: i64,
    price: Option<i64>,
) -> rub_exchange_engine::models::order::CreateOrderRequest {
    rub_exchange_engine::models::order::CreateOrderRequest {
        direction,
        ticker: ticker.to_string(),
        qty,
        price,
    }
}

#[sqlx::test]
async fn simple_limit_cross(pool: PgPool) {
    make_instrument(&pool, "ACME").await;
    let seller = make_user(&pool, "seller").await;
    let buyer = make_user(&pool, "buyer").await;
    credit(&pool, seller, "ACME", 10).await;
    credit(&pool, buyer, "RUB", 1_000).await;

    let resting = gateway::create_order(&pool, seller, order_req(OrderSide::Sell, "ACME", 10, Some(100)))
        .await
        .unwrap();
    assert_eq!(resting.status, OrderStatus::New);

    let aggressor = gateway::create_order(&pool, buyer, order_req(OrderSide::Buy, "ACME", 10, Some(100)))
        .await
        .unwrap();
    assert_eq!(aggressor.status, OrderStatus::Executed);
    assert_eq!(aggressor.filled, 10);

    let resting_after = read::order_for_user(&pool, seller, resting.id).await.unwrap();
    assert_eq!(resting_after.status, OrderStatus::Executed);
    assert_eq!(resting_after.filled, 10);

    let seller_rub = ledger::get(&mut pool.begin().await.unwrap(), seller, "RUB").await.unwrap();
    assert_eq!(seller_rub.amount, 1_000);
    let buyer_acme = ledger::get(&mut pool.begin().await.unwrap(), buyer, "ACME").await.unwrap();
    assert_eq!(buyer_acme.amount, 10);
}

#[sqlx::test]
async fn partial_fill_leaves_residual_resting(pool: PgPool) {
    make_instrument(&pool, "ACME").await;
    let seller = make_user(&pool, "seller").await;
    let buyer = make_user(&pool, "buyer").await;
    credit(&pool, seller, "ACME", 10).await;
    credit(&pool, buyer, "RUB", 1_000).await;

    let resting = gateway::create_order(&pool, seller, order_req(OrderSide::Sell, "ACME", 10, Some(100)))
        .await
        .unwrap();

    let aggressor = gateway::create_order(&pool, buyer, order_req(OrderSide::Buy, "ACME", 4, Some(100)))
        .await
        .unwrap();
    assert_eq!(aggressor.status, OrderStatus::Executed);
    assert_eq!(aggressor.filled, 4);

    let resting_after = read::order_for_user(&pool, seller, resting.id).await.unwrap();
    assert_eq!(resting_after.status, OrderStatus::PartiallyExecuted);
    assert_eq!(resting_after.filled, 4);
    assert_eq!(resting_after.remaining(), 6);
}

#[sqlx::test]
async fn price_time_priority_among_two_resting_sells(pool: PgPool) {
    make_instrument(&pool, "ACME").await;
    let seller_a = make_user(&pool, "seller_a").await;
    let seller_b = make_user(&pool, "seller_b").await;
    let buyer = make_user(&pool, "buyer").await;
    credit(&pool, seller_a, "ACME", 5).await;
    credit(&pool, seller_b, "ACME", 5).await;
    credit(&pool, buyer, "RUB", 1_000).await;

    let first = gateway::create_order(&pool, seller_a, order_req(OrderSide::Sell, "ACME", 5, Some(100)))
        .await
        .unwrap();
    let second = gateway::create_order(&pool, seller_b, order_req(OrderSide::Sell, "ACME", 5, Some(100)))
        .await
        .unwrap();

    gateway::create_order(&pool, buyer, order_req(OrderSide::Buy, "ACME", 7, Some(100)))
        .await
        .unwrap();

    let first_after = read::order_for_user(&pool, seller_a, first.id).await.unwrap();
    let second_after = read::order_for_user(&pool, seller_b, second.id).await.unwrap();
    assert_eq!(first_after.status, OrderStatus::Executed);
    assert_eq!(first_after.filled, 5);
    assert_eq!(second_after.status, OrderStatus::PartiallyExecuted);
    assert_eq!(second_after.filled, 2);
}

#[sqlx::test]
async fn market_order_rejected_when_book_cannot_cover_it(pool: PgPool) {
    make_instrument(&pool, "ACME").await;
    let seller = make_user(&pool, "seller").await;
    let buyer = make_user(&pool, "buyer").await;
    credit(&pool, seller, "ACME", 3).await;
    credit(&pool, buyer, "RUB", 1_000).await;

    gateway::create_order(&pool, seller, order_req(OrderSide::Sell, "ACME", 3, Some(100)))
        .await
        .unwrap();

    let err = gateway::create_order(&pool, buyer, order_req(OrderSide::Buy, "ACME", 10, None))
        .await
        .unwrap_err();
    assert!(matches!(err, rub_exchange_engine::engine::EngineError::UnfillableMarket(_)));

    let buyer_rub = ledger::get(&mut pool.begin().await.unwrap(), buyer, "RUB").await.unwrap();
    assert_eq!(buyer_rub.amount, 1_000);
    assert_eq!(buyer_rub.reserved, 0);
}

#[sqlx::test]
async fn cancel_releases_reserved_funds(pool: PgPool) {
    make_instrument(&pool, "ACME").await;
    let buyer = make_user(&pool, "buyer").await;
    credit(&pool, buyer, "RUB", 1_000).await;

    let order = gateway::create_order(&pool, buyer, order_req(OrderSide::Buy, "ACME", 5, Some(100)))
        .await
        .unwrap();

    let pre_cancel = ledger::get(&mut pool.begin().await.unwrap(), buyer, "RUB").await.unwrap();
    assert_eq!(pre_cancel.reserved, 500);

    let cancelled = gateway::cancel_order(&pool, buyer, order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let post_cancel = ledger::get(&mut pool.begin().await.unwrap(), buyer, "RUB").await.unwrap();
    assert_eq!(post_cancel.reserved, 0);
    assert_eq!(post_cancel.amount, 1_000);

    let second_cancel = gateway::cancel_order(&pool, buyer, order.id).await.unwrap_err();
    assert!(matches!(second_cancel, rub_exchange_engine::engine::EngineError::TerminalState(_)));
}

#[sqlx::test]
async fn concurrent_crossing_orders_do_not_deadlock(pool: PgPool) {
    make_instrument(&pool, "ACME").await;
    make_instrument(&pool, "BETA").await;
    let user_x = make_user(&pool, "x").await;
    let user_y = make_user(&pool, "y").await;
    credit(&pool, user_x, "ACME", 10).await;
    credit(&pool, user_x, "RUB", 1_000).await;
    credit(&pool, user_y, "BETA", 10).await;
    credit(&pool, user_y, "RUB", 1_000).await;

    // x sells ACME / buys BETA while y buys ACME / sells BETA, concurrently,
    // touching overlapping (user, ticker) balance rows in opposite textual
    // orders. The canonical lock order in `ledger::lock_many` must prevent
    // a deadlock between the two settling transactions.
    gateway::create_order(&pool, user_y, order_req(OrderSide::Sell, "BETA", 10, Some(50)))
        .await
        .unwrap();
    gateway::create_order(&pool, user_x, order_req(OrderSide::Sell, "ACME", 10, Some(50)))
        .await
        .unwrap();

    let (acme_fill, beta_fill) = tokio::join!(
        gateway::create_order(&pool, user_y, order_req(OrderSide::Buy, "ACME", 10, Some(50))),
        gateway::create_order(&pool, user_x, order_req(OrderSide::Buy, "BETA", 10, Some(50))),
    );

    assert_eq!(acme_fill.unwrap().status, OrderStatus::Executed);
    assert_eq!(beta_fill.unwrap().status, OrderStatus::Executed);
}
