//! Balance ledger: per-`(user_id, ticker)` rows holding `amount` and
//! `reserved`. Every operation here runs against an already-open
//! transaction; the ledger never opens or commits one itself.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy)]
pub struct BalanceRow {
    pub amount: i64,
    pub reserved: i64,
}

impl BalanceRow {
    pub fn free(&self) -> i64 {
        self.amount - self.reserved
    }
}

/// Increases `amount` by `n`, creating the row (with `reserved = 0`) if it
/// doesn't exist yet.
pub async fn credit(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    ticker: &str,
    n: i64,
) -> EngineResult<()> {
    sqlx::query(
        r#"
        INSERT INTO balances (user_id, ticker, amount, reserved)
        VALUES ($1, $2, $3, 0)
        ON CONFLICT (user_id, ticker) DO UPDATE SET amount = balances.amount + $3
        "#,
    )
    .bind(user_id)
    .bind(ticker)
    .bind(n)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Decreases `amount` by `n`. Does not consult `reserved` — callers must
/// check free funds themselves. Fails with `InsufficientFunds` if the row
/// is missing or `amount < n`.
pub async fn debit(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    ticker: &str,
    n: i64,
) -> EngineResult<()> {
    let updated = sqlx::query(
        r#"
        UPDATE balances SET amount = amount - $3
        WHERE user_id = $1 AND ticker = $2 AND amount >= $3
        "#,
    )
    .bind(user_id)
    .bind(ticker)
    .bind(n)
    .execute(&mut **tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(EngineError::InsufficientFunds(format!(
            "insufficient {} balance for user {}",
            ticker, user_id
        )));
    }
    Ok(())
}

/// Increases `reserved` by `n`. Fails with `InsufficientFunds` when free
/// funds (`amount - reserved`) are below `n`.
pub async fn reserve(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    ticker: &str,
    n: i64,
) -> EngineResult<()> {
    let updated = sqlx::query(
        r#"
        UPDATE balances SET reserved = reserved + $3
        WHERE user_id = $1 AND ticker = $2 AND amount - reserved >= $3
        "#,
    )
    .bind(user_id)
    .bind(ticker)
    .bind(n)
    .execute(&mut **tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(EngineError::InsufficientFunds(format!(
            "insufficient free {} balance for user {}",
            ticker, user_id
        )));
    }
    Ok(())
}

/// Decreases `reserved` by `min(n, reserved)`. Never fails.
pub async fn release(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    ticker: &str,
    n: i64,
) -> EngineResult<()> {
    sqlx::query(
        r#"
        UPDATE balances SET reserved = GREATEST(reserved - $3, 0)
        WHERE user_id = $1 AND ticker = $2
        "#,
    )
    .bind(user_id)
    .bind(ticker)
    .bind(n)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Fetches the current free/reserved state of one balance row without
/// locking it, creating it implicitly as all-zero if it doesn't exist.
pub async fn get(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    ticker: &str,
) -> EngineResult<BalanceRow> {
    let row: Option<(i64, i64)> =
        sqlx::query_as("SELECT amount, reserved FROM balances WHERE user_id = $1 AND ticker = $2")
            .bind(user_id)
            .bind(ticker)
            .fetch_optional(&mut **tx)
            .await?;

    Ok(match row {
        Some((amount, reserved)) => BalanceRow { amount, reserved },
        None => BalanceRow { amount: 0, reserved: 0 },
    })
}

/// Acquires row-level locks (`SELECT ... FOR UPDATE NOWAIT`) on every
/// `(user_id, ticker)` pair, after sorting the pairs canonically so that
/// any two callers contending for an overlapping set of rows always
/// acquire them in the same order. Missing rows are treated as `(0, 0)`
/// and are not materialized by this call; `credit`/`reserve` create them
/// as needed.
///
/// Returns `Contention` if any row is already locked by another
/// transaction.
pub async fn lock_many(
    tx: &mut Transaction<'_, Postgres>,
    specs: &[(Uuid, String)],
) -> EngineResult<Vec<(Uuid, String, BalanceRow)>> {
    let mut sorted: Vec<(Uuid, String)> = specs.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    sorted.dedup();

    let mut out = Vec::with_capacity(sorted.len());
    for (user_id, ticker) in sorted {
        let row: Option<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT amount, reserved FROM balances
            WHERE user_id = $1 AND ticker = $2
            FOR UPDATE NOWAIT
            "#,
        )
        .bind(user_id)
        .bind(&ticker)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            if is_lock_not_available(&e) {
                EngineError::Contention
            } else {
                EngineError::Database(e)
            }
        })?;

        let balance = match row {
            Some((amount, reserved)) => BalanceRow { amount, reserved },
            None => {
                // Materialize the row under lock so a concurrent locker
                // can't race us to the insert.
                sqlx::query(
                    r#"
                    INSERT INTO balances (user_id, ticker, amount, reserved)
                    VALUES ($1, $2, 0, 0)
                    ON CONFLICT (user_id, ticker) DO NOTHING
                    "#,
                )
                .bind(user_id)
                .bind(&ticker)
                .execute(&mut **tx)
                .await?;
                BalanceRow { amount: 0, reserved: 0 }
            }
        };

        out.push((user_id, ticker, balance));
    }

    Ok(out)
}

fn is_lock_not_available(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(e) if e.code().as_deref() == Some("55P03"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_is_amount_minus_reserved() {
        let row = BalanceRow { amount: 100, reserved: 40 };
        assert_eq!(row.free(), 60);
    }

    #[test]
    fn lock_spec_sort_is_canonical_and_deduped() {
        let a = Uuid::nil();
        let b = Uuid::max();
        let mut specs = vec![
            (b, "X".to_string()),
            (a, "RUB".to_string()),
            (a, "RUB".to_string()),
        ];
        specs.sort_by(|l, r| l.0.cmp(&r.0).then_with(|| l.1.cmp(&r.1)));
        specs.dedup();
        assert_eq!(specs, vec![(a, "RUB".to_string()), (b, "X".to_string())]);
    }
}
