/// Errors produced by the order/balance transaction engine. Every variant
/// corresponds to one of the engine's error kinds and is mapped to an HTTP
/// status by `crate::utils::AppError`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InsufficientFunds(String),

    #[error("{0}")]
    UnfillableMarket(String),

    #[error("{0}")]
    TerminalState(String),

    /// A row lock could not be acquired without blocking (`NOWAIT`).
    /// Retryable by the gateway with bounded backoff.
    #[error("lock contention")]
    Contention,

    /// An invariant check failed mid-settlement. Always a bug.
    #[error("consistency violation: {0}")]
    Consistency(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl EngineError {
    pub fn is_contention(&self) -> bool {
        matches!(self, EngineError::Contention)
            || matches!(self, EngineError::Database(sqlx::Error::Database(e)) if e.code().as_deref() == Some("55P03"))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
