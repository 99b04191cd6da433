//! The order and balance transaction engine: the coupled subsystem that
//! reserves funds, matches orders under price-time priority, settles
//! fills under a consistent lock order, and releases reservations on
//! partial fills, completion, and cancellation.
//!
//! Every mutating entry point (`gateway::create_order`,
//! `gateway::cancel_order`) runs as one Postgres transaction: admission,
//! reservation, matching, and settlement commit together or not at all.

pub mod book;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod matching;
pub mod read;
pub mod reservation;
pub mod settlement;
pub mod trade_log;

pub use error::{EngineError, EngineResult};
