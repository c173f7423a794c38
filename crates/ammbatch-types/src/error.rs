//! Error types for the ammbatch engine.
//!
//! All errors use the `AB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Request / input errors (recoverable, rejected before a batch)
//! - 2xx: Arithmetic errors
//! - 3xx: Batch state errors
//! - 5xx: Matching invariant violations (fatal)
//! - 6xx: Settlement errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{BatchIndex, MsgIndex, PoolId};

/// Central error enum for all ammbatch operations.
#[derive(Debug, Error)]
pub enum AmmbatchError {
    // =================================================================
    // Request Errors (1xx)
    // =================================================================
    /// The request failed basic validation.
    #[error("AB_ERR_100: Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// A coin denomination is not one of the pool's reserve coins.
    #[error("AB_ERR_101: Invalid denomination: {denom}")]
    InvalidDenom { denom: String },

    /// The offered or deposited amount is zero or negative.
    #[error("AB_ERR_102: Amount must be a positive integer, got {amount}")]
    BadOfferAmount { amount: Decimal },

    /// The order price is zero or negative.
    #[error("AB_ERR_103: Order price must be positive, got {price}")]
    BadOrderPrice { price: Decimal },

    /// The offer is smaller than the configured minimum.
    #[error("AB_ERR_104: Offer amount {amount} is less than the minimum {min}")]
    LessThanMinOfferAmount { amount: Decimal, min: Decimal },

    /// The offer exceeds the maximum order-to-reserve ratio.
    #[error("AB_ERR_105: Offer amount {amount} exceeds the maximum orderable {max}")]
    ExceededMaxOrderable { amount: Decimal, max: Decimal },

    /// The offer fee has the wrong denomination or amount.
    #[error("AB_ERR_106: Bad offer coin fee: expected {expected}, got {actual}")]
    BadOfferCoinFee { expected: String, actual: String },

    /// The offer/demand pair does not match the pool's reserve pair.
    #[error("AB_ERR_107: Denomination pair does not match the pool reserves")]
    NotMatchedReserveCoin,

    /// No pool with this id exists.
    #[error("AB_ERR_108: Pool not found: {0}")]
    PoolNotFound(PoolId),

    /// A pool with the same reserve pair already exists.
    #[error("AB_ERR_109: Pool already exists for {denom_x}/{denom_y}")]
    PoolAlreadyExists { denom_x: String, denom_y: String },

    /// The pool has no reserves or no pool coin supply.
    #[error("AB_ERR_110: Pool is depleted: {0}")]
    DepletedPool(PoolId),

    /// The circuit breaker rejects new pools, deposits, and swaps.
    #[error("AB_ERR_111: Circuit breaker is enabled")]
    CircuitBreakerEnabled,

    /// An initial deposit is below the configured minimum.
    #[error("AB_ERR_112: Initial deposit {amount} is less than the minimum {min}")]
    LessThanMinInitDeposit { amount: Decimal, min: Decimal },

    /// A deposit would push a reserve above the configured cap.
    #[error("AB_ERR_113: Reserve coin limit {limit} exceeded")]
    ExceededReserveCoinLimit { limit: Decimal },

    /// The pool coin amount of a withdrawal is invalid.
    #[error("AB_ERR_114: Bad pool coin amount: {reason}")]
    BadPoolCoinAmount { reason: String },

    // =================================================================
    // Arithmetic Errors (2xx)
    // =================================================================
    /// A checked multiply/divide round trip overflowed.
    #[error("AB_ERR_200: Arithmetic overflow in {operation}")]
    Overflow { operation: String },

    /// Division by zero.
    #[error("AB_ERR_201: Division by zero in {operation}")]
    DivisionByZero { operation: String },

    // =================================================================
    // Batch State Errors (3xx)
    // =================================================================
    /// A batch counter does not agree with its stored queue.
    #[error(
        "AB_ERR_300: Bad batch msg index for pool {pool_id} {queue} queue: expected {expected}, got {actual}"
    )]
    BadBatchMsgIndex {
        pool_id: PoolId,
        queue: &'static str,
        expected: MsgIndex,
        actual: MsgIndex,
    },

    /// The request was already executed in this batch.
    #[error("AB_ERR_301: Message already executed: {0}")]
    MsgAlreadyExecuted(MsgIndex),

    /// A stored record is malformed.
    #[error("AB_ERR_302: Invalid pool record: {reason}")]
    InvalidPoolRecord { reason: String },

    // =================================================================
    // Matching Invariant Violations (5xx, fatal)
    // =================================================================
    /// A matching-logic invariant broke. Batch processing must abort.
    #[error("AB_ERR_500: Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    /// The post-settlement order book is crossed or deviates too far.
    #[error(
        "AB_ERR_501: Order book invalid at price {price}: max buy {max_buy}, min sell {min_sell:?}"
    )]
    OrderBookInvalidity {
        price: Decimal,
        max_buy: Decimal,
        min_sell: Option<Decimal>,
    },

    /// Replayed matching produced a different result.
    #[error("AB_ERR_502: Determinism violation: expected {expected}, got {actual}")]
    DeterminismViolation { expected: String, actual: String },

    // =================================================================
    // Settlement Errors (6xx)
    // =================================================================
    /// This pool batch has already been settled (idempotency guard).
    #[error("AB_ERR_600: Batch already settled: {pool_id} batch {batch_index}")]
    BatchAlreadySettled {
        pool_id: PoolId,
        batch_index: BatchIndex,
    },

    /// Escrow balances disagree with the pending requests.
    #[error("AB_ERR_601: Escrow invariant violation: {reason}")]
    EscrowInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("AB_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("AB_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (out-of-range parameter, etc.).
    #[error("AB_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl AmmbatchError {
    /// Shorthand for [`AmmbatchError::InvariantViolation`].
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`AmmbatchError::Overflow`].
    pub fn overflow(operation: impl Into<String>) -> Self {
        Self::Overflow {
            operation: operation.into(),
        }
    }

    /// Whether this error signals corrupted engine state.
    ///
    /// Fatal errors must abort the batch: the caller may not persist any
    /// partial result of the batch that produced them.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvariantViolation { .. }
                | Self::OrderBookInvalidity { .. }
                | Self::DeterminismViolation { .. }
                | Self::EscrowInvariantViolation { .. }
        )
    }

    /// Whether this error rejects a caller's request (1xx).
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. }
                | Self::InvalidDenom { .. }
                | Self::BadOfferAmount { .. }
                | Self::BadOrderPrice { .. }
                | Self::LessThanMinOfferAmount { .. }
                | Self::ExceededMaxOrderable { .. }
                | Self::BadOfferCoinFee { .. }
                | Self::NotMatchedReserveCoin
                | Self::PoolNotFound(_)
                | Self::PoolAlreadyExists { .. }
                | Self::DepletedPool(_)
                | Self::CircuitBreakerEnabled
                | Self::LessThanMinInitDeposit { .. }
                | Self::ExceededReserveCoinLimit { .. }
                | Self::BadPoolCoinAmount { .. }
        )
    }

    /// Whether this error is an arithmetic overflow.
    #[must_use]
    pub fn is_overflow(&self) -> bool {
        matches!(self, Self::Overflow { .. })
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, AmmbatchError>;

impl From<serde_json::Error> for AmmbatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
