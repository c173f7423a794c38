//! Values returned by the batch hooks: transfers and settlement events.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, BatchIndex, Coin, Height, MatchType, PoolId, PriceDirection};

/// Holder of a balance moved by settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Account {
    /// Engine-wide escrow holding queued offers, fees, and pool coins.
    Escrow,
    /// Reserve account of a pool.
    Reserve(PoolId),
    User(AccountId),
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Escrow => write!(f, "escrow"),
            Self::Reserve(id) => write!(f, "reserve/{id}"),
            Self::User(id) => write!(f, "user/{id}"),
        }
    }
}

/// What a transfer does with its coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferKind {
    /// Move between two accounts.
    Move,
    /// Pool coins created for `to`.
    Mint,
    /// Pool coins destroyed from `from`.
    Burn,
}

/// One balance movement the caller must apply to its ledger.
///
/// For `Mint` only `to` is meaningful, for `Burn` only `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub kind: TransferKind,
    pub from: Account,
    pub to: Account,
    pub coin: Coin,
}

impl Transfer {
    #[must_use]
    pub fn new(from: Account, to: Account, coin: Coin) -> Self {
        Self {
            kind: TransferKind::Move,
            from,
            to,
            coin,
        }
    }

    /// Pool coins created for `to`.
    #[must_use]
    pub fn mint(to: Account, coin: Coin) -> Self {
        Self {
            kind: TransferKind::Mint,
            from: Account::Escrow,
            to,
            coin,
        }
    }

    /// Pool coins destroyed from `from`.
    #[must_use]
    pub fn burn(from: Account, coin: Coin) -> Self {
        Self {
            kind: TransferKind::Burn,
            from,
            to: Account::Escrow,
            coin,
        }
    }
}

/// Summary of one settled pool batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementEvent {
    pub pool_id: PoolId,
    pub batch_index: BatchIndex,
    pub height: Height,
    pub match_type: MatchType,
    pub price_direction: PriceDirection,
    pub clearing_price: Decimal,
    /// Total X offered by filled buys.
    pub transacted_x: Decimal,
    /// Total Y offered by filled sells.
    pub transacted_y: Decimal,
    pub matched_swaps: usize,
    pub refunded_swaps: usize,
    pub deposits: usize,
    pub withdrawals: usize,
    /// Hex SHA-256 over the ordered match results.
    pub match_root: String,
}
