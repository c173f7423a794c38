//! Outcome of matching one pool batch.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MsgIndex, OrderDirection};

/// How the chosen scenario cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    /// Both sides clear fully at the swap price.
    Exact,
    /// Nothing executes this batch.
    No,
    /// One side clears partially.
    Fractional,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "EXACT"),
            Self::No => write!(f, "NO_MATCH"),
            Self::Fractional => write!(f, "FRACTIONAL"),
        }
    }
}

/// Which way the clearing price moves relative to the pool price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceDirection {
    Increasing,
    Decreasing,
    Staying,
}

impl fmt::Display for PriceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increasing => write!(f, "INCREASING"),
            Self::Decreasing => write!(f, "DECREASING"),
            Self::Staying => write!(f, "STAYING"),
        }
    }
}

/// Pool-level result of one batch (or of one candidate scenario).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub match_type: MatchType,
    pub price_direction: PriceDirection,
    pub swap_price: Decimal,
    /// Executable X offered by buys at the swap price.
    pub ex: Decimal,
    /// Executable Y offered by sells at the swap price.
    pub ey: Decimal,
    pub original_ex: Decimal,
    pub original_ey: Decimal,
    /// X the pool provides to balance the book when the price falls.
    pub pool_x: Decimal,
    /// Y the pool provides to balance the book when the price rises.
    pub pool_y: Decimal,
    pub transact_amount: Decimal,
}

impl BatchResult {
    /// Result with nothing executable, priced at `price`.
    #[must_use]
    pub fn no_match(price_direction: PriceDirection, price: Decimal) -> Self {
        Self {
            match_type: MatchType::No,
            price_direction,
            swap_price: price,
            ex: Decimal::ZERO,
            ey: Decimal::ZERO,
            original_ex: Decimal::ZERO,
            original_ey: Decimal::ZERO,
            pool_x: Decimal::ZERO,
            pool_y: Decimal::ZERO,
            transact_amount: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn is_no_match(&self) -> bool {
        self.match_type == MatchType::No
    }
}

/// Per-request fill decided by the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub direction: OrderDirection,
    pub msg_index: MsgIndex,
    pub order_price: Decimal,
    /// Remaining offer amount when the batch matched.
    pub offer_amount: Decimal,
    pub transacted_amount: Decimal,
    pub exchanged_demand_amount: Decimal,
    pub offer_fee_amount: Decimal,
    pub exchanged_fee_amount: Decimal,
}
