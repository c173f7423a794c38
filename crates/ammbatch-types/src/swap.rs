//! Swap requests and their per-batch state.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, AmmbatchError, Coin, Denom, Height, MsgIndex, PoolId, Result, decimal};

/// Which reserve coin a swap request offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Offers X to receive Y (a "buy" in the order book).
    XtoY,
    /// Offers Y to receive X (a "sell" in the order book).
    YtoX,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XtoY => write!(f, "X_TO_Y"),
            Self::YtoX => write!(f, "Y_TO_X"),
        }
    }
}

/// A caller's swap request, as submitted.
///
/// `order_price` is always quoted as X per Y, whichever side is offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub requester: AccountId,
    pub pool_id: PoolId,
    pub offer_coin: Coin,
    pub demand_denom: Denom,
    pub offer_coin_fee: Coin,
    pub order_price: Decimal,
}

/// Queued swap request plus the state the engine mutates batch by batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapMsgState {
    pub msg_height: Height,
    pub msg_index: MsgIndex,
    pub executed: bool,
    pub succeeded: bool,
    pub to_be_deleted: bool,
    pub order_expiry_height: Height,
    /// Amount of the offer coin already traded away.
    pub exchanged_offer_amount: Decimal,
    /// Amount of the offer coin still waiting to trade.
    pub remaining_offer_amount: Decimal,
    /// Offer-side fee still held in escrow.
    pub reserved_offer_fee: Decimal,
    pub request: SwapRequest,
}

impl SwapMsgState {
    /// Fresh state for a newly queued request.
    #[must_use]
    pub fn new(
        request: SwapRequest,
        msg_index: MsgIndex,
        msg_height: Height,
        order_expiry_height: Height,
    ) -> Self {
        Self {
            msg_height,
            msg_index,
            executed: false,
            succeeded: false,
            to_be_deleted: false,
            order_expiry_height,
            exchanged_offer_amount: Decimal::ZERO,
            remaining_offer_amount: request.offer_coin.amount,
            reserved_offer_fee: request.offer_coin_fee.amount,
            request,
        }
    }

    #[must_use]
    pub fn order_price(&self) -> Decimal {
        self.request.order_price
    }

    #[must_use]
    pub fn offer_denom(&self) -> &str {
        &self.request.offer_coin.denom
    }

    /// Direction relative to a pool whose X denomination is `denom_x`.
    #[must_use]
    pub fn direction(&self, denom_x: &str) -> OrderDirection {
        if self.offer_denom() == denom_x {
            OrderDirection::XtoY
        } else {
            OrderDirection::YtoX
        }
    }

    /// Amount of the offer coin this request still holds in escrow.
    #[must_use]
    pub fn escrowed_amount(&self) -> Decimal {
        self.remaining_offer_amount + self.reserved_offer_fee
    }

    /// Not yet executed, succeeded, or flagged for deletion in this batch.
    #[must_use]
    pub fn is_unprocessed(&self) -> bool {
        !self.executed && !self.succeeded && !self.to_be_deleted
    }

    /// Dummy request for tests. The pool is `Pool::dummy`, the fee is the
    /// default-rate offer fee.
    #[cfg(any(test, feature = "test-helpers"))]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn dummy(index: u64, direction: OrderDirection, price: Decimal, amount: Decimal) -> Self {
        let (offer, demand) = match direction {
            OrderDirection::XtoY => ("denomX", "denomY"),
            OrderDirection::YtoX => ("denomY", "denomX"),
        };
        let offer_coin = Coin::new(offer, amount);
        let fee = offer_coin_fee(&offer_coin, crate::constants::DEFAULT_SWAP_FEE_RATE)
            .unwrap_or_else(|_| Coin::zero(offer));
        let request = SwapRequest {
            requester: AccountId::from_bytes([index as u8; 16]),
            pool_id: PoolId(1),
            offer_coin,
            demand_denom: demand.to_string(),
            offer_coin_fee: fee,
            order_price: price,
        };
        Self::new(request, MsgIndex(index), 1, 1)
    }
}

/// Offer-side fee reserved at submission: `ceil(offer * swap_fee_rate / 2)`.
pub fn offer_coin_fee(offer_coin: &Coin, swap_fee_rate: Decimal) -> Result<Coin> {
    let half_rate = decimal::quo(swap_fee_rate, Decimal::TWO)?;
    let fee = decimal::mul(offer_coin.amount, half_rate)?;
    Ok(Coin::new(offer_coin.denom.clone(), decimal::ceil(fee)))
}

/// Requests executed this batch without a fill.
#[must_use]
pub fn count_not_matched(states: &[&SwapMsgState]) -> usize {
    states.iter().filter(|m| m.executed && !m.succeeded).count()
}

/// Requests filled partially this batch (carried over).
#[must_use]
pub fn count_fractional_matched(states: &[&SwapMsgState]) -> usize {
    states
        .iter()
        .filter(|m| m.executed && m.succeeded && !m.to_be_deleted)
        .count()
}

/// Fail with an invariant violation unless `amount` is non-negative.
pub fn ensure_non_negative(amount: Decimal, what: &str, msg_index: MsgIndex) -> Result<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AmmbatchError::invariant(format!(
            "negative {what} {amount} after update of {msg_index}"
        )));
    }
    Ok(())
}
