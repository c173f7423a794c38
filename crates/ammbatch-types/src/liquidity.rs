//! Deposit and withdraw requests queued in a pool batch.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, Coin, Height, MsgIndex, PoolId, SwapMsgState};

/// Common view over the three batch queues.
pub trait BatchMsg {
    fn msg_index(&self) -> MsgIndex;
    fn to_be_deleted(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Deposit
// ---------------------------------------------------------------------------

/// Add liquidity: one coin of each reserve denomination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub depositor: AccountId,
    pub pool_id: PoolId,
    pub deposit_coins: Vec<Coin>,
}

impl DepositRequest {
    /// Deposited amount of `denom`, zero if absent.
    #[must_use]
    pub fn amount_of(&self, denom: &str) -> Decimal {
        self.deposit_coins
            .iter()
            .filter(|c| c.denom == denom)
            .map(|c| c.amount)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositMsgState {
    pub msg_height: Height,
    pub msg_index: MsgIndex,
    pub executed: bool,
    pub succeeded: bool,
    pub to_be_deleted: bool,
    pub request: DepositRequest,
}

impl DepositMsgState {
    #[must_use]
    pub fn new(request: DepositRequest, msg_index: MsgIndex, msg_height: Height) -> Self {
        Self {
            msg_height,
            msg_index,
            executed: false,
            succeeded: false,
            to_be_deleted: false,
            request,
        }
    }
}

// ---------------------------------------------------------------------------
// Withdraw
// ---------------------------------------------------------------------------

/// Remove liquidity by returning pool coins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub withdrawer: AccountId,
    pub pool_id: PoolId,
    pub pool_coin: Coin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawMsgState {
    pub msg_height: Height,
    pub msg_index: MsgIndex,
    pub executed: bool,
    pub succeeded: bool,
    pub to_be_deleted: bool,
    pub request: WithdrawRequest,
}

impl WithdrawMsgState {
    #[must_use]
    pub fn new(request: WithdrawRequest, msg_index: MsgIndex, msg_height: Height) -> Self {
        Self {
            msg_height,
            msg_index,
            executed: false,
            succeeded: false,
            to_be_deleted: false,
            request,
        }
    }
}

impl BatchMsg for DepositMsgState {
    fn msg_index(&self) -> MsgIndex {
        self.msg_index
    }
    fn to_be_deleted(&self) -> bool {
        self.to_be_deleted
    }
}

impl BatchMsg for WithdrawMsgState {
    fn msg_index(&self) -> MsgIndex {
        self.msg_index
    }
    fn to_be_deleted(&self) -> bool {
        self.to_be_deleted
    }
}

impl BatchMsg for SwapMsgState {
    fn msg_index(&self) -> MsgIndex {
        self.msg_index
    }
    fn to_be_deleted(&self) -> bool {
        self.to_be_deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_amount_lookup() {
        let req = DepositRequest {
            depositor: AccountId::new(),
            pool_id: PoolId(1),
            deposit_coins: vec![
                Coin::new("denomX", Decimal::new(500, 0)),
                Coin::new("denomY", Decimal::new(700, 0)),
            ],
        };
        assert_eq!(req.amount_of("denomX"), Decimal::new(500, 0));
        assert_eq!(req.amount_of("denomY"), Decimal::new(700, 0));
        assert_eq!(req.amount_of("denomZ"), Decimal::ZERO);
    }

    #[test]
    fn new_withdraw_state_is_pending() {
        let req = WithdrawRequest {
            withdrawer: AccountId::new(),
            pool_id: PoolId(1),
            pool_coin: Coin::new("poolABC", Decimal::new(10, 0)),
        };
        let state = WithdrawMsgState::new(req, MsgIndex(4), 9);
        assert_eq!(state.msg_index(), MsgIndex(4));
        assert!(!state.to_be_deleted());
        assert!(!state.executed);
    }
}
