//! Per-pool batch counters and the persisted pool record.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    AmmbatchError, BatchIndex, BatchMsg, DepositMsgState, Height, MsgIndex, Pool, PoolId,
    Reserves, Result, SwapMsgState, WithdrawMsgState, decimal,
};

/// Batch counters of one pool.
///
/// Each `*_msg_index` is the next index handed out by that queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolBatch {
    pub pool_id: PoolId,
    pub index: BatchIndex,
    /// Height of the first request queued in this batch, 0 when none yet.
    pub begin_height: Height,
    pub deposit_msg_index: MsgIndex,
    pub withdraw_msg_index: MsgIndex,
    pub swap_msg_index: MsgIndex,
    /// Set by `end_block`, cleared by the next `begin_block`.
    pub executed: bool,
}

impl PoolBatch {
    #[must_use]
    pub fn new(pool_id: PoolId, index: BatchIndex) -> Self {
        Self {
            pool_id,
            index,
            begin_height: 0,
            deposit_msg_index: MsgIndex::first(),
            withdraw_msg_index: MsgIndex::first(),
            swap_msg_index: MsgIndex::first(),
            executed: false,
        }
    }
}

/// Everything the engine stores for one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    pub pool: Pool,
    pub reserves: Reserves,
    pub pool_coin_supply: Decimal,
    pub batch: PoolBatch,
    pub deposit_msgs: Vec<DepositMsgState>,
    pub withdraw_msgs: Vec<WithdrawMsgState>,
    pub swap_msgs: Vec<SwapMsgState>,
}

impl PoolRecord {
    /// Fresh record with empty queues and batch index 1.
    #[must_use]
    pub fn new(pool: Pool, reserves: Reserves, pool_coin_supply: Decimal) -> Self {
        let batch = PoolBatch::new(pool.id, BatchIndex::first());
        Self {
            pool,
            reserves,
            pool_coin_supply,
            batch,
            deposit_msgs: Vec::new(),
            withdraw_msgs: Vec::new(),
            swap_msgs: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> PoolId {
        self.pool.id
    }

    /// Whether the pool holds no reserves or no pool coins.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.pool_coin_supply <= Decimal::ZERO || self.reserves.is_depleted()
    }

    /// Structural checks run at every export/import boundary.
    ///
    /// For each queue, the next index is 1 when the queue is empty and
    /// `last stored index + 1` otherwise; stored indices strictly increase.
    pub fn validate(&self) -> Result<()> {
        let id = self.pool.id;
        if self.batch.pool_id != id {
            return Err(AmmbatchError::InvalidPoolRecord {
                reason: format!("batch belongs to {}, record to {id}", self.batch.pool_id),
            });
        }
        for (what, amount) in [
            ("reserve x", self.reserves.x),
            ("reserve y", self.reserves.y),
            ("pool coin supply", self.pool_coin_supply),
        ] {
            if amount.is_sign_negative() || !decimal::is_integral(amount) {
                return Err(AmmbatchError::InvalidPoolRecord {
                    reason: format!("{what} of {id} is not a non-negative integer: {amount}"),
                });
            }
        }

        check_queue(id, "deposit", &self.deposit_msgs, self.batch.deposit_msg_index)?;
        check_queue(id, "withdraw", &self.withdraw_msgs, self.batch.withdraw_msg_index)?;
        check_queue(id, "swap", &self.swap_msgs, self.batch.swap_msg_index)?;

        let foreign = self
            .deposit_msgs
            .iter()
            .map(|m| m.request.pool_id)
            .chain(self.withdraw_msgs.iter().map(|m| m.request.pool_id))
            .chain(self.swap_msgs.iter().map(|m| m.request.pool_id))
            .find(|p| *p != id);
        if let Some(other) = foreign {
            return Err(AmmbatchError::InvalidPoolRecord {
                reason: format!("queued request for {other} stored under {id}"),
            });
        }
        Ok(())
    }
}

fn check_queue<M: BatchMsg>(
    pool_id: PoolId,
    queue: &'static str,
    msgs: &[M],
    next: MsgIndex,
) -> Result<()> {
    let expected = msgs
        .last()
        .map_or(MsgIndex::first(), |m| m.msg_index().next());
    if next != expected {
        return Err(AmmbatchError::BadBatchMsgIndex {
            pool_id,
            queue,
            expected,
            actual: next,
        });
    }
    if msgs
        .windows(2)
        .any(|w| w[0].msg_index() >= w[1].msg_index())
    {
        return Err(AmmbatchError::InvalidPoolRecord {
            reason: format!("{queue} queue of {pool_id} is not in index order"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OrderDirection;

    fn record() -> PoolRecord {
        PoolRecord::new(
            Pool::dummy(1),
            Reserves::new(Decimal::new(1_000_000, 0), Decimal::new(1_000_000, 0)),
            Decimal::new(1_000_000, 0),
        )
    }

    #[test]
    fn empty_record_is_valid() {
        let rec = record();
        assert_eq!(rec.batch.index, BatchIndex(1));
        assert_eq!(rec.batch.swap_msg_index, MsgIndex(1));
        rec.validate().unwrap();
    }

    #[test]
    fn next_index_follows_last_stored() {
        let mut rec = record();
        rec.swap_msgs.push(SwapMsgState::dummy(
            1,
            OrderDirection::XtoY,
            Decimal::ONE,
            Decimal::new(100, 0),
        ));
        rec.swap_msgs.push(SwapMsgState::dummy(
            3,
            OrderDirection::XtoY,
            Decimal::ONE,
            Decimal::new(100, 0),
        ));
        rec.batch.swap_msg_index = MsgIndex(4);
        rec.validate().unwrap();

        rec.batch.swap_msg_index = MsgIndex(3);
        let err = rec.validate().unwrap_err();
        assert!(matches!(
            err,
            AmmbatchError::BadBatchMsgIndex {
                queue: "swap",
                expected: MsgIndex(4),
                ..
            }
        ));
    }

    #[test]
    fn nonempty_counter_on_empty_queue_rejected() {
        let mut rec = record();
        rec.batch.deposit_msg_index = MsgIndex(2);
        assert!(rec.validate().is_err());
    }

    #[test]
    fn fractional_reserve_rejected() {
        let mut rec = record();
        rec.reserves.x = Decimal::new(15, 1);
        assert!(matches!(
            rec.validate().unwrap_err(),
            AmmbatchError::InvalidPoolRecord { .. }
        ));
    }

    #[test]
    fn depletion() {
        let mut rec = record();
        assert!(!rec.is_depleted());
        rec.pool_coin_supply = Decimal::ZERO;
        assert!(rec.is_depleted());
    }
}
