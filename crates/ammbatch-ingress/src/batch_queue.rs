//! Batch queueing for validated requests.
//!
//! Each pool batch keeps three queues (deposit, withdraw, swap). A queued
//! request takes the queue's next message index and the counter advances,
//! so indices within a queue are gap-free and strictly increasing until
//! executed requests are dropped at the next batch.

use ammbatch_types::{
    Coin, DepositMsgState, DepositRequest, Height, MsgIndex, PoolRecord, SwapMsgState,
    SwapRequest, WithdrawMsgState, WithdrawRequest,
};
use tracing::debug;

/// Expiry height of a swap queued at `height`.
///
/// A zero `span` expires the request at the end of the current batch:
/// the next height that is a multiple of `unit_batch_height`.
#[must_use]
pub fn order_expiry_height(height: Height, span: u64, unit_batch_height: u64) -> Height {
    let span = if span == 0 && unit_batch_height > 0 {
        (unit_batch_height - height % unit_batch_height) % unit_batch_height
    } else {
        span
    };
    height + span
}

/// A queued request and the coins it moves into escrow.
#[derive(Debug, Clone)]
pub struct Queued {
    pub msg_index: MsgIndex,
    pub escrow: Vec<Coin>,
}

fn open_batch(record: &mut PoolRecord, height: Height) {
    if record.batch.begin_height == 0 {
        record.batch.begin_height = height;
    }
}

/// Queue a validated swap at `height`, expiring at `expiry_height`.
pub fn enqueue_swap(
    record: &mut PoolRecord,
    request: SwapRequest,
    height: Height,
    expiry_height: Height,
) -> Queued {
    open_batch(record, height);
    let msg_index = record.batch.swap_msg_index;
    let mut escrow = request.offer_coin.clone();
    escrow.amount += request.offer_coin_fee.amount;
    record
        .swap_msgs
        .push(SwapMsgState::new(request, msg_index, height, expiry_height));
    record.batch.swap_msg_index = msg_index.next();
    debug!(pool_id = %record.id(), %msg_index, expiry_height, "swap queued");
    Queued {
        msg_index,
        escrow: vec![escrow],
    }
}

/// Queue a validated deposit at `height`.
pub fn enqueue_deposit(record: &mut PoolRecord, request: DepositRequest, height: Height) -> Queued {
    open_batch(record, height);
    let msg_index = record.batch.deposit_msg_index;
    let escrow = request.deposit_coins.clone();
    record
        .deposit_msgs
        .push(DepositMsgState::new(request, msg_index, height));
    record.batch.deposit_msg_index = msg_index.next();
    debug!(pool_id = %record.id(), %msg_index, "deposit queued");
    Queued { msg_index, escrow }
}

/// Queue a validated withdrawal at `height`.
pub fn enqueue_withdraw(
    record: &mut PoolRecord,
    request: WithdrawRequest,
    height: Height,
) -> Queued {
    open_batch(record, height);
    let msg_index = record.batch.withdraw_msg_index;
    let escrow = vec![request.pool_coin.clone()];
    record
        .withdraw_msgs
        .push(WithdrawMsgState::new(request, msg_index, height));
    record.batch.withdraw_msg_index = msg_index.next();
    debug!(pool_id = %record.id(), %msg_index, "withdraw queued");
    Queued { msg_index, escrow }
}

#[cfg(test)]
mod tests {
    use ammbatch_types::{AccountId, Pool, PoolId, Reserves};
    use rust_decimal::Decimal;

    use super::*;

    fn record() -> PoolRecord {
        PoolRecord::new(
            Pool::dummy(1),
            Reserves::new(Decimal::new(1_000_000, 0), Decimal::new(1_000_000, 0)),
            Decimal::new(1_000_000, 0),
        )
    }

    fn swap() -> SwapRequest {
        SwapRequest {
            requester: AccountId::from_bytes([3; 16]),
            pool_id: PoolId(1),
            offer_coin: Coin::new("denomX", Decimal::new(10_000, 0)),
            demand_denom: "denomY".into(),
            offer_coin_fee: Coin::new("denomX", Decimal::new(15, 0)),
            order_price: Decimal::ONE,
        }
    }

    #[test]
    fn expiry_span_zero_ends_with_batch() {
        assert_eq!(order_expiry_height(7, 0, 1), 7);
        assert_eq!(order_expiry_height(7, 0, 5), 10);
        assert_eq!(order_expiry_height(10, 0, 5), 10);
        assert_eq!(order_expiry_height(7, 3, 5), 10);
        assert_eq!(order_expiry_height(7, 4, 1), 11);
    }

    #[test]
    fn swap_indices_advance_and_escrow_includes_fee() {
        let mut rec = record();
        let first = enqueue_swap(&mut rec, swap(), 4, 4);
        let second = enqueue_swap(&mut rec, swap(), 5, 5);
        assert_eq!(first.msg_index, MsgIndex(1));
        assert_eq!(second.msg_index, MsgIndex(2));
        assert_eq!(rec.batch.swap_msg_index, MsgIndex(3));
        assert_eq!(first.escrow, vec![Coin::new("denomX", Decimal::new(10_015, 0))]);

        // The batch opens at the first request.
        assert_eq!(rec.batch.begin_height, 4);
        assert_eq!(rec.swap_msgs[1].order_expiry_height, 5);
        rec.validate().unwrap();
    }

    #[test]
    fn deposit_and_withdraw_queues_are_independent() {
        let mut rec = record();
        let dep = enqueue_deposit(
            &mut rec,
            DepositRequest {
                depositor: AccountId::from_bytes([1; 16]),
                pool_id: PoolId(1),
                deposit_coins: vec![
                    Coin::new("denomX", Decimal::new(100, 0)),
                    Coin::new("denomY", Decimal::new(100, 0)),
                ],
            },
            2,
        );
        let denom = rec.pool.pool_coin_denom.clone();
        let wd = enqueue_withdraw(
            &mut rec,
            WithdrawRequest {
                withdrawer: AccountId::from_bytes([1; 16]),
                pool_id: PoolId(1),
                pool_coin: Coin::new(denom, Decimal::new(50, 0)),
            },
            2,
        );
        assert_eq!(dep.msg_index, MsgIndex(1));
        assert_eq!(wd.msg_index, MsgIndex(1));
        assert_eq!(dep.escrow.len(), 2);
        assert_eq!(rec.batch.deposit_msg_index, MsgIndex(2));
        assert_eq!(rec.batch.withdraw_msg_index, MsgIndex(2));
        assert_eq!(rec.batch.swap_msg_index, MsgIndex(1));
        rec.validate().unwrap();
    }
}
