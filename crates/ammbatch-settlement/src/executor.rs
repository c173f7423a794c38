//! Pool batch execution.
//!
//! One call closes the current batch of one pool:
//! 1. Swaps: mark executed, drop expired and no-longer-valid requests,
//!    match the rest, settle fills and refunds
//! 2. Deposits, in queue order
//! 3. Withdrawals, in queue order
//!
//! The record is mutated in place; callers stage a clone and discard it on
//! error.

use ammbatch_ingress::RequestValidator;
use ammbatch_matchcore::{SwapMatchOutcome, compute_match_root, match_swap_batch};
use ammbatch_types::{
    Height, MatchType, PoolRecord, PriceDirection, Result, SettlementEvent, Transfer,
};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::liquidity::{execute_deposits, execute_withdrawals};
use crate::transact::{apply_pool_transfers, refund_swap, transact_and_refund};

/// Transfers and summary of one executed pool batch.
#[derive(Debug, Clone)]
pub struct PoolExecution {
    pub transfers: Vec<Transfer>,
    pub event: SettlementEvent,
}

#[derive(Debug, Default)]
struct SwapStage {
    transfers: Vec<Transfer>,
    executed: usize,
    refunded: usize,
    transacted_x: Decimal,
    transacted_y: Decimal,
    outcome: Option<SwapMatchOutcome>,
}

/// Execute the current batch of `record` at `height`.
///
/// Returns `None` when the batch holds no request to execute.
///
/// # Errors
/// Fatal errors, or [`ammbatch_types::AmmbatchError::Overflow`] from the
/// swap matcher. The record is left partially updated and must be
/// discarded.
pub fn execute_pool_batch(
    record: &mut PoolRecord,
    validator: &RequestValidator,
    height: Height,
) -> Result<Option<PoolExecution>> {
    let params = validator.params();
    let swaps = execute_swaps(record, validator, height)?;
    let deposits = execute_deposits(record, params)?;
    let withdrawals = execute_withdrawals(record, params)?;

    if swaps.executed + deposits.executed + withdrawals.executed == 0 {
        return Ok(None);
    }
    record.batch.executed = true;

    let (match_type, price_direction, clearing_price, matched, root) = match &swaps.outcome {
        Some(o) => (
            o.result.match_type,
            o.result.price_direction,
            o.result.swap_price,
            o.matches.len(),
            o.match_root,
        ),
        None => (
            MatchType::No,
            PriceDirection::Staying,
            Decimal::ZERO,
            0,
            compute_match_root(record.id(), record.batch.index, &[]),
        ),
    };

    let event = SettlementEvent {
        pool_id: record.id(),
        batch_index: record.batch.index,
        height,
        match_type,
        price_direction,
        clearing_price,
        transacted_x: swaps.transacted_x,
        transacted_y: swaps.transacted_y,
        matched_swaps: matched,
        refunded_swaps: swaps.refunded,
        deposits: deposits.succeeded,
        withdrawals: withdrawals.succeeded,
        match_root: hex::encode(root),
    };
    info!(
        pool_id = %event.pool_id,
        batch_index = %event.batch_index,
        height,
        match_type = ?event.match_type,
        clearing_price = %event.clearing_price,
        matched = event.matched_swaps,
        refunded = event.refunded_swaps,
        deposits = event.deposits,
        withdrawals = event.withdrawals,
        "batch settled"
    );

    let mut transfers = swaps.transfers;
    transfers.extend(deposits.transfers);
    transfers.extend(withdrawals.transfers);
    Ok(Some(PoolExecution { transfers, event }))
}

fn execute_swaps(
    record: &mut PoolRecord,
    validator: &RequestValidator,
    height: Height,
) -> Result<SwapStage> {
    let mut stage = SwapStage::default();
    for msg in record.swap_msgs.iter_mut().filter(|m| m.is_unprocessed()) {
        msg.executed = true;
        stage.executed += 1;
    }
    if stage.executed == 0 {
        return Ok(stage);
    }

    // Requests that can no longer be matched are refunded before matching.
    let depleted = record.is_depleted();
    let mut dropped = Vec::new();
    for (pos, msg) in record.swap_msgs.iter().enumerate() {
        if !msg.executed || msg.to_be_deleted {
            continue;
        }
        let reason = if depleted {
            Some("pool depleted".to_string())
        } else if height > msg.order_expiry_height {
            Some("expired".to_string())
        } else {
            validator
                .validate_swap_within_pool(record, &msg.request)
                .err()
                .map(|e| e.to_string())
        };
        if let Some(reason) = reason {
            warn!(
                pool_id = %record.id(),
                msg_index = %msg.msg_index,
                %reason,
                "swap dropped before matching"
            );
            dropped.push(pos);
        }
    }
    for pos in dropped {
        let msg = &mut record.swap_msgs[pos];
        msg.to_be_deleted = true;
        if let Some(t) = refund_swap(msg) {
            stage.transfers.push(t);
            stage.refunded += 1;
        }
    }
    if depleted {
        return Ok(stage);
    }

    let active: Vec<usize> = record
        .swap_msgs
        .iter()
        .enumerate()
        .filter(|(_, m)| m.executed && !m.to_be_deleted)
        .map(|(pos, _)| pos)
        .collect();
    let mut msgs: Vec<_> = active.iter().map(|&pos| record.swap_msgs[pos].clone()).collect();

    let outcome = match_swap_batch(
        &record.pool,
        record.batch.index,
        record.reserves,
        &mut msgs,
        height,
        validator.params().invariant_checks,
    )?;
    let settled = transact_and_refund(
        record,
        &msgs,
        &outcome.matches,
        &outcome.update.folded,
        height,
    )?;

    for (pos, msg) in active.into_iter().zip(msgs) {
        record.swap_msgs[pos] = msg;
    }
    stage.transfers.extend(settled.transfers);
    stage.refunded += settled.refunded;
    stage.transacted_x = settled.transacted_x;
    stage.transacted_y = settled.transacted_y;
    stage.outcome = Some(outcome);

    apply_pool_transfers(record, &stage.transfers)?;
    Ok(stage)
}

#[cfg(test)]
mod tests {
    use ammbatch_ingress::{enqueue_deposit, enqueue_swap};
    use ammbatch_types::{
        Account, AccountId, Coin, DepositRequest, Pool, PoolId, PoolParams, Reserves,
        SwapRequest, offer_coin_fee,
    };

    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn amount(v: i64) -> Decimal {
        Decimal::new(v, 0)
    }

    fn record() -> PoolRecord {
        PoolRecord::new(
            Pool::dummy(1),
            Reserves::new(amount(1_000_000), amount(1_000_000)),
            amount(1_000_000),
        )
    }

    fn swap(user: u8, offer: &str, demand: &str, v: i64, price: &str) -> SwapRequest {
        let offer_coin = Coin::new(offer, amount(v));
        let fee = offer_coin_fee(&offer_coin, PoolParams::default().swap_fee_rate).unwrap();
        SwapRequest {
            requester: AccountId::from_bytes([user; 16]),
            pool_id: PoolId(1),
            offer_coin,
            demand_denom: demand.into(),
            offer_coin_fee: fee,
            order_price: dec(price),
        }
    }

    #[test]
    fn empty_batch_is_not_executed() {
        let validator = RequestValidator::new(PoolParams::default());
        let mut rec = record();
        assert!(execute_pool_batch(&mut rec, &validator, 1).unwrap().is_none());
        assert!(!rec.batch.executed);
    }

    #[test]
    fn buys_filled_by_pool_sell_refunded_at_expiry() {
        let validator = RequestValidator::new(PoolParams::default());
        let mut rec = record();
        for user in 1..=3 {
            enqueue_swap(&mut rec, swap(user, "denomX", "denomY", 10_000, "1.1"), 1, 1);
        }
        enqueue_swap(&mut rec, swap(4, "denomY", "denomX", 5_000, "1.2"), 1, 1);

        let exec = execute_pool_batch(&mut rec, &validator, 1).unwrap().unwrap();
        assert!(rec.batch.executed);
        assert_eq!(exec.event.match_type, MatchType::Exact);
        assert_eq!(exec.event.price_direction, PriceDirection::Increasing);
        assert_eq!(exec.event.clearing_price, dec("1.06"));
        assert_eq!(exec.event.matched_swaps, 3);
        assert_eq!(exec.event.refunded_swaps, 1);
        assert_eq!(exec.event.transacted_x, amount(30_000));

        let buyer = Account::User(AccountId::from_bytes([1; 16]));
        assert!(exec.transfers.contains(&Transfer::new(
            Account::Reserve(PoolId(1)),
            buyer,
            Coin::new("denomY", amount(9_419))
        )));
        let seller = Account::User(AccountId::from_bytes([4; 16]));
        assert!(exec.transfers.contains(&Transfer::new(
            Account::Escrow,
            seller,
            Coin::new("denomY", amount(5_008))
        )));
        // Offers and offer fees enter the pool; truncated demand leaves it.
        assert_eq!(rec.reserves.x, amount(1_030_045));
        assert_eq!(rec.reserves.y, amount(1_000_000 - 3 * 9_419));
        assert!(rec.swap_msgs.iter().all(|m| m.to_be_deleted));
    }

    #[test]
    fn expired_request_refunded_without_matching() {
        let validator = RequestValidator::new(PoolParams::default());
        let mut rec = record();
        enqueue_swap(&mut rec, swap(1, "denomX", "denomY", 10_000, "1.1"), 1, 1);

        let exec = execute_pool_batch(&mut rec, &validator, 2).unwrap().unwrap();
        assert_eq!(exec.event.refunded_swaps, 1);
        assert_eq!(exec.event.matched_swaps, 0);
        assert_eq!(rec.reserves, Reserves::new(amount(1_000_000), amount(1_000_000)));
    }

    #[test]
    fn swaps_settle_before_deposits() {
        let validator = RequestValidator::new(PoolParams::default());
        let mut rec = record();
        enqueue_swap(&mut rec, swap(1, "denomX", "denomY", 10_000, "1.1"), 1, 1);
        enqueue_deposit(
            &mut rec,
            DepositRequest {
                depositor: AccountId::from_bytes([9; 16]),
                pool_id: PoolId(1),
                deposit_coins: vec![
                    Coin::new("denomX", amount(1_000)),
                    Coin::new("denomY", amount(1_000)),
                ],
            },
            1,
        );

        let exec = execute_pool_batch(&mut rec, &validator, 1).unwrap().unwrap();
        assert_eq!(exec.event.matched_swaps, 1);
        assert_eq!(exec.event.deposits, 1);
        // The deposit is accepted at the post-swap ratio, so part of the Y comes back.
        let refund_y = exec.transfers.iter().any(|t| {
            t.from == Account::Escrow
                && t.to == Account::User(AccountId::from_bytes([9; 16]))
                && t.coin.denom == "denomY"
        });
        assert!(refund_y);
    }

    #[test]
    fn depleted_pool_refunds_all_swaps() {
        let validator = RequestValidator::new(PoolParams::default());
        let mut rec = PoolRecord::new(Pool::dummy(1), Reserves::default(), Decimal::ZERO);
        enqueue_swap(&mut rec, swap(1, "denomX", "denomY", 10_000, "1.1"), 1, 1);

        let exec = execute_pool_batch(&mut rec, &validator, 1).unwrap().unwrap();
        assert_eq!(exec.event.match_type, MatchType::No);
        assert_eq!(exec.event.refunded_swaps, 1);
        assert_eq!(exec.transfers.len(), 1);
    }
}
