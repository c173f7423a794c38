//! Deposit and withdraw execution.
//!
//! Deposits are accepted at the current reserve ratio: the scarcer side
//! sets the mint amount and the surplus of the other coin is refunded.
//! Withdrawals pay out the pool-coin share of both reserves minus the
//! withdraw fee, which stays in the pool. Both run after swaps, one request
//! at a time, so each sees the reserves left by the previous one.

use ammbatch_types::{
    Account, AmmbatchError, Coin, DepositRequest, PoolParams, PoolRecord, Reserves, Result,
    Transfer, WithdrawRequest, decimal,
};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::transact::apply_pool_transfers;

/// Accepted deposit amounts and the pool coins minted for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositFill {
    pub accepted_x: Decimal,
    pub accepted_y: Decimal,
    pub minted: Decimal,
}

/// Reserve amounts paid out for a withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawFill {
    pub out_x: Decimal,
    pub out_y: Decimal,
}

/// Requests touched by one liquidity stage.
#[derive(Debug, Clone, Default)]
pub struct LiquidityStage {
    pub transfers: Vec<Transfer>,
    pub executed: usize,
    pub succeeded: usize,
}

/// Amounts accepted from a `dx`/`dy` deposit into a live pool.
///
/// # Errors
/// [`AmmbatchError::Overflow`] when the products overflow and
/// [`AmmbatchError::InvalidRequest`] when the deposit is too small to mint
/// a single pool coin.
pub fn deposit_amounts(
    reserves: Reserves,
    supply: Decimal,
    dx: Decimal,
    dy: Decimal,
) -> Result<DepositFill> {
    decimal::check_overflow(supply, dx)?;
    decimal::check_overflow(supply, dy)?;

    let mint_x = decimal::quo_truncate(decimal::mul_truncate(supply, dx)?, reserves.x)?;
    let mint_y = decimal::quo_truncate(decimal::mul_truncate(supply, dy)?, reserves.y)?;
    let minted = decimal::truncate(mint_x.min(mint_y));
    if minted.is_zero() {
        return Err(AmmbatchError::InvalidRequest {
            reason: format!("deposit of {dx}/{dy} mints no pool coin"),
        });
    }

    let rate = decimal::quo_truncate(minted, supply)?;
    let accepted_x = decimal::truncate(decimal::mul(reserves.x, rate)?);
    let accepted_y = decimal::truncate(decimal::mul(reserves.y, rate)?);
    if accepted_x.is_zero() && accepted_y.is_zero() {
        return Err(AmmbatchError::InvalidRequest {
            reason: format!("deposit of {dx}/{dy} accepts nothing"),
        });
    }
    Ok(DepositFill {
        accepted_x,
        accepted_y,
        minted,
    })
}

/// Reserves paid out for burning `amount` of `supply` pool coins.
///
/// Burning the whole supply drains the pool without a fee.
///
/// # Errors
/// [`AmmbatchError::Overflow`] when the products overflow.
pub fn withdraw_amounts(
    reserves: Reserves,
    supply: Decimal,
    amount: Decimal,
    withdraw_fee_rate: Decimal,
) -> Result<WithdrawFill> {
    if amount == supply {
        return Ok(WithdrawFill {
            out_x: reserves.x,
            out_y: reserves.y,
        });
    }
    let keep = Decimal::ONE - withdraw_fee_rate;
    let share = |reserve: Decimal| -> Result<Decimal> {
        decimal::check_overflow(reserve, amount)?;
        let gross = decimal::mul(reserve, amount)?;
        let net = decimal::truncate(decimal::mul_truncate(gross, keep)?);
        Ok(decimal::truncate(decimal::quo_truncate(net, supply)?))
    };
    Ok(WithdrawFill {
        out_x: share(reserves.x)?,
        out_y: share(reserves.y)?,
    })
}

fn deposit_transfers(
    record: &PoolRecord,
    request: &DepositRequest,
    params: &PoolParams,
) -> Result<Vec<Transfer>> {
    let pool = &record.pool;
    let reserve = Account::Reserve(pool.id);
    let user = Account::User(request.depositor);
    let dx = request.amount_of(pool.denom_x());
    let dy = request.amount_of(pool.denom_y());

    let (accepted_x, accepted_y, minted) = if record.is_depleted() {
        for (d, r) in [(dx, record.reserves.x), (dy, record.reserves.y)] {
            if d + r < params.min_init_deposit_amount {
                return Err(AmmbatchError::LessThanMinInitDeposit {
                    amount: d + r,
                    min: params.min_init_deposit_amount,
                });
            }
        }
        (dx, dy, params.init_pool_coin_mint_amount)
    } else {
        let fill = deposit_amounts(record.reserves, record.pool_coin_supply, dx, dy)?;
        (fill.accepted_x, fill.accepted_y, fill.minted)
    };

    if params.has_reserve_cap() {
        let cap = params.max_reserve_coin_amount;
        if record.reserves.x + accepted_x > cap || record.reserves.y + accepted_y > cap {
            return Err(AmmbatchError::ExceededReserveCoinLimit { limit: cap });
        }
    }

    let mut out = Vec::with_capacity(5);
    let mut push = |from, to, denom: &str, amount: Decimal| {
        if amount > Decimal::ZERO {
            out.push(Transfer::new(from, to, Coin::new(denom, amount)));
        }
    };
    push(Account::Escrow, reserve, pool.denom_x(), accepted_x);
    push(Account::Escrow, reserve, pool.denom_y(), accepted_y);
    push(Account::Escrow, user, pool.denom_x(), dx - accepted_x);
    push(Account::Escrow, user, pool.denom_y(), dy - accepted_y);
    out.push(Transfer::mint(user, Coin::new(pool.pool_coin_denom.clone(), minted)));
    Ok(out)
}

fn withdraw_transfers(
    record: &PoolRecord,
    request: &WithdrawRequest,
    params: &PoolParams,
) -> Result<Vec<Transfer>> {
    let pool = &record.pool;
    if record.is_depleted() {
        return Err(AmmbatchError::DepletedPool(pool.id));
    }
    let amount = request.pool_coin.amount;
    if amount > record.pool_coin_supply {
        return Err(AmmbatchError::BadPoolCoinAmount {
            reason: format!(
                "withdraw of {amount} exceeds supply {}",
                record.pool_coin_supply
            ),
        });
    }

    let fill = withdraw_amounts(
        record.reserves,
        record.pool_coin_supply,
        amount,
        params.withdraw_fee_rate,
    )?;
    let reserve = Account::Reserve(pool.id);
    let user = Account::User(request.withdrawer);
    let mut out = Vec::with_capacity(3);
    for (denom, paid) in [(pool.denom_x(), fill.out_x), (pool.denom_y(), fill.out_y)] {
        if paid > Decimal::ZERO {
            out.push(Transfer::new(reserve, user, Coin::new(denom, paid)));
        }
    }
    out.push(Transfer::burn(Account::Escrow, request.pool_coin.clone()));
    Ok(out)
}

/// Execute every deposit not yet executed in the current batch.
///
/// A deposit that cannot be accepted is refunded in full.
///
/// # Errors
/// Only fatal errors; request-level failures become refunds.
pub fn execute_deposits(record: &mut PoolRecord, params: &PoolParams) -> Result<LiquidityStage> {
    let mut stage = LiquidityStage::default();
    for pos in 0..record.deposit_msgs.len() {
        let msg = &record.deposit_msgs[pos];
        if msg.executed || msg.to_be_deleted {
            continue;
        }
        let (msg_index, request) = (msg.msg_index, msg.request.clone());
        stage.executed += 1;

        let succeeded = match deposit_transfers(record, &request, params) {
            Ok(transfers) => {
                apply_pool_transfers(record, &transfers)?;
                stage.transfers.extend(transfers);
                debug!(pool_id = %record.id(), %msg_index, "deposit accepted");
                true
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(pool_id = %record.id(), %msg_index, error = %err, "deposit refunded");
                let user = Account::User(request.depositor);
                stage.transfers.extend(
                    request
                        .deposit_coins
                        .iter()
                        .filter(|c| c.is_positive())
                        .map(|c| Transfer::new(Account::Escrow, user, c.clone())),
                );
                false
            }
        };

        let msg = &mut record.deposit_msgs[pos];
        msg.executed = true;
        msg.succeeded = succeeded;
        msg.to_be_deleted = true;
        stage.succeeded += usize::from(succeeded);
    }
    Ok(stage)
}

/// Execute every withdrawal not yet executed in the current batch.
///
/// A withdrawal that cannot be served returns its pool coins.
///
/// # Errors
/// Only fatal errors; request-level failures become refunds.
pub fn execute_withdrawals(record: &mut PoolRecord, params: &PoolParams) -> Result<LiquidityStage> {
    let mut stage = LiquidityStage::default();
    for pos in 0..record.withdraw_msgs.len() {
        let msg = &record.withdraw_msgs[pos];
        if msg.executed || msg.to_be_deleted {
            continue;
        }
        let (msg_index, request) = (msg.msg_index, msg.request.clone());
        stage.executed += 1;

        let succeeded = match withdraw_transfers(record, &request, params) {
            Ok(transfers) => {
                apply_pool_transfers(record, &transfers)?;
                stage.transfers.extend(transfers);
                debug!(pool_id = %record.id(), %msg_index, "withdraw paid");
                true
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(pool_id = %record.id(), %msg_index, error = %err, "withdraw refunded");
                stage.transfers.push(Transfer::new(
                    Account::Escrow,
                    Account::User(request.withdrawer),
                    request.pool_coin.clone(),
                ));
                false
            }
        };

        let msg = &mut record.withdraw_msgs[pos];
        msg.executed = true;
        msg.succeeded = succeeded;
        msg.to_be_deleted = true;
        stage.succeeded += usize::from(succeeded);
    }
    Ok(stage)
}

#[cfg(test)]
mod tests {
    use ammbatch_types::{AccountId, MsgIndex, Pool, PoolId, TransferKind};
    use ammbatch_ingress::{enqueue_deposit, enqueue_withdraw};

    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn amount(v: i64) -> Decimal {
        Decimal::new(v, 0)
    }

    fn record(x: i64, y: i64, supply: i64) -> PoolRecord {
        PoolRecord::new(Pool::dummy(1), Reserves::new(amount(x), amount(y)), amount(supply))
    }

    fn deposit(dx: i64, dy: i64) -> DepositRequest {
        DepositRequest {
            depositor: AccountId::from_bytes([5; 16]),
            pool_id: PoolId(1),
            deposit_coins: vec![
                Coin::new("denomX", amount(dx)),
                Coin::new("denomY", amount(dy)),
            ],
        }
    }

    fn withdraw(rec: &PoolRecord, v: i64) -> WithdrawRequest {
        WithdrawRequest {
            withdrawer: AccountId::from_bytes([6; 16]),
            pool_id: PoolId(1),
            pool_coin: Coin::new(rec.pool.pool_coin_denom.clone(), amount(v)),
        }
    }

    #[test]
    fn deposit_at_reserve_ratio() {
        let r = Reserves::new(amount(1_000_000), amount(2_000_000));
        let fill = deposit_amounts(r, amount(1_000_000), amount(333), amount(1_000)).unwrap();
        assert_eq!(fill.minted, amount(333));
        assert_eq!(fill.accepted_x, amount(333));
        assert_eq!(fill.accepted_y, amount(666));
    }

    #[test]
    fn dust_deposit_mints_nothing() {
        let r = Reserves::new(amount(1_000_000), amount(1_000_000));
        let err = deposit_amounts(r, amount(10), amount(1), amount(1)).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn withdraw_share_minus_fee() {
        let r = Reserves::new(amount(1_000_000), amount(1_000_000));
        let fill = withdraw_amounts(r, amount(1_000_000), amount(1_000), dec("0.003")).unwrap();
        assert_eq!(fill.out_x, amount(997));
        assert_eq!(fill.out_y, amount(997));
    }

    #[test]
    fn withdraw_whole_supply_drains_pool() {
        let r = Reserves::new(amount(1_234), amount(5_678));
        let fill = withdraw_amounts(r, amount(100), amount(100), dec("0.003")).unwrap();
        assert_eq!(fill.out_x, amount(1_234));
        assert_eq!(fill.out_y, amount(5_678));
    }

    #[test]
    fn deposit_mints_and_refunds_surplus() {
        let params = PoolParams::default();
        let mut rec = record(1_000_000, 1_000_000, 1_000_000);
        enqueue_deposit(&mut rec, deposit(100, 200), 1);

        let stage = execute_deposits(&mut rec, &params).unwrap();
        assert_eq!((stage.executed, stage.succeeded), (1, 1));
        assert_eq!(rec.reserves, Reserves::new(amount(1_000_100), amount(1_000_100)));
        assert_eq!(rec.pool_coin_supply, amount(1_000_100));

        let user = Account::User(AccountId::from_bytes([5; 16]));
        assert!(stage.transfers.contains(&Transfer::new(
            Account::Escrow,
            user,
            Coin::new("denomY", amount(100))
        )));
        let msg = &rec.deposit_msgs[0];
        assert!(msg.executed && msg.succeeded && msg.to_be_deleted);
        assert_eq!(msg.msg_index, MsgIndex(1));
    }

    #[test]
    fn deposit_revives_depleted_pool() {
        let params = PoolParams::default();
        let mut rec = record(0, 0, 0);
        enqueue_deposit(&mut rec, deposit(1_000_000, 2_000_000), 1);

        let stage = execute_deposits(&mut rec, &params).unwrap();
        assert_eq!(stage.succeeded, 1);
        assert_eq!(rec.reserves, Reserves::new(amount(1_000_000), amount(2_000_000)));
        assert_eq!(rec.pool_coin_supply, params.init_pool_coin_mint_amount);
    }

    #[test]
    fn small_deposit_into_depleted_pool_refunded() {
        let params = PoolParams::default();
        let mut rec = record(0, 0, 0);
        enqueue_deposit(&mut rec, deposit(10, 10), 1);

        let stage = execute_deposits(&mut rec, &params).unwrap();
        assert_eq!((stage.executed, stage.succeeded), (1, 0));
        assert_eq!(stage.transfers.len(), 2);
        assert!(stage.transfers.iter().all(|t| t.from == Account::Escrow));
        assert!(rec.is_depleted());
        assert!(rec.deposit_msgs[0].to_be_deleted);
    }

    #[test]
    fn withdraw_burns_pool_coins() {
        let params = PoolParams {
            withdraw_fee_rate: dec("0.003"),
            ..PoolParams::default()
        };
        let mut rec = record(1_000_000, 1_000_000, 1_000_000);
        let req = withdraw(&rec, 1_000);
        enqueue_withdraw(&mut rec, req, 1);

        let stage = execute_withdrawals(&mut rec, &params).unwrap();
        assert_eq!(stage.succeeded, 1);
        assert_eq!(rec.reserves, Reserves::new(amount(999_003), amount(999_003)));
        assert_eq!(rec.pool_coin_supply, amount(999_000));
        assert_eq!(stage.transfers.last().map(|t| t.kind), Some(TransferKind::Burn));
    }

    #[test]
    fn sequential_withdrawals_see_updated_reserves() {
        let params = PoolParams {
            withdraw_fee_rate: Decimal::ZERO,
            ..PoolParams::default()
        };
        let mut rec = record(1_000, 1_000, 100);
        let first = withdraw(&rec, 50);
        let second = withdraw(&rec, 50);
        enqueue_withdraw(&mut rec, first, 1);
        enqueue_withdraw(&mut rec, second, 1);

        let stage = execute_withdrawals(&mut rec, &params).unwrap();
        assert_eq!(stage.succeeded, 2);
        // The second request burns the remaining supply and drains the pool.
        assert!(rec.is_depleted());
        assert_eq!(rec.reserves, Reserves::new(Decimal::ZERO, Decimal::ZERO));
    }

    #[test]
    fn withdraw_from_depleted_pool_returns_coins() {
        let params = PoolParams::default();
        let mut rec = record(0, 0, 100);
        let req = withdraw(&rec, 10);
        enqueue_withdraw(&mut rec, req.clone(), 1);

        let stage = execute_withdrawals(&mut rec, &params).unwrap();
        assert_eq!(stage.succeeded, 0);
        assert_eq!(
            stage.transfers,
            vec![Transfer::new(
                Account::Escrow,
                Account::User(req.withdrawer),
                req.pool_coin
            )]
        );
    }
}
