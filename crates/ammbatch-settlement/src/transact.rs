//! Swap settlement transfers and reserve bookkeeping.
//!
//! For every match:
//! 1. `transacted` offer coin: escrow → reserve
//! 2. `offer fee`: escrow → reserve
//! 3. `exchanged - exchanged fee` demand coin: reserve → requester
//!
//! Amounts are truncated to whole units; the pool keeps the fractions.
//! A folded decimal-error unit also moves escrow → reserve. Requests flagged
//! for deletion get their remaining offer and fee refunded.

use std::collections::HashMap;

use ammbatch_types::{
    Account, AmmbatchError, Coin, Height, MatchResult, MsgIndex, OrderDirection, PoolRecord,
    Result, SwapMsgState, Transfer, TransferKind, decimal,
};
use rust_decimal::Decimal;
use tracing::{error, warn};

/// Transfers settling one batch's swaps.
#[derive(Debug, Clone, Default)]
pub struct SwapSettlement {
    pub transfers: Vec<Transfer>,
    /// Requests whose unfilled remainder was refunded.
    pub refunded: usize,
    pub transacted_x: Decimal,
    pub transacted_y: Decimal,
}

/// Escrow → requester refund of everything `msg` still holds.
#[must_use]
pub fn refund_swap(msg: &SwapMsgState) -> Option<Transfer> {
    let amount = msg.escrowed_amount();
    if amount <= Decimal::ZERO {
        return None;
    }
    Some(Transfer::new(
        Account::Escrow,
        Account::User(msg.request.requester),
        Coin::new(msg.offer_denom(), amount),
    ))
}

fn push_positive(
    out: &mut Vec<Transfer>,
    from: Account,
    to: Account,
    denom: &str,
    amount: Decimal,
) {
    if amount > Decimal::ZERO {
        out.push(Transfer::new(from, to, Coin::new(denom, amount)));
    }
}

/// Settle the matched and deletable requests among the batch's active
/// `msgs` at `height`.
///
/// # Errors
/// Fatal if a match names an unknown request, or if an open request is
/// flagged inconsistently with its expiry.
pub fn transact_and_refund(
    record: &PoolRecord,
    msgs: &[SwapMsgState],
    matches: &[MatchResult],
    folded: &[MsgIndex],
    height: Height,
) -> Result<SwapSettlement> {
    let reserve = Account::Reserve(record.id());
    let by_index: HashMap<MsgIndex, &SwapMsgState> =
        msgs.iter().map(|m| (m.msg_index, m)).collect();
    let lookup = |index: MsgIndex| {
        by_index.get(&index).copied().ok_or_else(|| {
            AmmbatchError::invariant(format!("settlement of unknown request {index}"))
        })
    };

    let mut out = SwapSettlement::default();

    for m in matches {
        let msg = lookup(m.msg_index)?;
        let user = Account::User(msg.request.requester);
        let offer = msg.offer_denom();
        let demand = msg.request.demand_denom.as_str();

        let transacted = decimal::truncate(m.transacted_amount);
        push_positive(&mut out.transfers, Account::Escrow, reserve, offer, transacted);
        push_positive(
            &mut out.transfers,
            Account::Escrow,
            reserve,
            offer,
            decimal::truncate(m.offer_fee_amount),
        );
        push_positive(
            &mut out.transfers,
            reserve,
            user,
            demand,
            decimal::truncate(m.exchanged_demand_amount - m.exchanged_fee_amount),
        );
        match m.direction {
            OrderDirection::XtoY => out.transacted_x += transacted,
            OrderDirection::YtoX => out.transacted_y += transacted,
        }
    }

    for &index in folded {
        let msg = lookup(index)?;
        push_positive(&mut out.transfers, Account::Escrow, reserve, msg.offer_denom(), Decimal::ONE);
    }

    for msg in msgs {
        let open = msg.remaining_offer_amount > Decimal::ZERO;
        let inconsistent = open
            && ((!msg.to_be_deleted && msg.order_expiry_height <= height)
                || (msg.to_be_deleted && msg.order_expiry_height != height));
        if inconsistent {
            error!(
                msg_index = %msg.msg_index,
                to_be_deleted = msg.to_be_deleted,
                expiry = msg.order_expiry_height,
                %height,
                "open request flagged inconsistently with expiry"
            );
            return Err(AmmbatchError::invariant(format!(
                "request {} open with inconsistent expiry flags",
                msg.msg_index
            )));
        }
        if !msg.to_be_deleted {
            continue;
        }
        if let Some(t) = refund_swap(msg) {
            if open {
                out.refunded += 1;
                warn!(
                    pool_id = %record.id(),
                    msg_index = %msg.msg_index,
                    remaining = %msg.remaining_offer_amount,
                    succeeded = msg.succeeded,
                    "swap expired, remainder refunded"
                );
            }
            out.transfers.push(t);
        }
    }

    Ok(out)
}

/// Apply the reserve and pool-coin side of `transfers` to `record`.
///
/// # Errors
/// Fatal if a transfer touches a foreign denomination or drives a reserve
/// or the pool coin supply negative.
pub fn apply_pool_transfers(record: &mut PoolRecord, transfers: &[Transfer]) -> Result<()> {
    let reserve = Account::Reserve(record.id());
    for t in transfers {
        match t.kind {
            TransferKind::Move => {
                if t.to == reserve {
                    adjust_reserve(record, &t.coin, t.coin.amount)?;
                }
                if t.from == reserve {
                    adjust_reserve(record, &t.coin, -t.coin.amount)?;
                }
            }
            TransferKind::Mint | TransferKind::Burn => {
                if t.coin.denom != record.pool.pool_coin_denom {
                    return Err(AmmbatchError::invariant(format!(
                        "{:?} of foreign coin {} in {}",
                        t.kind,
                        t.coin,
                        record.id()
                    )));
                }
                if t.kind == TransferKind::Mint {
                    record.pool_coin_supply += t.coin.amount;
                } else {
                    record.pool_coin_supply -= t.coin.amount;
                }
            }
        }
    }

    let r = record.reserves;
    if r.x < Decimal::ZERO || r.y < Decimal::ZERO || record.pool_coin_supply < Decimal::ZERO
    {
        error!(
            pool_id = %record.id(),
            x = %r.x,
            y = %r.y,
            supply = %record.pool_coin_supply,
            "negative pool balance"
        );
        return Err(AmmbatchError::invariant(format!(
            "negative balance in {}",
            record.id()
        )));
    }
    Ok(())
}

fn adjust_reserve(record: &mut PoolRecord, coin: &Coin, delta: Decimal) -> Result<()> {
    if coin.denom == record.pool.denom_x() {
        record.reserves.x += delta;
    } else if coin.denom == record.pool.denom_y() {
        record.reserves.y += delta;
    } else {
        return Err(AmmbatchError::invariant(format!(
            "reserve transfer of foreign coin {coin} in {}",
            record.id()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ammbatch_types::{AccountId, Pool, Reserves};

    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn record() -> PoolRecord {
        PoolRecord::new(
            Pool::dummy(1),
            Reserves::new(Decimal::new(1_000_000, 0), Decimal::new(1_000_000, 0)),
            Decimal::new(1_000_000, 0),
        )
    }

    fn filled_buy() -> (SwapMsgState, MatchResult) {
        let mut msg =
            SwapMsgState::dummy(2, OrderDirection::XtoY, dec("1.1"), Decimal::new(10_000, 0));
        msg.executed = true;
        msg.succeeded = true;
        msg.to_be_deleted = true;
        msg.exchanged_offer_amount = Decimal::new(10_000, 0);
        msg.remaining_offer_amount = Decimal::ZERO;
        msg.reserved_offer_fee = Decimal::ZERO;
        let m = MatchResult {
            direction: OrderDirection::XtoY,
            msg_index: MsgIndex(2),
            order_price: dec("1.1"),
            offer_amount: Decimal::new(10_000, 0),
            transacted_amount: Decimal::new(10_000, 0),
            exchanged_demand_amount: dec("9433.962264150943396226"),
            offer_fee_amount: Decimal::new(15, 0),
            exchanged_fee_amount: dec("14.150943396226415094"),
        };
        (msg, m)
    }

    #[test]
    fn matched_buy_pays_fee_and_receives_truncated_demand() {
        let rec = record();
        let (msg, m) = filled_buy();
        let s = transact_and_refund(&rec, &[msg], &[m], &[], 1).unwrap();
        let user = Account::User(AccountId::from_bytes([2; 16]));
        assert_eq!(
            s.transfers,
            vec![
                Transfer::new(
                    Account::Escrow,
                    Account::Reserve(rec.id()),
                    Coin::new("denomX", Decimal::new(10_000, 0))
                ),
                Transfer::new(
                    Account::Escrow,
                    Account::Reserve(rec.id()),
                    Coin::new("denomX", Decimal::new(15, 0))
                ),
                Transfer::new(
                    Account::Reserve(rec.id()),
                    user,
                    Coin::new("denomY", Decimal::new(9_419, 0))
                ),
            ]
        );
        assert_eq!(s.transacted_x, Decimal::new(10_000, 0));
        assert_eq!(s.refunded, 0);
    }

    #[test]
    fn expiring_unmatched_request_refunded_with_fee() {
        let rec = record();
        let mut sell =
            SwapMsgState::dummy(1, OrderDirection::YtoX, dec("1.2"), Decimal::new(5_000, 0));
        sell.executed = true;
        sell.to_be_deleted = true;
        let s = transact_and_refund(&rec, &[sell], &[], &[], 1).unwrap();
        assert_eq!(s.refunded, 1);
        assert_eq!(s.transfers.len(), 1);
        assert_eq!(s.transfers[0].coin, Coin::new("denomY", Decimal::new(5_008, 0)));
        assert_eq!(s.transfers[0].from, Account::Escrow);
    }

    #[test]
    fn carried_request_untouched_and_checked() {
        let rec = record();
        let mut sell =
            SwapMsgState::dummy(1, OrderDirection::YtoX, dec("1.2"), Decimal::new(5_000, 0));
        sell.executed = true;
        sell.order_expiry_height = 3;
        let s = transact_and_refund(&rec, &[sell.clone()], &[], &[], 1).unwrap();
        assert!(s.transfers.is_empty());

        // Open past its expiry without the deletion flag.
        let err = transact_and_refund(&rec, &[sell], &[], &[], 3).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn folded_unit_moves_to_reserve() {
        let rec = record();
        let (msg, m) = filled_buy();
        let s = transact_and_refund(&rec, &[msg], &[m], &[MsgIndex(2)], 1).unwrap();
        let last = s.transfers.last().unwrap();
        assert_eq!(last.to, Account::Reserve(rec.id()));
        assert_eq!(last.coin, Coin::new("denomX", Decimal::ONE));
    }

    #[test]
    fn reserves_follow_transfers() {
        let mut rec = record();
        let (msg, m) = filled_buy();
        let s = transact_and_refund(&rec, &[msg], &[m], &[], 1).unwrap();
        apply_pool_transfers(&mut rec, &s.transfers).unwrap();
        assert_eq!(rec.reserves.x, Decimal::new(1_010_015, 0));
        assert_eq!(rec.reserves.y, Decimal::new(990_581, 0));
    }

    #[test]
    fn overdrawn_reserve_is_fatal() {
        let mut rec = record();
        let user = Account::User(AccountId::from_bytes([1; 16]));
        let t = Transfer::new(
            Account::Reserve(rec.id()),
            user,
            Coin::new("denomY", Decimal::new(1_000_001, 0)),
        );
        assert!(apply_pool_transfers(&mut rec, &[t]).unwrap_err().is_fatal());
    }

    #[test]
    fn mint_and_burn_move_supply() {
        let mut rec = record();
        let user = Account::User(AccountId::from_bytes([1; 16]));
        let denom = rec.pool.pool_coin_denom.clone();
        apply_pool_transfers(
            &mut rec,
            &[
                Transfer::mint(user, Coin::new(denom.clone(), Decimal::new(500, 0))),
                Transfer::burn(Account::Escrow, Coin::new(denom, Decimal::new(200, 0))),
            ],
        )
        .unwrap();
        assert_eq!(rec.pool_coin_supply, Decimal::new(1_000_300, 0));

        let foreign = Transfer::mint(user, Coin::new("denomX", Decimal::ONE));
        assert!(apply_pool_transfers(&mut rec, &[foreign]).is_err());
    }
}
