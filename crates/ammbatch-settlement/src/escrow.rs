//! Escrow conservation ledger.
//!
//! Mathematical invariant enforced after every batch hook:
//! ```text
//! ∀ denom: escrow[denom] == Σ held by pending requests
//! ```
//! where a pending swap holds `remaining + reserved fee` of its offer coin,
//! a pending deposit its deposit coins, and a pending withdrawal its pool
//! coin. Requests flagged for deletion hold nothing.
//!
//! If this invariant ever breaks, the batch is aborted with a fatal error.

use std::collections::BTreeMap;

use ammbatch_types::{
    Account, AmmbatchError, Coin, Denom, PoolRecord, Result, Transfer, TransferKind,
};
use rust_decimal::Decimal;

/// Per-denomination escrow balances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscrowLedger {
    balances: BTreeMap<Denom, Decimal>,
}

impl EscrowLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger holding exactly what `records` require.
    #[must_use]
    pub fn rebuild<'a>(records: impl IntoIterator<Item = &'a PoolRecord>) -> Self {
        Self {
            balances: expected_holdings(records),
        }
    }

    /// Move `coin` into escrow.
    pub fn hold(&mut self, coin: &Coin) {
        if coin.amount.is_zero() {
            return;
        }
        *self
            .balances
            .entry(coin.denom.clone())
            .or_insert(Decimal::ZERO) += coin.amount;
    }

    /// Move `coin` out of escrow.
    ///
    /// # Errors
    /// Returns [`AmmbatchError::EscrowInvariantViolation`] if escrow holds
    /// less than `coin`.
    pub fn release(&mut self, coin: &Coin) -> Result<()> {
        if coin.amount.is_zero() {
            return Ok(());
        }
        let held = self.balance(&coin.denom);
        if held < coin.amount {
            return Err(AmmbatchError::EscrowInvariantViolation {
                reason: format!("release of {coin} exceeds held {held}{}", coin.denom),
            });
        }
        let left = held - coin.amount;
        if left.is_zero() {
            self.balances.remove(&coin.denom);
        } else {
            self.balances.insert(coin.denom.clone(), left);
        }
        Ok(())
    }

    /// Apply the escrow side of `transfers`.
    pub fn apply(&mut self, transfers: &[Transfer]) -> Result<()> {
        for t in transfers {
            let debit = t.from == Account::Escrow && t.kind != TransferKind::Mint;
            let credit = t.to == Account::Escrow && t.kind != TransferKind::Burn;
            if debit {
                self.release(&t.coin)?;
            }
            if credit {
                self.hold(&t.coin);
            }
        }
        Ok(())
    }

    /// Held amount of `denom`.
    #[must_use]
    pub fn balance(&self, denom: &str) -> Decimal {
        self.balances.get(denom).copied().unwrap_or(Decimal::ZERO)
    }

    /// Denominations with a non-zero balance.
    pub fn denoms(&self) -> impl Iterator<Item = &str> {
        self.balances.keys().map(String::as_str)
    }

    /// Verify that escrow equals what `records` require, per denomination.
    ///
    /// # Errors
    /// Returns [`AmmbatchError::EscrowInvariantViolation`] naming the first
    /// denomination that differs.
    pub fn verify<'a>(&self, records: impl IntoIterator<Item = &'a PoolRecord>) -> Result<()> {
        let expected = expected_holdings(records);
        for denom in expected.keys().chain(self.balances.keys()) {
            let want = expected.get(denom).copied().unwrap_or(Decimal::ZERO);
            let have = self.balance(denom);
            if want != have {
                return Err(AmmbatchError::EscrowInvariantViolation {
                    reason: format!("denom {denom}: escrow {have} != pending {want}"),
                });
            }
        }
        Ok(())
    }
}

fn expected_holdings<'a>(
    records: impl IntoIterator<Item = &'a PoolRecord>,
) -> BTreeMap<Denom, Decimal> {
    let mut out: BTreeMap<Denom, Decimal> = BTreeMap::new();
    let mut add = |coin: &Coin| {
        if !coin.amount.is_zero() {
            *out.entry(coin.denom.clone()).or_insert(Decimal::ZERO) += coin.amount;
        }
    };
    for r in records {
        for m in r.swap_msgs.iter().filter(|m| !m.to_be_deleted) {
            add(&Coin::new(m.offer_denom(), m.escrowed_amount()));
        }
        for m in r.deposit_msgs.iter().filter(|m| !m.to_be_deleted) {
            m.request.deposit_coins.iter().for_each(&mut add);
        }
        for m in r.withdraw_msgs.iter().filter(|m| !m.to_be_deleted) {
            add(&m.request.pool_coin);
        }
    }
    out.retain(|_, v| !v.is_zero());
    out
}

#[cfg(test)]
mod tests {
    use ammbatch_types::{AccountId, OrderDirection, Pool, PoolId, Reserves, SwapMsgState};

    use super::*;

    fn coin(denom: &str, amount: i64) -> Coin {
        Coin::new(denom, Decimal::new(amount, 0))
    }

    fn record_with_swap() -> PoolRecord {
        let mut r = PoolRecord::new(
            Pool::dummy(1),
            Reserves::new(Decimal::new(1_000, 0), Decimal::new(1_000, 0)),
            Decimal::new(1_000, 0),
        );
        r.swap_msgs.push(SwapMsgState::dummy(
            1,
            OrderDirection::XtoY,
            Decimal::ONE,
            Decimal::new(10_000, 0),
        ));
        r.batch.swap_msg_index = r.batch.swap_msg_index.next();
        r
    }

    #[test]
    fn empty_ledger_is_zero() {
        let ledger = EscrowLedger::new();
        assert_eq!(ledger.balance("denomX"), Decimal::ZERO);
        assert!(ledger.verify(std::iter::empty()).is_ok());
    }

    #[test]
    fn hold_and_release() {
        let mut ledger = EscrowLedger::new();
        ledger.hold(&coin("denomX", 100));
        ledger.hold(&coin("denomX", 50));
        ledger.release(&coin("denomX", 30)).unwrap();
        assert_eq!(ledger.balance("denomX"), Decimal::new(120, 0));

        let err = ledger.release(&coin("denomX", 121)).unwrap_err();
        assert!(err.is_fatal());

        ledger.release(&coin("denomX", 120)).unwrap();
        assert_eq!(ledger.denoms().count(), 0);
    }

    #[test]
    fn verify_against_pending_swap() {
        let r = record_with_swap();
        let mut ledger = EscrowLedger::new();
        // Offer plus the reserved fee of 15.
        ledger.hold(&coin("denomX", 10_015));
        ledger.verify([&r]).unwrap();
        assert_eq!(EscrowLedger::rebuild([&r]), ledger);

        ledger.hold(&coin("denomY", 1));
        assert!(ledger.verify([&r]).is_err());
    }

    #[test]
    fn deleted_requests_hold_nothing() {
        let mut r = record_with_swap();
        r.swap_msgs[0].to_be_deleted = true;
        EscrowLedger::new().verify([&r]).unwrap();
    }

    #[test]
    fn apply_tracks_escrow_side_only() {
        let user = Account::User(AccountId::from_bytes([1; 16]));
        let reserve = Account::Reserve(PoolId(1));
        let mut ledger = EscrowLedger::new();
        ledger
            .apply(&[
                Transfer::new(user, Account::Escrow, coin("denomX", 100)),
                Transfer::new(user, Account::Escrow, coin("pool1", 10)),
                Transfer::new(Account::Escrow, reserve, coin("denomX", 60)),
                Transfer::new(reserve, user, coin("denomY", 55)),
                Transfer::burn(Account::Escrow, coin("pool1", 10)),
                Transfer::mint(user, coin("pool1", 3)),
            ])
            .unwrap();
        assert_eq!(ledger.balance("denomX"), Decimal::new(40, 0));
        assert_eq!(ledger.balance("denomY"), Decimal::ZERO);
        assert_eq!(ledger.balance("pool1"), Decimal::ZERO);
    }
}
