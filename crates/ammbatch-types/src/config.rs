//! Pool parameters read by the engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AmmbatchError, Result, constants};

/// Engine-wide liquidity pool parameters.
///
/// The engine never mutates these; changing them is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    /// Total swap fee rate. Half is reserved on the offer side, half is
    /// taken from the exchanged demand coin.
    pub swap_fee_rate: Decimal,
    /// Share of withdrawn reserves left in the pool.
    pub withdraw_fee_rate: Decimal,
    /// Maximum offer as a fraction of the offered reserve.
    pub max_order_amount_ratio: Decimal,
    pub min_offer_coin_amount: Decimal,
    /// Minimum amount of each reserve coin to create or revive a pool.
    pub min_init_deposit_amount: Decimal,
    pub init_pool_coin_mint_amount: Decimal,
    /// Per-coin reserve cap. Zero disables the cap.
    pub max_reserve_coin_amount: Decimal,
    /// Heights per batch; batches close when `height % unit_batch_height == 0`.
    pub unit_batch_height: u64,
    /// Reject new pools, deposits, and swaps.
    pub circuit_breaker_enabled: bool,
    /// Run the post-match invariant checks on every batch.
    pub invariant_checks: bool,
}

impl Default for PoolParams {
    fn default() -> Self {
        Self {
            swap_fee_rate: constants::DEFAULT_SWAP_FEE_RATE,
            withdraw_fee_rate: constants::DEFAULT_WITHDRAW_FEE_RATE,
            max_order_amount_ratio: constants::DEFAULT_MAX_ORDER_AMOUNT_RATIO,
            min_offer_coin_amount: Decimal::from(constants::DEFAULT_MIN_OFFER_COIN_AMOUNT),
            min_init_deposit_amount: Decimal::from(constants::DEFAULT_MIN_INIT_DEPOSIT_AMOUNT),
            init_pool_coin_mint_amount: Decimal::from(
                constants::DEFAULT_INIT_POOL_COIN_MINT_AMOUNT,
            ),
            max_reserve_coin_amount: Decimal::from(constants::DEFAULT_MAX_RESERVE_COIN_AMOUNT),
            unit_batch_height: constants::DEFAULT_UNIT_BATCH_HEIGHT,
            circuit_breaker_enabled: false,
            invariant_checks: true,
        }
    }
}

impl PoolParams {
    /// Reject out-of-range parameters.
    pub fn validate(&self) -> Result<()> {
        let rate_in_unit = |name: &str, v: Decimal| {
            if v < Decimal::ZERO || v > Decimal::ONE {
                Err(AmmbatchError::Configuration(format!(
                    "{name} must be within [0, 1], got {v}"
                )))
            } else {
                Ok(())
            }
        };
        rate_in_unit("swap_fee_rate", self.swap_fee_rate)?;
        rate_in_unit("withdraw_fee_rate", self.withdraw_fee_rate)?;
        if self.max_order_amount_ratio <= Decimal::ZERO || self.max_order_amount_ratio > Decimal::ONE
        {
            return Err(AmmbatchError::Configuration(format!(
                "max_order_amount_ratio must be within (0, 1], got {}",
                self.max_order_amount_ratio
            )));
        }
        for (name, v) in [
            ("min_offer_coin_amount", self.min_offer_coin_amount),
            ("min_init_deposit_amount", self.min_init_deposit_amount),
            ("init_pool_coin_mint_amount", self.init_pool_coin_mint_amount),
        ] {
            if v <= Decimal::ZERO || !v.fract().is_zero() {
                return Err(AmmbatchError::Configuration(format!(
                    "{name} must be a positive integer, got {v}"
                )));
            }
        }
        if self.max_reserve_coin_amount < Decimal::ZERO
            || !self.max_reserve_coin_amount.fract().is_zero()
        {
            return Err(AmmbatchError::Configuration(format!(
                "max_reserve_coin_amount must be a non-negative integer, got {}",
                self.max_reserve_coin_amount
            )));
        }
        if self.unit_batch_height == 0 {
            return Err(AmmbatchError::Configuration(
                "unit_batch_height must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Whether the per-coin reserve cap is active.
    #[must_use]
    pub fn has_reserve_cap(&self) -> bool {
        !self.max_reserve_coin_amount.is_zero()
    }
}
