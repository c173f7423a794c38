//! Request validator: the hard gate every request passes before it is
//! queued in a pool batch.
//!
//! Checks run in a fixed order and the first failure is returned, so the
//! same request is always rejected with the same error.
//!
//! ## Design Principles
//!
//! - **Fail-closed**: if any check errors, the request is rejected
//! - **No bypass**: swaps, deposits, withdrawals, and pool creation each
//!   have exactly one entry point
//! - **Re-usable at execution**: the pool-level swap checks are re-run
//!   against current reserves when the batch executes

use ammbatch_types::{
    AmmbatchError, Coin, DepositRequest, PoolParams, PoolRecord, Result, SwapRequest,
    WithdrawRequest, decimal, offer_coin_fee,
};
use rust_decimal::Decimal;

/// Validates requests against the engine parameters.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    params: PoolParams,
}

impl RequestValidator {
    #[must_use]
    pub fn new(params: PoolParams) -> Self {
        Self { params }
    }

    #[must_use]
    pub fn params(&self) -> &PoolParams {
        &self.params
    }

    fn ensure_breaker_open(&self) -> Result<()> {
        if self.params.circuit_breaker_enabled {
            return Err(AmmbatchError::CircuitBreakerEnabled);
        }
        Ok(())
    }

    /// Full admission check for a swap into `record`'s pool.
    ///
    /// # Errors
    /// In order: circuit breaker, depleted pool, non-positive or fractional
    /// offer, non-positive price, offer below the minimum, then every
    /// [`RequestValidator::validate_swap_within_pool`] check.
    pub fn validate_swap(&self, record: &PoolRecord, request: &SwapRequest) -> Result<()> {
        self.ensure_breaker_open()?;
        if record.is_depleted() {
            return Err(AmmbatchError::DepletedPool(record.id()));
        }
        if request.pool_id != record.id() {
            return Err(AmmbatchError::PoolNotFound(request.pool_id));
        }

        // 1. Offer amount
        let offer = request.offer_coin.amount;
        if offer <= Decimal::ZERO || !decimal::is_integral(offer) {
            return Err(AmmbatchError::BadOfferAmount { amount: offer });
        }
        // 2. Order price
        if request.order_price <= Decimal::ZERO {
            return Err(AmmbatchError::BadOrderPrice {
                price: request.order_price,
            });
        }
        // 3. Minimum offer
        if offer < self.params.min_offer_coin_amount {
            return Err(AmmbatchError::LessThanMinOfferAmount {
                amount: offer,
                min: self.params.min_offer_coin_amount,
            });
        }
        self.validate_swap_within_pool(record, request)
    }

    /// Pool-level swap checks against the current reserves.
    ///
    /// # Errors
    /// In order: reserve pair mismatch, offer above the orderable maximum,
    /// fee denomination, fee amount, and overflow of `offer` with the price.
    pub fn validate_swap_within_pool(
        &self,
        record: &PoolRecord,
        request: &SwapRequest,
    ) -> Result<()> {
        let pool = &record.pool;
        let offer = &request.offer_coin;

        // 4. Reserve pair
        if !pool.matches_pair(&offer.denom, &request.demand_denom) {
            return Err(AmmbatchError::NotMatchedReserveCoin);
        }
        // 5. Orderable maximum
        let reserve = pool
            .reserve_of(&record.reserves, &offer.denom)
            .ok_or(AmmbatchError::NotMatchedReserveCoin)?;
        let max =
            decimal::truncate(decimal::mul_truncate(reserve, self.params.max_order_amount_ratio)?);
        if offer.amount > max {
            return Err(AmmbatchError::ExceededMaxOrderable {
                amount: offer.amount,
                max,
            });
        }
        // 6. Fee denomination
        let expected = offer_coin_fee(offer, self.params.swap_fee_rate)?;
        if request.offer_coin_fee.denom != offer.denom {
            return Err(AmmbatchError::BadOfferCoinFee {
                expected: expected.to_string(),
                actual: request.offer_coin_fee.to_string(),
            });
        }
        // 7. Fee amount
        if request.offer_coin_fee.amount != expected.amount {
            return Err(AmmbatchError::BadOfferCoinFee {
                expected: expected.to_string(),
                actual: request.offer_coin_fee.to_string(),
            });
        }
        // 8. Overflow
        decimal::check_overflow(offer.amount, request.order_price)
    }

    /// Admission check for a deposit into `record`'s pool.
    ///
    /// A depleted pool accepts deposits: they re-initialise it at execution.
    pub fn validate_deposit(&self, record: &PoolRecord, request: &DepositRequest) -> Result<()> {
        self.ensure_breaker_open()?;
        if request.pool_id != record.id() {
            return Err(AmmbatchError::PoolNotFound(request.pool_id));
        }
        if request.deposit_coins.len() != 2 {
            return Err(AmmbatchError::InvalidRequest {
                reason: format!(
                    "deposit needs exactly two coins, got {}",
                    request.deposit_coins.len()
                ),
            });
        }
        let a = &request.deposit_coins[0];
        let b = &request.deposit_coins[1];
        if a.denom == b.denom || !record.pool.matches_pair(&a.denom, &b.denom) {
            return Err(AmmbatchError::NotMatchedReserveCoin);
        }
        for coin in &request.deposit_coins {
            ensure_positive_integral(coin)?;
        }
        if self.params.has_reserve_cap() {
            let cap = self.params.max_reserve_coin_amount;
            let dx = request.amount_of(record.pool.denom_x());
            let dy = request.amount_of(record.pool.denom_y());
            if record.reserves.x + dx > cap || record.reserves.y + dy > cap {
                return Err(AmmbatchError::ExceededReserveCoinLimit { limit: cap });
            }
        }
        Ok(())
    }

    /// Admission check for a withdrawal from `record`'s pool.
    ///
    /// Allowed while the circuit breaker is enabled.
    pub fn validate_withdraw(&self, record: &PoolRecord, request: &WithdrawRequest) -> Result<()> {
        if request.pool_id != record.id() {
            return Err(AmmbatchError::PoolNotFound(request.pool_id));
        }
        let coin = &request.pool_coin;
        if coin.denom != record.pool.pool_coin_denom {
            return Err(AmmbatchError::BadPoolCoinAmount {
                reason: format!("expected {}, got {}", record.pool.pool_coin_denom, coin.denom),
            });
        }
        if coin.amount <= Decimal::ZERO || !decimal::is_integral(coin.amount) {
            return Err(AmmbatchError::BadPoolCoinAmount {
                reason: format!("amount {} is not a positive integer", coin.amount),
            });
        }
        if coin.amount > record.pool_coin_supply {
            return Err(AmmbatchError::BadPoolCoinAmount {
                reason: format!(
                    "amount {} exceeds supply {}",
                    coin.amount, record.pool_coin_supply
                ),
            });
        }
        Ok(())
    }

    /// Admission check for pool creation with initial deposits `a` and `b`.
    pub fn validate_create_pool(&self, a: &Coin, b: &Coin) -> Result<()> {
        self.ensure_breaker_open()?;
        if a.denom == b.denom {
            return Err(AmmbatchError::InvalidRequest {
                reason: format!("pool needs two distinct denominations, got {}", a.denom),
            });
        }
        for coin in [a, b] {
            ensure_positive_integral(coin)?;
            if coin.amount < self.params.min_init_deposit_amount {
                return Err(AmmbatchError::LessThanMinInitDeposit {
                    amount: coin.amount,
                    min: self.params.min_init_deposit_amount,
                });
            }
            if self.params.has_reserve_cap() && coin.amount > self.params.max_reserve_coin_amount {
                return Err(AmmbatchError::ExceededReserveCoinLimit {
                    limit: self.params.max_reserve_coin_amount,
                });
            }
        }
        Ok(())
    }
}

fn ensure_positive_integral(coin: &Coin) -> Result<()> {
    if coin.amount <= Decimal::ZERO || !decimal::is_integral(coin.amount) {
        return Err(AmmbatchError::BadOfferAmount {
            amount: coin.amount,
        });
    }
    Ok(())
}
