//! Liquidity pool and its reserve pair.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{AmmbatchError, Denom, PoolId, Result, alphabetical_denom_pair, constants, decimal};

/// A two-asset constant-product liquidity pool.
///
/// `reserve_denoms` is always sorted alphabetically: index 0 is X, index 1 is Y.
/// The current pool price is `X / Y`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub reserve_denoms: [Denom; 2],
    pub pool_coin_denom: Denom,
}

impl Pool {
    /// Build a pool over two distinct denominations (order does not matter).
    pub fn new(id: PoolId, denom_a: &str, denom_b: &str) -> Result<Self> {
        if denom_a == denom_b || denom_a.is_empty() || denom_b.is_empty() {
            return Err(AmmbatchError::InvalidRequest {
                reason: format!("pool needs two distinct denominations, got {denom_a}/{denom_b}"),
            });
        }
        let (x, y) = alphabetical_denom_pair(denom_a, denom_b);
        Ok(Self {
            id,
            reserve_denoms: [x.to_string(), y.to_string()],
            pool_coin_denom: pool_coin_denom(id, x, y),
        })
    }

    #[must_use]
    pub fn denom_x(&self) -> &str {
        &self.reserve_denoms[0]
    }

    #[must_use]
    pub fn denom_y(&self) -> &str {
        &self.reserve_denoms[1]
    }

    /// Whether `offer`/`demand` is exactly this pool's reserve pair.
    #[must_use]
    pub fn matches_pair(&self, offer: &str, demand: &str) -> bool {
        let (a, b) = alphabetical_denom_pair(offer, demand);
        a == self.denom_x() && b == self.denom_y()
    }

    /// Reserve amount held in `denom`, if it is one of the pool's coins.
    #[must_use]
    pub fn reserve_of(&self, reserves: &Reserves, denom: &str) -> Option<Decimal> {
        if denom == self.denom_x() {
            Some(reserves.x)
        } else if denom == self.denom_y() {
            Some(reserves.y)
        } else {
            None
        }
    }

    /// Dummy X/Y pool for tests.
    #[cfg(any(test, feature = "test-helpers"))]
    #[must_use]
    pub fn dummy(id: u64) -> Self {
        Self {
            id: PoolId(id),
            reserve_denoms: ["denomX".to_string(), "denomY".to_string()],
            pool_coin_denom: pool_coin_denom(PoolId(id), "denomX", "denomY"),
        }
    }
}

/// Deterministic pool coin denomination for a pool id and reserve pair.
#[must_use]
pub fn pool_coin_denom(id: PoolId, denom_x: &str, denom_y: &str) -> Denom {
    let mut hasher = Sha256::new();
    hasher.update(b"ammbatch:pool_coin:v1:");
    hasher.update(id.0.to_le_bytes());
    hasher.update(denom_x.as_bytes());
    hasher.update(b"/");
    hasher.update(denom_y.as_bytes());
    let digest = hasher.finalize();
    format!(
        "{}{}",
        constants::POOL_COIN_DENOM_PREFIX,
        hex::encode_upper(&digest[..16])
    )
}

/// The pool's two reserve balances (integral amounts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reserves {
    pub x: Decimal,
    pub y: Decimal,
}

impl Reserves {
    #[must_use]
    pub fn new(x: Decimal, y: Decimal) -> Self {
        Self { x, y }
    }

    /// Current pool price `X / Y`.
    pub fn price(&self) -> Result<Decimal> {
        decimal::quo(self.x, self.y)
    }

    /// Whether either reserve is empty.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.x <= Decimal::ZERO || self.y <= Decimal::ZERO
    }
}
