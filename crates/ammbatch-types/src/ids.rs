//! Identifiers used throughout ammbatch.
//!
//! Pools, batches, and queued messages are numbered sequentially so that
//! every replica derives the same ids. Accounts use UUIDv7.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants;

/// Block height at which batches are opened, closed, and expired.
pub type Height = u64;

// ---------------------------------------------------------------------------
// PoolId
// ---------------------------------------------------------------------------

/// Sequential liquidity pool identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PoolId(pub u64);

impl PoolId {
    /// The id following this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// BatchIndex
// ---------------------------------------------------------------------------

/// Per-pool batch counter. Starts at [`constants::FIRST_BATCH_INDEX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BatchIndex(pub u64);

impl BatchIndex {
    #[must_use]
    pub fn first() -> Self {
        Self(constants::FIRST_BATCH_INDEX)
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for BatchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MsgIndex
// ---------------------------------------------------------------------------

/// Position of a request within its pool's deposit, withdraw, or swap queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MsgIndex(pub u64);

impl MsgIndex {
    #[must_use]
    pub fn first() -> Self {
        Self(constants::FIRST_MSG_INDEX)
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for MsgIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// Requester / depositor / withdrawer account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl AccountId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
