//! # ammbatch-types
//!
//! Shared types, errors, and fixed-point helpers for the **ammbatch**
//! constant-batch AMM engine.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`PoolId`], [`BatchIndex`], [`MsgIndex`], [`AccountId`], [`Height`]
//! - **Fixed-point arithmetic**: [`decimal`] (18-digit banker's rounding, checked ops)
//! - **Pool model**: [`Pool`], [`Reserves`], [`Coin`]
//! - **Requests**: [`SwapMsgState`], [`DepositMsgState`], [`WithdrawMsgState`]
//! - **Batch model**: [`PoolBatch`], [`PoolRecord`]
//! - **Match results**: [`BatchResult`], [`MatchResult`], [`MatchType`], [`PriceDirection`]
//! - **Settlement output**: [`Transfer`], [`Account`], [`SettlementEvent`]
//! - **Configuration**: [`PoolParams`]
//! - **Errors**: [`AmmbatchError`] with `AB_ERR_` prefix codes
//! - **Constants**: precision, tolerances, and parameter defaults

pub mod batch;
pub mod coin;
pub mod config;
pub mod constants;
pub mod decimal;
pub mod error;
pub mod event;
pub mod ids;
pub mod liquidity;
pub mod pool;
pub mod result;
pub mod swap;

// Re-export all primary types at crate root for ergonomic imports:
//   use ammbatch_types::{Pool, Reserves, SwapMsgState, PoolRecord, ...};

pub use batch::*;
pub use coin::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use liquidity::*;
pub use pool::*;
pub use result::*;
pub use swap::*;

// Constants are accessed via `ammbatch_types::constants::FOO` and the
// arithmetic helpers via `ammbatch_types::decimal::foo`
// (not re-exported to avoid name collisions).
