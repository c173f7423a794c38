//! # ammbatch-settlement
//!
//! **Settlement plane**: pool batch execution, transfers, escrow
//! conservation, and state export/import.
//!
//! ## Architecture
//!
//! The [`LiquidityEngine`] owns every pool record and runs the batch hooks:
//! 1. Admits requests through ingress and holds their coins in escrow
//! 2. At `end_block`, executes each open pool batch: swaps through MatchCore,
//!    then deposits, then withdrawals
//! 3. Emits the [`Transfer`]s the caller applies to its own ledger and one
//!    [`SettlementEvent`] per executed batch
//! 4. Checks escrow against the pending requests before committing
//! 5. At `begin_block`, drops executed requests and opens the next batches
//!
//! ## Atomicity
//!
//! Both hooks stage a copy of the state. A fatal error in any pool discards
//! the copy, so a block either settles every pool or none.
//!
//! [`Transfer`]: ammbatch_types::Transfer
//! [`SettlementEvent`]: ammbatch_types::SettlementEvent

pub mod engine;
pub mod escrow;
pub mod executor;
pub mod idempotency;
pub mod liquidity;
pub mod snapshot;
pub mod transact;

pub use engine::{BlockOutcome, LiquidityEngine, Receipt};
pub use escrow::EscrowLedger;
pub use executor::{PoolExecution, execute_pool_batch};
pub use idempotency::BatchGuard;
pub use liquidity::{
    DepositFill, LiquidityStage, WithdrawFill, deposit_amounts, execute_deposits,
    execute_withdrawals, withdraw_amounts,
};
pub use snapshot::EngineSnapshot;
pub use transact::{SwapSettlement, apply_pool_transfers, refund_swap, transact_and_refund};
