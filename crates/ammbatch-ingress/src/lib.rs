//! # ammbatch-ingress
//!
//! **Request admission plane**: validation of swap, deposit, withdraw, and
//! pool-creation requests, and queueing into the current pool batch.
//!
//! ## Architecture
//!
//! Ingress sits between callers and the batch executor:
//! 1. **RequestValidator**: hard gate, checks a request against the pool
//!    and the engine parameters
//! 2. **batch_queue**: assigns the batch message index, computes swap
//!    expiry, and reports the coins to hold in escrow
//!
//! ## Request Flow
//!
//! ```text
//! caller → RequestValidator.validate_*() → enqueue_*() → escrow hold
//!        → end_block → MatchCore
//! ```

pub mod batch_queue;
pub mod validator;

pub use batch_queue::{Queued, enqueue_deposit, enqueue_swap, enqueue_withdraw, order_expiry_height};
pub use validator::RequestValidator;
