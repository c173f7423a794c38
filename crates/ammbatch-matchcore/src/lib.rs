//! # ammbatch-matchcore
//!
//! **Pure deterministic batch swap matching for ammbatch.**
//!
//! MatchCore is the compute plane: it takes one pool batch of escrowed swap
//! requests plus the pool reserves, and decides a single clearing price and
//! every fill. It has:
//!
//! - **Zero side effects**: no transfers, no escrow, no persistence
//! - **Deterministic output**: same input -> same fills and match root on
//!   every replica
//! - **Pool liquidity**: the constant-product pool absorbs the imbalance
//!   between the buy and sell sides at the clearing price
//! - **Fatal invariants**: broken matching state surfaces as an error, never
//!   a partially applied batch

pub mod determinism;
pub mod direction;
pub mod expiry;
pub mod fill;
pub mod invariants;
pub mod matcher;
pub mod orderbook;
pub mod scenario;
pub mod update;

pub use determinism::{compute_match_root, ensure_match_root, verify_match_root};
pub use direction::price_direction;
pub use expiry::validate_state_and_expire_orders;
pub use fill::{SideFill, find_order_match, sort_best_first};
pub use matcher::{SwapMatchOutcome, last_price, match_swap_batch};
pub use orderbook::{DirectionLists, Order, OrderBook, OrderMap, make_order_map};
pub use scenario::{calculate_match, calculate_match_stay, calculate_swap, match_order_book};
pub use update::{UpdateOutcome, update_swap_msg_states};
