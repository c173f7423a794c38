//! System-wide constants for the ammbatch engine.

use rust_decimal::Decimal;

/// Fractional digits kept by every fixed-point product and quotient.
pub const DECIMAL_PRECISION: u32 = 18;

/// Largest rounding residue (in whole units) tolerated between the
/// fixed-point computation and integer storage.
///
/// Derived for integer-unit storage at [`DECIMAL_PRECISION`] fractional
/// digits. Re-derive it if either changes.
pub const DECIMAL_ERROR_TOLERANCE: u64 = 1;

/// First message index handed out by every batch queue.
pub const FIRST_MSG_INDEX: u64 = 1;

/// First batch index of a newly created pool.
pub const FIRST_BATCH_INDEX: u64 = 1;

/// Upper bound of `max_buy_price / settlement_price` in a valid order book (1.10).
pub const ORDER_BOOK_MAX_BUY_DEVIATION: Decimal = Decimal::from_parts(110, 0, 0, false, 2);

/// Lower bound of `min_sell_price / settlement_price` in a valid order book (0.90).
pub const ORDER_BOOK_MIN_SELL_DEVIATION: Decimal = Decimal::from_parts(90, 0, 0, false, 2);

/// Default swap fee rate (0.3%), half reserved on the offer side.
pub const DEFAULT_SWAP_FEE_RATE: Decimal = Decimal::from_parts(3, 0, 0, false, 3);

/// Default withdrawal fee rate.
pub const DEFAULT_WITHDRAW_FEE_RATE: Decimal = Decimal::ZERO;

/// Default maximum order size as a fraction of the offered reserve (10%).
pub const DEFAULT_MAX_ORDER_AMOUNT_RATIO: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// Default minimum offer amount for a swap request.
pub const DEFAULT_MIN_OFFER_COIN_AMOUNT: u64 = 100;

/// Default minimum amount of each reserve coin to create or revive a pool.
pub const DEFAULT_MIN_INIT_DEPOSIT_AMOUNT: u64 = 1_000_000;

/// Default pool coins minted on pool creation.
pub const DEFAULT_INIT_POOL_COIN_MINT_AMOUNT: u64 = 1_000_000;

/// Default reserve cap per coin; zero means unlimited.
pub const DEFAULT_MAX_RESERVE_COIN_AMOUNT: u64 = 0;

/// Default number of heights per batch.
pub const DEFAULT_UNIT_BATCH_HEIGHT: u64 = 1;

/// Settled-batch idempotency cache size (number of `(pool, batch)` pairs to remember).
pub const SETTLEMENT_IDEMPOTENCY_CACHE_SIZE: usize = 100_000;

/// Prefix of every pool coin denomination.
pub const POOL_COIN_DENOM_PREFIX: &str = "pool";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "ammbatch";
