//! Pure deterministic batch swap matcher.
//!
//! Takes the active swap requests of one pool batch and the pool's
//! reserves, and decides every fill. No transfers are made here: the
//! caller settles the returned [`SwapMatchOutcome`] against escrow.
//!
//! ```text
//! match_swap_batch(active requests, reserves) -> SwapMatchOutcome
//! ```

use ammbatch_types::{
    BatchIndex, BatchResult, Height, MatchResult, OrderDirection, Pool, Reserves, Result,
    SwapMsgState, decimal,
};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::{
    UpdateOutcome, compute_match_root, find_order_match, invariants, make_order_map,
    match_order_book, price_direction, update_swap_msg_states, validate_state_and_expire_orders,
};

/// Everything decided for one pool batch.
#[derive(Debug, Clone)]
pub struct SwapMatchOutcome {
    pub result: BatchResult,
    /// Whether a clearing scenario was found at a positive price.
    pub found: bool,
    /// X→Y matches (best price first), then Y→X matches.
    pub matches: Vec<MatchResult>,
    /// Virtual reserves and decimal-error accounting after the fills.
    pub update: UpdateOutcome,
    /// Hash over `matches` for replay verification.
    pub match_root: [u8; 32],
}

/// Match one pool batch.
///
/// `msgs` holds the batch's active requests: already marked executed, with
/// expired and invalid requests removed. Their flags and amounts are
/// updated in place.
///
/// ## Algorithm
///
/// 1. Validate request states
/// 2. Build the order book and search for a clearing scenario
/// 3. Allocate fills on both sides and apply them
/// 4. Validate the residual book against the post-match price
/// 5. Flag requests expiring at `height`
///
/// Invariant checks run between the stages when `check_invariants` is set.
/// Any failure is fatal and the caller must discard `msgs`.
#[allow(clippy::too_many_lines)]
pub fn match_swap_batch(
    pool: &Pool,
    batch_index: BatchIndex,
    reserves: Reserves,
    msgs: &mut [SwapMsgState],
    height: Height,
    check_invariants: bool,
) -> Result<SwapMatchOutcome> {
    let (x, y) = (reserves.x, reserves.y);
    let current_price = reserves.price()?;

    // 1. States must be consistent before matching
    validate_state_and_expire_orders(msgs, height, false)?;

    // 2. Order book and scenario
    let (map, mut lists) = make_order_map(msgs, pool.denom_x(), pool.denom_y(), false)?;
    let book = map.into_book();
    let scenario = match_order_book(&book, x, y)?;

    // A stationary price with one side empty reports no match; nothing fills.
    let result = match scenario {
        Some(r) if !r.swap_price.is_zero() && !r.is_no_match() => r,
        _ => {
            let direction = price_direction(&book, current_price)?;
            debug!(pool_id = %pool.id, %current_price, %direction, "no clearing scenario");
            validate_state_and_expire_orders(msgs, height, true)?;
            if check_invariants {
                invariants::execution_state_invariants(msgs, &[], height)?;
            }
            return Ok(SwapMatchOutcome {
                result: BatchResult::no_match(direction, current_price),
                found: false,
                matches: Vec::new(),
                update: UpdateOutcome {
                    x,
                    y,
                    ..UpdateOutcome::default()
                },
                match_root: compute_match_root(pool.id, batch_index, &[]),
            });
        }
    };
    let swap_price = result.swap_price;

    // 3. Fills
    let fill_xy = find_order_match(
        OrderDirection::XtoY,
        msgs,
        &mut lists.x_to_y,
        result.ex,
        swap_price,
    )?;
    let fill_yx = find_order_match(
        OrderDirection::YtoX,
        msgs,
        &mut lists.y_to_x,
        result.ey,
        swap_price,
    )?;
    let fill_x_delta = decimal::add(fill_xy.pool_x_delta, fill_yx.pool_x_delta)?;
    let fill_y_delta = decimal::add(fill_xy.pool_y_delta, fill_yx.pool_y_delta)?;
    let matches: Vec<MatchResult> = fill_xy.matches.into_iter().chain(fill_yx.matches).collect();
    debug!(
        pool_id = %pool.id,
        %swap_price,
        matches = matches.len(),
        %fill_x_delta,
        %fill_y_delta,
        "fills allocated"
    );

    let update = update_swap_msg_states(
        x,
        y,
        msgs,
        &mut lists.x_to_y,
        &mut lists.y_to_x,
        &matches,
    )?;

    if check_invariants {
        let x_to_y: Vec<&SwapMsgState> = lists.x_to_y.iter().map(|&i| &msgs[i]).collect();
        let y_to_x: Vec<&SwapMsgState> = lists.y_to_x.iter().map(|&i| &msgs[i]).collect();
        invariants::swap_matching_invariants(&x_to_y, &y_to_x, &matches)?;
        invariants::swap_price_invariants(&matches, fill_x_delta, fill_y_delta, &update, swap_price)?;
    }

    // 4. Residual book
    validate_state_and_expire_orders(msgs, height, false)?;
    let post_price = last_price(&update)?;
    let (residual, _) = make_order_map(msgs, pool.denom_x(), pool.denom_y(), true)?;
    residual.into_book().check_validity(post_price)?;

    // 5. Expiry
    validate_state_and_expire_orders(msgs, height, true)?;

    if check_invariants {
        invariants::no_duplicate_matches(&matches)?;
        invariants::price_direction_invariant(current_price, &result, &book)?;
        invariants::execution_state_invariants(msgs, &matches, height)?;
    }

    let match_root = compute_match_root(pool.id, batch_index, &matches);
    info!(
        pool_id = %pool.id,
        batch_index = %batch_index,
        match_type = %result.match_type,
        direction = %result.price_direction,
        %swap_price,
        last_price = %post_price,
        matches = matches.len(),
        folded = update.folded.len(),
        "swap batch matched"
    );

    Ok(SwapMatchOutcome {
        result,
        found: true,
        matches,
        update,
        match_root,
    })
}

/// Post-match pool price implied by the virtual reserves.
pub fn last_price(update: &UpdateOutcome) -> Result<Decimal> {
    decimal::quo(update.x, update.y)
}
