//! Post-match invariant checks.
//!
//! Every check returns a fatal [`AmmbatchError`] on violation and logs the
//! offending values at `error!` first. They are run by the matcher when
//! `PoolParams::invariant_checks` is set.

use std::collections::HashSet;

use ammbatch_types::{
    AmmbatchError, BatchResult, Height, MatchResult, MsgIndex, OrderDirection, PriceDirection,
    Result, SwapMsgState, constants::DECIMAL_ERROR_TOLERANCE, count_not_matched, decimal,
};
use rust_decimal::Decimal;
use tracing::error;

use crate::{OrderBook, UpdateOutcome};

/// Whether every match converts at `swap_price` within the decimal-error
/// tolerance. Trivially true with no matches; false at a zero price.
pub fn check_swap_price(matches: &[MatchResult], swap_price: Decimal) -> Result<bool> {
    if matches.is_empty() {
        return Ok(true);
    }
    if swap_price.is_zero() {
        return Ok(false);
    }
    let tolerance = Decimal::from(DECIMAL_ERROR_TOLERANCE);
    for m in matches {
        let expected = match m.direction {
            OrderDirection::XtoY => decimal::quo(m.transacted_amount, swap_price)?,
            OrderDirection::YtoX => decimal::mul(m.transacted_amount, swap_price)?,
        };
        if (expected - m.exchanged_demand_amount).abs() > tolerance {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Reserve movement must be explained by the matches plus the folded
/// decimal-error units, and every match must convert at the swap price.
///
/// `fill_x_delta`/`fill_y_delta` are the deltas reported by the allocator.
pub fn swap_price_invariants(
    matches: &[MatchResult],
    fill_x_delta: Decimal,
    fill_y_delta: Decimal,
    update: &UpdateOutcome,
    swap_price: Decimal,
) -> Result<()> {
    let mut sum_x = Decimal::ZERO;
    let mut sum_y = Decimal::ZERO;
    for m in matches {
        match m.direction {
            OrderDirection::XtoY => {
                sum_x += m.transacted_amount;
                sum_y -= m.exchanged_demand_amount;
            }
            OrderDirection::YtoX => {
                sum_x -= m.exchanged_demand_amount;
                sum_y += m.transacted_amount;
            }
        }
    }

    let residual_x = update.pool_x_delta - sum_x;
    let residual_y = update.pool_y_delta - sum_y;
    if residual_x != update.decimal_error_x || residual_y != update.decimal_error_y {
        error!(
            %residual_x, %residual_y,
            error_x = %update.decimal_error_x,
            error_y = %update.decimal_error_y,
            "reserve residual not explained by decimal error"
        );
        return Err(AmmbatchError::invariant(format!(
            "reserve residual ({residual_x}, {residual_y}) differs from decimal error ({}, {})",
            update.decimal_error_x, update.decimal_error_y
        )));
    }

    if fill_x_delta != sum_x || fill_y_delta != sum_y {
        error!(%fill_x_delta, %fill_y_delta, %sum_x, %sum_y, "allocator deltas disagree");
        return Err(AmmbatchError::invariant(
            "allocator deltas disagree with match results",
        ));
    }

    if !check_swap_price(matches, swap_price)? {
        error!(%swap_price, matches = matches.len(), "match converts outside tolerance");
        return Err(AmmbatchError::invariant(format!(
            "match does not convert at swap price {swap_price}"
        )));
    }
    Ok(())
}

/// Every request on a side is either matched once or left unmatched.
pub fn swap_matching_invariants(
    x_to_y: &[&SwapMsgState],
    y_to_x: &[&SwapMsgState],
    matches: &[MatchResult],
) -> Result<()> {
    let matched_xy = matches
        .iter()
        .filter(|m| m.direction == OrderDirection::XtoY)
        .count();
    let matched_yx = matches.len() - matched_xy;
    let unmatched_xy = count_not_matched(x_to_y);
    let unmatched_yx = count_not_matched(y_to_x);

    if x_to_y.len() != matched_xy + unmatched_xy || y_to_x.len() != matched_yx + unmatched_yx {
        error!(
            x_to_y = x_to_y.len(), matched_xy, unmatched_xy,
            y_to_x = y_to_x.len(), matched_yx, unmatched_yx,
            "match count mismatch"
        );
        return Err(AmmbatchError::invariant("match count mismatch"));
    }
    Ok(())
}

/// The clearing price moves the way the direction says, and no further
/// than the resting orders that carry it: a rising price stays at or below
/// the highest buy, a falling one at or above the lowest sell.
pub fn price_direction_invariant(
    current_price: Decimal,
    result: &BatchResult,
    book: &OrderBook,
) -> Result<()> {
    let (max_buy, min_sell) = book.extremes();
    let ok = match result.price_direction {
        PriceDirection::Increasing => {
            result.swap_price >= current_price && result.swap_price <= max_buy
        }
        PriceDirection::Decreasing => {
            result.swap_price <= current_price
                && min_sell.is_some_and(|sell| result.swap_price >= sell)
        }
        PriceDirection::Staying => result.swap_price == current_price,
    };
    if !ok {
        error!(
            %current_price,
            swap_price = %result.swap_price,
            direction = %result.price_direction,
            %max_buy,
            min_sell = ?min_sell,
            "swap price outside its bounds"
        );
        return Err(AmmbatchError::invariant(format!(
            "swap price {} {} from {current_price} beyond the resting orders",
            result.swap_price, result.price_direction
        )));
    }
    Ok(())
}

/// Flags of the active requests must agree with the match results at
/// `height`, after expiry flagging.
pub fn execution_state_invariants(
    msgs: &[SwapMsgState],
    matches: &[MatchResult],
    height: Height,
) -> Result<()> {
    let matched: HashSet<MsgIndex> = matches.iter().map(|m| m.msg_index).collect();
    for m in msgs {
        let was_matched = matched.contains(&m.msg_index);
        let reason = if !m.executed {
            Some("not executed")
        } else if was_matched != m.succeeded {
            Some("succeeded flag disagrees with match results")
        } else if m.remaining_offer_amount.is_zero() && !m.to_be_deleted {
            Some("filled request not flagged for deletion")
        } else if !m.remaining_offer_amount.is_zero()
            && m.to_be_deleted
            && m.order_expiry_height != height
        {
            Some("open request flagged for deletion before expiry")
        } else if !m.remaining_offer_amount.is_zero()
            && !m.to_be_deleted
            && m.order_expiry_height <= height
        {
            Some("expired request carried over")
        } else {
            None
        };
        if let Some(reason) = reason {
            error!(
                msg_index = %m.msg_index,
                was_matched,
                succeeded = m.succeeded,
                to_be_deleted = m.to_be_deleted,
                remaining = %m.remaining_offer_amount,
                expiry = m.order_expiry_height,
                %height,
                "execution state invariant: {reason}"
            );
            return Err(AmmbatchError::invariant(format!(
                "request {}: {reason}",
                m.msg_index
            )));
        }
    }
    Ok(())
}

/// No request may be matched twice in one batch.
pub fn no_duplicate_matches(matches: &[MatchResult]) -> Result<()> {
    let mut seen = HashSet::with_capacity(matches.len());
    for m in matches {
        if !seen.insert(m.msg_index) {
            error!(msg_index = %m.msg_index, "duplicate match");
            return Err(AmmbatchError::invariant(format!(
                "request {} matched twice",
                m.msg_index
            )));
        }
    }
    Ok(())
}
