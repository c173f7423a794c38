//! Apply fills to request state.

use std::collections::HashMap;

use ammbatch_types::{
    AmmbatchError, MatchResult, MsgIndex, OrderDirection, Result, SwapMsgState, decimal,
    ensure_non_negative,
};
use rust_decimal::Decimal;
use tracing::error;

use crate::sort_best_first;

/// Virtual reserves after applying every match.
#[derive(Debug, Clone, Default)]
pub struct UpdateOutcome {
    pub x: Decimal,
    pub y: Decimal,
    /// Sum of per-match deltas plus the decimal-error units.
    pub pool_x_delta: Decimal,
    pub pool_y_delta: Decimal,
    /// Whole X units folded into the pool from leftover remainders.
    pub decimal_error_x: Decimal,
    /// Whole Y units folded into the pool from leftover remainders.
    pub decimal_error_y: Decimal,
    /// Requests whose one-unit remainder was folded into the pool.
    pub folded: Vec<MsgIndex>,
}

/// Apply `matches` (both directions) to `msgs` and derive the new virtual
/// reserves from `x`, `y`.
///
/// A request is fully filled when at most one unit would remain. A single
/// leftover unit is moved into the decimal-error accumulator of the offer
/// denomination so the request can be closed.
pub fn update_swap_msg_states(
    x: Decimal,
    y: Decimal,
    msgs: &mut [SwapMsgState],
    x_to_y: &mut [usize],
    y_to_x: &mut [usize],
    matches: &[MatchResult],
) -> Result<UpdateOutcome> {
    sort_best_first(OrderDirection::XtoY, msgs, x_to_y);
    sort_best_first(OrderDirection::YtoX, msgs, y_to_x);

    let positions: HashMap<MsgIndex, usize> = msgs
        .iter()
        .enumerate()
        .map(|(pos, m)| (m.msg_index, pos))
        .collect();

    let mut out = UpdateOutcome::default();

    for m in matches {
        match m.direction {
            OrderDirection::XtoY => {
                out.pool_x_delta = decimal::add(out.pool_x_delta, m.transacted_amount)?;
                out.pool_y_delta = decimal::sub(out.pool_y_delta, m.exchanged_demand_amount)?;
            }
            OrderDirection::YtoX => {
                out.pool_x_delta = decimal::sub(out.pool_x_delta, m.exchanged_demand_amount)?;
                out.pool_y_delta = decimal::add(out.pool_y_delta, m.transacted_amount)?;
            }
        }

        let pos = *positions.get(&m.msg_index).ok_or_else(|| {
            AmmbatchError::invariant(format!("match for unknown request {}", m.msg_index))
        })?;
        let sms = &mut msgs[pos];

        let full_fill = sms.remaining_offer_amount - m.transacted_amount <= Decimal::ONE;
        let transacted = decimal::truncate(m.transacted_amount);
        sms.exchanged_offer_amount += transacted;
        sms.remaining_offer_amount -= transacted;
        sms.reserved_offer_fee -= decimal::truncate(m.offer_fee_amount);
        ensure_non_negative(sms.exchanged_offer_amount, "exchanged offer", sms.msg_index)?;
        ensure_non_negative(sms.remaining_offer_amount, "remaining offer", sms.msg_index)?;
        ensure_non_negative(sms.reserved_offer_fee, "reserved fee", sms.msg_index)?;

        if full_fill {
            if sms.remaining_offer_amount == Decimal::ONE {
                match m.direction {
                    OrderDirection::XtoY => out.decimal_error_x += Decimal::ONE,
                    OrderDirection::YtoX => out.decimal_error_y += Decimal::ONE,
                }
                sms.remaining_offer_amount = Decimal::ZERO;
                out.folded.push(sms.msg_index);
            }
            if !sms.remaining_offer_amount.is_zero()
                || sms.exchanged_offer_amount > sms.request.offer_coin.amount
                || sms.reserved_offer_fee > Decimal::ONE
            {
                error!(
                    msg_index = %sms.msg_index,
                    remaining = %sms.remaining_offer_amount,
                    exchanged = %sms.exchanged_offer_amount,
                    fee = %sms.reserved_offer_fee,
                    "invalid state after full fill"
                );
                return Err(AmmbatchError::invariant(format!(
                    "invalid state after full fill of {}",
                    sms.msg_index
                )));
            }
            sms.succeeded = true;
            sms.to_be_deleted = true;
        } else {
            sms.succeeded = true;
            sms.to_be_deleted = false;
        }
    }

    out.pool_x_delta = decimal::add(out.pool_x_delta, out.decimal_error_x)?;
    out.pool_y_delta = decimal::add(out.pool_y_delta, out.decimal_error_y)?;
    out.x = decimal::add(x, out.pool_x_delta)?;
    out.y = decimal::add(y, out.pool_y_delta)?;
    Ok(out)
}
