//! Fill allocation for one side of the book.

use ammbatch_types::{
    AmmbatchError, MatchResult, OrderDirection, Result, SwapMsgState, decimal,
};
use rust_decimal::Decimal;
use tracing::error;

/// Matches for one direction plus the virtual reserve change they imply.
#[derive(Debug, Clone, Default)]
pub struct SideFill {
    pub matches: Vec<MatchResult>,
    pub pool_x_delta: Decimal,
    pub pool_y_delta: Decimal,
}

/// Stable sort of `side` (positions into `msgs`) best price first:
/// descending for buys, ascending for sells.
pub fn sort_best_first(direction: OrderDirection, msgs: &[SwapMsgState], side: &mut [usize]) {
    match direction {
        OrderDirection::XtoY => {
            side.sort_by(|a, b| msgs[*b].order_price().cmp(&msgs[*a].order_price()));
        }
        OrderDirection::YtoX => {
            side.sort_by(|a, b| msgs[*a].order_price().cmp(&msgs[*b].order_price()));
        }
    }
}

/// Allocate `executable_amount` of this side's offer at `swap_price`.
///
/// Orders are walked best price first until one is priced beyond the swap
/// price. Each group of equally priced orders is filled in full while the
/// running total stays under the target; the group that crosses it is
/// filled pro rata.
pub fn find_order_match(
    direction: OrderDirection,
    msgs: &[SwapMsgState],
    side: &mut [usize],
    executable_amount: Decimal,
    swap_price: Decimal,
) -> Result<SideFill> {
    let mut fill = SideFill::default();
    if executable_amount.is_zero() {
        return Ok(fill);
    }
    sort_best_first(direction, msgs, side);

    let mut match_amount = Decimal::ZERO;
    let mut accum_match_amount = Decimal::ZERO;
    let mut group: Vec<usize> = Vec::new();

    for (pos, &i) in side.iter().enumerate() {
        let order = &msgs[i];
        let price = order.order_price();
        let beyond = match direction {
            OrderDirection::XtoY => price < swap_price,
            OrderDirection::YtoX => price > swap_price,
        };
        if beyond {
            break;
        }

        match_amount += order.remaining_offer_amount;
        group.push(i);

        let group_ends = side
            .get(pos + 1)
            .is_none_or(|next| msgs[*next].order_price() != price);
        if !group_ends {
            continue;
        }

        if match_amount > Decimal::ZERO {
            let mut ratio = if accum_match_amount + match_amount >= executable_amount {
                let r = decimal::quo(executable_amount - accum_match_amount, match_amount)?;
                if r > Decimal::ONE {
                    error!(%r, %direction, "fractional match ratio above one");
                    return Err(AmmbatchError::invariant(format!(
                        "fractional match ratio {r} exceeds 1"
                    )));
                }
                r
            } else {
                Decimal::ONE
            };
            if ratio <= Decimal::ZERO {
                ratio = Decimal::ONE;
            }

            for &g in &group {
                let m = fill_one(direction, &msgs[g], ratio, swap_price)?;
                match direction {
                    OrderDirection::XtoY => {
                        fill.pool_x_delta = decimal::add(fill.pool_x_delta, m.transacted_amount)?;
                        fill.pool_y_delta =
                            decimal::sub(fill.pool_y_delta, m.exchanged_demand_amount)?;
                    }
                    OrderDirection::YtoX => {
                        fill.pool_x_delta =
                            decimal::sub(fill.pool_x_delta, m.exchanged_demand_amount)?;
                        fill.pool_y_delta = decimal::add(fill.pool_y_delta, m.transacted_amount)?;
                    }
                }
                fill.matches.push(m);
            }
            accum_match_amount += match_amount;
        }

        match_amount = Decimal::ZERO;
        group.clear();
    }

    Ok(fill)
}

fn fill_one(
    direction: OrderDirection,
    order: &SwapMsgState,
    ratio: Decimal,
    swap_price: Decimal,
) -> Result<MatchResult> {
    let offer_amount = order.remaining_offer_amount;
    // Rounded up so the transacted amount is never lost to truncation.
    let transacted_amount = decimal::ceil(decimal::mul(offer_amount, ratio)?);
    let offer_fee_amount = if offer_amount - transacted_amount <= Decimal::ONE {
        order.reserved_offer_fee
    } else {
        decimal::mul(order.reserved_offer_fee, ratio)?
    };
    let (exchanged_demand_amount, exchanged_fee_amount) = match direction {
        OrderDirection::XtoY => (
            decimal::quo(transacted_amount, swap_price)?,
            decimal::quo(offer_fee_amount, swap_price)?,
        ),
        OrderDirection::YtoX => (
            decimal::mul(transacted_amount, swap_price)?,
            decimal::mul(offer_fee_amount, swap_price)?,
        ),
    };

    if transacted_amount > offer_amount {
        error!(msg_index = %order.msg_index, %transacted_amount, %offer_amount, "over-fill");
        return Err(AmmbatchError::invariant(format!(
            "transacted {transacted_amount} exceeds offer {offer_amount} of {}",
            order.msg_index
        )));
    }
    if offer_fee_amount > offer_amount && offer_fee_amount > Decimal::ONE {
        error!(msg_index = %order.msg_index, %offer_fee_amount, %offer_amount, "fee above offer");
        return Err(AmmbatchError::invariant(format!(
            "offer fee {offer_fee_amount} exceeds offer {offer_amount} of {}",
            order.msg_index
        )));
    }

    Ok(MatchResult {
        direction,
        msg_index: order.msg_index,
        order_price: order.order_price(),
        offer_amount,
        transacted_amount,
        exchanged_demand_amount,
        offer_fee_amount,
        exchanged_fee_amount,
    })
}
