//! Clearing-price search.
//!
//! When the price moves, every resting order price on the far side of the
//! pool price is tried as a candidate clearing price. Each candidate becomes
//! a [`BatchResult`] scenario; infeasible ones are dropped and the survivor
//! is picked by:
//!
//! 1. the first exact match that transacts anything, else
//! 2. the scenario with the strictly greatest transacted amount.
//!
//! When the price stays, the single in-place match is computed directly.

use ammbatch_types::{
    AmmbatchError, BatchResult, MatchType, PriceDirection, Result, decimal,
};
use rust_decimal::Decimal;
use tracing::debug;

use crate::{OrderBook, price_direction};

/// Classify the book against the pool price `x / y` and search for a
/// clearing scenario. `None` means no scenario qualified.
pub fn match_order_book(book: &OrderBook, x: Decimal, y: Decimal) -> Result<Option<BatchResult>> {
    let current_price = decimal::quo(x, y)?;
    let direction = price_direction(book, current_price)?;
    debug!(%current_price, %direction, levels = book.orders().len(), "price direction");
    match direction {
        PriceDirection::Staying => calculate_match_stay(book, current_price).map(Some),
        _ => calculate_match(book, direction, x, y),
    }
}

/// In-place match at the unchanged pool price.
pub fn calculate_match_stay(book: &OrderBook, current_price: Decimal) -> Result<BatchResult> {
    let mut r = BatchResult::no_match(PriceDirection::Staying, current_price);
    let (ex, ey) = book.executable_amounts(current_price);
    r.original_ex = ex;
    r.original_ey = ey;
    r.ex = ex;
    r.ey = ey;

    let s = decimal::mul(current_price, r.ey)?;
    if r.ex.is_zero() || r.ey.is_zero() {
        r.match_type = MatchType::No;
    } else if r.ex == s {
        r.match_type = MatchType::Exact;
    } else {
        r.match_type = MatchType::Fractional;
        if r.ex > s {
            r.ex = s;
        } else {
            r.ey = decimal::quo(r.ex, current_price)?;
        }
    }
    Ok(r)
}

/// Scenario search for a rising or falling price.
pub fn calculate_match(
    book: &OrderBook,
    direction: PriceDirection,
    x: Decimal,
    y: Decimal,
) -> Result<Option<BatchResult>> {
    let current_price = decimal::quo(x, y)?;
    let mut last_order_price = current_price;

    // Walk outward from the pool price.
    let candidates: Vec<Decimal> = match direction {
        PriceDirection::Increasing => book
            .orders()
            .iter()
            .map(|o| o.price)
            .filter(|p| *p >= current_price)
            .collect(),
        PriceDirection::Decreasing => book
            .orders()
            .iter()
            .rev()
            .map(|o| o.price)
            .filter(|p| *p <= current_price)
            .collect(),
        PriceDirection::Staying => {
            return Err(AmmbatchError::Internal(
                "scenario search needs a moving price".into(),
            ));
        }
    };

    let mut scenarios = Vec::with_capacity(candidates.len());
    for order_price in candidates {
        let r = calculate_swap(book, direction, x, y, order_price, last_order_price)?;
        // A resting excess of a whole unit or more is not rounding noise.
        let excess = match direction {
            PriceDirection::Increasing => decimal::sub(r.pool_y, decimal::quo(r.ex, r.swap_price)?)?,
            _ => decimal::sub(r.pool_x, decimal::mul(r.ey, r.swap_price)?)?,
        };
        if excess >= Decimal::ONE {
            continue;
        }
        scenarios.push(r);
        last_order_price = order_price;
    }

    let mut best: Option<BatchResult> = None;
    for s in scenarios {
        let (mex, mey) = book.must_executable_amounts(s.swap_price);
        if s.ex < mex || s.ey < mey {
            continue;
        }
        if s.match_type == MatchType::Exact && s.transact_amount > Decimal::ZERO {
            best = Some(s);
            break;
        }
        let best_amount = best.as_ref().map_or(Decimal::ZERO, |b| b.transact_amount);
        if s.transact_amount > best_amount {
            best = Some(s);
        }
    }

    if let Some(b) = &best {
        debug!(
            swap_price = %b.swap_price,
            match_type = %b.match_type,
            transact = %b.transact_amount,
            "scenario selected"
        );
    }
    Ok(best.map(|mut b| {
        b.price_direction = direction;
        b
    }))
}

/// Evaluate one candidate clearing price `order_price`, coming from
/// `last_order_price`.
///
/// First tries the midpoint between the two: the AMM price
/// `(X + 2EX) / (Y + 2EY)` is an exact match if it lands strictly between
/// them. Otherwise the scenario clears fractionally at `order_price` itself,
/// with executable amounts clamped to what the pool can balance.
pub fn calculate_swap(
    book: &OrderBook,
    direction: PriceDirection,
    x: Decimal,
    y: Decimal,
    order_price: Decimal,
    last_order_price: Decimal,
) -> Result<BatchResult> {
    let two = Decimal::TWO;
    let mut r = BatchResult::no_match(direction, Decimal::ZERO);

    let mid = decimal::quo(decimal::add(last_order_price, order_price)?, two)?;
    let (ex, ey) = book.executable_amounts(mid);
    r.original_ex = ex;
    r.original_ey = ey;
    r.ex = ex;
    r.ey = ey;
    r.swap_price = decimal::quo(
        decimal::add(x, decimal::mul(r.ex, two)?)?,
        decimal::add(y, decimal::mul(r.ey, two)?)?,
    )?;

    let mut match_type = None;
    match direction {
        PriceDirection::Increasing => {
            r.pool_y = pool_y_delta(x, y, r.swap_price)?;
            if last_order_price < r.swap_price
                && r.swap_price < order_price
                && r.pool_y >= Decimal::ZERO
            {
                match_type = Some(exact_or_none(&r));
            }
        }
        PriceDirection::Decreasing => {
            r.pool_x = pool_x_delta(x, y, r.swap_price)?;
            if order_price < r.swap_price
                && r.swap_price < last_order_price
                && r.pool_x >= Decimal::ZERO
            {
                match_type = Some(exact_or_none(&r));
            }
        }
        PriceDirection::Staying => {}
    }

    if let Some(t) = match_type {
        r.match_type = t;
    } else {
        let (ex, ey) = book.executable_amounts(order_price);
        r.original_ex = ex;
        r.original_ey = ey;
        r.ex = ex;
        r.ey = ey;
        r.swap_price = order_price;
        // Pool amounts were truncated, so round the clamps up.
        match direction {
            PriceDirection::Increasing => {
                r.pool_y = pool_y_delta(x, y, r.swap_price)?;
                let ex_cap = decimal::mul(decimal::add(r.ey, r.pool_y)?, r.swap_price)?;
                r.ex = decimal::ceil(r.ex.min(ex_cap));
                let ey_cap = decimal::sub(decimal::quo(r.ex, r.swap_price)?, r.pool_y)?;
                r.ey = decimal::ceil(r.ey.min(ey_cap).max(Decimal::ZERO));
            }
            PriceDirection::Decreasing => {
                r.pool_x = pool_x_delta(x, y, r.swap_price)?;
                let ey_cap = decimal::quo(decimal::add(r.ex, r.pool_x)?, r.swap_price)?;
                r.ey = decimal::ceil(r.ey.min(ey_cap));
                let ex_cap = decimal::sub(decimal::mul(r.ey, r.swap_price)?, r.pool_x)?;
                r.ex = decimal::ceil(r.ex.min(ex_cap).max(Decimal::ZERO));
            }
            PriceDirection::Staying => {}
        }
        r.match_type = MatchType::Fractional;
    }

    let current_price = decimal::quo(x, y)?;
    r.transact_amount = match direction {
        PriceDirection::Increasing => {
            if r.swap_price < current_price || r.pool_y < Decimal::ZERO {
                Decimal::ZERO
            } else {
                r.ex.min(decimal::mul(decimal::add(r.ey, r.pool_y)?, r.swap_price)?)
            }
        }
        PriceDirection::Decreasing => {
            if r.swap_price > current_price || r.pool_x < Decimal::ZERO {
                Decimal::ZERO
            } else {
                r.ey.min(decimal::quo(decimal::add(r.ex, r.pool_x)?, r.swap_price)?)
            }
        }
        PriceDirection::Staying => Decimal::ZERO,
    };
    Ok(r)
}

fn exact_or_none(r: &BatchResult) -> MatchType {
    if r.ex.is_zero() && r.ey.is_zero() {
        MatchType::No
    } else {
        MatchType::Exact
    }
}

/// `(P * Y - X) / 2P`: Y the pool sells when the price rises to `p`.
fn pool_y_delta(x: Decimal, y: Decimal, p: Decimal) -> Result<Decimal> {
    decimal::quo(decimal::sub(decimal::mul(p, y)?, x)?, decimal::mul(p, Decimal::TWO)?)
}

/// `(X - P * Y) / 2`: X the pool sells when the price falls to `p`.
fn pool_x_delta(x: Decimal, y: Decimal, p: Decimal) -> Result<Decimal> {
    decimal::quo(decimal::sub(x, decimal::mul(p, y)?)?, Decimal::TWO)
}
