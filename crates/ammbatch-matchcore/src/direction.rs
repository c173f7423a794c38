//! Price-direction classification.

use ammbatch_types::{PriceDirection, Result, decimal};
use rust_decimal::Decimal;

use crate::OrderBook;

/// Compare buy and sell pressure against `current_price`.
///
/// Rises when buys above the price outweigh every sell at or below it,
/// falls when sells below the price outweigh every buy at or above it,
/// otherwise stays.
pub fn price_direction(book: &OrderBook, current_price: Decimal) -> Result<PriceDirection> {
    let mut buy_over = Decimal::ZERO;
    let mut buy_at = Decimal::ZERO;
    let mut sell_under = Decimal::ZERO;
    let mut sell_at = Decimal::ZERO;

    for o in book.orders() {
        if o.price > current_price {
            buy_over += o.buy_offer_amount;
        } else if o.price == current_price {
            buy_at += o.buy_offer_amount;
            sell_at += o.sell_offer_amount;
        } else {
            sell_under += o.sell_offer_amount;
        }
    }

    if buy_over > decimal::mul(current_price, sell_under + sell_at)? {
        Ok(PriceDirection::Increasing)
    } else if decimal::mul(current_price, sell_under)? > buy_over + buy_at {
        Ok(PriceDirection::Decreasing)
    } else {
        Ok(PriceDirection::Staying)
    }
}
