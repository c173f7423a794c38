//! Price-level order book built from a pool's pending swap requests.
//!
//! Requests are bucketed by order price into [`Order`]s keyed by the
//! normalized `Decimal` (so `1.10` and `1.1` share a level). Each level
//! aggregates the remaining offer of X-offering requests (buys) and
//! Y-offering requests (sells), plus the message indices that fed it.

use std::collections::BTreeMap;

use ammbatch_types::{
    AmmbatchError, MsgIndex, Result, SwapMsgState, constants, decimal,
};
use rust_decimal::Decimal;

/// One price level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub price: Decimal,
    /// Remaining X offered by buy requests at this price.
    pub buy_offer_amount: Decimal,
    /// Remaining Y offered by sell requests at this price.
    pub sell_offer_amount: Decimal,
    pub msg_indices: Vec<MsgIndex>,
}

impl Order {
    fn new(price: Decimal) -> Self {
        Self {
            price,
            buy_offer_amount: Decimal::ZERO,
            sell_offer_amount: Decimal::ZERO,
            msg_indices: Vec::new(),
        }
    }
}

/// Price levels keyed by normalized price.
#[derive(Debug, Clone, Default)]
pub struct OrderMap {
    levels: BTreeMap<Decimal, Order>,
}

impl OrderMap {
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level at `price`, if any.
    #[must_use]
    pub fn get(&self, price: Decimal) -> Option<&Order> {
        self.levels.get(&price.normalize())
    }

    /// Ascending order book.
    #[must_use]
    pub fn into_book(self) -> OrderBook {
        OrderBook {
            orders: self.levels.into_values().collect(),
        }
    }
}

/// Requests split by direction. Entries are positions in the input slice,
/// in received order.
#[derive(Debug, Clone, Default)]
pub struct DirectionLists {
    pub x_to_y: Vec<usize>,
    pub y_to_x: Vec<usize>,
}

/// Bucket `msgs` into price levels and split them by direction.
///
/// With `only_not_matched`, requests already flagged for deletion or with
/// nothing left to trade are skipped. An offer in a denomination other than
/// `denom_x`/`denom_y` is an [`AmmbatchError::InvalidDenom`]. Per-side
/// totals are checked here, so every partial sum over the book fits.
pub fn make_order_map(
    msgs: &[SwapMsgState],
    denom_x: &str,
    denom_y: &str,
    only_not_matched: bool,
) -> Result<(OrderMap, DirectionLists)> {
    let mut map = OrderMap::default();
    let mut lists = DirectionLists::default();
    let (mut total_buy, mut total_sell) = (Decimal::ZERO, Decimal::ZERO);

    for (pos, m) in msgs.iter().enumerate() {
        if only_not_matched && (m.to_be_deleted || m.remaining_offer_amount.is_zero()) {
            continue;
        }
        let key = m.order_price().normalize();
        let offer = m.offer_denom();
        let is_buy = if offer == denom_x {
            true
        } else if offer == denom_y {
            false
        } else {
            return Err(AmmbatchError::InvalidDenom {
                denom: offer.to_string(),
            });
        };

        let order = map.levels.entry(key).or_insert_with(|| Order::new(key));
        if is_buy {
            total_buy = decimal::add(total_buy, m.remaining_offer_amount)?;
            order.buy_offer_amount += m.remaining_offer_amount;
            lists.x_to_y.push(pos);
        } else {
            total_sell = decimal::add(total_sell, m.remaining_offer_amount)?;
            order.sell_offer_amount += m.remaining_offer_amount;
            lists.y_to_x.push(pos);
        }
        order.msg_indices.push(m.msg_index);
    }

    Ok((map, lists))
}

/// Price levels sorted ascending by price.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    orders: Vec<Order>,
}

impl OrderBook {
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Buy amount at or above `price` and sell amount at or below it.
    #[must_use]
    pub fn executable_amounts(&self, price: Decimal) -> (Decimal, Decimal) {
        let mut ex = Decimal::ZERO;
        let mut ey = Decimal::ZERO;
        for o in &self.orders {
            if o.price >= price {
                ex += o.buy_offer_amount;
            }
            if o.price <= price {
                ey += o.sell_offer_amount;
            }
        }
        (ex, ey)
    }

    /// Buy amount strictly above `price` and sell amount strictly below it.
    ///
    /// Any scenario clearing at `price` must execute at least these.
    #[must_use]
    pub fn must_executable_amounts(&self, price: Decimal) -> (Decimal, Decimal) {
        let mut ex = Decimal::ZERO;
        let mut ey = Decimal::ZERO;
        for o in &self.orders {
            if o.price > price {
                ex += o.buy_offer_amount;
            }
            if o.price < price {
                ey += o.sell_offer_amount;
            }
        }
        (ex, ey)
    }

    /// Highest price with resting buys, lowest price with resting sells.
    #[must_use]
    pub fn extremes(&self) -> (Decimal, Option<Decimal>) {
        let max_buy = self
            .orders
            .iter()
            .filter(|o| o.buy_offer_amount > Decimal::ZERO)
            .map(|o| o.price)
            .max()
            .unwrap_or(Decimal::ZERO);
        let min_sell = self
            .orders
            .iter()
            .filter(|o| o.sell_offer_amount > Decimal::ZERO)
            .map(|o| o.price)
            .min();
        (max_buy, min_sell)
    }

    /// Whether the book is uncrossed and within the allowed deviation of
    /// `current_price`.
    ///
    /// Valid means `max_buy <= min_sell`, `max_buy / price <= 1.10` and
    /// `min_sell / price >= 0.90`. A non-positive price is never valid.
    pub fn validate(&self, current_price: Decimal) -> Result<bool> {
        if current_price <= Decimal::ZERO {
            return Ok(false);
        }
        let (max_buy, min_sell) = self.extremes();
        if let Some(min_sell) = min_sell {
            if max_buy > min_sell {
                return Ok(false);
            }
            if decimal::quo(min_sell, current_price)? < constants::ORDER_BOOK_MIN_SELL_DEVIATION {
                return Ok(false);
            }
        }
        Ok(decimal::quo(max_buy, current_price)? <= constants::ORDER_BOOK_MAX_BUY_DEVIATION)
    }

    /// [`OrderBook::validate`] as a fatal error.
    pub fn check_validity(&self, current_price: Decimal) -> Result<()> {
        if self.validate(current_price)? {
            return Ok(());
        }
        let (max_buy, min_sell) = self.extremes();
        Err(AmmbatchError::OrderBookInvalidity {
            price: current_price,
            max_buy,
            min_sell,
        })
    }
}
