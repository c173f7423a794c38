//! Coin amounts.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Asset denomination, e.g. "uatom".
pub type Denom = String;

/// An integral amount of a single denomination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: Denom,
    pub amount: Decimal,
}

impl Coin {
    #[must_use]
    pub fn new(denom: impl Into<Denom>, amount: Decimal) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// A zero amount of `denom`.
    #[must_use]
    pub fn zero(denom: impl Into<Denom>) -> Self {
        Self::new(denom, Decimal::ZERO)
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Order two denominations alphabetically.
#[must_use]
pub fn alphabetical_denom_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_display() {
        let coin = Coin::new("uatom", Decimal::new(1500, 0));
        assert_eq!(coin.to_string(), "1500uatom");
    }

    #[test]
    fn zero_coin_is_not_positive() {
        let coin = Coin::zero("uusd");
        assert!(coin.is_zero());
        assert!(!coin.is_positive());
    }

    #[test]
    fn denom_pair_is_sorted() {
        assert_eq!(alphabetical_denom_pair("uusd", "uatom"), ("uatom", "uusd"));
        assert_eq!(alphabetical_denom_pair("uatom", "uusd"), ("uatom", "uusd"));
    }
}
