//! Domain types for currencies, tradable pairs, orders and balances.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A currency listed by the venue.
///
/// Currencies are interned: every pair and balance holds an `Arc` to the
/// single instance loaded for a given id. Equality and hashing are by id.
#[derive(Debug, Clone, Eq)]
pub struct Currency {
    /// Venue-assigned identifier.
    pub id: u64,
    /// Ticker abbreviation (e.g. "BTC").
    pub abbreviation: String,
    /// Human-readable name.
    pub name: String,
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl std::hash::Hash for Currency {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.abbreviation)
    }
}

/// A tradable pair with a fixed direction.
///
/// Trading in both directions goes through the same pair's book,
/// distinguished by order side.
#[derive(Debug, Clone)]
pub struct TradePair {
    /// Venue-assigned identifier.
    pub id: u64,
    /// Currency given up when moving "forward" through the pair.
    pub from_currency: Arc<Currency>,
    /// Currency acquired when moving "forward" through the pair.
    pub to_currency: Arc<Currency>,
}

impl TradePair {
    /// Whether the pair involves the given currency on either side.
    pub fn contains(&self, currency: &Currency) -> bool {
        *self.from_currency == *currency || *self.to_currency == *currency
    }

    /// The pair's currency that is not `currency`, if `currency` is one of
    /// the two and the pair is not a degenerate self-loop.
    pub fn other(&self, currency: &Currency) -> Option<&Arc<Currency>> {
        if *self.from_currency == *self.to_currency {
            return None;
        }
        if *self.from_currency == *currency {
            Some(&self.to_currency)
        } else if *self.to_currency == *currency {
            Some(&self.from_currency)
        } else {
            None
        }
    }
}

/// Which side of the book an order rests on.
///
/// A bid buys the pair's to-currency; an ask sells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buying the pair's to-currency.
    #[strum(serialize = "bid", serialize = "BID")]
    Bid,
    /// Selling the pair's to-currency.
    #[strum(serialize = "ask", serialize = "ASK")]
    Ask,
}

impl OrderSide {
    /// Map the venue's boolean `bid` flag to a side.
    pub fn from_bid_flag(bid: bool) -> Self {
        if bid {
            OrderSide::Bid
        } else {
            OrderSide::Ask
        }
    }

    /// The side a compensating order must take to match this one.
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Bid => OrderSide::Ask,
            OrderSide::Ask => OrderSide::Bid,
        }
    }
}

/// A resting or own order, as last reported by the venue.
///
/// An order is a snapshot; it is not re-fetched to reflect live changes
/// except through explicit status queries.
#[derive(Debug, Clone)]
pub struct Order {
    /// Venue-assigned identifier.
    pub id: u64,
    /// The pair the order trades on.
    pub pair_id: u64,
    /// Book side.
    pub side: OrderSide,
    /// Price of one unit of to-currency, denominated in from-currency.
    pub rate: Decimal,
    /// Order size, denominated in to-currency.
    pub amount: Decimal,
    /// Portion already filled, denominated in to-currency.
    pub filled: Decimal,
    /// Whether the venue cancelled the order.
    pub cancelled: bool,
    /// Whether the order filled completely.
    pub complete: bool,
    /// When the order was placed, if the venue reported it.
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Unfilled remainder, in to-currency units.
    pub fn remaining(&self) -> Decimal {
        self.amount - self.filled
    }

    /// Whether the order can still trade.
    pub fn is_open(&self) -> bool {
        !self.cancelled && !self.complete
    }
}

/// Account holdings for one currency.
#[derive(Debug, Clone)]
pub struct Balance {
    /// Currency id these holdings are denominated in.
    pub currency_id: u64,
    /// Freely available amount.
    pub amount: Decimal,
    /// Amount reserved by open orders.
    pub held: Decimal,
}

impl Balance {
    /// Available plus held.
    pub fn total(&self) -> Decimal {
        self.amount + self.held
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cur(id: u64, abbr: &str) -> Arc<Currency> {
        Arc::new(Currency {
            id,
            abbreviation: abbr.to_string(),
            name: abbr.to_string(),
        })
    }

    #[test]
    fn currency_equality_is_by_id() {
        let a = Currency {
            id: 1,
            abbreviation: "BTC".to_string(),
            name: "Bitcoin".to_string(),
        };
        let b = Currency {
            id: 1,
            abbreviation: "XBT".to_string(),
            name: "Also Bitcoin".to_string(),
        };
        let c = Currency {
            id: 2,
            abbreviation: "BTC".to_string(),
            name: "Bitcoin".to_string(),
        };

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn pair_contains_and_other() {
        let btc = cur(1, "BTC");
        let eth = cur(2, "ETH");
        let ltc = cur(3, "LTC");
        let pair = TradePair {
            id: 10,
            from_currency: btc.clone(),
            to_currency: eth.clone(),
        };

        assert!(pair.contains(&btc));
        assert!(pair.contains(&eth));
        assert!(!pair.contains(&ltc));

        assert_eq!(pair.other(&btc).unwrap().id, eth.id);
        assert_eq!(pair.other(&eth).unwrap().id, btc.id);
        assert!(pair.other(&ltc).is_none());
    }

    #[test]
    fn self_loop_pair_has_no_other() {
        let btc = cur(1, "BTC");
        let pair = TradePair {
            id: 10,
            from_currency: btc.clone(),
            to_currency: btc.clone(),
        };

        assert!(pair.other(&btc).is_none());
    }

    #[test]
    fn order_remaining_and_open() {
        let order = Order {
            id: 1,
            pair_id: 10,
            side: OrderSide::Ask,
            rate: dec!(0.05),
            amount: dec!(8),
            filled: dec!(3),
            cancelled: false,
            complete: false,
            created_at: None,
        };

        assert_eq!(order.remaining(), dec!(5));
        assert!(order.is_open());

        let done = Order {
            complete: true,
            ..order
        };
        assert!(!done.is_open());
    }

    #[test]
    fn side_from_bid_flag() {
        assert_eq!(OrderSide::from_bid_flag(true), OrderSide::Bid);
        assert_eq!(OrderSide::from_bid_flag(false), OrderSide::Ask);
        assert_eq!(OrderSide::Bid.opposite(), OrderSide::Ask);
    }
}
