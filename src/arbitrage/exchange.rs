//! Priced view of a trade pair.
//!
//! Wraps a `TradePair` with a memoized order-book fetch and the fee-aware
//! conversion arithmetic the chain evaluator builds on. Composition over the
//! raw pair: the wrapper owns only its memo, never venue state.
//!
//! Rate convention, applied uniformly: `rate` is the price of one unit of
//! the pair's to-currency denominated in from-currency, and order amounts
//! are denominated in to-currency. Trading into the to-currency matches the
//! lowest ask and divides by its rate; trading into the from-currency
//! matches the highest bid and multiplies.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::OnceCell;

use crate::error::{ChainError, Result};
use crate::venue::{Currency, Order, OrderSide, TradePair, Venue};

/// A trade pair with memoized pricing.
///
/// The book is fetched on first use and reused for the lifetime of the
/// instance, which is one discovery pass; a new pass builds new wrappers.
#[derive(Debug)]
pub struct PricedExchange {
    pair: Arc<TradePair>,
    fee_rate: Decimal,
    min_trade_size: Decimal,
    orders: OnceCell<Vec<Order>>,
}

impl PricedExchange {
    /// Wrap a pair with the venue's fee rate and minimum order size.
    pub fn new(pair: Arc<TradePair>, fee_rate: Decimal, min_trade_size: Decimal) -> Self {
        Self {
            pair,
            fee_rate,
            min_trade_size,
            orders: OnceCell::new(),
        }
    }

    /// The wrapped pair.
    pub fn pair(&self) -> &Arc<TradePair> {
        &self.pair
    }

    /// The wrapped pair's id.
    pub fn id(&self) -> u64 {
        self.pair.id
    }

    /// The pair's from-currency.
    pub fn from_currency(&self) -> &Arc<Currency> {
        &self.pair.from_currency
    }

    /// The pair's to-currency.
    pub fn to_currency(&self) -> &Arc<Currency> {
        &self.pair.to_currency
    }

    /// Whether the pair involves the given currency.
    pub fn contains(&self, currency: &Currency) -> bool {
        self.pair.contains(currency)
    }

    /// The pair's currency that is not `currency`.
    pub fn other(&self, currency: &Currency) -> Option<&Arc<Currency>> {
        self.pair.other(currency)
    }

    /// Multiplicative factor kept after this hop's fee.
    pub fn fee_keep(&self) -> Decimal {
        Decimal::ONE - self.fee_rate
    }

    /// Venue minimum order size, in to-currency units.
    pub fn min_trade_size(&self) -> Decimal {
        self.min_trade_size
    }

    /// The book side that trades into `target`.
    fn side_into(&self, target: &Currency) -> std::result::Result<OrderSide, ChainError> {
        if *target == *self.pair.to_currency {
            Ok(OrderSide::Ask)
        } else if *target == *self.pair.from_currency {
            Ok(OrderSide::Bid)
        } else {
            Err(ChainError::UnsupportedCurrency {
                pair_id: self.pair.id,
                currency: target.abbreviation.clone(),
            })
        }
    }

    /// The pair's open orders, fetched once per instance.
    ///
    /// Closed orders, zero rates and dust remainders are dropped at the
    /// door so the pricing arithmetic never sees them.
    pub async fn orders(&self, venue: &impl Venue) -> Result<&[Order]> {
        let orders = self
            .orders
            .get_or_try_init(|| async {
                let mut orders = venue.fetch_order_book(self.pair.id).await?;
                orders.retain(|o| {
                    o.is_open() && o.rate > Decimal::ZERO && o.remaining() > Decimal::ZERO
                });
                Ok::<_, crate::error::VenueError>(orders)
            })
            .await?;
        Ok(orders)
    }

    /// Best resting order that trades into `target`: the lowest ask when
    /// `target` is the to-currency, the highest bid when it is the
    /// from-currency. `None` when that book side is empty.
    pub async fn best_offer(
        &self,
        venue: &impl Venue,
        target: &Currency,
    ) -> Result<Option<Order>> {
        let side = self.side_into(target)?;
        let orders = self.orders(venue).await?;
        let best = match side {
            OrderSide::Ask => orders
                .iter()
                .filter(|o| o.side == OrderSide::Ask)
                .min_by(|a, b| a.rate.cmp(&b.rate)),
            OrderSide::Bid => orders
                .iter()
                .filter(|o| o.side == OrderSide::Bid)
                .max_by(|a, b| a.rate.cmp(&b.rate)),
        };
        Ok(best.cloned())
    }

    /// Express `amount` in `target` units at the best available rate.
    ///
    /// Does not apply the transaction fee; fee compounding across hops is
    /// the caller's concern. `None` when no offer exists on the needed side.
    pub async fn convert(
        &self,
        venue: &impl Venue,
        amount: Decimal,
        target: &Currency,
    ) -> Result<Option<Decimal>> {
        let Some(offer) = self.best_offer(venue, target).await? else {
            return Ok(None);
        };
        let converted = if *target == *self.pair.to_currency {
            amount / offer.rate
        } else {
            amount * offer.rate
        };
        Ok(Some(converted))
    }

    /// Whether `amount` of `currency` clears the venue's minimum order
    /// size, converting into to-currency units first when needed.
    ///
    /// An amount that fails this check makes a whole chain non-executable,
    /// not merely unprofitable.
    pub async fn is_enough(
        &self,
        venue: &impl Venue,
        amount: Decimal,
        currency: &Currency,
    ) -> Result<bool> {
        if *currency == *self.pair.to_currency {
            return Ok(amount >= self.min_trade_size);
        }
        // side_into also rejects currencies outside the pair
        self.side_into(currency)?;
        match self.convert(venue, amount, &self.pair.to_currency).await? {
            Some(in_to_units) => Ok(in_to_units >= self.min_trade_size),
            None => Ok(false),
        }
    }

    /// Maximum amount of the pair's *other* (source) currency absorbed by
    /// every order tied at the single best rate for `target`, net of fee.
    ///
    /// Orders are side-filtered before any rate comparison; bid and ask
    /// rates are never compared against each other. `None` when the needed
    /// side is empty.
    pub async fn max_capacity(
        &self,
        venue: &impl Venue,
        target: &Currency,
    ) -> Result<Option<Decimal>> {
        let side = self.side_into(target)?;
        let Some(best) = self.best_offer(venue, target).await? else {
            return Ok(None);
        };

        let orders = self.orders(venue).await?;
        let tied_total: Decimal = orders
            .iter()
            .filter(|o| o.side == side && o.rate == best.rate)
            .map(Order::remaining)
            .sum();

        let absorbed = match side {
            // Asks sell to-currency sized in to-units; the source currency
            // absorbed is from-currency, worth remaining * rate.
            OrderSide::Ask => tied_total * best.rate,
            // Bids buy to-currency sized in to-units; the source currency
            // absorbed is the to-currency itself.
            OrderSide::Bid => tied_total,
        };
        Ok(Some(absorbed * self.fee_keep()))
    }
}
