//! Arbitrage chains: a closed sequence of exactly three hops.
//!
//! A chain is immutable after construction. Its derived values (ROI,
//! maximum and minimum transferable capital, executability) are computed
//! once against the pass's memoized order books and cached on the instance.
//! A caller that needs fresh market data constructs a fresh chain; the
//! executability memo in particular is stale after any execution changes
//! balances.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::OnceCell;

use crate::arbitrage::exchange::PricedExchange;
use crate::error::{BotError, ChainError, Result};
use crate::session::Session;
use crate::venue::{Currency, Venue};

/// One directed conversion step through a pair's book.
#[derive(Debug, Clone)]
pub struct Hop {
    /// The priced pair this hop trades on.
    pub exchange: Arc<PricedExchange>,
    /// Currency given up.
    pub source: Arc<Currency>,
    /// Currency acquired.
    pub target: Arc<Currency>,
}

/// A closed three-hop currency cycle.
#[derive(Debug)]
pub struct Chain {
    hops: [Hop; 3],
    roi: OnceCell<Option<Decimal>>,
    max_transfer: OnceCell<Option<Decimal>>,
    min_transfer: OnceCell<Option<Decimal>>,
    executable: OnceCell<bool>,
}

impl Chain {
    /// Build a chain from an ordered triple of priced pairs.
    ///
    /// The cycle starts at `ex1`'s from-currency. Construction fails unless
    /// every consecutive hop's pair contains both endpoints of that hop,
    /// the three currencies are distinct, and the third hop returns to the
    /// starting currency. A mismatch is a construction error here, never a
    /// runtime surprise later.
    pub fn new(
        ex1: Arc<PricedExchange>,
        ex2: Arc<PricedExchange>,
        ex3: Arc<PricedExchange>,
    ) -> std::result::Result<Self, ChainError> {
        let construction_error = |a: &PricedExchange, b: &PricedExchange, c: &PricedExchange| {
            ChainError::Construction {
                ex1: a.id(),
                ex2: b.id(),
                ex3: c.id(),
            }
        };

        let cur1 = ex1.from_currency().clone();
        let cur2 = ex1.to_currency().clone();
        if cur1 == cur2 {
            return Err(construction_error(&ex1, &ex2, &ex3));
        }

        let cur3 = ex2
            .other(&cur2)
            .ok_or_else(|| construction_error(&ex1, &ex2, &ex3))?
            .clone();
        if cur3 == cur1 || cur3 == cur2 {
            return Err(construction_error(&ex1, &ex2, &ex3));
        }

        let distinct_pairs = ex1.id() != ex2.id() && ex2.id() != ex3.id() && ex1.id() != ex3.id();
        let closes_loop = ex3.contains(&cur3) && ex3.contains(&cur1);
        if !distinct_pairs || !closes_loop {
            return Err(construction_error(&ex1, &ex2, &ex3));
        }

        let hops = [
            Hop {
                exchange: ex1,
                source: cur1.clone(),
                target: cur2.clone(),
            },
            Hop {
                exchange: ex2,
                source: cur2,
                target: cur3.clone(),
            },
            Hop {
                exchange: ex3,
                source: cur3,
                target: cur1,
            },
        ];

        Ok(Self {
            hops,
            roi: OnceCell::new(),
            max_transfer: OnceCell::new(),
            min_transfer: OnceCell::new(),
            executable: OnceCell::new(),
        })
    }

    /// The three hops in execution order.
    pub fn hops(&self) -> &[Hop; 3] {
        &self.hops
    }

    /// The currency the cycle starts and ends in.
    pub fn start_currency(&self) -> &Arc<Currency> {
        &self.hops[0].source
    }

    /// Render the cycle as `CUR1 -> CUR2 -> CUR3 -> CUR1`.
    pub fn cycle(&self) -> String {
        format!(
            "{:>4} -> {:>4} -> {:>4} -> {:>4}",
            self.hops[0].source.abbreviation,
            self.hops[1].source.abbreviation,
            self.hops[2].source.abbreviation,
            self.hops[0].source.abbreviation,
        )
    }

    /// Whether this chain walks the given currency cycle, in order.
    pub fn is_cycle(&self, c1: &Currency, c2: &Currency, c3: &Currency) -> bool {
        *self.hops[0].source == *c1 && *self.hops[1].source == *c2 && *self.hops[2].source == *c3
    }

    /// Return on investment for one unit of the start currency, net of the
    /// per-hop fee, as a fraction (1.0 = 100%).
    ///
    /// `None` means the chain is not executable: some hop's pre-trade
    /// amount fell below the venue minimum, or a book side was empty. The
    /// result is memoized; later market moves do not change it.
    pub async fn roi(&self, venue: &impl Venue) -> Result<Option<Decimal>> {
        let roi = self
            .roi
            .get_or_try_init(|| self.compute_roi(venue))
            .await?;
        Ok(*roi)
    }

    async fn compute_roi(&self, venue: &impl Venue) -> Result<Option<Decimal>> {
        let mut amount = Decimal::ONE;
        for hop in &self.hops {
            if !hop
                .exchange
                .is_enough(venue, amount, &hop.source)
                .await?
            {
                return Ok(None);
            }
            let Some(converted) = hop.exchange.convert(venue, amount, &hop.target).await? else {
                return Ok(None);
            };
            amount = converted * hop.exchange.fee_keep();
        }
        Ok(Some(amount - Decimal::ONE))
    }

    /// Maximum amount of the start currency that can flow through the whole
    /// chain without any hop's tied-best-rate depth becoming the
    /// bottleneck. Memoized; `None` when any hop has no usable offer.
    pub async fn max_transfer(&self, venue: &impl Venue) -> Result<Option<Decimal>> {
        let max = self
            .max_transfer
            .get_or_try_init(|| self.compute_max_transfer(venue))
            .await?;
        Ok(*max)
    }

    async fn compute_max_transfer(&self, venue: &impl Venue) -> Result<Option<Decimal>> {
        // factor: start-currency units -> this hop's source units, through
        // the fee-adjusted conversions of every prior hop.
        let mut factor = Decimal::ONE;
        let mut limit: Option<Decimal> = None;

        for hop in &self.hops {
            let Some(capacity) = hop.exchange.max_capacity(venue, &hop.target).await? else {
                return Ok(None);
            };
            let in_start_units = capacity / factor;
            limit = Some(match limit {
                Some(current) => current.min(in_start_units),
                None => in_start_units,
            });

            let Some(per_unit) = hop
                .exchange
                .convert(venue, Decimal::ONE, &hop.target)
                .await?
            else {
                return Ok(None);
            };
            factor *= per_unit * hop.exchange.fee_keep();
        }
        Ok(limit)
    }

    /// Smallest amount of the start currency for which every hop still
    /// clears the venue's minimum order size. The binding constraint is
    /// whichever hop demands the most start currency. Memoized.
    pub async fn min_transfer(&self, venue: &impl Venue) -> Result<Option<Decimal>> {
        let min = self
            .min_transfer
            .get_or_try_init(|| self.compute_min_transfer(venue))
            .await?;
        Ok(*min)
    }

    async fn compute_min_transfer(&self, venue: &impl Venue) -> Result<Option<Decimal>> {
        let mut factor = Decimal::ONE;
        let mut required: Option<Decimal> = None;

        for hop in &self.hops {
            let floor = match self.hop_floor(venue, hop).await? {
                Some(floor) => floor,
                None => return Ok(None),
            };
            let in_start_units = floor / factor;
            required = Some(match required {
                Some(current) => current.max(in_start_units),
                None => in_start_units,
            });

            let Some(per_unit) = hop
                .exchange
                .convert(venue, Decimal::ONE, &hop.target)
                .await?
            else {
                return Ok(None);
            };
            factor *= per_unit * hop.exchange.fee_keep();
        }
        Ok(required)
    }

    /// Minimum viable input for one hop, in the hop's source currency.
    ///
    /// The venue floor is denominated in the pair's to-currency; a hop
    /// entered from the from-currency side pays the ask rate to express it.
    async fn hop_floor(&self, venue: &impl Venue, hop: &Hop) -> Result<Option<Decimal>> {
        let pair = hop.exchange.pair();
        let min = hop.exchange.min_trade_size();
        if *hop.source == *pair.to_currency {
            return Ok(Some(min));
        }
        let Some(offer) = hop.exchange.best_offer(venue, &pair.to_currency).await? else {
            return Ok(None);
        };
        Ok(Some(min * offer.rate))
    }

    /// Whether the chain can actually be executed: capacity window open
    /// (`max_transfer > min_transfer`) and a positive available balance of
    /// the start currency.
    ///
    /// Memoized for the lifetime of the instance; stale once an execution
    /// changes balances: invalidate the session memo and rebuild chains.
    pub async fn can_execute<V: Venue>(&self, session: &Session<V>) -> Result<bool> {
        let executable = self
            .executable
            .get_or_try_init(|| async {
                let max = self.max_transfer(session.venue()).await?;
                let min = self.min_transfer(session.venue()).await?;
                let (Some(max), Some(min)) = (max, min) else {
                    return Ok::<bool, BotError>(false);
                };
                if max <= min {
                    return Ok(false);
                }
                let balance = session.available(self.start_currency()).await?;
                Ok(balance > Decimal::ZERO)
            })
            .await?;
        Ok(*executable)
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.cycle())
    }
}
