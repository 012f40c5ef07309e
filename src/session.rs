//! Trading session: venue handle plus a short-lived balance memo.
//!
//! The memo is single-owner and passed explicitly wherever balance checks
//! happen; it is invalidated after any execution changes balances.

use rust_decimal::Decimal;
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::venue::{Balance, Currency, Venue};

/// A trading session against one venue.
#[derive(Debug)]
pub struct Session<V> {
    venue: V,
    balances: OnceCell<Vec<Balance>>,
}

impl<V: Venue> Session<V> {
    /// Open a session over the given venue.
    pub fn new(venue: V) -> Self {
        Self {
            venue,
            balances: OnceCell::new(),
        }
    }

    /// The underlying venue.
    pub fn venue(&self) -> &V {
        &self.venue
    }

    /// Account balances, fetched once and memoized until invalidated.
    pub async fn balances(&self) -> Result<&[Balance]> {
        let balances = self
            .balances
            .get_or_try_init(|| async { self.venue.fetch_balances().await })
            .await?;
        Ok(balances)
    }

    /// Available (non-held) amount of the given currency; zero if absent.
    pub async fn available(&self, currency: &Currency) -> Result<Decimal> {
        let balances = self.balances().await?;
        Ok(balances
            .iter()
            .find(|b| b.currency_id == currency.id)
            .map(|b| b.amount)
            .unwrap_or(Decimal::ZERO))
    }

    /// Drop the balance memo so the next check fetches fresh data.
    pub fn invalidate_balances(&mut self) {
        self.balances = OnceCell::new();
    }
}
