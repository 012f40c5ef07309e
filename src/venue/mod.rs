//! Venue collaborator: wire types, API client and the trait seam.
//!
//! This module handles:
//! - Domain types shared with the core (currencies, pairs, orders, balances)
//! - The `Venue` trait the arbitrage core consumes
//! - The coinex HTTP client implementation
//! - Mock venue for testing

pub mod client;
pub mod mock;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::VenueError;

pub use client::CoinexClient;
pub use mock::{MockBehavior, MockVenue};
pub use types::{Balance, Currency, Order, OrderSide, TradePair};

/// Operations the arbitrage core needs from a trading venue.
///
/// The core never talks HTTP directly; it sees exactly these seven
/// operations. `rate` is uniformly the price of one unit of the pair's
/// to-currency denominated in from-currency, and order amounts are
/// denominated in to-currency.
#[async_trait]
pub trait Venue: Send + Sync {
    /// List all currencies known to the venue.
    async fn list_currencies(&self) -> Result<Vec<Arc<Currency>>, VenueError>;

    /// List all tradable pairs.
    async fn list_pairs(&self) -> Result<Vec<Arc<TradePair>>, VenueError>;

    /// Fetch the open orders (both sides) for a pair.
    async fn fetch_order_book(&self, pair_id: u64) -> Result<Vec<Order>, VenueError>;

    /// Fetch the account's balances.
    async fn fetch_balances(&self) -> Result<Vec<Balance>, VenueError>;

    /// Submit an order and return the venue's view of it.
    async fn submit_order(
        &self,
        pair_id: u64,
        amount: Decimal,
        side: OrderSide,
        rate: Decimal,
    ) -> Result<Order, VenueError>;

    /// Query the current status of an own order.
    async fn query_order(&self, order_id: u64) -> Result<Order, VenueError>;

    /// Cancel an own order.
    async fn cancel_order(&self, order_id: u64) -> Result<Order, VenueError>;
}
