//! Mock venue for unit testing.
//!
//! Provides an in-memory `Venue` implementation so the discovery, evaluation
//! and execution paths can be tested without network access.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::error::VenueError;
use crate::venue::types::{Balance, Currency, Order, OrderSide, TradePair};
use crate::venue::Venue;

/// Configuration for mock venue behavior.
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// Whether order-book fetches fail.
    pub fail_order_book: bool,
    /// Whether balance fetches fail.
    pub fail_balances: bool,
    /// Fail the Nth submission attempt (1-based).
    pub fail_submit_attempt: Option<usize>,
    /// Submitted orders settle after this many status polls (0 = instantly).
    pub settle_after_polls: u32,
    /// Report submitted orders as cancelled after this many status polls.
    pub cancel_after_polls: Option<u32>,
}

#[derive(Debug, Default)]
struct MockState {
    currencies: Vec<Arc<Currency>>,
    pairs: Vec<Arc<TradePair>>,
    books: HashMap<u64, Vec<Order>>,
    balances: Vec<Balance>,
    own_orders: HashMap<u64, Order>,
    poll_counts: HashMap<u64, u32>,
    submitted: Vec<Order>,
    submit_attempts: usize,
    balance_fetches: usize,
    next_order_id: u64,
    behavior: MockBehavior,
}

/// In-memory mock venue.
#[derive(Debug, Clone)]
pub struct MockVenue {
    state: Arc<Mutex<MockState>>,
}

impl MockVenue {
    /// Create an empty mock venue.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                next_order_id: 1_000,
                ..Default::default()
            })),
        }
    }

    /// Create a mock venue with custom behavior.
    pub fn with_behavior(behavior: MockBehavior) -> Self {
        let venue = Self::new();
        venue.state.lock().unwrap().behavior = behavior;
        venue
    }

    /// Replace the behavior flags.
    pub fn set_behavior(&self, behavior: MockBehavior) {
        self.state.lock().unwrap().behavior = behavior;
    }

    /// Register a currency and return its interned handle.
    pub fn add_currency(&self, id: u64, abbreviation: &str) -> Arc<Currency> {
        let currency = Arc::new(Currency {
            id,
            abbreviation: abbreviation.to_string(),
            name: abbreviation.to_string(),
        });
        self.state.lock().unwrap().currencies.push(currency.clone());
        currency
    }

    /// Register a trade pair between two already-registered currencies.
    pub fn add_pair(&self, id: u64, from: &Arc<Currency>, to: &Arc<Currency>) -> Arc<TradePair> {
        let pair = Arc::new(TradePair {
            id,
            from_currency: from.clone(),
            to_currency: to.clone(),
        });
        self.state.lock().unwrap().pairs.push(pair.clone());
        pair
    }

    /// Add a resting ask (selling the pair's to-currency) to a pair's book.
    pub fn add_ask(&self, pair: &TradePair, rate: Decimal, amount: Decimal) -> u64 {
        self.add_resting(pair.id, OrderSide::Ask, rate, amount)
    }

    /// Add a resting bid (buying the pair's to-currency) to a pair's book.
    pub fn add_bid(&self, pair: &TradePair, rate: Decimal, amount: Decimal) -> u64 {
        self.add_resting(pair.id, OrderSide::Bid, rate, amount)
    }

    fn add_resting(&self, pair_id: u64, side: OrderSide, rate: Decimal, amount: Decimal) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.next_order_id += 1;
        let id = state.next_order_id;
        state.books.entry(pair_id).or_default().push(Order {
            id,
            pair_id,
            side,
            rate,
            amount,
            filled: Decimal::ZERO,
            cancelled: false,
            complete: false,
            created_at: Some(Utc::now()),
        });
        id
    }

    /// Replace a pair's order book wholesale.
    pub fn set_order_book(&self, pair_id: u64, orders: Vec<Order>) {
        self.state.lock().unwrap().books.insert(pair_id, orders);
    }

    /// Set the account balance for a currency.
    pub fn set_balance(&self, currency: &Currency, amount: Decimal, held: Decimal) {
        let mut state = self.state.lock().unwrap();
        state.balances.retain(|b| b.currency_id != currency.id);
        state.balances.push(Balance {
            currency_id: currency.id,
            amount,
            held,
        });
    }

    /// Orders successfully accepted by `submit_order`, in submission order.
    pub fn submitted_orders(&self) -> Vec<Order> {
        self.state.lock().unwrap().submitted.clone()
    }

    /// Total `submit_order` attempts, including rejected ones.
    pub fn submit_attempts(&self) -> usize {
        self.state.lock().unwrap().submit_attempts
    }

    /// Total `fetch_balances` calls served.
    pub fn balance_fetches(&self) -> usize {
        self.state.lock().unwrap().balance_fetches
    }
}

impl Default for MockVenue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Venue for MockVenue {
    async fn list_currencies(&self) -> Result<Vec<Arc<Currency>>, VenueError> {
        Ok(self.state.lock().unwrap().currencies.clone())
    }

    async fn list_pairs(&self) -> Result<Vec<Arc<TradePair>>, VenueError> {
        Ok(self.state.lock().unwrap().pairs.clone())
    }

    async fn fetch_order_book(&self, pair_id: u64) -> Result<Vec<Order>, VenueError> {
        let state = self.state.lock().unwrap();
        if state.behavior.fail_order_book {
            return Err(VenueError::Decode("mock order book failure".to_string()));
        }
        Ok(state.books.get(&pair_id).cloned().unwrap_or_default())
    }

    async fn fetch_balances(&self) -> Result<Vec<Balance>, VenueError> {
        let mut state = self.state.lock().unwrap();
        if state.behavior.fail_balances {
            return Err(VenueError::Decode("mock balance failure".to_string()));
        }
        state.balance_fetches += 1;
        Ok(state.balances.clone())
    }

    async fn submit_order(
        &self,
        pair_id: u64,
        amount: Decimal,
        side: OrderSide,
        rate: Decimal,
    ) -> Result<Order, VenueError> {
        let mut state = self.state.lock().unwrap();
        state.submit_attempts += 1;

        if state.behavior.fail_submit_attempt == Some(state.submit_attempts) {
            return Err(VenueError::Rejected("mock submission failure".to_string()));
        }

        state.next_order_id += 1;
        let settles_now = state.behavior.settle_after_polls == 0
            && state.behavior.cancel_after_polls != Some(0);
        let order = Order {
            id: state.next_order_id,
            pair_id,
            side,
            rate,
            amount,
            filled: if settles_now { amount } else { Decimal::ZERO },
            cancelled: false,
            complete: settles_now,
            created_at: Some(Utc::now()),
        };
        state.own_orders.insert(order.id, order.clone());
        state.submitted.push(order.clone());
        Ok(order)
    }

    async fn query_order(&self, order_id: u64) -> Result<Order, VenueError> {
        let mut state = self.state.lock().unwrap();
        let polls = {
            let count = state.poll_counts.entry(order_id).or_insert(0);
            *count += 1;
            *count
        };

        let cancel_at = state.behavior.cancel_after_polls;
        let settle_at = state.behavior.settle_after_polls;
        let order = state
            .own_orders
            .get_mut(&order_id)
            .ok_or_else(|| VenueError::Decode(format!("order {order_id} missing from response")))?;

        if let Some(at) = cancel_at {
            if polls >= at {
                order.cancelled = true;
            }
        }
        if !order.cancelled && polls >= settle_at {
            order.complete = true;
            order.filled = order.amount;
        }
        Ok(order.clone())
    }

    async fn cancel_order(&self, order_id: u64) -> Result<Order, VenueError> {
        let mut state = self.state.lock().unwrap();
        let order = state
            .own_orders
            .get_mut(&order_id)
            .ok_or_else(|| VenueError::Decode(format!("order {order_id} missing from response")))?;
        order.cancelled = true;
        Ok(order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn mock_serves_seeded_market() {
        let venue = MockVenue::new();
        let btc = venue.add_currency(1, "BTC");
        let eth = venue.add_currency(2, "ETH");
        let pair = venue.add_pair(10, &btc, &eth);
        venue.add_ask(&pair, dec!(0.05), dec!(8));

        assert_eq!(venue.list_currencies().await.unwrap().len(), 2);
        assert_eq!(venue.list_pairs().await.unwrap().len(), 1);

        let book = venue.fetch_order_book(10).await.unwrap();
        assert_eq!(book.len(), 1);
        assert_eq!(book[0].side, OrderSide::Ask);
        assert_eq!(book[0].rate, dec!(0.05));
    }

    #[tokio::test]
    async fn mock_settles_instantly_by_default() {
        let venue = MockVenue::new();
        let order = venue
            .submit_order(10, dec!(5), OrderSide::Bid, dec!(0.05))
            .await
            .unwrap();

        assert!(order.complete);
        assert_eq!(order.filled, dec!(5));
        assert_eq!(venue.submitted_orders().len(), 1);
    }

    #[tokio::test]
    async fn mock_settles_after_polls() {
        let venue = MockVenue::with_behavior(MockBehavior {
            settle_after_polls: 2,
            ..Default::default()
        });
        let order = venue
            .submit_order(10, dec!(5), OrderSide::Bid, dec!(0.05))
            .await
            .unwrap();
        assert!(!order.complete);

        let first = venue.query_order(order.id).await.unwrap();
        assert!(!first.complete);

        let second = venue.query_order(order.id).await.unwrap();
        assert!(second.complete);
        assert_eq!(second.filled, dec!(5));
    }

    #[tokio::test]
    async fn mock_cancels_on_poll() {
        let venue = MockVenue::with_behavior(MockBehavior {
            settle_after_polls: 10,
            cancel_after_polls: Some(1),
            ..Default::default()
        });
        let order = venue
            .submit_order(10, dec!(5), OrderSide::Ask, dec!(0.05))
            .await
            .unwrap();

        let polled = venue.query_order(order.id).await.unwrap();
        assert!(polled.cancelled);
        assert!(!polled.complete);
    }

    #[tokio::test]
    async fn mock_cancel_marks_order() {
        let venue = MockVenue::with_behavior(MockBehavior {
            settle_after_polls: 5,
            ..Default::default()
        });
        let order = venue
            .submit_order(10, dec!(1), OrderSide::Bid, dec!(1))
            .await
            .unwrap();

        let cancelled = venue.cancel_order(order.id).await.unwrap();
        assert!(cancelled.cancelled);
        assert!(!cancelled.complete);
    }

    #[tokio::test]
    async fn mock_fails_chosen_submission() {
        let venue = MockVenue::with_behavior(MockBehavior {
            fail_submit_attempt: Some(2),
            ..Default::default()
        });

        assert!(venue
            .submit_order(10, dec!(1), OrderSide::Bid, dec!(1))
            .await
            .is_ok());
        assert!(venue
            .submit_order(10, dec!(1), OrderSide::Bid, dec!(1))
            .await
            .is_err());
        assert_eq!(venue.submit_attempts(), 2);
        assert_eq!(venue.submitted_orders().len(), 1);
    }
}
