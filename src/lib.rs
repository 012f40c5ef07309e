//! Triangular arbitrage scanner and executor for order-book venues.
//!
//! Discovers three-hop currency cycles across a venue's tradable pairs,
//! ranks them by fee-adjusted return, bounds how much capital each cycle
//! can carry given live order-book depth, and optionally walks a chosen
//! cycle through three sequential compensating orders.
//!
//! # How a chain is judged
//!
//! ```text
//! 1 BTC -> 20 ETH -> 399.2 LTC -> 0.3585 BTC     (best rates, fee per hop)
//! ROI = final - 1                                (here: -64.2%)
//! ```
//!
//! A chain with any hop below the venue's minimum order size is *not
//! executable*, a distinct verdict from merely unprofitable.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`venue`]: Venue collaborator (types, HTTP client, mock)
//! - [`session`]: Venue handle plus the short-lived balance memo
//! - [`arbitrage`]: Chain discovery, evaluation and execution

pub mod arbitrage;
pub mod config;
pub mod error;
pub mod session;
pub mod venue;

pub use config::Config;
pub use error::{BotError, Result};
