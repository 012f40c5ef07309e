//! Arbitrage core: discovery, evaluation and execution of currency chains.
//!
//! This module handles:
//! - Priced pair views with memoized order books
//! - Combinatorial discovery of three-hop cycles
//! - Fee-aware ROI and capacity evaluation
//! - The sequential trade-execution state machine

pub mod chain;
pub mod discovery;
pub mod exchange;
pub mod executor;

pub use chain::{Chain, Hop};
pub use discovery::{find_chains, price_pairs};
pub use exchange::PricedExchange;
pub use executor::{
    ChainExecutor, ExecutionOutcome, ExecutionReport, ExecutionState, HopReport,
};
