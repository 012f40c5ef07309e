//! Unified error types for the arbitrage engine.

use thiserror::Error;

/// Unified error type for the arbitrage engine.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Venue communication error.
    #[error("venue error: {0}")]
    Venue(#[from] VenueError),

    /// Chain construction/lookup error.
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    /// Trade execution error.
    #[error("execution error: {0}")]
    Execute(#[from] ExecuteError),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Venue API and wire-format errors.
#[derive(Error, Debug)]
pub enum VenueError {
    /// HTTP transport failure.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from the venue.
    #[error("venue returned HTTP {status}: {body}")]
    Status {
        /// Response status code.
        status: u16,
        /// Response body (may be truncated).
        body: String,
    },

    /// Failed to decode a venue response.
    #[error("failed to decode venue response: {0}")]
    Decode(String),

    /// A pair or balance referenced a currency id the venue never listed.
    #[error("unknown currency id {0} in venue data")]
    UnknownCurrency(u64),

    /// The venue rejected an order submission.
    #[error("order rejected: {0}")]
    Rejected(String),

    /// A quantity does not fit the venue's 8-decimal fixed-point wire encoding.
    #[error("amount {0} does not fit the venue's 8-decimal wire encoding")]
    Unencodable(rust_decimal::Decimal),
}

/// Chain construction and currency-lookup errors.
///
/// `UnsupportedCurrency` is always a programming error at the call site and
/// should be propagated; `Construction` marks a discovery candidate that does
/// not close a three-currency loop and is discarded, not propagated.
#[derive(Error, Debug)]
pub enum ChainError {
    /// A conversion or offer lookup named a currency outside the pair.
    #[error("currency {currency} is not part of pair {pair_id}")]
    UnsupportedCurrency {
        /// The pair that was asked.
        pair_id: u64,
        /// Abbreviation of the unsupported currency.
        currency: String,
    },

    /// A candidate triple of pairs does not form a closed 3-currency loop.
    #[error("pairs ({ex1}, {ex2}, {ex3}) do not close a three-currency loop")]
    Construction {
        /// First pair id.
        ex1: u64,
        /// Second pair id.
        ex2: u64,
        /// Third pair id.
        ex3: u64,
    },
}

/// Reasons a chain execution aborts.
///
/// These are carried inside the execution report rather than bubbled as
/// `Err`, because an abort after a settled hop must still deliver the
/// partial per-hop results to the caller.
#[derive(Error, Debug)]
pub enum ExecuteError {
    /// The venue rejected an order submission mid-chain.
    #[error("order submission failed: {0}")]
    Submission(#[source] VenueError),

    /// The venue cancelled an order while we were waiting for settlement.
    #[error("order {order_id} was cancelled by the venue")]
    OrderCancelled {
        /// The cancelled order id.
        order_id: u64,
    },

    /// Settlement polling exceeded the configured bound.
    #[error("timed out waiting for order {order_id} to settle")]
    TimedOut {
        /// The order still open when the bound was hit.
        order_id: u64,
    },

    /// No resting order was available on the needed side of the book.
    #[error("no resting orders available to trade into {currency}")]
    NoDepth {
        /// Abbreviation of the target currency.
        currency: String,
    },
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;
