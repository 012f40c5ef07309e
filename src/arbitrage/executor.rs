//! Sequential execution of a chosen chain.
//!
//! Walks the three hops in order, submitting one compensating order per hop
//! and polling the venue until it settles. Hop N+1 is never submitted before
//! hop N settles. A cancellation, rejection or timeout aborts the whole
//! chain; funds already converted on earlier hops stay where they are and
//! are reported, never reverse-traded at worsened rates.

use std::time::Duration;

use rust_decimal::Decimal;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

use crate::arbitrage::chain::{Chain, Hop};
use crate::config::Config;
use crate::error::{ExecuteError, Result};
use crate::session::Session;
use crate::venue::{Order, OrderSide, Venue};

/// Executor progress through the hop sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Nothing submitted yet.
    Idle,
    /// Hop N's order is on the book, awaiting settlement.
    HopSubmitted(u8),
    /// Hop N's order settled; terminal at hop 3.
    HopSettled(u8),
}

/// One settled hop's realized numbers.
#[derive(Debug, Clone)]
pub struct HopReport {
    /// Hop position, 1-based.
    pub hop: usize,
    /// Venue id of our compensating order.
    pub order_id: u64,
    /// Pair the hop traded on.
    pub pair_id: u64,
    /// Abbreviation of the currency given up.
    pub source: String,
    /// Abbreviation of the currency acquired.
    pub target: String,
    /// Rate the order traded at.
    pub rate: Decimal,
    /// Amount of source currency spent.
    pub spent: Decimal,
    /// Amount of target currency realized, net of fee.
    pub received: Decimal,
}

/// How an execution attempt ended.
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// All three hops settled.
    Completed {
        /// Final amount of the start currency, net of all fees.
        final_amount: Decimal,
    },
    /// Execution stopped mid-chain.
    ///
    /// Funds converted on the hops listed in the report remain converted;
    /// unwinding them is a manual decision.
    Aborted {
        /// 1-based hop where the failure happened.
        failed_hop: usize,
        /// Why the chain stopped.
        reason: ExecuteError,
    },
}

/// Full account of one execution attempt.
#[derive(Debug)]
pub struct ExecutionReport {
    /// Starting amount, in the chain's start currency.
    pub started_with: Decimal,
    /// Settled hops, in order.
    pub hops: Vec<HopReport>,
    /// Terminal result.
    pub outcome: ExecutionOutcome,
}

impl ExecutionReport {
    /// Whether every hop settled.
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, ExecutionOutcome::Completed { .. })
    }
}

/// Drives one chain execution over a session.
#[derive(Debug)]
pub struct ChainExecutor<'a, V: Venue> {
    session: &'a mut Session<V>,
    poll_interval: Duration,
    timeout: Duration,
    state: ExecutionState,
}

impl<'a, V: Venue> ChainExecutor<'a, V> {
    /// Create an executor with the configured polling cadence.
    pub fn new(session: &'a mut Session<V>, config: &Config) -> Self {
        Self {
            session,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            timeout: Duration::from_millis(config.execution_timeout_ms),
            state: ExecutionState::Idle,
        }
    }

    /// Current position in the hop sequence.
    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// Run `amount` of the chain's start currency through all three hops.
    ///
    /// Returns a report in every business outcome, including aborts; `Err`
    /// is reserved for faults outside the trade itself. The session's
    /// balance memo is invalidated as soon as any order was submitted.
    #[instrument(skip(self, chain), fields(cycle = %chain))]
    pub async fn execute(&mut self, chain: &Chain, amount: Decimal) -> Result<ExecutionReport> {
        let mut hops = Vec::with_capacity(3);
        let mut carried = amount;
        let mut submitted_any = false;

        for (index, hop) in chain.hops().iter().enumerate() {
            let hop_no = index + 1;

            match self.run_hop(hop, hop_no, carried, &mut submitted_any).await? {
                Ok(report) => {
                    carried = report.received;
                    hops.push(report);
                }
                Err(reason) => {
                    warn!(hop = hop_no, %reason, "Chain execution aborted");
                    if submitted_any {
                        self.session.invalidate_balances();
                    }
                    return Ok(ExecutionReport {
                        started_with: amount,
                        hops,
                        outcome: ExecutionOutcome::Aborted {
                            failed_hop: hop_no,
                            reason,
                        },
                    });
                }
            }
        }

        info!(
            started = %amount,
            ended = %carried,
            "Chain execution complete"
        );
        self.session.invalidate_balances();
        Ok(ExecutionReport {
            started_with: amount,
            hops,
            outcome: ExecutionOutcome::Completed {
                final_amount: carried,
            },
        })
    }

    /// Run a single hop to settlement.
    ///
    /// The outer `Result` carries faults; the inner one separates a settled
    /// hop from an abort reason that ends the chain.
    async fn run_hop(
        &mut self,
        hop: &Hop,
        hop_no: usize,
        amount: Decimal,
        submitted_any: &mut bool,
    ) -> Result<std::result::Result<HopReport, ExecuteError>> {
        let Some(resting) = hop
            .exchange
            .best_offer(self.session.venue(), &hop.target)
            .await?
        else {
            return Ok(Err(ExecuteError::NoDepth {
                currency: hop.target.abbreviation.clone(),
            }));
        };

        // The compensating order mirrors the resting one: same rate, sized
        // in to-currency units to at most the requested amount and at most
        // the resting remainder.
        let into_to_currency = resting.side == OrderSide::Ask;
        let wanted_in_to_units = if into_to_currency {
            amount / resting.rate
        } else {
            amount
        };
        let order_size = wanted_in_to_units.min(resting.remaining());
        let our_side = resting.side.opposite();

        let spent = if into_to_currency {
            order_size * resting.rate
        } else {
            order_size
        };
        let received = if into_to_currency {
            order_size * hop.exchange.fee_keep()
        } else {
            order_size * resting.rate * hop.exchange.fee_keep()
        };

        info!(
            hop = hop_no,
            pair = hop.exchange.id(),
            side = %our_side,
            rate = %resting.rate,
            size = %order_size,
            "Submitting compensating order"
        );
        self.state = ExecutionState::HopSubmitted(hop_no as u8);
        *submitted_any = true;

        let submitted = match self
            .session
            .venue()
            .submit_order(hop.exchange.id(), order_size, our_side, resting.rate)
            .await
        {
            Ok(order) => order,
            Err(error) => return Ok(Err(ExecuteError::Submission(error))),
        };

        let settled = if submitted.complete {
            submitted
        } else {
            match self.await_settlement(submitted.id).await? {
                Ok(order) => order,
                Err(reason) => return Ok(Err(reason)),
            }
        };

        self.state = ExecutionState::HopSettled(hop_no as u8);
        info!(
            hop = hop_no,
            order_id = settled.id,
            spent = %spent,
            received = %received,
            "Hop settled"
        );

        Ok(Ok(HopReport {
            hop: hop_no,
            order_id: settled.id,
            pair_id: hop.exchange.id(),
            source: hop.source.abbreviation.clone(),
            target: hop.target.abbreviation.clone(),
            rate: resting.rate,
            spent,
            received,
        }))
    }

    /// Poll order status until it completes, is cancelled, or the bound
    /// elapses.
    async fn await_settlement(
        &self,
        order_id: u64,
    ) -> Result<std::result::Result<Order, ExecuteError>> {
        let started = tokio::time::Instant::now();

        loop {
            if started.elapsed() >= self.timeout {
                return Ok(Err(ExecuteError::TimedOut { order_id }));
            }
            sleep(self.poll_interval).await;

            let order = self.session.venue().query_order(order_id).await?;
            if order.cancelled {
                return Ok(Err(ExecuteError::OrderCancelled { order_id }));
            }
            if order.complete {
                return Ok(Ok(order));
            }
        }
    }
}
