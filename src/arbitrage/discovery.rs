//! Combinatorial discovery of three-hop currency cycles.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::arbitrage::chain::Chain;
use crate::arbitrage::exchange::PricedExchange;
use crate::venue::TradePair;

/// Wrap every pair of one discovery pass in a shared priced view.
///
/// Chains built from the same pass share these wrappers, and with them the
/// per-pair order-book memo.
pub fn price_pairs(
    pairs: &[Arc<TradePair>],
    fee_rate: Decimal,
    min_trade_size: Decimal,
) -> Vec<Arc<PricedExchange>> {
    pairs
        .iter()
        .map(|pair| Arc::new(PricedExchange::new(pair.clone(), fee_rate, min_trade_size)))
        .collect()
}

/// Enumerate every ordered triple of distinct pairs that closes a
/// three-currency loop.
///
/// For each `ex1` the cycle starts at its from-currency; `ex2` must touch
/// `ex1`'s to-currency while avoiding the start currency (that would fold
/// the loop into two hops); `ex3` must connect the third currency back to
/// the start. Degenerate candidates are excluded here by construction, and
/// any triple the `Chain` constructor still rejects is skipped, never
/// propagated. Enumeration order follows the input pair list; nothing else
/// is guaranteed.
#[instrument(skip(exchanges), fields(pairs = exchanges.len()))]
pub fn find_chains(exchanges: &[Arc<PricedExchange>]) -> Vec<Chain> {
    let mut chains = Vec::new();

    for ex1 in exchanges {
        let cur1 = ex1.from_currency();
        let cur2 = ex1.to_currency();

        let second_hops = exchanges.iter().filter(|ex2| {
            ex2.id() != ex1.id() && ex2.contains(cur2) && !ex2.contains(cur1)
        });

        for ex2 in second_hops {
            let Some(cur3) = ex2.other(cur2) else {
                continue;
            };

            let third_hops = exchanges.iter().filter(|ex3| {
                ex3.id() != ex2.id() && ex3.contains(cur1) && ex3.contains(cur3)
            });

            for ex3 in third_hops {
                match Chain::new(ex1.clone(), ex2.clone(), ex3.clone()) {
                    Ok(chain) => chains.push(chain),
                    Err(error) => {
                        debug!(%error, "Discarding degenerate chain candidate");
                    }
                }
            }
        }
    }

    debug!(count = chains.len(), "Enumerated candidate chains");
    chains
}
