//! End-to-end scenarios through the public API, driven by the mock venue.
//!
//! The market used throughout: three pairs closing a BTC/ETH/LTC triangle,
//! 0.2% fee per hop.
//!
//! ```text
//! BTC/ETH  ask 0.05 BTC per ETH, 200 ETH resting
//! ETH/LTC  ask 0.05 ETH per LTC, 1000 LTC resting
//! BTC/LTC  bid 0.0009 BTC per LTC, 1000 LTC wanted
//! ```

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use coinex_triarb::arbitrage::{
    find_chains, price_pairs, Chain, ChainExecutor, ExecutionOutcome,
};
use coinex_triarb::config::Config;
use coinex_triarb::error::ExecuteError;
use coinex_triarb::session::Session;
use coinex_triarb::venue::{Currency, MockBehavior, MockVenue, TradePair, Venue};

const FEE: Decimal = Decimal::from_parts(2, 0, 0, false, 3); // 0.002
const MIN: Decimal = Decimal::from_parts(1, 0, 0, false, 4); // 0.0001

struct Market {
    venue: MockVenue,
    btc: Arc<Currency>,
    eth: Arc<Currency>,
    ltc: Arc<Currency>,
    btc_eth: Arc<TradePair>,
    eth_ltc: Arc<TradePair>,
    btc_ltc: Arc<TradePair>,
}

fn market() -> Market {
    let venue = MockVenue::new();
    let btc = venue.add_currency(1, "BTC");
    let eth = venue.add_currency(2, "ETH");
    let ltc = venue.add_currency(3, "LTC");
    let btc_eth = venue.add_pair(10, &btc, &eth);
    let eth_ltc = venue.add_pair(11, &eth, &ltc);
    let btc_ltc = venue.add_pair(12, &btc, &ltc);
    Market {
        venue,
        btc,
        eth,
        ltc,
        btc_eth,
        eth_ltc,
        btc_ltc,
    }
}

fn seed_books(m: &Market) {
    m.venue.add_ask(&m.btc_eth, dec!(0.05), dec!(200));
    m.venue.add_ask(&m.eth_ltc, dec!(0.05), dec!(1000));
    m.venue.add_bid(&m.btc_ltc, dec!(0.0009), dec!(1000));
}

async fn discover(m: &Market) -> Vec<Chain> {
    let pairs = m.venue.list_pairs().await.unwrap();
    let exchanges = price_pairs(&pairs, FEE, MIN);
    find_chains(&exchanges)
}

fn test_config() -> Config {
    Config {
        coinex_api_key: "key".to_string(),
        coinex_api_secret: "secret".to_string(),
        coinex_base_url: "https://coinex.pw/api/v2".to_string(),
        fee_rate: FEE,
        min_trade_size: MIN,
        poll_interval_ms: 1,
        execution_timeout_ms: 100,
        http_timeout_ms: 5_000,
        dry_run: false,
        rust_log: "info".to_string(),
    }
}

#[tokio::test]
async fn discovery_finds_exactly_one_btc_eth_ltc_chain() {
    let m = market();
    seed_books(&m);

    let chains = discover(&m).await;
    let matching: Vec<_> = chains
        .iter()
        .filter(|c| c.is_cycle(&m.btc, &m.eth, &m.ltc))
        .collect();

    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].cycle(), " BTC ->  ETH ->  LTC ->  BTC");
}

#[tokio::test]
async fn evaluator_matches_hand_computed_reference() {
    let m = market();
    seed_books(&m);

    let chains = discover(&m).await;
    let chain = chains
        .iter()
        .find(|c| c.is_cycle(&m.btc, &m.eth, &m.ltc))
        .unwrap();

    // 1 BTC / 0.05 * 0.998 = 19.96 ETH
    // 19.96 / 0.05 * 0.998 = 398.4016 LTC
    // 398.4016 * 0.0009 * 0.998 = 0.35784431712 BTC
    let roi = chain.roi(&m.venue).await.unwrap().unwrap();
    assert_eq!(roi, dec!(-0.64215568288));

    // Hop capacities in BTC: 200*0.05*0.998 = 9.98, then 1000*0.05*0.998
    // = 49.9 ETH / 19.96 = 2.5, then 1000*0.998 = 998 LTC / 398.4016.
    let max = chain.max_transfer(&m.venue).await.unwrap().unwrap();
    assert_eq!(max, dec!(2.5));

    // Binding floor: hop 1 needs 0.0001 ETH worth of BTC at the 0.05 ask.
    let min = chain.min_transfer(&m.venue).await.unwrap().unwrap();
    assert_eq!(min, dec!(0.000005));
}

#[tokio::test]
async fn roi_does_not_move_with_the_market_once_computed() {
    let m = market();
    seed_books(&m);

    let chains = discover(&m).await;
    let chain = chains
        .iter()
        .find(|c| c.is_cycle(&m.btc, &m.eth, &m.ltc))
        .unwrap();

    let before = chain.roi(&m.venue).await.unwrap();

    m.venue.set_order_book(m.btc_eth.id, vec![]);
    m.venue.set_order_book(m.eth_ltc.id, vec![]);
    m.venue.set_order_book(m.btc_ltc.id, vec![]);

    let after = chain.roi(&m.venue).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn chains_below_the_trade_floor_are_not_executable() {
    let m = market();
    seed_books(&m);

    // A 25-ETH floor makes hop 1's 20 ETH pre-image too small: the chain
    // has no ROI at all, as opposed to a negative one.
    let pairs = m.venue.list_pairs().await.unwrap();
    let exchanges = price_pairs(&pairs, FEE, dec!(25));
    let chains = find_chains(&exchanges);
    let chain = chains
        .iter()
        .find(|c| c.is_cycle(&m.btc, &m.eth, &m.ltc))
        .unwrap();

    assert_eq!(chain.roi(&m.venue).await.unwrap(), None);
}

#[tokio::test]
async fn executability_needs_balance_and_an_open_window() {
    let m = market();
    seed_books(&m);

    let chains = discover(&m).await;
    let chain = chains
        .into_iter()
        .find(|c| c.is_cycle(&m.btc, &m.eth, &m.ltc))
        .unwrap();

    // No BTC on the account: not executable despite the open window.
    let session = Session::new(m.venue.clone());
    assert!(!chain.can_execute(&session).await.unwrap());

    // Fresh chain, funded account: executable.
    m.venue.set_balance(&m.btc, dec!(1), Decimal::ZERO);
    let session = Session::new(m.venue.clone());
    let chains = discover(&m).await;
    let chain = chains
        .into_iter()
        .find(|c| c.is_cycle(&m.btc, &m.eth, &m.ltc))
        .unwrap();
    assert!(chain.can_execute(&session).await.unwrap());
}

#[tokio::test]
async fn execution_walks_the_whole_chain() {
    let m = market();
    seed_books(&m);
    m.venue.set_balance(&m.btc, dec!(5), Decimal::ZERO);

    let chains = discover(&m).await;
    let chain = chains
        .iter()
        .find(|c| c.is_cycle(&m.btc, &m.eth, &m.ltc))
        .unwrap();

    let config = test_config();
    let mut session = Session::new(m.venue.clone());
    let mut executor = ChainExecutor::new(&mut session, &config);
    let report = executor.execute(chain, dec!(2.5)).await.unwrap();

    assert!(report.is_complete());
    let received: Vec<_> = report.hops.iter().map(|h| h.received).collect();
    assert_eq!(received, vec![dec!(49.9), dec!(996.004), dec!(0.8946107928)]);

    // Three compensating orders, one per hop, in sequence.
    let submitted = m.venue.submitted_orders();
    assert_eq!(submitted.len(), 3);
    assert_eq!(submitted[0].pair_id, m.btc_eth.id);
    assert_eq!(submitted[1].pair_id, m.eth_ltc.id);
    assert_eq!(submitted[2].pair_id, m.btc_ltc.id);
}

#[tokio::test]
async fn mid_chain_rejection_reports_realized_funds_and_stops() {
    let m = market();
    seed_books(&m);
    m.venue.set_balance(&m.btc, dec!(5), Decimal::ZERO);
    m.venue.set_behavior(MockBehavior {
        fail_submit_attempt: Some(2),
        ..Default::default()
    });

    let chains = discover(&m).await;
    let chain = chains
        .iter()
        .find(|c| c.is_cycle(&m.btc, &m.eth, &m.ltc))
        .unwrap();

    let config = test_config();
    let mut session = Session::new(m.venue.clone());
    let mut executor = ChainExecutor::new(&mut session, &config);
    let report = executor.execute(chain, dec!(2.5)).await.unwrap();

    // Hop 1 settled: 2.5 BTC became 49.9 ETH and stays ETH.
    assert_eq!(report.hops.len(), 1);
    assert_eq!(report.hops[0].source, "BTC");
    assert_eq!(report.hops[0].target, "ETH");
    assert_eq!(report.hops[0].received, dec!(49.9));

    match &report.outcome {
        ExecutionOutcome::Aborted { failed_hop, reason } => {
            assert_eq!(*failed_hop, 2);
            assert!(matches!(reason, ExecuteError::Submission(_)));
        }
        other => panic!("expected abort, got {other:?}"),
    }

    // No automatic unwind: the only orders ever submitted are hop 1's
    // fill and hop 2's rejected attempt.
    assert_eq!(m.venue.submit_attempts(), 2);
    assert_eq!(m.venue.submitted_orders().len(), 1);
}
