//! Triangular arbitrage CLI entry point.

use std::io::Write;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use coinex_triarb::arbitrage::{
    find_chains, price_pairs, Chain, ChainExecutor, ExecutionOutcome, ExecutionReport,
};
use coinex_triarb::config::Config;
use coinex_triarb::session::Session;
use coinex_triarb::venue::{CoinexClient, Venue};

/// Triangular arbitrage scanner and executor.
#[derive(Parser, Debug)]
#[command(name = "coinex-triarb")]
#[command(about = "Discover and execute triangular arbitrage chains on an order-book venue")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan for arbitrage chains (default: profitable only).
    Scan {
        /// Show every chain, including unprofitable and non-executable ones.
        #[arg(long)]
        all: bool,
    },

    /// List account balances.
    Balances,

    /// Execute a profitable chain after interactive confirmation.
    Execute {
        /// Chain number from the displayed list (prompted if omitted).
        #[arg(long)]
        chain: Option<usize>,

        /// Amount of the start currency to commit (defaults to the
        /// chain's maximum transfer).
        #[arg(long)]
        amount: Option<Decimal>,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("coinex_triarb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match args.command {
        Some(Command::Scan { all }) => cmd_scan(all).await,
        Some(Command::Balances) => cmd_balances().await,
        Some(Command::Execute { chain, amount }) => cmd_execute(chain, amount).await,
        Some(Command::CheckConfig) => cmd_check_config().await,
        None => cmd_scan(false).await,
    }
}

/// Load and validate configuration, or explain why it failed.
fn load_config() -> anyhow::Result<Config> {
    let config = Config::load()?;
    config
        .validate()
        .map_err(|reason| anyhow::anyhow!("invalid configuration: {reason}"))?;
    Ok(config)
}

/// A chain with its evaluation results, ready for display.
struct EvaluatedChain<'a> {
    chain: &'a Chain,
    roi: Decimal,
    max_transfer: Decimal,
    min_transfer: Decimal,
    rates: [Decimal; 3],
}

impl EvaluatedChain<'_> {
    fn print_line(&self) {
        let currency = &self.chain.start_currency().abbreviation;
        let pct = (self.roi * dec!(100)).round_dp(4).to_string();
        println!(
            "{}   roi {:>10}%   max {} {}   min {} {}   rates {} / {} / {}",
            self.chain.cycle(),
            pct,
            self.max_transfer.normalize(),
            currency,
            self.min_transfer.normalize(),
            currency,
            self.rates[0].normalize(),
            self.rates[1].normalize(),
            self.rates[2].normalize(),
        );
    }
}

/// Evaluate a chain for display; `None` when it is not executable.
async fn evaluate<'a, V: Venue>(
    venue: &V,
    chain: &'a Chain,
) -> coinex_triarb::Result<Option<EvaluatedChain<'a>>> {
    let Some(roi) = chain.roi(venue).await? else {
        return Ok(None);
    };
    let Some(max_transfer) = chain.max_transfer(venue).await? else {
        return Ok(None);
    };
    let Some(min_transfer) = chain.min_transfer(venue).await? else {
        return Ok(None);
    };

    let mut rates = [Decimal::ZERO; 3];
    for (slot, hop) in rates.iter_mut().zip(chain.hops().iter()) {
        match hop.exchange.best_offer(venue, &hop.target).await? {
            Some(offer) => *slot = offer.rate,
            None => return Ok(None),
        }
    }

    Ok(Some(EvaluatedChain {
        chain,
        roi,
        max_transfer,
        min_transfer,
        rates,
    }))
}

/// Discover and evaluate all chains the venue currently supports.
async fn discover<'a, V: Venue>(
    venue: &V,
    chains: &'a [Chain],
    include_all: bool,
) -> Vec<EvaluatedChain<'a>> {
    let mut evaluated = Vec::new();
    for chain in chains {
        match evaluate(venue, chain).await {
            Ok(Some(row)) => {
                if include_all || row.roi > Decimal::ZERO {
                    evaluated.push(row);
                }
            }
            Ok(None) => {
                if include_all {
                    println!("{}   not executable", chain.cycle());
                }
            }
            Err(error) => {
                warn!(cycle = %chain, %error, "Skipping chain that failed evaluation");
            }
        }
    }
    // Rank by fee-adjusted return, best first.
    evaluated.sort_by(|a, b| b.roi.cmp(&a.roi));
    evaluated
}

/// Scan the market and print chains.
async fn cmd_scan(all: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    if all {
        println!("-------Getting All Chains-------");
    } else {
        println!("-------Getting Profitable Chains-------");
    }

    let client = CoinexClient::new(&config);
    let session = Session::new(client);

    let pairs = session.venue().list_pairs().await?;
    let exchanges = price_pairs(&pairs, config.fee_rate, config.min_trade_size);
    let chains = find_chains(&exchanges);

    let evaluated = discover(session.venue(), &chains, all).await;
    for row in &evaluated {
        row.print_line();
    }

    println!("Found {} arbitrage chains", evaluated.len());
    Ok(())
}

/// List account balances, skipping empty rows.
async fn cmd_balances() -> anyhow::Result<()> {
    let config = load_config()?;
    if !config.has_credentials() {
        anyhow::bail!("COINEX_API_KEY and COINEX_API_SECRET are required");
    }

    let client = CoinexClient::new(&config);
    let session = Session::new(client);

    let currencies = session.venue().list_currencies().await?;
    let balances = session.balances().await?;

    for balance in balances {
        if balance.total() <= Decimal::ZERO {
            continue;
        }
        let abbreviation = currencies
            .iter()
            .find(|c| c.id == balance.currency_id)
            .map(|c| c.abbreviation.as_str())
            .unwrap_or("?");
        println!(
            "{} {} ({} held)",
            abbreviation,
            balance.total().normalize(),
            balance.held.normalize()
        );
    }
    Ok(())
}

/// Execute a chosen profitable chain after confirmation.
async fn cmd_execute(chain_number: Option<usize>, amount: Option<Decimal>) -> anyhow::Result<()> {
    let config = load_config()?;
    if !config.has_credentials() {
        anyhow::bail!("COINEX_API_KEY and COINEX_API_SECRET are required");
    }

    let client = CoinexClient::new(&config);
    let mut session = Session::new(client);

    let pairs = session.venue().list_pairs().await?;
    let exchanges = price_pairs(&pairs, config.fee_rate, config.min_trade_size);
    let chains = find_chains(&exchanges);

    println!("-------Getting Profitable Chains-------");
    let candidates = discover(session.venue(), &chains, false).await;

    let mut executable = Vec::new();
    for row in candidates {
        if row.chain.can_execute(&session).await? {
            executable.push(row);
        }
    }

    if executable.is_empty() {
        println!("No executable profitable chains right now.");
        return Ok(());
    }

    for (index, row) in executable.iter().enumerate() {
        print!("{:>3}: ", index + 1);
        row.print_line();
    }

    let picked = match chain_number {
        Some(n) => n,
        None => prompt("Chain number")?.trim().parse::<usize>()?,
    };
    let row = executable
        .get(picked.checked_sub(1).unwrap_or(usize::MAX))
        .ok_or_else(|| anyhow::anyhow!("no chain numbered {picked}"))?;

    let currency = &row.chain.start_currency().abbreviation;
    let amount = amount.unwrap_or(row.max_transfer);
    if amount > row.max_transfer || amount < row.min_transfer {
        anyhow::bail!(
            "amount {} {} is outside the executable window [{}, {}]",
            amount,
            currency,
            row.min_transfer.normalize(),
            row.max_transfer.normalize()
        );
    }

    println!("======================================================================");
    println!("About to execute: {}", row.chain.cycle());
    println!("  Committing:     {} {}", amount.normalize(), currency);
    println!("  Expected ROI:   {}%", (row.roi * dec!(100)).round_dp(4));
    println!("  Hop rates:      {} / {} / {}",
        row.rates[0].normalize(),
        row.rates[1].normalize(),
        row.rates[2].normalize());
    println!("======================================================================");

    let answer = prompt("Proceed with execution? [y/N]")?;
    if !matches!(answer.trim(), "y" | "Y" | "yes" | "YES") {
        println!("Aborted.");
        return Ok(());
    }

    if config.dry_run {
        println!("DRY RUN - no orders submitted. Set DRY_RUN=false to trade.");
        return Ok(());
    }

    let chain = row.chain;
    let mut executor = ChainExecutor::new(&mut session, &config);
    let report = executor.execute(chain, amount).await?;
    print_report(&report);
    Ok(())
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("COINEX TRIARB - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Base URL:          {}", config.coinex_base_url);
    println!("  Credentials:       {}", if config.has_credentials() { "present" } else { "MISSING (scan only)" });
    println!("  Fee Rate:          {}", config.fee_rate);
    println!("  Min Trade Size:    {}", config.min_trade_size);
    println!("  Poll Interval:     {}ms", config.poll_interval_ms);
    println!("  Execution Timeout: {}ms", config.execution_timeout_ms);
    println!("  Dry Run:           {}", config.dry_run);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Print the executor's report, hop by hop.
fn print_report(report: &ExecutionReport) {
    println!("======================================================================");
    for hop in &report.hops {
        println!(
            "Hop {}: spent {} {} -> received {} {} @ {} (order {})",
            hop.hop,
            hop.spent.normalize(),
            hop.source,
            hop.received.normalize(),
            hop.target,
            hop.rate.normalize(),
            hop.order_id
        );
    }
    match &report.outcome {
        ExecutionOutcome::Completed { final_amount } => {
            println!("----------------------------------------------------------------------");
            println!(
                "Chain complete: {} -> {}",
                report.started_with.normalize(),
                final_amount.normalize()
            );
        }
        ExecutionOutcome::Aborted { failed_hop, reason } => {
            println!("----------------------------------------------------------------------");
            println!("EXECUTION ABORTED at hop {}: {}", failed_hop, reason);
            if let Some(last) = report.hops.last() {
                println!(
                    "Funds already converted were NOT unwound; you are holding {} {}.",
                    last.received.normalize(),
                    last.target
                );
                println!("Consider unwinding manually at current market rates.");
            }
        }
    }
    println!("======================================================================");
}

/// Ask a question on stdout and read one line from stdin.
fn prompt(question: &str) -> std::io::Result<String> {
    print!("{question}: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line)
}
