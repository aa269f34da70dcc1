use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coinfolio::clock::SystemClock;
use coinfolio::config::{default_config_path, ResolvedConfig};
use coinfolio::market_data::providers::CoinGeckoPriceSource;
use coinfolio::portfolio::{AssetRegistry, Holding, RegistryError};
use coinfolio::storage::{JsonFileSnapshotSink, SnapshotSink};
use coinfolio::valuation::{RefreshOutcome, ValuationEngine};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "coinfolio")]
#[command(about = "Track the live market value of a crypto portfolio")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Settlement currency (overrides config and CURRENCY)
    #[arg(long)]
    currency: Option<String>,

    /// Holding to value, as SYMBOL=AMOUNT. Repeatable; prompts interactively when omitted.
    #[arg(short = 'H', long = "holding", value_name = "SYMBOL=AMOUNT")]
    holdings: Vec<String>,

    /// Save a snapshot without asking
    #[arg(long, conflicts_with = "no_save")]
    save: bool,

    /// Never save a snapshot
    #[arg(long)]
    no_save: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List supported ticker symbols and their CoinGecko ids
    Symbols,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn report_add(result: Result<&Holding, RegistryError>) {
    match result {
        Ok(holding) => println!(
            "Added {} {} to portfolio.",
            holding.amount().normalize(),
            holding.symbol()
        ),
        Err(err) => println!("{err}"),
    }
}

fn prompt_holdings(registry: &mut AssetRegistry) -> Result<()> {
    let theme = ColorfulTheme::default();

    loop {
        let symbol: String = Input::with_theme(&theme)
            .with_prompt("Enter cryptocurrency (e.g., BTC, ETH) or 'done' to finish")
            .interact_text()?;
        let symbol = symbol.trim();

        if symbol.eq_ignore_ascii_case("done") {
            break;
        }
        if symbol.is_empty() {
            continue;
        }

        let amount: String = Input::with_theme(&theme)
            .with_prompt(format!("Enter amount of {}", symbol.to_uppercase()))
            .interact_text()?;

        report_add(registry.add_str(symbol, &amount));
    }

    Ok(())
}

fn add_from_args(registry: &mut AssetRegistry, holdings: &[String]) {
    for entry in holdings {
        match entry.split_once('=') {
            Some((symbol, amount)) => report_add(registry.add_str(symbol, amount)),
            None => println!("Ignoring {entry:?}: expected SYMBOL=AMOUNT"),
        }
    }
}

fn print_symbols(config: &ResolvedConfig) {
    for (symbol, id) in config.symbol_table().entries() {
        println!("{:<10}{}", symbol.to_uppercase(), id);
    }
}

fn build_price_source(config: &ResolvedConfig) -> CoinGeckoPriceSource {
    let source = CoinGeckoPriceSource::with_timeout(config.price_source.timeout);
    match &config.price_source.base_url {
        Some(base_url) => source.with_base_url(base_url.clone()),
        None => source,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?
        .with_env_overrides()
        .with_currency_override(cli.currency.clone());

    if let Some(Command::Symbols) = cli.command {
        print_symbols(&config);
        return Ok(());
    }

    let mut registry = AssetRegistry::new(config.symbol_table());
    let interactive = cli.holdings.is_empty();

    if interactive {
        println!("Welcome to Coinfolio\n");
        prompt_holdings(&mut registry)?;
    } else {
        add_from_args(&mut registry, &cli.holdings);
    }

    let engine = ValuationEngine::new().with_timeout(config.price_source.timeout);
    let source = build_price_source(&config);

    println!("\nFetching live prices...");
    match engine.refresh(&mut registry, &config.currency, &source).await {
        Ok(RefreshOutcome::NothingToFetch) => println!("No assets added yet."),
        Ok(outcome) => {
            for missing in outcome.missing() {
                println!("Could not fetch price for {}", missing.symbol);
            }
        }
        Err(err) => println!("{err}"),
    }

    println!();
    print!("{}", engine.render(&registry, &config.currency));

    let save = if cli.save {
        true
    } else if cli.no_save || !interactive {
        false
    } else {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Save portfolio snapshot?")
            .default(false)
            .interact()?
    };

    if save {
        let snapshot = engine.export_snapshot(&registry, &config.currency, &SystemClock);
        let sink = JsonFileSnapshotSink::new(&config.snapshot_dir);
        match sink.persist(&snapshot).await {
            Ok(location) => println!("Snapshot saved as {location}"),
            Err(err) => {
                warn!(error = %err, "Snapshot persistence failed");
                println!("Failed to save snapshot: {err:#}");
            }
        }
    }

    Ok(())
}
