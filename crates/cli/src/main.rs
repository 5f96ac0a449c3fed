//! Command Line Interface for the market-maker simulator.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use mmsim_data::RunStore;
use mmsim_domain::enums::MarketMakerType;
use mmsim_domain::metrics::stats::Summary;
use mmsim_simulation::collector::{Distribution, MetricsSummary};
use mmsim_simulation::config::SimulationConfig;
use mmsim_simulation::monte_carlo::{MonteCarloRunner, VariantAggregate, run_variant};
use mmsim_simulation::state::RunSummary;
use mmsim_simulation::streams::Streams;
use prettytable::{Table, row};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "mmsim")]
#[command(about = "Market-maker capital efficiency, price impact and impermanent loss simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured market maker once
    Run {
        /// JSON configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Store directory; falls back to MMSIM_STORE
        #[arg(long)]
        store: Option<PathBuf>,

        /// Override the configured seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the configured market-maker type
        #[arg(long)]
        variant: Option<MarketMakerType>,
    },
    /// Run all six market makers on the same streams
    Compare {
        /// JSON configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Number of seeds per market maker
        #[arg(short, long, default_value_t = 1)]
        iterations: usize,
    },
    /// Rebuild the summary of a stored run from its sample log
    Summarize {
        /// Store directory; falls back to MMSIM_STORE
        #[arg(long)]
        store: Option<PathBuf>,

        /// Run identifier
        #[arg(long)]
        run: Uuid,
    },
}

async fn load_config(path: &Path) -> Result<SimulationConfig> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = SimulationConfig::from_json(&text)
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn store_dir(arg: Option<PathBuf>) -> Option<PathBuf> {
    arg.or_else(|| env::var("MMSIM_STORE").ok().map(PathBuf::from))
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.6}"))
}

fn distribution_row(table: &mut Table, name: &str, dist: &Distribution) {
    let all: Option<Summary> = dist.all;
    table.add_row(row![
        name,
        dist.count(),
        fmt_opt(all.map(|s| s.mean)),
        fmt_opt(all.map(|s| s.median)),
        fmt_opt(all.map(|s| s.q1)),
        fmt_opt(all.map(|s| s.q3)),
        fmt_opt(all.map(|s| s.std)),
        fmt_opt(dist.trimmed.map(|s| s.median)),
    ]);
}

fn print_metrics(metrics: &MetricsSummary) {
    println!(
        "\n📊 {}: {} samples, {} executed ({} organic, {} arbitrage, {} clamped), {} skipped, {} excluded",
        metrics.variant,
        metrics.samples,
        metrics.executed,
        metrics.organic,
        metrics.arbitrage,
        metrics.clamped,
        metrics.skipped_total(),
        metrics.excluded
    );
    for (kind, count) in &metrics.skipped {
        println!("   skipped {kind:?}: {count}");
    }

    let mut table = Table::new();
    table.add_row(row![
        "Metric", "Count", "Mean", "Median", "Q1", "Q3", "Std", "Trimmed median"
    ]);
    distribution_row(&mut table, "Capital efficiency", &metrics.capital_efficiency);
    distribution_row(&mut table, "Price impact", &metrics.price_impact);
    distribution_row(&mut table, "Impermanent gain", &metrics.impermanent_gain);
    distribution_row(&mut table, "Impermanent loss", &metrics.impermanent_loss);
    table.printstd();

    let mut tokens = Table::new();
    tokens.add_row(row!["Token", "CE median", "PI median", "IL gain median", "IL loss median"]);
    for (token, m) in &metrics.per_token {
        tokens.add_row(row![
            token,
            fmt_opt(m.capital_efficiency.all.map(|s| s.median)),
            fmt_opt(m.price_impact.all.map(|s| s.median)),
            fmt_opt(m.impermanent_gain.all.map(|s| s.median)),
            fmt_opt(m.impermanent_loss.all.map(|s| s.median)),
        ]);
    }
    tokens.printstd();
}

fn print_run(summary: &RunSummary) {
    print_metrics(&summary.metrics);

    let mut table = Table::new();
    table.add_row(row!["Pool", "Token", "Deposit", "Balance", "Ratio"]);
    for r in &summary.final_reserves {
        table.add_row(row![
            r.pool,
            r.token,
            format!("{:.6}", r.deposit),
            format!("{:.6}", r.balance),
            format!("{:.6}", r.balance / r.deposit),
        ]);
    }
    table.printstd();
    println!(
        "Batches: {} | Entries: {} | Resets: {} | Pool vs hold: {}",
        summary.batches,
        summary.entries,
        summary.resets,
        fmt_opt(summary.pool_vs_hold)
    );
}

fn print_comparison(results: &[(MarketMakerType, Result<VariantAggregate>)]) {
    let mut table = Table::new();
    table.add_row(row![
        "Type",
        "Runs",
        "Executed",
        "Skipped",
        "CE median",
        "PI median",
        "Pool vs hold",
        "VaR 95"
    ]);
    for (kind, result) in results {
        match result {
            Ok(agg) => {
                table.add_row(row![
                    kind,
                    agg.runs,
                    agg.executed,
                    agg.skipped,
                    fmt_opt(agg.capital_efficiency.map(|s| s.median)),
                    fmt_opt(agg.price_impact.map(|s| s.median)),
                    fmt_opt(agg.pool_vs_hold.map(|s| s.mean)),
                    fmt_opt(agg.var_95_pool_vs_hold),
                ]);
            }
            Err(e) => {
                table.add_row(row![kind, "-", "-", "-", format!("{e:#}"), "-", "-", "-"]);
            }
        }
    }
    table.printstd();
}

async fn run(
    config_path: &Path,
    store: Option<PathBuf>,
    seed: Option<u64>,
    variant: Option<MarketMakerType>,
) -> Result<()> {
    let mut config = load_config(config_path).await?;
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    if let Some(kind) = variant {
        config = config.with_kind(kind);
    }
    let kind = config.market_maker.kind;

    println!("🚀 Running {kind} with seed {}...", config.seed);
    let streams = Streams::generate(&config)?;
    let outcome = {
        let config = config.clone();
        let streams = streams.clone();
        tokio::task::spawn_blocking(move || run_variant(&config, kind, &streams))
            .await
            .context("Simulation task panicked")??
    };
    print_run(&outcome.summary);

    if let Some(dir) = store_dir(store) {
        let store = RunStore::open(&dir).await?;
        let repo = store.simulations();
        let record = repo.create(&config).await?;
        repo.save_samples(record.id, &outcome.samples).await?;
        repo.save_summary(record.id, &outcome.summary).await?;
        store.streams().save(record.id, &streams).await?;
        info!(id = %record.id, store = %dir.display(), "Run stored");
        println!("💾 Stored run {}", record.id);
    }
    Ok(())
}

async fn compare(config_path: &Path, iterations: usize) -> Result<()> {
    let config = load_config(config_path).await?;
    println!(
        "🚀 Comparing {} market makers over {iterations} seed(s)...",
        MarketMakerType::ALL.len()
    );

    let handles: Vec<_> = MarketMakerType::ALL
        .into_iter()
        .map(|kind| {
            let runner =
                MonteCarloRunner::new(config.clone(), iterations).with_variants(vec![kind]);
            (kind, tokio::task::spawn_blocking(move || runner.run()))
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (kind, handle) in handles {
        let result = handle
            .await
            .context("Simulation task panicked")
            .and_then(|r| r.map_err(anyhow::Error::from))
            .and_then(|mut aggs| aggs.pop().context("No aggregate produced"));
        if let Err(e) = &result {
            error!(variant = %kind, error = %e, "Market maker failed");
        }
        results.push((kind, result));
    }
    print_comparison(&results);
    Ok(())
}

async fn summarize(store: Option<PathBuf>, id: Uuid) -> Result<()> {
    let dir = store_dir(store).context("No store given and MMSIM_STORE is unset")?;
    let repo = RunStore::new(dir).simulations();
    let record = repo
        .find_by_id(id)
        .await?
        .with_context(|| format!("Run {id} not found"))?;
    println!(
        "🔍 Run {} ({}, seed {}, created {})",
        record.id,
        record.variant,
        record.seed,
        record.created_at.format("%Y-%m-%d %H:%M:%S")
    );

    let metrics = repo.rebuild_summary(id).await?;
    print_metrics(&metrics);
    if let Some(stored) = repo.load_summary(id).await? {
        println!("Pool vs hold: {}", fmt_opt(stored.pool_vs_hold));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            store,
            seed,
            variant,
        } => run(&config, store, seed, variant).await,
        Commands::Compare { config, iterations } => compare(&config, iterations).await,
        Commands::Summarize { store, run } => summarize(store, run).await,
    }
}
