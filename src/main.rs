//! Papertrader binary entry point

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use papertrader::adapters::{
    cli, CliApp, Command, DexScreenerFeed, ReportWriter, RunCmd, ValidateCmd,
};
use papertrader::application::{PaperTradingSupervisor, PerformanceReport};
use papertrader::config::{load_config, Config, LoggingSection};
use papertrader::ports::{MarketDataFeed, StaticWallet};
use papertrader::strategy::{MeanReversionStrategy, MomentumStrategy};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let app = cli::init();
    match app.command {
        Command::Run(cmd) => run_command(cmd, app.verbose, app.debug).await,
        Command::Validate(cmd) => validate_command(cmd),
    }
}

/// CLI flags take precedence over the config file; RUST_LOG overrides the
/// configured level when neither flag is set.
fn init_logging(verbose: bool, debug: bool, logging: &LoggingSection) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    if logging.log_to_file {
        let path = Path::new(&logging.log_file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = fs::File::create(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
            .init();
    } else {
        registry.init();
    }
    Ok(())
}

fn validate_command(cmd: ValidateCmd) -> Result<()> {
    load_config(&cmd.config).context("Configuration is invalid")?;
    println!("Configuration OK: {}", cmd.config.display());
    Ok(())
}

fn build_supervisor(config: &Config) -> Result<PaperTradingSupervisor> {
    let feed: Arc<dyn MarketDataFeed> = Arc::new(
        DexScreenerFeed::new(config.feed.clone()).context("Failed to create market data feed")?,
    );
    let initial_balance = config.system.initial_balance;
    let wallet = Arc::new(StaticWallet::new(initial_balance));

    let mut supervisor = PaperTradingSupervisor::new(
        initial_balance,
        Duration::from_secs(config.system.tick_interval_secs),
        wallet,
    );

    if config.momentum.enabled {
        supervisor.register(Box::new(MomentumStrategy::new(
            "momentum",
            initial_balance * config.momentum.allocation,
            config.momentum.risk.clone(),
            config.momentum.params.clone(),
            Arc::clone(&feed),
        )));
    }
    if config.mean_reversion.enabled {
        supervisor.register(Box::new(MeanReversionStrategy::new(
            "mean_reversion",
            initial_balance * config.mean_reversion.allocation,
            config.mean_reversion.risk.clone(),
            config.mean_reversion.params.clone(),
            Arc::clone(&feed),
        )));
    }

    Ok(supervisor)
}

async fn run_command(cmd: RunCmd, verbose: bool, debug: bool) -> Result<()> {
    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    init_logging(verbose, debug, &config.logging)?;

    tracing::info!("Starting paper trading simulator");
    let mut supervisor = build_supervisor(&config)?;

    match cmd.ticks {
        Some(ticks) => {
            supervisor.initialize(Utc::now()).await?;
            let mut interval =
                tokio::time::interval(Duration::from_secs(config.system.tick_interval_secs));
            for _ in 0..ticks {
                interval.tick().await;
                supervisor.tick(Utc::now()).await;
            }
        }
        None => {
            let running = supervisor.running_handle();
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                tracing::info!("Shutdown signal received");
                *running.write().await = false;
            });
            supervisor.run().await?;
        }
    }

    let report = supervisor.stop(Utc::now()).await?;
    let writer = ReportWriter::new(&config.system.report_dir);
    let report_path = writer.write_report(&report)?;
    let trades_path = writer.write_trade_log(&report, &supervisor.trade_log())?;

    print_summary(&report);
    println!("Report:    {}", report_path.display());
    println!("Trade log: {}", trades_path.display());
    Ok(())
}

fn print_summary(report: &PerformanceReport) {
    println!("=== Simulation summary ===");
    println!(
        "Balance:   {:.4} -> {:.4} ({:+.2}%)",
        report.initial_balance, report.final_balance, report.total_return_pct
    );
    println!("Annualized return: {:+.2}%", report.annualized_return * 100.0);
    println!("Sharpe ratio:      {:.2}", report.sharpe_ratio);
    println!("Max drawdown:      {:.2}%", report.max_drawdown * 100.0);
    for strategy in &report.strategies {
        println!(
            "  {}: {} trades, net {:+.4}, win rate {:.0}%, sharpe {:.2}",
            strategy.report.name,
            strategy.report.metrics.total_trades,
            strategy.report.metrics.net_profit_loss,
            strategy.report.metrics.win_rate * 100.0,
            strategy.sharpe_ratio
        );
    }
    if let Some(best) = &report.best_strategy {
        println!(
            "Best strategy:  {} ({:+.4}, {:+.2}%)",
            best.name, best.net_profit_loss, best.return_pct
        );
    }
    if let Some(worst) = &report.worst_strategy {
        println!(
            "Worst strategy: {} ({:+.4}, {:+.2}%)",
            worst.name, worst.net_profit_loss, worst.return_pct
        );
    }
}
