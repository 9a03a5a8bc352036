//! Paper trading supervisor
//!
//! Owns the registered strategies and drives them through a sequential
//! tick loop: every strategy executes once per tick, in registration
//! order, on the same thread. A failing strategy is logged and skipped for
//! the tick; it never takes the loop or its peers down.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::ports::WalletPort;
use crate::strategy::{Strategy, StrategyReport};

use super::reporter::{
    annualized_return, equity_drawdown, max_drawdown, sharpe_ratio, PerformanceReport,
    StrategyHighlight, StrategyPerformance, TradeLogRow,
};

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("No strategies registered")]
    NoStrategies,

    #[error("Supervisor has not been initialized")]
    NotInitialized,
}

/// Aggregate balance state captured after each tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub elapsed_secs: i64,
    pub initial_balance: f64,
    pub current_balance: f64,
    pub change_pct: f64,
    pub strategies: Vec<StrategyReport>,
}

/// Drives registered strategies and tracks aggregate balance history
pub struct PaperTradingSupervisor {
    strategies: Vec<Box<dyn Strategy>>,
    wallet: Arc<dyn WalletPort>,
    tick_interval: Duration,
    initial_balance: f64,
    running: Arc<RwLock<bool>>,
    started_at: Option<DateTime<Utc>>,
    snapshots: Vec<BalanceSnapshot>,
}

impl PaperTradingSupervisor {
    /// `initial_balance` is the fallback when the wallet cannot report one.
    pub fn new(initial_balance: f64, tick_interval: Duration, wallet: Arc<dyn WalletPort>) -> Self {
        Self {
            strategies: Vec::new(),
            wallet,
            tick_interval,
            initial_balance,
            running: Arc::new(RwLock::new(false)),
            started_at: None,
            snapshots: Vec::new(),
        }
    }

    /// Add a strategy before the loop starts. Execution order is
    /// registration order.
    pub fn register(&mut self, strategy: Box<dyn Strategy>) {
        info!(strategy = %strategy.name(), "strategy registered");
        self.strategies.push(strategy);
    }

    /// Shared flag external tasks flip to stop the loop.
    pub fn running_handle(&self) -> Arc<RwLock<bool>> {
        Arc::clone(&self.running)
    }

    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    /// Aggregate balance: starting balance plus every strategy's realized
    /// net P&L.
    pub fn current_balance(&self) -> f64 {
        let net: f64 = self
            .strategies
            .iter()
            .map(|s| s.core().metrics().net_profit_loss)
            .sum();
        self.initial_balance + net
    }

    pub fn snapshots(&self) -> &[BalanceSnapshot] {
        &self.snapshots
    }

    /// Query the wallet for the starting balance and activate every
    /// strategy. Fails when nothing is registered.
    pub async fn initialize(&mut self, now: DateTime<Utc>) -> Result<(), SupervisorError> {
        if self.strategies.is_empty() {
            return Err(SupervisorError::NoStrategies);
        }

        match self.wallet.get_balance().await {
            Some(balance) => {
                info!(balance, "starting balance from wallet");
                self.initial_balance = balance;
            }
            None => {
                warn!(
                    fallback = self.initial_balance,
                    "wallet balance unavailable, using configured fallback"
                );
            }
        }

        self.started_at = Some(now);
        for strategy in &mut self.strategies {
            strategy.initialize(now);
        }
        info!(
            strategies = self.strategies.len(),
            balance = self.initial_balance,
            "supervisor initialized"
        );
        Ok(())
    }

    /// One pass over all strategies. Each failure is logged with the
    /// strategy's name and the remaining strategies still execute.
    pub async fn tick(&mut self, now: DateTime<Utc>) {
        for strategy in &mut self.strategies {
            if let Err(e) = strategy.execute(now).await {
                error!(strategy = %strategy.name(), error = %e, "strategy tick failed");
            }
        }
        self.record_snapshot(now);
    }

    fn record_snapshot(&mut self, now: DateTime<Utc>) {
        let current = self.current_balance();
        let change_pct = if self.initial_balance > 0.0 {
            (current - self.initial_balance) / self.initial_balance * 100.0
        } else {
            0.0
        };
        self.snapshots.push(BalanceSnapshot {
            timestamp: now,
            elapsed_secs: self
                .started_at
                .map(|start| (now - start).num_seconds())
                .unwrap_or(0),
            initial_balance: self.initial_balance,
            current_balance: current,
            change_pct,
            strategies: self
                .strategies
                .iter()
                .map(|s| s.performance_report(now))
                .collect(),
        });
    }

    /// Initialize and run the tick loop until the running flag is cleared.
    /// The first tick fires immediately.
    pub async fn run(&mut self) -> Result<(), SupervisorError> {
        self.initialize(Utc::now()).await?;
        *self.running.write().await = true;

        let mut interval = tokio::time::interval(self.tick_interval);
        loop {
            interval.tick().await;
            if !*self.running.read().await {
                break;
            }
            self.tick(Utc::now()).await;
        }
        info!("supervisor loop stopped");
        Ok(())
    }

    /// Stop the loop and every strategy, then produce the final report.
    pub async fn stop(&mut self, now: DateTime<Utc>) -> Result<PerformanceReport, SupervisorError> {
        *self.running.write().await = false;
        for strategy in &mut self.strategies {
            strategy.stop();
        }
        self.final_report(now)
    }

    /// Strategy with the highest realized net P&L. Ties keep the earliest
    /// registered.
    pub fn best_strategy(&self) -> Option<&dyn Strategy> {
        self.strategies
            .iter()
            .map(|s| s.as_ref())
            .reduce(|best, s| {
                if s.core().metrics().net_profit_loss > best.core().metrics().net_profit_loss {
                    s
                } else {
                    best
                }
            })
    }

    /// Strategy with the lowest realized net P&L. Ties keep the earliest
    /// registered.
    pub fn worst_strategy(&self) -> Option<&dyn Strategy> {
        self.strategies
            .iter()
            .map(|s| s.as_ref())
            .reduce(|worst, s| {
                if s.core().metrics().net_profit_loss < worst.core().metrics().net_profit_loss {
                    s
                } else {
                    worst
                }
            })
    }

    fn highlight(strategy: &dyn Strategy) -> StrategyHighlight {
        let core = strategy.core();
        let net = core.metrics().net_profit_loss;
        let return_pct = if core.allocated_capital() > 0.0 {
            net / core.allocated_capital() * 100.0
        } else {
            0.0
        };
        StrategyHighlight {
            name: strategy.name(),
            net_profit_loss: net,
            return_pct,
        }
    }

    /// Assemble the performance report from the balance history and each
    /// strategy's trades.
    pub fn final_report(&self, now: DateTime<Utc>) -> Result<PerformanceReport, SupervisorError> {
        let started_at = self.started_at.ok_or(SupervisorError::NotInitialized)?;
        let elapsed_secs = (now - started_at).num_seconds();

        let final_balance = self.current_balance();
        let total_return = if self.initial_balance > 0.0 {
            (final_balance - self.initial_balance) / self.initial_balance
        } else {
            0.0
        };

        let mut balances = Vec::with_capacity(self.snapshots.len() + 1);
        balances.push(self.initial_balance);
        balances.extend(self.snapshots.iter().map(|s| s.current_balance));

        let all_trades: Vec<_> = self
            .strategies
            .iter()
            .flat_map(|s| s.core().trades().iter().cloned())
            .collect();

        Ok(PerformanceReport {
            generated_at: now,
            run_duration_ms: (now - started_at).num_milliseconds(),
            initial_balance: self.initial_balance,
            final_balance,
            total_return_pct: total_return * 100.0,
            annualized_return: annualized_return(total_return, elapsed_secs),
            sharpe_ratio: sharpe_ratio(&all_trades, self.initial_balance),
            max_drawdown: max_drawdown(&balances),
            best_strategy: self.best_strategy().map(Self::highlight),
            worst_strategy: self.worst_strategy().map(Self::highlight),
            strategies: self
                .strategies
                .iter()
                .map(|s| {
                    let core = s.core();
                    let net = core.metrics().net_profit_loss;
                    let strategy_return = if core.allocated_capital() > 0.0 {
                        net / core.allocated_capital()
                    } else {
                        0.0
                    };
                    StrategyPerformance {
                        report: s.performance_report(now),
                        sharpe_ratio: sharpe_ratio(core.trades(), core.allocated_capital()),
                        annualized_return: annualized_return(strategy_return, elapsed_secs),
                        max_drawdown: equity_drawdown(core.allocated_capital(), core.trades()),
                    }
                })
                .collect(),
        })
    }

    /// Every closed trade across all strategies as flat log rows, in
    /// chronological exit order.
    pub fn trade_log(&self) -> Vec<TradeLogRow> {
        let mut rows: Vec<TradeLogRow> = self
            .strategies
            .iter()
            .flat_map(|s| {
                let name = s.name();
                s.core()
                    .trades()
                    .iter()
                    .map(move |t| TradeLogRow::from_trade(&name, t))
                    .collect::<Vec<_>>()
            })
            .collect();
        rows.sort_by_key(|row| row.exit_time);
        rows
    }
}
