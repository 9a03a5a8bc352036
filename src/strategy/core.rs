//! Shared strategy bookkeeping
//!
//! `StrategyCore` is the risk-management and bookkeeping contract every
//! concrete strategy composes: lifecycle flags, the closed-trade history,
//! incrementally maintained metrics, the high-water mark, and the pre-trade
//! risk gate. Signal logic lives in the variants; nothing here fetches data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{
    ClosedTrade, ProposedTrade, RiskContext, RiskParameters, RiskRejection, StrategyMetrics,
};

/// Snapshot of a strategy's state for reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyReport {
    pub name: String,
    pub active: bool,
    pub running_time_secs: i64,
    pub allocated_capital: f64,
    pub metrics: StrategyMetrics,
    pub risk_parameters: RiskParameters,
}

/// Shared bookkeeping owned by every strategy variant
#[derive(Debug, Clone)]
pub struct StrategyCore {
    name: String,
    active: bool,
    started_at: Option<DateTime<Utc>>,
    allocated_capital: f64,
    risk: RiskParameters,
    metrics: StrategyMetrics,
    trades: Vec<ClosedTrade>,
    high_water_mark: f64,
}

impl StrategyCore {
    pub fn new(name: impl Into<String>, allocated_capital: f64, risk: RiskParameters) -> Self {
        Self {
            name: name.into(),
            active: false,
            started_at: None,
            allocated_capital,
            risk,
            metrics: StrategyMetrics::new(),
            trades: Vec::new(),
            high_water_mark: allocated_capital,
        }
    }

    /// Mark the strategy active and record its start time.
    pub fn initialize(&mut self, now: DateTime<Utc>) {
        self.active = true;
        self.started_at = Some(now);
        info!(strategy = %self.name, capital = self.allocated_capital, "strategy initialized");
    }

    /// Mark the strategy inactive. Trade history is kept.
    pub fn stop(&mut self) {
        self.active = false;
        info!(strategy = %self.name, trades = self.trades.len(), "strategy stopped");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn risk(&self) -> &RiskParameters {
        &self.risk
    }

    pub fn metrics(&self) -> &StrategyMetrics {
        &self.metrics
    }

    pub fn trades(&self) -> &[ClosedTrade] {
        &self.trades
    }

    pub fn allocated_capital(&self) -> f64 {
        self.allocated_capital
    }

    /// Current portfolio value: allocation plus net realized P&L.
    pub fn portfolio_value(&self) -> f64 {
        self.allocated_capital + self.metrics.net_profit_loss
    }

    pub fn high_water_mark(&self) -> f64 {
        self.high_water_mark
    }

    /// Append a closed trade, fold it into the metrics, and advance the
    /// high-water mark.
    pub fn record_trade(&mut self, trade: ClosedTrade) {
        info!(strategy = %self.name, %trade, "trade recorded");
        self.metrics.record(&trade);
        self.trades.push(trade);

        let value = self.portfolio_value();
        if value > self.high_water_mark {
            self.high_water_mark = value;
        }
    }

    /// Realized losses from trades closed during the given UTC calendar
    /// day. The window resets at midnight; earlier losses do not count.
    pub fn daily_realized_loss(&self, now: DateTime<Utc>) -> f64 {
        let today = now.date_naive();
        self.trades
            .iter()
            .filter(|t| t.pnl < 0.0 && t.exit_time.date_naive() == today)
            .map(|t| t.pnl.abs())
            .sum()
    }

    /// The pre-trade risk gate. Evaluates the four checks against current
    /// state without mutating anything; rejections are logged with their
    /// specific reason.
    pub fn meets_risk_criteria(
        &self,
        proposed: &ProposedTrade,
        open_positions: usize,
        now: DateTime<Utc>,
    ) -> Result<(), RiskRejection> {
        let ctx = RiskContext {
            open_positions,
            total_capital: self.portfolio_value(),
            daily_realized_loss: self.daily_realized_loss(now),
            portfolio_value: self.portfolio_value(),
            high_water_mark: self.high_water_mark,
        };
        self.risk.check(proposed, &ctx).inspect_err(|rejection| {
            debug!(
                strategy = %self.name,
                token = %proposed.token_symbol,
                %rejection,
                "risk gate rejected trade"
            );
        })
    }

    /// Position size as a fraction of current capital, capped by the
    /// configured maximum.
    pub fn position_size(&self, risk_per_trade: f64) -> f64 {
        self.risk.position_size(self.portfolio_value(), risk_per_trade)
    }

    /// Snapshot for reporting.
    pub fn performance_report(&self, now: DateTime<Utc>) -> StrategyReport {
        StrategyReport {
            name: self.name.clone(),
            active: self.active,
            running_time_secs: self
                .started_at
                .map(|start| (now - start).num_seconds())
                .unwrap_or(0),
            allocated_capital: self.allocated_capital,
            metrics: self.metrics.clone(),
            risk_parameters: self.risk.clone(),
        }
    }
}
