//! Performance analytics
//!
//! Pure computations over closed trades and balance history: Sharpe ratio
//! from daily returns, annualized return, and peak-replay maximum drawdown.
//! The supervisor assembles these into the final report; nothing here does
//! I/O.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::domain::ClosedTrade;
use crate::strategy::StrategyReport;

/// Annualization factor for daily returns
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

/// Annualized Sharpe ratio from realized daily returns.
///
/// Trades are bucketed by UTC exit date; each day's return is its total
/// P&L over the allocated capital. With fewer than two distinct days, or a
/// zero standard deviation, the ratio is 0.
pub fn sharpe_ratio(trades: &[ClosedTrade], allocated_capital: f64) -> f64 {
    if allocated_capital <= 0.0 {
        return 0.0;
    }

    let mut daily_pnl: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for trade in trades {
        *daily_pnl.entry(trade.exit_time.date_naive()).or_insert(0.0) += trade.pnl;
    }
    if daily_pnl.len() < 2 {
        return 0.0;
    }

    let returns: Vec<f64> = daily_pnl.values().map(|pnl| pnl / allocated_capital).collect();
    let mean = returns.as_slice().mean();
    let std_dev = returns.as_slice().std_dev();
    if std_dev == 0.0 || !std_dev.is_finite() {
        return 0.0;
    }

    mean / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized return from a total return fraction over an elapsed period.
///
/// Computes `(1 + r)^(1/years) - 1`. A non-positive elapsed time or a
/// total loss of capital yields 0.
pub fn annualized_return(total_return: f64, elapsed_secs: i64) -> f64 {
    if elapsed_secs <= 0 || total_return <= -1.0 {
        return 0.0;
    }
    let years = elapsed_secs as f64 / SECONDS_PER_YEAR;
    (1.0 + total_return).powf(1.0 / years) - 1.0
}

/// Maximum drawdown over a balance series as a fraction of the running
/// peak. Replays the series once; an empty or non-declining series is 0.
pub fn max_drawdown(balances: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for &balance in balances {
        if balance > peak {
            peak = balance;
        }
        if peak > 0.0 {
            let drawdown = (peak - balance) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst
}

/// Maximum drawdown over a strategy's realized equity curve: allocation,
/// then the portfolio value after each closed trade in order.
pub fn equity_drawdown(allocated_capital: f64, trades: &[ClosedTrade]) -> f64 {
    let mut balances = Vec::with_capacity(trades.len() + 1);
    let mut value = allocated_capital;
    balances.push(value);
    for trade in trades {
        value += trade.pnl;
        balances.push(value);
    }
    max_drawdown(&balances)
}

/// Per-strategy slice of the final report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyPerformance {
    #[serde(flatten)]
    pub report: StrategyReport,
    pub sharpe_ratio: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,
}

/// Best or worst strategy in the final report, with enough figures that a
/// consumer does not have to re-derive them from `strategies`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyHighlight {
    pub name: String,
    pub net_profit_loss: f64,
    /// Net P&L over allocated capital, as a percentage
    pub return_pct: f64,
}

/// The final simulation report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub generated_at: DateTime<Utc>,
    /// Wall-clock run duration in milliseconds
    pub run_duration_ms: i64,
    pub initial_balance: f64,
    pub final_balance: f64,
    /// Overall return on the initial balance, as a percentage
    pub total_return_pct: f64,
    /// Annualized return as a fraction
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub best_strategy: Option<StrategyHighlight>,
    pub worst_strategy: Option<StrategyHighlight>,
    pub strategies: Vec<StrategyPerformance>,
}

/// One row of the trade log, flat for CSV export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLogRow {
    pub strategy: String,
    pub token_symbol: String,
    pub token_address: String,
    pub direction: String,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub size: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub exit_reason: String,
    pub holding_hours: f64,
}

impl TradeLogRow {
    pub fn from_trade(strategy: &str, trade: &ClosedTrade) -> Self {
        Self {
            strategy: strategy.to_string(),
            token_symbol: trade.token_symbol.clone(),
            token_address: trade.token_address.clone(),
            direction: trade.direction.to_string(),
            entry_time: trade.entry_time,
            entry_price: trade.entry_price,
            exit_time: trade.exit_time,
            exit_price: trade.exit_price,
            size: trade.size,
            pnl: trade.pnl,
            pnl_pct: trade.pnl_pct,
            exit_reason: trade.exit_reason.to_string(),
            holding_hours: trade.holding_hours(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, ExitReason};
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn trade(pnl: f64, exit_time: DateTime<Utc>) -> ClosedTrade {
        ClosedTrade {
            token_address: "mint".to_string(),
            token_symbol: "TEST".to_string(),
            direction: Direction::Long,
            entry_price: 100.0,
            entry_time: exit_time - Duration::hours(3),
            exit_price: 100.0 + pnl * 100.0,
            exit_time,
            size: 1.0,
            pnl,
            pnl_pct: pnl,
            exit_reason: if pnl >= 0.0 {
                ExitReason::TakeProfit
            } else {
                ExitReason::StopLoss
            },
            portfolio_value_before: 10.0,
            portfolio_value_after: 10.0 + pnl,
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_sharpe_needs_two_days() {
        assert_eq!(sharpe_ratio(&[], 10.0), 0.0);
        assert_eq!(sharpe_ratio(&[trade(0.1, day(1))], 10.0), 0.0);
        // Two trades on the same day are still one daily return
        let same_day = [trade(0.1, day(1)), trade(0.2, day(1))];
        assert_eq!(sharpe_ratio(&same_day, 10.0), 0.0);
    }

    #[test]
    fn test_sharpe_zero_variance_is_zero() {
        let trades = [trade(0.1, day(1)), trade(0.1, day(2)), trade(0.1, day(3))];
        assert_eq!(sharpe_ratio(&trades, 10.0), 0.0);
    }

    #[test]
    fn test_sharpe_two_day_series() {
        // Daily returns 0.02 and 0.01: mean 0.015, sample std ~0.007071
        let trades = [trade(0.2, day(1)), trade(0.1, day(2))];
        let expected = 0.015 / 0.007071067811865475 * 252.0_f64.sqrt();
        assert_relative_eq!(sharpe_ratio(&trades, 10.0), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_sharpe_groups_same_day_trades() {
        // Day 1 nets +0.3 across two trades, day 2 nets +0.1
        let trades = [
            trade(0.1, day(1)),
            trade(0.2, day(1)),
            trade(0.1, day(2)),
        ];
        let grouped = [trade(0.3, day(1)), trade(0.1, day(2))];
        assert_relative_eq!(
            sharpe_ratio(&trades, 10.0),
            sharpe_ratio(&grouped, 10.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_annualized_return_round_trip() {
        // A full year at 20% stays 20%
        let year = (SECONDS_PER_YEAR) as i64;
        assert_relative_eq!(annualized_return(0.2, year), 0.2, epsilon = 1e-9);

        // Half a year at 10% compounds to 21%
        assert_relative_eq!(annualized_return(0.1, year / 2), 0.21, epsilon = 1e-9);
    }

    #[test]
    fn test_annualized_return_degenerate_inputs() {
        assert_eq!(annualized_return(0.5, 0), 0.0);
        assert_eq!(annualized_return(-1.0, 86_400), 0.0);
    }

    #[test]
    fn test_max_drawdown_peak_replay() {
        // Peak 12, trough 9: 25% drawdown. The later recovery to 11 and
        // the early dip from 10 to 9.5 (5%) do not beat it.
        let balances = [10.0, 9.5, 12.0, 10.0, 9.0, 11.0];
        assert_relative_eq!(max_drawdown(&balances), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_max_drawdown_monotonic_rise_is_zero() {
        assert_eq!(max_drawdown(&[10.0, 11.0, 12.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn test_equity_drawdown_from_trades() {
        // 10 -> 10.5 -> 9.45 -> 9.95: peak 10.5, trough 9.45 = 10%
        let trades = [
            trade(0.5, day(1)),
            trade(-1.05, day(2)),
            trade(0.5, day(3)),
        ];
        assert_relative_eq!(equity_drawdown(10.0, &trades), 0.1, epsilon = 1e-9);
        assert_eq!(equity_drawdown(10.0, &[]), 0.0);
    }

    #[test]
    fn test_trade_log_row() {
        let t = trade(0.15, day(1));
        let row = TradeLogRow::from_trade("momentum", &t);
        assert_eq!(row.strategy, "momentum");
        assert_eq!(row.direction, "LONG");
        assert_eq!(row.exit_reason, "take-profit");
        assert_relative_eq!(row.holding_hours, 3.0, epsilon = 1e-9);
    }
}
