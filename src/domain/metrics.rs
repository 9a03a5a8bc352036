//! Running strategy metrics
//!
//! `StrategyMetrics` is derived solely from a strategy's closed-trade list
//! and updated incrementally on every recorded trade.

use serde::{Deserialize, Serialize};

use super::trade::ClosedTrade;

/// Incrementally maintained aggregate over a strategy's closed trades
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyMetrics {
    /// Total closed trades
    pub total_trades: u32,
    /// Trades with positive realized P&L
    pub profitable_trades: u32,
    /// Trades with negative realized P&L
    pub unprofitable_trades: u32,
    /// Sum of positive P&L
    pub total_profit: f64,
    /// Sum of absolute negative P&L
    pub total_loss: f64,
    /// `total_profit - total_loss`
    pub net_profit_loss: f64,
    /// `profitable_trades / total_trades`, 0 with no trades
    pub win_rate: f64,
    /// `total_profit / profitable_trades`, 0 with no winners
    pub avg_profit: f64,
    /// `total_loss / unprofitable_trades`, 0 with no losers
    pub avg_loss: f64,
    /// Largest single winning trade
    pub largest_profit: f64,
    /// Largest single losing trade (absolute value)
    pub largest_loss: f64,
    /// `total_profit / total_loss`, 0 when total_loss is 0
    pub profit_factor: f64,
}

impl StrategyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one closed trade into the aggregate.
    pub fn record(&mut self, trade: &ClosedTrade) {
        self.total_trades += 1;

        if trade.pnl > 0.0 {
            self.profitable_trades += 1;
            self.total_profit += trade.pnl;
            if trade.pnl > self.largest_profit {
                self.largest_profit = trade.pnl;
            }
        } else if trade.pnl < 0.0 {
            self.unprofitable_trades += 1;
            let loss = trade.pnl.abs();
            self.total_loss += loss;
            if loss > self.largest_loss {
                self.largest_loss = loss;
            }
        }

        self.net_profit_loss = self.total_profit - self.total_loss;
        self.win_rate = self.profitable_trades as f64 / self.total_trades as f64;
        self.avg_profit = if self.profitable_trades > 0 {
            self.total_profit / self.profitable_trades as f64
        } else {
            0.0
        };
        self.avg_loss = if self.unprofitable_trades > 0 {
            self.total_loss / self.unprofitable_trades as f64
        } else {
            0.0
        };
        self.profit_factor = if self.total_loss > 0.0 {
            self.total_profit / self.total_loss
        } else {
            0.0
        };
    }

    /// Recompute the aggregate from scratch. Used only to verify the
    /// incremental path.
    pub fn from_trades(trades: &[ClosedTrade]) -> Self {
        let mut metrics = Self::new();
        for trade in trades {
            metrics.record(trade);
        }
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::{Direction, ExitReason};
    use chrono::Utc;

    fn trade(pnl: f64) -> ClosedTrade {
        let now = Utc::now();
        ClosedTrade {
            token_address: "mint".to_string(),
            token_symbol: "TEST".to_string(),
            direction: Direction::Long,
            entry_price: 100.0,
            entry_time: now,
            exit_price: 100.0 * (1.0 + pnl),
            exit_time: now,
            size: 1.0,
            pnl,
            pnl_pct: pnl,
            exit_reason: ExitReason::TakeProfit,
            portfolio_value_before: 10.0,
            portfolio_value_after: 10.0 + pnl,
        }
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = StrategyMetrics::new();
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.profit_factor, 0.0);
    }

    #[test]
    fn test_net_equals_profit_minus_loss_after_every_record() {
        let mut metrics = StrategyMetrics::new();
        for pnl in [0.15, -0.07, 0.02, -0.01, 0.0, 0.3] {
            metrics.record(&trade(pnl));
            assert!(
                (metrics.net_profit_loss - (metrics.total_profit - metrics.total_loss)).abs()
                    < 1e-12
            );
            assert!(metrics.win_rate >= 0.0 && metrics.win_rate <= 1.0);
        }
    }

    #[test]
    fn test_win_rate_and_averages() {
        let mut metrics = StrategyMetrics::new();
        metrics.record(&trade(0.2));
        metrics.record(&trade(0.1));
        metrics.record(&trade(-0.1));
        metrics.record(&trade(-0.3));

        assert_eq!(metrics.total_trades, 4);
        assert!((metrics.win_rate - 0.5).abs() < 1e-12);
        assert!((metrics.avg_profit - 0.15).abs() < 1e-12);
        assert!((metrics.avg_loss - 0.2).abs() < 1e-12);
        assert!((metrics.largest_profit - 0.2).abs() < 1e-12);
        assert!((metrics.largest_loss - 0.3).abs() < 1e-12);
        assert!((metrics.profit_factor - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_profit_factor_zero_when_no_losses() {
        let mut metrics = StrategyMetrics::new();
        metrics.record(&trade(0.2));
        assert_eq!(metrics.profit_factor, 0.0);
        assert_eq!(metrics.win_rate, 1.0);
    }

    #[test]
    fn test_breakeven_trade_counts_toward_neither_side() {
        let mut metrics = StrategyMetrics::new();
        metrics.record(&trade(0.0));
        assert_eq!(metrics.total_trades, 1);
        assert_eq!(metrics.profitable_trades, 0);
        assert_eq!(metrics.unprofitable_trades, 0);
        assert_eq!(metrics.win_rate, 0.0);
    }

    #[test]
    fn test_incremental_matches_from_scratch() {
        let trades: Vec<ClosedTrade> =
            [0.15, -0.07, 0.02, -0.01, 0.3].iter().map(|&p| trade(p)).collect();
        let mut incremental = StrategyMetrics::new();
        for t in &trades {
            incremental.record(t);
        }
        let scratch = StrategyMetrics::from_trades(&trades);
        assert_eq!(incremental.total_trades, scratch.total_trades);
        assert!((incremental.net_profit_loss - scratch.net_profit_loss).abs() < 1e-12);
        assert!((incremental.profit_factor - scratch.profit_factor).abs() < 1e-12);
    }
}
