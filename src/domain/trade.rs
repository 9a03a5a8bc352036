//! Closed trade records
//!
//! A `ClosedTrade` is the immutable unit of truth for all metrics and
//! reporting. Once a position is closed and converted into a trade, the
//! record never mutates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a simulated position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Profit when price rises
    Long,
    /// Profit when price falls
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Price crossed the fixed stop-loss
    StopLoss,
    /// Price crossed the fixed take-profit
    TakeProfit,
    /// Price fell back through the trailing stop
    TrailingStop,
    /// Holding period exceeded the maximum duration
    TimeStop,
    /// Price returned to the moving average (mean reversion only)
    ReversionComplete,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "stop-loss",
            ExitReason::TakeProfit => "take-profit",
            ExitReason::TrailingStop => "trailing-stop",
            ExitReason::TimeStop => "time-stop",
            ExitReason::ReversionComplete => "reversion-complete",
        };
        write!(f, "{}", s)
    }
}

/// An immutable closed-position record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    /// Token address
    pub token_address: String,
    /// Token symbol
    pub token_symbol: String,
    /// Trade direction
    pub direction: Direction,
    /// Entry price
    pub entry_price: f64,
    /// Entry timestamp
    pub entry_time: DateTime<Utc>,
    /// Exit price
    pub exit_price: f64,
    /// Exit timestamp
    pub exit_time: DateTime<Utc>,
    /// Position size in capital units
    pub size: f64,
    /// Realized profit/loss in capital units
    pub pnl: f64,
    /// Realized profit/loss as a fraction of entry value
    pub pnl_pct: f64,
    /// Why the position was closed
    pub exit_reason: ExitReason,
    /// Portfolio value before the trade closed
    pub portfolio_value_before: f64,
    /// Portfolio value after the trade closed
    pub portfolio_value_after: f64,
}

impl ClosedTrade {
    /// Holding period in whole seconds
    pub fn holding_seconds(&self) -> i64 {
        (self.exit_time - self.entry_time).num_seconds()
    }

    /// Holding period in hours
    pub fn holding_hours(&self) -> f64 {
        self.holding_seconds() as f64 / 3600.0
    }

    /// True if the trade realized a profit
    pub fn is_profitable(&self) -> bool {
        self.pnl > 0.0
    }
}

impl fmt::Display for ClosedTrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:.6} -> {:.6} pnl {:+.4} ({:+.2}%) [{}]",
            self.direction,
            self.token_symbol,
            self.entry_price,
            self.exit_price,
            self.pnl,
            self.pnl_pct * 100.0,
            self.exit_reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_trade() -> ClosedTrade {
        ClosedTrade {
            token_address: "mint111".to_string(),
            token_symbol: "TEST".to_string(),
            direction: Direction::Long,
            entry_price: 100.0,
            entry_time: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            exit_price: 115.0,
            exit_time: Utc.with_ymd_and_hms(2024, 3, 1, 16, 30, 0).unwrap(),
            size: 1.0,
            pnl: 0.15,
            pnl_pct: 0.15,
            exit_reason: ExitReason::TakeProfit,
            portfolio_value_before: 10.0,
            portfolio_value_after: 10.15,
        }
    }

    #[test]
    fn test_holding_hours() {
        let trade = sample_trade();
        assert!((trade.holding_hours() - 6.5).abs() < 1e-9);
    }

    #[test]
    fn test_is_profitable() {
        let mut trade = sample_trade();
        assert!(trade.is_profitable());
        trade = ClosedTrade { pnl: -0.05, ..trade };
        assert!(!trade.is_profitable());
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Long.to_string(), "LONG");
        assert_eq!(Direction::Short.to_string(), "SHORT");
    }

    #[test]
    fn test_display_contains_reason() {
        let text = sample_trade().to_string();
        assert!(text.contains("take-profit"));
        assert!(text.contains("TEST"));
    }
}
