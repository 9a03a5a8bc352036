//! Application services
//!
//! The supervisor orchestrates strategies over a tick loop; the reporter
//! turns trade history and balance snapshots into performance figures.

pub mod reporter;
pub mod supervisor;

pub use reporter::{
    annualized_return, equity_drawdown, max_drawdown, sharpe_ratio, PerformanceReport,
    StrategyHighlight, StrategyPerformance, TradeLogRow, TRADING_DAYS_PER_YEAR,
};
pub use supervisor::{BalanceSnapshot, PaperTradingSupervisor, SupervisorError};
