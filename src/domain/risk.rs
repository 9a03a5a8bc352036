//! Risk parameters and the pre-trade risk gate
//!
//! Every strategy carries a `RiskParameters` set, immutable after
//! construction. The gate checks are pure: all inputs are passed in, no
//! state is mutated, and a rejection names the specific failing check.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::trade::Direction;

/// Per-strategy static risk configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParameters {
    /// Maximum position size as a fraction of allocated capital
    pub max_position_size: f64,
    /// Stop-loss distance as a fraction of entry price
    pub stop_loss_pct: f64,
    /// Take-profit distance as a fraction of entry price
    pub take_profit_pct: f64,
    /// Maximum concurrently open positions
    pub max_open_trades: usize,
    /// Maximum realized loss per calendar day, fraction of capital
    pub max_daily_loss: f64,
    /// Maximum drawdown from the high-water mark, fraction
    pub max_drawdown: f64,
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            max_position_size: 0.1,
            stop_loss_pct: 0.07,
            take_profit_pct: 0.15,
            max_open_trades: 3,
            max_daily_loss: 0.05,
            max_drawdown: 0.2,
        }
    }
}

/// A trade the risk gate is asked to approve
#[derive(Debug, Clone)]
pub struct ProposedTrade {
    pub token_address: String,
    pub token_symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub size: f64,
}

/// Why the risk gate rejected a proposed trade
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RiskRejection {
    #[error("Open positions at limit: {open} >= {max}")]
    TooManyOpenPositions { open: usize, max: usize },

    #[error("Position size {size:.4} exceeds {max_fraction:.2}% of capital {capital:.4}")]
    PositionTooLarge {
        size: f64,
        max_fraction: f64,
        capital: f64,
    },

    #[error("Daily loss {loss_fraction:.4} exceeds limit {max_fraction:.4}")]
    DailyLossExceeded {
        loss_fraction: f64,
        max_fraction: f64,
    },

    #[error("Drawdown {drawdown:.4} exceeds limit {max_fraction:.4}")]
    DrawdownExceeded { drawdown: f64, max_fraction: f64 },
}

/// Point-in-time inputs to the risk gate, assembled by the caller
#[derive(Debug, Clone, Copy)]
pub struct RiskContext {
    /// Currently open position count
    pub open_positions: usize,
    /// Capital allocated to the strategy
    pub total_capital: f64,
    /// Realized losses from trades closed in the current calendar day
    pub daily_realized_loss: f64,
    /// Current portfolio value (capital + net P&L)
    pub portfolio_value: f64,
    /// Highest portfolio value recorded after any trade
    pub high_water_mark: f64,
}

impl RiskParameters {
    /// Evaluate a proposed trade against all four risk checks. Each check
    /// is independent; the first failure rejects the trade.
    pub fn check(&self, proposed: &ProposedTrade, ctx: &RiskContext) -> Result<(), RiskRejection> {
        if ctx.open_positions >= self.max_open_trades {
            return Err(RiskRejection::TooManyOpenPositions {
                open: ctx.open_positions,
                max: self.max_open_trades,
            });
        }

        if proposed.size > self.max_position_size * ctx.total_capital {
            return Err(RiskRejection::PositionTooLarge {
                size: proposed.size,
                max_fraction: self.max_position_size * 100.0,
                capital: ctx.total_capital,
            });
        }

        if ctx.total_capital > 0.0 {
            let loss_fraction = ctx.daily_realized_loss / ctx.total_capital;
            if loss_fraction >= self.max_daily_loss {
                return Err(RiskRejection::DailyLossExceeded {
                    loss_fraction,
                    max_fraction: self.max_daily_loss,
                });
            }
        }

        if ctx.high_water_mark > 0.0 {
            let drawdown = (ctx.high_water_mark - ctx.portfolio_value) / ctx.high_water_mark;
            if drawdown > self.max_drawdown {
                return Err(RiskRejection::DrawdownExceeded {
                    drawdown,
                    max_fraction: self.max_drawdown,
                });
            }
        }

        Ok(())
    }

    /// Position size from capital and a per-trade risk fraction, capped by
    /// the configured maximum.
    pub fn position_size(&self, total_capital: f64, risk_per_trade: f64) -> f64 {
        total_capital * risk_per_trade.min(self.max_position_size)
    }

    /// Stop-loss price from the entry, mirrored by direction.
    pub fn stop_loss_price(&self, entry_price: f64, direction: Direction) -> f64 {
        match direction {
            Direction::Long => entry_price * (1.0 - self.stop_loss_pct),
            Direction::Short => entry_price * (1.0 + self.stop_loss_pct),
        }
    }

    /// Take-profit price from the entry, mirrored by direction.
    pub fn take_profit_price(&self, entry_price: f64, direction: Direction) -> f64 {
        match direction {
            Direction::Long => entry_price * (1.0 + self.take_profit_pct),
            Direction::Short => entry_price * (1.0 - self.take_profit_pct),
        }
    }
}
