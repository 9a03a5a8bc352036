//! Open position state
//!
//! A `Position` is one open simulated trade on one token within one
//! strategy. Stop-loss and take-profit prices are fixed at entry and never
//! recomputed; the trailing stop is the only price that may move, and only
//! in the favorable direction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::trade::{ClosedTrade, Direction, ExitReason};

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("Invalid position size: {0}")]
    InvalidSize(f64),
    #[error("Invalid entry price: {0}")]
    InvalidEntryPrice(f64),
    #[error("Invalid stop/target prices: stop {stop}, target {target}")]
    InvalidExitPrices { stop: f64, target: f64 },
}

/// An open simulated trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Token address
    pub token_address: String,
    /// Token symbol
    pub token_symbol: String,
    /// Trade direction
    pub direction: Direction,
    /// Entry price, fixed at open
    pub entry_price: f64,
    /// Entry timestamp
    pub entry_time: DateTime<Utc>,
    /// Position size in capital units
    pub size: f64,
    /// Stop-loss price, fixed at open
    pub stop_loss: f64,
    /// Take-profit price, fixed at open
    pub take_profit: f64,
    /// Trailing-stop price, set once activated, ratchets favorably only
    pub trailing_stop: Option<f64>,
    /// Most recent price seen
    pub current_price: f64,
    /// Unrealized profit/loss in capital units
    pub unrealized_pnl: f64,
    /// Unrealized profit/loss as a fraction of entry value
    pub unrealized_pnl_pct: f64,
    /// When the position last saw a price update
    pub last_updated: DateTime<Utc>,
}

impl Position {
    /// Open a new position. Stop and target must bracket the entry price on
    /// the correct sides for the direction.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        token_address: String,
        token_symbol: String,
        direction: Direction,
        entry_price: f64,
        size: f64,
        stop_loss: f64,
        take_profit: f64,
        now: DateTime<Utc>,
    ) -> Result<Self, PositionError> {
        if size <= 0.0 {
            return Err(PositionError::InvalidSize(size));
        }
        if entry_price <= 0.0 {
            return Err(PositionError::InvalidEntryPrice(entry_price));
        }
        let bracket_ok = match direction {
            Direction::Long => stop_loss < entry_price && take_profit > entry_price,
            Direction::Short => stop_loss > entry_price && take_profit < entry_price,
        };
        if !bracket_ok {
            return Err(PositionError::InvalidExitPrices {
                stop: stop_loss,
                target: take_profit,
            });
        }

        Ok(Self {
            token_address,
            token_symbol,
            direction,
            entry_price,
            entry_time: now,
            size,
            stop_loss,
            take_profit,
            trailing_stop: None,
            current_price: entry_price,
            unrealized_pnl: 0.0,
            unrealized_pnl_pct: 0.0,
            last_updated: now,
        })
    }

    /// Update with the latest price and recompute unrealized P&L.
    pub fn update_price(&mut self, price: f64, now: DateTime<Utc>) {
        self.current_price = price;
        self.unrealized_pnl = self.pnl_at(price);
        self.unrealized_pnl_pct = self.unrealized_pnl / self.size;
        self.last_updated = now;
    }

    /// Realized P&L if the position closed at `price`.
    ///
    /// Long: `(price − entry) * size / entry`; short is mirrored.
    pub fn pnl_at(&self, price: f64) -> f64 {
        match self.direction {
            Direction::Long => (price - self.entry_price) * self.size / self.entry_price,
            Direction::Short => (self.entry_price - price) * self.size / self.entry_price,
        }
    }

    /// Ratchet the trailing stop from the current price at the given
    /// distance fraction. For a long the stop only ever rises; for a short
    /// it only ever falls.
    pub fn ratchet_trailing_stop(&mut self, distance: f64) {
        let candidate = match self.direction {
            Direction::Long => self.current_price * (1.0 - distance),
            Direction::Short => self.current_price * (1.0 + distance),
        };
        self.trailing_stop = Some(match (self.trailing_stop, self.direction) {
            (None, _) => candidate,
            (Some(existing), Direction::Long) => existing.max(candidate),
            (Some(existing), Direction::Short) => existing.min(candidate),
        });
    }

    /// Whether the stop-loss has triggered at the given price (mirrored for
    /// shorts: a short stops out when price rises past the stop).
    pub fn stop_loss_hit(&self, price: f64) -> bool {
        match self.direction {
            Direction::Long => price <= self.stop_loss,
            Direction::Short => price >= self.stop_loss,
        }
    }

    /// Whether the take-profit has triggered at the given price.
    pub fn take_profit_hit(&self, price: f64) -> bool {
        match self.direction {
            Direction::Long => price >= self.take_profit,
            Direction::Short => price <= self.take_profit,
        }
    }

    /// Whether the trailing stop is active and has triggered.
    pub fn trailing_stop_hit(&self, price: f64) -> bool {
        match (self.trailing_stop, self.direction) {
            (Some(stop), Direction::Long) => price <= stop,
            (Some(stop), Direction::Short) => price >= stop,
            (None, _) => false,
        }
    }

    /// Holding period in hours as of `now`.
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.entry_time).num_seconds() as f64 / 3600.0
    }

    /// Close the position at `exit_price`, consuming it into an immutable
    /// trade record.
    pub fn close(
        self,
        exit_price: f64,
        exit_reason: ExitReason,
        now: DateTime<Utc>,
        portfolio_value_before: f64,
    ) -> ClosedTrade {
        let pnl = self.pnl_at(exit_price);
        ClosedTrade {
            token_address: self.token_address,
            token_symbol: self.token_symbol,
            direction: self.direction,
            entry_price: self.entry_price,
            entry_time: self.entry_time,
            exit_price,
            exit_time: now,
            size: self.size,
            pnl,
            pnl_pct: pnl / self.size,
            exit_reason,
            portfolio_value_before,
            portfolio_value_after: portfolio_value_before + pnl,
        }
    }
}
