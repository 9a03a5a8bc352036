//! Strategy contract and concrete variants
//!
//! Strategies implement the `Strategy` capability trait and compose a
//! `StrategyCore` for risk and bookkeeping. The supervisor drives them
//! through dynamic dispatch, one tick at a time.

pub mod core;
pub mod mean_reversion;
pub mod momentum;

pub use self::core::{StrategyCore, StrategyReport};
pub use mean_reversion::{MeanReversionConfig, MeanReversionStrategy};
pub use momentum::{MomentumConfig, MomentumStrategy};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PositionError;
use crate::ports::FeedError;

/// Strategy execution errors. Feed failures for individual tokens are
/// handled inside the tick; what surfaces here is unexpected.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Market data error: {0}")]
    Feed(#[from] FeedError),

    #[error("Position error: {0}")]
    Position(#[from] PositionError),

    #[error("Strategy is not active")]
    Inactive,
}

/// Tag for dispatching over a heterogeneous strategy collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    Momentum,
    MeanReversion,
}

/// Capability interface every strategy variant implements
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Which variant this is.
    fn kind(&self) -> StrategyKind;

    /// Shared bookkeeping, read-only.
    fn core(&self) -> &StrategyCore;

    /// Shared bookkeeping, mutable (lifecycle hooks).
    fn core_mut(&mut self) -> &mut StrategyCore;

    /// Number of currently open positions.
    fn open_position_count(&self) -> usize;

    /// One tick of work: discovery, update, signal-check, cleanup, in that
    /// order. Failures are caught per-strategy by the supervisor.
    async fn execute(&mut self, now: DateTime<Utc>) -> Result<(), StrategyError>;

    fn name(&self) -> String {
        self.core().name().to_string()
    }

    /// Mark active and record the start time.
    fn initialize(&mut self, now: DateTime<Utc>) {
        self.core_mut().initialize(now);
    }

    /// Mark inactive; trade history is kept.
    fn stop(&mut self) {
        self.core_mut().stop();
    }

    fn performance_report(&self, now: DateTime<Utc>) -> StrategyReport {
        self.core().performance_report(now)
    }
}
