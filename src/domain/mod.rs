//! Core domain types
//!
//! Position lifecycle, immutable trade records, running metrics, risk
//! parameters with the pre-trade gate, and pure indicator math. Nothing in
//! this module performs I/O.

pub mod indicators;
pub mod metrics;
pub mod position;
pub mod risk;
pub mod trade;

pub use metrics::StrategyMetrics;
pub use position::{Position, PositionError};
pub use risk::{ProposedTrade, RiskContext, RiskParameters, RiskRejection};
pub use trade::{ClosedTrade, Direction, ExitReason};
