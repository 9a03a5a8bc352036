//! Outward-facing adapters
//!
//! HTTP market data, command-line parsing, and report persistence. Each
//! adapter implements or serves a port; nothing in here holds trading
//! logic.

pub mod cli;
pub mod dexscreener;
pub mod report_writer;

pub use cli::{CliApp, Command, RunCmd, ValidateCmd};
pub use dexscreener::{DexScreenerConfig, DexScreenerFeed};
pub use report_writer::{read_trade_log, ReportWriteError, ReportWriter};
