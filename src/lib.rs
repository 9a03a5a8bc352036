//! Papertrader - Strategy Simulation and Performance Analytics
//!
//! A paper trading simulator that runs momentum and mean reversion
//! strategies against live market data without touching real funds, and
//! reports Sharpe ratio, drawdown, and per-strategy performance.
//!
//! # Modules
//!
//! - `domain`: Core business logic (Position, ClosedTrade, metrics, risk gate, indicators)
//! - `ports`: Trait abstractions (MarketDataFeed, WalletPort)
//! - `strategy`: Signal generation (Momentum, MeanReversion, shared StrategyCore)
//! - `adapters`: External implementations (DexScreener, CLI, report writer)
//! - `config`: Configuration loading and validation
//! - `application`: Supervisor tick loop and performance reporting

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod strategy;
