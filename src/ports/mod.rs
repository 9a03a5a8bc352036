//! Port abstractions for external collaborators
//!
//! Market data and wallet balances come from outside the simulator; these
//! traits are the only boundary strategies and the supervisor see.

pub mod market_data;
pub mod mocks;
pub mod wallet;

pub use market_data::{FeedError, MarketDataFeed, TokenAnalysis, TokenRef};
pub use wallet::{StaticWallet, WalletPort};
