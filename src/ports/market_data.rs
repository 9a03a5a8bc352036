//! Market data port
//!
//! Strategies consume point-in-time token analyses through this trait and
//! never talk to a provider directly. A `None` or failed analysis means the
//! token is skipped for the current tick; it is never an excuse to trade on
//! stale data.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Market data error type
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Data parsing error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {0} ms")]
    RateLimited(u64),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// A token identity from trending discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRef {
    /// Token address
    pub address: String,
    /// Token symbol
    pub symbol: String,
}

/// Point-in-time analysis of one token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenAnalysis {
    /// Token address
    pub address: String,
    /// Token symbol
    pub symbol: String,
    /// Current price in USD
    pub price: f64,
    /// Liquidity in USD
    pub liquidity_usd: f64,
    /// Trailing 1-hour volume in USD
    pub volume_1h: f64,
    /// Trailing 6-hour volume in USD
    pub volume_6h: f64,
    /// Trailing 24-hour volume in USD
    pub volume_24h: f64,
    /// 1-hour price change percentage
    pub price_change_1h: f64,
    /// 24-hour price change percentage
    pub price_change_24h: f64,
    /// When the trading pair was created
    pub pair_created_at: Option<DateTime<Utc>>,
}

impl TokenAnalysis {
    /// Volume-to-liquidity ratio over 24 hours, 0 with no liquidity.
    pub fn volume_liquidity_ratio(&self) -> f64 {
        if self.liquidity_usd <= 0.0 {
            return 0.0;
        }
        self.volume_24h / self.liquidity_usd
    }

    /// Pair age in hours as of `now`, `None` when creation time is unknown.
    pub fn pair_age_hours(&self, now: DateTime<Utc>) -> Option<f64> {
        self.pair_created_at
            .map(|created| (now - created).num_seconds() as f64 / 3600.0)
    }
}

/// Port for point-in-time market data
#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    /// Fetch the current analysis for one token. `Ok(None)` means the
    /// provider has no data for the token right now.
    async fn get_token_analysis(&self, address: &str) -> Result<Option<TokenAnalysis>, FeedError>;

    /// Fetch the current ordered list of trending tokens.
    async fn get_trending_tokens(&self) -> Result<Vec<TokenRef>, FeedError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn analysis() -> TokenAnalysis {
        TokenAnalysis {
            address: "mint111".to_string(),
            symbol: "TEST".to_string(),
            price: 1.25,
            liquidity_usd: 200_000.0,
            volume_1h: 30_000.0,
            volume_6h: 120_000.0,
            volume_24h: 400_000.0,
            price_change_1h: 4.2,
            price_change_24h: 12.0,
            pair_created_at: Some(Utc::now() - Duration::hours(48)),
        }
    }

    #[test]
    fn test_volume_liquidity_ratio() {
        let a = analysis();
        assert!((a.volume_liquidity_ratio() - 2.0).abs() < 1e-12);

        let empty = TokenAnalysis {
            liquidity_usd: 0.0,
            ..a
        };
        assert_eq!(empty.volume_liquidity_ratio(), 0.0);
    }

    #[test]
    fn test_pair_age_hours() {
        let a = analysis();
        let age = a.pair_age_hours(Utc::now()).unwrap();
        assert!((age - 48.0).abs() < 0.01);

        let unknown = TokenAnalysis {
            pair_created_at: None,
            ..a
        };
        assert!(unknown.pair_age_hours(Utc::now()).is_none());
    }
}
