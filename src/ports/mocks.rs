//! Hand-written mock ports for deterministic tests
//!
//! The mock feed replays scripted per-token analysis sequences: each
//! `get_token_analysis` call pops the next entry, and the final entry
//! sticks once the script runs out. Calls are recorded for assertions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::market_data::{FeedError, MarketDataFeed, TokenAnalysis, TokenRef};

/// Scripted market data feed
#[derive(Debug, Default, Clone)]
pub struct MockFeed {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Option<TokenAnalysis>>>>>,
    trending: Arc<Mutex<Vec<TokenRef>>>,
    calls: Arc<Mutex<Vec<String>>>,
    fail_trending: Arc<Mutex<bool>>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the analysis sequence returned for a token, one per call.
    pub fn with_analyses(self, address: &str, analyses: Vec<TokenAnalysis>) -> Self {
        self.scripts.lock().unwrap().insert(
            address.to_string(),
            analyses.into_iter().map(Some).collect(),
        );
        self
    }

    /// Script a token for which the feed has no data.
    pub fn with_missing(self, address: &str) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(address.to_string(), VecDeque::from([None]));
        self
    }

    /// Set the trending token list.
    pub fn with_trending(self, tokens: Vec<TokenRef>) -> Self {
        *self.trending.lock().unwrap() = tokens;
        self
    }

    /// Make `get_trending_tokens` fail.
    pub fn with_trending_failure(self) -> Self {
        *self.fail_trending.lock().unwrap() = true;
        self
    }

    /// Append one more scripted analysis for a token.
    pub fn push_analysis(&self, address: &str, analysis: TokenAnalysis) {
        self.scripts
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default()
            .push_back(Some(analysis));
    }

    /// All recorded `get_token_analysis` addresses, in call order.
    pub fn analysis_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataFeed for MockFeed {
    async fn get_token_analysis(&self, address: &str) -> Result<Option<TokenAnalysis>, FeedError> {
        self.calls.lock().unwrap().push(address.to_string());
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(address) {
            Some(queue) => {
                if queue.len() > 1 {
                    Ok(queue.pop_front().unwrap())
                } else {
                    // Final entry sticks
                    Ok(queue.front().cloned().flatten())
                }
            }
            None => Ok(None),
        }
    }

    async fn get_trending_tokens(&self) -> Result<Vec<TokenRef>, FeedError> {
        if *self.fail_trending.lock().unwrap() {
            return Err(FeedError::Http("scripted trending failure".to_string()));
        }
        Ok(self.trending.lock().unwrap().clone())
    }
}

/// A token analysis with healthy defaults that pass the momentum discovery
/// filter; tests override individual fields as needed.
pub fn analysis(address: &str, symbol: &str, price: f64) -> TokenAnalysis {
    TokenAnalysis {
        address: address.to_string(),
        symbol: symbol.to_string(),
        price,
        liquidity_usd: 200_000.0,
        volume_1h: 50_000.0,
        volume_6h: 200_000.0,
        volume_24h: 600_000.0,
        price_change_1h: 5.0,
        price_change_24h: 15.0,
        pair_created_at: Some(Utc::now() - Duration::hours(72)),
    }
}
