//! DexScreener market data adapter
//!
//! Implements the market data port over the public DexScreener HTTP API.
//! Responses are mapped tolerantly: missing numeric fields default to zero
//! and a token whose payload cannot be mapped is reported as absent rather
//! than failing the tick. Requests are rate limited to the free tier.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::ports::{FeedError, MarketDataFeed, TokenAnalysis, TokenRef};

const DEFAULT_BASE_URL: &str = "https://api.dexscreener.com";
const DEFAULT_RATE_LIMIT_RPM: u32 = 300;
const MIN_REQUEST_INTERVAL_MS: u64 = 250;

/// DexScreener adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DexScreenerConfig {
    pub base_url: String,
    pub rate_limit_rpm: u32,
    pub timeout_secs: u64,
}

impl Default for DexScreenerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            rate_limit_rpm: DEFAULT_RATE_LIMIT_RPM,
            timeout_secs: 30,
        }
    }
}

impl DexScreenerConfig {
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.base_url.is_empty() {
            return Err(FeedError::Unsupported("base_url must not be empty".into()));
        }
        if self.rate_limit_rpm == 0 {
            return Err(FeedError::Unsupported("rate_limit_rpm must be > 0".into()));
        }
        Ok(())
    }
}

/// Fixed-window rate limiter with a minimum inter-request interval
#[derive(Debug)]
struct RateLimiter {
    rpm_limit: u32,
    last_request: Instant,
    requests_in_window: u32,
    window_start: Instant,
}

impl RateLimiter {
    fn new(rpm_limit: u32) -> Self {
        let now = Instant::now();
        Self {
            rpm_limit,
            last_request: now,
            requests_in_window: 0,
            window_start: now,
        }
    }

    /// Milliseconds to wait before the next request, `None` if clear.
    fn check(&mut self) -> Option<u64> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.window_start);

        if elapsed >= Duration::from_secs(60) {
            self.window_start = now;
            self.requests_in_window = 0;
        }

        if self.requests_in_window >= self.rpm_limit {
            let wait = Duration::from_secs(60).saturating_sub(elapsed);
            return Some(wait.as_millis() as u64);
        }

        let since_last = now.duration_since(self.last_request);
        if since_last < Duration::from_millis(MIN_REQUEST_INTERVAL_MS) {
            let wait = Duration::from_millis(MIN_REQUEST_INTERVAL_MS) - since_last;
            return Some(wait.as_millis() as u64);
        }

        None
    }

    fn record(&mut self) {
        self.last_request = Instant::now();
        self.requests_in_window += 1;
    }

    async fn wait_if_needed(&mut self) {
        if let Some(wait_ms) = self.check() {
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
        }
        self.record();
    }
}

// Wire types, shaped after the DexScreener response payloads.

#[derive(Debug, Deserialize)]
struct TokenPairsResponse {
    #[serde(default)]
    pairs: Option<Vec<PairDto>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairDto {
    base_token: BaseTokenDto,
    #[serde(default)]
    price_usd: Option<String>,
    #[serde(default)]
    liquidity: Option<LiquidityDto>,
    #[serde(default)]
    volume: Option<VolumeDto>,
    #[serde(default)]
    price_change: Option<PriceChangeDto>,
    #[serde(default)]
    pair_created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct BaseTokenDto {
    address: String,
    #[serde(default)]
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct LiquidityDto {
    #[serde(default)]
    usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct VolumeDto {
    #[serde(default)]
    h1: Option<f64>,
    #[serde(default)]
    h6: Option<f64>,
    #[serde(default)]
    h24: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PriceChangeDto {
    #[serde(default)]
    h1: Option<f64>,
    #[serde(default)]
    h24: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoostedTokenDto {
    token_address: String,
    #[serde(default)]
    description: Option<String>,
}

impl PairDto {
    fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }

    /// Map one pair into an analysis. Returns `None` when the price is
    /// missing or unparseable.
    fn into_analysis(self) -> Option<TokenAnalysis> {
        let price: f64 = self.price_usd.as_deref()?.parse().ok()?;
        let liquidity_usd = self.liquidity_usd();
        let volume = self.volume.unwrap_or(VolumeDto {
            h1: None,
            h6: None,
            h24: None,
        });
        let change = self.price_change.unwrap_or(PriceChangeDto {
            h1: None,
            h24: None,
        });
        let pair_created_at = self
            .pair_created_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

        Some(TokenAnalysis {
            address: self.base_token.address,
            symbol: self.base_token.symbol,
            price,
            liquidity_usd,
            volume_1h: volume.h1.unwrap_or(0.0),
            volume_6h: volume.h6.unwrap_or(0.0),
            volume_24h: volume.h24.unwrap_or(0.0),
            price_change_1h: change.h1.unwrap_or(0.0),
            price_change_24h: change.h24.unwrap_or(0.0),
            pair_created_at,
        })
    }
}

/// Select the deepest pool and map it; pairs without a usable price are
/// skipped.
fn best_pair_analysis(pairs: Vec<PairDto>) -> Option<TokenAnalysis> {
    pairs
        .into_iter()
        .filter(|p| p.price_usd.is_some())
        .max_by(|a, b| a.liquidity_usd().total_cmp(&b.liquidity_usd()))
        .and_then(PairDto::into_analysis)
}

/// Market data feed backed by the DexScreener API
pub struct DexScreenerFeed {
    config: DexScreenerConfig,
    http_client: Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl DexScreenerFeed {
    pub fn new(config: DexScreenerConfig) -> Result<Self, FeedError> {
        config.validate()?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FeedError::Http(e.to_string()))?;
        let rate_limiter = Arc::new(Mutex::new(RateLimiter::new(config.rate_limit_rpm)));
        Ok(Self {
            config,
            http_client,
            rate_limiter,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FeedError> {
        self.rate_limiter.lock().await.wait_if_needed().await;

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::Http(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(60_000);
            return Err(FeedError::RateLimited(retry_ms));
        }
        if !response.status().is_success() {
            return Err(FeedError::Http(format!(
                "unexpected status {} from {}",
                response.status(),
                url
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FeedError::Parse(e.to_string()))
    }
}

#[async_trait]
impl MarketDataFeed for DexScreenerFeed {
    async fn get_token_analysis(&self, address: &str) -> Result<Option<TokenAnalysis>, FeedError> {
        let url = format!("{}/latest/dex/tokens/{}", self.config.base_url, address);
        let response: TokenPairsResponse = self.get_json(&url).await?;

        let analysis = response.pairs.and_then(best_pair_analysis);
        if analysis.is_none() {
            debug!(token = %address, "no usable pair data");
        }
        Ok(analysis)
    }

    async fn get_trending_tokens(&self) -> Result<Vec<TokenRef>, FeedError> {
        let url = format!("{}/token-boosts/top/v1", self.config.base_url);
        let boosted: Vec<BoostedTokenDto> = self.get_json(&url).await?;

        // Symbols are not part of the boost payload; they are resolved by
        // the per-token analysis fetch.
        Ok(boosted
            .into_iter()
            .map(|t| TokenRef {
                address: t.token_address,
                symbol: t.description.unwrap_or_default(),
            })
            .collect())
    }
}
