//! Mean reversion strategy
//!
//! Watches established tokens and trades deviations from a short moving
//! average: long when RSI is oversold and price sits well below the SMA,
//! short when overbought and well above it. Positions close on stop-loss,
//! take-profit, completed reversion back to the mean, or a time stop.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::indicators::{deviation_from, rsi, sma};
use crate::domain::{Direction, ExitReason, Position, ProposedTrade, RiskParameters};
use crate::ports::{MarketDataFeed, TokenAnalysis};

use super::{Strategy, StrategyCore, StrategyError, StrategyKind};

/// Mean reversion strategy tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanReversionConfig {
    /// RSI lookback in price changes
    pub rsi_period: usize,
    /// RSI at or below this level reads as oversold
    pub rsi_oversold: f64,
    /// RSI at or above this level reads as overbought
    pub rsi_overbought: f64,
    /// SMA lookback expressed in hours
    pub sma_lookback_hours: f64,
    /// Expected seconds between ticks, used to size the SMA window
    pub tick_interval_secs: u64,
    /// Minimum absolute deviation from the SMA for entry
    pub min_deviation: f64,
    /// Absolute deviation at or below which the reversion is complete
    pub reversion_tolerance: f64,
    /// Minimum pair age in hours for discovery
    pub min_pair_age_hours: f64,
    /// Liquidity floor in USD
    pub min_liquidity_usd: f64,
    /// Liquidity ceiling in USD
    pub max_liquidity_usd: f64,
    /// Minimum 24h volume to liquidity ratio for discovery
    pub min_volume_liquidity_ratio: f64,
    /// Fraction of capital risked per trade
    pub risk_per_trade: f64,
    /// Maximum holding period in hours
    pub max_holding_hours: f64,
    /// Monitored tokens not updated within this window are evicted
    pub stale_after_hours: f64,
    /// Upper bound on the monitored-token store
    pub max_monitored: usize,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            sma_lookback_hours: 4.0,
            tick_interval_secs: 60,
            min_deviation: 0.05,
            reversion_tolerance: 0.03,
            min_pair_age_hours: 24.0,
            min_liquidity_usd: 50_000.0,
            max_liquidity_usd: 2_000_000.0,
            min_volume_liquidity_ratio: 0.5,
            risk_per_trade: 0.1,
            max_holding_hours: 12.0,
            stale_after_hours: 2.0,
            max_monitored: 30,
        }
    }
}

impl MeanReversionConfig {
    /// SMA window in samples, derived from the lookback and the tick
    /// interval. Never below two samples.
    pub fn sma_window(&self) -> usize {
        let samples = (self.sma_lookback_hours * 3600.0 / self.tick_interval_secs as f64) as usize;
        samples.max(2)
    }

    /// Price history samples to retain per token.
    fn history_cap(&self) -> usize {
        self.sma_window().max(self.rsi_period + 1)
    }
}

/// A token under observation
#[derive(Debug, Clone)]
struct WatchedToken {
    symbol: String,
    prices: VecDeque<f64>,
    last: TokenAnalysis,
    last_updated: DateTime<Utc>,
}

impl WatchedToken {
    fn new(analysis: TokenAnalysis, now: DateTime<Utc>) -> Self {
        let mut prices = VecDeque::new();
        prices.push_back(analysis.price);
        Self {
            symbol: analysis.symbol.clone(),
            prices,
            last: analysis,
            last_updated: now,
        }
    }

    fn push_price(&mut self, price: f64, cap: usize) {
        self.prices.push_back(price);
        while self.prices.len() > cap {
            self.prices.pop_front();
        }
    }

    fn price_slice(&self) -> Vec<f64> {
        self.prices.iter().copied().collect()
    }
}

/// Mean reversion strategy over established tokens
pub struct MeanReversionStrategy {
    core: StrategyCore,
    config: MeanReversionConfig,
    feed: Arc<dyn MarketDataFeed>,
    watched: HashMap<String, WatchedToken>,
    positions: HashMap<String, Position>,
}

impl MeanReversionStrategy {
    pub fn new(
        name: impl Into<String>,
        allocated_capital: f64,
        risk: RiskParameters,
        config: MeanReversionConfig,
        feed: Arc<dyn MarketDataFeed>,
    ) -> Self {
        Self {
            core: StrategyCore::new(name, allocated_capital, risk),
            config,
            feed,
            watched: HashMap::new(),
            positions: HashMap::new(),
        }
    }

    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }

    pub fn position(&self, address: &str) -> Option<&Position> {
        self.positions.get(address)
    }

    /// Discovery filter: the pair must be old enough to have a meaningful
    /// mean, with liquidity inside the tradable band and enough turnover
    /// that the mean reflects real trading. Unknown age rejects.
    fn passes_filter(&self, analysis: &TokenAnalysis, now: DateTime<Utc>) -> bool {
        let old_enough = analysis
            .pair_age_hours(now)
            .is_some_and(|age| age >= self.config.min_pair_age_hours);
        old_enough
            && analysis.liquidity_usd >= self.config.min_liquidity_usd
            && analysis.liquidity_usd <= self.config.max_liquidity_usd
            && analysis.volume_liquidity_ratio() >= self.config.min_volume_liquidity_ratio
    }

    async fn discover(&mut self, now: DateTime<Utc>) -> HashSet<String> {
        let mut admitted = HashSet::new();

        let trending = match self.feed.get_trending_tokens().await {
            Ok(list) => list,
            Err(e) => {
                warn!(strategy = %self.core.name(), error = %e, "trending fetch failed, skipping discovery");
                return admitted;
            }
        };

        for candidate in trending {
            if self.watched.contains_key(&candidate.address) {
                continue;
            }
            if self.watched.len() >= self.config.max_monitored {
                break;
            }
            let analysis = match self.feed.get_token_analysis(&candidate.address).await {
                Ok(Some(a)) if a.price > 0.0 => a,
                Ok(_) => continue,
                Err(e) => {
                    debug!(token = %candidate.address, error = %e, "analysis fetch failed");
                    continue;
                }
            };
            if self.passes_filter(&analysis, now) {
                debug!(strategy = %self.core.name(), token = %analysis.symbol, "watching token");
                admitted.insert(candidate.address.clone());
                self.watched
                    .insert(candidate.address, WatchedToken::new(analysis, now));
            }
        }

        admitted
    }

    /// Refresh prices for watched tokens and run exit checks for any open
    /// positions, skipping tokens admitted on this tick.
    async fn update(&mut self, admitted: &HashSet<String>, now: DateTime<Utc>) {
        let addresses: Vec<String> = self
            .watched
            .keys()
            .filter(|a| !admitted.contains(*a))
            .cloned()
            .collect();

        for address in addresses {
            let analysis = match self.feed.get_token_analysis(&address).await {
                Ok(Some(a)) if a.price > 0.0 => a,
                Ok(_) => {
                    debug!(token = %address, "no data this tick, skipping");
                    continue;
                }
                Err(e) => {
                    debug!(token = %address, error = %e, "analysis fetch failed, skipping");
                    continue;
                }
            };

            let price = analysis.price;
            let deviation = if let Some(token) = self.watched.get_mut(&address) {
                token.push_price(price, self.config.history_cap());
                token.last = analysis;
                token.last_updated = now;
                sma(&token.price_slice(), self.config.sma_window())
                    .map(|mean| deviation_from(price, mean))
            } else {
                None
            };

            self.manage_position(&address, price, deviation, now);
        }
    }

    /// Exit checks in priority order: stop-loss, take-profit, completed
    /// reversion, time stop.
    fn manage_position(
        &mut self,
        address: &str,
        price: f64,
        deviation: Option<f64>,
        now: DateTime<Utc>,
    ) {
        let Some(position) = self.positions.get_mut(address) else {
            return;
        };
        position.update_price(price, now);

        let reverted = deviation.is_some_and(|d| d.abs() <= self.config.reversion_tolerance);
        let exit_reason = if position.stop_loss_hit(price) {
            Some(ExitReason::StopLoss)
        } else if position.take_profit_hit(price) {
            Some(ExitReason::TakeProfit)
        } else if reverted {
            Some(ExitReason::ReversionComplete)
        } else if position.age_hours(now) > self.config.max_holding_hours {
            Some(ExitReason::TimeStop)
        } else {
            None
        };

        if let Some(reason) = exit_reason {
            if let Some(position) = self.positions.remove(address) {
                let before = self.core.portfolio_value();
                let trade = position.close(price, reason, now, before);
                self.core.record_trade(trade);
            }
        }
    }

    /// Entry signal from the current history: oversold far below the mean
    /// goes long, overbought far above goes short. Both the RSI and the
    /// deviation condition must agree.
    fn entry_signal(&self, token: &WatchedToken) -> Option<Direction> {
        let prices = token.price_slice();
        let price = *prices.last()?;
        let rsi_value = rsi(&prices, self.config.rsi_period)?;
        let mean = sma(&prices, self.config.sma_window())?;
        let deviation = deviation_from(price, mean);

        if rsi_value <= self.config.rsi_oversold && deviation <= -self.config.min_deviation {
            Some(Direction::Long)
        } else if rsi_value >= self.config.rsi_overbought && deviation >= self.config.min_deviation
        {
            Some(Direction::Short)
        } else {
            None
        }
    }

    fn check_entries(&mut self, now: DateTime<Utc>) {
        let candidates: Vec<(String, Direction)> = self
            .watched
            .iter()
            .filter(|(addr, _)| !self.positions.contains_key(*addr))
            .filter_map(|(addr, token)| self.entry_signal(token).map(|d| (addr.clone(), d)))
            .collect();

        for (address, direction) in candidates {
            let Some(token) = self.watched.get(&address) else {
                continue;
            };
            let price = token.last.price;
            let size = self.core.position_size(self.config.risk_per_trade);
            let proposed = ProposedTrade {
                token_address: address.clone(),
                token_symbol: token.symbol.clone(),
                direction,
                entry_price: price,
                size,
            };

            if self
                .core
                .meets_risk_criteria(&proposed, self.positions.len(), now)
                .is_err()
            {
                continue;
            }

            let stop = self.core.risk().stop_loss_price(price, direction);
            let target = self.core.risk().take_profit_price(price, direction);
            match Position::open(
                address.clone(),
                token.symbol.clone(),
                direction,
                price,
                size,
                stop,
                target,
                now,
            ) {
                Ok(position) => {
                    info!(
                        strategy = %self.core.name(),
                        token = %position.token_symbol,
                        %direction,
                        price,
                        size,
                        "opened position"
                    );
                    self.positions.insert(address, position);
                }
                Err(e) => warn!(token = %address, error = %e, "failed to open position"),
            }
        }
    }

    /// Evict stale or disqualified tokens unless a position is open.
    fn sweep(&mut self, now: DateTime<Utc>) {
        let stale_secs = (self.config.stale_after_hours * 3600.0) as i64;
        let positions = &self.positions;
        let config = &self.config;
        self.watched.retain(|address, token| {
            if positions.contains_key(address) {
                return true;
            }
            let fresh = (now - token.last_updated).num_seconds() <= stale_secs;
            let old_enough = token
                .last
                .pair_age_hours(now)
                .is_some_and(|age| age >= config.min_pair_age_hours);
            let in_band = token.last.liquidity_usd >= config.min_liquidity_usd
                && token.last.liquidity_usd <= config.max_liquidity_usd;
            let turning_over =
                token.last.volume_liquidity_ratio() >= config.min_volume_liquidity_ratio;
            fresh && old_enough && in_band && turning_over
        });
    }
}

#[async_trait]
impl Strategy for MeanReversionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MeanReversion
    }

    fn core(&self) -> &StrategyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StrategyCore {
        &mut self.core
    }

    fn open_position_count(&self) -> usize {
        self.positions.len()
    }

    async fn execute(&mut self, now: DateTime<Utc>) -> Result<(), StrategyError> {
        if !self.core.is_active() {
            return Err(StrategyError::Inactive);
        }
        let admitted = self.discover(now).await;
        self.update(&admitted, now).await;
        self.check_entries(now);
        self.sweep(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::{analysis, MockFeed};
    use crate::ports::TokenRef;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn trending(address: &str, symbol: &str) -> Vec<TokenRef> {
        vec![TokenRef {
            address: address.to_string(),
            symbol: symbol.to_string(),
        }]
    }

    // Short windows so scripted sequences stay readable: a 3-change RSI and
    // a 3-sample SMA.
    fn test_config() -> MeanReversionConfig {
        MeanReversionConfig {
            rsi_period: 3,
            sma_lookback_hours: 1.0,
            tick_interval_secs: 1200,
            ..MeanReversionConfig::default()
        }
    }

    fn strategy(feed: MockFeed) -> MeanReversionStrategy {
        let mut s = MeanReversionStrategy::new(
            "mean_reversion",
            10.0,
            RiskParameters::default(),
            test_config(),
            Arc::new(feed),
        );
        s.initialize(Utc::now());
        s
    }

    fn priced(address: &str, symbol: &str, prices: &[f64]) -> Vec<TokenAnalysis> {
        prices
            .iter()
            .map(|&p| analysis(address, symbol, p))
            .collect()
    }

    #[test]
    fn test_sma_window_from_lookback() {
        let config = test_config();
        assert_eq!(config.sma_window(), 3);

        let tight = MeanReversionConfig {
            sma_lookback_hours: 0.01,
            ..config
        };
        assert_eq!(tight.sma_window(), 2);
    }

    #[tokio::test]
    async fn test_discovery_rejects_young_pair() {
        let mut young = analysis("mint1", "ONE", 1.0);
        young.pair_created_at = Some(Utc::now() - Duration::hours(5));
        let feed = MockFeed::new()
            .with_trending(trending("mint1", "ONE"))
            .with_analyses("mint1", vec![young]);
        let mut s = strategy(feed);
        s.execute(Utc::now()).await.unwrap();
        assert_eq!(s.watched_count(), 0);
    }

    #[tokio::test]
    async fn test_discovery_rejects_unknown_pair_age() {
        let mut unknown = analysis("mint1", "ONE", 1.0);
        unknown.pair_created_at = None;
        let feed = MockFeed::new()
            .with_trending(trending("mint1", "ONE"))
            .with_analyses("mint1", vec![unknown]);
        let mut s = strategy(feed);
        s.execute(Utc::now()).await.unwrap();
        assert_eq!(s.watched_count(), 0);
    }

    #[tokio::test]
    async fn test_discovery_rejects_thin_turnover() {
        // 50k of daily volume against 200k liquidity is a 0.25 ratio,
        // below the 0.5 floor.
        let mut quiet = analysis("mint1", "ONE", 1.0);
        quiet.volume_24h = 50_000.0;
        let feed = MockFeed::new()
            .with_trending(trending("mint1", "ONE"))
            .with_analyses("mint1", vec![quiet]);
        let mut s = strategy(feed);
        s.execute(Utc::now()).await.unwrap();
        assert_eq!(s.watched_count(), 0);
    }

    #[tokio::test]
    async fn test_discovery_admits_established_pair() {
        let feed = MockFeed::new()
            .with_trending(trending("mint1", "ONE"))
            .with_analyses("mint1", vec![analysis("mint1", "ONE", 1.0)]);
        let mut s = strategy(feed);
        s.execute(Utc::now()).await.unwrap();
        assert_eq!(s.watched_count(), 1);
    }

    #[tokio::test]
    async fn test_oversold_entry_then_reversion_complete() {
        // A steady decline drives RSI to 0 (oversold) while 88 sits 6.4%
        // below its 3-sample SMA of 94, so the entry goes long at 88. The
        // bounce to 93 lands within 3% of the new mean and closes the
        // position as a completed reversion.
        let feed = MockFeed::new()
            .with_trending(trending("mint1", "ONE"))
            .with_analyses("mint1", priced("mint1", "ONE", &[100.0, 98.0, 96.0, 88.0, 93.0]));
        let mut s = strategy(feed);
        let now = Utc::now();

        for _ in 0..4 {
            s.execute(now).await.unwrap();
        }
        let position = s.position("mint1").expect("oversold entry should fire");
        assert_eq!(position.direction, Direction::Long);
        assert_relative_eq!(position.entry_price, 88.0);
        assert_relative_eq!(position.size, 1.0);

        s.execute(now).await.unwrap();
        assert!(s.position("mint1").is_none());
        let trade = &s.core().trades()[0];
        assert_eq!(trade.exit_reason, ExitReason::ReversionComplete);
        assert_relative_eq!(trade.pnl, (93.0 - 88.0) / 88.0, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn test_overbought_entry_goes_short() {
        // A steady climb pins RSI at 100 and puts 112 about 5.7% above its
        // 3-sample SMA of 106.
        let feed = MockFeed::new()
            .with_trending(trending("mint1", "ONE"))
            .with_analyses("mint1", priced("mint1", "ONE", &[100.0, 102.0, 104.0, 112.0]));
        let mut s = strategy(feed);
        let now = Utc::now();

        for _ in 0..4 {
            s.execute(now).await.unwrap();
        }
        let position = s.position("mint1").expect("overbought entry should fire");
        assert_eq!(position.direction, Direction::Short);
        assert_relative_eq!(position.entry_price, 112.0);
        assert_relative_eq!(position.stop_loss, 112.0 * 1.07, epsilon = 1e-9);
        assert_relative_eq!(position.take_profit, 112.0 * 0.85, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn test_small_deviation_blocks_entry() {
        // RSI is oversold but 96 is only about 1.7% below the mean.
        let feed = MockFeed::new()
            .with_trending(trending("mint1", "ONE"))
            .with_analyses("mint1", priced("mint1", "ONE", &[100.0, 99.0, 98.0, 96.0]));
        let mut s = strategy(feed);
        let now = Utc::now();

        for _ in 0..4 {
            s.execute(now).await.unwrap();
        }
        assert!(s.position("mint1").is_none());
    }

    #[tokio::test]
    async fn test_stop_loss_beats_reversion_check() {
        // The fall to 81 is past the 7% stop from an 88 entry; even though
        // later prices might revert, the stop fires first.
        let feed = MockFeed::new()
            .with_trending(trending("mint1", "ONE"))
            .with_analyses("mint1", priced("mint1", "ONE", &[100.0, 98.0, 96.0, 88.0, 81.0]));
        let mut s = strategy(feed);
        let now = Utc::now();

        for _ in 0..5 {
            s.execute(now).await.unwrap();
        }
        assert!(s.position("mint1").is_none());
        let trade = &s.core().trades()[0];
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert!(trade.pnl < 0.0);
    }

    #[tokio::test]
    async fn test_time_stop_closes_stagnant_position() {
        let feed = MockFeed::new()
            .with_trending(trending("mint1", "ONE"))
            .with_analyses("mint1", priced("mint1", "ONE", &[100.0, 98.0, 96.0, 88.0, 86.6]));
        let mut s = strategy(feed);
        let now = Utc::now();

        for _ in 0..4 {
            s.execute(now).await.unwrap();
        }
        assert!(s.position("mint1").is_some());

        // 86.6 sits about 4% below the mean: not a stop, not a target, not
        // within reversion tolerance, but the position is past its maximum
        // holding period.
        let later = now + Duration::hours(13);
        s.execute(later).await.unwrap();
        assert!(s.position("mint1").is_none());
        assert_eq!(s.core().trades()[0].exit_reason, ExitReason::TimeStop);
    }
}
