//! Momentum breakout strategy
//!
//! Monitors trending tokens and enters long when a breakout is confirmed:
//! three strictly rising prices, a sufficient last-period change, and
//! hourly volume running above its proportional share of the trailing
//! six-hour average. Exits on stop-loss, take-profit, trailing stop, or a
//! time stop, checked in that priority order.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{Direction, ExitReason, Position, ProposedTrade, RiskParameters};
use crate::ports::{MarketDataFeed, TokenAnalysis};

use super::{Strategy, StrategyCore, StrategyError, StrategyKind};

/// Momentum strategy tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    /// Minimum composite token score (0-100) to admit a candidate
    pub min_token_score: f64,
    /// Liquidity sweet-spot floor in USD
    pub min_liquidity_usd: f64,
    /// Liquidity sweet-spot ceiling in USD
    pub max_liquidity_usd: f64,
    /// Minimum 1-hour price change percentage for discovery
    pub min_price_change_1h: f64,
    /// Minimum 24h volume to liquidity ratio for discovery
    pub min_volume_liquidity_ratio: f64,
    /// Minimum period-over-period price change fraction for entry
    pub min_entry_change: f64,
    /// Hourly volume must exceed this multiple of the 6-hour average
    pub volume_confirmation_factor: f64,
    /// Fraction of capital risked per trade
    pub risk_per_trade: f64,
    /// Unrealized P&L fraction at which the trailing stop activates
    pub trailing_activation: f64,
    /// Trailing stop distance as a fraction of price
    pub trailing_distance: f64,
    /// Maximum holding period in hours
    pub max_holding_hours: f64,
    /// Monitored tokens not updated within this window are evicted
    pub stale_after_hours: f64,
    /// Upper bound on the monitored-token store
    pub max_monitored: usize,
    /// Price history samples kept per token
    pub history_len: usize,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            min_token_score: 40.0,
            min_liquidity_usd: 50_000.0,
            max_liquidity_usd: 2_000_000.0,
            min_price_change_1h: 2.0,
            min_volume_liquidity_ratio: 0.5,
            min_entry_change: 0.02,
            volume_confirmation_factor: 1.0,
            risk_per_trade: 0.1,
            trailing_activation: 0.05,
            trailing_distance: 0.05,
            max_holding_hours: 24.0,
            stale_after_hours: 2.0,
            max_monitored: 50,
            history_len: 48,
        }
    }
}

/// Composite 0-100 score for a candidate: liquidity band fit, turnover,
/// short-term momentum, and daily trend.
pub fn token_score(analysis: &TokenAnalysis, config: &MomentumConfig) -> f64 {
    let liquidity = if analysis.liquidity_usd >= config.min_liquidity_usd
        && analysis.liquidity_usd <= config.max_liquidity_usd
    {
        1.0
    } else {
        0.0
    };
    let turnover = (analysis.volume_liquidity_ratio() / 2.0).clamp(0.0, 1.0);
    let momentum = (analysis.price_change_1h / 10.0).clamp(0.0, 1.0);
    let trend = (analysis.price_change_24h / 20.0).clamp(0.0, 1.0);

    (liquidity * 0.3 + turnover * 0.3 + momentum * 0.25 + trend * 0.15) * 100.0
}

/// A token admitted to monitoring
#[derive(Debug, Clone)]
struct MonitoredToken {
    symbol: String,
    prices: VecDeque<f64>,
    last: TokenAnalysis,
    last_updated: DateTime<Utc>,
}

impl MonitoredToken {
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

    fn push_price(&mut self, price: f64, history_len: usize) {
        self.prices.push_back(price);
        while self.prices.len() > history_len {
            self.prices.pop_front();
        }
    }
}

/// Momentum breakout strategy over trending tokens
pub struct MomentumStrategy {
    core: StrategyCore,
    config: MomentumConfig,
    feed: Arc<dyn MarketDataFeed>,
    monitored: HashMap<String, MonitoredToken>,
    positions: HashMap<String, Position>,
}

impl MomentumStrategy {
    pub fn new(
        name: impl Into<String>,
        allocated_capital: f64,
        risk: RiskParameters,
        config: MomentumConfig,
        feed: Arc<dyn MarketDataFeed>,
    ) -> Self {
        Self {
            core: StrategyCore::new(name, allocated_capital, risk),
            config,
            feed,
            monitored: HashMap::new(),
            positions: HashMap::new(),
        }
    }

    pub fn monitored_count(&self) -> usize {
        self.monitored.len()
    }

    pub fn position(&self, address: &str) -> Option<&Position> {
        self.positions.get(address)
    }

    fn passes_filter(&self, analysis: &TokenAnalysis) -> bool {
        token_score(analysis, &self.config) >= self.config.min_token_score
            && analysis.liquidity_usd >= self.config.min_liquidity_usd
            && analysis.liquidity_usd <= self.config.max_liquidity_usd
            && analysis.price_change_1h >= self.config.min_price_change_1h
            && analysis.volume_liquidity_ratio() >= self.config.min_volume_liquidity_ratio
    }

    /// Discovery phase: admit trending candidates that pass the filter.
    /// Returns the addresses admitted this tick so the update phase does
    /// not fetch them twice.
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
            if self.monitored.contains_key(&candidate.address) {
                continue;
            }
            if self.monitored.len() >= self.config.max_monitored {
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
            if self.passes_filter(&analysis) {
                debug!(
                    strategy = %self.core.name(),
                    token = %analysis.symbol,
                    score = token_score(&analysis, &self.config),
                    "admitted to monitoring"
                );
                admitted.insert(candidate.address.clone());
                self.monitored
                    .insert(candidate.address, MonitoredToken::new(analysis, now));
            }
        }

        admitted
    }

    /// Update phase: refresh prices for monitored tokens, mutate open
    /// positions, and fire exits in priority order.
    async fn update(&mut self, admitted: &HashSet<String>, now: DateTime<Utc>) {
        let addresses: Vec<String> = self
            .monitored
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
            if let Some(token) = self.monitored.get_mut(&address) {
                token.push_price(price, self.config.history_len);
                token.last = analysis;
                token.last_updated = now;
            }

            self.manage_position(&address, price, now);
        }
    }

    /// Per-tick position maintenance: price update, trailing-stop ratchet,
    /// exit checks (stop-loss, take-profit, trailing stop, time stop).
    fn manage_position(&mut self, address: &str, price: f64, now: DateTime<Utc>) {
        let Some(position) = self.positions.get_mut(address) else {
            return;
        };

        position.update_price(price, now);
        if position.trailing_stop.is_some()
            || position.unrealized_pnl_pct >= self.config.trailing_activation
        {
            position.ratchet_trailing_stop(self.config.trailing_distance);
        }

        let exit_reason = if position.stop_loss_hit(price) {
            Some(ExitReason::StopLoss)
        } else if position.take_profit_hit(price) {
            Some(ExitReason::TakeProfit)
        } else if position.trailing_stop_hit(price) {
            Some(ExitReason::TrailingStop)
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

    /// Entry signal: at least three samples, last three strictly rising,
    /// last change over the threshold, hourly volume above its share of
    /// the trailing 6-hour average.
    fn entry_signal(&self, token: &MonitoredToken) -> bool {
        let n = token.prices.len();
        if n < 3 {
            return false;
        }
        let (a, b, c) = (token.prices[n - 3], token.prices[n - 2], token.prices[n - 1]);
        if !(a < b && b < c) {
            return false;
        }
        if b <= 0.0 || (c - b) / b < self.config.min_entry_change {
            return false;
        }
        let hourly_average = token.last.volume_6h / 6.0;
        token.last.volume_1h > self.config.volume_confirmation_factor * hourly_average
    }

    /// Signal-check phase: evaluate entries for monitored tokens without a
    /// position, gated by risk criteria.
    fn check_entries(&mut self, now: DateTime<Utc>) {
        let candidates: Vec<String> = self
            .monitored
            .iter()
            .filter(|(addr, token)| !self.positions.contains_key(*addr) && self.entry_signal(token))
            .map(|(addr, _)| addr.clone())
            .collect();

        for address in candidates {
            let Some(token) = self.monitored.get(&address) else {
                continue;
            };
            let price = token.last.price;
            let size = self.core.position_size(self.config.risk_per_trade);
            let proposed = ProposedTrade {
                token_address: address.clone(),
                token_symbol: token.symbol.clone(),
                direction: Direction::Long,
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

            let stop = self.core.risk().stop_loss_price(price, Direction::Long);
            let target = self.core.risk().take_profit_price(price, Direction::Long);
            match Position::open(
                address.clone(),
                token.symbol.clone(),
                Direction::Long,
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
                        price,
                        size,
                        "opened long position"
                    );
                    self.positions.insert(address, position);
                }
                Err(e) => warn!(token = %address, error = %e, "failed to open position"),
            }
        }
    }

    /// Cleanup phase: evict stale or no-longer-qualifying tokens unless an
    /// open position still references them.
    fn sweep(&mut self, now: DateTime<Utc>) {
        let stale_secs = (self.config.stale_after_hours * 3600.0) as i64;
        let positions = &self.positions;
        let config = &self.config;
        self.monitored.retain(|address, token| {
            if positions.contains_key(address) {
                return true;
            }
            let fresh = (now - token.last_updated).num_seconds() <= stale_secs;
            let qualifies = token_score(&token.last, config) >= config.min_token_score
                && token.last.liquidity_usd >= config.min_liquidity_usd
                && token.last.liquidity_usd <= config.max_liquidity_usd
                && token.last.price_change_1h >= config.min_price_change_1h
                && token.last.volume_liquidity_ratio() >= config.min_volume_liquidity_ratio;
            fresh && qualifies
        });
    }
}

#[async_trait]
impl Strategy for MomentumStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Momentum
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
