//! Configuration loader
//!
//! Loads and validates simulator configuration from TOML files. Every
//! section has working defaults so a minimal file (or none at all) still
//! produces a runnable configuration.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::adapters::DexScreenerConfig;
use crate::domain::RiskParameters;
use crate::strategy::{MeanReversionConfig, MomentumConfig};

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub system: SystemSection,
    pub momentum: MomentumSection,
    pub mean_reversion: MeanReversionSection,
    pub feed: DexScreenerConfig,
    pub logging: LoggingSection,
}

/// Simulator-wide settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SystemSection {
    /// Starting balance when the wallet cannot report one
    pub initial_balance: f64,
    /// Seconds between supervisor ticks
    pub tick_interval_secs: u64,
    /// Directory for the final report and trade log
    pub report_dir: String,
}

impl Default for SystemSection {
    fn default() -> Self {
        Self {
            initial_balance: 100.0,
            tick_interval_secs: 60,
            report_dir: "reports".to_string(),
        }
    }
}

/// Momentum strategy section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MomentumSection {
    /// Whether the strategy is registered at startup
    pub enabled: bool,
    /// Fraction of the starting balance allocated to the strategy
    pub allocation: f64,
    #[serde(flatten)]
    pub params: MomentumConfig,
    pub risk: RiskParameters,
}

impl Default for MomentumSection {
    fn default() -> Self {
        Self {
            enabled: true,
            allocation: 0.5,
            params: MomentumConfig::default(),
            risk: RiskParameters::default(),
        }
    }
}

/// Mean reversion strategy section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MeanReversionSection {
    /// Whether the strategy is registered at startup
    pub enabled: bool,
    /// Fraction of the starting balance allocated to the strategy
    pub allocation: f64,
    #[serde(flatten)]
    pub params: MeanReversionConfig,
    pub risk: RiskParameters,
}

impl Default for MeanReversionSection {
    fn default() -> Self {
        Self {
            enabled: true,
            allocation: 0.5,
            params: MeanReversionConfig::default(),
            risk: RiskParameters::default(),
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log to file in addition to stdout
    pub log_to_file: bool,
    /// Log file path
    pub log_file: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file: "logs/papertrader.log".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;
    config.system.report_dir = shellexpand::tilde(&config.system.report_dir).into_owned();
    config.validate()?;
    Ok(config)
}

fn validate_risk(section: &str, risk: &RiskParameters) -> Result<(), ConfigError> {
    if risk.max_position_size <= 0.0 || risk.max_position_size > 1.0 {
        return Err(ConfigError::ValidationError(format!(
            "{section}: max_position_size must be in (0, 1], got {}",
            risk.max_position_size
        )));
    }
    if risk.stop_loss_pct <= 0.0 || risk.stop_loss_pct >= 1.0 {
        return Err(ConfigError::ValidationError(format!(
            "{section}: stop_loss_pct must be in (0, 1), got {}",
            risk.stop_loss_pct
        )));
    }
    if risk.take_profit_pct <= 0.0 || risk.take_profit_pct >= 1.0 {
        return Err(ConfigError::ValidationError(format!(
            "{section}: take_profit_pct must be in (0, 1), got {}",
            risk.take_profit_pct
        )));
    }
    if risk.max_open_trades == 0 {
        return Err(ConfigError::ValidationError(format!(
            "{section}: max_open_trades must be > 0"
        )));
    }
    if risk.max_daily_loss <= 0.0 || risk.max_daily_loss > 1.0 {
        return Err(ConfigError::ValidationError(format!(
            "{section}: max_daily_loss must be in (0, 1], got {}",
            risk.max_daily_loss
        )));
    }
    if risk.max_drawdown <= 0.0 || risk.max_drawdown > 1.0 {
        return Err(ConfigError::ValidationError(format!(
            "{section}: max_drawdown must be in (0, 1], got {}",
            risk.max_drawdown
        )));
    }
    Ok(())
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.system.initial_balance <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "initial_balance must be > 0, got {}",
                self.system.initial_balance
            )));
        }
        if self.system.tick_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "tick_interval_secs must be > 0".to_string(),
            ));
        }
        if self.system.report_dir.is_empty() {
            return Err(ConfigError::ValidationError(
                "report_dir cannot be empty".to_string(),
            ));
        }

        let mut allocated = 0.0;
        for (name, enabled, allocation) in [
            ("momentum", self.momentum.enabled, self.momentum.allocation),
            (
                "mean_reversion",
                self.mean_reversion.enabled,
                self.mean_reversion.allocation,
            ),
        ] {
            if !enabled {
                continue;
            }
            if allocation <= 0.0 || allocation > 1.0 {
                return Err(ConfigError::ValidationError(format!(
                    "{name}: allocation must be in (0, 1], got {allocation}"
                )));
            }
            allocated += allocation;
        }
        if allocated > 1.0 + 1e-9 {
            return Err(ConfigError::ValidationError(format!(
                "strategy allocations sum to {allocated}, must be <= 1"
            )));
        }

        if self.momentum.enabled {
            validate_risk("momentum", &self.momentum.risk)?;
            if self.momentum.params.risk_per_trade <= 0.0 {
                return Err(ConfigError::ValidationError(
                    "momentum: risk_per_trade must be > 0".to_string(),
                ));
            }
            if self.momentum.params.history_len < 3 {
                return Err(ConfigError::ValidationError(
                    "momentum: history_len must be >= 3".to_string(),
                ));
            }
        }

        if self.mean_reversion.enabled {
            validate_risk("mean_reversion", &self.mean_reversion.risk)?;
            let params = &self.mean_reversion.params;
            if params.risk_per_trade <= 0.0 {
                return Err(ConfigError::ValidationError(
                    "mean_reversion: risk_per_trade must be > 0".to_string(),
                ));
            }
            if params.rsi_period == 0 {
                return Err(ConfigError::ValidationError(
                    "mean_reversion: rsi_period must be > 0".to_string(),
                ));
            }
            if params.sma_lookback_hours <= 0.0 {
                return Err(ConfigError::ValidationError(
                    "mean_reversion: sma_lookback_hours must be > 0".to_string(),
                ));
            }
            if params.tick_interval_secs == 0 {
                return Err(ConfigError::ValidationError(
                    "mean_reversion: tick_interval_secs must be > 0".to_string(),
                ));
            }
            if params.rsi_oversold >= params.rsi_overbought {
                return Err(ConfigError::ValidationError(format!(
                    "mean_reversion: rsi_oversold ({}) must be below rsi_overbought ({})",
                    params.rsi_oversold, params.rsi_overbought
                )));
            }
            if params.reversion_tolerance >= params.min_deviation {
                return Err(ConfigError::ValidationError(format!(
                    "mean_reversion: reversion_tolerance ({}) must be below min_deviation ({})",
                    params.reversion_tolerance, params.min_deviation
                )));
            }
        }

        self.feed
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> String {
        r#"
[system]
initial_balance = 100.0
tick_interval_secs = 60
report_dir = "reports"

[momentum]
enabled = true
allocation = 0.5
min_token_score = 40.0
risk_per_trade = 0.1

[momentum.risk]
max_position_size = 0.1
stop_loss_pct = 0.07
take_profit_pct = 0.15
max_open_trades = 3
max_daily_loss = 0.05
max_drawdown = 0.2

[mean_reversion]
enabled = true
allocation = 0.5
rsi_period = 14
rsi_oversold = 30.0
rsi_overbought = 70.0

[feed]
rate_limit_rpm = 300

[logging]
level = "info"
log_to_file = false
log_file = "logs/papertrader.log"
"#
        .to_string()
    }

    fn load(content: &str) -> Result<Config, ConfigError> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        load_config(file.path())
    }

    #[test]
    fn test_load_valid_config() {
        let config = load(&create_valid_config()).unwrap();
        assert_eq!(config.system.tick_interval_secs, 60);
        assert_eq!(config.momentum.allocation, 0.5);
        assert_eq!(config.mean_reversion.params.rsi_period, 14);
        // Omitted fields fall back to defaults
        assert_eq!(config.momentum.params.history_len, 48);
        assert_eq!(config.mean_reversion.risk.max_open_trades, 3);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = load("").unwrap();
        assert_eq!(config.system.initial_balance, 100.0);
        assert!(config.momentum.enabled);
        assert!(config.mean_reversion.enabled);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(matches!(result.unwrap_err(), ConfigError::IoError(_)));
    }

    #[test]
    fn test_invalid_tick_interval() {
        let result = load("[system]\ntick_interval_secs = 0\n");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_over_allocated_strategies() {
        let content = r#"
[momentum]
allocation = 0.7

[mean_reversion]
allocation = 0.7
"#;
        let result = load(content);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_disabled_strategy_skips_allocation_check() {
        let content = r#"
[momentum]
enabled = false
allocation = 0.0

[mean_reversion]
allocation = 1.0
"#;
        assert!(load(content).is_ok());
    }

    #[test]
    fn test_invalid_risk_rejected() {
        let content = r#"
[momentum.risk]
stop_loss_pct = 1.5
"#;
        let result = load(content);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_inverted_rsi_thresholds_rejected() {
        let content = r#"
[mean_reversion]
rsi_oversold = 80.0
rsi_overbought = 20.0
"#;
        let result = load(content);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_zero_sma_lookback_rejected() {
        let content = r#"
[mean_reversion]
sma_lookback_hours = 0.0
"#;
        let result = load(content);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_report_dir_tilde_expansion() {
        let config = load("[system]\nreport_dir = \"~/reports\"\n").unwrap();
        assert!(!config.system.report_dir.starts_with('~'));
    }
}
