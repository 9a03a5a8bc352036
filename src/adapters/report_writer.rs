//! Report persistence
//!
//! Writes the final performance report as JSON and the full trade log as
//! CSV into the configured report directory. Filenames carry the report's
//! generation timestamp so repeated runs never overwrite each other.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::application::{PerformanceReport, TradeLogRow};

#[derive(Debug, Error)]
pub enum ReportWriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Writes reports and trade logs under one directory
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn ensure_dir(&self) -> Result<(), ReportWriteError> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn stamped(&self, prefix: &str, report: &PerformanceReport, ext: &str) -> PathBuf {
        let stamp = report.generated_at.format("%Y%m%d_%H%M%S");
        self.dir.join(format!("{prefix}_{stamp}.{ext}"))
    }

    /// Write the performance report as pretty-printed JSON. Returns the
    /// path written.
    pub fn write_report(&self, report: &PerformanceReport) -> Result<PathBuf, ReportWriteError> {
        self.ensure_dir()?;
        let path = self.stamped("report", report, "json");
        let json = serde_json::to_string_pretty(report)?;
        fs::write(&path, json)?;
        info!(path = %path.display(), "performance report written");
        Ok(path)
    }

    /// Write the trade log as CSV with a header row. Returns the path
    /// written.
    pub fn write_trade_log(
        &self,
        report: &PerformanceReport,
        rows: &[TradeLogRow],
    ) -> Result<PathBuf, ReportWriteError> {
        self.ensure_dir()?;
        let path = self.stamped("trades", report, "csv");
        let mut writer = csv::Writer::from_path(&path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        info!(path = %path.display(), trades = rows.len(), "trade log written");
        Ok(path)
    }
}

/// Read a trade log back from disk, mainly for tooling and tests.
pub fn read_trade_log(path: &Path) -> Result<Vec<TradeLogRow>, ReportWriteError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::StrategyHighlight;
    use crate::domain::{ClosedTrade, Direction, ExitReason};
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    fn report() -> PerformanceReport {
        PerformanceReport {
            generated_at: Utc.with_ymd_and_hms(2024, 3, 5, 18, 0, 0).unwrap(),
            run_duration_ms: 86_400_000,
            initial_balance: 100.0,
            final_balance: 105.0,
            total_return_pct: 5.0,
            annualized_return: 0.1,
            sharpe_ratio: 1.2,
            max_drawdown: 0.02,
            best_strategy: Some(StrategyHighlight {
                name: "momentum".to_string(),
                net_profit_loss: 5.0,
                return_pct: 10.0,
            }),
            worst_strategy: Some(StrategyHighlight {
                name: "mean_reversion".to_string(),
                net_profit_loss: 0.0,
                return_pct: 0.0,
            }),
            strategies: Vec::new(),
        }
    }

    fn row(pnl: f64) -> TradeLogRow {
        let exit_time = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        TradeLogRow::from_trade(
            "momentum",
            &ClosedTrade {
                token_address: "mint111".to_string(),
                token_symbol: "TEST".to_string(),
                direction: Direction::Long,
                entry_price: 100.0,
                entry_time: exit_time - Duration::hours(4),
                exit_price: 100.0 * (1.0 + pnl),
                exit_time,
                size: 1.0,
                pnl,
                pnl_pct: pnl,
                exit_reason: ExitReason::TakeProfit,
                portfolio_value_before: 10.0,
                portfolio_value_after: 10.0 + pnl,
            },
        )
    }

    #[test]
    fn test_write_report_creates_directory_and_file() {
        let dir = tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("nested/reports"));
        let path = writer.write_report(&report()).unwrap();
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: PerformanceReport = serde_json::from_str(&content).unwrap();
        let best = parsed.best_strategy.as_ref().unwrap();
        assert_eq!(best.name, "momentum");
        assert!((best.net_profit_loss - 5.0).abs() < 1e-12);
        assert!((parsed.final_balance - 105.0).abs() < 1e-12);
    }

    #[test]
    fn test_trade_log_round_trip() {
        let dir = tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let rows = vec![row(0.15), row(-0.07)];
        let path = writer.write_trade_log(&report(), &rows).unwrap();

        let restored = read_trade_log(&path).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0].token_symbol, "TEST");
        assert_eq!(restored[0].direction, "LONG");
        let net: f64 = restored.iter().map(|r| r.pnl).sum();
        assert!((net - 0.08).abs() < 1e-9);
    }

    #[test]
    fn test_filenames_carry_timestamp() {
        let dir = tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let path = writer.write_report(&report()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, "report_20240305_180000.json");
    }
}
