//! Technical indicators
//!
//! Pure functions over price series. RSI uses Wilder's smoothing: the
//! initial average gain/loss over the first `period` changes, then
//! `avg = (avg * (period - 1) + new) / period` for each later change.

/// Relative Strength Index over the trailing `period` changes.
///
/// Needs at least `period + 1` prices. Returns `None` with insufficient
/// data, 100.0 when the smoothed average loss is zero.
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = changes[..period]
        .iter()
        .map(|&c| if c > 0.0 { c } else { 0.0 })
        .sum::<f64>()
        / period as f64;
    let mut avg_loss = changes[..period]
        .iter()
        .map(|&c| if c < 0.0 { -c } else { 0.0 })
        .sum::<f64>()
        / period as f64;

    for &change in &changes[period..] {
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Simple moving average over the last `window` prices.
///
/// Returns `None` when fewer than `window` prices are available.
pub fn sma(prices: &[f64], window: usize) -> Option<f64> {
    if window == 0 || prices.len() < window {
        return None;
    }
    let tail = &prices[prices.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// Deviation of `price` from `mean` as a signed fraction of the mean.
pub fn deviation_from(price: f64, mean: f64) -> f64 {
    if mean == 0.0 {
        return 0.0;
    }
    (price - mean) / mean
}
