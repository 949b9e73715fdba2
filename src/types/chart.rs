use serde::{Deserialize, Serialize};

/// OHLCV bar. Series are ordered oldest-first with strictly increasing `time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcPoint {
    /// Bar open time, unix milliseconds.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl OhlcPoint {
    /// Whether the bar closed at or above its open.
    pub fn is_green(&self) -> bool {
        self.close >= self.open
    }
}

/// Closing price at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Unix milliseconds.
    pub time: i64,
    pub price: f64,
}

impl From<&OhlcPoint> for PricePoint {
    fn from(bar: &OhlcPoint) -> Self {
        Self {
            time: bar.time,
            price: bar.close,
        }
    }
}

/// Percent change from `from` to `to`; 0 when `from` is zero.
pub fn percent_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        return 0.0;
    }
    (to - from) / from * 100.0
}

/// Highest high and lowest low across a slice of bars.
pub fn bar_range(bars: &[OhlcPoint]) -> Option<(f64, f64)> {
    if bars.is_empty() {
        return None;
    }
    let high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    Some((high, low))
}
