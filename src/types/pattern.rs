use crate::types::{Horizon, OhlcPoint, PricePoint, SignalBias};
use serde::{Deserialize, Serialize};

/// A recognized multi-indicator chart pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMatch {
    pub pattern: String,
    /// 0-1.
    pub confidence: f64,
    pub bias: SignalBias,
    /// Horizon over which the pattern usually plays out.
    pub timeframe: Horizon,
    pub description: String,
    pub reasoning: Vec<String>,
    /// Win rate of this pattern: learned when enough calls were graded,
    /// the detector's baseline otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_accuracy: Option<f64>,
}

/// Rolling market state the pattern detectors run against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketContext {
    /// Hourly closes, oldest first.
    pub prices: Vec<PricePoint>,
    pub current_price: f64,
    /// Current funding rate (fraction).
    pub funding_rate: Option<f64>,
    /// Funding rates over the last 24h, oldest first.
    #[serde(default)]
    pub funding_history: Vec<f64>,
    /// Open interest notional in USD.
    pub open_interest: Option<f64>,
    pub oi_change_24h_pct: Option<f64>,
}

impl MarketContext {
    /// Build a context from hourly bars; the last close is the current price.
    pub fn from_bars(bars: &[OhlcPoint]) -> Self {
        let prices: Vec<PricePoint> = bars.iter().map(PricePoint::from).collect();
        let current_price = prices.last().map(|p| p.price).unwrap_or_default();
        Self {
            prices,
            current_price,
            ..Default::default()
        }
    }

    pub fn with_funding(mut self, current: Option<f64>, history: Vec<f64>) -> Self {
        self.funding_rate = current;
        self.funding_history = history;
        self
    }

    pub fn with_open_interest(mut self, value: Option<f64>, change_24h_pct: Option<f64>) -> Self {
        self.open_interest = value;
        self.oi_change_24h_pct = change_24h_pct;
        self
    }

    /// Average of the supplied 24h funding history.
    pub fn avg_funding_24h(&self) -> Option<f64> {
        if self.funding_history.is_empty() {
            return None;
        }
        Some(self.funding_history.iter().sum::<f64>() / self.funding_history.len() as f64)
    }
}
