use super::rules::{MetricLadder, MetricRule, Threshold::*};
use super::CategoryAnalyzer;
use crate::types::{FactorCategory, SignalBias::*, TechnicalMetrics};

pub static RSI: MetricLadder = MetricLadder {
    metric: "rsi",
    category: FactorCategory::Technical,
    display_scale: 1.0,
    precision: 1,
    suffix: "",
    rules: &[
        MetricRule::new(Below(30.0), 30.0, "RSI Oversold", Bullish, 8, "RSI at {v} - oversold, bounce likely"),
        MetricRule::new(Above(70.0), -30.0, "RSI Overbought", Bearish, 8, "RSI at {v} - overbought, pullback risk"),
        MetricRule::new(Any, 0.0, "RSI Neutral", Neutral, 3, "RSI at {v} - no momentum extreme"),
    ],
};

pub static MACD_HISTOGRAM: MetricLadder = MetricLadder {
    metric: "macd_histogram",
    category: FactorCategory::Technical,
    display_scale: 1.0,
    precision: 2,
    suffix: "",
    rules: &[
        MetricRule::new(Above(0.0), 20.0, "MACD Bullish", Bullish, 6, "MACD histogram at {v} - momentum turning up"),
        MetricRule::new(Below(0.0), -20.0, "MACD Bearish", Bearish, 6, "MACD histogram at {v} - momentum turning down"),
        MetricRule::new(Any, 0.0, "MACD Flat", Neutral, 2, "MACD histogram flat"),
    ],
};

pub static PRICE_VS_SMA200: MetricLadder = MetricLadder {
    metric: "price_vs_sma200_pct",
    category: FactorCategory::Technical,
    display_scale: 1.0,
    precision: 1,
    suffix: "%",
    rules: &[
        MetricRule::new(Above(0.0), 25.0, "Above 200-Day MA", Bullish, 7, "Price {v} versus the 200-day MA - long-term uptrend"),
        MetricRule::new(Any, -25.0, "Below 200-Day MA", Bearish, 7, "Price {v} versus the 200-day MA - long-term downtrend"),
    ],
};

pub static PRICE_VS_SMA50: MetricLadder = MetricLadder {
    metric: "price_vs_sma50_pct",
    category: FactorCategory::Technical,
    display_scale: 1.0,
    precision: 1,
    suffix: "%",
    rules: &[
        MetricRule::new(Above(0.0), 15.0, "Above 50-Day MA", Bullish, 5, "Price {v} versus the 50-day MA - medium-term strength"),
        MetricRule::new(Any, -15.0, "Below 50-Day MA", Bearish, 5, "Price {v} versus the 50-day MA - medium-term weakness"),
    ],
};

pub static BOLLINGER_PERCENT_B: MetricLadder = MetricLadder {
    metric: "bollinger_percent_b",
    category: FactorCategory::Technical,
    display_scale: 1.0,
    precision: 2,
    suffix: "",
    rules: &[
        MetricRule::new(Below(0.0), 20.0, "Below Lower Band", Bullish, 5, "%B at {v} - price under the lower Bollinger band"),
        MetricRule::new(Above(1.0), -20.0, "Above Upper Band", Bearish, 5, "%B at {v} - price over the upper Bollinger band"),
        MetricRule::new(Any, 0.0, "Inside Bands", Neutral, 2, "%B at {v} - price inside the bands"),
    ],
};

pub static VOLUME_RATIO: MetricLadder = MetricLadder {
    metric: "volume_ratio",
    category: FactorCategory::Technical,
    display_scale: 1.0,
    precision: 2,
    suffix: "x",
    rules: &[
        MetricRule::new(Above(2.0), 0.0, "Volume Spike", Neutral, 4, "Volume at {v} average - strong participation"),
        MetricRule::new(Below(0.5), 0.0, "Thin Volume", Neutral, 2, "Volume at {v} average - weak participation"),
        MetricRule::new(Any, 0.0, "Normal Volume", Neutral, 1, "Volume at {v} average"),
    ],
};

/// Scores price action and momentum metrics.
pub struct TechnicalAnalyzer;

impl CategoryAnalyzer for TechnicalAnalyzer {
    type Metrics = TechnicalMetrics;

    fn readings(m: &TechnicalMetrics) -> Vec<(Option<f64>, &'static MetricLadder)> {
        vec![
            (m.rsi, &RSI),
            (m.macd_histogram, &MACD_HISTOGRAM),
            (m.price_vs_sma200_pct, &PRICE_VS_SMA200),
            (m.price_vs_sma50_pct, &PRICE_VS_SMA50),
            (m.bollinger_percent_b, &BOLLINGER_PERCENT_B),
            (m.volume_ratio, &VOLUME_RATIO),
        ]
    }
}
