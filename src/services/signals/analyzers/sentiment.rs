use super::rules::{MetricLadder, MetricRule, Threshold::*};
use super::CategoryAnalyzer;
use crate::types::{FactorCategory, SentimentMetrics, SignalBias::*};

pub static FEAR_GREED: MetricLadder = MetricLadder {
    metric: "fear_greed",
    category: FactorCategory::Sentiment,
    display_scale: 1.0,
    precision: 0,
    suffix: "",
    rules: &[
        MetricRule::new(Below(20.0), 30.0, "Extreme Fear", Bullish, 8, "Fear & Greed at {v} - extreme fear, contrarian buy zone"),
        MetricRule::new(Above(80.0), -30.0, "Extreme Greed", Bearish, 8, "Fear & Greed at {v} - extreme greed, contrarian sell zone"),
        MetricRule::new(Below(40.0), 10.0, "Fear", Bullish, 4, "Fear & Greed at {v} - fearful market"),
        MetricRule::new(Above(60.0), -10.0, "Greed", Bearish, 4, "Fear & Greed at {v} - greedy market"),
        MetricRule::new(Any, 0.0, "Neutral Sentiment", Neutral, 2, "Fear & Greed at {v}"),
    ],
};

pub static SOCIAL_VOLUME: MetricLadder = MetricLadder {
    metric: "social_volume_change_pct",
    category: FactorCategory::Sentiment,
    display_scale: 1.0,
    precision: 0,
    suffix: "%",
    rules: &[
        MetricRule::new(Above(100.0), -10.0, "Social Hype", Bearish, 3, "Social volume {v} - attention spiking"),
        MetricRule::new(Any, 0.0, "Normal Social Volume", Neutral, 1, "Social volume {v}"),
    ],
};

pub static GOOGLE_TRENDS: MetricLadder = MetricLadder {
    metric: "google_trends",
    category: FactorCategory::Sentiment,
    display_scale: 1.0,
    precision: 0,
    suffix: "",
    rules: &[
        MetricRule::new(Above(80.0), -15.0, "Retail Mania", Bearish, 4, "Search interest at {v} - retail piling in"),
        MetricRule::new(Any, 0.0, "Quiet Retail", Neutral, 1, "Search interest at {v}"),
    ],
};

/// Scores crowd sentiment, read contrarian.
pub struct SentimentAnalyzer;

impl CategoryAnalyzer for SentimentAnalyzer {
    type Metrics = SentimentMetrics;

    fn readings(m: &SentimentMetrics) -> Vec<(Option<f64>, &'static MetricLadder)> {
        vec![
            (m.fear_greed, &FEAR_GREED),
            (m.social_volume_change_pct, &SOCIAL_VOLUME),
            (m.google_trends, &GOOGLE_TRENDS),
        ]
    }
}
