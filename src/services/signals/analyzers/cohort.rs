use super::rules::{MetricLadder, MetricRule, Threshold::*};
use super::CategoryAnalyzer;
use crate::types::{CohortMetrics, FactorCategory, SignalBias::*};

pub static LTH_SUPPLY_CHANGE: MetricLadder = MetricLadder {
    metric: "lth_supply_change_30d_pct",
    category: FactorCategory::Cohort,
    display_scale: 1.0,
    precision: 2,
    suffix: "%",
    rules: &[
        MetricRule::new(Above(1.0), 20.0, "LTH Accumulating", Bullish, 6, "Long-term holder supply {v} over 30 days"),
        MetricRule::new(Below(-1.0), -20.0, "LTH Distributing", Bearish, 6, "Long-term holder supply {v} over 30 days - old coins selling"),
        MetricRule::new(Any, 0.0, "LTH Holding", Neutral, 2, "Long-term holder supply {v} over 30 days"),
    ],
};

pub static STH_SOPR: MetricLadder = MetricLadder {
    metric: "sth_sopr",
    category: FactorCategory::Cohort,
    display_scale: 1.0,
    precision: 3,
    suffix: "",
    rules: &[
        MetricRule::new(Below(1.0), 15.0, "STH Capitulation", Bullish, 5, "Short-term holder SOPR at {v} - recent buyers selling at a loss"),
        MetricRule::new(Above(1.1), -10.0, "STH Profit Taking", Bearish, 4, "Short-term holder SOPR at {v} - recent buyers taking profit"),
        MetricRule::new(Any, 0.0, "STH Neutral", Neutral, 2, "Short-term holder SOPR at {v}"),
    ],
};

pub static WHALE_HOLDINGS_CHANGE: MetricLadder = MetricLadder {
    metric: "whale_holdings_change_30d_pct",
    category: FactorCategory::Cohort,
    display_scale: 1.0,
    precision: 2,
    suffix: "%",
    rules: &[
        MetricRule::new(Above(1.0), 15.0, "Whales Accumulating", Bullish, 5, "Whale holdings {v} over 30 days"),
        MetricRule::new(Below(-1.0), -15.0, "Whales Distributing", Bearish, 5, "Whale holdings {v} over 30 days"),
        MetricRule::new(Any, 0.0, "Whales Steady", Neutral, 2, "Whale holdings {v} over 30 days"),
    ],
};

/// Scores holder cohort behaviour. Its deltas are averaged into the
/// on-chain category.
pub struct CohortAnalyzer;

impl CategoryAnalyzer for CohortAnalyzer {
    type Metrics = CohortMetrics;

    fn readings(m: &CohortMetrics) -> Vec<(Option<f64>, &'static MetricLadder)> {
        vec![
            (m.lth_supply_change_30d_pct, &LTH_SUPPLY_CHANGE),
            (m.sth_sopr, &STH_SOPR),
            (m.whale_holdings_change_30d_pct, &WHALE_HOLDINGS_CHANGE),
        ]
    }
}
