use super::rules::{MetricLadder, MetricRule, Threshold::*};
use super::CategoryAnalyzer;
use crate::types::{DerivativesMetrics, FactorCategory, SignalBias::*};

/// Funding is a fraction per interval; shown as percent.
pub static FUNDING_RATE: MetricLadder = MetricLadder {
    metric: "funding_rate",
    category: FactorCategory::Derivatives,
    display_scale: 100.0,
    precision: 3,
    suffix: "%",
    rules: &[
        MetricRule::new(Above(0.001), -30.0, "Extreme Positive Funding", Bearish, 8, "Funding at {v} - extreme funding, overleveraged longs at risk of a flush"),
        MetricRule::new(Above(0.0005), -15.0, "Elevated Funding", Bearish, 5, "Funding at {v} - longs paying a premium"),
        MetricRule::new(Below(-0.001), 30.0, "Extreme Negative Funding", Bullish, 8, "Funding at {v} - extreme funding, overleveraged shorts at risk of a squeeze"),
        MetricRule::new(Below(-0.0005), 15.0, "Negative Funding", Bullish, 5, "Funding at {v} - shorts paying longs"),
        MetricRule::new(Any, 0.0, "Neutral Funding", Neutral, 2, "Funding at {v}"),
    ],
};

pub static LONG_SHORT_RATIO: MetricLadder = MetricLadder {
    metric: "long_short_ratio",
    category: FactorCategory::Derivatives,
    display_scale: 1.0,
    precision: 2,
    suffix: "",
    rules: &[
        MetricRule::new(Above(2.0), -20.0, "Crowded Longs", Bearish, 6, "Long/short ratio at {v} - positioning crowded long"),
        MetricRule::new(Below(0.5), 20.0, "Crowded Shorts", Bullish, 6, "Long/short ratio at {v} - positioning crowded short"),
        MetricRule::new(Any, 0.0, "Balanced Positioning", Neutral, 2, "Long/short ratio at {v}"),
    ],
};

pub static OPEN_INTEREST_CHANGE: MetricLadder = MetricLadder {
    metric: "open_interest_change_24h_pct",
    category: FactorCategory::Derivatives,
    display_scale: 1.0,
    precision: 1,
    suffix: "%",
    rules: &[
        MetricRule::new(Above(10.0), 0.0, "Leverage Building", Neutral, 4, "Open interest {v} in 24h - leverage building"),
        MetricRule::new(Below(-10.0), 10.0, "Leverage Flush", Bullish, 4, "Open interest {v} in 24h - leverage washed out"),
        MetricRule::new(Any, 0.0, "Stable Open Interest", Neutral, 1, "Open interest {v} in 24h"),
    ],
};

pub static BASIS: MetricLadder = MetricLadder {
    metric: "basis_annualized_pct",
    category: FactorCategory::Derivatives,
    display_scale: 1.0,
    precision: 1,
    suffix: "%",
    rules: &[
        MetricRule::new(Above(20.0), -15.0, "Overheated Basis", Bearish, 5, "Annualized basis at {v} - futures premium overheated"),
        MetricRule::new(Below(0.0), 15.0, "Backwardation", Bullish, 5, "Annualized basis at {v} - futures below spot"),
        MetricRule::new(Any, 0.0, "Normal Basis", Neutral, 2, "Annualized basis at {v}"),
    ],
};

/// Scores perpetual and futures positioning.
pub struct DerivativesAnalyzer;

impl CategoryAnalyzer for DerivativesAnalyzer {
    type Metrics = DerivativesMetrics;

    fn readings(m: &DerivativesMetrics) -> Vec<(Option<f64>, &'static MetricLadder)> {
        vec![
            (m.funding_rate, &FUNDING_RATE),
            (m.long_short_ratio, &LONG_SHORT_RATIO),
            (m.open_interest_change_24h_pct, &OPEN_INTEREST_CHANGE),
            (m.basis_annualized_pct, &BASIS),
        ]
    }
}
