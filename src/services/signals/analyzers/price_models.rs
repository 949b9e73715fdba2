use super::rules::{MetricLadder, MetricRule, Threshold::*};
use super::CategoryAnalyzer;
use crate::types::{FactorCategory, PriceModelMetrics, SignalBias::*};

pub static PRICE_TO_REALIZED: MetricLadder = MetricLadder {
    metric: "price_to_realized_ratio",
    category: FactorCategory::PriceModels,
    display_scale: 1.0,
    precision: 2,
    suffix: "x",
    rules: &[
        MetricRule::new(Below(1.0), 35.0, "Below Realized Price", Bullish, 9, "Price at {v} realized price - below aggregate cost basis"),
        MetricRule::new(Above(2.5), -25.0, "Far Above Realized Price", Bearish, 7, "Price at {v} realized price - stretched"),
        MetricRule::new(Any, 0.0, "Realized Price Support", Neutral, 3, "Price at {v} realized price"),
    ],
};

pub static STOCK_TO_FLOW: MetricLadder = MetricLadder {
    metric: "stock_to_flow_ratio",
    category: FactorCategory::PriceModels,
    display_scale: 1.0,
    precision: 2,
    suffix: "x",
    rules: &[
        MetricRule::new(Below(0.5), 30.0, "Below Stock-to-Flow", Bullish, 8, "Price at {v} of the stock-to-flow model"),
        MetricRule::new(Above(2.0), -30.0, "Above Stock-to-Flow", Bearish, 8, "Price at {v} of the stock-to-flow model"),
        MetricRule::new(Any, 0.0, "Tracking Stock-to-Flow", Neutral, 2, "Price at {v} of the stock-to-flow model"),
    ],
};

pub static PRICE_TO_200W_MA: MetricLadder = MetricLadder {
    metric: "price_to_200w_ma_ratio",
    category: FactorCategory::PriceModels,
    display_scale: 1.0,
    precision: 2,
    suffix: "x",
    rules: &[
        MetricRule::new(Below(1.0), 40.0, "Below 200-Week MA", Bullish, 10, "Price at {v} the 200-week MA - historical bottom zone"),
        MetricRule::new(Above(3.0), -30.0, "Stretched Above 200-Week MA", Bearish, 8, "Price at {v} the 200-week MA - historically overextended"),
        MetricRule::new(Any, 0.0, "Above 200-Week MA", Neutral, 3, "Price at {v} the 200-week MA"),
    ],
};

pub static PI_CYCLE: MetricLadder = MetricLadder {
    metric: "pi_cycle_ratio",
    category: FactorCategory::PriceModels,
    display_scale: 1.0,
    precision: 3,
    suffix: "",
    rules: &[
        MetricRule::new(AtLeast(1.0), -40.0, "Pi Cycle Top", Bearish, 10, "Pi cycle ratio at {v} - top indicator triggered"),
        MetricRule::new(Above(0.95), -15.0, "Pi Cycle Approaching", Bearish, 5, "Pi cycle ratio at {v} - moving averages converging"),
        MetricRule::new(Any, 0.0, "Pi Cycle Clear", Neutral, 2, "Pi cycle ratio at {v}"),
    ],
};

/// Scores long-horizon valuation models.
pub struct PriceModelAnalyzer;

impl CategoryAnalyzer for PriceModelAnalyzer {
    type Metrics = PriceModelMetrics;

    fn readings(m: &PriceModelMetrics) -> Vec<(Option<f64>, &'static MetricLadder)> {
        vec![
            (m.price_to_realized_ratio, &PRICE_TO_REALIZED),
            (m.stock_to_flow_ratio, &STOCK_TO_FLOW),
            (m.price_to_200w_ma_ratio, &PRICE_TO_200W_MA),
            (m.pi_cycle_ratio, &PI_CYCLE),
        ]
    }
}
