use super::rules::{MetricLadder, MetricRule, Threshold::*};
use super::CategoryAnalyzer;
use crate::types::{FactorCategory, OnChainMetrics, SignalBias::*};

pub static MVRV: MetricLadder = MetricLadder {
    metric: "mvrv",
    category: FactorCategory::OnChain,
    display_scale: 1.0,
    precision: 2,
    suffix: "",
    rules: &[
        MetricRule::new(Above(3.5), -40.0, "MVRV Extreme", Bearish, 10, "MVRV at {v} - market heavily overvalued versus realized cap"),
        MetricRule::new(Above(2.4), -20.0, "MVRV Elevated", Bearish, 7, "MVRV at {v} - holders sitting on large unrealized gains"),
        MetricRule::new(Below(1.0), 40.0, "MVRV Undervalued", Bullish, 10, "MVRV at {v} - trading below aggregate cost basis"),
        MetricRule::new(Any, 0.0, "MVRV Fair Value", Neutral, 4, "MVRV at {v} - within fair value range"),
    ],
};

pub static SOPR: MetricLadder = MetricLadder {
    metric: "sopr",
    category: FactorCategory::OnChain,
    display_scale: 1.0,
    precision: 3,
    suffix: "",
    rules: &[
        MetricRule::new(Below(0.95), 25.0, "SOPR Capitulation", Bullish, 7, "SOPR at {v} - coins moving at a loss"),
        MetricRule::new(Above(1.05), -15.0, "SOPR Profit Taking", Bearish, 5, "SOPR at {v} - holders realizing profits"),
        MetricRule::new(Any, 0.0, "SOPR Neutral", Neutral, 3, "SOPR at {v} - spent outputs near break-even"),
    ],
};

pub static NUPL: MetricLadder = MetricLadder {
    metric: "nupl",
    category: FactorCategory::OnChain,
    display_scale: 1.0,
    precision: 2,
    suffix: "",
    rules: &[
        MetricRule::new(Below(0.0), 35.0, "NUPL Capitulation", Bullish, 9, "NUPL at {v} - network in aggregate unrealized loss"),
        MetricRule::new(Above(0.75), -35.0, "NUPL Euphoria", Bearish, 9, "NUPL at {v} - euphoric unrealized profit"),
        MetricRule::new(Below(0.25), 15.0, "NUPL Hope", Bullish, 5, "NUPL at {v} - early recovery phase"),
        MetricRule::new(Any, 0.0, "NUPL Optimism", Neutral, 3, "NUPL at {v} - optimism phase"),
    ],
};

pub static EXCHANGE_NETFLOW: MetricLadder = MetricLadder {
    metric: "exchange_netflow_btc",
    category: FactorCategory::OnChain,
    display_scale: 1.0,
    precision: 0,
    suffix: " BTC",
    rules: &[
        MetricRule::new(Above(10_000.0), -20.0, "Exchange Inflows", Bearish, 6, "Net {v} moved onto exchanges - sell pressure building"),
        MetricRule::new(Below(-10_000.0), 20.0, "Exchange Outflows", Bullish, 6, "Net {v} moved off exchanges - coins going to cold storage"),
        MetricRule::new(Any, 0.0, "Balanced Exchange Flows", Neutral, 2, "Exchange netflow {v}"),
    ],
};

pub static ACTIVE_ADDRESSES: MetricLadder = MetricLadder {
    metric: "active_addresses_change_pct",
    category: FactorCategory::OnChain,
    display_scale: 1.0,
    precision: 1,
    suffix: "%",
    rules: &[
        MetricRule::new(Above(10.0), 15.0, "Network Growth", Bullish, 4, "Active addresses {v} - usage expanding"),
        MetricRule::new(Below(-10.0), -15.0, "Network Contraction", Bearish, 4, "Active addresses {v} - usage shrinking"),
        MetricRule::new(Any, 0.0, "Stable Activity", Neutral, 1, "Active addresses {v}"),
    ],
};

pub static PUELL_MULTIPLE: MetricLadder = MetricLadder {
    metric: "puell_multiple",
    category: FactorCategory::OnChain,
    display_scale: 1.0,
    precision: 2,
    suffix: "",
    rules: &[
        MetricRule::new(Above(4.0), -30.0, "Puell Multiple High", Bearish, 8, "Puell multiple at {v} - miner revenue far above trend"),
        MetricRule::new(Below(0.5), 30.0, "Puell Multiple Low", Bullish, 8, "Puell multiple at {v} - miner revenue depressed"),
        MetricRule::new(Any, 0.0, "Puell Neutral", Neutral, 3, "Puell multiple at {v}"),
    ],
};

/// Scores holder valuation and network activity metrics.
pub struct OnChainAnalyzer;

impl CategoryAnalyzer for OnChainAnalyzer {
    type Metrics = OnChainMetrics;

    fn readings(m: &OnChainMetrics) -> Vec<(Option<f64>, &'static MetricLadder)> {
        vec![
            (m.mvrv, &MVRV),
            (m.sopr, &SOPR),
            (m.nupl, &NUPL),
            (m.exchange_netflow_btc, &EXCHANGE_NETFLOW),
            (m.active_addresses_change_pct, &ACTIVE_ADDRESSES),
            (m.puell_multiple, &PUELL_MULTIPLE),
        ]
    }
}
