//! Exchange-flow scoring used by the prediction engine.
//!
//! Unlike the category ladders, flows are additive: every rule that fires
//! contributes to one score in [-1, 1] and one factor string.

use crate::types::{ExchangeFlowMetrics, SignalBias};

#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeFlowAnalysis {
    pub bias: SignalBias,
    /// Sum of contributions, in [-1, 1].
    pub score: f64,
    /// min(|score|, 0.8).
    pub weight: f64,
    pub factors: Vec<String>,
}

pub struct ExchangeFlowAnalyzer;

impl ExchangeFlowAnalyzer {
    pub fn analyze(m: &ExchangeFlowMetrics) -> ExchangeFlowAnalysis {
        let mut score: f64 = 0.0;
        let mut factors = Vec::new();

        if let Some(netflow) = m.netflow_24h_btc {
            if netflow < -5_000.0 {
                score += 0.3;
                factors.push(format!("{:.0} BTC net outflow from exchanges in 24h", -netflow));
            } else if netflow > 5_000.0 {
                score -= 0.3;
                factors.push(format!("{:.0} BTC net inflow to exchanges in 24h", netflow));
            }
        }

        if let Some(reserve) = m.reserve_change_7d_pct {
            if reserve < -2.0 {
                score += 0.2;
                factors.push(format!("Exchange reserves down {:.1}% over 7d", -reserve));
            } else if reserve > 2.0 {
                score -= 0.2;
                factors.push(format!("Exchange reserves up {:.1}% over 7d", reserve));
            }
        }

        if let Some(ratio) = m.whale_inflow_ratio {
            if ratio > 0.85 {
                score -= 0.25;
                factors.push(format!("Whales account for {:.0}% of exchange inflows", ratio * 100.0));
            }
        }

        if let Some(stables) = m.stablecoin_netflow_24h_usd {
            if stables > 5e8 {
                score += 0.2;
                factors.push(format!("${:.0}M stablecoins moved onto exchanges", stables / 1e6));
            } else if stables < -5e8 {
                score -= 0.1;
                factors.push(format!("${:.0}M stablecoins left exchanges", -stables / 1e6));
            }
        }

        let score = score.clamp(-1.0, 1.0);
        let bias = if score > 0.1 {
            SignalBias::Bullish
        } else if score < -0.1 {
            SignalBias::Bearish
        } else {
            SignalBias::Neutral
        };

        ExchangeFlowAnalysis {
            bias,
            score,
            weight: score.abs().min(0.8),
            factors,
        }
    }
}
