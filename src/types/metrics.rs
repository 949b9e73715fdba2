//! Input records for the analyzers and the prediction engine.
//!
//! Every metric is an explicit `Option`: `None` means "no opinion", which is
//! never the same thing as a zero reading.

use serde::{Deserialize, Serialize};

/// MACD line values for the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValues {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Bollinger envelope for the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerBands {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiDivergence {
    Bullish,
    Bearish,
    None,
}

/// Latest indicator values computed over the same bar series the engine sees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalIndicators {
    pub rsi: Option<f64>,
    pub macd: Option<MacdValues>,
    /// Histogram of the previous bar, used to detect fresh crossovers.
    pub prev_macd_histogram: Option<f64>,
    pub bollinger_bands: Option<BollingerBands>,
    pub ema20: Option<f64>,
    pub sma50: Option<f64>,
    pub atr: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub volume_trend: Option<VolumeTrend>,
    pub rsi_divergence: Option<RsiDivergence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqueezeKind {
    LongSqueeze,
    ShortSqueeze,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqueezeProbability {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqueezeAlert {
    #[serde(rename = "type")]
    pub kind: SqueezeKind,
    pub probability: SqueezeProbability,
}

/// Perpetual-futures positioning for the asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivativesData {
    /// Funding rate as a fraction per interval (0.01 = 1%).
    pub funding_rate: Option<f64>,
    /// Open interest notional in USD.
    pub open_interest_value: Option<f64>,
    pub squeeze_alert: Option<SqueezeAlert>,
}

/// Snapshot metrics for the technical category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalMetrics {
    pub rsi: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub price_vs_sma200_pct: Option<f64>,
    pub price_vs_sma50_pct: Option<f64>,
    /// Bollinger %B: 0 at the lower band, 1 at the upper band.
    pub bollinger_percent_b: Option<f64>,
    pub volume_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChainMetrics {
    pub mvrv: Option<f64>,
    pub sopr: Option<f64>,
    pub nupl: Option<f64>,
    /// Positive = coins moving onto exchanges.
    pub exchange_netflow_btc: Option<f64>,
    pub active_addresses_change_pct: Option<f64>,
    pub puell_multiple: Option<f64>,
}

/// Long-term / short-term holder and whale cohort metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortMetrics {
    pub lth_supply_change_30d_pct: Option<f64>,
    pub sth_sopr: Option<f64>,
    pub whale_holdings_change_30d_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivativesMetrics {
    /// Fraction per interval (0.001 = 0.1%).
    pub funding_rate: Option<f64>,
    pub long_short_ratio: Option<f64>,
    pub open_interest_change_24h_pct: Option<f64>,
    pub basis_annualized_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceModelMetrics {
    pub price_to_realized_ratio: Option<f64>,
    pub stock_to_flow_ratio: Option<f64>,
    pub price_to_200w_ma_ratio: Option<f64>,
    /// 111-day MA divided by twice the 350-day MA.
    pub pi_cycle_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentMetrics {
    /// Fear & Greed index, 0-100.
    pub fear_greed: Option<f64>,
    pub social_volume_change_pct: Option<f64>,
    /// Search interest, 0-100.
    pub google_trends: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeFlowMetrics {
    /// Positive = net inflow to exchanges.
    pub netflow_24h_btc: Option<f64>,
    pub reserve_change_7d_pct: Option<f64>,
    /// Share of exchange inflow coming from whale-sized transfers, 0-1.
    pub whale_inflow_ratio: Option<f64>,
    pub stablecoin_netflow_24h_usd: Option<f64>,
}

/// All category bags consumed by the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignalInput {
    pub technical: TechnicalMetrics,
    pub on_chain: OnChainMetrics,
    pub cohorts: CohortMetrics,
    pub derivatives: DerivativesMetrics,
    pub price_models: PriceModelMetrics,
    pub sentiment: SentimentMetrics,
}
