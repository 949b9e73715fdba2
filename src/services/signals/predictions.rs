//! Directional call from bars, indicators and optional market context.
//!
//! Every evidence source emits weighted [`Signal`]s. Bullish and bearish
//! weights are summed and compared; the balance decides the direction and
//! the confidence. Missing inputs only remove their signal family.

use super::analyzers::{CategoryAnalyzer, ExchangeFlowAnalyzer, OnChainAnalyzer};
use crate::error::{Error, Result};
use crate::types::{
    bar_range, BollingerBands, DerivativesData, Direction, ExchangeFlowMetrics, OhlcPoint,
    OnChainMetrics, PatternMatch, Prediction, RsiDivergence, Signal, SignalBias, SqueezeKind,
    SqueezeProbability, TechnicalIndicators, VolumeTrend,
};
use tracing::debug;

/// Upper bound on any prediction's confidence.
pub const MAX_CONFIDENCE: f64 = 0.85;

/// Bars needed for the intraday range signals.
const RANGE_WINDOW: usize = 24;
const RECENT_WINDOW: usize = 6;

/// ATR used when the indicator is missing, as a fraction of price.
const FALLBACK_ATR_PCT: f64 = 0.02;

/// Open interest notional above which a volatility note is emitted.
const LARGE_OPEN_INTEREST_USD: f64 = 25e9;

/// Produces [`Prediction`]s. Stateless.
pub struct PredictionEngine;

impl PredictionEngine {
    /// Make one call. Fails only on an empty bar series.
    pub fn predict(
        bars: &[OhlcPoint],
        indicators: &TechnicalIndicators,
        patterns: &[PatternMatch],
        derivatives: Option<&DerivativesData>,
        on_chain: Option<&OnChainMetrics>,
        exchange_flow: Option<&ExchangeFlowMetrics>,
    ) -> Result<Prediction> {
        let last = bars.last().ok_or(Error::EmptySeries)?;
        let price = last.close;

        let mut signals = indicator_signals(indicators, last);
        signals.extend(pattern_signals(patterns));
        signals.extend(range_signals(bars));

        let derivatives_factors = derivatives.map(|d| {
            let extra = derivatives_signals(d);
            let reasons = reasons(&extra);
            signals.extend(extra);
            reasons
        });
        let on_chain_factors = on_chain.map(|m| {
            let extra = on_chain_signals(m);
            let reasons = reasons(&extra);
            signals.extend(extra);
            reasons
        });
        let exchange_flow_factors = exchange_flow.map(|m| {
            let (extra, factors) = exchange_flow_signals(m);
            signals.extend(extra);
            factors
        });

        let sideways = is_sideways(price, indicators);
        let balance = EvidenceBalance::from_signals(&signals);
        let (direction, confidence) = balance.classify(sideways);

        let atr = indicators
            .atr
            .filter(|a| *a > 0.0)
            .unwrap_or(price * FALLBACK_ATR_PCT);
        let (target_price, stop_loss) = match direction {
            Direction::Up => (Some(price + atr * 2.0), Some(price - atr)),
            Direction::Down => (Some(price - atr * 2.0), Some(price + atr)),
            Direction::Sideways | Direction::Mixed => (None, None),
        };
        let predicted_price_24h = project_price(price, atr, direction, confidence);

        debug!(
            "Prediction {} at {:.2}: {} signals, bull {:.2} / bear {:.2}, confidence {:.2}",
            direction,
            price,
            signals.len(),
            balance.bullish,
            balance.bearish,
            confidence
        );

        let mut ranked = signals;
        ranked.sort_by(|a, b| b.weight.total_cmp(&a.weight));

        Ok(Prediction {
            direction,
            confidence,
            target_price,
            stop_loss,
            predicted_price_24h,
            reasoning: ranked.into_iter().map(|s| s.reason).collect(),
            derivatives_factors,
            on_chain_factors,
            exchange_flow_factors,
        })
    }
}

/// Summed bullish and bearish weight.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EvidenceBalance {
    pub bullish: f64,
    pub bearish: f64,
}

impl EvidenceBalance {
    pub fn from_signals(signals: &[Signal]) -> Self {
        signals.iter().fold(Self::default(), |mut acc, s| {
            match s.signal {
                SignalBias::Bullish => acc.bullish += s.weight,
                SignalBias::Bearish => acc.bearish += s.weight,
                SignalBias::Neutral => {}
            }
            acc
        })
    }

    /// (bullish %, bearish %); even split when there is no evidence.
    pub fn percentages(&self) -> (f64, f64) {
        let total = self.bullish + self.bearish;
        if total <= 0.0 {
            return (0.5, 0.5);
        }
        (self.bullish / total, self.bearish / total)
    }

    /// Direction and capped confidence.
    pub fn classify(&self, sideways: bool) -> (Direction, f64) {
        let (bull_pct, bear_pct) = self.percentages();
        let diff = (bull_pct - bear_pct).abs();

        let (direction, confidence) = if sideways && diff < 0.2 {
            (Direction::Sideways, 0.7 + 0.3 * (1.0 - diff))
        } else if diff < 0.15 {
            // Balanced evidence keeps confidence low.
            (Direction::Mixed, 0.5 + 2.0 * diff)
        } else if bull_pct > bear_pct {
            (Direction::Up, bull_pct)
        } else {
            (Direction::Down, bear_pct)
        };

        (direction, confidence.clamp(0.0, MAX_CONFIDENCE))
    }
}

fn reasons(signals: &[Signal]) -> Vec<String> {
    signals.iter().map(|s| s.reason.clone()).collect()
}

fn indicator_signals(ind: &TechnicalIndicators, last: &OhlcPoint) -> Vec<Signal> {
    let price = last.close;
    let mut signals = Vec::new();

    if let Some(rsi) = ind.rsi {
        signals.push(if rsi < 30.0 {
            Signal::bullish(0.8, format!("RSI oversold ({:.1})", rsi))
        } else if rsi > 70.0 {
            Signal::bearish(0.8, format!("RSI overbought ({:.1})", rsi))
        } else if rsi > 50.0 {
            Signal::bullish(0.3, format!("RSI bullish momentum ({:.1})", rsi))
        } else {
            Signal::bearish(0.3, format!("RSI bearish momentum ({:.1})", rsi))
        });
    }

    if let Some(macd) = &ind.macd {
        let hist = macd.histogram;
        match ind.prev_macd_histogram {
            Some(prev) if prev <= 0.0 && hist > 0.0 => {
                signals.push(Signal::bullish(0.8, "MACD bullish crossover (confirmed)"))
            }
            Some(prev) if prev >= 0.0 && hist < 0.0 => {
                signals.push(Signal::bearish(0.8, "MACD bearish crossover (confirmed)"))
            }
            _ if hist > 0.0 => signals.push(Signal::bullish(0.4, "MACD bullish (above signal)")),
            _ if hist < 0.0 => signals.push(Signal::bearish(0.4, "MACD bearish (below signal)")),
            _ => {}
        }
    }

    if let Some(bb) = &ind.bollinger_bands {
        if price < bb.lower {
            signals.push(Signal::bullish(0.7, "Price below lower Bollinger Band (oversold)"));
        } else if price > bb.upper {
            signals.push(Signal::bearish(0.7, "Price above upper Bollinger Band (overbought)"));
        }
    }

    if let (Some(ema20), Some(sma50)) = (ind.ema20, ind.sma50) {
        if price > ema20 && ema20 > sma50 {
            signals.push(Signal::bullish(0.9, "Uptrend: price above EMA20 above SMA50"));
        } else if price < ema20 && ema20 < sma50 {
            signals.push(Signal::bearish(0.9, "Downtrend: price below EMA20 below SMA50"));
        }
    }

    if let Some(ratio) = ind.volume_ratio {
        let side = if last.is_green() {
            SignalBias::Bullish
        } else {
            SignalBias::Bearish
        };
        if ratio > 2.0 {
            signals.push(Signal::new(side, 0.6, format!("Volume spike ({:.1}x average) on {} bar", ratio, side)));
        } else if ratio > 1.5 {
            signals.push(Signal::new(side, 0.3, format!("Above-average volume ({:.1}x) on {} bar", ratio, side)));
        } else if ratio < 0.5 {
            signals.push(Signal::neutral(0.2, format!("Low volume ({:.1}x) - weak conviction", ratio)));
        }
    }

    match ind.volume_trend {
        Some(VolumeTrend::Increasing) => signals.push(Signal::neutral(0.2, "Volume trend increasing")),
        Some(VolumeTrend::Decreasing) => signals.push(Signal::neutral(0.2, "Volume trend decreasing")),
        Some(VolumeTrend::Stable) | None => {}
    }

    match ind.rsi_divergence {
        Some(RsiDivergence::Bullish) => {
            signals.push(Signal::bullish(0.8, "Bullish RSI divergence (price lower low, RSI higher low)"))
        }
        Some(RsiDivergence::Bearish) => {
            signals.push(Signal::bearish(0.8, "Bearish RSI divergence (price higher high, RSI lower high)"))
        }
        Some(RsiDivergence::None) | None => {}
    }

    signals
}

fn pattern_signals(patterns: &[PatternMatch]) -> Vec<Signal> {
    patterns
        .iter()
        .map(|p| {
            Signal::new(
                p.bias,
                p.confidence,
                format!("{} pattern ({:.0}% confidence)", p.pattern, p.confidence * 100.0),
            )
        })
        .collect()
}

/// Position of price inside the last 24 bars, and rejections at its edges.
fn range_signals(bars: &[OhlcPoint]) -> Vec<Signal> {
    if bars.len() < RANGE_WINDOW {
        return Vec::new();
    }
    let window = &bars[bars.len() - RANGE_WINDOW..];
    let recent = &bars[bars.len() - RECENT_WINDOW..];
    let (Some((high, low)), Some((recent_high, recent_low))) = (bar_range(window), bar_range(recent)) else {
        return Vec::new();
    };
    let range = high - low;
    if range <= 0.0 {
        return Vec::new();
    }
    let price = window[window.len() - 1].close;

    if recent_high >= high * 0.998 && price <= high * 0.985 {
        vec![Signal::bearish(
            0.5,
            format!("Rejected at 24h high ({:.2}), now {:.1}% below", high, (high - price) / high * 100.0),
        )]
    } else if recent_low <= low * 1.002 && price >= low * 1.015 {
        vec![Signal::bullish(
            0.5,
            format!("Bounced from 24h low ({:.2}), now {:.1}% above", low, (price - low) / low * 100.0),
        )]
    } else {
        let position = (price - low) / range;
        if position > 0.9 {
            vec![Signal::bullish(0.3, "Trading near 24h high")]
        } else if position < 0.1 {
            vec![Signal::bearish(0.3, "Trading near 24h low")]
        } else {
            Vec::new()
        }
    }
}

/// Low ATR with price well inside the bands.
fn is_sideways(price: f64, ind: &TechnicalIndicators) -> bool {
    match (ind.atr, &ind.bollinger_bands) {
        (Some(atr), Some(bb)) => atr < price * 0.015 && inside_inner_band(price, bb),
        _ => false,
    }
}

fn inside_inner_band(price: f64, bb: &BollingerBands) -> bool {
    let margin = bb.width() * 0.02;
    price > bb.lower + margin && price < bb.upper - margin
}

fn derivatives_signals(d: &DerivativesData) -> Vec<Signal> {
    let mut signals = Vec::new();

    if let Some(funding) = d.funding_rate {
        let pct = funding * 100.0;
        if funding > 0.01 {
            signals.push(Signal::bearish(
                0.6,
                format!("Extreme positive funding ({:.3}%) - overleveraged longs", pct),
            ));
        } else if funding > 0.005 {
            signals.push(Signal::bearish(0.3, format!("Elevated funding ({:.3}%) - longs crowded", pct)));
        } else if funding < -0.01 {
            signals.push(Signal::bullish(
                0.6,
                format!("Extreme negative funding ({:.3}%) - overleveraged shorts", pct),
            ));
        } else if funding < -0.005 {
            signals.push(Signal::bullish(0.3, format!("Negative funding ({:.3}%) - shorts crowded", pct)));
        }
    }

    if let Some(oi) = d.open_interest_value {
        if oi > LARGE_OPEN_INTEREST_USD {
            signals.push(Signal::neutral(
                0.2,
                format!("High open interest (${:.1}B) - elevated volatility risk", oi / 1e9),
            ));
        }
    }

    if let Some(alert) = &d.squeeze_alert {
        let weight = if alert.probability == SqueezeProbability::High {
            0.7
        } else {
            0.4
        };
        let probability = match alert.probability {
            SqueezeProbability::High => "high",
            SqueezeProbability::Medium => "medium",
            SqueezeProbability::Low => "low",
        };
        match alert.kind {
            SqueezeKind::LongSqueeze => signals.push(Signal::bearish(
                weight,
                format!("Long squeeze risk ({} probability)", probability),
            )),
            SqueezeKind::ShortSqueeze => signals.push(Signal::bullish(
                weight,
                format!("Short squeeze risk ({} probability)", probability),
            )),
            SqueezeKind::None => {}
        }
    }

    signals
}

/// Strong on-chain factors at a discount, plus one macro bias signal.
fn on_chain_signals(m: &OnChainMetrics) -> Vec<Signal> {
    let analysis = OnChainAnalyzer::analyze(m);
    let mut signals: Vec<Signal> = analysis
        .factors
        .iter()
        .filter(|f| f.signal.is_directional())
        .filter_map(|f| {
            let weight = f64::from(f.weight) / 10.0;
            (weight >= 0.4).then(|| Signal::new(f.signal, weight * 0.8, f.explanation.clone()))
        })
        .collect();

    let macro_score = analysis.score / 100.0;
    if macro_score.abs() > 0.3 {
        let bias = if macro_score > 0.0 {
            SignalBias::Bullish
        } else {
            SignalBias::Bearish
        };
        signals.push(Signal::new(
            bias,
            macro_score.abs().min(0.7),
            format!("On-chain macro bias {} (score {:.0})", bias, analysis.score),
        ));
    }
    signals
}

fn exchange_flow_signals(m: &ExchangeFlowMetrics) -> (Vec<Signal>, Vec<String>) {
    let analysis = ExchangeFlowAnalyzer::analyze(m);
    if analysis.weight <= 0.0 {
        return (Vec::new(), analysis.factors);
    }
    let mut signals = vec![Signal::new(
        analysis.bias,
        analysis.weight,
        format!("Exchange flows {} (score {:.2})", analysis.bias, analysis.score),
    )];
    signals.extend(
        analysis
            .factors
            .iter()
            .map(|f| Signal::new(analysis.bias, analysis.weight / 2.0, f.clone())),
    );
    (signals, analysis.factors)
}

/// Expected price in 24h.
fn project_price(price: f64, atr: f64, direction: Direction, confidence: f64) -> f64 {
    if price <= 0.0 {
        return price;
    }
    let strength = (confidence - 0.5) * 2.0 * (atr / price) * 1.5;
    match direction {
        Direction::Up => price * (1.0 + strength),
        Direction::Down => price * (1.0 - strength),
        Direction::Sideways | Direction::Mixed => price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MacdValues, SqueezeAlert};

    fn only(signals: &[Signal]) -> (SignalBias, f64) {
        assert_eq!(signals.len(), 1, "{:?}", signals);
        (signals[0].signal, signals[0].weight)
    }

    fn flat_bars(n: usize, price: f64) -> Vec<OhlcPoint> {
        (0..n)
            .map(|i| OhlcPoint {
                time: i as i64 * 3_600_000,
                open: price,
                high: price * 1.001,
                low: price * 0.999,
                close: price,
                volume: 100.0,
            })
            .collect()
    }

    #[test]
    fn test_empty_series_fails_fast() {
        let result = PredictionEngine::predict(&[], &TechnicalIndicators::default(), &[], None, None, None);
        assert!(matches!(result, Err(Error::EmptySeries)));
    }

    #[test]
    fn test_no_evidence_is_mixed() {
        let prediction =
            PredictionEngine::predict(&flat_bars(5, 100.0), &TechnicalIndicators::default(), &[], None, None, None)
                .unwrap();
        assert_eq!(prediction.direction, Direction::Mixed);
        assert_eq!(prediction.confidence, 0.5);
        assert!(prediction.target_price.is_none());
        assert_eq!(prediction.predicted_price_24h, 100.0);
        assert!(prediction.derivatives_factors.is_none());
    }

    #[test]
    fn test_macd_crossover_vs_position() {
        let last = flat_bars(1, 100.0).remove(0);
        let crossed = TechnicalIndicators {
            macd: Some(MacdValues { macd: 1.0, signal: 0.5, histogram: 0.5 }),
            prev_macd_histogram: Some(-0.1),
            ..Default::default()
        };
        let signals = indicator_signals(&crossed, &last);
        assert_eq!(signals[0].reason, "MACD bullish crossover (confirmed)");
        assert_eq!(signals[0].weight, 0.8);

        let held = TechnicalIndicators {
            prev_macd_histogram: Some(0.2),
            ..crossed
        };
        let signals = indicator_signals(&held, &last);
        assert_eq!(signals[0].reason, "MACD bullish (above signal)");
        assert_eq!(signals[0].weight, 0.4);
    }

    #[test]
    fn test_classify_branches() {
        let up = EvidenceBalance { bullish: 3.0, bearish: 1.0 };
        assert_eq!(up.classify(false), (Direction::Up, 0.75));

        let down = EvidenceBalance { bullish: 0.0, bearish: 2.0 };
        assert_eq!(down.classify(false), (Direction::Down, MAX_CONFIDENCE));

        let mixed = EvidenceBalance { bullish: 1.1, bearish: 1.0 };
        let (direction, confidence) = mixed.classify(false);
        assert_eq!(direction, Direction::Mixed);
        assert!((confidence - (0.5 + 2.0 * (0.1 / 2.1))).abs() < 1e-9);

        let sideways = EvidenceBalance { bullish: 1.0, bearish: 1.0 };
        assert_eq!(sideways.classify(true), (Direction::Sideways, MAX_CONFIDENCE));
    }

    #[test]
    fn test_sideways_needs_low_atr_inside_bands() {
        let bb = BollingerBands { upper: 110.0, middle: 100.0, lower: 90.0 };
        let quiet = TechnicalIndicators {
            atr: Some(1.0),
            bollinger_bands: Some(bb),
            ..Default::default()
        };
        assert!(is_sideways(100.0, &quiet));
        assert!(!is_sideways(109.8, &quiet));
        let volatile = TechnicalIndicators { atr: Some(2.0), ..quiet };
        assert!(!is_sideways(100.0, &volatile));
    }

    #[test]
    fn test_funding_is_contrarian() {
        let data = DerivativesData {
            funding_rate: Some(0.015),
            open_interest_value: Some(2e10),
            squeeze_alert: Some(SqueezeAlert { kind: SqueezeKind::None, probability: SqueezeProbability::Low }),
        };
        let signals = derivatives_signals(&data);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal, SignalBias::Bearish);
        assert!(signals[0].reason.contains("Extreme positive funding"));
        assert!(signals[0].reason.contains("overleveraged longs"));
    }

    #[test]
    fn test_squeeze_opposes_crowd() {
        let data = DerivativesData {
            squeeze_alert: Some(SqueezeAlert { kind: SqueezeKind::LongSqueeze, probability: SqueezeProbability::High }),
            ..Default::default()
        };
        let signals = derivatives_signals(&data);
        assert_eq!(signals[0].signal, SignalBias::Bearish);
        assert_eq!(signals[0].weight, 0.7);
        assert_eq!(signals[0].reason, "Long squeeze risk (high probability)");
    }

    #[test]
    fn test_on_chain_filter_and_discount() {
        let signals = on_chain_signals(&OnChainMetrics {
            mvrv: Some(0.8),
            active_addresses_change_pct: Some(20.0),
            ..Default::default()
        });
        // MVRV weight 10 kept at 0.8, activity weight 4 kept at 0.32; macro (27.5) below 0.3.
        assert_eq!(signals.len(), 2);
        assert!((signals[0].weight - 0.8).abs() < 1e-9);
        assert!((signals[1].weight - 0.32).abs() < 1e-9);
    }

    #[test]
    fn test_on_chain_macro_bias() {
        let signals = on_chain_signals(&OnChainMetrics {
            mvrv: Some(4.0),
            ..Default::default()
        });
        let macro_signal = signals.last().unwrap();
        assert_eq!(macro_signal.signal, SignalBias::Bearish);
        assert!((macro_signal.weight - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_range_rejection() {
        let mut bars = flat_bars(24, 100.0);
        bars[20].high = 110.0;
        let last = bars.len() - 1;
        bars[last].close = 105.0;
        let signals = range_signals(&bars);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal, SignalBias::Bearish);
        assert_eq!(signals[0].weight, 0.5);
    }

    #[test]
    fn test_bollinger_breach() {
        let last = flat_bars(1, 100.0).remove(0);
        let band = |lower: f64, upper: f64| TechnicalIndicators {
            bollinger_bands: Some(BollingerBands { upper, middle: (upper + lower) / 2.0, lower }),
            ..Default::default()
        };
        assert_eq!(only(&indicator_signals(&band(101.0, 110.0), &last)), (SignalBias::Bullish, 0.7));
        assert_eq!(only(&indicator_signals(&band(90.0, 99.0), &last)), (SignalBias::Bearish, 0.7));
        assert!(indicator_signals(&band(95.0, 105.0), &last).is_empty());
    }

    #[test]
    fn test_trend_alignment() {
        let last = flat_bars(1, 100.0).remove(0);
        let trend = |ema20: f64, sma50: f64| TechnicalIndicators {
            ema20: Some(ema20),
            sma50: Some(sma50),
            ..Default::default()
        };
        assert_eq!(only(&indicator_signals(&trend(99.0, 98.0), &last)), (SignalBias::Bullish, 0.9));
        assert_eq!(only(&indicator_signals(&trend(101.0, 102.0), &last)), (SignalBias::Bearish, 0.9));
        // Price above EMA20 but EMA20 below SMA50: no alignment.
        assert!(indicator_signals(&trend(99.0, 101.0), &last).is_empty());
    }

    #[test]
    fn test_volume_ratio_tiers_follow_bar_color() {
        let green = flat_bars(1, 100.0).remove(0);
        let red = OhlcPoint { open: 101.0, ..green };
        let ratio = |r: f64| TechnicalIndicators {
            volume_ratio: Some(r),
            ..Default::default()
        };

        assert_eq!(only(&indicator_signals(&ratio(2.5), &green)), (SignalBias::Bullish, 0.6));
        assert_eq!(only(&indicator_signals(&ratio(2.5), &red)), (SignalBias::Bearish, 0.6));
        assert_eq!(only(&indicator_signals(&ratio(1.7), &green)), (SignalBias::Bullish, 0.3));
        assert_eq!(only(&indicator_signals(&ratio(1.7), &red)), (SignalBias::Bearish, 0.3));
        assert_eq!(only(&indicator_signals(&ratio(0.4), &red)), (SignalBias::Neutral, 0.2));
        assert!(indicator_signals(&ratio(1.0), &green).is_empty());
    }

    #[test]
    fn test_volume_trend_is_neutral() {
        let last = flat_bars(1, 100.0).remove(0);
        let trend = |t: VolumeTrend| TechnicalIndicators {
            volume_trend: Some(t),
            ..Default::default()
        };
        assert_eq!(only(&indicator_signals(&trend(VolumeTrend::Increasing), &last)), (SignalBias::Neutral, 0.2));
        assert_eq!(only(&indicator_signals(&trend(VolumeTrend::Decreasing), &last)), (SignalBias::Neutral, 0.2));
        assert!(indicator_signals(&trend(VolumeTrend::Stable), &last).is_empty());
    }

    #[test]
    fn test_rsi_divergence() {
        let last = flat_bars(1, 100.0).remove(0);
        let divergence = |d: RsiDivergence| TechnicalIndicators {
            rsi_divergence: Some(d),
            ..Default::default()
        };
        assert_eq!(only(&indicator_signals(&divergence(RsiDivergence::Bullish), &last)), (SignalBias::Bullish, 0.8));
        assert_eq!(only(&indicator_signals(&divergence(RsiDivergence::Bearish), &last)), (SignalBias::Bearish, 0.8));
        assert!(indicator_signals(&divergence(RsiDivergence::None), &last).is_empty());
    }

    #[test]
    fn test_range_bounce_at_low() {
        let mut bars = flat_bars(24, 100.0);
        // Old high keeps the recent bars clear of a rejection.
        bars[0].high = 110.0;
        bars[20].low = 90.0;
        let last = bars.len() - 1;
        bars[last].close = 95.0;
        let signals = range_signals(&bars);
        assert_eq!(only(&signals), (SignalBias::Bullish, 0.5));
        assert!(signals[0].reason.starts_with("Bounced from 24h low"));
    }

    #[test]
    fn test_range_position_near_edges() {
        let mut near_high = flat_bars(24, 100.0);
        near_high[0].low = 90.0;
        let signals = range_signals(&near_high);
        assert_eq!(only(&signals), (SignalBias::Bullish, 0.3));
        assert_eq!(signals[0].reason, "Trading near 24h high");

        let mut near_low = flat_bars(24, 100.0);
        near_low[0].high = 110.0;
        let signals = range_signals(&near_low);
        assert_eq!(only(&signals), (SignalBias::Bearish, 0.3));
        assert_eq!(signals[0].reason, "Trading near 24h low");
    }

    #[test]
    fn test_exchange_flow_aggregate_and_half_weight_factors() {
        let (signals, factors) = exchange_flow_signals(&ExchangeFlowMetrics {
            netflow_24h_btc: Some(-8_000.0),
            reserve_change_7d_pct: Some(-3.0),
            ..Default::default()
        });
        assert_eq!(factors.len(), 2);
        assert_eq!(signals.len(), 3);
        assert!(signals.iter().all(|s| s.signal == SignalBias::Bullish));
        assert!(signals[0].reason.starts_with("Exchange flows"));
        assert!((signals[0].weight - 0.5).abs() < 1e-9);
        for (signal, factor) in signals[1..].iter().zip(&factors) {
            assert_eq!(&signal.reason, factor);
            assert!((signal.weight - 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn test_exchange_flow_without_weight_adds_no_signals() {
        let (signals, factors) = exchange_flow_signals(&ExchangeFlowMetrics {
            netflow_24h_btc: Some(100.0),
            ..Default::default()
        });
        assert!(signals.is_empty());
        assert!(factors.is_empty());
    }

    #[test]
    fn test_exchange_flow_reaches_prediction() {
        let flows = ExchangeFlowMetrics {
            netflow_24h_btc: Some(-8_000.0),
            reserve_change_7d_pct: Some(-3.0),
            ..Default::default()
        };
        let prediction = PredictionEngine::predict(
            &flat_bars(5, 100.0),
            &TechnicalIndicators::default(),
            &[],
            None,
            None,
            Some(&flows),
        )
        .unwrap();
        assert_eq!(prediction.direction, Direction::Up);
        let factors = prediction.exchange_flow_factors.unwrap();
        assert_eq!(factors.len(), 2);
        assert!(prediction.reasoning[0].starts_with("Exchange flows"));
        assert_eq!(prediction.reasoning.len(), 3);
    }

    #[test]
    fn test_range_needs_24_bars() {
        assert!(range_signals(&flat_bars(23, 100.0)).is_empty());
    }

    #[test]
    fn test_projection() {
        assert!((project_price(100.0, 2.0, Direction::Up, 0.75) - 101.5).abs() < 1e-9);
        assert!((project_price(100.0, 2.0, Direction::Down, 0.75) - 98.5).abs() < 1e-9);
        assert_eq!(project_price(100.0, 2.0, Direction::Mixed, 0.75), 100.0);
    }
}
