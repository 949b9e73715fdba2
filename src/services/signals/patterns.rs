//! Multi-condition chart pattern detection over hourly closes.
//!
//! Each detector is an independent predicate over the most recent 48
//! points plus funding and open interest. Matches carry a win rate: the
//! detector's baseline until the learner has enough graded calls for that
//! pattern, the learned accuracy afterwards.

use crate::types::{percent_change, Horizon, MarketContext, PatternMatch, SignalBias};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fewer points than this and nothing is recognized.
pub const MIN_POINTS: usize = 12;

/// Points analysed, most recent last.
pub const WINDOW: usize = 48;

/// Upper bound on a match's confidence after learner scaling.
pub const MAX_PATTERN_CONFIDENCE: f64 = 0.95;

/// Accuracy feedback consulted while scoring matches.
pub trait PatternAccuracy {
    /// Learned accuracy of `pattern`, or `None` while there is too little history.
    fn learned_accuracy(&self, pattern: &str, horizon: Horizon) -> Option<f64>;

    /// Confidence multiplier; 1.0 means no adjustment.
    fn accuracy_multiplier(&self, pattern: &str, horizon: Horizon) -> f64;
}

/// Weighted bias over a set of matches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternBias {
    pub bias: SignalBias,
    pub confidence: f64,
}

struct Detection {
    confidence: f64,
    description: String,
    reasoning: Vec<String>,
}

impl Detection {
    fn new(confidence: f64, description: impl Into<String>, reasoning: Vec<String>) -> Self {
        Self {
            confidence,
            description: description.into(),
            reasoning,
        }
    }
}

struct Detector {
    name: &'static str,
    bias: SignalBias,
    timeframe: Horizon,
    /// Win rate assumed before any calls are graded.
    baseline: f64,
    detect: fn(&Window) -> Option<Detection>,
}

const DETECTORS: &[Detector] = &[
    Detector { name: "V-Recovery", bias: SignalBias::Bullish, timeframe: Horizon::H24, baseline: 0.68, detect: v_recovery },
    Detector { name: "V-Top", bias: SignalBias::Bearish, timeframe: Horizon::H24, baseline: 0.64, detect: v_top },
    Detector { name: "Capitulation Bottom", bias: SignalBias::Bullish, timeframe: Horizon::H48, baseline: 0.72, detect: capitulation_bottom },
    Detector { name: "Long Squeeze Setup", bias: SignalBias::Bearish, timeframe: Horizon::H24, baseline: 0.63, detect: long_squeeze_setup },
    Detector { name: "Short Squeeze Setup", bias: SignalBias::Bullish, timeframe: Horizon::H24, baseline: 0.66, detect: short_squeeze_setup },
    Detector { name: "Distribution Top", bias: SignalBias::Bearish, timeframe: Horizon::H48, baseline: 0.61, detect: distribution_top },
    Detector { name: "Accumulation Base", bias: SignalBias::Bullish, timeframe: Horizon::H48, baseline: 0.60, detect: accumulation_base },
    Detector { name: "Bull Flag", bias: SignalBias::Bullish, timeframe: Horizon::H24, baseline: 0.65, detect: bull_flag },
    Detector { name: "Bear Flag", bias: SignalBias::Bearish, timeframe: Horizon::H24, baseline: 0.63, detect: bear_flag },
    Detector { name: "Higher Lows", bias: SignalBias::Bullish, timeframe: Horizon::H48, baseline: 0.58, detect: higher_lows },
    Detector { name: "Lower Highs", bias: SignalBias::Bearish, timeframe: Horizon::H48, baseline: 0.57, detect: lower_highs },
    Detector { name: "Breakout", bias: SignalBias::Bullish, timeframe: Horizon::H24, baseline: 0.62, detect: breakout },
    Detector { name: "Breakdown", bias: SignalBias::Bearish, timeframe: Horizon::H24, baseline: 0.62, detect: breakdown },
    Detector { name: "Funding Reset", bias: SignalBias::Bullish, timeframe: Horizon::H24, baseline: 0.59, detect: funding_reset },
    Detector { name: "Funding Overheating", bias: SignalBias::Bearish, timeframe: Horizon::H24, baseline: 0.60, detect: funding_overheating },
    Detector { name: "Double Bottom", bias: SignalBias::Bullish, timeframe: Horizon::H48, baseline: 0.64, detect: double_bottom },
    Detector { name: "Double Top", bias: SignalBias::Bearish, timeframe: Horizon::H48, baseline: 0.62, detect: double_top },
    Detector { name: "Volatility Expansion", bias: SignalBias::Neutral, timeframe: Horizon::H24, baseline: 0.50, detect: volatility_expansion },
];

static RANGE_COMPRESSION: Detector = Detector {
    name: "Range Compression",
    bias: SignalBias::Neutral,
    timeframe: Horizon::H48,
    baseline: 0.55,
    detect: range_compression,
};

static MIXED_SIGNALS: Detector = Detector {
    name: "Mixed Signals",
    bias: SignalBias::Neutral,
    timeframe: Horizon::H24,
    baseline: 0.50,
    detect: mixed_signals,
};

/// Names of every pattern the recognizer can emit.
pub fn pattern_names() -> impl Iterator<Item = &'static str> {
    DETECTORS
        .iter()
        .chain([&RANGE_COMPRESSION, &MIXED_SIGNALS])
        .map(|d| d.name)
}

/// Runs the detectors, optionally scaled by learned accuracy.
#[derive(Default)]
pub struct PatternRecognizer<'a> {
    accuracy: Option<&'a dyn PatternAccuracy>,
}

impl<'a> PatternRecognizer<'a> {
    pub fn new() -> Self {
        Self { accuracy: None }
    }

    /// Scale confidences and win rates by the given track record.
    pub fn with_accuracy(accuracy: &'a dyn PatternAccuracy) -> Self {
        Self {
            accuracy: Some(accuracy),
        }
    }

    /// All matching patterns, highest confidence first. Empty below
    /// [`MIN_POINTS`]; otherwise at least one match.
    pub fn recognize(&self, ctx: &MarketContext) -> Vec<PatternMatch> {
        if ctx.prices.len() < MIN_POINTS {
            debug!("Pattern recognition skipped: {} points", ctx.prices.len());
            return Vec::new();
        }
        let window = Window::new(ctx);

        let mut matches: Vec<PatternMatch> = DETECTORS
            .iter()
            .filter_map(|d| (d.detect)(&window).map(|found| self.finish(d, found)))
            .collect();

        if !matches.iter().any(|m| m.bias.is_directional()) {
            let fallback = [&RANGE_COMPRESSION, &MIXED_SIGNALS]
                .into_iter()
                .find_map(|d| (d.detect)(&window).map(|found| self.finish(d, found)));
            matches.extend(fallback);
        }

        matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        debug!(
            "Recognized {} patterns over {} points",
            matches.len(),
            window.prices.len()
        );
        matches
    }

    fn finish(&self, detector: &Detector, found: Detection) -> PatternMatch {
        let mut confidence = found.confidence;
        let mut accuracy = detector.baseline;
        if let Some(track) = self.accuracy {
            if let Some(learned) = track.learned_accuracy(detector.name, detector.timeframe) {
                accuracy = learned;
                confidence *= track.accuracy_multiplier(detector.name, detector.timeframe);
            }
        }
        PatternMatch {
            pattern: detector.name.to_string(),
            confidence: confidence.clamp(0.0, MAX_PATTERN_CONFIDENCE),
            bias: detector.bias,
            timeframe: detector.timeframe,
            description: found.description,
            reasoning: found.reasoning,
            historical_accuracy: Some(accuracy),
        }
    }

    /// One bias for a set of matches, each weighted by confidence times win
    /// rate (0.5 when unknown).
    pub fn aggregate_bias(matches: &[PatternMatch]) -> PatternBias {
        let (mut bullish, mut bearish) = (0.0_f64, 0.0_f64);
        for m in matches {
            let weight = m.confidence * m.historical_accuracy.unwrap_or(0.5);
            match m.bias {
                SignalBias::Bullish => bullish += weight,
                SignalBias::Bearish => bearish += weight,
                SignalBias::Neutral => {}
            }
        }
        let total = bullish + bearish;
        if total <= 0.0 {
            return PatternBias {
                bias: SignalBias::Neutral,
                confidence: 0.0,
            };
        }
        let net = (bullish - bearish) / total;
        if net.abs() <= 0.2 {
            PatternBias {
                bias: SignalBias::Neutral,
                confidence: 0.5,
            }
        } else if net > 0.0 {
            PatternBias {
                bias: SignalBias::Bullish,
                confidence: bullish / total,
            }
        } else {
            PatternBias {
                bias: SignalBias::Bearish,
                confidence: bearish / total,
            }
        }
    }
}

/// The analysed slice of closes plus derivatives context.
struct Window<'a> {
    prices: Vec<f64>,
    current: f64,
    ctx: &'a MarketContext,
}

impl<'a> Window<'a> {
    fn new(ctx: &'a MarketContext) -> Self {
        let start = ctx.prices.len().saturating_sub(WINDOW);
        let prices: Vec<f64> = ctx.prices[start..].iter().map(|p| p.price).collect();
        let last = prices.last().copied().unwrap_or_default();
        let current = if ctx.current_price > 0.0 {
            ctx.current_price
        } else {
            last
        };
        Self {
            prices,
            current,
            ctx,
        }
    }

    fn len(&self) -> usize {
        self.prices.len()
    }

    fn halves(&self) -> (&[f64], &[f64]) {
        self.prices.split_at(self.len() / 2)
    }

    /// The most recent `n` points (all when fewer).
    fn tail(&self, n: usize) -> &[f64] {
        &self.prices[self.len().saturating_sub(n)..]
    }

    /// Percent change over the last 24 points.
    fn change_24h(&self) -> f64 {
        percent_change(self.tail(24)[0], self.current)
    }
}

fn argmin(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

fn argmax(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

/// Standard deviation of point-to-point percent returns.
fn volatility(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let returns: Vec<f64> = values.windows(2).map(|w| percent_change(w[0], w[1])).collect();
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    variance.sqrt()
}

/// Extremes of `segments` equal consecutive chunks.
fn segment_extremes(values: &[f64], segments: usize, pick: fn(&[f64]) -> Option<(usize, f64)>) -> Vec<f64> {
    let size = values.len() / segments;
    if size == 0 {
        return Vec::new();
    }
    values
        .chunks(size)
        .take(segments)
        .filter_map(|c| pick(c).map(|(_, v)| v))
        .collect()
}

fn v_recovery(w: &Window) -> Option<Detection> {
    let start = w.prices[0];
    let (low_idx, low) = argmin(&w.prices)?;
    if (low_idx as f64) >= w.len() as f64 * 0.6 {
        return None;
    }
    let drop = -percent_change(start, low);
    if drop < 5.0 {
        return None;
    }
    let retrace = (w.current - low) / (start - low);
    if retrace < 0.8 {
        return None;
    }
    let confidence = (0.6 + (drop - 5.0) / 50.0 + (retrace - 0.8) * 0.25).min(0.85);
    Some(Detection::new(
        confidence,
        "Sharp sell-off fully bought back",
        vec![
            format!("Dropped {:.1}% from {:.2} to {:.2}", drop, start, low),
            format!("Recovered {:.0}% of the drop", retrace * 100.0),
        ],
    ))
}

fn v_top(w: &Window) -> Option<Detection> {
    let start = w.prices[0];
    let (high_idx, high) = argmax(&w.prices)?;
    if (high_idx as f64) >= w.len() as f64 * 0.6 {
        return None;
    }
    let rise = percent_change(start, high);
    if rise < 5.0 {
        return None;
    }
    let retrace = (high - w.current) / (high - start);
    if retrace < 0.8 {
        return None;
    }
    let confidence = (0.58 + (rise - 5.0) / 50.0 + (retrace - 0.8) * 0.25).min(0.85);
    Some(Detection::new(
        confidence,
        "Rally fully given back",
        vec![
            format!("Rallied {:.1}% from {:.2} to {:.2}", rise, start, high),
            format!("Gave back {:.0}% of the rally", retrace * 100.0),
        ],
    ))
}

fn capitulation_bottom(w: &Window) -> Option<Detection> {
    let oi_change = w.ctx.oi_change_24h_pct?;
    if oi_change >= -10.0 {
        return None;
    }
    let funding_now = w.ctx.funding_rate.is_some_and(|f| f <= 0.0);
    let funding_avg = w.ctx.avg_funding_24h().is_some_and(|f| f <= 0.0);
    if !(funding_now || funding_avg) {
        return None;
    }
    let change = w.change_24h();
    let mut confidence = 0.65;
    let mut reasoning = vec![
        format!("Open interest {:.1}% in 24h - forced deleveraging", oi_change),
        "Funding at or below zero - longs flushed".to_string(),
    ];
    if change < -5.0 {
        confidence += 0.1;
        reasoning.push(format!("Price {:.1}% over 24h", change));
    }
    Some(Detection::new(confidence, "Leverage washed out with negative funding", reasoning))
}

fn long_squeeze_setup(w: &Window) -> Option<Detection> {
    let funding = w.ctx.funding_rate?;
    let oi_change = w.ctx.oi_change_24h_pct?;
    if funding < 0.0005 || oi_change < 5.0 {
        return None;
    }
    let confidence = 0.6 + (oi_change / 100.0).min(0.15);
    Some(Detection::new(
        confidence,
        "Crowded longs paying high funding into rising open interest",
        vec![
            format!("Funding {:.3}%", funding * 100.0),
            format!("Open interest +{:.1}% in 24h", oi_change),
        ],
    ))
}

fn short_squeeze_setup(w: &Window) -> Option<Detection> {
    let funding = w.ctx.funding_rate?;
    let oi_change = w.ctx.oi_change_24h_pct?;
    if funding > -0.0003 || oi_change < 5.0 {
        return None;
    }
    let confidence = 0.62 + (oi_change / 100.0).min(0.15);
    Some(Detection::new(
        confidence,
        "Crowded shorts paying funding into rising open interest",
        vec![
            format!("Funding {:.3}%", funding * 100.0),
            format!("Open interest +{:.1}% in 24h", oi_change),
        ],
    ))
}

fn distribution_top(w: &Window) -> Option<Detection> {
    let (first, second) = w.halves();
    let run_up = percent_change(first[0], first[first.len() - 1]);
    let drift = percent_change(second[0], w.current);
    if run_up < 4.0 || drift.abs() >= 1.5 || !w.ctx.funding_rate.map_or(true, |f| f > 0.0) {
        return None;
    }
    Some(Detection::new(
        0.6,
        "Advance stalled at the highs",
        vec![
            format!("Rose {:.1}% in the first half of the window", run_up),
            format!("Flat ({:+.1}%) since", drift),
        ],
    ))
}

fn accumulation_base(w: &Window) -> Option<Detection> {
    let (first, second) = w.halves();
    let decline = percent_change(first[0], first[first.len() - 1]);
    let drift = percent_change(second[0], w.current);
    if decline > -4.0 || drift.abs() >= 1.5 || !w.ctx.funding_rate.map_or(true, |f| f <= 0.0) {
        return None;
    }
    Some(Detection::new(
        0.58,
        "Decline halted into a flat base",
        vec![
            format!("Fell {:.1}% in the first half of the window", -decline),
            format!("Flat ({:+.1}%) since", drift),
        ],
    ))
}

fn bull_flag(w: &Window) -> Option<Detection> {
    if w.len() < 24 {
        return None;
    }
    let p = w.tail(24);
    let pole = percent_change(p[0], p[11]);
    let flag = percent_change(p[11], w.current);
    if pole < 3.0 || flag <= -3.0 || flag > 0.0 {
        return None;
    }
    Some(Detection::new(
        0.6 + (pole / 40.0).min(0.2),
        "Strong push followed by a shallow pullback",
        vec![
            format!("Pole +{:.1}%", pole),
            format!("Flag {:.1}%", flag),
        ],
    ))
}

fn bear_flag(w: &Window) -> Option<Detection> {
    if w.len() < 24 {
        return None;
    }
    let p = w.tail(24);
    let pole = percent_change(p[0], p[11]);
    let flag = percent_change(p[11], w.current);
    if pole > -3.0 || flag >= 3.0 || flag < 0.0 {
        return None;
    }
    Some(Detection::new(
        0.6 + (-pole / 40.0).min(0.2),
        "Sharp drop followed by a weak bounce",
        vec![
            format!("Pole {:.1}%", pole),
            format!("Flag +{:.1}%", flag),
        ],
    ))
}

fn higher_lows(w: &Window) -> Option<Detection> {
    let lows = segment_extremes(&w.prices, 4, argmin);
    if lows.len() < 4 || !lows.windows(2).all(|p| p[1] > p[0]) {
        return None;
    }
    let lift = percent_change(lows[0], lows[lows.len() - 1]);
    if lift < 1.0 {
        return None;
    }
    Some(Detection::new(
        0.55 + (lift / 50.0).min(0.15),
        "Each dip bought higher",
        vec![format!("Four rising swing lows, +{:.1}% overall", lift)],
    ))
}

fn lower_highs(w: &Window) -> Option<Detection> {
    let highs = segment_extremes(&w.prices, 4, argmax);
    if highs.len() < 4 || !highs.windows(2).all(|p| p[1] < p[0]) {
        return None;
    }
    let fade = -percent_change(highs[0], highs[highs.len() - 1]);
    if fade < 1.0 {
        return None;
    }
    Some(Detection::new(
        0.55 + (fade / 50.0).min(0.15),
        "Each rally sold lower",
        vec![format!("Four falling swing highs, -{:.1}% overall", fade)],
    ))
}

fn breakout(w: &Window) -> Option<Detection> {
    let (_, prior_high) = argmax(&w.prices[..w.len() - 1])?;
    let excess = percent_change(prior_high, w.current);
    if excess < 1.0 {
        return None;
    }
    Some(Detection::new(
        0.6 + ((excess - 1.0) / 20.0).min(0.2),
        "Price cleared the window high",
        vec![format!("{:.1}% above prior high {:.2}", excess, prior_high)],
    ))
}

fn breakdown(w: &Window) -> Option<Detection> {
    let (_, prior_low) = argmin(&w.prices[..w.len() - 1])?;
    let excess = -percent_change(prior_low, w.current);
    if excess < 1.0 {
        return None;
    }
    Some(Detection::new(
        0.6 + ((excess - 1.0) / 20.0).min(0.2),
        "Price lost the window low",
        vec![format!("{:.1}% below prior low {:.2}", excess, prior_low)],
    ))
}

fn funding_reset(w: &Window) -> Option<Detection> {
    let current = w.ctx.funding_rate?;
    let avg = w.ctx.avg_funding_24h()?;
    if avg < 0.0003 || current > 0.0001 {
        return None;
    }
    Some(Detection::new(
        0.6,
        "Elevated funding cooled without a price collapse",
        vec![format!(
            "Funding {:.3}% versus 24h average {:.3}%",
            current * 100.0,
            avg * 100.0
        )],
    ))
}

fn funding_overheating(w: &Window) -> Option<Detection> {
    let current = w.ctx.funding_rate?;
    if current < 0.0008 {
        return None;
    }
    if let Some(avg) = w.ctx.avg_funding_24h() {
        if current <= avg {
            return None;
        }
    }
    Some(Detection::new(
        0.6 + ((current - 0.0008) * 100.0).min(0.2),
        "Funding accelerating to extreme levels",
        vec![format!("Funding {:.3}% and rising", current * 100.0)],
    ))
}

fn double_bottom(w: &Window) -> Option<Detection> {
    let mid = w.len() / 2;
    let (i1, l1) = argmin(&w.prices[..mid])?;
    let (j, l2) = argmin(&w.prices[mid..])?;
    let i2 = mid + j;
    let floor = (l1 + l2) / 2.0;
    if i2 - i1 < 4 || (l1 - l2).abs() / floor > 0.015 {
        return None;
    }
    let (_, neck) = argmax(&w.prices[i1..=i2])?;
    if neck < floor * 1.03 || w.current < floor * 1.01 {
        return None;
    }
    Some(Detection::new(
        0.62,
        "Two tests of the same low held",
        vec![
            format!("Lows at {:.2} and {:.2}", l1, l2),
            format!("Neckline {:.2}", neck),
        ],
    ))
}

fn double_top(w: &Window) -> Option<Detection> {
    let mid = w.len() / 2;
    let (i1, h1) = argmax(&w.prices[..mid])?;
    let (j, h2) = argmax(&w.prices[mid..])?;
    let i2 = mid + j;
    let ceiling = (h1 + h2) / 2.0;
    if i2 - i1 < 4 || (h1 - h2).abs() / ceiling > 0.015 {
        return None;
    }
    let (_, neck) = argmin(&w.prices[i1..=i2])?;
    if neck > ceiling * 0.97 || w.current > ceiling * 0.99 {
        return None;
    }
    Some(Detection::new(
        0.6,
        "Two tests of the same high rejected",
        vec![
            format!("Highs at {:.2} and {:.2}", h1, h2),
            format!("Neckline {:.2}", neck),
        ],
    ))
}

fn volatility_expansion(w: &Window) -> Option<Detection> {
    let (first, second) = w.halves();
    let (before, after) = (volatility(first), volatility(second));
    if before <= 0.0 || after <= before * 1.5 {
        return None;
    }
    let ratio = after / before;
    Some(Detection::new(
        0.5 + ((ratio - 1.5) / 10.0).min(0.2),
        "Volatility expanding - larger move likely",
        vec![format!("Recent volatility {:.1}x the earlier half", ratio)],
    ))
}

fn range_compression(w: &Window) -> Option<Detection> {
    let (first, second) = w.halves();
    let (before, after) = (volatility(first), volatility(second));
    if before <= 0.0 || after >= before * 0.7 {
        return None;
    }
    Some(Detection::new(
        0.5,
        "Range tightening ahead of a move",
        vec![format!(
            "Recent volatility {:.0}% of the earlier half",
            after / before * 100.0
        )],
    ))
}

fn mixed_signals(_: &Window) -> Option<Detection> {
    Some(Detection::new(
        0.3,
        "No clear pattern",
        vec!["No directional pattern detected".to_string()],
    ))
}
