//! Ordered threshold tables.
//!
//! Each metric is scored by a [`MetricLadder`]: rules are tried top-down and
//! the first whose [`Threshold`] matches supplies the score delta and the
//! factor. Ladders end with a catch-all rule so a present metric always
//! yields exactly one factor.

use crate::types::{Factor, FactorCategory, SignalBias};

/// Comparison applied to a metric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    /// Strictly greater than.
    Above(f64),
    /// Greater than or equal.
    AtLeast(f64),
    /// Strictly less than.
    Below(f64),
    /// Always matches.
    Any,
}

impl Threshold {
    pub fn matches(&self, value: f64) -> bool {
        match *self {
            Threshold::Above(t) => value > t,
            Threshold::AtLeast(t) => value >= t,
            Threshold::Below(t) => value < t,
            Threshold::Any => true,
        }
    }
}

/// One row of a ladder.
#[derive(Debug, Clone, Copy)]
pub struct MetricRule {
    pub when: Threshold,
    /// Contribution to the category score.
    pub score: f64,
    pub name: &'static str,
    pub bias: SignalBias,
    /// Display weight, 0-10.
    pub weight: u8,
    /// Explanation template; `{v}` is replaced by the formatted value.
    pub explain: &'static str,
}

impl MetricRule {
    pub const fn new(
        when: Threshold,
        score: f64,
        name: &'static str,
        bias: SignalBias,
        weight: u8,
        explain: &'static str,
    ) -> Self {
        Self {
            when,
            score,
            name,
            bias,
            weight,
            explain,
        }
    }
}

/// Ordered rules for one metric.
#[derive(Debug)]
pub struct MetricLadder {
    pub metric: &'static str,
    pub category: FactorCategory,
    /// Multiplier applied before display (100 to show a fraction as percent).
    pub display_scale: f64,
    pub precision: usize,
    pub suffix: &'static str,
    pub rules: &'static [MetricRule],
}

/// Score delta and factor produced by one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricReading {
    pub score: f64,
    pub factor: Factor,
}

impl MetricLadder {
    /// First rule matching `value`.
    pub fn rule_for(&self, value: f64) -> Option<&'static MetricRule> {
        self.rules.iter().find(|r| r.when.matches(value))
    }

    pub fn format_value(&self, value: f64) -> String {
        format!("{:.*}{}", self.precision, value * self.display_scale, self.suffix)
    }

    pub fn evaluate(&self, value: f64) -> Option<MetricReading> {
        if !value.is_finite() {
            return None;
        }
        let rule = self.rule_for(value)?;
        Some(MetricReading {
            score: rule.score,
            factor: Factor {
                name: rule.name.to_string(),
                category: self.category,
                signal: rule.bias,
                weight: rule.weight,
                value,
                explanation: rule.explain.replace("{v}", &self.format_value(value)),
            },
        })
    }
}

/// Score and factors for one category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryAnalysis {
    /// Mean of the present metrics' deltas, in [-100, 100].
    pub score: f64,
    /// Number of metrics that contributed.
    pub metrics_used: usize,
    pub factors: Vec<Factor>,
}

impl CategoryAnalysis {
    pub fn from_readings(readings: impl IntoIterator<Item = MetricReading>) -> Self {
        let mut sum: f64 = 0.0;
        let mut factors = Vec::new();
        for reading in readings {
            sum += reading.score;
            factors.push(reading.factor);
        }
        let metrics_used = factors.len();
        let score = if metrics_used > 0 {
            (sum / metrics_used as f64).clamp(-100.0, 100.0)
        } else {
            0.0
        };
        Self {
            score,
            metrics_used,
            factors,
        }
    }

    /// Combine two analyses as if their metrics had been scored together.
    pub fn merge(mut self, other: CategoryAnalysis) -> Self {
        let total = self.metrics_used + other.metrics_used;
        if total > 0 {
            self.score = (self.score * self.metrics_used as f64
                + other.score * other.metrics_used as f64)
                / total as f64;
        }
        self.metrics_used = total;
        self.factors.extend(other.factors);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.metrics_used == 0
    }
}

/// Score every present metric against its ladder. Absent metrics are skipped.
pub fn score_metrics(metrics: &[(Option<f64>, &MetricLadder)]) -> CategoryAnalysis {
    CategoryAnalysis::from_readings(
        metrics
            .iter()
            .filter_map(|(value, ladder)| value.and_then(|v| ladder.evaluate(v))),
    )
}
