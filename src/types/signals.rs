use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional opinion of a single rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalBias {
    Bullish,
    Bearish,
    Neutral,
}

impl SignalBias {
    /// +1 for bullish, -1 for bearish, 0 for neutral.
    pub fn sign(&self) -> f64 {
        match self {
            SignalBias::Bullish => 1.0,
            SignalBias::Bearish => -1.0,
            SignalBias::Neutral => 0.0,
        }
    }

    pub fn is_directional(&self) -> bool {
        !matches!(self, SignalBias::Neutral)
    }
}

impl fmt::Display for SignalBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalBias::Bullish => write!(f, "bullish"),
            SignalBias::Bearish => write!(f, "bearish"),
            SignalBias::Neutral => write!(f, "neutral"),
        }
    }
}

/// One weighted directional opinion produced during a single evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub signal: SignalBias,
    pub weight: f64,
    pub reason: String,
}

impl Signal {
    pub fn new(signal: SignalBias, weight: f64, reason: impl Into<String>) -> Self {
        Self {
            signal,
            weight,
            reason: reason.into(),
        }
    }

    pub fn bullish(weight: f64, reason: impl Into<String>) -> Self {
        Self::new(SignalBias::Bullish, weight, reason)
    }

    pub fn bearish(weight: f64, reason: impl Into<String>) -> Self {
        Self::new(SignalBias::Bearish, weight, reason)
    }

    pub fn neutral(weight: f64, reason: impl Into<String>) -> Self {
        Self::new(SignalBias::Neutral, weight, reason)
    }
}

/// Category a factor was scored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorCategory {
    Technical,
    OnChain,
    Cohort,
    Derivatives,
    PriceModels,
    Sentiment,
}

impl FactorCategory {
    /// Get display name for this category.
    pub fn name(&self) -> &'static str {
        match self {
            FactorCategory::Technical => "Technical",
            FactorCategory::OnChain => "On-Chain",
            FactorCategory::Cohort => "Cohorts",
            FactorCategory::Derivatives => "Derivatives",
            FactorCategory::PriceModels => "Price Models",
            FactorCategory::Sentiment => "Sentiment",
        }
    }
}

/// A named, categorized and explained signal used by the aggregate report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Factor {
    pub name: String,
    pub category: FactorCategory,
    pub signal: SignalBias,
    /// Display weight, 0-10.
    pub weight: u8,
    /// The metric value that triggered this factor.
    pub value: f64,
    pub explanation: String,
}

/// Overall label of an aggregated report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallSignal {
    Bullish,
    Bearish,
    Neutral,
}

impl OverallSignal {
    /// Label a weighted score in [-100, 100].
    pub fn from_score(score: f64) -> Self {
        if score > 20.0 {
            OverallSignal::Bullish
        } else if score < -20.0 {
            OverallSignal::Bearish
        } else {
            OverallSignal::Neutral
        }
    }

    /// Get display label.
    pub fn label(&self) -> &'static str {
        match self {
            OverallSignal::Bullish => "BULLISH",
            OverallSignal::Bearish => "BEARISH",
            OverallSignal::Neutral => "NEUTRAL",
        }
    }
}

/// Per-category scores, each in [-100, 100].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScores {
    pub technical: f64,
    pub on_chain: f64,
    pub derivatives: f64,
    pub price_models: f64,
    pub sentiment: f64,
}

/// Aggregated multi-category market report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedSignal {
    pub overall: OverallSignal,
    /// Weighted score in [-100, 100].
    pub score: f64,
    /// 0-100.
    pub confidence: f64,
    pub category_scores: CategoryScores,
    /// Top 5 bullish factors by weight, descending.
    pub bullish_factors: Vec<Factor>,
    /// Top 5 bearish factors by weight, descending.
    pub bearish_factors: Vec<Factor>,
    pub neutral_factors: Vec<Factor>,
    /// Unix timestamp (milliseconds) when computed.
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_from_score_boundaries() {
        assert_eq!(OverallSignal::from_score(20.0), OverallSignal::Neutral);
        assert_eq!(OverallSignal::from_score(20.01), OverallSignal::Bullish);
        assert_eq!(OverallSignal::from_score(-20.0), OverallSignal::Neutral);
        assert_eq!(OverallSignal::from_score(-20.01), OverallSignal::Bearish);
    }

    #[test]
    fn test_overall_serializes_uppercase() {
        let json = serde_json::to_string(&OverallSignal::Bullish).unwrap();
        assert_eq!(json, "\"BULLISH\"");
    }

    #[test]
    fn test_bias_sign() {
        assert_eq!(SignalBias::Bullish.sign(), 1.0);
        assert_eq!(SignalBias::Bearish.sign(), -1.0);
        assert!(!SignalBias::Neutral.is_directional());
    }
}
