use crate::types::{percent_change, Direction};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Holding period after which a logged signal is graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "24h")]
    H24,
    #[serde(rename = "48h")]
    H48,
    #[serde(rename = "72h")]
    H72,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::H24, Horizon::H48, Horizon::H72];

    pub fn hours(&self) -> i64 {
        match self {
            Horizon::H24 => 24,
            Horizon::H48 => 48,
            Horizon::H72 => 72,
        }
    }

    pub fn millis(&self) -> i64 {
        self.hours() * 3_600_000
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "24h" => Some(Horizon::H24),
            "48h" => Some(Horizon::H48),
            "72h" => Some(Horizon::H72),
            _ => None,
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.hours())
    }
}

/// Realized result of a call over one horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Incorrect,
    /// Price barely moved; excluded from accuracy denominators.
    Neutral,
}

impl Outcome {
    /// Minimum move (%) in the called direction for an up/down call to count.
    pub const DIRECTIONAL_THRESHOLD_PCT: f64 = 0.5;
    /// Maximum move (%) for a sideways/mixed call to count as correct.
    pub const RANGE_THRESHOLD_PCT: f64 = 2.0;

    /// Grade a call given the realized percent change since it was made.
    pub fn grade(direction: Direction, change_pct: f64) -> Self {
        match direction {
            Direction::Up => Self::grade_directional(change_pct),
            Direction::Down => Self::grade_directional(-change_pct),
            Direction::Sideways | Direction::Mixed => {
                if change_pct.abs() < Self::RANGE_THRESHOLD_PCT {
                    Outcome::Correct
                } else {
                    Outcome::Incorrect
                }
            }
        }
    }

    fn grade_directional(move_in_called_direction: f64) -> Self {
        if move_in_called_direction > Self::DIRECTIONAL_THRESHOLD_PCT {
            Outcome::Correct
        } else if move_in_called_direction < -Self::DIRECTIONAL_THRESHOLD_PCT {
            Outcome::Incorrect
        } else {
            Outcome::Neutral
        }
    }

    pub fn is_decisive(&self) -> bool {
        !matches!(self, Outcome::Neutral)
    }
}

/// Fields the caller supplies when logging a new call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSignal {
    pub price: f64,
    pub direction: Direction,
    pub confidence: f64,
    #[serde(default)]
    pub patterns: Vec<String>,
    pub target_24h: Option<f64>,
    pub target_48h: Option<f64>,
    pub target_72h: Option<f64>,
}

impl NewSignal {
    pub fn new(price: f64, direction: Direction, confidence: f64) -> Self {
        Self {
            price,
            direction,
            confidence,
            patterns: Vec::new(),
            target_24h: None,
            target_48h: None,
            target_72h: None,
        }
    }

    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Use the same price target for every horizon.
    pub fn with_target(mut self, target: Option<f64>) -> Self {
        self.target_24h = target;
        self.target_48h = target;
        self.target_72h = target;
        self
    }
}

/// A logged call and its grading progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalOutcome {
    pub id: Uuid,
    /// Unix milliseconds when the call was logged.
    pub timestamp: i64,
    pub price_at_signal: f64,
    pub direction: Direction,
    pub confidence: f64,
    pub patterns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_24h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_48h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_72h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_24h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_48h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_72h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_24h: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_48h: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_72h: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<i64>,
}

impl SignalOutcome {
    /// Create a pending outcome record.
    pub fn new(id: Uuid, timestamp: i64, signal: NewSignal) -> Self {
        Self {
            id,
            timestamp,
            price_at_signal: signal.price,
            direction: signal.direction,
            confidence: signal.confidence,
            patterns: signal.patterns,
            target_24h: signal.target_24h,
            target_48h: signal.target_48h,
            target_72h: signal.target_72h,
            price_24h: None,
            price_48h: None,
            price_72h: None,
            outcome_24h: None,
            outcome_48h: None,
            outcome_72h: None,
            checked_at: None,
        }
    }

    pub fn outcome(&self, horizon: Horizon) -> Option<Outcome> {
        match horizon {
            Horizon::H24 => self.outcome_24h,
            Horizon::H48 => self.outcome_48h,
            Horizon::H72 => self.outcome_72h,
        }
    }

    pub fn price_after(&self, horizon: Horizon) -> Option<f64> {
        match horizon {
            Horizon::H24 => self.price_24h,
            Horizon::H48 => self.price_48h,
            Horizon::H72 => self.price_72h,
        }
    }

    pub fn target(&self, horizon: Horizon) -> Option<f64> {
        match horizon {
            Horizon::H24 => self.target_24h,
            Horizon::H48 => self.target_48h,
            Horizon::H72 => self.target_72h,
        }
    }

    /// Whether any horizon has been graded yet.
    pub fn is_checked(&self) -> bool {
        Horizon::ALL.iter().any(|h| self.outcome(*h).is_some())
    }

    /// Whether all horizons are graded.
    pub fn is_complete(&self) -> bool {
        Horizon::ALL.iter().all(|h| self.outcome(*h).is_some())
    }

    /// Percent change from the call price to `price`.
    pub fn change_pct(&self, price: f64) -> f64 {
        percent_change(self.price_at_signal, price)
    }

    /// Return (%) measured in the called direction.
    pub fn directional_return(&self, price: f64) -> f64 {
        let change = self.change_pct(price);
        match self.direction {
            Direction::Down => -change,
            _ => change,
        }
    }

    /// Grade one horizon against `current_price`, recording price and outcome.
    pub fn grade(&mut self, horizon: Horizon, current_price: f64, now: i64) -> Outcome {
        let outcome = Outcome::grade(self.direction, self.change_pct(current_price));
        match horizon {
            Horizon::H24 => {
                self.price_24h = Some(current_price);
                self.outcome_24h = Some(outcome);
            }
            Horizon::H48 => {
                self.price_48h = Some(current_price);
                self.outcome_48h = Some(outcome);
            }
            Horizon::H72 => {
                self.price_72h = Some(current_price);
                self.outcome_72h = Some(outcome);
            }
        }
        self.checked_at = Some(now);
        outcome
    }
}

/// Grading tallies for one horizon.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizonStats {
    /// Outcomes set at this horizon, neutral included.
    pub graded: u32,
    pub correct: u32,
    pub incorrect: u32,
    /// correct / (correct + incorrect); 0 when nothing decisive.
    pub accuracy: f64,
    /// Mean return (%) in the called direction.
    pub avg_return: f64,
}

impl HorizonStats {
    pub fn decisive(&self) -> u32 {
        self.correct + self.incorrect
    }
}

/// Track record of one named pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternStats {
    pub pattern: String,
    pub total_signals: u32,
    #[serde(rename = "24h")]
    pub h24: HorizonStats,
    #[serde(rename = "48h")]
    pub h48: HorizonStats,
    #[serde(rename = "72h")]
    pub h72: HorizonStats,
}

impl PatternStats {
    pub fn horizon(&self, horizon: Horizon) -> &HorizonStats {
        match horizon {
            Horizon::H24 => &self.h24,
            Horizon::H48 => &self.h48,
            Horizon::H72 => &self.h72,
        }
    }
}

/// Track record across all calls.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total_signals: u32,
    #[serde(rename = "24h")]
    pub h24: HorizonStats,
    #[serde(rename = "48h")]
    pub h48: HorizonStats,
    #[serde(rename = "72h")]
    pub h72: HorizonStats,
    pub avg_confidence: f64,
    /// Consecutive correct 24h calls counting back from the most recent.
    pub current_streak: u32,
    pub best_streak: u32,
}

impl OverallStats {
    pub fn horizon(&self, horizon: Horizon) -> &HorizonStats {
        match horizon {
            Horizon::H24 => &self.h24,
            Horizon::H48 => &self.h48,
            Horizon::H72 => &self.h72,
        }
    }
}

/// Persisted learning document, one per deployment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LearningData {
    pub signals: Vec<SignalOutcome>,
    pub pattern_stats: Vec<PatternStats>,
    pub overall_stats: OverallStats,
    pub last_updated: Option<i64>,
}
