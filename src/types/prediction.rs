use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a market call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Sideways,
    Mixed,
}

impl Direction {
    /// Whether this call commits to a side (and therefore carries target/stop).
    pub fn is_directional(&self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
            Direction::Sideways => write!(f, "sideways"),
            Direction::Mixed => write!(f, "mixed"),
        }
    }
}

/// A single directional call with its supporting reasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub direction: Direction,
    /// 0 to 0.85.
    pub confidence: f64,
    /// Set only for `up`/`down` calls.
    pub target_price: Option<f64>,
    /// Set only for `up`/`down` calls.
    pub stop_loss: Option<f64>,
    pub predicted_price_24h: f64,
    pub reasoning: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivatives_factors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain_factors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_flow_factors: Option<Vec<String>>,
}
