use crate::types::Direction;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a tracked call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    /// Price reached the target before the stop.
    TargetHit,
    /// Price reached the stop first (or both in the same bar).
    StopHit,
    /// Neither level was touched within 24h.
    Expired,
    /// Sideways/mixed call and price stayed within the range threshold.
    RangeHeld,
    /// Sideways/mixed call and price broke out of the range threshold.
    RangeBroken,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResolution {
    pub kind: ResolutionKind,
    /// Price used to settle the call.
    pub exit_price: f64,
    /// Percent change from the call price to `exit_price`.
    pub change_pct: f64,
    /// Whether price ended on the called side (or in range for range calls).
    pub direction_correct: bool,
    /// Unix milliseconds.
    pub resolved_at: i64,
}

/// A published prediction being followed until it resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedCall {
    pub id: Uuid,
    pub symbol: String,
    /// Unix milliseconds when the call was made.
    pub timestamp: i64,
    pub price_at_call: f64,
    pub direction: Direction,
    pub confidence: f64,
    pub target_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub predicted_price_24h: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<CallResolution>,
}

/// Persisted tracker document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerData {
    pub calls: Vec<TrackedCall>,
    pub last_updated: Option<i64>,
}

/// Hit-rate summary over resolved calls.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSummary {
    pub total_calls: u32,
    pub resolved: u32,
    pub target_hits: u32,
    pub stop_hits: u32,
    pub expired: u32,
    pub range_held: u32,
    pub range_broken: u32,
    /// target_hits / (target_hits + stop_hits).
    pub hit_rate: f64,
    /// Share of resolved calls that ended on the called side.
    pub direction_accuracy: f64,
}
