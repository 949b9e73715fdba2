//! Follow published calls until their target, stop or 24h window resolves.

use crate::error::Result;
use crate::services::store::{load_json, save_json, DocumentStore, Precondition};
use crate::types::{
    percent_change, CallResolution, Direction, OhlcPoint, Outcome, Prediction, ResolutionKind,
    TrackedCall, TrackerData, TrackerSummary,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Most recent calls retained.
pub const MAX_CALLS: usize = 500;

/// How long a call stays open.
pub const RESOLUTION_WINDOW_MS: i64 = 24 * 3_600_000;

/// Tracker over one persisted [`TrackerData`] document.
#[derive(Debug, Clone)]
pub struct CallTracker {
    key: String,
    data: TrackerData,
    version: Option<String>,
    dirty: bool,
}

impl CallTracker {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            data: TrackerData::default(),
            version: None,
            dirty: false,
        }
    }

    /// Load the document under `key`; missing means empty.
    pub async fn load<S: DocumentStore + ?Sized>(store: &S, key: &str) -> Result<Self> {
        let Some((data, version)) = load_json::<TrackerData, S>(store, key).await? else {
            info!("No tracked calls at {}, starting fresh", key);
            return Ok(Self::new(key));
        };
        info!("Loaded {} tracked calls from {}", data.calls.len(), key);
        Ok(Self {
            key: key.to_string(),
            data,
            version: Some(version),
            dirty: false,
        })
    }

    /// Write back if anything changed; state is kept on failure.
    pub async fn save<S: DocumentStore + ?Sized>(&mut self, store: &S) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let precondition = Precondition::from_loaded(self.version.as_deref());
        match save_json(store, &self.key, &self.data, precondition).await {
            Ok(version) => {
                info!("Saved {} tracked calls to {}", self.data.calls.len(), self.key);
                self.version = Some(version);
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to save tracked calls to {}: {}", self.key, e);
                Err(e.into())
            }
        }
    }

    pub fn calls(&self) -> &[TrackedCall] {
        &self.data.calls
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Calls not resolved yet.
    pub fn open_calls(&self) -> impl Iterator<Item = &TrackedCall> {
        self.data.calls.iter().filter(|c| c.resolution.is_none())
    }

    pub fn record(&mut self, symbol: &str, price: f64, prediction: &Prediction) -> Uuid {
        self.record_at(symbol, price, prediction, chrono::Utc::now().timestamp_millis())
    }

    /// Start tracking a prediction made at `timestamp` (Unix ms).
    pub fn record_at(&mut self, symbol: &str, price: f64, prediction: &Prediction, timestamp: i64) -> Uuid {
        let id = Uuid::new_v4();
        self.data.calls.push(TrackedCall {
            id,
            symbol: symbol.to_lowercase(),
            timestamp,
            price_at_call: price,
            direction: prediction.direction,
            confidence: prediction.confidence,
            target_price: prediction.target_price,
            stop_loss: prediction.stop_loss,
            predicted_price_24h: prediction.predicted_price_24h,
            resolution: None,
        });
        if self.data.calls.len() > MAX_CALLS {
            let excess = self.data.calls.len() - MAX_CALLS;
            self.data.calls.drain(..excess);
            debug!("Evicted {} oldest tracked calls", excess);
        }
        self.touch(timestamp);
        id
    }

    /// Resolve open `symbol` calls whose window has closed, using `bars`
    /// (hourly, oldest first). Returns the number resolved.
    pub fn resolve(&mut self, symbol: &str, bars: &[OhlcPoint], now: i64) -> usize {
        let symbol = symbol.to_lowercase();
        let mut resolved = 0;
        for call in self.data.calls.iter_mut() {
            if call.resolution.is_some()
                || call.symbol != symbol
                || now - call.timestamp < RESOLUTION_WINDOW_MS
            {
                continue;
            }
            if let Some(resolution) = resolve_call(call, bars, now) {
                debug!("Call {} resolved as {:?}", call.id, resolution.kind);
                call.resolution = Some(resolution);
                resolved += 1;
            }
        }
        if resolved > 0 {
            info!("Resolved {} {} calls", resolved, symbol);
            self.touch(now);
        }
        resolved
    }

    pub fn summary(&self) -> TrackerSummary {
        let mut summary = TrackerSummary {
            total_calls: self.data.calls.len() as u32,
            ..Default::default()
        };
        let mut correct = 0u32;
        for resolution in self.data.calls.iter().filter_map(|c| c.resolution.as_ref()) {
            summary.resolved += 1;
            if resolution.direction_correct {
                correct += 1;
            }
            match resolution.kind {
                ResolutionKind::TargetHit => summary.target_hits += 1,
                ResolutionKind::StopHit => summary.stop_hits += 1,
                ResolutionKind::Expired => summary.expired += 1,
                ResolutionKind::RangeHeld => summary.range_held += 1,
                ResolutionKind::RangeBroken => summary.range_broken += 1,
            }
        }
        let decided = summary.target_hits + summary.stop_hits;
        if decided > 0 {
            summary.hit_rate = f64::from(summary.target_hits) / f64::from(decided);
        }
        if summary.resolved > 0 {
            summary.direction_accuracy = f64::from(correct) / f64::from(summary.resolved);
        }
        summary
    }

    fn touch(&mut self, now: i64) {
        self.data.last_updated = Some(now);
        self.dirty = true;
    }
}

/// Settle one call against the bars inside its window. `None` when no bar
/// falls inside the window.
fn resolve_call(call: &TrackedCall, bars: &[OhlcPoint], now: i64) -> Option<CallResolution> {
    let end = call.timestamp + RESOLUTION_WINDOW_MS;
    let window: Vec<&OhlcPoint> = bars
        .iter()
        .filter(|b| b.time > call.timestamp && b.time <= end)
        .collect();
    let last = window.last()?;

    let settle = |kind, exit_price: f64, direction_correct| CallResolution {
        kind,
        exit_price,
        change_pct: percent_change(call.price_at_call, exit_price),
        direction_correct,
        resolved_at: now,
    };

    if !call.direction.is_directional() {
        let change = percent_change(call.price_at_call, last.close);
        return Some(if change.abs() < Outcome::RANGE_THRESHOLD_PCT {
            settle(ResolutionKind::RangeHeld, last.close, true)
        } else {
            settle(ResolutionKind::RangeBroken, last.close, false)
        });
    }

    let up = call.direction == Direction::Up;
    for bar in &window {
        let stop_hit = call
            .stop_loss
            .is_some_and(|s| if up { bar.low <= s } else { bar.high >= s });
        let target_hit = call
            .target_price
            .is_some_and(|t| if up { bar.high >= t } else { bar.low <= t });
        // Same bar: assume the stop filled first.
        if stop_hit {
            return call
                .stop_loss
                .map(|s| settle(ResolutionKind::StopHit, s, false));
        }
        if target_hit {
            return call
                .target_price
                .map(|t| settle(ResolutionKind::TargetHit, t, true));
        }
    }

    let change = percent_change(call.price_at_call, last.close);
    let moved_our_way = if up { change > 0.0 } else { change < 0.0 };
    Some(settle(ResolutionKind::Expired, last.close, moved_our_way))
}
