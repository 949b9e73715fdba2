use anyhow::Context;
use omen::config::{Config, LogFormat};
use omen::services::signals::PatternBias;
use omen::services::store::DocumentStore;
use omen::types::{
    AggregatedSignal, DerivativesData, ExchangeFlowMetrics, MarketContext, NewSignal, OhlcPoint,
    OnChainMetrics, OverallStats, PatternMatch, Prediction, SignalInput, TechnicalIndicators,
    TrackerSummary,
};
use omen::{CallTracker, Error, HistoricalLearner, PatternRecognizer, PredictionEngine, SignalAggregator};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// One evaluation input, as produced by the data collectors.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    symbol: String,
    /// Hourly bars, oldest first.
    bars: Vec<OhlcPoint>,
    #[serde(default)]
    indicators: TechnicalIndicators,
    derivatives: Option<DerivativesData>,
    #[serde(default)]
    funding_history: Vec<f64>,
    oi_change_24h_pct: Option<f64>,
    on_chain: Option<OnChainMetrics>,
    exchange_flow: Option<ExchangeFlowMetrics>,
    /// Category metrics for the aggregate report.
    metrics: Option<SignalInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CycleReport {
    symbol: String,
    price: f64,
    prediction: Prediction,
    patterns: Vec<PatternMatch>,
    pattern_bias: PatternBias,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<AggregatedSignal>,
    outcomes_graded: usize,
    learning: OverallStats,
    tracker: TrackerSummary,
}

struct Evaluation {
    prediction: Prediction,
    patterns: Vec<PatternMatch>,
    graded: usize,
    learning: OverallStats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    init_tracing(config.log_format);

    let path = std::env::args()
        .nth(1)
        .context("usage: omen <snapshot.json>")?;
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path))?;
    let snapshot: Snapshot = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))?;
    let price = snapshot.bars.last().map(|b| b.close).ok_or(Error::EmptySeries)?;
    info!("Evaluating {} at {:.2} ({} bars)", snapshot.symbol, price, snapshot.bars.len());

    let store = config.build_store().await.context("opening document store")?;
    let now = chrono::Utc::now().timestamp_millis();

    let evaluation = run_learning_cycle(&config, store.as_ref(), &snapshot, price, now).await?;
    let tracker = run_tracker_cycle(&config, store.as_ref(), &snapshot, price, &evaluation.prediction, now).await?;

    let report = CycleReport {
        symbol: snapshot.symbol.clone(),
        price,
        pattern_bias: PatternRecognizer::aggregate_bias(&evaluation.patterns),
        report: snapshot.metrics.as_ref().map(SignalAggregator::aggregate),
        prediction: evaluation.prediction,
        patterns: evaluation.patterns,
        outcomes_graded: evaluation.graded,
        learning: evaluation.learning,
        tracker,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "omen=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Grade, recognize, predict and log against a freshly loaded learner.
/// A version conflict reloads and replays the whole cycle.
async fn run_learning_cycle(
    config: &Config,
    store: &dyn DocumentStore,
    snapshot: &Snapshot,
    price: f64,
    now: i64,
) -> anyhow::Result<Evaluation> {
    let mut attempt = 0;
    loop {
        let mut learner = HistoricalLearner::load(store, &config.learning_key).await?;
        let graded = learner.check_outcomes_at(price, now);

        let ctx = MarketContext::from_bars(&snapshot.bars)
            .with_funding(
                snapshot.derivatives.as_ref().and_then(|d| d.funding_rate),
                snapshot.funding_history.clone(),
            )
            .with_open_interest(
                snapshot.derivatives.as_ref().and_then(|d| d.open_interest_value),
                snapshot.oi_change_24h_pct,
            );
        let patterns = PatternRecognizer::with_accuracy(&learner).recognize(&ctx);

        let prediction = PredictionEngine::predict(
            &snapshot.bars,
            &snapshot.indicators,
            &patterns,
            snapshot.derivatives.as_ref(),
            snapshot.on_chain.as_ref(),
            snapshot.exchange_flow.as_ref(),
        )?;

        learner.log_signal_at(
            NewSignal::new(price, prediction.direction, prediction.confidence)
                .with_patterns(patterns.iter().map(|p| p.pattern.clone()))
                .with_target(prediction.target_price),
            now,
        );

        match learner.save(store).await {
            Ok(()) => {
                return Ok(Evaluation {
                    prediction,
                    patterns,
                    graded,
                    learning: learner.overall_stats().clone(),
                })
            }
            Err(e) if e.is_conflict() && attempt < config.save_retries => {
                attempt += 1;
                warn!("Learning data changed underneath us, retrying ({}/{})", attempt, config.save_retries);
            }
            Err(e) => return Err(e).context("saving learning data"),
        }
    }
}

async fn run_tracker_cycle(
    config: &Config,
    store: &dyn DocumentStore,
    snapshot: &Snapshot,
    price: f64,
    prediction: &Prediction,
    now: i64,
) -> anyhow::Result<TrackerSummary> {
    let mut attempt = 0;
    loop {
        let mut tracker = CallTracker::load(store, &config.tracker_key).await?;
        tracker.resolve(&snapshot.symbol, &snapshot.bars, now);
        tracker.record_at(&snapshot.symbol, price, prediction, now);

        match tracker.save(store).await {
            Ok(()) => return Ok(tracker.summary()),
            Err(e) if e.is_conflict() && attempt < config.save_retries => {
                attempt += 1;
                warn!("Tracked calls changed underneath us, retrying ({}/{})", attempt, config.save_retries);
            }
            Err(e) => return Err(e).context("saving tracked calls"),
        }
    }
}
